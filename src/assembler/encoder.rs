//! Addressing-mode selection and byte encoding, one routine per instruction
//! family.
//!
//! Every routine follows the same shape: validate the addressing mode, work
//! out the largest size the line could take, then try to evaluate the
//! operand. If the operand is still unresolved during the first pass the
//! line keeps that pessimistic size; otherwise the smallest legal encoding is
//! chosen. Sizes can therefore only shrink as labels settle.

pub mod directives;
pub mod opcode;

use super::context::AssemblerContext;
use super::error::ErrorKind;
use super::eval::{classify, evaluate, EvalError, ExprClass};
use super::registry::Handler;
use crate::ast::{AddressingMode, Expr, Line};
use opcode::*;

/// An evaluated operand together with how it was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Operand {
    value: i32,
    class: ExprClass,
}

/// Operand width picked for absolute-style addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    DirectPage,
    Absolute,
    Long,
}

impl Width {
    fn size(self) -> usize {
        match self {
            Width::DirectPage => 2,
            Width::Absolute => 3,
            Width::Long => 4,
        }
    }
}

/// Encode `line` at the current program counter, setting its size and
/// bytes.
#[tracing::instrument(skip(line, ctx), fields(pc = ctx.pc))]
pub fn encode(handler: Handler, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    match handler {
        Handler::Directive(directive) => directives::encode(directive, line, ctx),
        Handler::Primary { base } => primary(base, line, ctx),
        Handler::Group2 { base } => group2(base, line, ctx),
        Handler::IndexLoad { base } => index_load(base, line, ctx),
        Handler::IndexCompare { base } => index_compare(base, line, ctx),
        Handler::Bit => bit(line, ctx),
        Handler::TestBits { base } => test_bits(base, line, ctx),
        Handler::Stz => stz(line, ctx),
        Handler::Branch { opcode } => branch(opcode, line, ctx),
        Handler::BranchLong => branch_long(line, ctx),
        Handler::Jmp => jmp(line, ctx),
        Handler::Jml => jml(line, ctx),
        Handler::Jsl => jsl(line, ctx),
        Handler::Jsr => jsr(line, ctx),
        Handler::Pea => pea(line, ctx),
        Handler::Pei => pei(line, ctx),
        Handler::Per => per(line, ctx),
        Handler::BlockMove { opcode } => block_move(opcode, line, ctx),
        Handler::Constant { opcode } => constant(opcode, line, ctx),
        Handler::Implied { opcode } => implied(opcode, line),
    }
}

/// Evaluate `expr`, tolerating an undefined symbol only while the context
/// allows it. A tolerated miss is reported as `Ok(None)` and flagged on the
/// context so the driver schedules another pass.
pub(crate) fn resolve(expr: &Expr, ctx: &mut AssemblerContext) -> Result<Option<i32>, ErrorKind> {
    match evaluate(expr, &ctx.symbols) {
        Ok(value) => Ok(Some(value)),
        Err(EvalError::Unresolved(_)) if ctx.tolerates_missing_symbols() => {
            ctx.missing_labels = true;
            Ok(None)
        }
        Err(EvalError::Unresolved(name)) => Err(ErrorKind::UndefinedSymbol(name)),
        Err(EvalError::NotNumeric) => Err(ErrorKind::InvalidOperand(AddressingMode::String)),
    }
}

fn invalid(line: &Line) -> ErrorKind {
    ErrorKind::InvalidOperand(line.addr_mode)
}

fn first_symbol(line: &Line) -> Option<String> {
    line.operand
        .as_ref()
        .and_then(Expr::first_symbol)
        .map(str::to_owned)
}

pub(crate) fn out_of_range(line: &Line, value: i32) -> ErrorKind {
    ErrorKind::OperandOutOfRange {
        value,
        symbol: first_symbol(line),
    }
}

fn operand(line: &Line, ctx: &mut AssemblerContext) -> Result<Option<Operand>, ErrorKind> {
    let expr = line.operand.as_ref().ok_or_else(|| invalid(line))?;
    let class = classify(expr);
    Ok(resolve(expr, ctx)?.map(|value| Operand { value, class }))
}

/// Operand to encode if `op` addresses the current direct page.
///
/// Symbolic operands are rebased onto the direct-page register.
fn direct_page(op: Operand, ctx: &AssemblerContext) -> Option<i32> {
    match op.class {
        ExprClass::Numeric => (0..=0xFF).contains(&op.value).then_some(op.value),
        ExprClass::Symbolic => {
            let offset = op.value - ctx.direct_page;
            (op.value <= 0xFFFF && (0..=0xFF).contains(&offset)).then_some(offset)
        }
    }
}

/// Whether `op` can be reached with a 16-bit address in the current data
/// bank.
fn near(op: Operand, ctx: &AssemblerContext) -> bool {
    match op.class {
        ExprClass::Numeric => (0..=0xFFFF).contains(&op.value),
        ExprClass::Symbolic => op.value >= 0 && op.value >> 16 == ctx.data_bank,
    }
}

fn far(value: i32) -> bool {
    (0..=0xFF_FFFF).contains(&value)
}

fn same_bank(a: i32, b: i32) -> bool {
    a >> 16 == b >> 16
}

/// Smallest of direct page, absolute and (if allowed) long that reaches
/// `op`, with the operand as it should be encoded.
fn select_width(
    line: &Line,
    op: Operand,
    ctx: &AssemblerContext,
    allow_long: bool,
) -> Result<(Width, i32), ErrorKind> {
    if let Some(offset) = direct_page(op, ctx) {
        Ok((Width::DirectPage, offset))
    } else if near(op, ctx) {
        Ok((Width::Absolute, op.value))
    } else if allow_long && far(op.value) {
        Ok((Width::Long, op.value))
    } else {
        Err(out_of_range(line, op.value))
    }
}

/// Apply the line's immediate modifier and check the result fits the
/// register width.
pub(crate) fn immediate(line: &Line, value: i32, sixteen_bit: bool) -> Result<i32, ErrorKind> {
    let value = line.modifier.apply(value, sixteen_bit);
    let range = if sixteen_bit {
        -0x8000..=0xFFFF
    } else {
        -0x80..=0xFF
    };
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(out_of_range(line, value))
    }
}

fn immediate_size(sixteen_bit: bool) -> usize {
    if sixteen_bit {
        3
    } else {
        2
    }
}

/// Record a size for a line whose operand is not known yet.
fn assume(line: &mut Line, size: usize) -> Result<(), ErrorKind> {
    line.byte_size = Some(size);
    Ok(())
}

fn primary(base: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    use AddressingMode::*;

    let worst = match line.addr_mode {
        Immediate if base == STA_BASE => return Err(invalid(line)),
        Immediate => immediate_size(ctx.acc16),
        Indirect
        | IndirectLong
        | IndexedIndirectX
        | IndirectIndexedY
        | IndirectLongIndexedY
        | StackRelative
        | StackRelativeIndirectIndexedY => 2,
        AbsoluteY => 3,
        Absolute | AbsoluteX => 4,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, worst);
    };

    match line.addr_mode {
        Immediate => {
            let value = immediate(line, op.value, ctx.acc16)?;
            line.emit(base + PRIMARY_IMM, value, worst);
        }
        Absolute | AbsoluteX => {
            let indexed = line.addr_mode == AbsoluteX;
            let (width, value) = select_width(line, op, ctx, true)?;
            let offset = match (width, indexed) {
                (Width::DirectPage, false) => PRIMARY_DP,
                (Width::DirectPage, true) => PRIMARY_DP_INDEXED_X,
                (Width::Absolute, false) => PRIMARY_ABS,
                (Width::Absolute, true) => PRIMARY_ABS_INDEXED_X,
                (Width::Long, false) => PRIMARY_ABS_LONG,
                (Width::Long, true) => PRIMARY_ABS_LONG_INDEXED_X,
            };
            line.emit(base + offset, value, width.size());
        }
        AbsoluteY => {
            if !near(op, ctx) {
                return Err(out_of_range(line, op.value));
            }
            line.emit(base + PRIMARY_ABS_INDEXED_Y, op.value, 3);
        }
        StackRelative | StackRelativeIndirectIndexedY => {
            if !(0..=0xFF).contains(&op.value) {
                return Err(out_of_range(line, op.value));
            }
            let offset = if line.addr_mode == StackRelative {
                PRIMARY_STACK_RELATIVE
            } else {
                PRIMARY_SR_INDIRECT_INDEXED_Y
            };
            line.emit(base + offset, op.value, 2);
        }
        _ => {
            let value = direct_page(op, ctx).ok_or_else(|| out_of_range(line, op.value))?;
            let offset = match line.addr_mode {
                Indirect => PRIMARY_DP_INDIRECT,
                IndirectLong => PRIMARY_DP_INDIRECT_LONG,
                IndexedIndirectX => PRIMARY_DP_INDEXED_INDIRECT_X,
                IndirectIndexedY => PRIMARY_DP_INDIRECT_INDEXED_Y,
                _ => PRIMARY_DP_INDIRECT_LONG_INDEXED_Y,
            };
            line.emit(base + offset, value, 2);
        }
    }
    Ok(())
}

fn group2(base: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    use AddressingMode::*;

    let stores_index = base == STX_BASE || base == STY_BASE;
    let worst = match line.addr_mode {
        Implied | Accumulator => {
            let opcode = match base {
                INC_BASE => INC_ACC,
                DEC_BASE => DEC_ACC,
                STX_BASE | STY_BASE => return Err(invalid(line)),
                _ => base | (G2_ACC << 2),
            };
            line.emit(opcode, 0, 1);
            return Ok(());
        }
        Absolute => 3,
        AbsoluteX if base == STX_BASE => return Err(invalid(line)),
        AbsoluteY if base != STX_BASE => return Err(invalid(line)),
        AbsoluteX | AbsoluteY if stores_index => 2,
        AbsoluteX | AbsoluteY => 3,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, worst);
    };

    let indexed = line.addr_mode != Absolute;
    if indexed && stores_index {
        let value = direct_page(op, ctx).ok_or_else(|| out_of_range(line, op.value))?;
        line.emit(base | (G2_DP_INDEXED << 2), value, 2);
        return Ok(());
    }

    let (width, value) = select_width(line, op, ctx, false)?;
    let mode = match (width, indexed) {
        (Width::DirectPage, false) => G2_DP,
        (Width::DirectPage, true) => G2_DP_INDEXED,
        (_, false) => G2_ABS,
        (_, true) => G2_ABS_INDEXED,
    };
    line.emit(base | (mode << 2), value, width.size());
    Ok(())
}

fn index_load(base: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    use AddressingMode::*;

    let worst = match line.addr_mode {
        Immediate => immediate_size(ctx.index16),
        Absolute => 3,
        AbsoluteX if base == LDY_BASE => 3,
        AbsoluteY if base == LDX_BASE => 3,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, worst);
    };

    if line.addr_mode == Immediate {
        let value = immediate(line, op.value, ctx.index16)?;
        line.emit(base + INDEX_IMM, value, worst);
        return Ok(());
    }

    let indexed = line.addr_mode != Absolute;
    let (width, value) = select_width(line, op, ctx, false)?;
    let offset = match (width, indexed) {
        (Width::DirectPage, false) => INDEX_DP,
        (Width::DirectPage, true) => INDEX_DP_INDEXED,
        (_, false) => INDEX_ABS,
        (_, true) => INDEX_ABS_INDEXED,
    };
    line.emit(base + offset, value, width.size());
    Ok(())
}

fn index_compare(base: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let worst = match line.addr_mode {
        AddressingMode::Immediate => immediate_size(ctx.index16),
        AddressingMode::Absolute => 3,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, worst);
    };

    if line.addr_mode == AddressingMode::Immediate {
        let value = immediate(line, op.value, ctx.index16)?;
        line.emit(base + INDEX_IMM, value, worst);
        return Ok(());
    }

    let (width, value) = select_width(line, op, ctx, false)?;
    let offset = match width {
        Width::DirectPage => INDEX_DP,
        _ => INDEX_ABS,
    };
    line.emit(base + offset, value, width.size());
    Ok(())
}

fn bit(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    use AddressingMode::*;

    let worst = match line.addr_mode {
        Immediate => immediate_size(ctx.acc16),
        Absolute | AbsoluteX => 3,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, worst);
    };

    if line.addr_mode == Immediate {
        let value = immediate(line, op.value, ctx.acc16)?;
        line.emit(BIT_IMM, value, worst);
        return Ok(());
    }

    let (width, value) = select_width(line, op, ctx, false)?;
    let opcode = match (width, line.addr_mode) {
        (Width::DirectPage, Absolute) => BIT_DP,
        (Width::DirectPage, _) => BIT_DP_INDEXED,
        (_, Absolute) => BIT_ABS,
        _ => BIT_ABS_INDEXED,
    };
    line.emit(opcode, value, width.size());
    Ok(())
}

fn test_bits(base: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    let (width, value) = select_width(line, op, ctx, false)?;
    let offset = match width {
        Width::DirectPage => TEST_DP,
        _ => TEST_ABS,
    };
    line.emit(base + offset, value, width.size());
    Ok(())
}

fn stz(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let indexed = match line.addr_mode {
        AddressingMode::Absolute => false,
        AddressingMode::AbsoluteX => true,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    let (width, value) = select_width(line, op, ctx, false)?;
    let opcode = match (width, indexed) {
        (Width::DirectPage, false) => STZ_DP,
        (Width::DirectPage, true) => STZ_DP_INDEXED,
        (_, false) => STZ_ABS,
        (_, true) => STZ_ABS_INDEXED,
    };
    line.emit(opcode, value, width.size());
    Ok(())
}

fn branch(opcode: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 2);
    };

    // The size stands even if the target is out of reach
    line.byte_size = Some(2);
    let displacement = op.value.wrapping_sub(ctx.pc).wrapping_sub(2);
    if !(-128..=127).contains(&displacement) {
        return Err(ErrorKind::BranchOutOfBounds(first_symbol(line)));
    }
    line.emit(opcode, displacement, 2);
    Ok(())
}

fn branch_long(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    line.byte_size = Some(3);
    let displacement = op.value.wrapping_sub(ctx.pc).wrapping_sub(3);
    if !(-0x8000..=0x7FFF).contains(&displacement) {
        return Err(ErrorKind::LongBranchOutOfBounds(first_symbol(line)));
    }
    line.emit(BRL, displacement, 3);
    Ok(())
}

fn jmp(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    use AddressingMode::*;

    let opcode = match line.addr_mode {
        Absolute => JMP_ABS,
        Indirect => JMP_INDIRECT,
        IndexedIndirectX => JMP_INDEXED_INDIRECT,
        IndirectLong => JML_INDIRECT,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    line.byte_size = Some(3);
    if line.addr_mode == IndirectLong {
        if !near(op, ctx) {
            return Err(out_of_range(line, op.value));
        }
    } else if !same_bank(op.value, ctx.pc) {
        return Err(ErrorKind::JumpOutOfBounds(first_symbol(line)));
    }
    line.emit(opcode, op.value, 3);
    Ok(())
}

fn jml(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let worst = match line.addr_mode {
        AddressingMode::Absolute => 4,
        AddressingMode::IndirectLong => 3,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, worst);
    };

    if line.addr_mode == AddressingMode::Absolute {
        if !far(op.value) {
            return Err(out_of_range(line, op.value));
        }
        line.emit(JML_ABS, op.value, 4);
    } else {
        if !near(op, ctx) {
            return Err(out_of_range(line, op.value));
        }
        line.emit(JML_INDIRECT, op.value, 3);
    }
    Ok(())
}

fn jsl(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 4);
    };

    if !far(op.value) {
        return Err(out_of_range(line, op.value));
    }
    line.emit(JSL, op.value, 4);
    Ok(())
}

fn jsr(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let opcode = match line.addr_mode {
        AddressingMode::Absolute => JSR_ABS,
        AddressingMode::IndexedIndirectX => JSR_INDEXED_INDIRECT,
        _ => return Err(invalid(line)),
    };
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    line.byte_size = Some(3);
    if opcode == JSR_ABS {
        if !same_bank(op.value, ctx.pc) {
            return Err(ErrorKind::JumpOutOfBounds(first_symbol(line)));
        }
    } else if !near(op, ctx) {
        return Err(out_of_range(line, op.value));
    }
    line.emit(opcode, op.value, 3);
    Ok(())
}

fn pea(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    if !near(op, ctx) {
        return Err(out_of_range(line, op.value));
    }
    line.emit(PEA, op.value, 3);
    Ok(())
}

fn pei(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Indirect {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 2);
    };

    let value = direct_page(op, ctx).ok_or_else(|| out_of_range(line, op.value))?;
    line.emit(PEI, value, 2);
    Ok(())
}

fn per(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 3);
    };

    line.byte_size = Some(3);
    if !same_bank(op.value, ctx.pc) {
        return Err(ErrorKind::RelativeAddressOutOfBounds(first_symbol(line)));
    }
    line.emit(PER, op.value.wrapping_sub(ctx.pc).wrapping_sub(3), 3);
    Ok(())
}

fn block_move(opcode: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::List || line.list.len() != 2 {
        return Err(invalid(line));
    }

    let mut banks = [0; 2];
    for (index, bank) in banks.iter_mut().enumerate() {
        let Some(value) = resolve(&line.list[index].expr, ctx)? else {
            return assume(line, 3);
        };
        if !far(value) {
            return Err(ErrorKind::OperandOutOfRange {
                value,
                symbol: line.list[index].expr.first_symbol().map(str::to_owned),
            });
        }
        line.list[index].resolve(value);
        *bank = value >> 16;
    }

    let [source, destination] = banks;
    line.emit(opcode, destination | (source << 8), 3);
    Ok(())
}

fn constant(opcode: u8, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    match line.addr_mode {
        AddressingMode::Implied if opcode == BRK || opcode == COP => {
            line.emit(opcode, 0, 2);
            return Ok(());
        }
        AddressingMode::Immediate => {}
        _ => return Err(invalid(line)),
    }
    let Some(op) = operand(line, ctx)? else {
        return assume(line, 2);
    };

    let value = immediate(line, op.value, false)?;
    line.emit(opcode, value, 2);
    Ok(())
}

fn implied(opcode: u8, line: &mut Line) -> Result<(), ErrorKind> {
    if line.addr_mode != AddressingMode::Implied {
        return Err(invalid(line));
    }
    line.emit(opcode, 0, 1);
    Ok(())
}
