use std::fs;

use super::{out_of_range, resolve};
use crate::assembler::context::AssemblerContext;
use crate::assembler::error::ErrorKind;
use crate::assembler::registry::Directive;
use crate::ast::{AddressingMode, Expr, Line};

pub fn encode(directive: Directive, line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    match directive {
        Directive::Org => org(line, ctx),
        Directive::Equ => equ(line, ctx),
        Directive::Db => data(line, ctx, 1),
        Directive::Dw => data(line, ctx, 2),
        Directive::Ascii => ascii(line),
        Directive::Incbin => incbin(line, ctx),
        Directive::Pad => pad(line, ctx),
        Directive::Longa => {
            ctx.acc16 = switch(line)?;
            Ok(())
        }
        Directive::Longi => {
            ctx.index16 = switch(line)?;
            Ok(())
        }
        Directive::Setd => setd(line, ctx),
        Directive::Setdbr => setdbr(line, ctx),
    }
}

fn invalid(line: &Line) -> ErrorKind {
    ErrorKind::InvalidOperand(line.addr_mode)
}

fn operand(line: &Line) -> Result<&Expr, ErrorKind> {
    line.operand.as_ref().ok_or_else(|| invalid(line))
}

/// Evaluate an operand that has to be known the first time it is seen.
fn known(line: &Line, ctx: &AssemblerContext, directive: &'static str) -> Result<i32, ErrorKind> {
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    crate::assembler::eval::evaluate(operand(line)?, &ctx.symbols)
        .map_err(|_| ErrorKind::ForwardReference(directive))
}

fn org(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let address = known(line, ctx, "ORG")?;
    if !(0..=0xFF_FFFF).contains(&address) {
        return Err(out_of_range(line, address));
    }
    ctx.pc = address;
    line.byte_size = Some(0);
    Ok(())
}

fn pad(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let length = known(line, ctx, "PAD")?.wrapping_sub(ctx.pc);
    let size = usize::try_from(length).map_err(|_| ErrorKind::NegativePad(length))?;
    line.byte_size = Some(size);
    Ok(())
}

fn equ(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    line.byte_size = Some(0);
    if line.addr_mode != AddressingMode::Absolute {
        return Err(invalid(line));
    }
    let label = line.label.clone().ok_or(ErrorKind::MissingLabelForEqu)?;
    if let Some(value) = resolve(operand(line)?, ctx)? {
        ctx.symbols.define(&label, value)?;
    }
    Ok(())
}

/// `db` and `dw`, either a single value or a list of them.
fn data(line: &mut Line, ctx: &mut AssemblerContext, width: usize) -> Result<(), ErrorKind> {
    let range = if width == 1 {
        -0x80..=0xFF
    } else {
        -0x8000..=0xFFFF
    };

    match line.addr_mode {
        AddressingMode::Absolute => {
            line.byte_size = Some(width);
            let Some(value) = resolve(operand(line)?, ctx)? else {
                return Ok(());
            };
            if !range.contains(&value) {
                return Err(out_of_range(line, value));
            }
            line.emit_data(value, width);
        }
        AddressingMode::List => {
            line.byte_size = Some(line.list.len() * width);
            for element in line.list.iter_mut() {
                let Some(value) = resolve(&element.expr, ctx)? else {
                    continue;
                };
                if !range.contains(&value) {
                    return Err(ErrorKind::OperandOutOfRange {
                        value,
                        symbol: element.expr.first_symbol().map(str::to_owned),
                    });
                }
                element.resolve(value);
            }
        }
        _ => return Err(invalid(line)),
    }
    Ok(())
}

fn text(line: &Line) -> Result<&str, ErrorKind> {
    match (line.addr_mode, &line.operand) {
        (AddressingMode::String, Some(Expr::StringLiteral(text))) => Ok(text),
        _ => Err(invalid(line)),
    }
}

fn ascii(line: &mut Line) -> Result<(), ErrorKind> {
    line.byte_size = Some(text(line)?.len());
    Ok(())
}

fn incbin(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    let path = ctx.resolve_path(text(line)?);
    let metadata = fs::metadata(&path).map_err(|err| ErrorKind::FileError {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    if !metadata.is_file() {
        return Err(ErrorKind::FileError {
            path: path.display().to_string(),
            reason: "not a regular file".to_string(),
        });
    }
    line.byte_size = Some(metadata.len() as usize);
    Ok(())
}

/// `on` or `off` operand of `longa`/`longi`.
fn switch(line: &mut Line) -> Result<bool, ErrorKind> {
    line.byte_size = Some(0);
    let on = match (line.addr_mode, &line.operand) {
        (AddressingMode::Absolute, Some(Expr::Symbol(name))) if name.eq_ignore_ascii_case("on") => {
            true
        }
        (AddressingMode::Absolute, Some(Expr::Symbol(name))) if name.eq_ignore_ascii_case("off") => {
            false
        }
        _ => return Err(invalid(line)),
    };
    Ok(on)
}

/// Evaluate the `#value` operand of `setd`/`setdbr` through the immediate
/// modifier. `None` while the value is still unresolved.
fn register_hint(line: &mut Line, ctx: &mut AssemblerContext, sixteen_bit: bool) -> Result<Option<i32>, ErrorKind> {
    line.byte_size = Some(0);
    if line.addr_mode != AddressingMode::Immediate {
        return Err(invalid(line));
    }
    let Some(value) = resolve(operand(line)?, ctx)? else {
        return Ok(None);
    };
    let value = line.modifier.apply(value, sixteen_bit);
    let limit = if sixteen_bit { 0xFFFF } else { 0xFF };
    if !(0..=limit).contains(&value) {
        return Err(out_of_range(line, value));
    }
    Ok(Some(value))
}

fn setd(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if let Some(base) = register_hint(line, ctx, true)? {
        ctx.direct_page = base;
    }
    Ok(())
}

fn setdbr(line: &mut Line, ctx: &mut AssemblerContext) -> Result<(), ErrorKind> {
    if let Some(bank) = register_hint(line, ctx, false)? {
        ctx.data_bank = bank;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ImmediateModifier;

    use pretty_assertions::assert_eq;

    fn line(directive: &str, mode: AddressingMode, operand: Option<Expr>) -> Line {
        Line::instruction(directive, mode, operand)
    }

    fn number(value: i32) -> Option<Expr> {
        Some(Expr::Number(value))
    }

    fn text_operand(text: &str) -> Option<Expr> {
        Some(Expr::StringLiteral(text.to_string()))
    }

    fn context() -> AssemblerContext {
        let mut ctx = AssemblerContext::new(None);
        ctx.pc = 0x8000;
        ctx
    }

    #[test]
    fn test_org() -> Result<(), ErrorKind> {
        let mut ctx = context();
        let mut org = line("org", AddressingMode::Absolute, number(0xC000));
        encode(Directive::Org, &mut org, &mut ctx)?;
        assert_eq!(ctx.pc, 0xC000);
        assert_eq!(org.byte_size, Some(0));

        let mut forward = line("org", AddressingMode::Absolute, Some(Expr::symbol("later")));
        assert_eq!(
            encode(Directive::Org, &mut forward, &mut ctx),
            Err(ErrorKind::ForwardReference("ORG"))
        );

        let mut too_far = line("org", AddressingMode::Absolute, number(0x1000000));
        assert_eq!(
            encode(Directive::Org, &mut too_far, &mut ctx),
            Err(ErrorKind::OperandOutOfRange {
                value: 0x1000000,
                symbol: None
            })
        );
        Ok(())
    }

    #[test]
    fn test_pad() {
        let tests = vec![
            (0x8010, Ok(Some(0x10))),
            (0x8000, Ok(Some(0))),
            (0x7000, Err(ErrorKind::NegativePad(-0x1000))),
        ];

        for (target, expected) in tests {
            let mut ctx = context();
            let mut pad = line("pad", AddressingMode::Absolute, number(target));
            let result = encode(Directive::Pad, &mut pad, &mut ctx).map(|()| pad.byte_size);
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_equ() -> Result<(), ErrorKind> {
        let mut ctx = context();
        let mut equ = line("equ", AddressingMode::Absolute, number(5)).with_label("five");
        encode(Directive::Equ, &mut equ, &mut ctx)?;
        assert_eq!(ctx.symbols.lookup("five"), Some(5));
        assert_eq!(equ.byte_size, Some(0));

        let mut unlabeled = line("equ", AddressingMode::Absolute, number(5));
        assert_eq!(
            encode(Directive::Equ, &mut unlabeled, &mut ctx),
            Err(ErrorKind::MissingLabelForEqu)
        );

        let mut again = line("equ", AddressingMode::Absolute, number(6)).with_label("five");
        assert_eq!(
            encode(Directive::Equ, &mut again, &mut ctx),
            Err(ErrorKind::RedefinedSymbol("five".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_data() -> Result<(), ErrorKind> {
        let tests = vec![
            (Directive::Db, 0xFF, Ok(vec![0xFF])),
            (Directive::Db, -1, Ok(vec![0xFF])),
            (Directive::Dw, 0x1234, Ok(vec![0x34, 0x12])),
            (
                Directive::Db,
                0x100,
                Err(ErrorKind::OperandOutOfRange {
                    value: 0x100,
                    symbol: None,
                }),
            ),
            (
                Directive::Dw,
                0x10000,
                Err(ErrorKind::OperandOutOfRange {
                    value: 0x10000,
                    symbol: None,
                }),
            ),
        ];

        for (directive, value, expected) in tests {
            let mut ctx = context();
            let mut data = line("db", AddressingMode::Absolute, number(value));
            let result = encode(directive, &mut data, &mut ctx).map(|()| data.encoded().to_vec());
            assert_eq!(result, expected);
        }
        Ok(())
    }

    #[test]
    fn test_data_list() -> Result<(), ErrorKind> {
        let mut ctx = context();
        let mut list = Line::list("dw", vec![Expr::Number(1), Expr::symbol("later")]);
        encode(Directive::Dw, &mut list, &mut ctx)?;
        assert_eq!(list.byte_size, Some(4));
        assert_eq!(list.list[0].value(), Some(1));
        assert_eq!(list.list[1].value(), None);
        assert!(ctx.missing_labels);

        ctx.symbols.define("later", 0x8123).unwrap();
        encode(Directive::Dw, &mut list, &mut ctx)?;
        assert_eq!(list.list[1].value(), Some(0x8123));

        let mut bytes = Line::list("db", vec![Expr::symbol("later")]);
        assert_eq!(
            encode(Directive::Db, &mut bytes, &mut ctx),
            Err(ErrorKind::OperandOutOfRange {
                value: 0x8123,
                symbol: Some("later".to_string())
            })
        );
        Ok(())
    }

    #[test]
    fn test_ascii() -> Result<(), ErrorKind> {
        let mut ctx = context();
        let mut ascii = line("ascii", AddressingMode::String, text_operand("hello"));
        encode(Directive::Ascii, &mut ascii, &mut ctx)?;
        assert_eq!(ascii.byte_size, Some(5));

        let mut numeric = line("ascii", AddressingMode::Absolute, number(1));
        assert_eq!(
            encode(Directive::Ascii, &mut numeric, &mut ctx),
            Err(ErrorKind::InvalidOperand(AddressingMode::Absolute))
        );
        Ok(())
    }

    #[test]
    fn test_incbin() -> Result<(), ErrorKind> {
        let dir = std::env::temp_dir().join("asm65816-incbin-test");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("blob.bin"), [1u8, 2, 3, 4, 5, 6]).unwrap();
        fs::create_dir_all(dir.join("nested")).unwrap();

        let mut ctx = AssemblerContext::new(Some(dir));
        let mut incbin = line("incbin", AddressingMode::String, text_operand("blob.bin"));
        encode(Directive::Incbin, &mut incbin, &mut ctx)?;
        assert_eq!(incbin.byte_size, Some(6));

        let mut missing = line("incbin", AddressingMode::String, text_operand("missing.bin"));
        let result = encode(Directive::Incbin, &mut missing, &mut ctx);
        assert!(matches!(result, Err(ErrorKind::FileError { .. })));

        let mut directory = line("incbin", AddressingMode::String, text_operand("nested"));
        let result = encode(Directive::Incbin, &mut directory, &mut ctx);
        assert!(
            matches!(&result, Err(ErrorKind::FileError { reason, .. }) if reason == "not a regular file"),
            "{:?}",
            result
        );
        Ok(())
    }

    #[test]
    fn test_register_width_switches() -> Result<(), ErrorKind> {
        let mut ctx = context();
        let tests = vec![
            (Directive::Longa, "on", true, false),
            (Directive::Longi, "ON", true, true),
            (Directive::Longa, "off", false, true),
            (Directive::Longi, "Off", false, false),
        ];

        for (directive, switch, acc16, index16) in tests {
            let mut toggle = line("longa", AddressingMode::Absolute, Some(Expr::symbol(switch)));
            encode(directive, &mut toggle, &mut ctx)?;
            assert_eq!((ctx.acc16, ctx.index16), (acc16, index16));
        }

        let mut bogus = line("longa", AddressingMode::Absolute, Some(Expr::symbol("maybe")));
        assert_eq!(
            encode(Directive::Longa, &mut bogus, &mut ctx),
            Err(ErrorKind::InvalidOperand(AddressingMode::Absolute))
        );
        Ok(())
    }

    #[test]
    fn test_register_hints() -> Result<(), ErrorKind> {
        let mut ctx = context();

        let mut setd = line("setd", AddressingMode::Immediate, number(0x0200));
        encode(Directive::Setd, &mut setd, &mut ctx)?;
        assert_eq!(ctx.direct_page, 0x0200);

        let mut setdbr = line("setdbr", AddressingMode::Immediate, number(0x7E1234))
            .with_modifier(ImmediateModifier::High);
        encode(Directive::Setdbr, &mut setdbr, &mut ctx)?;
        assert_eq!(ctx.data_bank, 0x7E);

        let tests = vec![
            (Directive::Setd, AddressingMode::Absolute, 0x0200, ErrorKind::InvalidOperand(AddressingMode::Absolute)),
            (
                Directive::Setd,
                AddressingMode::Immediate,
                0x10000,
                ErrorKind::OperandOutOfRange {
                    value: 0x10000,
                    symbol: None,
                },
            ),
            (
                Directive::Setdbr,
                AddressingMode::Immediate,
                0x100,
                ErrorKind::OperandOutOfRange {
                    value: 0x100,
                    symbol: None,
                },
            ),
        ];

        for (directive, mode, value, expected) in tests {
            let mut hint = line("setd", mode, number(value));
            assert_eq!(encode(directive, &mut hint, &mut ctx), Err(expected));
        }
        assert_eq!((ctx.direct_page, ctx.data_bank), (0x0200, 0x7E));
        Ok(())
    }
}
