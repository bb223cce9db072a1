//! Multi-pass layout driver.
//!
//! Every pass walks all lines in order, defining labels at the current
//! program counter and asking the encoder to size and encode each
//! instruction. The first pass tolerates forward references by assuming the
//! largest encoding. Later passes use the label values of the pass before,
//! so instructions shrink until no size changes between two passes.

use std::path::PathBuf;

use tracing::{debug, trace};

use super::context::AssemblerContext;
use super::encoder;
use super::error::{CompilerError, ErrorKind};
use super::registry::{Directive, Handler, InstructionRegistry, INSTRUCTIONS};
use super::symbols::SymbolTable;
use crate::ast::{Line, SourcePosition};

pub const DEFAULT_MAX_PASSES: u32 = 64;

/// Knobs for a single assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Base directory for relative `incbin`/`incsrc` paths.
    pub include_dir: Option<PathBuf>,
    /// Give up if the layout has not settled after this many passes.
    pub max_passes: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include_dir: None,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

pub struct Compiler<'r> {
    ctx: AssemblerContext,
    registry: &'r InstructionRegistry,
    max_passes: u32,
    origin: Option<i32>,
    /// First range error of the current pass that may vanish once the
    /// layout settles.
    deferred: Option<CompilerError>,
    /// Where the last pass left the layout unsettled.
    unsettled: Option<SourcePosition>,
}

impl Default for Compiler<'static> {
    fn default() -> Self {
        Compiler::new(&INSTRUCTIONS, Options::default())
    }
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r InstructionRegistry, options: Options) -> Self {
        Self {
            ctx: AssemblerContext::new(options.include_dir),
            registry,
            max_passes: options.max_passes,
            origin: None,
            deferred: None,
            unsettled: None,
        }
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u32 {
        self.ctx.pass
    }

    /// Address of the first byte of the image, as laid out by the last pass.
    pub fn origin(&self) -> Option<i32> {
        self.origin
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.ctx.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.ctx.symbols
    }

    /// Drop every local label so names can be reused by unrelated code.
    pub fn forget_locals(&mut self) {
        self.ctx.symbols.forget_locals();
    }

    /// Lay out and encode `lines` in place until their sizes settle.
    ///
    /// On success every line carries its final size and bytes and every
    /// list element its final value. Branch and jump range errors only count
    /// in a pass whose layout matches the pass before it, since until then
    /// labels ahead of the program counter may still move.
    #[tracing::instrument(skip_all, fields(lines = lines.len()))]
    pub fn compile(&mut self, lines: &mut [Line]) -> Result<(), CompilerError> {
        loop {
            if self.ctx.pass >= self.max_passes {
                return Err(CompilerError::new(
                    self.unsettled.clone().unwrap_or_default(),
                    ErrorKind::PassLimitExceeded(self.max_passes),
                ));
            }

            let previous = lines.iter().map(|line| line.byte_size).collect::<Vec<_>>();
            self.run_pass(lines)?;
            if self.ctx.missing_labels {
                continue;
            }

            let changed = lines
                .iter()
                .zip(previous)
                .filter(|(line, before)| before.is_some() && line.byte_size != *before)
                .map(|(line, _)| &line.position)
                .collect::<Vec<_>>();
            debug!(pass = self.ctx.pass - 1, changed = changed.len(), "sizes compared");
            match changed.first() {
                Some(position) => self.unsettled = Some((*position).clone()),
                None => return self.deferred.take().map_or(Ok(()), Err),
            }
        }
    }

    fn run_pass(&mut self, lines: &mut [Line]) -> Result<(), CompilerError> {
        self.ctx.begin_pass();
        self.origin = None;
        self.deferred = None;
        self.unsettled = None;

        for line in lines.iter_mut() {
            let missing_labels = self.ctx.missing_labels;
            match self.assemble_line(line) {
                Ok(()) => {}
                Err(kind) if kind.depends_on_layout() => {
                    debug!(%kind, "range check deferred");
                    self.deferred
                        .get_or_insert_with(|| CompilerError::new(line.position.clone(), kind));
                    self.advance(line);
                }
                Err(kind) => return Err(CompilerError::new(line.position.clone(), kind)),
            }
            if !missing_labels && self.ctx.missing_labels {
                self.unsettled = Some(line.position.clone());
            }
        }

        debug!(
            pass = self.ctx.pass,
            pc = format!("{:#08x}", self.ctx.pc),
            missing_labels = self.ctx.missing_labels,
            "pass complete"
        );
        self.ctx.pass += 1;
        Ok(())
    }

    /// Move the program counter past `line`.
    fn advance(&mut self, line: &Line) {
        let size = line.byte_size.unwrap_or(0);
        if size > 0 && self.origin.is_none() {
            self.origin = Some(self.ctx.pc);
        }
        trace!(pc = format!("{:#08x}", self.ctx.pc), size, "{}", line);
        self.ctx.pc = self.ctx.pc.wrapping_add(size as i32);
    }

    fn assemble_line(&mut self, line: &mut Line) -> Result<(), ErrorKind> {
        let handler = match &line.instruction {
            Some(name) => Some(
                self.registry
                    .lookup(name)
                    .ok_or_else(|| ErrorKind::UnknownInstruction(name.clone()))?,
            ),
            None => None,
        };

        // `equ` assigns its label itself
        if let Some(label) = &line.label {
            if handler != Some(Handler::Directive(Directive::Equ)) {
                self.ctx.symbols.enter_scope(label);
                self.ctx.symbols.define(label, self.ctx.pc)?;
            }
        }

        let Some(handler) = handler else {
            line.byte_size = Some(0);
            return Ok(());
        };
        encoder::encode(handler, line, &mut self.ctx)?;
        self.advance(line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AddressingMode, Expr};

    use pretty_assertions::assert_eq;

    fn ins(mnemonic: &str, mode: AddressingMode, operand: Option<Expr>) -> Line {
        Line::instruction(mnemonic, mode, operand)
    }

    fn num(value: i32) -> Option<Expr> {
        Some(Expr::Number(value))
    }

    fn sym(name: &str) -> Option<Expr> {
        Some(Expr::symbol(name))
    }

    fn image(lines: &[Line]) -> Vec<u8> {
        lines.iter().flat_map(|line| line.encoded().to_vec()).collect()
    }

    fn compile(mut lines: Vec<Line>) -> Result<Vec<u8>, CompilerError> {
        let mut compiler = Compiler::default();
        compiler.compile(&mut lines)?;
        Ok(image(&lines))
    }

    #[test]
    fn test_compile_program() -> Result<(), CompilerError> {
        let tests = vec![
            (
                vec![
                    ins("org", AddressingMode::Absolute, num(0x8000)),
                    ins("lda", AddressingMode::Immediate, num(0x01)).with_label("Start"),
                    ins("sta", AddressingMode::Absolute, num(0x2100)),
                    ins("bra", AddressingMode::Absolute, sym("Start")),
                ],
                vec![0xA9, 0x01, 0x8D, 0x00, 0x21, 0x80, 0xF9],
            ),
            (
                vec![
                    ins("ldx", AddressingMode::Immediate, num(0x08)),
                    Line::label("loop"),
                    ins("lda", AddressingMode::Immediate, num(0x01)),
                    ins("jmp", AddressingMode::Absolute, sym("end")),
                    ins("sta", AddressingMode::Absolute, num(0x0200)),
                    ins("bne", AddressingMode::Absolute, sym("loop")),
                    Line::label("end"),
                    ins("brk", AddressingMode::Implied, None),
                ],
                vec![
                    /* LDX */ 0xA2, 0x08, /* LDA */ 0xA9, 0x01, /* JMP */ 0x4C, 0x0C,
                    0x00, /* STA */ 0x8D, 0x00, 0x02, /* BNE */ 0xD0, 0xF6, /* BRK */ 0x00,
                    0x00,
                ],
            ),
        ];

        for (lines, expected) in tests {
            assert_eq!(compile(lines)?, expected);
        }
        Ok(())
    }

    #[test]
    fn test_forward_reference_shrinks() -> Result<(), CompilerError> {
        let mut lines = vec![
            ins("org", AddressingMode::Absolute, num(0x8000)),
            ins("lda", AddressingMode::Absolute, sym("data")),
            ins("rts", AddressingMode::Implied, None),
            ins("db", AddressingMode::Absolute, num(0x2A)).with_label("data"),
        ];

        let mut compiler = Compiler::default();
        compiler.compile(&mut lines)?;

        assert_eq!(image(&lines), vec![0xAD, 0x04, 0x80, 0x60, 0x2A]);
        assert_eq!(lines[1].byte_size, Some(3));
        assert_eq!(compiler.symbols().lookup("data"), Some(0x8004));
        assert_eq!(compiler.passes(), 3);
        assert_eq!(compiler.origin(), Some(0x8000));
        Ok(())
    }

    #[test]
    fn test_direct_page_label() -> Result<(), CompilerError> {
        let lines = vec![
            ins("setd", AddressingMode::Immediate, num(0x0200)),
            ins("org", AddressingMode::Absolute, num(0x0210)),
            Line::label("var"),
            ins("org", AddressingMode::Absolute, num(0x8000)),
            ins("lda", AddressingMode::Absolute, sym("var")),
        ];

        assert_eq!(compile(lines)?, vec![0xA5, 0x10]);
        Ok(())
    }

    #[test]
    fn test_errors() {
        let tests = vec![
            (
                vec![ins("lda", AddressingMode::Absolute, sym("nowhere"))],
                ErrorKind::UndefinedSymbol("nowhere".to_string()),
            ),
            (
                vec![Line::label("start"), Line::label("start")],
                ErrorKind::RedefinedSymbol("start".to_string()),
            ),
            (
                vec![ins("foo", AddressingMode::Implied, None)],
                ErrorKind::UnknownInstruction("foo".to_string()),
            ),
            (
                vec![
                    ins("org", AddressingMode::Absolute, num(0x8000)),
                    ins("beq", AddressingMode::Absolute, sym("far")),
                    ins("pad", AddressingMode::Absolute, num(0x8100)),
                    Line::label("far"),
                ],
                ErrorKind::BranchOutOfBounds(Some("far".to_string())),
            ),
            // Only the first pass may leave symbols unresolved, so a chain of
            // `equ`s that needs a third pass to resolve is rejected.
            (
                vec![
                    ins("equ", AddressingMode::Absolute, sym("B")).with_label("A"),
                    ins("equ", AddressingMode::Absolute, sym("C")).with_label("B"),
                    ins("nop", AddressingMode::Implied, None).with_label("C"),
                ],
                ErrorKind::UndefinedSymbol("B".to_string()),
            ),
        ];

        for (lines, expected) in tests {
            assert_eq!(compile(lines).map_err(|err| err.kind), Err(expected));
        }
    }

    #[test]
    fn test_error_position() {
        let position = SourcePosition::new(Some("main.s".into()), 7);
        let lines = vec![ins("lda", AddressingMode::Absolute, sym("nowhere")).with_position(position.clone())];

        let err = compile(lines).unwrap_err();
        assert_eq!(err.position, position);
        assert_eq!(err.to_string(), "main.s:7: undefined symbol 'nowhere'");
    }

    #[test]
    fn test_pass_limit() {
        let lines = vec![
            ins("org", AddressingMode::Absolute, num(0x8000)).with_position(SourcePosition::line(1)),
            ins("lda", AddressingMode::Absolute, sym("data")).with_position(SourcePosition::line(2)),
            ins("db", AddressingMode::Absolute, num(0)).with_label("data").with_position(SourcePosition::line(3)),
        ];

        // Stopped while a label is missing, then while `lda` is shrinking
        let tests = vec![(1, SourcePosition::line(2)), (2, SourcePosition::line(2))];

        for (max_passes, position) in tests {
            let options = Options {
                max_passes,
                ..Default::default()
            };
            let mut compiler = Compiler::new(&INSTRUCTIONS, options);
            let err = compiler.compile(&mut lines.clone()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::PassLimitExceeded(max_passes));
            assert_eq!(err.position, position);
        }
    }

    #[test]
    fn test_forward_branch_over_shrinking_code() -> Result<(), CompilerError> {
        let mut lines = vec![
            ins("org", AddressingMode::Absolute, num(0)),
            ins("bne", AddressingMode::Absolute, sym("end")),
        ];
        lines.extend((0..40).map(|_| ins("lda", AddressingMode::Absolute, sym("var"))));
        lines.push(ins("rts", AddressingMode::Implied, None).with_label("end"));
        lines.push(ins("db", AddressingMode::Absolute, num(0)).with_label("var"));

        let mut compiler = Compiler::default();
        compiler.compile(&mut lines)?;

        let mut expected = vec![0xD0, 0x50];
        expected.extend([0xA5, 0x53].repeat(40));
        expected.extend([0x60, 0x00]);
        assert_eq!(image(&lines), expected);
        assert_eq!(compiler.symbols().lookup("end"), Some(0x52));
        assert_eq!(compiler.passes(), 3);
        Ok(())
    }

    #[test]
    fn test_register_hints_carry_over_passes() -> Result<(), CompilerError> {
        let program = vec![
            ins("equ", AddressingMode::Absolute, num(0x0210)).with_label("var"),
            ins("lda", AddressingMode::Absolute, sym("var")),
            ins("setd", AddressingMode::Immediate, num(0x0200)),
        ];
        // A single pass never sees the later `setd`
        assert_eq!(compile(program.clone())?, vec![0xAD, 0x10, 0x02]);

        // A second pass starts with the direct page left by the first
        let mut forward = program;
        forward.push(ins("jmp", AddressingMode::Absolute, sym("end")));
        forward.push(Line::label("end"));
        assert_eq!(compile(forward)?, vec![0xA5, 0x10, 0x4C, 0x05, 0x00]);
        Ok(())
    }

    #[test]
    fn test_local_labels() -> Result<(), CompilerError> {
        let lines = vec![
            Line::label("first"),
            ins("nop", AddressingMode::Implied, None).with_label(".loop"),
            ins("bra", AddressingMode::Absolute, sym(".loop")),
            Line::label("second"),
            ins("nop", AddressingMode::Implied, None).with_label(".loop"),
            ins("nop", AddressingMode::Implied, None),
            ins("bra", AddressingMode::Absolute, sym(".loop")),
        ];

        assert_eq!(
            compile(lines)?,
            vec![0xEA, 0x80, 0xFD, 0xEA, 0xEA, 0x80, 0xFC]
        );
        Ok(())
    }

    #[test]
    fn test_equ_does_not_open_scope() -> Result<(), CompilerError> {
        let lines = vec![
            Line::label("main"),
            ins("nop", AddressingMode::Implied, None).with_label(".again"),
            ins("equ", AddressingMode::Absolute, num(5)).with_label("FIVE"),
            ins("lda", AddressingMode::Immediate, sym("FIVE")),
            ins("bra", AddressingMode::Absolute, sym(".again")),
        ];

        assert_eq!(compile(lines)?, vec![0xEA, 0xA9, 0x05, 0x80, 0xFB]);
        Ok(())
    }

    #[test]
    fn test_register_width_resets_each_pass() -> Result<(), CompilerError> {
        let mut lines = vec![
            ins("lda", AddressingMode::Immediate, num(0x01)),
            ins("longa", AddressingMode::Absolute, sym("on")),
            ins("lda", AddressingMode::Immediate, num(0x1234)),
            ins("jmp", AddressingMode::Absolute, sym("end")),
            Line::label("end"),
        ];

        let mut compiler = Compiler::default();
        compiler.compile(&mut lines)?;
        assert_eq!(compiler.passes(), 2);
        assert_eq!(
            image(&lines),
            vec![0xA9, 0x01, 0xA9, 0x34, 0x12, 0x4C, 0x08, 0x00]
        );
        Ok(())
    }

    #[test]
    fn test_compile_is_deterministic() -> Result<(), CompilerError> {
        let program = vec![
            ins("org", AddressingMode::Absolute, num(0x8000)),
            ins("jsr", AddressingMode::Absolute, sym("routine")),
            ins("lda", AddressingMode::AbsoluteX, sym("table")),
            ins("rts", AddressingMode::Implied, None),
            ins("rts", AddressingMode::Implied, None).with_label("routine"),
            Line::list("dw", vec![Expr::Number(1), Expr::symbol("routine")]).with_label("table"),
        ];

        assert_eq!(compile(program.clone())?, compile(program)?);
        Ok(())
    }
}
