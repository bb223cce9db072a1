use std::fmt;

use super::{AddressingMode, Expr, ImmediateModifier, ListElement, SourcePosition};

/// One source statement.
///
/// The front-end fills in label, mnemonic, addressing mode and operands. The
/// assembler overwrites `byte_size` and `bytes` on every pass until the
/// layout converges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub position: SourcePosition,
    pub label: Option<String>,
    /// Mnemonic or directive exactly as written; resolved case-insensitively.
    pub instruction: Option<String>,
    pub addr_mode: AddressingMode,
    pub modifier: ImmediateModifier,
    pub operand: Option<Expr>,
    /// Elements of a [`AddressingMode::List`] operand.
    pub list: Vec<ListElement>,
    /// `None` until the line has been assembled at least once.
    pub byte_size: Option<usize>,
    pub bytes: [u8; 4],
}

impl Line {
    pub fn new(position: SourcePosition) -> Line {
        Line {
            position,
            label: None,
            instruction: None,
            addr_mode: AddressingMode::Implied,
            modifier: ImmediateModifier::None,
            operand: None,
            list: Vec::new(),
            byte_size: None,
            bytes: [0; 4],
        }
    }

    /// Line holding only a label.
    pub fn label(label: &str) -> Line {
        Line::new(SourcePosition::default()).with_label(label)
    }

    /// Line holding an instruction with an optional operand.
    pub fn instruction(mnemonic: &str, addr_mode: AddressingMode, operand: Option<Expr>) -> Line {
        let mut line = Line::new(SourcePosition::default());
        line.instruction = Some(mnemonic.to_owned());
        line.addr_mode = addr_mode;
        line.operand = operand;
        line
    }

    /// Line holding an instruction with a list operand.
    pub fn list(mnemonic: &str, elements: Vec<Expr>) -> Line {
        let mut line = Line::instruction(mnemonic, AddressingMode::List, None);
        line.list = elements.into_iter().map(ListElement::from).collect();
        line
    }

    pub fn with_label(mut self, label: &str) -> Line {
        self.label = Some(label.to_owned());
        self
    }

    pub fn with_modifier(mut self, modifier: ImmediateModifier) -> Line {
        self.modifier = modifier;
        self
    }

    pub fn with_position(mut self, position: SourcePosition) -> Line {
        self.position = position;
        self
    }

    /// Bytes this line emits directly. Directives whose content is produced
    /// at output time (`pad`, `ascii`, lists, ...) have none.
    pub fn encoded(&self) -> &[u8] {
        let size = self.byte_size.unwrap_or(0).min(self.bytes.len());
        &self.bytes[..size]
    }

    /// Store an opcode followed by the low `size - 1` bytes of `operand` in
    /// little-endian order.
    pub(crate) fn emit(&mut self, opcode: u8, operand: i32, size: usize) {
        let [lo, mid, hi, _] = operand.to_le_bytes();
        self.bytes = [opcode, lo, mid, hi];
        self.byte_size = Some(size);
    }

    /// Store the low `size` bytes of `value` in little-endian order, with no
    /// opcode.
    pub(crate) fn emit_data(&mut self, value: i32, size: usize) {
        self.bytes = value.to_le_bytes();
        self.byte_size = Some(size);
    }

    pub(crate) fn is_mnemonic(&self, name: &str) -> bool {
        self.instruction
            .as_deref()
            .is_some_and(|ins| ins.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}:", label)?;
        }
        let Some(instruction) = &self.instruction else {
            return Ok(());
        };
        write!(f, "  {}", instruction)?;

        let prefix = match self.modifier {
            ImmediateModifier::None => "",
            ImmediateModifier::High => "^",
            ImmediateModifier::Mid => ">",
            ImmediateModifier::Low => "<",
        };
        let operand = self
            .operand
            .as_ref()
            .map(|expr| expr.to_string())
            .unwrap_or_default();
        match self.addr_mode {
            AddressingMode::Implied => Ok(()),
            AddressingMode::Accumulator => write!(f, " a"),
            AddressingMode::Immediate => write!(f, " #{}{}", prefix, operand),
            AddressingMode::Absolute | AddressingMode::String => write!(f, " {}", operand),
            AddressingMode::AbsoluteX => write!(f, " {},x", operand),
            AddressingMode::AbsoluteY => write!(f, " {},y", operand),
            AddressingMode::Indirect => write!(f, " ({})", operand),
            AddressingMode::IndirectIndexedY => write!(f, " ({}),y", operand),
            AddressingMode::IndexedIndirectX => write!(f, " ({},x)", operand),
            AddressingMode::IndirectLong => write!(f, " [{}]", operand),
            AddressingMode::IndirectLongIndexedY => write!(f, " [{}],y", operand),
            AddressingMode::StackRelative => write!(f, " {},s", operand),
            AddressingMode::StackRelativeIndirectIndexedY => write!(f, " ({},s),y", operand),
            AddressingMode::List => {
                let elements = self
                    .list
                    .iter()
                    .map(|element| element.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, " {}", elements)
            }
        }
    }
}
