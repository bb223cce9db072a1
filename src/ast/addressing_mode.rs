use std::fmt;

/// Addressing mode of a line, as recognised from the operand's punctuation.
///
/// The front-end only knows the *shape* of the operand. Whether `lda $10`
/// ends up as direct page, absolute or absolute long is decided by the
/// encoder once the operand value is known.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Default)]
pub enum AddressingMode {
    /// No operand
    #[default]
    Implied,
    /// `a`
    Accumulator,
    /// `#v`
    Immediate,
    /// `a`, also direct page and absolute long
    Absolute,
    /// `a,x`
    AbsoluteX,
    /// `a,y`
    AbsoluteY,
    /// `(a)`
    Indirect,
    /// `(dp),y`
    IndirectIndexedY,
    /// `(dp,x)`
    IndexedIndirectX,
    /// `[dp]`
    IndirectLong,
    /// `[dp],y`
    IndirectLongIndexedY,
    /// `sr,s`
    StackRelative,
    /// `(sr,s),y`
    StackRelativeIndirectIndexedY,
    /// `"text"`
    String,
    /// `v, v, ...`
    List,
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AddressingMode::Implied => "implied",
            AddressingMode::Accumulator => "accumulator",
            AddressingMode::Immediate => "immediate",
            AddressingMode::Absolute => "absolute",
            AddressingMode::AbsoluteX => "absolute indexed x",
            AddressingMode::AbsoluteY => "absolute indexed y",
            AddressingMode::Indirect => "indirect",
            AddressingMode::IndirectIndexedY => "indirect indexed y",
            AddressingMode::IndexedIndirectX => "indexed indirect x",
            AddressingMode::IndirectLong => "indirect long",
            AddressingMode::IndirectLongIndexedY => "indirect long indexed y",
            AddressingMode::StackRelative => "stack relative",
            AddressingMode::StackRelativeIndirectIndexedY => "stack relative indirect indexed y",
            AddressingMode::String => "string",
            AddressingMode::List => "list",
        };
        write!(f, "{}", text)
    }
}

/// Selects which part of a value an immediate operand extracts.
///
/// Written as `#^v` (high), `#>v` (mid) and `#<v` (low).
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Default)]
pub enum ImmediateModifier {
    #[default]
    None,
    High,
    Mid,
    Low,
}

impl ImmediateModifier {
    /// Apply the modifier to `value` for an immediate of the given width.
    ///
    /// For 8-bit immediates the modifiers pick bits 0-7, 8-15 and 16-23. For
    /// 16-bit immediates `<` and `>` both keep the low word while `^` keeps
    /// bits 8-23.
    pub fn apply(&self, value: i32, sixteen_bit: bool) -> i32 {
        if sixteen_bit {
            match self {
                ImmediateModifier::High => (value & 0xFFFF00) >> 8,
                ImmediateModifier::Mid | ImmediateModifier::Low => value & 0xFFFF,
                ImmediateModifier::None => value,
            }
        } else {
            match self {
                ImmediateModifier::High => (value & 0xFF0000) >> 16,
                ImmediateModifier::Mid => (value & 0x00FF00) >> 8,
                ImmediateModifier::Low => value & 0xFF,
                ImmediateModifier::None => value,
            }
        }
    }
}
