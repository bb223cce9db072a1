use std::collections::HashMap;

use lazy_static::lazy_static;
use strum::IntoEnumIterator;

use super::encoder::opcode::*;

/// Assembler directives. Their names are the lowercase variant names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::Display,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Directive {
    Org,
    Equ,
    Db,
    Dw,
    Ascii,
    Incbin,
    Pad,
    Longa,
    Longi,
    Setd,
    Setdbr,
}

/// How a mnemonic is encoded.
///
/// Instructions of the same family share one encoding routine, parameterised
/// by their opcode or opcode base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Directive(Directive),
    /// adc, and, cmp, eor, lda, ora, sbc, sta
    Primary { base: u8 },
    /// asl, dec, inc, lsr, rol, ror, stx, sty
    Group2 { base: u8 },
    /// ldx, ldy
    IndexLoad { base: u8 },
    /// cpx, cpy
    IndexCompare { base: u8 },
    Bit,
    /// trb, tsb
    TestBits { base: u8 },
    Stz,
    Branch { opcode: u8 },
    BranchLong,
    Jmp,
    Jml,
    Jsl,
    Jsr,
    Pea,
    Pei,
    Per,
    /// mvn, mvp
    BlockMove { opcode: u8 },
    /// brk, cop, rep, sep
    Constant { opcode: u8 },
    Implied { opcode: u8 },
}

/// Case-insensitive mapping from mnemonic to [`Handler`].
#[derive(Debug, Default)]
pub struct InstructionRegistry {
    handlers: HashMap<String, Handler>,
}

impl InstructionRegistry {
    /// Registry without any instructions, for building custom instruction
    /// sets.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, handler: Handler) {
        self.handlers.insert(name.to_ascii_lowercase(), handler);
    }

    /// Make `alias` resolve to whatever `target` resolves to. Returns `false`
    /// if `target` is not registered.
    pub fn alias(&mut self, alias: &str, target: &str) -> bool {
        match self.lookup(target) {
            Some(handler) => {
                self.register(alias, handler);
                true
            }
            None => false,
        }
    }

    /// Find the handler for `name`, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.handlers.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All directives and the standard 65816 instruction set.
    #[tracing::instrument]
    fn standard() -> Self {
        let mut registry = Self::empty();

        for directive in Directive::iter() {
            registry.register(directive.into(), Handler::Directive(directive));
        }

        let instructions = vec![
            ("adc", Handler::Primary { base: ADC_BASE }),
            ("and", Handler::Primary { base: AND_BASE }),
            ("cmp", Handler::Primary { base: CMP_BASE }),
            ("eor", Handler::Primary { base: EOR_BASE }),
            ("lda", Handler::Primary { base: LDA_BASE }),
            ("ora", Handler::Primary { base: ORA_BASE }),
            ("sbc", Handler::Primary { base: SBC_BASE }),
            ("sta", Handler::Primary { base: STA_BASE }),
            ("asl", Handler::Group2 { base: ASL_BASE }),
            ("dec", Handler::Group2 { base: DEC_BASE }),
            ("inc", Handler::Group2 { base: INC_BASE }),
            ("lsr", Handler::Group2 { base: LSR_BASE }),
            ("rol", Handler::Group2 { base: ROL_BASE }),
            ("ror", Handler::Group2 { base: ROR_BASE }),
            ("stx", Handler::Group2 { base: STX_BASE }),
            ("sty", Handler::Group2 { base: STY_BASE }),
            ("ldx", Handler::IndexLoad { base: LDX_BASE }),
            ("ldy", Handler::IndexLoad { base: LDY_BASE }),
            ("cpx", Handler::IndexCompare { base: CPX_BASE }),
            ("cpy", Handler::IndexCompare { base: CPY_BASE }),
            ("bit", Handler::Bit),
            ("trb", Handler::TestBits { base: TRB_BASE }),
            ("tsb", Handler::TestBits { base: TSB_BASE }),
            ("stz", Handler::Stz),
            ("bcc", Handler::Branch { opcode: BCC }),
            ("bcs", Handler::Branch { opcode: BCS }),
            ("beq", Handler::Branch { opcode: BEQ }),
            ("bmi", Handler::Branch { opcode: BMI }),
            ("bne", Handler::Branch { opcode: BNE }),
            ("bpl", Handler::Branch { opcode: BPL }),
            ("bra", Handler::Branch { opcode: BRA }),
            ("bvc", Handler::Branch { opcode: BVC }),
            ("bvs", Handler::Branch { opcode: BVS }),
            ("brl", Handler::BranchLong),
            ("jmp", Handler::Jmp),
            ("jml", Handler::Jml),
            ("jsl", Handler::Jsl),
            ("jsr", Handler::Jsr),
            ("pea", Handler::Pea),
            ("pei", Handler::Pei),
            ("per", Handler::Per),
            ("mvn", Handler::BlockMove { opcode: MVN }),
            ("mvp", Handler::BlockMove { opcode: MVP }),
            ("brk", Handler::Constant { opcode: BRK }),
            ("cop", Handler::Constant { opcode: COP }),
            ("rep", Handler::Constant { opcode: REP }),
            ("sep", Handler::Constant { opcode: SEP }),
            ("clc", Handler::Implied { opcode: CLC }),
            ("cld", Handler::Implied { opcode: CLD }),
            ("cli", Handler::Implied { opcode: CLI }),
            ("clv", Handler::Implied { opcode: CLV }),
            ("dex", Handler::Implied { opcode: DEX }),
            ("dey", Handler::Implied { opcode: DEY }),
            ("inx", Handler::Implied { opcode: INX }),
            ("iny", Handler::Implied { opcode: INY }),
            ("nop", Handler::Implied { opcode: NOP }),
            ("pha", Handler::Implied { opcode: PHA }),
            ("phb", Handler::Implied { opcode: PHB }),
            ("phd", Handler::Implied { opcode: PHD }),
            ("phk", Handler::Implied { opcode: PHK }),
            ("php", Handler::Implied { opcode: PHP }),
            ("phx", Handler::Implied { opcode: PHX }),
            ("phy", Handler::Implied { opcode: PHY }),
            ("pla", Handler::Implied { opcode: PLA }),
            ("plb", Handler::Implied { opcode: PLB }),
            ("pld", Handler::Implied { opcode: PLD }),
            ("plp", Handler::Implied { opcode: PLP }),
            ("plx", Handler::Implied { opcode: PLX }),
            ("ply", Handler::Implied { opcode: PLY }),
            ("rti", Handler::Implied { opcode: RTI }),
            ("rtl", Handler::Implied { opcode: RTL }),
            ("rts", Handler::Implied { opcode: RTS }),
            ("sec", Handler::Implied { opcode: SEC }),
            ("sed", Handler::Implied { opcode: SED }),
            ("sei", Handler::Implied { opcode: SEI }),
            ("stp", Handler::Implied { opcode: STP }),
            ("tad", Handler::Implied { opcode: TAD }),
            ("tas", Handler::Implied { opcode: TAS }),
            ("tax", Handler::Implied { opcode: TAX }),
            ("tay", Handler::Implied { opcode: TAY }),
            ("tda", Handler::Implied { opcode: TDA }),
            ("tsa", Handler::Implied { opcode: TSA }),
            ("tsx", Handler::Implied { opcode: TSX }),
            ("txa", Handler::Implied { opcode: TXA }),
            ("txs", Handler::Implied { opcode: TXS }),
            ("txy", Handler::Implied { opcode: TXY }),
            ("tya", Handler::Implied { opcode: TYA }),
            ("tyx", Handler::Implied { opcode: TYX }),
            ("wai", Handler::Implied { opcode: WAI }),
            ("xba", Handler::Implied { opcode: XBA }),
            ("xce", Handler::Implied { opcode: XCE }),
        ];
        for (name, handler) in instructions {
            registry.register(name, handler);
        }

        let aliases = [
            ("blt", "bcc"),
            ("bge", "bcs"),
            ("swa", "xba"),
            ("tcd", "tad"),
            ("tcs", "tas"),
            ("tdc", "tda"),
            ("tsc", "tsa"),
        ];
        for (alias, target) in aliases {
            registry.alias(alias, target);
        }

        registry
    }
}

lazy_static! {
    /// Directives plus the standard 65816 instruction set.
    pub static ref INSTRUCTIONS: InstructionRegistry = InstructionRegistry::standard();
}
