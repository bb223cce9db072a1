//! Opcode bases and addressing-mode offsets.
//!
//! Most 65816 instruction families share a regular layout: the opcode is a
//! family base plus (or, for group 2, or'ed with) an addressing-mode offset.

// Primary family (adc, and, cmp, eor, lda, ora, sbc, sta): base + offset
pub const PRIMARY_IMM: u8 = 0x09;
pub const PRIMARY_ABS: u8 = 0x0D;
pub const PRIMARY_ABS_LONG: u8 = 0x0F;
pub const PRIMARY_DP: u8 = 0x05;
pub const PRIMARY_DP_INDIRECT: u8 = 0x12;
pub const PRIMARY_DP_INDIRECT_LONG: u8 = 0x07;
pub const PRIMARY_ABS_INDEXED_X: u8 = 0x1D;
pub const PRIMARY_ABS_LONG_INDEXED_X: u8 = 0x1F;
pub const PRIMARY_ABS_INDEXED_Y: u8 = 0x19;
pub const PRIMARY_DP_INDEXED_X: u8 = 0x15;
pub const PRIMARY_DP_INDEXED_INDIRECT_X: u8 = 0x01;
pub const PRIMARY_DP_INDIRECT_INDEXED_Y: u8 = 0x11;
pub const PRIMARY_DP_INDIRECT_LONG_INDEXED_Y: u8 = 0x17;
pub const PRIMARY_STACK_RELATIVE: u8 = 0x03;
pub const PRIMARY_SR_INDIRECT_INDEXED_Y: u8 = 0x13;

pub const ADC_BASE: u8 = 0x60;
pub const AND_BASE: u8 = 0x20;
pub const CMP_BASE: u8 = 0xC0;
pub const EOR_BASE: u8 = 0x40;
pub const LDA_BASE: u8 = 0xA0;
pub const ORA_BASE: u8 = 0x00;
pub const SBC_BASE: u8 = 0xE0;
pub const STA_BASE: u8 = 0x80;

// Group 2 (asl, dec, inc, lsr, rol, ror, stx, sty): base | (mode << 2)
pub const G2_ACC: u8 = 0x2;
pub const G2_DP: u8 = 0x1;
pub const G2_ABS: u8 = 0x3;
pub const G2_DP_INDEXED: u8 = 0x5;
pub const G2_ABS_INDEXED: u8 = 0x7;

pub const ASL_BASE: u8 = 0x02;
pub const DEC_BASE: u8 = 0xC6;
pub const INC_BASE: u8 = 0xE6;
pub const LSR_BASE: u8 = 0x42;
pub const ROL_BASE: u8 = 0x22;
pub const ROR_BASE: u8 = 0x62;
pub const STX_BASE: u8 = 0x86;
pub const STY_BASE: u8 = 0x84;

pub const DEC_ACC: u8 = 0x3A;
pub const INC_ACC: u8 = 0x1A;

// Index loads and compares: base + offset
pub const INDEX_IMM: u8 = 0x00;
pub const INDEX_DP: u8 = 0x04;
pub const INDEX_ABS: u8 = 0x0C;
pub const INDEX_DP_INDEXED: u8 = 0x14;
pub const INDEX_ABS_INDEXED: u8 = 0x1C;

pub const LDX_BASE: u8 = 0xA2;
pub const LDY_BASE: u8 = 0xA0;
pub const CPX_BASE: u8 = 0xE0;
pub const CPY_BASE: u8 = 0xC0;

// Test-and-set/reset bits: base + offset
pub const TEST_DP: u8 = 0x04;
pub const TEST_ABS: u8 = 0x0C;

pub const TRB_BASE: u8 = 0x10;
pub const TSB_BASE: u8 = 0x00;

pub const BIT_IMM: u8 = 0x89;
pub const BIT_DP: u8 = 0x24;
pub const BIT_ABS: u8 = 0x2C;
pub const BIT_DP_INDEXED: u8 = 0x34;
pub const BIT_ABS_INDEXED: u8 = 0x3C;

pub const STZ_DP: u8 = 0x64;
pub const STZ_DP_INDEXED: u8 = 0x74;
pub const STZ_ABS: u8 = 0x9C;
pub const STZ_ABS_INDEXED: u8 = 0x9E;

// Branches
pub const BCC: u8 = 0x90;
pub const BCS: u8 = 0xB0;
pub const BEQ: u8 = 0xF0;
pub const BMI: u8 = 0x30;
pub const BNE: u8 = 0xD0;
pub const BPL: u8 = 0x10;
pub const BRA: u8 = 0x80;
pub const BVC: u8 = 0x50;
pub const BVS: u8 = 0x70;
pub const BRL: u8 = 0x82;

// Jumps and calls
pub const JMP_ABS: u8 = 0x4C;
pub const JMP_INDIRECT: u8 = 0x6C;
pub const JMP_INDEXED_INDIRECT: u8 = 0x7C;
pub const JML_ABS: u8 = 0x5C;
pub const JML_INDIRECT: u8 = 0xDC;
pub const JSL: u8 = 0x22;
pub const JSR_ABS: u8 = 0x20;
pub const JSR_INDEXED_INDIRECT: u8 = 0xFC;

// Stack pushes with operands
pub const PEA: u8 = 0xF4;
pub const PEI: u8 = 0xD4;
pub const PER: u8 = 0x62;

// Block moves
pub const MVN: u8 = 0x54;
pub const MVP: u8 = 0x44;

// One-byte immediate operand
pub const BRK: u8 = 0x00;
pub const COP: u8 = 0x02;
pub const REP: u8 = 0xC2;
pub const SEP: u8 = 0xE2;

// Implied
pub const CLC: u8 = 0x18;
pub const CLD: u8 = 0xD8;
pub const CLI: u8 = 0x58;
pub const CLV: u8 = 0xB8;
pub const DEX: u8 = 0xCA;
pub const DEY: u8 = 0x88;
pub const INX: u8 = 0xE8;
pub const INY: u8 = 0xC8;
pub const NOP: u8 = 0xEA;
pub const PHA: u8 = 0x48;
pub const PHB: u8 = 0x8B;
pub const PHD: u8 = 0x0B;
pub const PHK: u8 = 0x4B;
pub const PHP: u8 = 0x08;
pub const PHX: u8 = 0xDA;
pub const PHY: u8 = 0x5A;
pub const PLA: u8 = 0x68;
pub const PLB: u8 = 0xAB;
pub const PLD: u8 = 0x2B;
pub const PLP: u8 = 0x28;
pub const PLX: u8 = 0xFA;
pub const PLY: u8 = 0x7A;
pub const RTI: u8 = 0x40;
pub const RTL: u8 = 0x6B;
pub const RTS: u8 = 0x60;
pub const SEC: u8 = 0x38;
pub const SED: u8 = 0xF8;
pub const SEI: u8 = 0x78;
pub const STP: u8 = 0xDB;
pub const TAD: u8 = 0x5B;
pub const TAS: u8 = 0x1B;
pub const TAX: u8 = 0xAA;
pub const TAY: u8 = 0xA8;
pub const TDA: u8 = 0x7B;
pub const TSA: u8 = 0x3B;
pub const TSX: u8 = 0xBA;
pub const TXA: u8 = 0x8A;
pub const TXS: u8 = 0x9A;
pub const TXY: u8 = 0x9B;
pub const TYA: u8 = 0x98;
pub const TYX: u8 = 0xBB;
pub const WAI: u8 = 0xCB;
pub const XBA: u8 = 0xEB;
pub const XCE: u8 = 0xFB;
