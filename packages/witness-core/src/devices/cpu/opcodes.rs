//! The opcode decode table: a total function from all 256 encodings to
//! plain instruction metadata. Decoding never touches CPU state.

use super::structs::{AddressingMode, Mnemonic};

/// Everything the execution core needs to know about one opcode encoding.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Instruction length in bytes, opcode included.
    pub bytes: u8,
    /// Base cycle cost, before page-cross and branch penalties.
    pub cycles: u8,
    /// Whether a page-crossing access adds one cycle. Stores and
    /// read-modify-writes never set this; their base cost already covers the
    /// worst case.
    pub page_penalty: bool,
    /// False for the 105 encodings outside the documented set.
    pub documented: bool,
}

const fn op(
    mnemonic: Mnemonic,
    mode: AddressingMode,
    bytes: u8,
    cycles: u8,
    page_penalty: bool,
) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        bytes,
        cycles,
        page_penalty,
        documented: true,
    }
}

/// Undocumented encodings execute as one-byte, two-cycle no-ops (or halt the
/// machine when strict mode is on).
pub const UNDOCUMENTED: Opcode = Opcode {
    mnemonic: Mnemonic::NOP,
    mode: AddressingMode::Implied,
    bytes: 1,
    cycles: 2,
    page_penalty: false,
    documented: false,
};

/// Decode a single opcode byte.
#[rustfmt::skip]
pub fn decode(opcode: u8) -> Opcode {
    use AddressingMode::*;
    use Mnemonic::*;

    match opcode {
        // 0x0_
        0x00 => op(BRK, Implied, 1, 7, false),
        0x01 => op(ORA, IndexedIndirect, 2, 6, false),
        0x05 => op(ORA, ZeroPage, 2, 3, false),
        0x06 => op(ASL, ZeroPage, 2, 5, false),
        0x08 => op(PHP, Implied, 1, 3, false),
        0x09 => op(ORA, Immediate, 2, 2, false),
        0x0A => op(ASL, Accumulator, 1, 2, false),
        0x0D => op(ORA, Absolute, 3, 4, false),
        0x0E => op(ASL, Absolute, 3, 6, false),

        // 0x1_
        0x10 => op(BPL, Relative, 2, 2, false),
        0x11 => op(ORA, IndirectIndexed, 2, 5, true),
        0x15 => op(ORA, ZeroPageX, 2, 4, false),
        0x16 => op(ASL, ZeroPageX, 2, 6, false),
        0x18 => op(CLC, Implied, 1, 2, false),
        0x19 => op(ORA, AbsoluteY, 3, 4, true),
        0x1D => op(ORA, AbsoluteX, 3, 4, true),
        0x1E => op(ASL, AbsoluteX, 3, 7, false),

        // 0x2_
        0x20 => op(JSR, Absolute, 3, 6, false),
        0x21 => op(AND, IndexedIndirect, 2, 6, false),
        0x24 => op(BIT, ZeroPage, 2, 3, false),
        0x25 => op(AND, ZeroPage, 2, 3, false),
        0x26 => op(ROL, ZeroPage, 2, 5, false),
        0x28 => op(PLP, Implied, 1, 4, false),
        0x29 => op(AND, Immediate, 2, 2, false),
        0x2A => op(ROL, Accumulator, 1, 2, false),
        0x2C => op(BIT, Absolute, 3, 4, false),
        0x2D => op(AND, Absolute, 3, 4, false),
        0x2E => op(ROL, Absolute, 3, 6, false),

        // 0x3_
        0x30 => op(BMI, Relative, 2, 2, false),
        0x31 => op(AND, IndirectIndexed, 2, 5, true),
        0x35 => op(AND, ZeroPageX, 2, 4, false),
        0x36 => op(ROL, ZeroPageX, 2, 6, false),
        0x38 => op(SEC, Implied, 1, 2, false),
        0x39 => op(AND, AbsoluteY, 3, 4, true),
        0x3D => op(AND, AbsoluteX, 3, 4, true),
        0x3E => op(ROL, AbsoluteX, 3, 7, false),

        // 0x4_
        0x40 => op(RTI, Implied, 1, 6, false),
        0x41 => op(EOR, IndexedIndirect, 2, 6, false),
        0x45 => op(EOR, ZeroPage, 2, 3, false),
        0x46 => op(LSR, ZeroPage, 2, 5, false),
        0x48 => op(PHA, Implied, 1, 3, false),
        0x49 => op(EOR, Immediate, 2, 2, false),
        0x4A => op(LSR, Accumulator, 1, 2, false),
        0x4C => op(JMP, Absolute, 3, 3, false),
        0x4D => op(EOR, Absolute, 3, 4, false),
        0x4E => op(LSR, Absolute, 3, 6, false),

        // 0x5_
        0x50 => op(BVC, Relative, 2, 2, false),
        0x51 => op(EOR, IndirectIndexed, 2, 5, true),
        0x55 => op(EOR, ZeroPageX, 2, 4, false),
        0x56 => op(LSR, ZeroPageX, 2, 6, false),
        0x58 => op(CLI, Implied, 1, 2, false),
        0x59 => op(EOR, AbsoluteY, 3, 4, true),
        0x5D => op(EOR, AbsoluteX, 3, 4, true),
        0x5E => op(LSR, AbsoluteX, 3, 7, false),

        // 0x6_
        0x60 => op(RTS, Implied, 1, 6, false),
        0x61 => op(ADC, IndexedIndirect, 2, 6, false),
        0x65 => op(ADC, ZeroPage, 2, 3, false),
        0x66 => op(ROR, ZeroPage, 2, 5, false),
        0x68 => op(PLA, Implied, 1, 4, false),
        0x69 => op(ADC, Immediate, 2, 2, false),
        0x6A => op(ROR, Accumulator, 1, 2, false),
        0x6C => op(JMP, Indirect, 3, 5, false),
        0x6D => op(ADC, Absolute, 3, 4, false),
        0x6E => op(ROR, Absolute, 3, 6, false),

        // 0x7_
        0x70 => op(BVS, Relative, 2, 2, false),
        0x71 => op(ADC, IndirectIndexed, 2, 5, true),
        0x75 => op(ADC, ZeroPageX, 2, 4, false),
        0x76 => op(ROR, ZeroPageX, 2, 6, false),
        0x78 => op(SEI, Implied, 1, 2, false),
        0x79 => op(ADC, AbsoluteY, 3, 4, true),
        0x7D => op(ADC, AbsoluteX, 3, 4, true),
        0x7E => op(ROR, AbsoluteX, 3, 7, false),

        // 0x8_
        0x81 => op(STA, IndexedIndirect, 2, 6, false),
        0x84 => op(STY, ZeroPage, 2, 3, false),
        0x85 => op(STA, ZeroPage, 2, 3, false),
        0x86 => op(STX, ZeroPage, 2, 3, false),
        0x88 => op(DEY, Implied, 1, 2, false),
        0x8A => op(TXA, Implied, 1, 2, false),
        0x8C => op(STY, Absolute, 3, 4, false),
        0x8D => op(STA, Absolute, 3, 4, false),
        0x8E => op(STX, Absolute, 3, 4, false),

        // 0x9_
        0x90 => op(BCC, Relative, 2, 2, false),
        0x91 => op(STA, IndirectIndexed, 2, 6, false),
        0x94 => op(STY, ZeroPageX, 2, 4, false),
        0x95 => op(STA, ZeroPageX, 2, 4, false),
        0x96 => op(STX, ZeroPageY, 2, 4, false),
        0x98 => op(TYA, Implied, 1, 2, false),
        0x99 => op(STA, AbsoluteY, 3, 5, false),
        0x9A => op(TXS, Implied, 1, 2, false),
        0x9D => op(STA, AbsoluteX, 3, 5, false),

        // 0xA_
        0xA0 => op(LDY, Immediate, 2, 2, false),
        0xA1 => op(LDA, IndexedIndirect, 2, 6, false),
        0xA2 => op(LDX, Immediate, 2, 2, false),
        0xA4 => op(LDY, ZeroPage, 2, 3, false),
        0xA5 => op(LDA, ZeroPage, 2, 3, false),
        0xA6 => op(LDX, ZeroPage, 2, 3, false),
        0xA8 => op(TAY, Implied, 1, 2, false),
        0xA9 => op(LDA, Immediate, 2, 2, false),
        0xAA => op(TAX, Implied, 1, 2, false),
        0xAC => op(LDY, Absolute, 3, 4, false),
        0xAD => op(LDA, Absolute, 3, 4, false),
        0xAE => op(LDX, Absolute, 3, 4, false),

        // 0xB_
        0xB0 => op(BCS, Relative, 2, 2, false),
        0xB1 => op(LDA, IndirectIndexed, 2, 5, true),
        0xB4 => op(LDY, ZeroPageX, 2, 4, false),
        0xB5 => op(LDA, ZeroPageX, 2, 4, false),
        0xB6 => op(LDX, ZeroPageY, 2, 4, false),
        0xB8 => op(CLV, Implied, 1, 2, false),
        0xB9 => op(LDA, AbsoluteY, 3, 4, true),
        0xBA => op(TSX, Implied, 1, 2, false),
        0xBC => op(LDY, AbsoluteX, 3, 4, true),
        0xBD => op(LDA, AbsoluteX, 3, 4, true),
        0xBE => op(LDX, AbsoluteY, 3, 4, true),

        // 0xC_
        0xC0 => op(CPY, Immediate, 2, 2, false),
        0xC1 => op(CMP, IndexedIndirect, 2, 6, false),
        0xC4 => op(CPY, ZeroPage, 2, 3, false),
        0xC5 => op(CMP, ZeroPage, 2, 3, false),
        0xC6 => op(DEC, ZeroPage, 2, 5, false),
        0xC8 => op(INY, Implied, 1, 2, false),
        0xC9 => op(CMP, Immediate, 2, 2, false),
        0xCA => op(DEX, Implied, 1, 2, false),
        0xCC => op(CPY, Absolute, 3, 4, false),
        0xCD => op(CMP, Absolute, 3, 4, false),
        0xCE => op(DEC, Absolute, 3, 6, false),

        // 0xD_
        0xD0 => op(BNE, Relative, 2, 2, false),
        0xD1 => op(CMP, IndirectIndexed, 2, 5, true),
        0xD5 => op(CMP, ZeroPageX, 2, 4, false),
        0xD6 => op(DEC, ZeroPageX, 2, 6, false),
        0xD8 => op(CLD, Implied, 1, 2, false),
        0xD9 => op(CMP, AbsoluteY, 3, 4, true),
        0xDD => op(CMP, AbsoluteX, 3, 4, true),
        0xDE => op(DEC, AbsoluteX, 3, 7, false),

        // 0xE_
        0xE0 => op(CPX, Immediate, 2, 2, false),
        0xE1 => op(SBC, IndexedIndirect, 2, 6, false),
        0xE4 => op(CPX, ZeroPage, 2, 3, false),
        0xE5 => op(SBC, ZeroPage, 2, 3, false),
        0xE6 => op(INC, ZeroPage, 2, 5, false),
        0xE8 => op(INX, Implied, 1, 2, false),
        0xE9 => op(SBC, Immediate, 2, 2, false),
        0xEA => op(NOP, Implied, 1, 2, false),
        0xEC => op(CPX, Absolute, 3, 4, false),
        0xED => op(SBC, Absolute, 3, 4, false),
        0xEE => op(INC, Absolute, 3, 6, false),

        // 0xF_
        0xF0 => op(BEQ, Relative, 2, 2, false),
        0xF1 => op(SBC, IndirectIndexed, 2, 5, true),
        0xF5 => op(SBC, ZeroPageX, 2, 4, false),
        0xF6 => op(INC, ZeroPageX, 2, 6, false),
        0xF8 => op(SED, Implied, 1, 2, false),
        0xF9 => op(SBC, AbsoluteY, 3, 4, true),
        0xFD => op(SBC, AbsoluteX, 3, 4, true),
        0xFE => op(INC, AbsoluteX, 3, 7, false),

        _ => UNDOCUMENTED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_documented_entries() {
        let nop = decode(0xEA);
        assert_eq!(nop.mnemonic, Mnemonic::NOP);
        assert_eq!(nop.mode, AddressingMode::Implied);
        assert!(nop.documented);

        let sta = decode(0x9D);
        assert_eq!(sta.mnemonic, Mnemonic::STA);
        assert_eq!(sta.mode, AddressingMode::AbsoluteX);
        assert_eq!(sta.cycles, 5);
        assert!(!sta.page_penalty, "stores always pay the indexing cycle");

        let lda = decode(0xBD);
        assert_eq!(lda.cycles, 4);
        assert!(lda.page_penalty);
    }

    #[test]
    fn undocumented_encodings_are_short_nops() {
        for op in [0x02u8, 0x3A, 0x80, 0xF2, 0xFF] {
            let info = decode(op);
            assert_eq!(info, UNDOCUMENTED, "opcode {:02X}", op);
        }
    }

    #[test]
    fn documented_count_matches_the_6502_manual() {
        let documented = (0u16..=255)
            .filter(|op| decode(*op as u8).documented)
            .count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn lengths_follow_the_addressing_mode() {
        use AddressingMode::*;
        for opcode in 0u16..=255 {
            let info = decode(opcode as u8);
            if !info.documented {
                continue;
            }
            let expected = match info.mode {
                Implied | Accumulator => 1,
                Absolute | AbsoluteX | AbsoluteY | Indirect => 3,
                _ => 2,
            };
            assert_eq!(info.bytes, expected, "opcode {:02X}", opcode);
        }
    }
}
