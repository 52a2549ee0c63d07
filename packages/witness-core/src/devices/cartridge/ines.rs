//! Helpers for parsing iNES ROM files.

use thiserror::Error;

/// Errors raised while loading a ROM image, before any machine exists.
#[derive(Debug, Eq, PartialEq, Error)]
pub enum RomError {
    #[error("not an iNES image (bad magic)")]
    BadHeader,
    #[error("ROM image truncated: expected {expected} bytes, got {actual}")]
    ShortRom { expected: usize, actual: usize },
    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u8),
}

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_BANK_LEN: usize = 16 * 1024;
pub const CHR_BANK_LEN: usize = 8 * 1024;

const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A]; // "NES\x1A"

/// A parsed iNES header.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct INesHeader {
    /// The size of the PRG chunk, in 16k banks.
    pub prg_banks: usize,
    /// The size of the CHR chunk, in 8k banks.
    pub chr_banks: usize,
    /// Mirroring, battery, trainer, lower mapper nibble.
    pub flags_6: INesFlags6,
    /// VS/PlayChoice, NES 2.0 indicator, upper mapper nibble.
    pub flags_7: INesFlags7,
    /// The assembled mapper number.
    pub mapper: u8,
    /// Byte offset of the PRG data within the image (the header, plus the
    /// trainer when one is present).
    pub prg_offset: usize,
}

bitflags! {
    pub struct INesFlags6: u8 {
        /// 0 for horizontal (vertical arrangement) mirroring, 1 for vertical.
        const MIRRORING = 0x01;
        /// Battery-backed PRG RAM is present.
        const HAS_PERSISTENT_MEMORY = 0x02;
        /// A 512-byte trainer precedes the PRG data.
        const HAS_TRAINER = 0x04;
        /// Use four-screen VRAM instead of mirroring.
        const USE_FOUR_SCREEN_VRAM = 0x08;
        /// The lower nibble of the mapper number.
        const LOWER_MAPPER_NIBBLE = 0xF0;
    }
}

bitflags! {
    pub struct INesFlags7: u8 {
        /// Developed for the VS arcade system.
        const VS_UNISYSTEM_ROM = 0x01;
        /// Includes 8k of PlayChoice hint data after CHR.
        const PLAYCHOICE_10 = 0x02;
        /// When equal to 2 (`0b10`), the header is in NES 2.0 format.
        const IS_INES_2_0 = 0x0C;
        /// The upper nibble of the mapper number.
        const UPPER_MAPPER_NIBBLE = 0xF0;
    }
}

/// Parse and validate an iNES header from the start of a ROM image.
pub fn parse_ines_header(bytes: &[u8]) -> Result<INesHeader, RomError> {
    if bytes.len() < HEADER_LEN {
        return Err(RomError::ShortRom {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[0..4] != MAGIC {
        return Err(RomError::BadHeader);
    }

    let flags_6 = INesFlags6::from_bits_truncate(bytes[6]);
    let flags_7 = INesFlags7::from_bits_truncate(bytes[7]);
    let mapper = (bytes[7] & 0xF0) | (bytes[6] >> 4);
    let prg_offset = if flags_6.contains(INesFlags6::HAS_TRAINER) {
        HEADER_LEN + TRAINER_LEN
    } else {
        HEADER_LEN
    };

    Ok(INesHeader {
        prg_banks: bytes[4] as usize,
        chr_banks: bytes[5] as usize,
        flags_6,
        flags_7,
        mapper,
        prg_offset,
    })
}
