//! Mapper 0: no banking hardware at all.
//!
//! PRG is 16 KiB (mirrored across $8000-$FFFF) or a flat 32 KiB, and is
//! read-only. CHR lives on the PPU bus and is not part of the CPU-side
//! contract, so the loader only validates that it is present.

use super::ines::{INesHeader, RomError, CHR_BANK_LEN, PRG_BANK_LEN};
use super::Mapper;

pub struct NromCartridge {
    prg: Vec<u8>,
    is_16k: bool,
}

impl NromCartridge {
    pub fn new(header: &INesHeader, buf: &[u8]) -> Result<NromCartridge, RomError> {
        let prg_len = header.prg_banks.max(1) * PRG_BANK_LEN;
        let chr_len = header.chr_banks * CHR_BANK_LEN;
        let expected = header.prg_offset + prg_len + chr_len;
        if buf.len() < expected {
            return Err(RomError::ShortRom {
                expected,
                actual: buf.len(),
            });
        }
        Ok(NromCartridge {
            prg: buf[header.prg_offset..header.prg_offset + prg_len].to_vec(),
            is_16k: prg_len == PRG_BANK_LEN,
        })
    }

    fn prg_index(&self, addr: u16) -> Option<usize> {
        if addr < 0x8000 {
            return None;
        }
        let local = (addr - 0x8000) as usize;
        Some(if self.is_16k { local & 0x3FFF } else { local })
    }
}

impl Mapper for NromCartridge {
    fn prg_read(&mut self, addr: u16) -> u8 {
        self.prg_peek(addr).unwrap_or(0x00)
    }

    fn prg_write(&mut self, _addr: u16, _data: u8) {
        // no-op: NROM PRG is mask ROM
    }

    fn prg_peek(&self, addr: u16) -> Option<u8> {
        self.prg_index(addr).map(|i| self.prg[i])
    }
}

#[cfg(test)]
mod tests {
    use super::super::ines::{parse_ines_header, HEADER_LEN};
    use super::*;

    /// Assemble a 16k NROM image whose PRG bytes count up from the bank
    /// offset, so mirroring is easy to spot.
    fn build_rom() -> Vec<u8> {
        let mut rom = vec![0u8; HEADER_LEN + PRG_BANK_LEN + CHR_BANK_LEN];
        rom[0..4].copy_from_slice(&[0x4E, 0x45, 0x53, 0x1A]);
        rom[4] = 1;
        rom[5] = 1;
        for i in 0..PRG_BANK_LEN {
            rom[HEADER_LEN + i] = (i % 251) as u8;
        }
        rom
    }

    fn build_cart() -> NromCartridge {
        let rom = build_rom();
        let header = parse_ines_header(&rom).unwrap();
        NromCartridge::new(&header, &rom).unwrap()
    }

    #[test]
    fn mirrors_16k_prg_across_both_banks() {
        let mut cart = build_cart();
        assert_eq!(cart.prg_read(0x8123), cart.prg_read(0xC123));
        assert_eq!(cart.prg_read(0x8000), 0x00);
        assert_eq!(cart.prg_read(0xC001), 0x01);
    }

    #[test]
    fn reads_below_prg_space_come_back_empty() {
        let mut cart = build_cart();
        assert_eq!(cart.prg_read(0x6000), 0x00);
        assert_eq!(cart.prg_peek(0x6000), None);
    }

    #[test]
    fn writes_to_rom_are_dropped() {
        let mut cart = build_cart();
        let before = cart.prg_read(0x8010);
        cart.prg_write(0x8010, !before);
        assert_eq!(cart.prg_read(0x8010), before);
    }

    #[test]
    fn truncated_prg_is_rejected() {
        let mut rom = build_rom();
        rom.truncate(HEADER_LEN + 100);
        let header = parse_ines_header(&rom).unwrap();
        assert!(matches!(
            NromCartridge::new(&header, &rom),
            Err(RomError::ShortRom { .. })
        ));
    }
}
