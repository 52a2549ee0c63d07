mod ines;
mod nrom;

pub use ines::{parse_ines_header, INesFlags6, INesFlags7, INesHeader, RomError};
pub use nrom::NromCartridge;

/// The CPU-side cartridge boundary.
///
/// The core hands mappers the full CPU-space address ($4020-$FFFF) and never
/// looks behind the curtain: banking, mirroring and writability are entirely
/// the mapper's business. Both operations are total; a mapper always answers
/// with a byte and may silently ignore writes to ROM.
pub trait Mapper {
    fn prg_read(&mut self, addr: u16) -> u8;

    fn prg_write(&mut self, addr: u16, data: u8);

    /// Deterministic read for trace formatting. `None` when the mapper
    /// cannot answer without side effects.
    fn prg_peek(&self, addr: u16) -> Option<u8>;
}

/// Given an iNES ROM image, build the mapper it asks for.
pub fn from_rom(buf: &[u8]) -> Result<Box<dyn Mapper>, RomError> {
    let header = parse_ines_header(buf)?;
    match header.mapper {
        0 => Ok(Box::new(NromCartridge::new(&header, buf)?)),
        n => Err(RomError::UnsupportedMapper(n)),
    }
}
