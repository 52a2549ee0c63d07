//! Module for plain memory devices.

/// The console's internal work RAM.
///
/// Mirroring is handled by the address map, so all accesses here use local
/// addresses below the RAM size.
pub struct Ram {
    buf: Vec<u8>,
}

impl Ram {
    pub fn new(size: usize) -> Ram {
        Ram {
            buf: vec![0u8; size],
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.buf[addr as usize]
    }

    pub fn peek(&self, addr: u16) -> Option<u8> {
        self.buf.get(addr as usize).copied()
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.buf[addr as usize] = data;
    }
}
