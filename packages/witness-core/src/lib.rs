//! witness-core: cycle-counted emulation of the NES CPU (the Ricoh 2A03,
//! a MOS 6502 without decimal mode) and the devices on its address bus.
//!
//! The crate exposes a [`devices::nes::Nes`] machine that owns the CPU, the
//! 2 KiB of work RAM, stubs for the PPU/APU/controllers, and a boxed
//! [`devices::cartridge::Mapper`]. Frontends drive it one instruction at a
//! time with `step_instruction` or by cycle budget with `advance_cycles`.

#[macro_use]
extern crate bitflags;

pub mod devices;

/// Assemble a little-endian address from its low and high bytes.
#[macro_export]
macro_rules! bytes_to_addr {
    ($lo: expr, $hi: expr) => {{
        (u16::from($hi) << 8) | u16::from($lo)
    }};
}
