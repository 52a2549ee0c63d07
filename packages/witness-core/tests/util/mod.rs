//! Shared harness for the integration tests.
#![allow(dead_code)]

use witness_core::devices::cartridge::Mapper;
use witness_core::devices::nes::{MachineOptions, Nes};

/// A flat 64 KiB test mapper. The program sits at $8000, the reset vector
/// points at it, and cartridge-space writes land in the backing buffer so
/// tests can seed arbitrary memory through the bus.
pub struct FlatCartridge {
    mem: Vec<u8>,
}

impl FlatCartridge {
    pub fn with_program(program: &[u8]) -> Box<FlatCartridge> {
        let mut mem = vec![0u8; 0x10000];
        mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
        mem[0xFFFC] = 0x00;
        mem[0xFFFD] = 0x80;
        Box::new(FlatCartridge { mem })
    }
}

impl Mapper for FlatCartridge {
    fn prg_read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn prg_write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }

    fn prg_peek(&self, addr: u16) -> Option<u8> {
        Some(self.mem[addr as usize])
    }
}

/// A machine running `program` from $8000, with RAM zeroed and the power-on
/// register file (A=X=Y=0, P=$24, SP=$FD).
pub fn machine(program: &[u8]) -> Nes {
    Nes::new(FlatCartridge::with_program(program))
}

pub fn strict_machine(program: &[u8]) -> Nes {
    Nes::with_options(
        FlatCartridge::with_program(program),
        MachineOptions { strict: true },
    )
}

/// Step `n` instructions, panicking on a halt.
pub fn step_n(nes: &mut Nes, n: usize) -> u32 {
    let mut total = 0;
    for _ in 0..n {
        total += nes.step_instruction().expect("unexpected halt");
    }
    total
}
