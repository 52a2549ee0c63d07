//! The cycle driver: run a raw PRG image from stdin for a fixed number of
//! CPU cycles, with a byte-wide debug port on the last address.

use std::io::{self, Read};

use clap::Parser;
use log::debug;

use witness_core::devices::cartridge::Mapper;
use witness_core::devices::nes::Nes;

const PRG_LEN: usize = 0x4000;

/// Emulate a NES CPU, where execution terminates after CYCLES cycles.
///
/// The PRG ROM is read in through stdin. The following memory map is used:
///
///   $0000-$07FF: internal RAM
///   $8000-$BFFF: PRG ROM (read-only)
///   $C000-$FFFE: mirrored PRG ROM (minus the last byte)
///   $FFFF-$FFFF: stdout (write-only)
#[derive(Parser)]
#[command(name = "witness-cpu", verbatim_doc_comment)]
struct Args {
    /// Number of CPU cycles to execute before terminating
    cycles: u64,
}

/// A bare 16 KiB PRG image with the reset vector pinned to $8000. Writes to
/// $FFFF print the byte to stdout as two hex digits.
struct VectorMapper {
    prg: Vec<u8>,
}

impl VectorMapper {
    fn from_stdin() -> io::Result<VectorMapper> {
        let mut prg = Vec::with_capacity(PRG_LEN);
        // A short read just leaves the rest of the image zeroed; EOF is
        // expected, not an error.
        io::stdin().take(PRG_LEN as u64).read_to_end(&mut prg)?;
        prg.resize(PRG_LEN, 0x00);
        prg[0xFFFC % PRG_LEN] = 0x00;
        prg[0xFFFD % PRG_LEN] = 0x80;
        Ok(VectorMapper { prg })
    }
}

impl Mapper for VectorMapper {
    fn prg_read(&mut self, addr: u16) -> u8 {
        if addr < 0x8000 {
            return 0x00;
        }
        self.prg[addr as usize % PRG_LEN]
    }

    fn prg_write(&mut self, addr: u16, data: u8) {
        if addr == 0xFFFF {
            println!("${:02x}", data);
        }
    }

    fn prg_peek(&self, addr: u16) -> Option<u8> {
        if addr < 0x8000 {
            Some(0x00)
        } else {
            Some(self.prg[addr as usize % PRG_LEN])
        }
    }
}

fn run() -> i32 {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("LOG_LEVEL", "info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return 1;
        }
    };

    let mapper = match VectorMapper::from_stdin() {
        Ok(mapper) => mapper,
        Err(err) => {
            eprintln!("failed to read PRG ROM: {}", err);
            return 1;
        }
    };

    let mut nes = Nes::new(Box::new(mapper));
    debug!("running for {} cycles", args.cycles);
    if let Err(halt) = nes.advance_cycles(args.cycles) {
        eprintln!("execution halted: {}", halt);
        return 1;
    }
    0
}

fn main() {
    // Exit codes are 8 bits on POSIX, which is all run() hands back.
    std::process::exit(run());
}
