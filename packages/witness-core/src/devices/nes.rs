//! The machine: the CPU and every device on its address bus wired together.

use super::apu::Apu;
use super::bus::{cpu_memory_map, cpu_memory_map::Device, CpuBus, OPEN_BUS};
use super::cartridge::Mapper;
use super::controller::{Buttons, Controller};
use super::cpu::{self, Cpu, CpuHalt, Status, WithCpu};
use super::mem::Ram;
use super::ppu::{Ppu, OAM_SIZE};

const RAM_SIZE: usize = 2048;

/// Construction-time configuration.
#[derive(Debug, Default, Copy, Clone)]
pub struct MachineOptions {
    /// Halt with a diagnostic on undocumented opcodes instead of running
    /// them as two-cycle no-ops.
    pub strict: bool,
}

/// A NES, minus the picture and the sound.
pub struct Nes {
    cpu: Cpu,
    ram: Ram,
    ppu: Ppu,
    apu: Apu,
    joy1: Controller,
    joy2: Controller,
    cart: Box<dyn Mapper>,
    /// Cycles already executed beyond what the last `advance_cycles` asked
    /// for, settled before the next request runs anything.
    cycle_surplus: u64,
}

impl Nes {
    pub fn new(cart: Box<dyn Mapper>) -> Nes {
        Nes::with_options(cart, MachineOptions::default())
    }

    pub fn with_options(cart: Box<dyn Mapper>, options: MachineOptions) -> Nes {
        let mut nes = Nes {
            cpu: Cpu::new(options.strict),
            ram: Ram::new(RAM_SIZE),
            ppu: Ppu::new(),
            apu: Apu::new(),
            joy1: Controller::new(),
            joy2: Controller::new(),
            cart,
            cycle_surplus: 0,
        };
        // The very first thing a 6502 does is chase the reset vector.
        let pc = nes.read16(cpu::RESET_VECTOR);
        nes.cpu.state.pc = pc;
        nes
    }

    /// Execute exactly one instruction (or one pending interrupt) and return
    /// the number of cycles it consumed.
    pub fn step_instruction(&mut self) -> Result<u32, CpuHalt> {
        cpu::exec(self)
    }

    /// Run whole instructions until at least `n` cycles have elapsed since
    /// this call, and return the cycles actually executed.
    ///
    /// Partial instructions are never observable: when an instruction
    /// overshoots the budget, the overshoot is remembered and settled
    /// against the next call.
    pub fn advance_cycles(&mut self, n: u64) -> Result<u64, CpuHalt> {
        if self.cycle_surplus >= n {
            self.cycle_surplus -= n;
            return Ok(0);
        }
        let mut remaining = n - self.cycle_surplus;
        self.cycle_surplus = 0;
        let mut elapsed = 0u64;
        while remaining > 0 {
            let cycles = u64::from(self.step_instruction()?);
            elapsed += cycles;
            if cycles >= remaining {
                self.cycle_surplus = cycles - remaining;
                remaining = 0;
            } else {
                remaining -= cycles;
            }
        }
        Ok(elapsed)
    }

    /// Format the next instruction as a trace-log line, then execute it.
    pub fn dbg_step(&mut self) -> Result<String, CpuHalt> {
        let line = cpu::format_trace(&*self);
        self.step_instruction()?;
        Ok(line)
    }

    /// Trigger a hardware reset.
    ///
    /// This is not the same as power cycling: RAM and registers keep their
    /// values, the CPU just slips its stack pointer and chases the reset
    /// vector again.
    pub fn reset(&mut self) {
        cpu::reset(self);
    }

    /// Trigger a non-maskable interrupt ahead of the next instruction.
    pub fn trigger_nmi(&mut self) {
        cpu::trigger_nmi(self);
    }

    /// Trigger a maskable interrupt ahead of the next instruction.
    pub fn trigger_irq(&mut self) {
        cpu::trigger_irq(self);
    }

    pub fn set_joypad1(&mut self, buttons: Buttons) {
        self.joy1.set_buttons(buttons);
    }

    pub fn set_joypad2(&mut self, buttons: Buttons) {
        self.joy2.set_buttons(buttons);
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    //region Inspection surface for tests and the debugger
    pub fn pc(&self) -> u16 {
        self.cpu.state.pc
    }

    pub fn sp(&self) -> u8 {
        self.cpu.state.sp
    }

    pub fn a(&self) -> u8 {
        self.cpu.state.a
    }

    pub fn x(&self) -> u8 {
        self.cpu.state.x
    }

    pub fn y(&self) -> u8 {
        self.cpu.state.y
    }

    pub fn p(&self) -> u8 {
        self.cpu.state.status.bits()
    }

    pub fn cycles(&self) -> u64 {
        self.cpu.state.tot_cycles
    }

    pub fn get_carry(&self) -> bool {
        self.cpu.state.status.contains(Status::CARRY)
    }

    pub fn get_zero(&self) -> bool {
        self.cpu.state.status.contains(Status::ZERO)
    }

    pub fn get_interrupt_disable(&self) -> bool {
        self.cpu.state.status.contains(Status::IRQ_DISABLE)
    }

    pub fn get_decimal(&self) -> bool {
        self.cpu.state.status.contains(Status::DECIMAL)
    }

    pub fn get_overflow(&self) -> bool {
        self.cpu.state.status.contains(Status::OVERFLOW)
    }

    pub fn get_negative(&self) -> bool {
        self.cpu.state.status.contains(Status::NEGATIVE)
    }
    //endregion

    /// Copy one page from the bus into the PPU's sprite memory and charge
    /// the CPU for the transfer: 513 cycles, 514 when it starts on an odd
    /// cycle.
    fn oam_dma(&mut self, page_hi: u8) {
        let base = u16::from(page_hi) << 8;
        let mut page = [0u8; OAM_SIZE];
        for (i, slot) in page.iter_mut().enumerate() {
            *slot = self.read(base.wrapping_add(i as u16));
        }
        self.ppu.dma_copy(&page);
        let parity = (self.cpu.state.tot_cycles & 1) as u32;
        self.cpu.dma_stall += 513 + parity;
    }
}

impl CpuBus for Nes {
    fn read(&mut self, addr: u16) -> u8 {
        let (device, local) = cpu_memory_map::match_addr(addr);
        match device {
            Device::Ram => self.ram.read(local),
            Device::PpuControl => self.ppu.read_register(local),
            Device::Joy1 => self.joy1.read_serial(),
            Device::Joy2 => self.joy2.read_serial(),
            Device::Cartridge => self.cart.prg_read(local),
            // $4014 is write-only, the APU window is unimplemented, and
            // test mode is disabled on production hardware.
            Device::OamDma | Device::Apu | Device::TestMode => OPEN_BUS,
        }
    }

    fn peek(&self, addr: u16) -> Option<u8> {
        let (device, local) = cpu_memory_map::match_addr(addr);
        match device {
            Device::Ram => self.ram.peek(local),
            Device::Cartridge => self.cart.prg_peek(local),
            _ => None,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        let (device, local) = cpu_memory_map::match_addr(addr);
        match device {
            Device::Ram => self.ram.write(local, data),
            Device::PpuControl => self.ppu.write_register(local, data),
            Device::OamDma => self.oam_dma(data),
            // A strobe write drives both controller latches.
            Device::Joy1 => {
                self.joy1.write_strobe(data);
                self.joy2.write_strobe(data);
            }
            Device::Joy2 => self.apu.write_frame_counter(data),
            Device::Apu => self.apu.write_register(local, data),
            Device::TestMode => {}
            Device::Cartridge => self.cart.prg_write(local, data),
        }
    }
}

impl WithCpu for Nes {
    fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }
}
