//! Trace-log formatting for the debugger and CPU-log comparison tests.
//!
//! Produces one line per instruction in the classic nestest log layout. The
//! formatter only uses `peek`, so tracing never disturbs the machine; ports
//! that cannot be read deterministically show up as the `$A5` debug pattern.

use super::super::bus::CpuBus;
use super::cpu::WithCpu;
use super::opcodes::{decode, Opcode};
use super::structs::AddressingMode;
use crate::bytes_to_addr;

fn peek_or(mb: &impl CpuBus, addr: u16) -> u8 {
    mb.peek(addr).unwrap_or(0xA5)
}

/// Format the instruction at the current PC along with the register file.
pub fn format_trace<T: WithCpu + CpuBus>(mb: &T) -> String {
    let state = &mb.cpu().state;
    let pc = state.pc;
    let opcode = peek_or(mb, pc);
    let info = decode(opcode);
    let op1 = peek_or(mb, pc.wrapping_add(1));
    let op2 = peek_or(mb, pc.wrapping_add(2));

    let raw = match info.bytes {
        1 => format!("{:02X}      ", opcode),
        2 => format!("{:02X} {:02X}   ", opcode, op1),
        _ => format!("{:02X} {:02X} {:02X}", opcode, op1, op2),
    };

    format!(
        "{:04X}  {:8}  {:32}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PPU:{:>3},{:>3} CYC:{}",
        pc,
        raw,
        disassemble(mb, &info, op1, op2),
        state.a,
        state.x,
        state.y,
        state.status.bits(),
        state.sp,
        0,
        0,
        state.tot_cycles
    )
}

fn disassemble<T: WithCpu + CpuBus>(mb: &T, info: &Opcode, op1: u8, op2: u8) -> String {
    use AddressingMode::*;
    let state = &mb.cpu().state;
    let name = info.mnemonic;
    let operand16 = bytes_to_addr!(op1, op2);
    match info.mode {
        Implied => format!("{:3?}", name),
        Accumulator => format!("{:3?} A", name),
        Immediate => format!("{:3?} #${:02X}", name, op1),
        ZeroPage => format!("{:3?} ${:02X} = {:02X}", name, op1, peek_or(mb, u16::from(op1))),
        ZeroPageX => {
            let addr = op1.wrapping_add(state.x);
            format!(
                "{:3?} ${:02X},X @ {:02X} = {:02X}",
                name,
                op1,
                addr,
                peek_or(mb, u16::from(addr))
            )
        }
        ZeroPageY => {
            let addr = op1.wrapping_add(state.y);
            format!(
                "{:3?} ${:02X},Y @ {:02X} = {:02X}",
                name,
                op1,
                addr,
                peek_or(mb, u16::from(addr))
            )
        }
        Relative => {
            let target = state
                .pc
                .wrapping_add(2)
                .wrapping_add(op1 as i8 as u16);
            format!("{:3?} ${:04X}", name, target)
        }
        Absolute => {
            if matches!(name, super::structs::Mnemonic::JMP | super::structs::Mnemonic::JSR) {
                format!("{:3?} ${:04X}", name, operand16)
            } else {
                format!(
                    "{:3?} ${:04X} = {:02X}",
                    name,
                    operand16,
                    peek_or(mb, operand16)
                )
            }
        }
        AbsoluteX => {
            let addr = operand16.wrapping_add(u16::from(state.x));
            format!(
                "{:3?} ${:04X},X @ {:04X} = {:02X}",
                name,
                operand16,
                addr,
                peek_or(mb, addr)
            )
        }
        AbsoluteY => {
            let addr = operand16.wrapping_add(u16::from(state.y));
            format!(
                "{:3?} ${:04X},Y @ {:04X} = {:02X}",
                name,
                operand16,
                addr,
                peek_or(mb, addr)
            )
        }
        Indirect => {
            let lo = peek_or(mb, operand16);
            let hi = peek_or(mb, (operand16 & 0xFF00) | (operand16.wrapping_add(1) & 0x00FF));
            format!(
                "{:3?} (${:04X}) = {:04X}",
                name,
                operand16,
                bytes_to_addr!(lo, hi)
            )
        }
        IndexedIndirect => {
            let ptr = op1.wrapping_add(state.x);
            let lo = peek_or(mb, u16::from(ptr));
            let hi = peek_or(mb, u16::from(ptr.wrapping_add(1)));
            let addr = bytes_to_addr!(lo, hi);
            format!(
                "{:3?} (${:02X},X) @ {:02X} = {:04X} = {:02X}",
                name,
                op1,
                ptr,
                addr,
                peek_or(mb, addr)
            )
        }
        IndirectIndexed => {
            let lo = peek_or(mb, u16::from(op1));
            let hi = peek_or(mb, u16::from(op1.wrapping_add(1)));
            let base = bytes_to_addr!(lo, hi);
            let addr = base.wrapping_add(u16::from(state.y));
            format!(
                "{:3?} (${:02X}),Y = {:04X} @ {:04X} = {:02X}",
                name,
                op1,
                base,
                addr,
                peek_or(mb, addr)
            )
        }
    }
}
