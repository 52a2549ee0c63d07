//! The instruction interpreter.
//!
//! Execution is written as free functions over anything that is both a
//! [`WithCpu`] and a [`CpuBus`], so the machine can route bus side effects
//! (DMA stalls, controller shifts) back into the CPU while an instruction is
//! in flight.

use log::{info, trace, warn};

use super::super::bus::CpuBus;
use super::opcodes;
use super::structs::{AddressingMode, CpuHalt, CpuState, Mnemonic, Status, POWERON_CPU_STATE};
use crate::bytes_to_addr;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycle cost of servicing an NMI, IRQ or BRK.
const INTERRUPT_CYCLES: u32 = 7;

pub struct Cpu {
    /// The architectural register file.
    pub state: CpuState,
    /// Penalty cycles charged by the executing instruction (taken branches).
    extra_cycles: u32,
    /// Cycles owed to an OAM DMA triggered by a bus write mid-instruction.
    pub(crate) dma_stall: u32,
    /// Whether an interrupt is pending
    interrupt_pending: bool,
    /// Whether that interrupt was generated by an NMI (false) or IRQ (true)
    maskable_interrupt: bool,
    /// In strict mode, undocumented opcodes halt execution instead of
    /// degrading to no-ops.
    strict: bool,
}

impl Cpu {
    pub fn new(strict: bool) -> Cpu {
        Cpu {
            state: POWERON_CPU_STATE,
            extra_cycles: 0,
            dma_stall: 0,
            interrupt_pending: false,
            maskable_interrupt: false,
            strict,
        }
    }
}

/// Trait for a device that owns a CPU, such as the machine or a test
/// harness.
pub trait WithCpu {
    fn cpu(&self) -> &Cpu;
    fn cpu_mut(&mut self) -> &mut Cpu;
}

/// Execute one instruction (or service one pending interrupt) and return the
/// whole number of cycles it consumed.
pub fn exec<T: WithCpu + CpuBus>(mb: &mut T) -> Result<u32, CpuHalt> {
    if let Some(cycles) = run_interrupt(mb) {
        mb.cpu_mut().state.tot_cycles += u64::from(cycles);
        return Ok(cycles);
    }

    let pc = mb.cpu().state.pc;
    let opcode = mb.read(pc);
    let info = opcodes::decode(opcode);
    if !info.documented {
        if mb.cpu().strict {
            return Err(CpuHalt::UnknownOpcode { pc, opcode });
        }
        warn!(
            "undocumented opcode ${:02X} at ${:04X}, executing as NOP",
            opcode, pc
        );
    }
    trace!("execute ${:02X} at ${:04X}", opcode, pc);

    mb.cpu_mut().extra_cycles = 0;
    let operand = resolve(mb, info.mode);
    mb.cpu_mut().state.pc = pc.wrapping_add(u16::from(info.bytes));
    dispatch(mb, info.mnemonic, &operand);

    let cpu = mb.cpu_mut();
    let mut cycles = u32::from(info.cycles) + cpu.extra_cycles;
    if operand.page_crossed && info.page_penalty {
        cycles += 1;
    }
    cycles += cpu.dma_stall;
    cpu.dma_stall = 0;
    cpu.state.tot_cycles += u64::from(cycles);
    Ok(cycles)
}

/// Load the reset vector and re-arm the CPU. Nothing is pushed; the stack
/// pointer just slips down by three as if the pushes had happened.
pub fn reset<T: WithCpu + CpuBus>(mb: &mut T) {
    let pc = mb.read16(RESET_VECTOR);
    let cpu = mb.cpu_mut();
    cpu.state.sp = cpu.state.sp.wrapping_sub(3);
    cpu.state.status.insert(Status::IRQ_DISABLE);
    cpu.state.pc = pc;
}

/// Request a non-maskable interrupt, serviced before the next instruction.
pub fn trigger_nmi<T: WithCpu>(mb: &mut T) {
    let cpu = mb.cpu_mut();
    cpu.interrupt_pending = true;
    cpu.maskable_interrupt = false;
}

/// Request a maskable interrupt. Ignored while the I flag is set.
pub fn trigger_irq<T: WithCpu>(mb: &mut T) {
    let cpu = mb.cpu_mut();
    if cpu.state.status.contains(Status::IRQ_DISABLE) {
        return; // interrupt ignored
    }
    cpu.interrupt_pending = true;
    cpu.maskable_interrupt = true;
}

fn run_interrupt<T: WithCpu + CpuBus>(mb: &mut T) -> Option<u32> {
    if !mb.cpu().interrupt_pending {
        return None;
    }
    let maskable = mb.cpu().maskable_interrupt;
    info!("servicing {}", if maskable { "IRQ" } else { "NMI" });
    mb.cpu_mut().interrupt_pending = false;

    let pc = mb.cpu().state.pc;
    push_stack(mb, (pc >> 8) as u8);
    push_stack(mb, (pc & 0xFF) as u8);
    let pushed = (mb.cpu().state.status - Status::BREAK) | Status::UNUSED;
    push_stack(mb, pushed.bits());
    mb.cpu_mut().state.status.insert(Status::IRQ_DISABLE);

    let vector = if maskable { IRQ_VECTOR } else { NMI_VECTOR };
    let target = mb.read16(vector);
    mb.cpu_mut().state.pc = target;
    Some(INTERRUPT_CYCLES)
}

/// A resolved operand: the addressing mode it came from, the effective
/// address (where one exists), and whether resolution crossed a page.
#[derive(Debug, Copy, Clone)]
struct Operand {
    mode: AddressingMode,
    addr: u16,
    page_crossed: bool,
}

fn crossed_page(from: u16, to: u16) -> bool {
    from & 0xFF00 != to & 0xFF00
}

/// Compute the effective address for the instruction at the current PC.
///
/// Operand bytes are fetched here, and only the bytes the mode actually
/// uses; reads on this bus are not side-effect free.
fn resolve<T: WithCpu + CpuBus>(mb: &mut T, mode: AddressingMode) -> Operand {
    let pc = mb.cpu().state.pc;
    let x = mb.cpu().state.x;
    let y = mb.cpu().state.y;
    let (addr, page_crossed) = match mode {
        AddressingMode::Implied | AddressingMode::Accumulator => (0x0000, false),
        AddressingMode::Immediate => (pc.wrapping_add(1), false),
        AddressingMode::ZeroPage => (u16::from(mb.read(pc.wrapping_add(1))), false),
        // Zero-page indexing wraps within page zero; the carry is discarded.
        AddressingMode::ZeroPageX => {
            (u16::from(mb.read(pc.wrapping_add(1)).wrapping_add(x)), false)
        }
        AddressingMode::ZeroPageY => {
            (u16::from(mb.read(pc.wrapping_add(1)).wrapping_add(y)), false)
        }
        AddressingMode::Relative => {
            let offset = mb.read(pc.wrapping_add(1)) as i8;
            let base = pc.wrapping_add(2);
            let target = base.wrapping_add(offset as u16);
            (target, crossed_page(base, target))
        }
        AddressingMode::Absolute => (mb.read16(pc.wrapping_add(1)), false),
        AddressingMode::AbsoluteX => {
            let base = mb.read16(pc.wrapping_add(1));
            let addr = base.wrapping_add(u16::from(x));
            (addr, crossed_page(base, addr))
        }
        AddressingMode::AbsoluteY => {
            let base = mb.read16(pc.wrapping_add(1));
            let addr = base.wrapping_add(u16::from(y));
            (addr, crossed_page(base, addr))
        }
        AddressingMode::Indirect => {
            // The pointer's high byte is fetched without carrying into the
            // next page: a pointer at $xxFF wraps to $xx00.
            let ptr = mb.read16(pc.wrapping_add(1));
            let lo = mb.read(ptr);
            let hi = mb.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
            (bytes_to_addr!(lo, hi), false)
        }
        AddressingMode::IndexedIndirect => {
            let ptr = mb.read(pc.wrapping_add(1)).wrapping_add(x);
            let lo = mb.read(u16::from(ptr));
            let hi = mb.read(u16::from(ptr.wrapping_add(1)));
            (bytes_to_addr!(lo, hi), false)
        }
        AddressingMode::IndirectIndexed => {
            let ptr = mb.read(pc.wrapping_add(1));
            let lo = mb.read(u16::from(ptr));
            let hi = mb.read(u16::from(ptr.wrapping_add(1)));
            let base = bytes_to_addr!(lo, hi);
            let addr = base.wrapping_add(u16::from(y));
            (addr, crossed_page(base, addr))
        }
    };
    Operand {
        mode,
        addr,
        page_crossed,
    }
}

/// Read the operand value: the accumulator for accumulator-mode
/// instructions, memory at the effective address otherwise.
fn read_operand<T: WithCpu + CpuBus>(mb: &mut T, op: &Operand) -> u8 {
    match op.mode {
        AddressingMode::Accumulator => mb.cpu().state.a,
        _ => mb.read(op.addr),
    }
}

fn write_operand<T: WithCpu + CpuBus>(mb: &mut T, op: &Operand, data: u8) {
    match op.mode {
        AddressingMode::Accumulator => mb.cpu_mut().state.a = data,
        _ => mb.write(op.addr, data),
    }
}

fn push_stack<T: WithCpu + CpuBus>(mb: &mut T, data: u8) {
    let sp = mb.cpu().state.sp;
    mb.write(bytes_to_addr!(sp, 0x01u8), data);
    mb.cpu_mut().state.sp = sp.wrapping_sub(1);
}

fn pop_stack<T: WithCpu + CpuBus>(mb: &mut T) -> u8 {
    let sp = mb.cpu().state.sp.wrapping_add(1);
    mb.cpu_mut().state.sp = sp;
    mb.read(bytes_to_addr!(sp, 0x01u8))
}

fn check_zero<T: WithCpu>(mb: &mut T, val: u8) {
    mb.cpu_mut().state.status.set(Status::ZERO, val == 0);
}

fn check_negative<T: WithCpu>(mb: &mut T, val: u8) {
    mb.cpu_mut()
        .state
        .status
        .set(Status::NEGATIVE, val & 0x80 != 0);
}

fn check_zero_negative<T: WithCpu>(mb: &mut T, val: u8) {
    check_zero(mb, val);
    check_negative(mb, val);
}

fn dispatch<T: WithCpu + CpuBus>(mb: &mut T, mnemonic: Mnemonic, op: &Operand) {
    use Mnemonic::*;
    match mnemonic {
        LDA => op_lda(mb, op),
        LDX => op_ldx(mb, op),
        LDY => op_ldy(mb, op),
        STA => op_sta(mb, op),
        STX => op_stx(mb, op),
        STY => op_sty(mb, op),
        TAX => op_tax(mb, op),
        TAY => op_tay(mb, op),
        TSX => op_tsx(mb, op),
        TXA => op_txa(mb, op),
        TXS => op_txs(mb, op),
        TYA => op_tya(mb, op),
        PHA => op_pha(mb, op),
        PHP => op_php(mb, op),
        PLA => op_pla(mb, op),
        PLP => op_plp(mb, op),
        AND => op_and(mb, op),
        EOR => op_eor(mb, op),
        ORA => op_ora(mb, op),
        BIT => op_bit(mb, op),
        ADC => op_adc(mb, op),
        SBC => op_sbc(mb, op),
        CMP => op_cmp(mb, op),
        CPX => op_cpx(mb, op),
        CPY => op_cpy(mb, op),
        INC => op_inc(mb, op),
        INX => op_inx(mb, op),
        INY => op_iny(mb, op),
        DEC => op_dec(mb, op),
        DEX => op_dex(mb, op),
        DEY => op_dey(mb, op),
        ASL => op_asl(mb, op),
        LSR => op_lsr(mb, op),
        ROL => op_rol(mb, op),
        ROR => op_ror(mb, op),
        JMP => op_jmp(mb, op),
        JSR => op_jsr(mb, op),
        RTS => op_rts(mb, op),
        BCC => op_bcc(mb, op),
        BCS => op_bcs(mb, op),
        BEQ => op_beq(mb, op),
        BMI => op_bmi(mb, op),
        BNE => op_bne(mb, op),
        BPL => op_bpl(mb, op),
        BVC => op_bvc(mb, op),
        BVS => op_bvs(mb, op),
        CLC => op_clc(mb, op),
        CLD => op_cld(mb, op),
        CLI => op_cli(mb, op),
        CLV => op_clv(mb, op),
        SEC => op_sec(mb, op),
        SED => op_sed(mb, op),
        SEI => op_sei(mb, op),
        BRK => op_brk(mb, op),
        RTI => op_rti(mb, op),
        NOP => op_nop(mb, op),
    }
}

macro_rules! op_fn {
    ($mnemonic: ident, $mb: ident, $op: ident, $body: expr) => {
        fn $mnemonic<T: WithCpu + CpuBus>($mb: &mut T, $op: &Operand) {
            $body
        }
    };
}

//region Arithmetic ops
// ADC SBC

/// The shared ADC datapath. SBC is ADC of the operand's complement, which is
/// why both share carry and overflow rules. The D flag is stored but never
/// honored on this CPU.
fn add_with_carry<T: WithCpu>(mb: &mut T, m: u8) {
    if mb.cpu().state.status.contains(Status::DECIMAL) {
        warn!("decimal flag is set, but this CPU has no BCD mode");
    }
    let a = mb.cpu().state.a;
    let carry = u16::from(mb.cpu().state.status.contains(Status::CARRY));
    let sum = u16::from(a) + u16::from(m) + carry;
    let result = (sum & 0xFF) as u8;
    let cpu = mb.cpu_mut();
    cpu.state.status.set(Status::CARRY, sum > 0xFF);
    // Overflow: both inputs agree in sign and the result disagrees.
    cpu.state
        .status
        .set(Status::OVERFLOW, (a ^ m) & 0x80 == 0 && (a ^ result) & 0x80 != 0);
    cpu.state.a = result;
    check_zero_negative(mb, result);
}

op_fn!(op_adc, mb, op, {
    let m = read_operand(mb, op);
    add_with_carry(mb, m);
});
op_fn!(op_sbc, mb, op, {
    let m = read_operand(mb, op);
    add_with_carry(mb, !m);
});
//endregion

//region Compares
// CMP CPX CPY
fn compare<T: WithCpu + CpuBus>(mb: &mut T, reg: u8, op: &Operand) {
    let m = read_operand(mb, op);
    let result = reg.wrapping_sub(m);
    mb.cpu_mut().state.status.set(Status::CARRY, reg >= m);
    check_zero_negative(mb, result);
}

op_fn!(op_cmp, mb, op, {
    let a = mb.cpu().state.a;
    compare(mb, a, op);
});
op_fn!(op_cpx, mb, op, {
    let x = mb.cpu().state.x;
    compare(mb, x, op);
});
op_fn!(op_cpy, mb, op, {
    let y = mb.cpu().state.y;
    compare(mb, y, op);
});
//endregion

//region Bitwise ops
// AND EOR ORA BIT
op_fn!(op_and, mb, op, {
    let result = mb.cpu().state.a & read_operand(mb, op);
    mb.cpu_mut().state.a = result;
    check_zero_negative(mb, result);
});
op_fn!(op_eor, mb, op, {
    let result = mb.cpu().state.a ^ read_operand(mb, op);
    mb.cpu_mut().state.a = result;
    check_zero_negative(mb, result);
});
op_fn!(op_ora, mb, op, {
    let result = mb.cpu().state.a | read_operand(mb, op);
    mb.cpu_mut().state.a = result;
    check_zero_negative(mb, result);
});
op_fn!(op_bit, mb, op, {
    let m = read_operand(mb, op);
    let a = mb.cpu().state.a;
    let status = &mut mb.cpu_mut().state.status;
    status.set(Status::ZERO, a & m == 0);
    status.set(Status::NEGATIVE, m & 0x80 != 0);
    status.set(Status::OVERFLOW, m & 0x40 != 0);
});
//endregion

//region Shifts and rotates
// ASL LSR ROL ROR, each with an accumulator and a read-modify-write form.
// The read always precedes the write.
op_fn!(op_asl, mb, op, {
    let val = read_operand(mb, op);
    let result = val << 1;
    mb.cpu_mut().state.status.set(Status::CARRY, val & 0x80 != 0);
    check_zero_negative(mb, result);
    write_operand(mb, op, result);
});
op_fn!(op_lsr, mb, op, {
    let val = read_operand(mb, op);
    let result = val >> 1;
    mb.cpu_mut().state.status.set(Status::CARRY, val & 0x01 != 0);
    check_zero_negative(mb, result);
    write_operand(mb, op, result);
});
op_fn!(op_rol, mb, op, {
    let val = read_operand(mb, op);
    let carry_in = u8::from(mb.cpu().state.status.contains(Status::CARRY));
    let result = (val << 1) | carry_in;
    mb.cpu_mut().state.status.set(Status::CARRY, val & 0x80 != 0);
    check_zero_negative(mb, result);
    write_operand(mb, op, result);
});
op_fn!(op_ror, mb, op, {
    let val = read_operand(mb, op);
    let carry_in = u8::from(mb.cpu().state.status.contains(Status::CARRY));
    let result = (val >> 1) | (carry_in << 7);
    mb.cpu_mut().state.status.set(Status::CARRY, val & 0x01 != 0);
    check_zero_negative(mb, result);
    write_operand(mb, op, result);
});
//endregion

//region Loads and stores
op_fn!(op_lda, mb, op, {
    let val = read_operand(mb, op);
    mb.cpu_mut().state.a = val;
    check_zero_negative(mb, val);
});
op_fn!(op_ldx, mb, op, {
    let val = read_operand(mb, op);
    mb.cpu_mut().state.x = val;
    check_zero_negative(mb, val);
});
op_fn!(op_ldy, mb, op, {
    let val = read_operand(mb, op);
    mb.cpu_mut().state.y = val;
    check_zero_negative(mb, val);
});
op_fn!(op_sta, mb, op, {
    let a = mb.cpu().state.a;
    write_operand(mb, op, a);
});
op_fn!(op_stx, mb, op, {
    let x = mb.cpu().state.x;
    write_operand(mb, op, x);
});
op_fn!(op_sty, mb, op, {
    let y = mb.cpu().state.y;
    write_operand(mb, op, y);
});
//endregion

//region Register transfers
op_fn!(op_tax, mb, _op, {
    let val = mb.cpu().state.a;
    mb.cpu_mut().state.x = val;
    check_zero_negative(mb, val);
});
op_fn!(op_tay, mb, _op, {
    let val = mb.cpu().state.a;
    mb.cpu_mut().state.y = val;
    check_zero_negative(mb, val);
});
op_fn!(op_tsx, mb, _op, {
    let val = mb.cpu().state.sp;
    mb.cpu_mut().state.x = val;
    check_zero_negative(mb, val);
});
op_fn!(op_txa, mb, _op, {
    let val = mb.cpu().state.x;
    mb.cpu_mut().state.a = val;
    check_zero_negative(mb, val);
});
op_fn!(op_tya, mb, _op, {
    let val = mb.cpu().state.y;
    mb.cpu_mut().state.a = val;
    check_zero_negative(mb, val);
});
// TXS is the odd one out: no flags.
op_fn!(op_txs, mb, _op, {
    let val = mb.cpu().state.x;
    mb.cpu_mut().state.sp = val;
});
//endregion

//region Increments and decrements
op_fn!(op_inc, mb, op, {
    let result = read_operand(mb, op).wrapping_add(1);
    write_operand(mb, op, result);
    check_zero_negative(mb, result);
});
op_fn!(op_dec, mb, op, {
    let result = read_operand(mb, op).wrapping_sub(1);
    write_operand(mb, op, result);
    check_zero_negative(mb, result);
});
op_fn!(op_inx, mb, _op, {
    let result = mb.cpu().state.x.wrapping_add(1);
    mb.cpu_mut().state.x = result;
    check_zero_negative(mb, result);
});
op_fn!(op_dex, mb, _op, {
    let result = mb.cpu().state.x.wrapping_sub(1);
    mb.cpu_mut().state.x = result;
    check_zero_negative(mb, result);
});
op_fn!(op_iny, mb, _op, {
    let result = mb.cpu().state.y.wrapping_add(1);
    mb.cpu_mut().state.y = result;
    check_zero_negative(mb, result);
});
op_fn!(op_dey, mb, _op, {
    let result = mb.cpu().state.y.wrapping_sub(1);
    mb.cpu_mut().state.y = result;
    check_zero_negative(mb, result);
});
//endregion

//region Stack instructions
op_fn!(op_pha, mb, _op, {
    let a = mb.cpu().state.a;
    push_stack(mb, a);
});
// PHP pushes with B and the unused bit set, like BRK.
op_fn!(op_php, mb, _op, {
    let pushed = mb.cpu().state.status | Status::BREAK | Status::UNUSED;
    push_stack(mb, pushed.bits());
});
op_fn!(op_pla, mb, _op, {
    let val = pop_stack(mb);
    mb.cpu_mut().state.a = val;
    check_zero_negative(mb, val);
});
op_fn!(op_plp, mb, _op, {
    let pulled = pop_stack(mb);
    restore_status(mb, pulled);
});
//endregion

/// Write a pulled status byte, keeping the in-register B and unused bits.
fn restore_status<T: WithCpu>(mb: &mut T, pulled: u8) {
    let cpu = mb.cpu_mut();
    let kept = cpu.state.status & (Status::BREAK | Status::UNUSED);
    cpu.state.status =
        (Status::from_bits_truncate(pulled) - (Status::BREAK | Status::UNUSED)) | kept;
}

//region Branches
// BCC BCS BEQ BMI BNE BPL BVC BVS
// Taken branches cost one extra cycle, two if the target is on a different
// page than the instruction's end.
fn branch<T: WithCpu>(mb: &mut T, op: &Operand, taken: bool) {
    if !taken {
        return;
    }
    let cpu = mb.cpu_mut();
    cpu.extra_cycles += if op.page_crossed { 2 } else { 1 };
    cpu.state.pc = op.addr;
}

op_fn!(op_bcc, mb, op, {
    let taken = !mb.cpu().state.status.contains(Status::CARRY);
    branch(mb, op, taken);
});
op_fn!(op_bcs, mb, op, {
    let taken = mb.cpu().state.status.contains(Status::CARRY);
    branch(mb, op, taken);
});
op_fn!(op_bne, mb, op, {
    let taken = !mb.cpu().state.status.contains(Status::ZERO);
    branch(mb, op, taken);
});
op_fn!(op_beq, mb, op, {
    let taken = mb.cpu().state.status.contains(Status::ZERO);
    branch(mb, op, taken);
});
op_fn!(op_bpl, mb, op, {
    let taken = !mb.cpu().state.status.contains(Status::NEGATIVE);
    branch(mb, op, taken);
});
op_fn!(op_bmi, mb, op, {
    let taken = mb.cpu().state.status.contains(Status::NEGATIVE);
    branch(mb, op, taken);
});
op_fn!(op_bvc, mb, op, {
    let taken = !mb.cpu().state.status.contains(Status::OVERFLOW);
    branch(mb, op, taken);
});
op_fn!(op_bvs, mb, op, {
    let taken = mb.cpu().state.status.contains(Status::OVERFLOW);
    branch(mb, op, taken);
});
//endregion

//region Jumps and subroutines
op_fn!(op_jmp, mb, op, {
    mb.cpu_mut().state.pc = op.addr;
});
// JSR pushes the address of its own last byte; RTS adds the one back.
op_fn!(op_jsr, mb, op, {
    let ret = mb.cpu().state.pc.wrapping_sub(1);
    push_stack(mb, (ret >> 8) as u8);
    push_stack(mb, (ret & 0xFF) as u8);
    mb.cpu_mut().state.pc = op.addr;
});
op_fn!(op_rts, mb, _op, {
    let lo = pop_stack(mb);
    let hi = pop_stack(mb);
    mb.cpu_mut().state.pc = bytes_to_addr!(lo, hi).wrapping_add(1);
});
//endregion

//region Interrupt machinery
// BRK is one byte long but pushes the address two bytes past itself, so the
// byte after a BRK is skipped on RTI.
op_fn!(op_brk, mb, _op, {
    let ret = mb.cpu().state.pc.wrapping_add(1);
    push_stack(mb, (ret >> 8) as u8);
    push_stack(mb, (ret & 0xFF) as u8);
    let pushed = mb.cpu().state.status | Status::BREAK | Status::UNUSED;
    push_stack(mb, pushed.bits());
    mb.cpu_mut().state.status.insert(Status::IRQ_DISABLE);
    let target = mb.read16(IRQ_VECTOR);
    mb.cpu_mut().state.pc = target;
});
op_fn!(op_rti, mb, _op, {
    let pulled = pop_stack(mb);
    restore_status(mb, pulled);
    let lo = pop_stack(mb);
    let hi = pop_stack(mb);
    mb.cpu_mut().state.pc = bytes_to_addr!(lo, hi);
});
//endregion

//region Flag operations
// CLC SEC CLI SEI CLV CLD SED
op_fn!(op_clc, mb, _op, mb.cpu_mut().state.status.remove(Status::CARRY));
op_fn!(op_sec, mb, _op, mb.cpu_mut().state.status.insert(Status::CARRY));
op_fn!(op_cli, mb, _op, mb.cpu_mut().state.status.remove(Status::IRQ_DISABLE));
op_fn!(op_sei, mb, _op, mb.cpu_mut().state.status.insert(Status::IRQ_DISABLE));
op_fn!(op_clv, mb, _op, mb.cpu_mut().state.status.remove(Status::OVERFLOW));
op_fn!(op_cld, mb, _op, mb.cpu_mut().state.status.remove(Status::DECIMAL));
op_fn!(op_sed, mb, _op, mb.cpu_mut().state.status.insert(Status::DECIMAL));
//endregion

op_fn!(op_nop, _mb, _op, {
    // no operation
});

#[cfg(test)]
mod tests {
    use super::*;

    /// A bare 64 KiB of RAM standing in for the whole bus.
    struct Harness {
        cpu: Cpu,
        mem: Vec<u8>,
    }

    impl Harness {
        fn new(program: &[u8]) -> Harness {
            let mut mem = vec![0u8; 0x10000];
            mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
            mem[RESET_VECTOR as usize] = 0x00;
            mem[RESET_VECTOR as usize + 1] = 0x80;
            let mut harness = Harness {
                cpu: Cpu::new(false),
                mem,
            };
            harness.cpu.state.pc = 0x8000;
            harness
        }

        fn step(&mut self) -> u32 {
            exec(self).expect("lenient mode cannot halt")
        }
    }

    impl WithCpu for Harness {
        fn cpu(&self) -> &Cpu {
            &self.cpu
        }

        fn cpu_mut(&mut self) -> &mut Cpu {
            &mut self.cpu
        }
    }

    impl CpuBus for Harness {
        fn read(&mut self, addr: u16) -> u8 {
            self.mem[addr as usize]
        }

        fn peek(&self, addr: u16) -> Option<u8> {
            Some(self.mem[addr as usize])
        }

        fn write(&mut self, addr: u16, data: u8) {
            self.mem[addr as usize] = data;
        }
    }

    #[test]
    fn lda_immediate_sets_zero_and_negative() {
        let mut h = Harness::new(&[0xA9, 0x00, 0xA9, 0x80]);
        h.step();
        assert!(h.cpu.state.status.contains(Status::ZERO));
        h.step();
        assert_eq!(h.cpu.state.a, 0x80);
        assert!(h.cpu.state.status.contains(Status::NEGATIVE));
        assert!(!h.cpu.state.status.contains(Status::ZERO));
    }

    #[test]
    fn adc_follows_the_overflow_contract() {
        // A=$50 + #$50: unsigned no carry, signed overflow.
        let mut h = Harness::new(&[0xA9, 0x50, 0x69, 0x50]);
        h.step();
        h.step();
        assert_eq!(h.cpu.state.a, 0xA0);
        assert!(!h.cpu.state.status.contains(Status::CARRY));
        assert!(h.cpu.state.status.contains(Status::OVERFLOW));
        assert!(h.cpu.state.status.contains(Status::NEGATIVE));
        assert!(!h.cpu.state.status.contains(Status::ZERO));
    }

    #[test]
    fn sbc_is_adc_of_the_complement() {
        // SEC; LDA #$33; SBC #$11 == 0x22 with carry still set
        let mut h = Harness::new(&[0x38, 0xA9, 0x33, 0xE9, 0x11]);
        for _ in 0..3 {
            h.step();
        }
        assert_eq!(h.cpu.state.a, 0x22);
        assert!(h.cpu.state.status.contains(Status::CARRY));
    }

    #[test]
    fn php_sets_b_and_unused_on_the_stack_only() {
        let mut h = Harness::new(&[0x08]);
        h.step();
        let pushed = h.mem[0x01FD];
        assert_eq!(pushed & 0x30, 0x30);
        assert_eq!(h.cpu.state.status.bits() & 0x10, 0x00);
    }

    #[test]
    fn plp_preserves_in_register_b_and_unused() {
        // push $FF, pull it back: B must not leak into P.
        let mut h = Harness::new(&[0xA9, 0xFF, 0x48, 0x28]);
        for _ in 0..3 {
            h.step();
        }
        let p = h.cpu.state.status;
        assert!(!p.contains(Status::BREAK));
        assert!(p.contains(Status::UNUSED));
        assert!(p.contains(Status::CARRY));
        assert!(p.contains(Status::NEGATIVE));
    }

    #[test]
    fn rmw_reads_before_it_writes() {
        // INC $10 where $10 = $FF: result wraps to zero and sets Z.
        let mut h = Harness::new(&[0xE6, 0x10]);
        h.mem[0x10] = 0xFF;
        h.step();
        assert_eq!(h.mem[0x10], 0x00);
        assert!(h.cpu.state.status.contains(Status::ZERO));
    }

    #[test]
    fn branch_cycle_costs() {
        // BNE not taken (Z set via LDA #0): 2 cycles.
        let mut h = Harness::new(&[0xA9, 0x00, 0xD0, 0x02]);
        h.step();
        assert_eq!(h.step(), 2);

        // BEQ taken, same page: 3 cycles.
        let mut h = Harness::new(&[0xA9, 0x00, 0xF0, 0x02]);
        h.step();
        assert_eq!(h.step(), 3);
        assert_eq!(h.cpu.state.pc, 0x8006);
    }

    #[test]
    fn branch_across_a_page_costs_four() {
        let mut h = Harness::new(&[]);
        h.mem[0x80FD] = 0xF0; // BEQ +4
        h.mem[0x80FE] = 0x04;
        h.cpu.state.pc = 0x80FD;
        h.cpu.state.status.insert(Status::ZERO);
        assert_eq!(h.step(), 4);
        assert_eq!(h.cpu.state.pc, 0x8103);
    }

    #[test]
    fn jsr_rts_round_trip() {
        // JSR $8005; main resumes at $8003 | subroutine: LDA #$42; RTS
        let mut h = Harness::new(&[0x20, 0x05, 0x80, 0xEA, 0x00, 0xA9, 0x42, 0x60]);
        h.step();
        assert_eq!(h.cpu.state.pc, 0x8005);
        assert_eq!(h.cpu.state.sp, 0xFB);
        h.step();
        h.step();
        assert_eq!(h.cpu.state.pc, 0x8003);
        assert_eq!(h.cpu.state.a, 0x42);
        assert_eq!(h.cpu.state.sp, 0xFD);
    }

    #[test]
    fn indirect_jmp_wraps_within_the_pointer_page() {
        let mut h = Harness::new(&[0x6C, 0xFF, 0x30]);
        h.mem[0x30FF] = 0x34;
        h.mem[0x3000] = 0x12;
        h.mem[0x3100] = 0x99; // must not be used
        h.step();
        assert_eq!(h.cpu.state.pc, 0x1234);
    }

    #[test]
    fn brk_and_rti_round_trip() {
        let mut h = Harness::new(&[0x00, 0xEA, 0xEA]);
        h.mem[IRQ_VECTOR as usize] = 0x00;
        h.mem[IRQ_VECTOR as usize + 1] = 0x90;
        h.mem[0x9000] = 0x40; // RTI
        assert_eq!(h.step(), 7);
        assert_eq!(h.cpu.state.pc, 0x9000);
        assert!(h.cpu.state.status.contains(Status::IRQ_DISABLE));
        h.step();
        // BRK skips its padding byte: execution resumes at $8002.
        assert_eq!(h.cpu.state.pc, 0x8002);
    }

    #[test]
    fn nmi_pushes_with_break_clear() {
        let mut h = Harness::new(&[0xEA]);
        h.mem[NMI_VECTOR as usize] = 0x00;
        h.mem[NMI_VECTOR as usize + 1] = 0xA0;
        trigger_nmi(&mut h);
        assert_eq!(h.step(), 7);
        assert_eq!(h.cpu.state.pc, 0xA000);
        let pushed = h.mem[0x01FB];
        assert_eq!(pushed & 0x10, 0x00, "B must be clear on NMI pushes");
        assert_eq!(pushed & 0x20, 0x20, "unused bit reads as 1 when pushed");
    }

    #[test]
    fn irq_respects_the_interrupt_disable_flag() {
        let mut h = Harness::new(&[0xEA]);
        // poweron state has I set
        trigger_irq(&mut h);
        assert_eq!(h.step(), 2, "IRQ must be ignored while I is set");
    }

    #[test]
    fn undocumented_opcode_is_a_two_cycle_nop_when_lenient() {
        let mut h = Harness::new(&[0x02, 0xEA]);
        assert_eq!(h.step(), 2);
        assert_eq!(h.cpu.state.pc, 0x8001);
    }

    #[test]
    fn undocumented_opcode_halts_in_strict_mode() {
        let mut h = Harness::new(&[0x02]);
        h.cpu.strict = true;
        assert_eq!(
            exec(&mut h),
            Err(CpuHalt::UnknownOpcode {
                pc: 0x8000,
                opcode: 0x02
            })
        );
    }

    #[test]
    fn page_cross_penalty_applies_to_reads_not_stores() {
        // LDA $80FF,X with X=1 crosses into $8100: 5 cycles.
        let mut h = Harness::new(&[0xBD, 0xFF, 0x80]);
        h.cpu.state.x = 1;
        assert_eq!(h.step(), 5);

        // STA $00FF,X with X=1: always 5 cycles, crossing or not.
        let mut h = Harness::new(&[0x9D, 0xFF, 0x00]);
        h.cpu.state.x = 1;
        assert_eq!(h.step(), 5);
    }
}
