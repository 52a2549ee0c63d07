mod cpu;
mod opcodes;
mod structs;
mod trace;

pub use cpu::{
    exec, reset, trigger_irq, trigger_nmi, Cpu, WithCpu, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR,
};
pub use opcodes::{decode, Opcode};
pub use structs::{AddressingMode, CpuHalt, CpuState, Mnemonic, Status, POWERON_CPU_STATE};
pub use trace::format_trace;
