pub mod asm;
pub mod bits;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod hazard;
pub mod instructions;
pub mod loader;
pub mod memory;
pub mod pipeline;
pub mod predictor;
pub mod registers;
pub mod stats;

pub mod isa {
    pub mod rv32;
}

pub use asm::{assemble, AsmError, Program};
pub use cpu::{Cpu, CpuConfig, Snapshot, Trap};
pub use loader::Image;
pub use memory::{Bus, Segment, DATA_BASE, TEXT_BASE};
pub use stats::Stats;
