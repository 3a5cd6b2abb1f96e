pub mod decoder;
pub mod disasm;
pub mod instructions;
pub mod lines;
pub mod memory;
pub mod process;
pub mod regs;
pub mod sem;
pub mod semantics;

pub mod isa {
    pub mod patmos; // PatMOS bundled VLIW
}

pub use decoder::{Decoded, Decoder, Kind, Op};
pub use lines::{LineEntry, LineMap};
pub use memory::{Image, Memory, MemoryError, Segment};
pub use process::{DelayType, Features, Info, Inst, LoadError, Process, ProcessConfig};
pub use regs::{Platform, Register, RegisterDecoder};
pub use sem::{Block, Cond, MemType, SemOp, Var};
