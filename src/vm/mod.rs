//! Intcode virtual machine
//!
//! The machine is split into three facets owned by [`Machine`]:
//! growable [`Memory`], the pure decoder/ALU in `execution`, and the run
//! loop in `vm` that applies instruction effects and reports why control
//! returned to the caller.

mod checkpoint;
mod errors;
mod execution;
mod memory;
mod types;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use errors::{DecodeError, VMError};
pub use execution::{execute, fetch, Control, Effect};
pub use memory::Memory;
pub use types::{Instruction, InputPolicy, MachineStatus, Mode, Opcode, Registers, RunOutcome};

// Main Machine struct that coordinates components
mod vm;
pub use vm::Machine;
