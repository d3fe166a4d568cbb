pub mod config;
pub mod pipeline;
pub mod program;
pub mod text;
pub mod vm;

// Use specific imports rather than assuming re-exports for clarity
pub use crate::config::RunConfig;
pub use crate::pipeline::{Pipeline, PipelineError};
pub use crate::program::{Program, ProgramError};
pub use crate::vm::{
    Checkpoint, CheckpointStore, DecodeError, InputPolicy, Machine, MachineStatus, RunOutcome,
    VMError,
};
