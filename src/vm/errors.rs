//! Error types for VM operations
//!
//! This module defines the fatal conditions a machine can report. Suspensions
//! (blocked on input, step budget exhausted) are not errors and live in
//! [`RunOutcome`](crate::vm::RunOutcome) instead.

use thiserror::Error;

/// Faults raised while decoding or executing a single instruction
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The low two digits of the instruction word name no known opcode
    #[error("unknown opcode {0}")]
    UnknownOpcode(i64),

    /// A parameter mode digit other than 0, 1 or 2
    #[error("unknown mode {mode} for parameter {param}")]
    UnknownMode { param: usize, mode: i64 },

    /// A write target encoded in immediate mode
    #[error("parameter {param} is a write target in immediate mode")]
    ImmediateWrite { param: usize },

    /// An operand resolved to an address below zero
    #[error("negative address {0}")]
    NegativeAddress(i64),

    /// Arithmetic or address computation left the i64 range
    #[error("integer overflow")]
    Overflow,
}

/// Error variants that can occur during VM execution
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VMError {
    /// Fatal fault in the instruction at `pc`; machine state is left as it was
    /// before that instruction
    #[error("decode error at pc {pc} (instruction {word}): {kind}")]
    Decode {
        pc: usize,
        word: i64,
        kind: DecodeError,
    },

    /// Batch-mode machine asked for more input than the caller provided
    #[error("input exhausted at pc {pc}")]
    InputExhausted { pc: usize },

    /// No checkpoint stored under the requested label
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// Direct memory access with an address below zero
    #[error("negative address {0}")]
    NegativeAddress(i64),

    /// Checkpoint serialization or persistence failure
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

impl VMError {
    /// Program counter of the failing instruction, if the error has one
    pub fn pc(&self) -> Option<usize> {
        match self {
            VMError::Decode { pc, .. } | VMError::InputExhausted { pc } => Some(*pc),
            _ => None,
        }
    }
}
