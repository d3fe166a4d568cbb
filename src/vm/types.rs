//! Type definitions for the virtual machine
//!
//! This module contains the core data types shared by the decoder and the
//! execution driver: opcodes, addressing modes, decoded instructions, the
//! register file, and the values that describe why a run returned.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vm::errors::DecodeError;

/// The instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// `mem[c] = a + b`
    Add,

    /// `mem[c] = a * b`
    Multiply,

    /// `mem[a] = next input`, blocks when none is available
    Input,

    /// Append `a` to the output log
    Output,

    /// `pc = b` if `a != 0`
    JumpIfTrue,

    /// `pc = b` if `a == 0`
    JumpIfFalse,

    /// `mem[c] = (a < b) as i64`
    LessThan,

    /// `mem[c] = (a == b) as i64`
    Equals,

    /// `relative_base += a`
    AdjustBase,

    /// Stop the machine for good
    Halt,
}

impl Opcode {
    /// Look up an opcode by its numeric code
    pub fn from_code(code: i64) -> Option<Self> {
        let op = match code {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustBase,
            99 => Opcode::Halt,
            _ => return None,
        };
        Some(op)
    }

    /// Numeric code of the opcode
    pub fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Multiply => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// 1-based index of the parameter this opcode writes through, if any
    pub fn write_param(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => Some(3),
            Opcode::Input => Some(1),
            _ => None,
        }
    }

    /// Short assembler-style name
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JT",
            Opcode::JumpIfFalse => "JF",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustBase => "ARB",
            Opcode::Halt => "HALT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// Parameter addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Operand is an address
    Position,

    /// Operand is a literal; illegal for write targets
    Immediate,

    /// Operand is an address offset by the relative base
    Relative,
}

impl Mode {
    fn from_digit(param: usize, digit: i64) -> Result<Self, DecodeError> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            mode => Err(DecodeError::UnknownMode { param, mode }),
        }
    }
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Raw word as found in memory
    pub word: i64,

    /// Operation selected by the low two digits
    pub opcode: Opcode,

    /// Modes for parameters 1..=3; unused slots are `Position`
    pub modes: [Mode; 3],
}

impl Instruction {
    /// Split a word into opcode and per-parameter modes
    ///
    /// Only the mode digits of parameters the opcode actually takes are
    /// validated, and immediate mode is rejected for its write target.
    pub fn decode(word: i64) -> Result<Self, DecodeError> {
        let opcode = Opcode::from_code(word.rem_euclid(100))
            .filter(|_| word >= 0)
            .ok_or(DecodeError::UnknownOpcode(word))?;

        let mut modes = [Mode::Position; 3];
        let mut digits = word / 100;
        for (i, slot) in modes.iter_mut().enumerate().take(opcode.arity()) {
            *slot = Mode::from_digit(i + 1, digits % 10)?;
            digits /= 10;
        }

        if let Some(param) = opcode.write_param() {
            if modes[param - 1] == Mode::Immediate {
                return Err(DecodeError::ImmediateWrite { param });
            }
        }

        Ok(Self {
            word,
            opcode,
            modes,
        })
    }

    /// Mode of the 1-based parameter `param`
    pub fn mode(&self, param: usize) -> Mode {
        self.modes[param - 1]
    }

    /// Total width of the instruction in cells
    pub fn width(&self) -> usize {
        self.opcode.arity() + 1
    }
}

/// The register file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Address of the next instruction
    pub pc: usize,

    /// Offset applied to relative-mode operands
    pub relative_base: i64,
}

/// How a machine treats an `Input` instruction with nothing queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputPolicy {
    /// All input was supplied up front; running dry is an error
    Batch,

    /// Input arrives incrementally; running dry suspends the machine
    Streaming,
}

impl std::str::FromStr for InputPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(InputPolicy::Batch),
            "streaming" | "stream" => Ok(InputPolicy::Streaming),
            other => Err(format!("unknown input policy '{}'", other)),
        }
    }
}

/// Why a call to `run` returned control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Opcode 99 was reached
    Halted,

    /// An `Input` instruction found nothing queued; pc still points at it
    BlockedOnInput,

    /// The step budget ran out; the machine is resumable as is
    BudgetExhausted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Halted => write!(f, "halted"),
            RunOutcome::BlockedOnInput => write!(f, "blocked on input"),
            RunOutcome::BudgetExhausted => write!(f, "step budget exhausted"),
        }
    }
}

/// Execution state of a machine between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineStatus {
    Running,
    BlockedOnInput,
    Halted,
}
