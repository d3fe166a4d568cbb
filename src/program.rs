//! Program images
//!
//! The textual form of a program is a list of comma-separated decimal
//! integers, optionally followed by a line terminator.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vm::{Instruction, Mode};

/// Errors raised while loading a program image
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProgramError {
    #[error("program is empty")]
    Empty,

    #[error("invalid value '{token}' at position {index}")]
    InvalidValue { index: usize, token: String },

    #[error("IO error: {0}")]
    Io(String),
}

/// An immutable program image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    cells: Vec<i64>,
}

impl Program {
    pub fn new(cells: Vec<i64>) -> Self {
        Self { cells }
    }

    /// Load a program from a text file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProgramError> {
        let source = fs::read_to_string(path).map_err(|e| ProgramError::Io(e.to_string()))?;
        source.parse()
    }

    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Linear disassembly listing
    ///
    /// Programs rewrite themselves and mix code with data, so this is only a
    /// best-effort static view: words that do not decode are shown as `DATA`.
    pub fn dump(&self) -> String {
        let mut result = String::new();
        let mut addr = 0;

        while addr < self.cells.len() {
            let word = self.cells[addr];
            match Instruction::decode(word) {
                Ok(instr) if addr + instr.width() <= self.cells.len() => {
                    let operands: Vec<String> = (1..=instr.opcode.arity())
                        .map(|p| format_operand(instr.mode(p), self.cells[addr + p]))
                        .collect();
                    result.push_str(&format!(
                        "{:>5}: {:<5}{}\n",
                        addr,
                        instr.opcode.mnemonic(),
                        operands.join(", ")
                    ));
                    addr += instr.width();
                }
                _ => {
                    result.push_str(&format!("{:>5}: DATA {}\n", addr, word));
                    addr += 1;
                }
            }
        }

        result
    }
}

fn format_operand(mode: Mode, raw: i64) -> String {
    match mode {
        Mode::Position => format!("[{}]", raw),
        Mode::Immediate => raw.to_string(),
        Mode::Relative if raw < 0 => format!("[rb{}]", raw),
        Mode::Relative => format!("[rb+{}]", raw),
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ProgramError::Empty);
        }

        let cells = source
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                token
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ProgramError::InvalidValue {
                        index,
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cells })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}
