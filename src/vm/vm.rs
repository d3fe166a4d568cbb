//! Main Virtual Machine implementation
//!
//! `Machine` owns memory, registers, the pending input queue and the output
//! log, and drives the pure handlers in `execution.rs`. A run returns when the
//! machine halts, blocks on input, or spends its step budget; the latter two
//! are resumable by calling `run` again.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::vm::checkpoint::Checkpoint;
use crate::vm::errors::{DecodeError, VMError};
use crate::vm::execution::{execute, fetch, Control};
use crate::vm::memory::Memory;
use crate::vm::types::{InputPolicy, MachineStatus, Registers, RunOutcome};

/// A single Intcode machine
#[derive(Debug, Clone)]
pub struct Machine {
    /// Program image, kept for `reset`
    image: Vec<i64>,

    memory: Memory,

    registers: Registers,

    status: MachineStatus,

    policy: InputPolicy,

    /// Values not yet consumed by an input instruction
    input: VecDeque<i64>,

    /// Append-only output log
    output: Vec<i64>,

    /// Instructions executed since creation or the last reset
    executed: u64,
}

impl Machine {
    /// Create a machine from a program image with an explicit input policy
    pub fn new(image: &[i64], policy: InputPolicy) -> Self {
        Self {
            image: image.to_vec(),
            memory: Memory::new(image),
            registers: Registers::default(),
            status: MachineStatus::Running,
            policy,
            input: VecDeque::new(),
            output: Vec::new(),
            executed: 0,
        }
    }

    /// Machine whose whole input is supplied up front
    pub fn batch(image: &[i64]) -> Self {
        Self::new(image, InputPolicy::Batch)
    }

    /// Machine that suspends when it runs out of input
    pub fn streaming(image: &[i64]) -> Self {
        Self::new(image, InputPolicy::Streaming)
    }

    /// Queue one input value
    pub fn push_input(&mut self, value: i64) {
        self.input.push_back(value);
        if self.status == MachineStatus::BlockedOnInput {
            self.status = MachineStatus::Running;
        }
    }

    /// Queue several input values in order
    pub fn extend_input<I: IntoIterator<Item = i64>>(&mut self, values: I) {
        for value in values {
            self.push_input(value);
        }
    }

    /// Queue a string as character codes
    pub fn push_text(&mut self, text: &str) {
        self.extend_input(crate::text::encode_text(text));
    }

    /// Queue `input` and run
    pub fn run_with_input<I: IntoIterator<Item = i64>>(
        &mut self,
        input: I,
        budget: Option<usize>,
    ) -> Result<RunOutcome, VMError> {
        self.extend_input(input);
        self.run(budget)
    }

    /// Run until halt, an unsatisfiable input, or `budget` instructions
    ///
    /// `None` means no budget. A halted machine reports `Halted` without
    /// executing anything.
    pub fn run(&mut self, budget: Option<usize>) -> Result<RunOutcome, VMError> {
        let mut steps = 0usize;
        let outcome = loop {
            if self.status == MachineStatus::Halted {
                break RunOutcome::Halted;
            }
            if self.status == MachineStatus::BlockedOnInput && self.input.is_empty() {
                break RunOutcome::BlockedOnInput;
            }
            if budget.map_or(false, |limit| steps >= limit) {
                break RunOutcome::BudgetExhausted;
            }
            if self.step()? {
                steps += 1;
            }
        };

        debug!(
            "run returned {} after {} steps (pc {}, {} outputs)",
            outcome,
            steps,
            self.registers.pc,
            self.output.len()
        );
        Ok(outcome)
    }

    /// Execute at most one instruction
    ///
    /// Returns `true` if an instruction was executed, `false` if the machine
    /// is halted or blocked on input. In batch mode an unsatisfiable input is
    /// an error.
    pub fn step(&mut self) -> Result<bool, VMError> {
        if self.status == MachineStatus::Halted {
            return Ok(false);
        }

        let pc = self.registers.pc;
        let word = self.memory.get(pc);
        let fault = |kind: DecodeError| VMError::Decode { pc, word, kind };

        let instr = fetch(&self.memory, &self.registers).map_err(fault)?;
        let effect = execute(
            &instr,
            &self.memory,
            &self.registers,
            self.input.front().copied(),
        )
        .map_err(fault)?;

        trace!("pc {:>5}: {:<4} word {}", pc, instr.opcode, word);

        match effect.control {
            Control::NeedInput => {
                return match self.policy {
                    InputPolicy::Streaming => {
                        self.status = MachineStatus::BlockedOnInput;
                        Ok(false)
                    }
                    InputPolicy::Batch => {
                        warn!("batch input exhausted at pc {}", pc);
                        Err(VMError::InputExhausted { pc })
                    }
                };
            }
            Control::Halt => {
                self.status = MachineStatus::Halted;
                self.executed += 1;
                return Ok(true);
            }
            Control::Continue => {}
        }

        if effect.consumed_input {
            self.input.pop_front();
        }
        if let Some(value) = effect.output {
            self.output.push(value);
        }
        self.registers = effect.registers;
        if let Some((addr, value)) = effect.write {
            self.memory.set(addr, value);
        }
        self.status = MachineStatus::Running;
        self.executed += 1;
        Ok(true)
    }

    /// Output produced so far
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    /// Drain the output log
    pub fn take_output(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.output)
    }

    /// Most recent output value
    pub fn last_output(&self) -> Option<i64> {
        self.output.last().copied()
    }

    /// Restore the original image, zero the registers and drop pending input
    ///
    /// The output log is left to the caller.
    pub fn reset(&mut self) {
        debug!("resetting machine ({} cells)", self.image.len());
        self.memory = Memory::new(&self.image);
        self.registers = Registers::default();
        self.status = MachineStatus::Running;
        self.input.clear();
        self.executed = 0;
    }

    /// Snapshot the full execution state
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            memory: self.memory.clone(),
            program_counter: self.registers.pc,
            relative_base: self.registers.relative_base,
            halted: self.status == MachineStatus::Halted,
        }
    }

    /// Install a checkpoint; pending input and the output log are untouched
    pub fn restore(&mut self, checkpoint: &Checkpoint) {
        debug!(
            "restoring checkpoint at pc {} (halted: {})",
            checkpoint.program_counter, checkpoint.halted
        );
        self.memory = checkpoint.memory.clone();
        self.registers = Registers {
            pc: checkpoint.program_counter,
            relative_base: checkpoint.relative_base,
        };
        self.status = if checkpoint.halted {
            MachineStatus::Halted
        } else {
            MachineStatus::Running
        };
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.status == MachineStatus::Halted
    }

    pub fn policy(&self) -> InputPolicy {
        self.policy
    }

    pub fn pc(&self) -> usize {
        self.registers.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.registers.relative_base
    }

    pub fn registers(&self) -> Registers {
        self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Read a memory cell
    pub fn read(&self, addr: i64) -> Result<i64, VMError> {
        self.memory.read(addr)
    }

    /// Patch a memory cell, e.g. to set program parameters before running
    pub fn write(&mut self, addr: i64, value: i64) -> Result<(), VMError> {
        self.memory.write(addr, value)
    }

    /// Number of queued input values
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }
}
