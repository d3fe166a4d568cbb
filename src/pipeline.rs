//! Cooperative multi-machine pipelines
//!
//! Machines are wired in series: everything one machine outputs becomes input
//! for the next. With feedback enabled the last machine also feeds the first,
//! forming a ring. Machines are driven round-robin on a single thread with an
//! optional per-turn step budget, and every hand-off is an explicit move of
//! drained output into the next input queue.

use log::{debug, warn};
use thiserror::Error;

use crate::vm::{Machine, VMError};

/// Errors raised while driving a pipeline
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("pipeline has no machines")]
    Empty,

    /// A turn budget of zero lets no machine execute anything
    #[error("turn budget of zero steps cannot make progress")]
    ZeroTurnBudget,

    /// A full round passed with no machine executing an instruction
    #[error("deadlock in round {round}: every live machine is waiting for input")]
    Deadlock { round: usize },

    #[error("machine {index} failed: {source}")]
    Machine {
        index: usize,
        #[source]
        source: VMError,
    },
}

/// A chain of machines driven round-robin
#[derive(Debug, Clone)]
pub struct Pipeline {
    machines: Vec<Machine>,
    feedback: bool,
    turn_budget: Option<usize>,
}

impl Pipeline {
    /// Chain `machines` in order; they should use the streaming input policy
    pub fn new(machines: Vec<Machine>, feedback: bool) -> Self {
        Self {
            machines,
            feedback,
            turn_budget: None,
        }
    }

    /// One streaming machine per phase setting, each seeded with its phase
    pub fn amplifiers(program: &[i64], phases: &[i64], feedback: bool) -> Self {
        let machines = phases
            .iter()
            .map(|&phase| {
                let mut machine = Machine::streaming(program);
                machine.push_input(phase);
                machine
            })
            .collect();
        Self::new(machines, feedback)
    }

    /// Cap instructions per machine per turn; `None` runs each until it blocks
    pub fn with_turn_budget(mut self, budget: Option<usize>) -> Self {
        self.turn_budget = budget;
        self
    }

    /// Feed `input` to the first machine and run until every machine halts
    ///
    /// Returns everything the last machine emitted, in order.
    pub fn run(&mut self, input: &[i64]) -> Result<Vec<i64>, PipelineError> {
        let count = self.machines.len();
        if count == 0 {
            return Err(PipelineError::Empty);
        }
        if self.turn_budget == Some(0) {
            return Err(PipelineError::ZeroTurnBudget);
        }

        self.machines[0].extend_input(input.iter().copied());
        let mut emitted = Vec::new();
        let mut round = 0;

        loop {
            round += 1;
            let mut progress = false;

            for index in 0..count {
                let machine = &mut self.machines[index];
                let before = machine.instructions_executed();
                let outcome = machine
                    .run(self.turn_budget)
                    .map_err(|source| PipelineError::Machine { index, source })?;
                progress |= machine.instructions_executed() != before;

                let output = machine.take_output();
                debug!(
                    "round {} machine {}: {} ({} values out)",
                    round,
                    index,
                    outcome,
                    output.len()
                );
                if output.is_empty() {
                    continue;
                }

                if index + 1 < count {
                    self.machines[index + 1].extend_input(output);
                } else {
                    emitted.extend_from_slice(&output);
                    if self.feedback {
                        self.machines[0].extend_input(output);
                    }
                }
            }

            if self.machines.iter().all(Machine::is_halted) {
                debug!("pipeline halted after {} rounds", round);
                return Ok(emitted);
            }
            if !progress {
                warn!("pipeline deadlocked in round {}", round);
                return Err(PipelineError::Deadlock { round });
            }
        }
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
