//! Machine checkpoints
//!
//! A [`Checkpoint`] is a plain value holding everything needed to resume a
//! machine bit-for-bit: memory, both registers and the halted flag. It does
//! not capture the output log or pending input, which remain the caller's
//! bookkeeping.
//!
//! [`CheckpointStore`] is an optional host-side table of labelled checkpoints,
//! useful when exploring several branches of one execution.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::vm::errors::VMError;
use crate::vm::memory::Memory;
use crate::vm::vm::Machine;

/// Immutable snapshot of machine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub(crate) memory: Memory,
    pub(crate) program_counter: usize,
    pub(crate) relative_base: i64,
    pub(crate) halted: bool,
}

impl Checkpoint {
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, VMError> {
        serde_json::to_string(self).map_err(|e| VMError::Checkpoint(e.to_string()))
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, VMError> {
        serde_json::from_str(json).map_err(|e| VMError::Checkpoint(e.to_string()))
    }

    /// Write the checkpoint to a JSON file
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| VMError::Checkpoint(e.to_string()))
    }

    /// Read a checkpoint from a JSON file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let json = fs::read_to_string(path).map_err(|e| VMError::Checkpoint(e.to_string()))?;
        Self::from_json(&json)
    }
}

/// Labelled checkpoints owned by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStore {
    checkpoints: BTreeMap<String, Checkpoint>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `machine` under `label`, replacing any previous entry
    pub fn save(&mut self, label: &str, machine: &Machine) -> &Checkpoint {
        debug!("saving checkpoint '{}' at pc {}", label, machine.pc());
        self.checkpoints
            .entry(label.to_string())
            .and_modify(|cp| *cp = machine.checkpoint())
            .or_insert_with(|| machine.checkpoint())
    }

    /// Store an existing checkpoint under `label`
    pub fn insert(&mut self, label: &str, checkpoint: Checkpoint) -> Option<Checkpoint> {
        self.checkpoints.insert(label.to_string(), checkpoint)
    }

    /// Install the checkpoint stored under `label` into `machine`
    pub fn restore(&self, label: &str, machine: &mut Machine) -> Result<(), VMError> {
        let checkpoint = self.get(label)?;
        debug!("restoring checkpoint '{}'", label);
        machine.restore(checkpoint);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Result<&Checkpoint, VMError> {
        self.checkpoints
            .get(label)
            .ok_or_else(|| VMError::CheckpointNotFound(label.to_string()))
    }

    pub fn remove(&mut self, label: &str) -> Result<Checkpoint, VMError> {
        self.checkpoints
            .remove(label)
            .ok_or_else(|| VMError::CheckpointNotFound(label.to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.checkpoints.contains_key(label)
    }

    /// Labels in sorted order
    pub fn labels(&self) -> Vec<&str> {
        self.checkpoints.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Write all checkpoints to a JSON file
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let json = serde_json::to_string(self).map_err(|e| VMError::Checkpoint(e.to_string()))?;
        fs::write(path, json).map_err(|e| VMError::Checkpoint(e.to_string()))
    }

    /// Read a store previously written by `save_to_path`
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let json = fs::read_to_string(path).map_err(|e| VMError::Checkpoint(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| VMError::Checkpoint(e.to_string()))
    }
}
