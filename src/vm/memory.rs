//! VM Memory
//!
//! Growable cell storage addressed by non-negative integers. Cells that were
//! never written read as zero. Addresses close to the current extent live in a
//! dense vector; a write far beyond it goes to a sparse overflow map so that a
//! single high probe does not allocate the whole gap.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vm::errors::VMError;

/// Largest gap past the dense region that is filled in rather than stored sparsely
const MAX_DENSE_GAP: usize = 1 << 16;

/// Provides memory operations for the virtual machine
///
/// Equality compares contents, not layout: two memories are equal when every
/// address reads the same, however the cells came to be stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "MemoryParts")]
pub struct Memory {
    /// Contiguous cells starting at address 0
    dense: Vec<i64>,

    /// Cells at or beyond `dense.len()`
    sparse: BTreeMap<usize, i64>,
}

impl Memory {
    /// Create memory initialized from a program image
    pub fn new(image: &[i64]) -> Self {
        Self {
            dense: image.to_vec(),
            sparse: BTreeMap::new(),
        }
    }

    /// Read the cell at `addr`, zero if never written
    pub fn read(&self, addr: i64) -> Result<i64, VMError> {
        let addr = Self::index(addr)?;
        Ok(self.get(addr))
    }

    /// Write `value` at `addr`, growing the address space as needed
    pub fn write(&mut self, addr: i64, value: i64) -> Result<(), VMError> {
        let addr = Self::index(addr)?;
        self.set(addr, value);
        Ok(())
    }

    /// Read a cell by an already validated index
    pub fn get(&self, addr: usize) -> i64 {
        match self.dense.get(addr) {
            Some(value) => *value,
            None => self.sparse.get(&addr).copied().unwrap_or(0),
        }
    }

    /// Write a cell by an already validated index
    pub fn set(&mut self, addr: usize, value: i64) {
        if addr < self.dense.len() {
            self.dense[addr] = value;
            return;
        }

        if addr - self.dense.len() > MAX_DENSE_GAP {
            self.sparse.insert(addr, value);
            return;
        }

        // Vec growth is amortized; the zero fill only covers the gap
        self.dense.resize(addr + 1, 0);
        self.dense[addr] = value;
        self.absorb_sparse();
    }

    /// Number of addressable cells up to and including the highest written one
    pub fn extent(&self) -> usize {
        match self.sparse.keys().next_back() {
            Some(&last) => last + 1,
            None => self.dense.len(),
        }
    }

    /// Non-zero cells as `(address, value)` pairs in ascending address order
    pub fn cells(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.dense
            .iter()
            .copied()
            .enumerate()
            .chain(self.sparse.iter().map(|(&addr, &value)| (addr, value)))
            .filter(|&(_, value)| value != 0)
    }

    fn index(addr: i64) -> Result<usize, VMError> {
        usize::try_from(addr).map_err(|_| VMError::NegativeAddress(addr))
    }

    /// Move sparse cells now covered by the dense region into it
    fn absorb_sparse(&mut self) {
        if self.sparse.is_empty() {
            return;
        }
        let beyond = self.sparse.split_off(&self.dense.len());
        let covered = std::mem::replace(&mut self.sparse, beyond);
        for (addr, value) in covered {
            self.dense[addr] = value;
        }
    }
}

impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        self.cells().eq(other.cells())
    }
}

impl Eq for Memory {}

/// Serialized layout, normalized on the way in
#[derive(Deserialize)]
struct MemoryParts {
    dense: Vec<i64>,
    #[serde(default)]
    sparse: BTreeMap<usize, i64>,
}

impl From<MemoryParts> for Memory {
    fn from(parts: MemoryParts) -> Self {
        let mut memory = Memory {
            dense: parts.dense,
            sparse: parts.sparse,
        };
        memory.absorb_sparse();
        memory
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Memory: [")?;
        for (i, value) in self.dense.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")?;
        if !self.sparse.is_empty() {
            write!(f, " + {{")?;
            for (i, (addr, value)) in self.sparse.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", addr, value)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_initial_image() {
        let memory = Memory::new(&[1, 0, 0, 0, 99]);
        assert_eq!(memory.read(0).unwrap(), 1);
        assert_eq!(memory.read(4).unwrap(), 99);
        assert_eq!(memory.extent(), 5);
    }

    #[test]
    fn test_read_past_end_is_zero() {
        let memory = Memory::new(&[1, 2, 3]);
        assert_eq!(memory.read(3).unwrap(), 0);
        assert_eq!(memory.read(1_000_000_000).unwrap(), 0);
        assert_eq!(memory.extent(), 3);
    }

    #[test]
    fn test_write_grows_dense_region() {
        let mut memory = Memory::new(&[1, 2, 3]);
        memory.write(10, 42).unwrap();
        assert_eq!(memory.read(10).unwrap(), 42);
        assert_eq!(memory.read(7).unwrap(), 0);
        assert_eq!(memory.extent(), 11);
    }

    #[test]
    fn test_far_write_is_sparse() {
        let mut memory = Memory::new(&[5]);
        memory.write(1 << 40, -7).unwrap();
        assert_eq!(memory.read(1 << 40).unwrap(), -7);
        assert_eq!(memory.extent(), (1usize << 40) + 1);
        assert_eq!(memory.dense.len(), 1);
    }

    #[test]
    fn test_dense_growth_absorbs_sparse_cells() {
        let mut memory = Memory::new(&[]);
        let far = MAX_DENSE_GAP + 10;
        memory.write(far as i64, 9).unwrap();
        assert_eq!(memory.sparse.len(), 1);

        // Close enough to the grown dense region to be filled in
        memory.write(20, 3).unwrap();
        assert_eq!(memory.sparse.len(), 1);
        memory.write((far + 1) as i64, 4).unwrap();
        assert!(memory.sparse.is_empty());
        assert_eq!(memory.read(far as i64).unwrap(), 9);
        assert_eq!(memory.read(20).unwrap(), 3);
        assert_eq!(memory.read((far + 1) as i64).unwrap(), 4);
    }

    #[test]
    fn test_negative_address_rejected() {
        let mut memory = Memory::new(&[0]);
        assert_eq!(memory.read(-1), Err(VMError::NegativeAddress(-1)));
        assert_eq!(memory.write(-3, 1), Err(VMError::NegativeAddress(-3)));
        assert_eq!(memory, Memory::new(&[0]));
    }

    #[test]
    fn test_cells_after_far_write() {
        let mut memory = Memory::new(&[1, 0, 2]);
        memory.write(1 << 40, 7).unwrap();
        let cells: Vec<(usize, i64)> = memory.cells().collect();
        assert_eq!(cells, vec![(0, 1), (2, 2), (1 << 40, 7)]);
    }

    #[test]
    fn test_equality_ignores_layout() {
        let mut sparse = Memory::new(&[]);
        sparse.write(70_000, 5).unwrap();

        let mut dense = Memory::new(&[]);
        dense.write(60_000, 0).unwrap();
        dense.write(70_000, 5).unwrap();

        assert!(dense.sparse.is_empty());
        assert_eq!(sparse, dense);

        // Trailing zeros do not count either
        assert_eq!(Memory::new(&[3, 0, 0]), Memory::new(&[3]));
        assert_ne!(Memory::new(&[3, 0, 1]), Memory::new(&[3]));
    }

    #[test]
    fn test_deserialize_folds_covered_sparse_cells() {
        let memory: Memory =
            serde_json::from_str(r#"{"dense": [1, 2, 3], "sparse": {"1": 9, "500000": 4}}"#)
                .unwrap();
        assert_eq!(memory.read(1).unwrap(), 9);
        assert_eq!(memory.read(500_000).unwrap(), 4);
        assert_eq!(memory.sparse.len(), 1);
        assert_eq!(memory.dense, vec![1, 9, 3]);
    }
}
