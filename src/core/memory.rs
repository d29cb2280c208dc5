use std::collections::BTreeMap;
use std::ops::Index;

#[cfg(feature = "serde-snapshot")]
use serde::{Deserialize, Serialize};

/// Auto-extending word store addressed from zero.
///
/// The low `DENSE_LIMIT` addresses live in a growable vector; anything above
/// that goes into a sparse map so a single far write cannot allocate the
/// whole gap. Unset cells read as zero in both regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-snapshot", derive(Serialize, Deserialize))]
pub struct Memory {
    cells: Vec<i64>,
    sparse: BTreeMap<usize, i64>,
}

impl Memory {
    pub const DENSE_LIMIT: usize = 1 << 20;

    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a program image into fresh memory starting at address 0.
    pub fn from_image(image: &[i64]) -> Self {
        let mut memory = Self::new();
        for (addr, &value) in image.iter().enumerate() {
            memory.write(addr, value);
        }
        memory
    }

    /// Read a word; addresses never written read as 0
    pub fn read(&self, addr: usize) -> i64 {
        if addr < Self::DENSE_LIMIT {
            self.cells.get(addr).copied().unwrap_or(0)
        } else {
            self.sparse.get(&addr).copied().unwrap_or(0)
        }
    }

    /// Write a word, growing the store as needed
    pub fn write(&mut self, addr: usize, value: i64) {
        if addr < Self::DENSE_LIMIT {
            if addr >= self.cells.len() {
                if value == 0 {
                    // unset cells already read as zero
                    return;
                }
                self.cells.resize(addr + 1, 0);
            }
            self.cells[addr] = value;
        } else if value == 0 {
            self.sparse.remove(&addr);
        } else {
            self.sparse.insert(addr, value);
        }
    }

    /// One past the highest address that holds a backing cell.
    pub fn extent(&self) -> usize {
        match self.sparse.last_key_value() {
            Some((&addr, _)) => addr + 1,
            None => self.cells.len(),
        }
    }

    /// Contents of `[start, start + len)` as a vector.
    pub fn dump(&self, start: usize, len: usize) -> Vec<i64> {
        (start..start.saturating_add(len)).map(|a| self.read(a)).collect()
    }
}

impl Index<usize> for Memory {
    type Output = i64;

    fn index(&self, addr: usize) -> &i64 {
        const ZERO: i64 = 0;
        let slot = if addr < Self::DENSE_LIMIT {
            self.cells.get(addr)
        } else {
            self.sparse.get(&addr)
        };
        slot.unwrap_or(&ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_write() {
        let mut mem = Memory::new();
        mem.write(0, 12);
        assert_eq!(mem.read(0), 12);
        mem.write(99, -4);
        assert_eq!(mem.read(99), -4);
        // gap between writes reads as zero
        assert_eq!(mem.read(50), 0);
        assert_eq!(mem[99], -4);
    }

    #[test]
    fn unset_reads_zero_without_growing() {
        let mem = Memory::from_image(&[1, 2, 3]);
        assert_eq!(mem.read(1_000), 0);
        assert_eq!(mem[1_000], 0);
        assert_eq!(mem.extent(), 3);
    }

    #[test]
    fn far_writes_stay_sparse() {
        let mut mem = Memory::from_image(&[7]);
        let far = Memory::DENSE_LIMIT * 64;
        mem.write(far, 5);
        assert_eq!(mem.read(far), 5);
        assert_eq!(mem.extent(), far + 1);
        assert_eq!(mem.cells.len(), 1);

        mem.write(far, 0);
        assert_eq!(mem.extent(), 1);
    }

    #[test]
    fn clones_are_independent() {
        let mut a = Memory::from_image(&[1, 2, 3]);
        let b = a.clone();
        a.write(0, 100);
        assert_eq!(b.read(0), 1);
        assert_eq!(a.dump(0, 3), vec![100, 2, 3]);
    }
}
