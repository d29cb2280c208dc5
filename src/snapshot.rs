//! Machine snapshots.
//!
//! A [`Snapshot`] is a deep copy of everything needed to continue execution:
//! program counter, relative base and memory. Resuming the same snapshot
//! several times gives independent machines, which is how a driver explores
//! alternative inputs from one suspension point without re-running the
//! program from the start.

#[cfg(feature = "serde-snapshot")]
use serde::{Deserialize, Serialize};

use crate::core::Memory;
use crate::vm::Machine;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-snapshot", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub pc: usize,
    pub relative_base: i64,
    pub memory: Memory,
}

impl Snapshot {
    /// Start a fresh machine from this snapshot, leaving it reusable.
    pub fn resume(&self) -> Machine {
        Machine::resume(self.clone())
    }

    #[cfg(feature = "serde-snapshot")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    #[cfg(feature = "serde-snapshot")]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Status;

    // reads two values and outputs their sum
    const ADDER: [i64; 11] = [3, 20, 3, 21, 1, 20, 21, 22, 4, 22, 99];

    #[test]
    fn snapshot_captures_registers() {
        let mut vm = Machine::load(&[109, 3, 3, 0, 99]);
        assert_eq!(vm.run_until_input(), Ok(Status::AwaitingInput));

        let snap = vm.snapshot();
        assert_eq!(snap.pc, 2);
        assert_eq!(snap.relative_base, 3);
        assert_eq!(snap.memory.read(0), 109);
    }

    #[test]
    fn branch_from_one_suspension_point() {
        let mut vm = Machine::load(&ADDER);
        vm.feed_input(10);
        assert_eq!(vm.run_until_input(), Ok(Status::AwaitingInput));
        assert_eq!(vm.pc(), 2);

        let snap = vm.snapshot();
        let mut results = Vec::new();
        for second in [1, 5, 32] {
            let mut branch = snap.resume();
            assert_eq!(branch.status(), Status::Running);
            branch.feed_input(second);
            branch.run_to_halt().unwrap();
            results.push(branch.take_output().unwrap());
        }
        assert_eq!(results, vec![11, 15, 42]);

        // the parent machine is untouched by the branches
        assert_eq!(vm.status(), Status::AwaitingInput);
        assert_eq!(vm.read_memory(21), 0);
    }

    #[test]
    fn snapshots_are_deep_copies() {
        let mut vm = Machine::load(&ADDER);
        let first = vm.snapshot();
        vm.write_memory(20, 555);
        let second = vm.snapshot();

        assert_eq!(first.memory.read(20), 0);
        assert_eq!(second.memory.read(20), 555);

        let mut resumed = Machine::from(first.clone());
        resumed.write_memory(0, 99);
        assert_eq!(first.memory.read(0), 3);
    }

    #[cfg(feature = "serde-snapshot")]
    #[test]
    fn snapshot_json() {
        let mut vm = Machine::load(&ADDER);
        vm.feed_input(4);
        vm.run_until_input().unwrap();

        let json = vm.snapshot().to_json().unwrap();
        let restored = Snapshot::from_json(&json).unwrap();
        assert_eq!(restored, vm.snapshot());

        let mut branch = restored.resume();
        branch.feed_input(6);
        branch.run_to_halt().unwrap();
        assert_eq!(branch.take_output(), Some(10));
    }
}
