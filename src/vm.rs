//! Intcode execution engine
//!
//! [`Machine`] owns memory, the program counter and the relative base, and
//! runs one instruction per [`Machine::step`]. Execution pauses at exactly two
//! points:
//!
//! - before an `Input` instruction when no value is available; the program
//!   counter is left on that instruction so resuming re-attempts it, and
//! - after an `Output` instruction, when the caller asked to suspend there.
//!
//! Neither pause is an error. Faults are terminal: the machine records the
//! fault, reports it, and refuses to execute further.

use std::collections::VecDeque;

use bitflags::bitflags;
use log::{debug, trace, warn};

#[cfg(feature = "serde-snapshot")]
use serde::{Deserialize, Serialize};

use crate::core::Memory;
use crate::decoder::{Instruction, Mode, Opcode, decode};
use crate::error::{ModeFault, VmError};
use crate::io::{InputPort, OutputPort};
use crate::snapshot::Snapshot;

/// Run status of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-snapshot", derive(Serialize, Deserialize))]
pub enum Status {
    Running,
    /// Reached opcode 99. Terminal.
    Halted,
    /// Suspended before an `Input` instruction
    AwaitingInput,
    /// Suspended just after an `Output` instruction
    ProducedOutput,
    /// Invalid opcode, mode or address. Terminal.
    Faulted,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Halted | Self::Faulted)
    }
}

bitflags! {
    /// Suspension points requested from [`Machine::run`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SuspendOn: u8 {
        const INPUT = 0x01;
        const OUTPUT = 0x02;
    }
}

impl SuspendOn {
    /// Build from the two classic flags.
    pub fn from_flags(stop_on_input: bool, stop_on_output: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::INPUT, stop_on_input);
        flags.set(Self::OUTPUT, stop_on_output);
        flags
    }
}

/// Machine execution statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineStats {
    pub steps: u64,
    pub pc: usize,
    pub relative_base: i64,
    pub status: Status,
}

/// Resolved location of a parameter
#[derive(Debug, Clone, Copy)]
enum Operand {
    Address(usize),
    Value(i64),
}

/// Intcode virtual machine
#[derive(Debug, Clone)]
pub struct Machine {
    memory: Memory,
    pc: usize,
    relative_base: i64,
    status: Status,
    fault: Option<VmError>,

    // Internal ports used by `step`/`run`
    inbox: VecDeque<i64>,
    outbox: Vec<i64>,
    last_output: Option<i64>,

    steps: u64,
}

impl Machine {
    /// Load a program image into fresh memory.
    pub fn load(program: &[i64]) -> Self {
        Self::with_state(Memory::from_image(program), 0, 0)
    }

    /// Restart from a snapshot. The resulting machine is `Running` with empty
    /// input and output buffers.
    pub fn resume(snapshot: Snapshot) -> Self {
        debug!(
            "resuming from snapshot at pc {} (relative base {})",
            snapshot.pc, snapshot.relative_base
        );
        Self::with_state(snapshot.memory, snapshot.pc, snapshot.relative_base)
    }

    fn with_state(memory: Memory, pc: usize, relative_base: i64) -> Self {
        Self {
            memory,
            pc,
            relative_base,
            status: Status::Running,
            fault: None,
            inbox: VecDeque::new(),
            outbox: Vec::new(),
            last_output: None,
            steps: 0,
        }
    }

    /// Capture pc, relative base and a deep copy of memory.
    pub fn snapshot(&self) -> Snapshot {
        debug!("snapshot at pc {} (relative base {})", self.pc, self.relative_base);
        Snapshot {
            pc: self.pc,
            relative_base: self.relative_base,
            memory: self.memory.clone(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// The fault that stopped this machine, if any.
    pub fn fault(&self) -> Option<&VmError> {
        self.fault.as_ref()
    }

    pub fn stats(&self) -> MachineStats {
        MachineStats {
            steps: self.steps,
            pc: self.pc,
            relative_base: self.relative_base,
            status: self.status,
        }
    }

    /// Peek at memory
    pub fn read_memory(&self, addr: usize) -> i64 {
        self.memory.read(addr)
    }

    /// Poke memory, extending it if needed
    pub fn write_memory(&mut self, addr: usize, value: i64) {
        self.memory.write(addr, value);
    }

    /// Queue one value for the next `Input` instruction run through
    /// [`Machine::step`] or [`Machine::run`].
    pub fn feed_input(&mut self, value: i64) {
        self.inbox.push_back(value);
    }

    /// Queue several input values in order.
    pub fn feed_inputs(&mut self, values: impl IntoIterator<Item = i64>) {
        self.inbox.extend(values);
    }

    pub fn pending_inputs(&self) -> usize {
        self.inbox.len()
    }

    /// Most recently produced output, cleared once taken.
    pub fn take_output(&mut self) -> Option<i64> {
        self.last_output.take()
    }

    /// All outputs produced through the internal buffer so far.
    pub fn drain_outputs(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.outbox)
    }

    /// Execute one instruction using the internal input queue and output
    /// buffer.
    pub fn step(&mut self) -> Result<Status, VmError> {
        let mut inbox = std::mem::take(&mut self.inbox);
        let mut outbox = std::mem::take(&mut self.outbox);
        let result = self.step_with(&mut inbox, &mut outbox);
        self.inbox = inbox;
        self.outbox = outbox;
        result
    }

    /// Run with the internal buffers until halted, faulted or suspended.
    pub fn run(&mut self, suspend: SuspendOn) -> Result<Status, VmError> {
        let mut inbox = std::mem::take(&mut self.inbox);
        let mut outbox = std::mem::take(&mut self.outbox);
        let result = self.run_with(&mut inbox, &mut outbox, suspend);
        self.inbox = inbox;
        self.outbox = outbox;
        result
    }

    /// Run to halt; running out of input is an error.
    pub fn run_to_halt(&mut self) -> Result<Status, VmError> {
        self.run(SuspendOn::empty())
    }

    /// Run until halted or input is needed.
    pub fn run_until_input(&mut self) -> Result<Status, VmError> {
        self.run(SuspendOn::INPUT)
    }

    /// Run until halted, input is needed, or a value is produced.
    pub fn run_until_io(&mut self) -> Result<Status, VmError> {
        self.run(SuspendOn::INPUT | SuspendOn::OUTPUT)
    }

    /// Run against caller-supplied ports.
    ///
    /// Without [`SuspendOn::INPUT`], an empty input port yields
    /// [`VmError::InputUnderflow`]; the machine stays `AwaitingInput` and may
    /// be run again once input exists.
    pub fn run_with<I, O>(&mut self, mut input: I, mut output: O, suspend: SuspendOn) -> Result<Status, VmError>
    where
        I: InputPort,
        O: OutputPort,
    {
        loop {
            match self.step_with(&mut input, &mut output)? {
                Status::Running => {}
                Status::ProducedOutput => {
                    if suspend.contains(SuspendOn::OUTPUT) {
                        return Ok(Status::ProducedOutput);
                    }
                }
                Status::AwaitingInput => {
                    if suspend.contains(SuspendOn::INPUT) {
                        debug!("suspended awaiting input at pc {}", self.pc);
                        return Ok(Status::AwaitingInput);
                    }
                    return Err(VmError::InputUnderflow { pc: self.pc });
                }
                status @ (Status::Halted | Status::Faulted) => return Ok(status),
            }
        }
    }

    /// Execute exactly one instruction against caller-supplied ports.
    ///
    /// Returns `AwaitingInput` without side effects when an `Input`
    /// instruction finds no value, and `ProducedOutput` after every `Output`.
    pub fn step_with<I, O>(&mut self, mut input: I, mut output: O) -> Result<Status, VmError>
    where
        I: InputPort,
        O: OutputPort,
    {
        match self.status {
            Status::Halted => return Ok(Status::Halted),
            Status::Faulted => return Err(VmError::Terminated { pc: self.pc }),
            _ => {}
        }

        match self.execute(&mut input, &mut output) {
            Ok(status) => {
                self.status = status;
                if status == Status::Running {
                    self.steps += 1;
                }
                Ok(status)
            }
            Err(err) => {
                warn!("machine faulted at pc {}: {}", self.pc, err);
                self.status = Status::Faulted;
                self.fault = Some(err.clone());
                Err(err)
            }
        }
    }

    fn execute(&mut self, input: &mut impl InputPort, output: &mut impl OutputPort) -> Result<Status, VmError> {
        let inst = decode(self.memory.read(self.pc))?;
        trace!("{:>6}: {} {:?} (rb {})", self.pc, inst.opcode, inst.modes, self.relative_base);

        match inst.opcode {
            Opcode::Add => {
                let (a, b) = (self.read_param(&inst, 1)?, self.read_param(&inst, 2)?);
                let sum = a.checked_add(b).ok_or(VmError::ArithmeticOverflow { pc: self.pc })?;
                self.write_param(&inst, 3, sum)?;
                self.pc += 4;
            }
            Opcode::Multiply => {
                let (a, b) = (self.read_param(&inst, 1)?, self.read_param(&inst, 2)?);
                let product = a.checked_mul(b).ok_or(VmError::ArithmeticOverflow { pc: self.pc })?;
                self.write_param(&inst, 3, product)?;
                self.pc += 4;
            }
            Opcode::Input => {
                // resolve the target first so a bad target never swallows a value
                let dst = self.write_address(&inst, 1)?;
                let Some(value) = input.next_input() else {
                    return Ok(Status::AwaitingInput);
                };
                self.memory.write(dst, value);
                self.pc += 2;
            }
            Opcode::Output => {
                let value = self.read_param(&inst, 1)?;
                output.offer(value);
                self.last_output = Some(value);
                self.pc += 2;
                self.steps += 1;
                return Ok(Status::ProducedOutput);
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let test = self.read_param(&inst, 1)?;
                let take = (test != 0) == (inst.opcode == Opcode::JumpIfTrue);
                if take {
                    self.pc = to_address(self.read_param(&inst, 2)?)?;
                } else {
                    self.pc += 3;
                }
            }
            Opcode::LessThan => {
                let (a, b) = (self.read_param(&inst, 1)?, self.read_param(&inst, 2)?);
                self.write_param(&inst, 3, i64::from(a < b))?;
                self.pc += 4;
            }
            Opcode::Equals => {
                let (a, b) = (self.read_param(&inst, 1)?, self.read_param(&inst, 2)?);
                self.write_param(&inst, 3, i64::from(a == b))?;
                self.pc += 4;
            }
            Opcode::AdjustRelativeBase => {
                let delta = self.read_param(&inst, 1)?;
                self.relative_base = self
                    .relative_base
                    .checked_add(delta)
                    .ok_or(VmError::ArithmeticOverflow { pc: self.pc })?;
                self.pc += 2;
            }
            Opcode::Halt => {
                debug!("halted at pc {} after {} steps", self.pc, self.steps);
                return Ok(Status::Halted);
            }
        }

        Ok(Status::Running)
    }

    fn resolve(&self, inst: &Instruction, param: usize) -> Result<Operand, VmError> {
        let raw = self.memory.read(self.pc + param);
        match inst.mode(param) {
            Mode::Position => to_address(raw).map(Operand::Address),
            Mode::Immediate => Ok(Operand::Value(raw)),
            Mode::Relative => {
                let addr = self
                    .relative_base
                    .checked_add(raw)
                    .ok_or(VmError::ArithmeticOverflow { pc: self.pc })?;
                to_address(addr).map(Operand::Address)
            }
        }
    }

    fn read_param(&self, inst: &Instruction, param: usize) -> Result<i64, VmError> {
        Ok(match self.resolve(inst, param)? {
            Operand::Address(addr) => self.memory.read(addr),
            Operand::Value(value) => value,
        })
    }

    fn write_address(&self, inst: &Instruction, param: usize) -> Result<usize, VmError> {
        match self.resolve(inst, param)? {
            Operand::Address(addr) => Ok(addr),
            Operand::Value(_) => Err(VmError::InvalidAddressingMode {
                word: inst.word,
                param,
                fault: ModeFault::ImmediateWrite,
            }),
        }
    }

    fn write_param(&mut self, inst: &Instruction, param: usize, value: i64) -> Result<(), VmError> {
        let addr = self.write_address(inst, param)?;
        self.memory.write(addr, value);
        Ok(())
    }
}

impl From<Snapshot> for Machine {
    fn from(snapshot: Snapshot) -> Self {
        Self::resume(snapshot)
    }
}

fn to_address(value: i64) -> Result<usize, VmError> {
    usize::try_from(value).map_err(|_| VmError::NegativeAddress(value))
}
