//! Amplifier chains
//!
//! A chain is a row of machines running the same program, each primed with a
//! phase setting. A signal enters the first stage and every stage's output
//! becomes the next stage's input. In feedback mode the last stage feeds the
//! first again until the chain halts.

use log::debug;
use thiserror::Error;

use crate::error::VmError;
use crate::vm::{Machine, Status, SuspendOn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("stage {stage}: {source}")]
    Vm {
        stage: usize,
        #[source]
        source: VmError,
    },
    #[error("stage {0} halted without producing a signal")]
    NoSignal(usize),
    #[error("amplifier chain has no stages")]
    Empty,
}

/// Machines wired output-to-input in a row.
#[derive(Debug, Clone)]
pub struct AmplifierChain {
    stages: Vec<Machine>,
}

impl AmplifierChain {
    /// One stage per phase, each fed its phase setting as first input.
    pub fn new(program: &[i64], phases: &[i64]) -> Self {
        let stages = phases
            .iter()
            .map(|&phase| {
                let mut stage = Machine::load(program);
                stage.feed_input(phase);
                stage
            })
            .collect();
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(&self, index: usize) -> Option<&Machine> {
        self.stages.get(index)
    }

    /// Hand `signal` to `index` and run it until it emits or halts.
    fn drive(&mut self, index: usize, signal: i64) -> Result<Option<i64>, ChainError> {
        let stage = &mut self.stages[index];
        stage.feed_input(signal);
        match stage.run(SuspendOn::OUTPUT) {
            Ok(Status::ProducedOutput) => Ok(stage.take_output()),
            Ok(_) => Ok(None),
            Err(source) => Err(ChainError::Vm { stage: index, source }),
        }
    }

    /// Pass `signal` through every stage once and return what leaves the last.
    pub fn run_serial(&mut self, signal: i64) -> Result<i64, ChainError> {
        if self.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut signal = signal;
        for index in 0..self.stages.len() {
            signal = self.drive(index, signal)?.ok_or(ChainError::NoSignal(index))?;
        }
        Ok(signal)
    }

    /// Loop the signal around the chain until a stage halts; returns the last
    /// signal produced.
    pub fn run_feedback(&mut self, signal: i64) -> Result<i64, ChainError> {
        if self.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut signal = signal;
        let mut produced = false;
        let mut index = 0;
        loop {
            match self.drive(index, signal)? {
                Some(next) => {
                    signal = next;
                    produced = true;
                }
                None if produced => {
                    debug!("stage {index} halted, feedback loop finished with {signal}");
                    return Ok(signal);
                }
                None => return Err(ChainError::NoSignal(index)),
            }
            index = (index + 1) % self.stages.len();
        }
    }
}

/// Run `program` as a serial chain with the given phases.
pub fn run_chain(program: &[i64], phases: &[i64], signal: i64) -> Result<i64, ChainError> {
    AmplifierChain::new(program, phases).run_serial(signal)
}

/// Run `program` as a feedback loop with the given phases.
pub fn run_feedback_loop(program: &[i64], phases: &[i64], signal: i64) -> Result<i64, ChainError> {
    AmplifierChain::new(program, phases).run_feedback(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIAL: [i64; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

    const FEEDBACK: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    #[test]
    fn serial_chain() {
        assert_eq!(run_chain(&SERIAL, &[4, 3, 2, 1, 0], 0), Ok(43210));
    }

    #[test]
    fn feedback_loop() {
        assert_eq!(run_feedback_loop(&FEEDBACK, &[9, 8, 7, 6, 5], 0), Ok(139_629_729));
    }

    #[test]
    fn stage_without_signal() {
        // reads phase and signal, then halts silently
        let program = [3, 0, 3, 0, 99];
        assert_eq!(run_chain(&program, &[1, 2], 0), Err(ChainError::NoSignal(0)));
    }

    #[test]
    fn stage_faults_are_attributed() {
        let program = [3, 0, 3, 0, 4, -1, 99];
        let err = run_chain(&program, &[0], 0).unwrap_err();
        assert_eq!(
            err,
            ChainError::Vm {
                stage: 0,
                source: VmError::NegativeAddress(-1)
            }
        );
    }

    #[test]
    fn empty_chain() {
        assert_eq!(run_chain(&SERIAL, &[], 0), Err(ChainError::Empty));
    }
}
