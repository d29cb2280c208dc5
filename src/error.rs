//! VM fault taxonomy.

use std::fmt;

use thiserror::Error;

/// Why an addressing mode was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFault {
    /// Mode digit outside {0, 1, 2}
    UnknownDigit(i64),
    /// Immediate mode used for a parameter that is written to
    ImmediateWrite,
}

impl fmt::Display for ModeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDigit(d) => write!(f, "unknown mode digit {d}"),
            Self::ImmediateWrite => f.write_str("immediate mode cannot be a write target"),
        }
    }
}

/// Errors raised by the decoder and execution engine.
///
/// Everything except [`VmError::InputUnderflow`] is fatal: the machine moves to
/// [`Status::Faulted`](crate::Status::Faulted) and refuses to step again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("invalid opcode {opcode} in instruction word {word}")]
    InvalidOpcode { word: i64, opcode: i64 },
    #[error("invalid addressing mode for parameter {param} of instruction word {word}: {fault}")]
    InvalidAddressingMode {
        word: i64,
        param: usize,
        fault: ModeFault,
    },
    #[error("negative address {0}")]
    NegativeAddress(i64),
    #[error("arithmetic overflow at pc {pc}")]
    ArithmeticOverflow { pc: usize },
    /// Input was needed but none was available and the caller did not ask to
    /// suspend on input. The machine stays resumable.
    #[error("input requested at pc {pc} but none was available")]
    InputUnderflow { pc: usize },
    #[error("machine faulted at pc {pc} and cannot be resumed")]
    Terminated { pc: usize },
}

impl VmError {
    /// Whether this error leaves the machine in a terminal state.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InputUnderflow { .. })
    }
}

/// A grouped output stream ended with a partial group.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("output stream ended with {} trailing value(s), expected groups of {group_size}", .trailing.len())]
pub struct IncompleteOutputGroup {
    pub group_size: usize,
    pub trailing: Vec<i64>,
}
