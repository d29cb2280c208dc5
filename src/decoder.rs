//! Intcode instruction decoding
//!
//! An instruction word packs the opcode into its two lowest decimal digits
//! and one addressing-mode digit per parameter above that:
//!
//! ```text
//!   ABCDE
//!    1002
//!   DE - two-digit opcode      (02 = Multiply)
//!    C - mode of parameter 1   (0 = Position)
//!    B - mode of parameter 2   (1 = Immediate)
//!    A - mode of parameter 3   (0 = Position, omitted leading zero)
//! ```

use std::fmt;

use crate::error::{ModeFault, VmError};

/// Parameter addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Operand is an address
    Position,
    /// Operand is the value itself; never a write target
    Immediate,
    /// Operand is an offset from the relative base
    Relative,
}

impl Mode {
    fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Self::Position),
            1 => Some(Self::Immediate),
            2 => Some(Self::Relative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustRelativeBase,
    Halt,
}

impl Opcode {
    pub fn from_code(code: i64) -> Option<Self> {
        let op = match code {
            1 => Self::Add,
            2 => Self::Multiply,
            3 => Self::Input,
            4 => Self::Output,
            5 => Self::JumpIfTrue,
            6 => Self::JumpIfFalse,
            7 => Self::LessThan,
            8 => Self::Equals,
            9 => Self::AdjustRelativeBase,
            99 => Self::Halt,
            _ => return None,
        };
        Some(op)
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Add => 1,
            Self::Multiply => 2,
            Self::Input => 3,
            Self::Output => 4,
            Self::JumpIfTrue => 5,
            Self::JumpIfFalse => 6,
            Self::LessThan => 7,
            Self::Equals => 8,
            Self::AdjustRelativeBase => 9,
            Self::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word.
    pub fn arity(self) -> usize {
        match self {
            Self::Add | Self::Multiply | Self::LessThan | Self::Equals => 3,
            Self::JumpIfTrue | Self::JumpIfFalse => 2,
            Self::Input | Self::Output | Self::AdjustRelativeBase => 1,
            Self::Halt => 0,
        }
    }

    /// Instruction length in words, including the instruction word.
    pub fn width(self) -> usize {
        self.arity() + 1
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Multiply => "MUL",
            Self::Input => "IN",
            Self::Output => "OUT",
            Self::JumpIfTrue => "JT",
            Self::JumpIfFalse => "JF",
            Self::LessThan => "LT",
            Self::Equals => "EQ",
            Self::AdjustRelativeBase => "ARB",
            Self::Halt => "HALT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; 3],
    /// The raw word this was decoded from, kept for fault reports
    pub word: i64,
}

impl Instruction {
    /// Mode of 1-based parameter `param`.
    pub fn mode(&self, param: usize) -> Mode {
        self.modes[param - 1]
    }
}

/// Decode an instruction word.
///
/// All three mode digits are validated, even for opcodes that take fewer
/// parameters. Negative words have no valid decoding.
pub fn decode(word: i64) -> Result<Instruction, VmError> {
    if word < 0 {
        return Err(VmError::InvalidOpcode { word, opcode: word });
    }

    let code = word % 100;
    let opcode = Opcode::from_code(code).ok_or(VmError::InvalidOpcode { word, opcode: code })?;

    let mut modes = [Mode::Position; 3];
    let mut divisor = 100;
    for (i, slot) in modes.iter_mut().enumerate() {
        let digit = (word / divisor) % 10;
        *slot = Mode::from_digit(digit).ok_or(VmError::InvalidAddressingMode {
            word,
            param: i + 1,
            fault: ModeFault::UnknownDigit(digit),
        })?;
        divisor *= 10;
    }

    Ok(Instruction {
        opcode,
        modes,
        word,
    })
}
