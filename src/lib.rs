// Copyright (C) 2025 Dayton Fishell
// Intcode Virtual Machine
// This file is part of Intcode.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Intcode virtual machine
//!
//! This library provides the Intcode interpreter: sparse memory, instruction
//! decoding, a suspendable execution engine with snapshots, pluggable I/O
//! ports, and composition helpers for amplifier chains and packet networks.

pub mod amplifier;
pub mod core;
pub mod decoder;
pub mod error;
pub mod io;
pub mod network;
pub mod snapshot;
pub mod vm;

// Re-export commonly used types
pub use amplifier::{AmplifierChain, ChainError, run_chain, run_feedback_loop};
pub use crate::core::{Memory, ParseProgramError, Program};
pub use decoder::{Instruction, Mode, Opcode, decode};
pub use error::{IncompleteOutputGroup, ModeFault, VmError};
pub use io::{AsciiInput, AsciiOutput, InputPort, NoInput, OutputPort, SingleValue, group_outputs};
pub use network::{Nat, NatConfig, Network, NetworkConfig, NetworkError, Packet, RepeatTrigger};
pub use snapshot::Snapshot;
pub use vm::{Machine, MachineStats, Status, SuspendOn};
