// Copyright (C) 2025 Dayton Fishell
// Intcode Virtual Machine
// This file is part of Intcode.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

// A simple demo program for the Intcode VM.
use anyhow::{Context, Result, ensure};
use intcode_core::{Machine, Program, Status, run_feedback_loop};

const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";

const FEEDBACK_AMPLIFIER: &str =
    "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

fn main() -> Result<()> {
    env_logger::init();

    println!("Intcode VM v0.1.0");
    println!("=================");
    println!();

    let program: Program = QUINE.parse().context("parsing demo program")?;
    println!("Loading quine ({} words)...", program.len());
    let mut vm = Machine::load(&program);

    println!("Initial state:");
    println!("  PC: {}", vm.pc());
    println!("  RB: {}", vm.relative_base());
    println!();

    println!("Executing, one output at a time...");
    let mut outputs = Vec::new();
    while vm.run_until_io()? == Status::ProducedOutput {
        if let Some(value) = vm.take_output() {
            outputs.push(value);
        }
    }

    let stats = vm.stats();
    println!("Final state:");
    println!("  PC:     {}", stats.pc);
    println!("  RB:     {}", stats.relative_base);
    println!("  Steps:  {}", stats.steps);
    println!("  Status: {:?}", stats.status);
    println!();

    let echoed = Program::new(outputs);
    println!("Output: {echoed}");
    ensure!(echoed == program, "quine did not reproduce itself");
    println!("✓ Quine reproduced its own source");
    println!();

    let amplifier: Program = FEEDBACK_AMPLIFIER.parse()?;
    let signal = run_feedback_loop(&amplifier, &[9, 8, 7, 6, 5], 0)?;
    println!("Feedback amplifier signal: {signal}");

    Ok(())
}
