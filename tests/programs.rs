//! End-to-end checks driving the VM the way collaborators do.

use std::collections::VecDeque;

use intcode_core::{
    AsciiInput, AsciiOutput, Machine, Network, NetworkConfig, Program, SingleValue, Status, SuspendOn, VmError,
    group_outputs,
};
use pretty_assertions::assert_eq;

/// Compares input against 8: outputs 999 below, 1000 equal, 1001 above.
const COMPARE_TO_EIGHT: &str = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
    1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,\
    999,1105,1,46,1101,1000,1,20,4,20,1105,1,46,98,99";

fn compare_to_eight() -> Program {
    COMPARE_TO_EIGHT.parse().unwrap()
}

#[test]
fn single_value_mode_collects_all_outputs() {
    let program = compare_to_eight();
    for (input, expected) in [(3, 999), (8, 1000), (13, 1001)] {
        let mut out: Vec<i64> = Vec::new();
        let mut vm = Machine::load(&program);
        let status = vm.run_with(SingleValue(input), &mut out, SuspendOn::empty()).unwrap();
        assert_eq!(status, Status::Halted);
        assert_eq!(out, vec![expected]);
    }
}

#[test]
fn queued_mode_suspends_on_empty_queue() {
    // sums inputs until it reads a zero, then outputs the total
    let program: Program = "3,100,1006,100,12,1,100,101,101,1105,1,0,4,101,99".parse().unwrap();

    let mut queue: VecDeque<i64> = VecDeque::from([5, 7]);
    let mut out: Vec<i64> = Vec::new();
    let mut vm = Machine::load(&program);

    assert_eq!(vm.run_with(&mut queue, &mut out, SuspendOn::INPUT), Ok(Status::AwaitingInput));
    let waiting_at = vm.pc();

    queue.extend([30, 0]);
    assert_eq!(vm.run_with(&mut queue, &mut out, SuspendOn::INPUT), Ok(Status::Halted));
    assert_eq!(waiting_at, 0);
    assert_eq!(out, vec![42]);
}

#[test]
fn feed_and_take_driver_loop() {
    // doubles every input forever
    let image = [3, 11, 1002, 11, 2, 11, 4, 11, 1105, 1, 0, 0];

    let mut vm = Machine::load(&image);
    let mut results = Vec::new();
    for value in [1, 2, 21] {
        assert_eq!(vm.run_until_io(), Ok(Status::AwaitingInput));
        vm.feed_input(value);
        assert_eq!(vm.run_until_io(), Ok(Status::ProducedOutput));
        results.push(vm.take_output().unwrap());
    }
    assert_eq!(results, vec![2, 4, 42]);
}

#[test]
fn grouped_outputs_from_a_display_program() {
    // draws two tiles as (x, y, tile) triples
    let image = [104, 1, 104, 2, 104, 3, 104, 6, 104, 5, 104, 4, 99];
    let mut vm = Machine::load(&image);
    vm.run_to_halt().unwrap();
    let tiles = group_outputs::<3>(&vm.drain_outputs()).unwrap();
    assert_eq!(tiles, vec![[1, 2, 3], [6, 5, 4]]);

    let mut vm = Machine::load(&[104, 1, 104, 2, 104, 3, 104, 4, 99]);
    vm.run_to_halt().unwrap();
    let err = group_outputs::<3>(&vm.drain_outputs()).unwrap_err();
    assert_eq!(err.trailing, vec![4]);
}

#[test]
fn ascii_round_trip_through_the_vm() {
    // echoes characters until it reads a newline, then reports 1234
    let image = [3, 100, 4, 100, 1008, 100, 10, 101, 1006, 101, 0, 104, 1234, 99];
    let mut input = AsciiInput::from_lines(["hello"]);
    let mut output = AsciiOutput::new();
    let mut vm = Machine::load(&image);
    vm.run_with(&mut input, &mut output, SuspendOn::empty()).unwrap();

    assert_eq!(output.text(), "hello\n");
    assert_eq!(output.values(), &[1234]);
}

#[test]
fn faulted_machine_is_a_dead_end() {
    let mut vm = Machine::load(&[1101, 1, 1, 5, 99, 0, 77]);
    // overwrite the halt with an invalid opcode
    vm.write_memory(4, 55);
    let err = vm.run_to_halt().unwrap_err();
    assert_eq!(err, VmError::InvalidOpcode { word: 55, opcode: 55 });
    assert_eq!(vm.read_memory(5), 2);
    assert_eq!(vm.read_memory(6), 77);
    assert!(vm.run_until_io().is_err());
    assert_eq!(vm.status(), Status::Faulted);
}

#[test]
fn networked_machines_exchange_packets() {
    let sender = vec![3, 100, 104, 1, 104, 42, 104, 43, 99];
    // reads address, x, y then outputs x and y back to the NAT
    let receiver = vec![3, 50, 3, 51, 3, 52, 104, 255, 4, 51, 4, 52, 99];
    let config = NetworkConfig {
        max_rounds: Some(10),
        ..NetworkConfig::default()
    };
    let mut net = Network::from_images(&[sender, receiver], config).unwrap();
    let packet = net.run_until_nat_packet().unwrap();
    assert_eq!((packet.x, packet.y), (42, 43));
}
