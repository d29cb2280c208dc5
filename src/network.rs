//! Packet network of Intcode machines.
//!
//! Every machine is a network interface: it is booted with its own address as
//! first input, reads packets from a private FIFO as `x` then `y`, and sends
//! packets by emitting `(destination, x, y)` triples. Machines are polled
//! round-robin; none of them ever blocks the others.
//!
//! A machine with an empty queue is handed the configured idle value once per
//! poll. If it asks again in the same poll it is suspended, and when it also
//! sent nothing during that poll it counts as idle for the round. When every
//! machine is idle after a round the [`Nat`] may re-inject the last packet it
//! received to restart traffic.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use thiserror::Error;

use crate::error::{IncompleteOutputGroup, VmError};
use crate::io::InputPort;
use crate::vm::{Machine, Status, SuspendOn};

/// Values emitted per packet
const PACKET_WIDTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub destination: usize,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("machine {address}: {source}")]
    Vm {
        address: usize,
        #[source]
        source: VmError,
    },
    #[error("machine {address}: {source}")]
    IncompleteOutputGroup {
        address: usize,
        #[source]
        source: IncompleteOutputGroup,
    },
    #[error("machine {from} sent a packet to unknown address {destination}")]
    Unroutable { from: usize, destination: i64 },
    #[error("no machine at address {0}")]
    NoSuchMachine(usize),
    #[error("NAT address {0} collides with a machine address")]
    NatAddressInUse(usize),
    #[error("network has no machines")]
    Empty,
    #[error("every machine has halted")]
    AllHalted,
    #[error("no result after {0} rounds")]
    RoundLimit(usize),
}

/// When the NAT stops re-injecting and reports a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatTrigger {
    /// Same `y` delivered twice in a row
    SameY,
    /// Identical packet delivered twice in a row
    SamePacket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NatConfig {
    /// Machine that receives re-injected packets
    pub restart_address: usize,
    pub trigger: RepeatTrigger,
}

impl Default for NatConfig {
    fn default() -> Self {
        Self {
            restart_address: 0,
            trigger: RepeatTrigger::SameY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Machines booted by [`Network::boot`]
    pub size: usize,
    pub nat_address: usize,
    /// Input handed to a machine whose queue is empty
    pub idle_input: i64,
    /// Give up after this many polling rounds
    pub max_rounds: Option<usize>,
    pub nat: NatConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: 50,
            nat_address: 255,
            idle_input: -1,
            max_rounds: None,
            nat: NatConfig::default(),
        }
    }
}

/// Network interface input: queued packet words, then the idle value once.
struct NicInput<'a> {
    queue: &'a mut VecDeque<i64>,
    idle_input: i64,
    starved: bool,
}

impl InputPort for NicInput<'_> {
    fn next_input(&mut self) -> Option<i64> {
        if let Some(value) = self.queue.pop_front() {
            return Some(value);
        }
        if self.starved {
            return None;
        }
        self.starved = true;
        Some(self.idle_input)
    }
}

#[derive(Debug, Clone)]
struct Nic {
    address: usize,
    machine: Machine,
    queue: VecDeque<i64>,
    /// Emitted values not yet forming a full packet
    pending: Vec<i64>,
    idle: bool,
}

impl Nic {
    fn boot(address: usize, image: &[i64]) -> Self {
        Self {
            address,
            machine: Machine::load(image),
            queue: VecDeque::from([address as i64]),
            pending: Vec::new(),
            idle: false,
        }
    }

    fn poll(&mut self, idle_input: i64) -> Result<Vec<(i64, i64, i64)>, NetworkError> {
        if self.machine.status() == Status::Halted {
            self.idle = true;
            return Ok(Vec::new());
        }

        let mut input = NicInput {
            queue: &mut self.queue,
            idle_input,
            starved: false,
        };
        let status = self
            .machine
            .run_with(&mut input, &mut self.pending, SuspendOn::INPUT)
            .map_err(|source| NetworkError::Vm {
                address: self.address,
                source,
            })?;
        let starved = input.starved;

        let complete = self.pending.len() - self.pending.len() % PACKET_WIDTH;
        let packets: Vec<_> = self
            .pending
            .drain(..complete)
            .collect::<Vec<_>>()
            .chunks_exact(PACKET_WIDTH)
            .map(|c| (c[0], c[1], c[2]))
            .collect();

        if status == Status::Halted && !self.pending.is_empty() {
            return Err(NetworkError::IncompleteOutputGroup {
                address: self.address,
                source: IncompleteOutputGroup {
                    group_size: PACKET_WIDTH,
                    trailing: std::mem::take(&mut self.pending),
                },
            });
        }

        self.idle = status == Status::Halted || (starved && packets.is_empty() && self.queue.is_empty());
        Ok(packets)
    }
}

/// What the NAT does when the network goes idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatAction {
    /// Re-inject this packet, already addressed to the restart machine
    Restart(Packet),
    /// The packet repeats the previous delivery; traffic has settled
    Repeat(Packet),
}

/// Holds the most recent packet sent to the NAT address and restarts an idle
/// network with it.
#[derive(Debug, Clone)]
pub struct Nat {
    config: NatConfig,
    latest: Option<Packet>,
    last_delivered: Option<Packet>,
}

impl Nat {
    pub fn new(config: NatConfig) -> Self {
        Self {
            config,
            latest: None,
            last_delivered: None,
        }
    }

    pub fn receive(&mut self, packet: Packet) {
        self.latest = Some(packet);
    }

    pub fn latest(&self) -> Option<Packet> {
        self.latest
    }

    /// Decide how to restart an idle network. `None` when nothing has been
    /// received since the last restart.
    pub fn wake(&mut self) -> Option<NatAction> {
        let packet = self.latest.take()?;
        let repeated = match (self.config.trigger, self.last_delivered) {
            (RepeatTrigger::SameY, Some(prev)) => prev.y == packet.y,
            (RepeatTrigger::SamePacket, Some(prev)) => prev == packet,
            (_, None) => false,
        };
        if repeated {
            return Some(NatAction::Repeat(packet));
        }
        self.last_delivered = Some(packet);
        Some(NatAction::Restart(Packet {
            destination: self.config.restart_address,
            ..packet
        }))
    }
}

/// Round-robin driver for a set of networked machines.
#[derive(Debug, Clone)]
pub struct Network {
    nics: Vec<Nic>,
    config: NetworkConfig,
    rounds: usize,
}

impl Network {
    /// Boot `config.size` machines running the same program.
    pub fn boot(program: &[i64], config: NetworkConfig) -> Result<Self, NetworkError> {
        let images = vec![program.to_vec(); config.size];
        Self::from_images(&images, config)
    }

    /// Boot one machine per image; machine `i` gets address `i`.
    pub fn from_images(images: &[Vec<i64>], config: NetworkConfig) -> Result<Self, NetworkError> {
        if images.is_empty() {
            return Err(NetworkError::Empty);
        }
        if config.nat_address < images.len() {
            return Err(NetworkError::NatAddressInUse(config.nat_address));
        }

        let nics = images
            .iter()
            .enumerate()
            .map(|(address, image)| Nic::boot(address, image))
            .collect();
        debug!("booted network of {} machines", images.len());
        Ok(Self {
            nics,
            config,
            rounds: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.nics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nics.is_empty()
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn machine(&self, address: usize) -> Option<&Machine> {
        self.nics.get(address).map(|nic| &nic.machine)
    }

    /// Words waiting in a machine's input queue.
    pub fn queued(&self, address: usize) -> Option<&VecDeque<i64>> {
        self.nics.get(address).map(|nic| &nic.queue)
    }

    /// Queue a packet for a machine, as if it had been routed to it.
    pub fn deliver(&mut self, packet: Packet) -> Result<(), NetworkError> {
        let nic = self
            .nics
            .get_mut(packet.destination)
            .ok_or(NetworkError::NoSuchMachine(packet.destination))?;
        nic.queue.extend([packet.x, packet.y]);
        Ok(())
    }

    /// Whether every machine was idle (or halted) in the last round.
    pub fn is_idle(&self) -> bool {
        self.nics.iter().all(|nic| nic.idle)
    }

    fn all_halted(&self) -> bool {
        self.nics.iter().all(|nic| nic.machine.status() == Status::Halted)
    }

    /// Poll every machine once, routing packets as they appear. Returns the
    /// packets addressed to the NAT.
    pub fn round(&mut self) -> Result<Vec<Packet>, NetworkError> {
        if let Some(limit) = self.config.max_rounds {
            if self.rounds >= limit {
                return Err(NetworkError::RoundLimit(limit));
            }
        }
        self.rounds += 1;

        let mut to_nat = Vec::new();
        for index in 0..self.nics.len() {
            let sent = self.nics[index].poll(self.config.idle_input)?;
            for (destination, x, y) in sent {
                trace!("packet {index} -> {destination}: ({x}, {y})");
                match usize::try_from(destination) {
                    Ok(d) if d == self.config.nat_address => to_nat.push(Packet { destination: d, x, y }),
                    Ok(d) if d < self.nics.len() => self.nics[d].queue.extend([x, y]),
                    _ => {
                        warn!("machine {index} sent a packet to unknown address {destination}");
                        return Err(NetworkError::Unroutable {
                            from: index,
                            destination,
                        });
                    }
                }
            }
        }
        Ok(to_nat)
    }

    /// Run until some machine sends a packet to the NAT address.
    pub fn run_until_nat_packet(&mut self) -> Result<Packet, NetworkError> {
        loop {
            if let Some(&packet) = self.round()?.first() {
                return Ok(packet);
            }
            if self.all_halted() {
                return Err(NetworkError::AllHalted);
            }
        }
    }

    /// Run with a NAT restarting the network whenever it goes idle, until the
    /// NAT would re-inject a repeat of its previous delivery. Returns that
    /// repeated packet.
    pub fn run_with_nat(&mut self) -> Result<Packet, NetworkError> {
        let mut nat = Nat::new(self.config.nat);
        loop {
            for packet in self.round()? {
                nat.receive(packet);
            }
            if !self.is_idle() {
                continue;
            }
            if self.all_halted() {
                return Err(NetworkError::AllHalted);
            }
            match nat.wake() {
                Some(NatAction::Restart(packet)) => {
                    debug!(
                        "network idle after round {}, NAT sends ({}, {}) to {}",
                        self.rounds, packet.x, packet.y, packet.destination
                    );
                    self.deliver(packet)?;
                }
                Some(NatAction::Repeat(packet)) => return Ok(packet),
                None => {}
            }
        }
    }
}
