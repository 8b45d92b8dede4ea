//! # wsim-common
//!
//! Common types shared by every part of the wireless network simulator.
//!
//! This crate holds the data model of a simulation run:
//! - [`SimTime`] - simulation clock values and durations, in seconds
//! - [`NodeId`] / [`EventId`] / [`TransmissionId`] - identifiers
//! - [`SimulationEvent`] and the tagged [`EventPayload`] union
//! - [`EventQueue`] - time-ordered pending events with stable tie-breaking
//! - [`EventLog`] - the append-only per-node history
//! - [`RandomSource`] and the process-wide seed source
//! - [`node_tracer`] - opt-in per-node trace output

pub mod event;
pub mod history;
pub mod node_tracer;
pub mod packet;
pub mod queue;
pub mod random;

pub use event::{
    ButtonEventContext, EventPayload, EventType, PowerStateContext, SimulationEvent,
    TimerEventContext,
};
pub use history::EventLog;
pub use packet::{RadioMode, TransmissionId, WirelessPacket, WirelessPacketTransmission};
pub use queue::EventQueue;
pub use random::{init_seed_source, next_seed, RandomSource};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

// ============================================================================
// Simulation Time
// ============================================================================

/// A point in simulation time (or a duration), measured in seconds.
///
/// Propagation delays are in the tens of nanoseconds while timers run for
/// seconds, so time is kept as `f64`. Values are always finite, which lets
/// `SimTime` provide a total order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// Time zero.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a time from seconds.
    pub fn from_secs(secs: f64) -> Self {
        debug_assert!(secs.is_finite(), "simulation time must be finite");
        SimTime(secs)
    }

    /// Create a time from milliseconds.
    pub fn from_millis(millis: f64) -> Self {
        SimTime::from_secs(millis / 1_000.0)
    }

    /// Create a time from microseconds.
    pub fn from_micros(micros: f64) -> Self {
        SimTime::from_secs(micros / 1_000_000.0)
    }

    /// Seconds as `f64`.
    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }

    /// Milliseconds as `f64`.
    pub fn as_millis_f64(&self) -> f64 {
        self.0 * 1_000.0
    }

    /// Microseconds as `f64`.
    pub fn as_micros_f64(&self) -> f64 {
        self.0 * 1_000_000.0
    }

    /// The later of two times.
    pub fn max(self, other: SimTime) -> SimTime {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Whether this value is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 - rhs.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a node within its simulation (position in the topology node list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new node ID.
    pub fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Index into the simulation's node list.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Unique identifier of an event within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

// ============================================================================
// LED Color
// ============================================================================

/// RGB color of a node's LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
