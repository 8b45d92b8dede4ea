//! # wsim-engine
//!
//! Discrete-event engine of the wireless network simulator.
//!
//! - [`Simulation`] - owns the clock and the event queue and dispatches
//!   events to device logic in time order
//! - [`DeviceLogic`] / [`DeviceContext`] - the contract device kinds
//!   implement, and the capability API they drive their node through
//! - [`DeviceRegistry`] - node-type identifiers mapped to device factories
//! - [`Topology`] - the node list a simulation is built from
//!
//! ```rust,ignore
//! let mut registry = DeviceRegistry::new();
//! registry.register_default::<Blinker>("blinker");
//!
//! let topology = Topology::new(30.0).with_node(0.0, 0.0, "blinker");
//! let mut sim = Simulation::new(&topology, &registry, SimulationConfig::default(), 42)?;
//! sim.start_simulation(SimTime::from_secs(120.0))?;
//! sim.simulate_time(SimTime::from_secs(1.0))?;
//! ```

mod config;
mod device;
mod error;
mod node;
mod registry;
mod runtime;
mod simulation;
mod topology;

pub use config::SimulationConfig;
pub use device::{DeviceContext, DeviceLogic, TimerCallback};
pub use error::{BuildError, DeviceError, SimError};
pub use node::NodeState;
pub use registry::DeviceRegistry;
pub use simulation::{Simulation, SimulationState};
pub use topology::{Topology, TopologyNode};

pub use wsim_common::{
    Color, EventLog, EventPayload, EventType, NodeId, RadioMode, SimTime, SimulationEvent,
    TransmissionId,
};
pub use wsim_radio::{Position, RadioConfig};
