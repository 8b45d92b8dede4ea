//! # wsim-radio
//!
//! Radio model for the wireless network simulator.
//!
//! - [`RadioConfig`] - PHY constants and loss probabilities
//! - [`PropagationModel`] - decides, for one transmitted packet, which
//!   receivers get it, when, and whether it survives noise, fading,
//!   collisions and the receiver's duty cycle
//! - [`TransmissionStore`] - every per-receiver transmission record of a run
//! - [`timeline`] - receive-window reconstruction from node histories
//!
//! ## Loss model
//!
//! For each node within range of the sender, in node-list order:
//!
//! 1. random noise drop with `noise_drop_probability`
//! 2. fading drop with `distance_drop_factor * distance / range`
//! 3. collision with any transmission still in flight at the receiver; both
//!    transmissions fail
//! 4. duty-cycle check at packet start

mod config;
mod error;
mod propagation;
pub mod timeline;

pub use config::RadioConfig;
pub use error::RadioConfigError;
pub use propagation::{
    Position, PropagationModel, RadioEndpoint, TransmissionStore, TransmitOutcome,
};
