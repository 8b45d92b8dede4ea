//! Error types for the simulation engine.

use thiserror::Error;
use wsim_common::{EventType, NodeId};
use wsim_radio::RadioConfigError;

/// Error raised by device logic.
///
/// The driver never handles these; they reach the caller of
/// [`Simulation::simulate_time`](crate::Simulation::simulate_time) wrapped in
/// [`SimError::Device`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DeviceError {
    message: String,
}

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        DeviceError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from driving a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation has not been started")]
    NotStarted,

    #[error("simulation was already started")]
    AlreadyStarted,

    #[error("no such node: {0}")]
    UnknownNode(NodeId),

    /// A record-only event type reached dispatch.
    #[error("event type {event_type} cannot be dispatched")]
    UnexpectedEvent { event_type: EventType },

    #[error("node power-off is not supported")]
    PowerOffUnsupported,

    #[error("device logic on {node} failed: {source}")]
    Device {
        node: NodeId,
        #[source]
        source: DeviceError,
    },

    #[error("duration must be non-negative and finite")]
    InvalidDuration,
}

/// Errors from constructing a simulation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("node {index}: unknown node type '{node_type}'")]
    UnknownNodeType { index: usize, node_type: String },

    #[error("base transmit range must be positive and finite, got {0}")]
    InvalidRange(f64),

    #[error("invalid radio configuration: {0}")]
    Radio(#[from] RadioConfigError),
}
