//! Error types for the radio crate.

use thiserror::Error;

/// Invalid radio configuration.
#[derive(Debug, Error, PartialEq)]
pub enum RadioConfigError {
    /// A rate, length or speed that must be positive is not.
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive {
        field: &'static str,
        value: f64,
    },

    /// A probability outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    InvalidProbability {
        field: &'static str,
        value: f64,
    },

    /// Transmit range must be positive.
    #[error("transmit range must be positive and finite, got {0}")]
    InvalidRange(f64),
}
