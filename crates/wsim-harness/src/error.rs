//! Error types for the harness.

use thiserror::Error;
use wsim_engine::{BuildError, SimError};

/// Why a unit test or report did not complete.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to build simulation: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Simulation(#[from] SimError),

    /// An assertion made by a test did not hold.
    #[error("{0}")]
    Verification(String),

    #[error("the network has no nodes")]
    EmptyNetwork,

    #[error("unknown unit test '{0}'")]
    UnknownTest(String),

    #[error("unknown report '{0}'")]
    UnknownReport(String),

    #[error("panicked: {0}")]
    Panic(String),
}

impl HarnessError {
    pub fn verification(message: impl Into<String>) -> Self {
        HarnessError::Verification(message.into())
    }
}
