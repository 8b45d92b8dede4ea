//! Simulation configuration.

use serde::{Deserialize, Serialize};
use wsim_radio::RadioConfig;

/// Per-simulation settings that are not part of the topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub radio: RadioConfig,
    /// Node trace spec, e.g. `"3,7"` or `"*"`. Empty disables tracing.
    pub tracer: String,
}

impl SimulationConfig {
    pub fn with_radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    pub fn with_tracer(mut self, spec: impl Into<String>) -> Self {
        self.tracer = spec.into();
        self
    }
}
