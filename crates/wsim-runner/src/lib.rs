//! # wsim-runner
//!
//! Command implementations behind the `wsim` binary: listing what is
//! registered, running a unit test in parallel batches, and producing a
//! report from one instance. Topologies are generated in memory from the
//! seed; nothing is read from or written to disk.

use clap::Args;
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::{info, warn};
use wsim_common::{init_seed_source, next_seed, RandomSource};
use wsim_engine::{DeviceRegistry, RadioConfig, SimTime, SimulationConfig, Topology};
use wsim_harness::{run_batch, run_report, BatchSummary, HarnessError, TestRegistry, UnitTestInstance};

/// Time a simulated button is held down.
const PRESS_HOLD_SECS: f64 = 0.5;
/// Quiet time after each press before the next one.
const PRESS_SETTLE_SECS: f64 = 3.0;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node type '{0}' is not registered")]
    UnregisteredNodeType(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

/// How the in-memory network is laid out and configured.
#[derive(Debug, Clone, Args, Serialize)]
pub struct ScenarioArgs {
    /// Number of nodes
    #[arg(short, long, default_value_t = 10)]
    pub nodes: usize,

    /// Side of the square the nodes are scattered in
    #[arg(short, long, default_value_t = 40.0)]
    pub area: f64,

    /// Base transmit range
    #[arg(short, long, default_value_t = 30.0)]
    pub range: f64,

    /// Seed for the topology and every simulation instance
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable noise, distance fading and clock skew
    #[arg(long)]
    pub lossless: bool,

    /// Per-node trace spec ("*", "3,7", "node:3")
    #[arg(long, default_value = "")]
    pub trace: String,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        ScenarioArgs {
            nodes: 10,
            area: 40.0,
            range: 30.0,
            seed: None,
            lossless: false,
            trace: String::new(),
        }
    }
}

impl ScenarioArgs {
    fn validate(&self) -> Result<(), RunnerError> {
        if !(self.area.is_finite() && self.area > 0.0) {
            return Err(RunnerError::InvalidScenario(format!(
                "area must be positive, got {}",
                self.area
            )));
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(RunnerError::InvalidScenario(format!(
                "range must be positive, got {}",
                self.range
            )));
        }
        Ok(())
    }

    pub fn config(&self) -> SimulationConfig {
        let radio = if self.lossless {
            RadioConfig::lossless()
        } else {
            RadioConfig::default()
        };
        SimulationConfig::default()
            .with_radio(radio)
            .with_tracer(self.trace.clone())
    }

    /// Fix the process-wide seed source if a seed was given, then scatter
    /// the nodes using the first seed it hands out.
    pub fn topology(&self, node_type: &str) -> Result<Topology, RunnerError> {
        self.validate()?;
        if let Some(seed) = self.seed {
            if !init_seed_source(seed) {
                warn!(seed, "seed source already initialized, --seed ignored");
            }
        }
        let mut rng = RandomSource::new(next_seed());
        Ok(Topology::scattered(
            self.nodes,
            self.area,
            self.range,
            node_type,
            &mut rng,
        ))
    }
}

/// Everything the registries know about, one item per line.
pub fn list(devices: &DeviceRegistry, tests: &TestRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Device types:");
    for node_type in devices.node_types() {
        let _ = writeln!(out, "  {node_type}");
    }
    let _ = writeln!(out, "Unit tests:");
    for test in tests.tests() {
        let _ = writeln!(out, "  {} ({})", test.id, test.node_type);
    }
    let _ = writeln!(out, "Reports:");
    for report in tests.reports() {
        let _ = writeln!(out, "  {} ({})", report.id, report.node_type);
    }
    out
}

/// Run `iterations` independent instances of a registered test.
pub fn run_test(
    devices: &DeviceRegistry,
    tests: &TestRegistry,
    test_id: &str,
    scenario: &ScenarioArgs,
    iterations: usize,
) -> Result<BatchSummary, RunnerError> {
    let test = tests.test(test_id)?;
    if !devices.contains(&test.node_type) {
        return Err(RunnerError::UnregisteredNodeType(test.node_type.clone()));
    }
    let topology = scenario.topology(&test.node_type)?;
    info!(
        test = test_id,
        nodes = topology.len(),
        area = scenario.area,
        range = scenario.range,
        "topology generated"
    );
    Ok(run_batch(
        &topology,
        devices,
        test,
        &scenario.config(),
        iterations,
    ))
}

/// Human-readable batch result.
pub fn format_summary(summary: &BatchSummary) -> String {
    let mut out = format!(
        "{}: {}/{} passed in {:.3}s",
        summary.test,
        summary.passed,
        summary.iterations,
        summary.elapsed.as_secs_f64()
    );
    for failure in &summary.failures {
        let _ = write!(
            out,
            "\n  iteration {} (seed {}): {}",
            failure.iteration, failure.seed, failure.error
        );
    }
    out
}

/// Build one instance, press `press_count` random buttons in turn, then
/// render a registered report against the resulting history.
pub fn run_report_command(
    devices: &DeviceRegistry,
    tests: &TestRegistry,
    report_id: &str,
    scenario: &ScenarioArgs,
    press_count: usize,
) -> Result<String, RunnerError> {
    let report = tests.report(report_id)?;
    if !devices.contains(&report.node_type) {
        return Err(RunnerError::UnregisteredNodeType(report.node_type.clone()));
    }
    let topology = scenario.topology(&report.node_type)?;
    let mut instance = UnitTestInstance::new(&topology, devices, scenario.config(), next_seed())?;

    for _ in 0..press_count {
        let node = instance.random_node()?;
        let sim = instance.simulation_mut();
        sim.set_button_state(node, 0, true).map_err(HarnessError::from)?;
        sim.simulate_time(SimTime::from_secs(PRESS_HOLD_SECS))
            .map_err(HarnessError::from)?;
        sim.set_button_state(node, 0, false).map_err(HarnessError::from)?;
        sim.simulate_time(SimTime::from_secs(PRESS_SETTLE_SECS))
            .map_err(HarnessError::from)?;
    }
    Ok(run_report(&mut instance, report)?)
}
