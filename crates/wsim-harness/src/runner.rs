//! Running unit tests and reports, singly or in parallel batches.

use crate::{HarnessError, Report, UnitTest, UnitTestInstance};
use rayon::prelude::*;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wsim_common::next_seed;
use wsim_engine::{DeviceRegistry, SimulationConfig, Topology};
use wsim_metrics::{metric_defs, metrics};

/// Result of one unit test iteration.
#[derive(Debug, Clone, Serialize)]
pub struct UnitTestOutcome {
    pub test: String,
    pub passed: bool,
    /// Failure message, including panics raised by device logic.
    pub error: Option<String>,
    /// Seed that reproduces this iteration.
    pub seed: u64,
}

/// Build a fresh instance from `seed` (or a fresh seed) and run `test` on it.
///
/// Never fails itself: build errors, test errors and panics are all
/// reported as a failed outcome.
pub fn run_unit_test(
    topology: &Topology,
    devices: &DeviceRegistry,
    test: &UnitTest,
    config: &SimulationConfig,
    seed: Option<u64>,
) -> UnitTestOutcome {
    let seed = seed.unwrap_or_else(next_seed);
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut instance = UnitTestInstance::new(topology, devices, config.clone(), seed)?;
        (test.run)(&mut instance)
    }))
    .unwrap_or_else(|payload| Err(HarnessError::Panic(panic_message(payload.as_ref()))));

    let labels = [("test", test.id.clone())];
    match result {
        Ok(()) => {
            metrics::counter!(metric_defs::TEST_PASSED.name, &labels).increment(1);
            debug!(test = %test.id, seed, "unit test passed");
            UnitTestOutcome {
                test: test.id.clone(),
                passed: true,
                error: None,
                seed,
            }
        }
        Err(err) => {
            metrics::counter!(metric_defs::TEST_FAILED.name, &labels).increment(1);
            debug!(test = %test.id, seed, error = %err, "unit test failed");
            UnitTestOutcome {
                test: test.id.clone(),
                passed: false,
                error: Some(err.to_string()),
                seed,
            }
        }
    }
}

/// Run `report` against an instance that has already been driven.
pub fn run_report(instance: &mut UnitTestInstance, report: &Report) -> Result<String, HarnessError> {
    catch_unwind(AssertUnwindSafe(|| (report.run)(instance)))
        .unwrap_or_else(|payload| Err(HarnessError::Panic(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Batches
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub iteration: usize,
    pub seed: u64,
    pub error: String,
}

/// Aggregate of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub test: String,
    pub iterations: usize,
    pub passed: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Run `iterations` independent instances of `test` across the rayon pool.
///
/// Seeds are drawn from the process-wide seed source up front, in iteration
/// order, so a fixed source gives the same per-iteration seeds regardless of
/// thread scheduling.
pub fn run_batch(
    topology: &Topology,
    devices: &DeviceRegistry,
    test: &UnitTest,
    config: &SimulationConfig,
    iterations: usize,
) -> BatchSummary {
    let seeds: Vec<u64> = (0..iterations).map(|_| next_seed()).collect();
    info!(
        test = %test.id,
        iterations,
        threads = rayon::current_num_threads(),
        "running batch"
    );

    let started = Instant::now();
    let outcomes: Vec<UnitTestOutcome> = seeds
        .par_iter()
        .map(|seed| run_unit_test(topology, devices, test, config, Some(*seed)))
        .collect();
    let elapsed = started.elapsed();

    let failures: Vec<BatchFailure> = outcomes
        .iter()
        .enumerate()
        .filter(|(_, outcome)| !outcome.passed)
        .map(|(iteration, outcome)| BatchFailure {
            iteration,
            seed: outcome.seed,
            error: outcome.error.clone().unwrap_or_default(),
        })
        .collect();
    for failure in failures.iter().take(5) {
        warn!(
            test = %test.id,
            iteration = failure.iteration,
            seed = failure.seed,
            error = %failure.error,
            "iteration failed"
        );
    }

    BatchSummary {
        test: test.id.clone(),
        iterations,
        passed: iterations - failures.len(),
        failed: failures.len(),
        failures,
        elapsed,
    }
}
