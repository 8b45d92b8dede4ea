//! # wsim-harness
//!
//! Builds seeded simulation instances, runs registered unit tests and
//! reports against them, and fans independent iterations out over a thread
//! pool.
//!
//! Each iteration owns its simulation outright; the only process-wide state
//! is the seed source in [`wsim_common::random`], which hands out per-instance
//! seeds.

mod error;
mod instance;
mod registry;
mod runner;

pub use error::HarnessError;
pub use instance::{UnitTestInstance, DEFAULT_PRE_RUN_WINDOW_SECS, DEFAULT_TOLERANCE_SECS};
pub use registry::{Report, ReportFn, TestRegistry, UnitTest, UnitTestFn};
pub use runner::{run_batch, run_report, run_unit_test, BatchFailure, BatchSummary, UnitTestOutcome};

pub use wsim_common::{init_seed_source, next_seed};
