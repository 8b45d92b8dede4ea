//! Registered unit tests and reports.

use crate::{HarnessError, UnitTestInstance};
use std::collections::BTreeMap;
use std::fmt;

/// A unit test: drives the instance and returns `Err` on a failed check.
pub type UnitTestFn = fn(&mut UnitTestInstance) -> Result<(), HarnessError>;

/// A report: inspects the instance's histories and renders text.
pub type ReportFn = fn(&mut UnitTestInstance) -> Result<String, HarnessError>;

#[derive(Clone)]
pub struct UnitTest {
    pub id: String,
    /// Device kind the test exercises.
    pub node_type: String,
    pub run: UnitTestFn,
}

#[derive(Clone)]
pub struct Report {
    pub id: String,
    pub node_type: String,
    pub run: ReportFn,
}

impl fmt::Debug for UnitTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitTest")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .finish_non_exhaustive()
    }
}

/// Tests and reports by identifier, as each device module registers them.
#[derive(Debug, Default)]
pub struct TestRegistry {
    tests: BTreeMap<String, UnitTest>,
    reports: BTreeMap<String, Report>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_test(
        &mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        run: UnitTestFn,
    ) {
        let id = id.into();
        self.tests.insert(
            id.clone(),
            UnitTest {
                id,
                node_type: node_type.into(),
                run,
            },
        );
    }

    pub fn register_report(
        &mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        run: ReportFn,
    ) {
        let id = id.into();
        self.reports.insert(
            id.clone(),
            Report {
                id,
                node_type: node_type.into(),
                run,
            },
        );
    }

    pub fn test(&self, id: &str) -> Result<&UnitTest, HarnessError> {
        self.tests
            .get(id)
            .ok_or_else(|| HarnessError::UnknownTest(id.to_string()))
    }

    pub fn report(&self, id: &str) -> Result<&Report, HarnessError> {
        self.reports
            .get(id)
            .ok_or_else(|| HarnessError::UnknownReport(id.to_string()))
    }

    pub fn tests(&self) -> impl Iterator<Item = &UnitTest> {
        self.tests.values()
    }

    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.reports.values()
    }
}
