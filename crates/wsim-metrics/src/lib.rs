//! Metrics infrastructure for the wireless network simulator.
//!
//! Re-exports the `metrics` crate and declares every metric the simulator
//! emits as a structured [`Metric`] constant, so names are never typed twice.
//!
//! ```rust,ignore
//! use wsim_metrics::{metric_defs, metrics, MetricLabels};
//!
//! let labels = MetricLabels::new(3, "demo-blink");
//! let labels = labels.to_labels();
//! metrics::counter!(metric_defs::RADIO_TX_PACKETS.name, labels.as_slice()).increment(1);
//! ```
//!
//! Without an installed recorder every emission is a no-op.

pub use metrics;

use metrics::{KeyName, SharedString, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// A metric declaration: name, description, unit and the label keys it is
/// emitted with.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            unit: None,
            labels: &[],
        }
    }

    pub const fn counter(name: &'static str, description: &'static str) -> Self {
        Self::new(name, MetricKind::Counter, description)
    }

    pub const fn gauge(name: &'static str, description: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge, description)
    }

    pub const fn histogram(name: &'static str, description: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram, description)
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        let key = KeyName::from_const_str(self.name);
        let description = SharedString::const_str(self.description);
        metrics::with_recorder(|recorder| match self.kind {
            MetricKind::Counter => recorder.describe_counter(key, self.unit, description),
            MetricKind::Gauge => recorder.describe_gauge(key, self.unit, description),
            MetricKind::Histogram => recorder.describe_histogram(key, self.unit, description),
        });
    }
}

/// All metric definitions for the simulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on all node-scoped metrics.
    pub const STANDARD_LABELS: &[&str] = &["node", "node_type"];

    // ========================================================================
    // Radio Metrics
    // ========================================================================

    pub const RADIO_TX_PACKETS: Metric = Metric::counter(
        "wsim.radio.tx_packets",
        "Total packets transmitted",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_TX_AIRTIME: Metric = Metric::counter(
        "wsim.radio.tx_airtime_us",
        "Total transmit airtime in microseconds",
    )
    .with_unit(Unit::Microseconds)
    .with_labels(STANDARD_LABELS);

    /// One per (packet, in-range receiver) pair.
    pub const RADIO_RX_ATTEMPTS: Metric = Metric::counter(
        "wsim.radio.rx_attempts",
        "Deliveries attempted to in-range receivers",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_RX_SUCCESS: Metric = Metric::counter(
        "wsim.radio.rx_success",
        "Packets delivered to device logic",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_RX_COLLIDED: Metric = Metric::counter(
        "wsim.radio.rx_collided",
        "Transmissions lost to overlapping receive windows",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_RX_NOISE_DROPPED: Metric = Metric::counter(
        "wsim.radio.rx_noise_dropped",
        "Transmissions lost to random noise",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_RX_DISTANCE_DROPPED: Metric = Metric::counter(
        "wsim.radio.rx_distance_dropped",
        "Transmissions lost to distance-proportional fading",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_RX_DUTY_CYCLE_MISSED: Metric = Metric::counter(
        "wsim.radio.rx_duty_cycle_missed",
        "Transmissions arriving while the receiver was not listening",
    )
    .with_unit(Unit::Count)
    .with_labels(STANDARD_LABELS);

    pub const RADIO_RX_SIGNAL: Metric = Metric::histogram(
        "wsim.radio.rx_signal_dbm",
        "Received signal level in dBm",
    )
    .with_labels(STANDARD_LABELS);

    // ========================================================================
    // Driver Metrics
    // ========================================================================

    pub const SIM_EVENTS_PROCESSED: Metric = Metric::counter(
        "wsim.sim.events_processed",
        "Events popped from the queue and dispatched",
    )
    .with_unit(Unit::Count);

    pub const SIM_QUEUE_DEPTH: Metric = Metric::gauge(
        "wsim.sim.queue_depth",
        "Pending events after a simulate_time call",
    )
    .with_unit(Unit::Count);

    // ========================================================================
    // Harness Metrics
    // ========================================================================

    pub const TEST_PASSED: Metric = Metric::counter(
        "wsim.test.passed",
        "Unit test iterations that passed",
    )
    .with_unit(Unit::Count)
    .with_labels(&["test"]);

    pub const TEST_FAILED: Metric = Metric::counter(
        "wsim.test.failed",
        "Unit test iterations that failed",
    )
    .with_unit(Unit::Count)
    .with_labels(&["test"]);

    pub const ALL: &[Metric] = &[
        RADIO_TX_PACKETS,
        RADIO_TX_AIRTIME,
        RADIO_RX_ATTEMPTS,
        RADIO_RX_SUCCESS,
        RADIO_RX_COLLIDED,
        RADIO_RX_NOISE_DROPPED,
        RADIO_RX_DISTANCE_DROPPED,
        RADIO_RX_DUTY_CYCLE_MISSED,
        RADIO_RX_SIGNAL,
        SIM_EVENTS_PROCESSED,
        SIM_QUEUE_DEPTH,
        TEST_PASSED,
        TEST_FAILED,
    ];
}

/// Standard labels for node-scoped metrics.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    pub node: String,
    pub node_type: String,
}

impl MetricLabels {
    pub fn new(node: impl ToString, node_type: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            node_type: node_type.into(),
        }
    }

    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("node", self.node.clone()),
            ("node_type", self.node_type.clone()),
        ]
    }
}

/// Describe every simulator metric. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_metric_labels() {
        let labels = MetricLabels::new(7, "demo-blink");
        let label_vec = labels.to_labels();
        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("node", "7".to_string())));
        assert!(label_vec.contains(&("node_type", "demo-blink".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::RADIO_RX_COLLIDED.name, "wsim.radio.rx_collided");
        assert_eq!(metric_defs::RADIO_RX_COLLIDED.kind, MetricKind::Counter);
        assert_eq!(metric_defs::RADIO_RX_SIGNAL.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::SIM_QUEUE_DEPTH.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::RADIO_TX_AIRTIME.unit, Some(Unit::Microseconds));
    }

    #[test]
    fn test_all_metric_names_unique() {
        let names: std::collections::HashSet<_> =
            metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_node_labels_match_declared_keys() {
        let emitted: Vec<&str> = MetricLabels::new(0, "x")
            .to_labels()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        for metric in metric_defs::ALL.iter().filter(|m| m.name.starts_with("wsim.radio.")) {
            assert_eq!(metric.labels, emitted.as_slice(), "{}", metric.name);
        }
        assert!(metric_defs::SIM_EVENTS_PROCESSED.labels.is_empty());
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }

    #[test]
    fn test_describe_reaches_local_recorder() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, || {
            describe_metrics();
            metrics::counter!(metric_defs::RADIO_TX_AIRTIME.name).increment(5);
        });

        let (_, unit, description, value) = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find(|(key, _, _, _)| key.key().name() == metric_defs::RADIO_TX_AIRTIME.name)
            .unwrap();
        assert_eq!(unit, Some(Unit::Microseconds));
        assert_eq!(
            description.as_deref(),
            Some(metric_defs::RADIO_TX_AIRTIME.description)
        );
        assert!(matches!(value, DebugValue::Counter(5)));
    }
}
