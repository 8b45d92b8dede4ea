//! Node-level trace logging for simulation debugging.
//!
//! Tracing is opt-in per node. A tracer is configured from a comma-separated
//! spec and checked cheaply before any formatting happens.
//!
//! ```rust,ignore
//! use wsim_common::node_tracer::{NodeTracer, NodeTracerConfig};
//!
//! // Trace nodes 3 and 7
//! let tracer = NodeTracer::new(NodeTracerConfig::from_spec("3,node:7"));
//! tracer.log_state_change(NodeId(3), sim_time, "LED -> #ff0000");
//! ```

use crate::{EventPayload, NodeId, SimTime, SimulationEvent};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Trace Event Types
// ============================================================================

/// Categories of trace events for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceCategory {
    /// Event dispatched to the node.
    EventReceived,
    /// LED or button state change.
    StateChange,
    /// Radio mode change or transmission.
    Radio,
    /// Timer armed, cancelled or fired.
    Timer,
}

impl fmt::Display for TraceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceCategory::EventReceived => write!(f, "EVENT"),
            TraceCategory::StateChange => write!(f, "STATE"),
            TraceCategory::Radio => write!(f, "RADIO"),
            TraceCategory::Timer => write!(f, "TIMER"),
        }
    }
}

/// A trace record.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub node: NodeId,
    pub sim_time: SimTime,
    pub category: TraceCategory,
    pub description: String,
    /// Optional key-value details.
    pub details: Vec<(String, String)>,
}

impl TraceEvent {
    pub fn new(
        node: NodeId,
        sim_time: SimTime,
        category: TraceCategory,
        description: impl Into<String>,
    ) -> Self {
        TraceEvent {
            node,
            sim_time,
            category,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Trace record for an event being dispatched to a node.
    pub fn event_received(node: NodeId, sim_time: SimTime, event: &SimulationEvent) -> Self {
        let (description, details) = describe_event_payload(&event.payload);
        TraceEvent {
            node,
            sim_time,
            category: TraceCategory::EventReceived,
            description,
            details,
        }
    }

    /// Add a detail to this event.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }
}

/// Describe an event payload for tracing.
fn describe_event_payload(payload: &EventPayload) -> (String, Vec<(String, String)>) {
    let name = payload.event_type().to_string();
    let details = match payload {
        EventPayload::Packet(packet) => vec![
            ("payload_len".to_string(), packet.payload.len().to_string()),
            ("end_ms".to_string(), format!("{:.3}", packet.end_time.as_millis_f64())),
        ],
        EventPayload::PacketComplete(id) => vec![("transmission".to_string(), id.to_string())],
        EventPayload::PowerState(ctx) => vec![("mode".to_string(), ctx.mode.to_string())],
        EventPayload::TimerSet(ctx) | EventPayload::TimerComplete(ctx) => {
            let mut details = vec![("timer_id".to_string(), ctx.timer_id.to_string())];
            if let Some(fire) = ctx.fire_time {
                details.push(("fire_ms".to_string(), format!("{:.3}", fire.as_millis_f64())));
            }
            details
        }
        EventPayload::LedChange(color) => vec![("color".to_string(), color.to_string())],
        EventPayload::ButtonChange(ctx) => vec![
            ("input".to_string(), ctx.input.to_string()),
            ("pressed".to_string(), ctx.pressed.to_string()),
        ],
        EventPayload::NodePowerOn | EventPayload::NodePowerOff => Vec::new(),
    };
    (name, details)
}

// ============================================================================
// Tracer Configuration
// ============================================================================

/// Which nodes and categories to trace.
#[derive(Debug, Clone, Default)]
pub struct NodeTracerConfig {
    /// Node indices to trace.
    pub traced_nodes: HashSet<usize>,
    /// Trace every node.
    pub trace_all: bool,
    /// Categories to trace. If empty, all categories are traced.
    pub traced_categories: HashSet<TraceCategory>,
}

impl NodeTracerConfig {
    /// A config that traces nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a tracer spec.
    ///
    /// The spec is a comma-separated list of node indices, optionally
    /// prefixed with `node:`, or `*` for every node. Unparseable entries are
    /// ignored.
    pub fn from_spec(spec: &str) -> Self {
        let mut config = Self::none();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part == "*" {
                config.trace_all = true;
                continue;
            }
            let index = part.strip_prefix("node:").unwrap_or(part);
            if let Ok(index) = index.parse::<usize>() {
                config.traced_nodes.insert(index);
            }
        }
        config
    }

    pub fn is_enabled(&self) -> bool {
        self.trace_all || !self.traced_nodes.is_empty()
    }

    pub fn should_trace(&self, node: NodeId) -> bool {
        self.trace_all || self.traced_nodes.contains(&node.0)
    }

    pub fn should_trace_category(&self, category: TraceCategory) -> bool {
        self.traced_categories.is_empty() || self.traced_categories.contains(&category)
    }

    /// Add a category filter.
    pub fn with_category(mut self, category: TraceCategory) -> Self {
        self.traced_categories.insert(category);
        self
    }
}

// ============================================================================
// Node Tracer
// ============================================================================

/// Shared, cheaply clonable node tracer.
#[derive(Debug, Clone, Default)]
pub struct NodeTracer {
    config: Arc<NodeTracerConfig>,
}

impl NodeTracer {
    pub fn new(config: NodeTracerConfig) -> Self {
        NodeTracer {
            config: Arc::new(config),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub fn should_trace(&self, node: NodeId) -> bool {
        self.config.should_trace(node)
    }

    pub fn config(&self) -> &NodeTracerConfig {
        &self.config
    }

    /// Log a trace event if its node and category are traced.
    pub fn log(&self, event: TraceEvent) {
        if !self.config.should_trace(event.node) {
            return;
        }
        if !self.config.should_trace_category(event.category) {
            return;
        }
        eprintln!("{}", format_trace(&event));
    }

    /// Log that a node is handling an event.
    pub fn log_event_received(&self, node: NodeId, sim_time: SimTime, event: &SimulationEvent) {
        if !self.config.should_trace(node) {
            return;
        }
        self.log(TraceEvent::event_received(node, sim_time, event));
    }

    pub fn log_state_change(&self, node: NodeId, sim_time: SimTime, description: impl Into<String>) {
        if !self.config.should_trace(node) {
            return;
        }
        self.log(TraceEvent::new(node, sim_time, TraceCategory::StateChange, description));
    }

    pub fn log_radio(&self, node: NodeId, sim_time: SimTime, description: impl Into<String>) {
        if !self.config.should_trace(node) {
            return;
        }
        self.log(TraceEvent::new(node, sim_time, TraceCategory::Radio, description));
    }

    pub fn log_timer(&self, node: NodeId, sim_time: SimTime, description: impl Into<String>) {
        if !self.config.should_trace(node) {
            return;
        }
        self.log(TraceEvent::new(node, sim_time, TraceCategory::Timer, description));
    }
}

/// Render a trace line, e.g. `[TRACE] node#3 @ 12.345ms: RADIO TX [len=4]`.
pub fn format_trace(event: &TraceEvent) -> String {
    let details = if event.details.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = event
            .details
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!(" [{}]", parts.join(", "))
    };
    format!(
        "[TRACE] {} @ {:.3}ms: {} {}{}",
        event.node,
        event.sim_time.as_millis_f64(),
        event.category,
        event.description,
        details
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_spec_empty() {
        let config = NodeTracerConfig::from_spec("");
        assert!(!config.is_enabled());
        assert!(!config.should_trace(NodeId(0)));
    }

    #[test]
    fn test_config_from_spec_mixed() {
        let config = NodeTracerConfig::from_spec("3, node:7,bogus");
        assert!(config.is_enabled());
        assert!(config.should_trace(NodeId(3)));
        assert!(config.should_trace(NodeId(7)));
        assert!(!config.should_trace(NodeId(1)));
    }

    #[test]
    fn test_config_from_spec_all() {
        let config = NodeTracerConfig::from_spec("*");
        assert!(config.should_trace(NodeId(999)));
    }

    #[test]
    fn test_category_filter() {
        let config = NodeTracerConfig::from_spec("*").with_category(TraceCategory::Radio);
        assert!(config.should_trace_category(TraceCategory::Radio));
        assert!(!config.should_trace_category(TraceCategory::Timer));
    }

    #[test]
    fn test_format_trace() {
        let event = TraceEvent::new(
            NodeId(3),
            SimTime::from_millis(12.5),
            TraceCategory::Radio,
            "TX",
        )
        .with_detail("len", "4");
        assert_eq!(format_trace(&event), "[TRACE] node#3 @ 12.500ms: RADIO TX [len=4]");
    }
}
