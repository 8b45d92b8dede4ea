//! Per-node runtime state.

use std::collections::BTreeMap;
use wsim_common::{Color, EventId, EventLog, NodeId, RadioMode, SimTime, TransmissionId};
use wsim_metrics::MetricLabels;
use wsim_radio::{Position, RadioEndpoint};

#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingTimer {
    pub(crate) event: EventId,
    pub(crate) timer_id: u64,
    pub(crate) fire_time: SimTime,
}

/// Everything the engine tracks about one node, apart from its device logic.
#[derive(Debug)]
pub struct NodeState {
    pub(crate) id: NodeId,
    pub(crate) node_type: String,
    pub(crate) position: Position,
    /// Multiplier on packet airtime from crystal tolerance.
    pub(crate) clock_skew: f64,
    pub(crate) radio_mode: RadioMode,
    pub(crate) mode_changed_at: SimTime,
    pub(crate) led: Color,
    pub(crate) buttons: BTreeMap<u32, bool>,
    pub(crate) in_flight: Vec<TransmissionId>,
    pub(crate) pending_timer: Option<PendingTimer>,
    pub(crate) next_timer_id: u64,
    pub(crate) history: EventLog,
    labels: MetricLabels,
}

impl NodeState {
    pub(crate) fn new(id: NodeId, node_type: String, position: Position, clock_skew: f64) -> Self {
        let labels = MetricLabels::new(id.index(), node_type.clone());
        NodeState {
            id,
            node_type,
            position,
            clock_skew,
            radio_mode: RadioMode::Off,
            mode_changed_at: SimTime::ZERO,
            led: Color::BLACK,
            buttons: BTreeMap::new(),
            in_flight: Vec::new(),
            pending_timer: None,
            next_timer_id: 0,
            history: EventLog::new(),
            labels,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn clock_skew(&self) -> f64 {
        self.clock_skew
    }

    pub fn radio_mode(&self) -> RadioMode {
        self.radio_mode
    }

    pub fn mode_changed_at(&self) -> SimTime {
        self.mode_changed_at
    }

    pub fn led_color(&self) -> Color {
        self.led
    }

    pub fn input_value(&self, input: u32) -> bool {
        self.buttons.get(&input).copied().unwrap_or(false)
    }

    /// Transmissions to this node still awaiting their PacketComplete.
    pub fn in_flight(&self) -> &[TransmissionId] {
        &self.in_flight
    }

    /// When the node's pending timer fires, if one is armed.
    pub fn pending_timer_time(&self) -> Option<SimTime> {
        self.pending_timer.map(|t| t.fire_time)
    }

    pub fn history(&self) -> &EventLog {
        &self.history
    }

    pub(crate) fn labels(&self) -> &MetricLabels {
        &self.labels
    }
}

impl RadioEndpoint for NodeState {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn radio_mode(&self) -> RadioMode {
        self.radio_mode
    }

    fn mode_changed_at(&self) -> SimTime {
        self.mode_changed_at
    }

    fn in_flight(&self) -> &[TransmissionId] {
        &self.in_flight
    }

    fn register_in_flight(&mut self, id: TransmissionId) {
        self.in_flight.push(id);
    }

    fn metric_labels(&self) -> Vec<(&'static str, String)> {
        self.labels.to_labels()
    }
}
