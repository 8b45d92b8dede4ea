//! Append-only per-node event history.

use crate::{EventType, SimTime, SimulationEvent};

/// Ordered record of every event a node originated or received.
///
/// Events are appended in the order they happen, so start times are
/// non-decreasing along the log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. No ordering is applied.
    pub fn append(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SimulationEvent> {
        self.events.iter()
    }

    /// Events with `exclusive_start < start_time <= inclusive_end`.
    pub fn between(
        &self,
        exclusive_start: SimTime,
        inclusive_end: SimTime,
    ) -> impl Iterator<Item = &SimulationEvent> {
        self.events
            .iter()
            .skip_while(move |e| e.start_time <= exclusive_start)
            .take_while(move |e| e.start_time <= inclusive_end)
    }

    /// First event in `(exclusive_start, inclusive_end]` matching `filter`.
    pub fn find_first<F>(
        &self,
        exclusive_start: SimTime,
        inclusive_end: SimTime,
        mut filter: F,
    ) -> Option<&SimulationEvent>
    where
        F: FnMut(&SimulationEvent) -> bool,
    {
        self.between(exclusive_start, inclusive_end).find(|e| filter(e))
    }

    /// All events of one type, in order.
    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &SimulationEvent> {
        self.events.iter().filter(move |e| e.event_type() == event_type)
    }

    /// Most recent event of one type.
    pub fn last_of_type(&self, event_type: EventType) -> Option<&SimulationEvent> {
        self.events.iter().rev().find(|e| e.event_type() == event_type)
    }
}
