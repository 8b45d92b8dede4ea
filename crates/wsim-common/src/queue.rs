//! Event queue with deterministic ordering.

use crate::{EventId, SimTime, SimulationEvent};
use std::collections::{BTreeMap, HashMap};

/// Key for ordering events in the queue.
///
/// Events are ordered by start time, then by insertion sequence so that
/// events scheduled for the same instant pop in the order they were inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    time: SimTime,
    sequence: u64,
}

/// Pending simulation events, ordered ascending by start time.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<QueueKey, SimulationEvent>,
    /// Where each pending event lives, for removal by id.
    index: HashMap<EventId, QueueKey>,
    sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event, keeping start-time order.
    ///
    /// Inserting an event whose id is already pending replaces the earlier one.
    pub fn insert(&mut self, event: SimulationEvent) {
        self.remove(event.id);
        let key = QueueKey {
            time: event.start_time,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.index.insert(event.id, key);
        self.events.insert(key, event);
    }

    /// Remove a pending event. Returns `None` if it is not queued.
    pub fn remove(&mut self, id: EventId) -> Option<SimulationEvent> {
        let key = self.index.remove(&id)?;
        self.events.remove(&key)
    }

    /// Whether an event with this id is pending.
    pub fn contains(&self, id: EventId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn has_event(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Start time of the earliest pending event.
    pub fn peek_earliest_time(&self) -> Option<SimTime> {
        self.events.keys().next().map(|key| key.time)
    }

    /// Remove and return the earliest event; ties go to the first inserted.
    pub fn pop_earliest(&mut self) -> Option<SimulationEvent> {
        let (_, event) = self.events.pop_first()?;
        self.index.remove(&event.id);
        Some(event)
    }

    /// Pending events in pop order.
    pub fn iter(&self) -> impl Iterator<Item = &SimulationEvent> {
        self.events.values()
    }
}
