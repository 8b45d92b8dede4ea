//! Simulation events.
//!
//! Every event carries a strongly typed payload; [`EventType`] is the
//! payload-free tag used for filtering histories.

use crate::packet::{RadioMode, TransmissionId, WirelessPacket};
use crate::{Color, EventId, NodeId, SimTime};
use std::fmt;
use std::sync::Arc;

/// Kind of a simulation event, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    NodePowerOn,
    NodePowerOff,
    Packet,
    PacketComplete,
    PowerState,
    TimerSet,
    TimerComplete,
    LedChange,
    ButtonChange,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::NodePowerOn => "NodePowerOn",
            EventType::NodePowerOff => "NodePowerOff",
            EventType::Packet => "Packet",
            EventType::PacketComplete => "PacketComplete",
            EventType::PowerState => "PowerState",
            EventType::TimerSet => "TimerSet",
            EventType::TimerComplete => "TimerComplete",
            EventType::LedChange => "LedChange",
            EventType::ButtonChange => "ButtonChange",
        };
        f.write_str(name)
    }
}

/// Receiver mode change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerStateContext {
    pub mode: RadioMode,
}

/// Timer bookkeeping carried by TimerSet and TimerComplete events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerEventContext {
    /// Per-node timer generation; each armed timer gets a fresh one.
    pub timer_id: u64,
    /// When the timer fires, or `None` when the call only cancelled.
    pub fire_time: Option<SimTime>,
}

/// Physical button change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEventContext {
    pub input: u32,
    pub pressed: bool,
}

/// Typed payload of a [`SimulationEvent`].
#[derive(Debug, Clone)]
pub enum EventPayload {
    NodePowerOn,
    NodePowerOff,
    /// Outgoing transmission started by the origin node.
    Packet(Arc<WirelessPacket>),
    /// Receive window of one transmission ended at the origin (receiving) node.
    PacketComplete(TransmissionId),
    PowerState(PowerStateContext),
    TimerSet(TimerEventContext),
    TimerComplete(TimerEventContext),
    LedChange(Color),
    ButtonChange(ButtonEventContext),
}

impl EventPayload {
    /// The payload-free tag of this payload.
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::NodePowerOn => EventType::NodePowerOn,
            EventPayload::NodePowerOff => EventType::NodePowerOff,
            EventPayload::Packet(_) => EventType::Packet,
            EventPayload::PacketComplete(_) => EventType::PacketComplete,
            EventPayload::PowerState(_) => EventType::PowerState,
            EventPayload::TimerSet(_) => EventType::TimerSet,
            EventPayload::TimerComplete(_) => EventType::TimerComplete,
            EventPayload::LedChange(_) => EventType::LedChange,
            EventPayload::ButtonChange(_) => EventType::ButtonChange,
        }
    }
}

/// A scheduled or recorded simulation event.
#[derive(Debug, Clone)]
pub struct SimulationEvent {
    pub id: EventId,
    pub start_time: SimTime,
    pub end_time: Option<SimTime>,
    /// Node that originated (or, for PacketComplete, received) the event.
    pub origin: NodeId,
    pub payload: EventPayload,
}

impl SimulationEvent {
    /// Create an instantaneous event.
    pub fn new(id: EventId, start_time: SimTime, origin: NodeId, payload: EventPayload) -> Self {
        SimulationEvent {
            id,
            start_time,
            end_time: None,
            origin,
            payload,
        }
    }

    /// Set the end of the event's span.
    pub fn with_end_time(mut self, end_time: SimTime) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// LED color for LedChange events.
    pub fn led_color(&self) -> Option<Color> {
        match self.payload {
            EventPayload::LedChange(color) => Some(color),
            _ => None,
        }
    }

    /// Transmission for PacketComplete events.
    pub fn transmission_id(&self) -> Option<TransmissionId> {
        match self.payload {
            EventPayload::PacketComplete(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for SimulationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} [{}]", self.event_type(), self.start_time, self.origin)
    }
}
