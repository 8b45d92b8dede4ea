//! Radio data model: receiver modes, packets, and per-receiver transmissions.

use crate::{NodeId, SimTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Receiver duty-cycle mode of a node's radio.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum RadioMode {
    /// Receiver powered down.
    #[default]
    Off,
    /// Receiver listening continuously.
    ReceiveAlways,
    /// Receiver alternates `time_on` listening with `time_off` sleeping,
    /// starting from the moment the mode was set.
    Polling {
        time_on: SimTime,
        time_off: SimTime,
    },
}

impl RadioMode {
    /// Whether a receiver in this mode, set at `mode_changed_at`, is listening at `at`.
    ///
    /// A polling cycle with a non-positive period degenerates to "always on"
    /// when `time_on` is positive and "always off" otherwise.
    pub fn is_listening(&self, mode_changed_at: SimTime, at: SimTime) -> bool {
        match *self {
            RadioMode::Off => false,
            RadioMode::ReceiveAlways => true,
            RadioMode::Polling { time_on, time_off } => {
                let period = (time_on + time_off).as_secs_f64();
                if period <= 0.0 {
                    return time_on.as_secs_f64() > 0.0;
                }
                let elapsed = (at - mode_changed_at).as_secs_f64();
                elapsed.rem_euclid(period) < time_on.as_secs_f64()
            }
        }
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioMode::Off => write!(f, "off"),
            RadioMode::ReceiveAlways => write!(f, "receive"),
            RadioMode::Polling { time_on, time_off } => {
                write!(f, "polling(on={}, off={})", time_on, time_off)
            }
        }
    }
}

/// One transmission over the air, shared by every receiver's transmission record.
#[derive(Debug, Clone, PartialEq)]
pub struct WirelessPacket {
    /// Sending node.
    pub origin: NodeId,
    /// Opaque payload handed to receiving device logic.
    pub payload: Vec<u8>,
    /// Time the first bit leaves the sender.
    pub start_time: SimTime,
    /// Time the last bit leaves the sender.
    pub end_time: SimTime,
}

impl WirelessPacket {
    /// Airtime of the packet.
    pub fn duration(&self) -> SimTime {
        self.end_time - self.start_time
    }
}

/// Identifier of a [`WirelessPacketTransmission`] within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransmissionId(pub u64);

impl fmt::Display for TransmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// Delivery attempt of one packet to one receiver.
#[derive(Debug, Clone)]
pub struct WirelessPacketTransmission {
    pub id: TransmissionId,
    pub packet: Arc<WirelessPacket>,
    pub receiver: NodeId,
    /// Distance from sender to receiver.
    pub distance: f64,
    pub propagation_delay: SimTime,
    /// Received signal level in dBm.
    pub signal_dbm: f64,
    pub receive_success: bool,
    pub collision: bool,
}

impl WirelessPacketTransmission {
    /// Time the first bit arrives at the receiver.
    pub fn start_time(&self) -> SimTime {
        self.packet.start_time + self.propagation_delay
    }

    /// Time the last bit arrives at the receiver.
    pub fn end_time(&self) -> SimTime {
        self.packet.end_time + self.propagation_delay
    }

    /// Whether the receive windows of two transmissions intersect.
    pub fn overlaps(&self, other: &WirelessPacketTransmission) -> bool {
        self.start_time() <= other.end_time() && other.start_time() <= self.end_time()
    }

    /// Mark this transmission as lost to a collision.
    pub fn mark_collided(&mut self) {
        self.receive_success = false;
        self.collision = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: u64, start: f64, end: f64, delay: f64) -> WirelessPacketTransmission {
        WirelessPacketTransmission {
            id: TransmissionId(id),
            packet: Arc::new(WirelessPacket {
                origin: NodeId(0),
                payload: vec![],
                start_time: SimTime::from_secs(start),
                end_time: SimTime::from_secs(end),
            }),
            receiver: NodeId(1),
            distance: 0.0,
            propagation_delay: SimTime::from_secs(delay),
            signal_dbm: 0.0,
            receive_success: true,
            collision: false,
        }
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = tx(1, 0.0, 1.0, 0.0);
        let b = tx(2, 0.5, 1.5, 0.0);
        let c = tx(3, 2.0, 3.0, 0.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_overlap_accounts_for_propagation_delay() {
        let a = tx(1, 0.0, 1.0, 0.0);
        // Sent after `a` ended but delayed past the end of `a`'s window.
        let b = tx(2, 1.1, 2.0, 0.0);
        assert!(!a.overlaps(&b));
        let delayed_a = tx(3, 0.0, 1.0, 0.2);
        assert!(delayed_a.overlaps(&b));
    }

    #[test]
    fn test_polling_listening_window() {
        let mode = RadioMode::Polling {
            time_on: SimTime::from_secs(0.05),
            time_off: SimTime::from_secs(0.5),
        };
        let set_at = SimTime::from_secs(10.0);
        assert!(mode.is_listening(set_at, SimTime::from_secs(10.01)));
        assert!(!mode.is_listening(set_at, SimTime::from_secs(10.3)));
        assert!(mode.is_listening(set_at, SimTime::from_secs(10.56)));
    }

    #[test]
    fn test_fixed_modes() {
        assert!(!RadioMode::Off.is_listening(SimTime::ZERO, SimTime::from_secs(1.0)));
        assert!(RadioMode::ReceiveAlways.is_listening(SimTime::ZERO, SimTime::from_secs(1.0)));
    }

    #[test]
    fn test_degenerate_polling_period() {
        let on = RadioMode::Polling {
            time_on: SimTime::from_secs(1.0),
            time_off: SimTime::from_secs(-1.0),
        };
        let off = RadioMode::Polling {
            time_on: SimTime::ZERO,
            time_off: SimTime::ZERO,
        };
        assert!(on.is_listening(SimTime::ZERO, SimTime::from_secs(3.0)));
        assert!(!off.is_listening(SimTime::ZERO, SimTime::from_secs(3.0)));
    }
}
