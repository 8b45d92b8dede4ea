//! Propagation and collision model.

use crate::{RadioConfig, RadioConfigError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;
use wsim_common::{
    NodeId, RadioMode, RandomSource, SimTime, TransmissionId, WirelessPacket,
    WirelessPacketTransmission,
};
use wsim_metrics::{metric_defs, metrics};

/// Location of a node. Only `x` and `y` take part in range calculations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// Euclidean distance in the x/y plane.
    pub fn planar_distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// What the propagation model needs to know about (and update on) a node.
pub trait RadioEndpoint {
    fn node_id(&self) -> NodeId;
    fn position(&self) -> Position;
    fn radio_mode(&self) -> RadioMode;
    /// When the current radio mode was set; the polling cycle starts here.
    fn mode_changed_at(&self) -> SimTime;
    /// Transmissions to this node whose receive window has not completed.
    fn in_flight(&self) -> &[TransmissionId];
    fn register_in_flight(&mut self, id: TransmissionId);
    fn metric_labels(&self) -> Vec<(&'static str, String)>;
}

// ============================================================================
// Transmission Store
// ============================================================================

/// Every transmission record created during a run, indexed by [`TransmissionId`].
///
/// Records are the single source of truth for delivery outcomes: a later
/// overlapping transmission updates the stored record in place, and whoever
/// completes the delivery reads the record at that moment.
#[derive(Debug, Default)]
pub struct TransmissionStore {
    records: Vec<WirelessPacketTransmission>,
}

impl TransmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record that starts out successful and uncollided.
    pub fn create(
        &mut self,
        packet: Arc<WirelessPacket>,
        receiver: NodeId,
        distance: f64,
        propagation_delay: SimTime,
        signal_dbm: f64,
    ) -> TransmissionId {
        let id = TransmissionId(self.records.len() as u64);
        self.records.push(WirelessPacketTransmission {
            id,
            packet,
            receiver,
            distance,
            propagation_delay,
            signal_dbm,
            receive_success: true,
            collision: false,
        });
        id
    }

    pub fn get(&self, id: TransmissionId) -> Option<&WirelessPacketTransmission> {
        self.records.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: TransmissionId) -> Option<&mut WirelessPacketTransmission> {
        self.records.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WirelessPacketTransmission> {
        self.records.iter()
    }
}

// ============================================================================
// Propagation Model
// ============================================================================

/// Result of one transmit request.
#[derive(Debug, Clone)]
pub struct TransmitOutcome {
    pub packet: Arc<WirelessPacket>,
    /// One transmission per in-range receiver, in node-list order.
    pub deliveries: Vec<TransmissionId>,
}

/// Distance-based propagation with noise, fading, collisions and duty cycling.
#[derive(Debug, Clone)]
pub struct PropagationModel {
    config: RadioConfig,
    range: f64,
}

impl PropagationModel {
    pub fn new(config: RadioConfig, range: f64) -> Result<Self, RadioConfigError> {
        config.validate()?;
        if !(range.is_finite() && range > 0.0) {
            return Err(RadioConfigError::InvalidRange(range));
        }
        Ok(PropagationModel { config, range })
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    /// Put a packet on the air and decide its fate at every in-range node.
    ///
    /// `sender` is skipped when it appears in `nodes`. Random draws happen in
    /// a fixed order: for each receiver in node-list order, one noise draw
    /// then one fading draw, whether or not the first already failed.
    #[allow(clippy::too_many_arguments)]
    pub fn transmit<N: RadioEndpoint>(
        &self,
        sender: NodeId,
        sender_position: Position,
        sender_clock_skew: f64,
        payload: Vec<u8>,
        now: SimTime,
        pre_delay: SimTime,
        nodes: &mut [N],
        store: &mut TransmissionStore,
        rng: &mut RandomSource,
    ) -> TransmitOutcome {
        let start_time = now + pre_delay;
        let duration = self.config.packet_duration(sender_clock_skew);
        let packet = Arc::new(WirelessPacket {
            origin: sender,
            payload,
            start_time,
            end_time: start_time + duration,
        });

        let mut deliveries = Vec::new();
        for node in nodes.iter_mut() {
            if node.node_id() == sender {
                continue;
            }
            let distance = sender_position.planar_distance(&node.position());
            if distance > self.range {
                continue;
            }
            let labels = node.metric_labels();
            let id = store.create(
                Arc::clone(&packet),
                node.node_id(),
                distance,
                self.config.propagation_delay(distance),
                self.config.signal_level(distance, self.range),
            );
            metrics::counter!(metric_defs::RADIO_RX_ATTEMPTS.name, labels.as_slice()).increment(1);

            let noise_drop = rng.chance(self.config.noise_drop_probability);
            let fade_drop = rng.chance(self.config.distance_drop_factor * distance / self.range);
            if noise_drop {
                metrics::counter!(metric_defs::RADIO_RX_NOISE_DROPPED.name, labels.as_slice()).increment(1);
            }
            if fade_drop {
                metrics::counter!(metric_defs::RADIO_RX_DISTANCE_DROPPED.name, labels.as_slice())
                    .increment(1);
            }

            let collided = self.mark_collisions(id, node.in_flight(), store);
            if collided > 0 {
                metrics::counter!(metric_defs::RADIO_RX_COLLIDED.name, labels.as_slice())
                    .increment(collided);
            }

            let listening = node
                .radio_mode()
                .is_listening(node.mode_changed_at(), packet.start_time);
            if !listening {
                metrics::counter!(metric_defs::RADIO_RX_DUTY_CYCLE_MISSED.name, labels.as_slice())
                    .increment(1);
            }

            if let Some(tx) = store.get_mut(id) {
                if noise_drop || fade_drop || !listening {
                    tx.receive_success = false;
                }
                metrics::histogram!(metric_defs::RADIO_RX_SIGNAL.name, labels.as_slice())
                    .record(tx.signal_dbm);
                trace!(
                    sender = sender.0,
                    receiver = node.node_id().0,
                    transmission = tx.id.0,
                    distance,
                    noise_drop,
                    fade_drop,
                    listening,
                    collision = tx.collision,
                    success = tx.receive_success,
                    "transmission dispatched"
                );
            }

            node.register_in_flight(id);
            deliveries.push(id);
        }

        TransmitOutcome { packet, deliveries }
    }

    /// Fail `id` and every in-flight transmission it overlaps.
    /// Returns how many records newly became collided.
    fn mark_collisions(
        &self,
        id: TransmissionId,
        in_flight: &[TransmissionId],
        store: &mut TransmissionStore,
    ) -> u64 {
        let overlapping: Vec<TransmissionId> = match store.get(id) {
            Some(new_tx) => in_flight
                .iter()
                .copied()
                .filter(|other| *other != id)
                .filter(|other| store.get(*other).is_some_and(|o| o.overlaps(new_tx)))
                .collect(),
            None => return 0,
        };
        if overlapping.is_empty() {
            return 0;
        }

        let mut newly_collided = 0;
        for tx_id in overlapping.into_iter().chain(std::iter::once(id)) {
            if let Some(tx) = store.get_mut(tx_id) {
                if !tx.collision {
                    newly_collided += 1;
                }
                tx.mark_collided();
            }
        }
        newly_collided
    }
}
