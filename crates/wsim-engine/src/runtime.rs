//! Shared simulation state that device calls operate on.

use crate::node::{NodeState, PendingTimer};
use std::sync::Arc;
use tracing::debug;
use wsim_common::node_tracer::NodeTracer;
use wsim_common::{
    Color, EventId, EventPayload, EventQueue, NodeId, PowerStateContext, RadioMode,
    RandomSource, SimTime, SimulationEvent, TimerEventContext,
};
use wsim_metrics::{metric_defs, metrics};
use wsim_radio::{PropagationModel, TransmissionStore};

pub(crate) type LedListener = Box<dyn FnMut() + Send>;

/// Monotonic allocator for event ids; also fixes the insertion order of ties.
#[derive(Debug, Default)]
pub(crate) struct EventIds(u64);

impl EventIds {
    pub(crate) fn next(&mut self) -> EventId {
        let id = EventId(self.0);
        self.0 += 1;
        id
    }
}

pub(crate) struct SimCore {
    pub(crate) clock: SimTime,
    pub(crate) queue: EventQueue,
    pub(crate) ids: EventIds,
    pub(crate) nodes: Vec<NodeState>,
    pub(crate) transmissions: TransmissionStore,
    pub(crate) propagation: PropagationModel,
    pub(crate) rng: RandomSource,
    pub(crate) tracer: NodeTracer,
    pub(crate) led_listener: Option<LedListener>,
}

impl SimCore {
    pub(crate) fn clock(&self) -> SimTime {
        self.clock
    }

    pub(crate) fn node(&self, node: NodeId) -> &NodeState {
        &self.nodes[node.index()]
    }

    pub(crate) fn packet_airtime(&self, node: NodeId) -> SimTime {
        self.propagation
            .config()
            .packet_duration(self.node(node).clock_skew)
    }

    pub(crate) fn next_random(&mut self) -> f64 {
        self.rng.next_f64()
    }

    /// Append an event at the current time to `node`'s history.
    pub(crate) fn record(&mut self, node: NodeId, payload: EventPayload, end_time: Option<SimTime>) {
        let mut event = SimulationEvent::new(self.ids.next(), self.clock, node, payload);
        if let Some(end_time) = end_time {
            event = event.with_end_time(end_time);
        }
        self.nodes[node.index()].history.append(event);
    }

    pub(crate) fn set_radio_mode(&mut self, node: NodeId, mode: RadioMode) {
        let state = &mut self.nodes[node.index()];
        state.radio_mode = mode;
        state.mode_changed_at = self.clock;
        self.tracer
            .log_radio(node, self.clock, format!("mode -> {}", mode));
        self.record(node, EventPayload::PowerState(PowerStateContext { mode }), None);
    }

    pub(crate) fn set_led(&mut self, node: NodeId, color: Color) {
        self.nodes[node.index()].led = color;
        self.tracer
            .log_state_change(node, self.clock, format!("LED -> {}", color));
        self.record(node, EventPayload::LedChange(color), None);
        if let Some(listener) = self.led_listener.as_mut() {
            listener();
        }
    }

    /// Cancel the node's pending timer and, if `arm`, schedule a new one
    /// `delay` from now. Returns the new timer id when one was armed.
    pub(crate) fn arm_timer(&mut self, node: NodeId, delay: SimTime, arm: bool) -> Option<u64> {
        let now = self.clock;
        let event_id = self.ids.next();
        let state = &mut self.nodes[node.index()];
        if let Some(previous) = state.pending_timer.take() {
            self.queue.remove(previous.event);
        }

        let timer_id = state.next_timer_id;
        state.next_timer_id += 1;
        let fire_time = arm.then(|| now + delay.max(SimTime::ZERO));
        let context = TimerEventContext {
            timer_id,
            fire_time,
        };

        if let Some(fire_time) = fire_time {
            state.pending_timer = Some(PendingTimer {
                event: event_id,
                timer_id,
                fire_time,
            });
            self.queue.insert(SimulationEvent::new(
                event_id,
                fire_time,
                node,
                EventPayload::TimerComplete(context),
            ));
            self.tracer
                .log_timer(node, now, format!("armed #{} for {}", timer_id, fire_time));
        } else {
            self.tracer.log_timer(node, now, "cancelled");
        }

        self.record(node, EventPayload::TimerSet(context), None);
        fire_time.map(|_| timer_id)
    }

    /// Put a packet on the air and schedule a PacketComplete per receiver.
    /// Negative pre-delays start the packet now.
    pub(crate) fn transmit(&mut self, node: NodeId, payload: Vec<u8>, pre_delay: SimTime) {
        let pre_delay = pre_delay.max(SimTime::ZERO);
        let (position, clock_skew, labels) = {
            let state = &self.nodes[node.index()];
            (state.position, state.clock_skew, state.labels().to_labels())
        };
        let outcome = self.propagation.transmit(
            node,
            position,
            clock_skew,
            payload,
            self.clock,
            pre_delay,
            &mut self.nodes,
            &mut self.transmissions,
            &mut self.rng,
        );

        for id in &outcome.deliveries {
            if let Some(tx) = self.transmissions.get(*id) {
                let completes_at = tx.end_time();
                self.queue.insert(
                    SimulationEvent::new(
                        self.ids.next(),
                        completes_at,
                        tx.receiver,
                        EventPayload::PacketComplete(*id),
                    )
                    .with_end_time(completes_at),
                );
            }
        }

        let packet = outcome.packet;
        metrics::counter!(metric_defs::RADIO_TX_PACKETS.name, labels.as_slice()).increment(1);
        metrics::counter!(metric_defs::RADIO_TX_AIRTIME.name, labels.as_slice())
            .increment(packet.duration().as_micros_f64().round() as u64);
        debug!(
            node = node.0,
            time = self.clock.as_secs_f64(),
            receivers = outcome.deliveries.len(),
            "packet transmitted"
        );
        self.tracer.log_radio(
            node,
            self.clock,
            format!("TX len={} receivers={}", packet.payload.len(), outcome.deliveries.len()),
        );

        let end_time = packet.end_time;
        self.record(node, EventPayload::Packet(Arc::clone(&packet)), Some(end_time));
    }
}
