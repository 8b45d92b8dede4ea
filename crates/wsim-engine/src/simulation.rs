//! The simulation driver.

use crate::config::SimulationConfig;
use crate::device::NodeBehavior;
use crate::node::NodeState;
use crate::registry::DeviceRegistry;
use crate::runtime::{EventIds, SimCore};
use crate::topology::Topology;
use crate::{BuildError, DeviceError, SimError};
use std::sync::Arc;
use tracing::{debug, info, trace};
use wsim_common::node_tracer::{NodeTracer, NodeTracerConfig};
use wsim_common::{
    ButtonEventContext, EventPayload, EventQueue, EventType, NodeId, RandomSource, SimTime,
    SimulationEvent, TransmissionId, WirelessPacketTransmission,
};
use wsim_metrics::{metric_defs, metrics};
use wsim_radio::{PropagationModel, TransmissionStore};

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    NotStarted,
    /// Inside a `simulate_time` call.
    Running,
    /// Started, waiting for the next advance.
    Idle,
}

/// A network of simulated devices and the clock that drives them.
///
/// Single-threaded: every event is dispatched to completion before the next
/// one is popped. Independent simulations share nothing and may run on
/// different threads.
pub struct Simulation {
    core: SimCore,
    devices: Vec<Box<dyn NodeBehavior>>,
    state: SimulationState,
    pre_run_window: SimTime,
    seed: u64,
}

impl Simulation {
    /// Bind every topology node to a fresh instance of its device logic.
    ///
    /// Fails without building anything if a node type is not registered.
    pub fn new(
        topology: &Topology,
        registry: &DeviceRegistry,
        config: SimulationConfig,
        seed: u64,
    ) -> Result<Self, BuildError> {
        let range = topology.base_transmit_range;
        if !(range.is_finite() && range > 0.0) {
            return Err(BuildError::InvalidRange(range));
        }
        let propagation = PropagationModel::new(config.radio.clone(), range)?;
        let mut rng = RandomSource::new(seed);

        let mut nodes = Vec::with_capacity(topology.len());
        let mut devices = Vec::with_capacity(topology.len());
        for (index, entry) in topology.nodes.iter().enumerate() {
            let device = registry.instantiate(&entry.node_type).ok_or_else(|| {
                BuildError::UnknownNodeType {
                    index,
                    node_type: entry.node_type.clone(),
                }
            })?;
            let clock_skew = config.radio.draw_clock_skew(&mut rng);
            nodes.push(NodeState::new(
                NodeId(index),
                entry.node_type.clone(),
                entry.position(),
                clock_skew,
            ));
            devices.push(device);
        }

        debug!(nodes = nodes.len(), range, seed, "simulation built");

        Ok(Simulation {
            core: SimCore {
                clock: SimTime::ZERO,
                queue: EventQueue::new(),
                ids: EventIds::default(),
                nodes,
                transmissions: TransmissionStore::new(),
                propagation,
                rng,
                tracer: NodeTracer::new(NodeTracerConfig::from_spec(&config.tracer)),
                led_listener: None,
            },
            devices,
            state: SimulationState::NotStarted,
            pre_run_window: SimTime::ZERO,
            seed,
        })
    }

    /// Power every node on at a random time in `[0, pre_run_window)`, then
    /// run until `pre_run_window`.
    ///
    /// With a non-positive window every node powers on at time zero, before
    /// this call returns.
    pub fn start_simulation(&mut self, pre_run_window: SimTime) -> Result<(), SimError> {
        if self.state != SimulationState::NotStarted {
            return Err(SimError::AlreadyStarted);
        }
        let window = pre_run_window.max(SimTime::ZERO);
        self.pre_run_window = window;
        self.core.clock = SimTime::ZERO;

        for index in 0..self.core.nodes.len() {
            let at = SimTime::from_secs(self.core.rng.gen_range_f64(0.0..window.as_secs_f64()));
            let id = self.core.ids.next();
            self.core.queue.insert(SimulationEvent::new(
                id,
                at,
                NodeId(index),
                EventPayload::NodePowerOn,
            ));
        }
        self.state = SimulationState::Idle;
        info!(
            nodes = self.core.nodes.len(),
            pre_run_window = window.as_secs_f64(),
            "simulation started"
        );

        if window == SimTime::ZERO {
            self.state = SimulationState::Running;
            let result = self.run_events(SimTime::ZERO, true);
            self.state = SimulationState::Idle;
            return result;
        }
        self.simulate_time(window)
    }

    /// Process every event before `current_time + duration`, then set the
    /// clock to exactly that horizon.
    pub fn simulate_time(&mut self, duration: SimTime) -> Result<(), SimError> {
        if self.state == SimulationState::NotStarted {
            return Err(SimError::NotStarted);
        }
        if duration.is_negative() || !duration.as_secs_f64().is_finite() {
            return Err(SimError::InvalidDuration);
        }
        let horizon = self.core.clock + duration;

        self.state = SimulationState::Running;
        let result = self.run_events(horizon, false);
        self.state = SimulationState::Idle;
        result?;

        self.core.clock = horizon;
        metrics::gauge!(metric_defs::SIM_QUEUE_DEPTH.name).set(self.core.queue.len() as f64);
        trace!(
            time = horizon.as_secs_f64(),
            pending = self.core.queue.len(),
            "advanced"
        );
        Ok(())
    }

    fn run_events(&mut self, horizon: SimTime, inclusive: bool) -> Result<(), SimError> {
        while let Some(next) = self.core.queue.peek_earliest_time() {
            if next > horizon || (next == horizon && !inclusive) {
                break;
            }
            let Some(event) = self.core.queue.pop_earliest() else {
                break;
            };
            self.core.clock = self.core.clock.max(event.start_time);
            self.dispatch(event)?;
            metrics::counter!(metric_defs::SIM_EVENTS_PROCESSED.name).increment(1);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: SimulationEvent) -> Result<(), SimError> {
        let node = event.origin;
        let index = node.index();
        if index >= self.devices.len() {
            return Err(SimError::UnknownNode(node));
        }
        self.core.tracer.log_event_received(node, self.core.clock, &event);
        self.core.nodes[index].history.append(event.clone());

        let core = &mut self.core;
        let device = &mut self.devices[index];
        let result = match event.payload {
            EventPayload::NodePowerOn => device.start(core, node),
            EventPayload::PacketComplete(id) => {
                core.nodes[index].in_flight.retain(|t| *t != id);
                let delivered = core
                    .transmissions
                    .get(id)
                    .filter(|tx| tx.receive_success)
                    .map(|tx| Arc::clone(&tx.packet));
                match delivered {
                    Some(packet) => {
                        let labels = core.nodes[index].labels().to_labels();
                        metrics::counter!(metric_defs::RADIO_RX_SUCCESS.name, labels.as_slice())
                            .increment(1);
                        device.receive(core, node, &packet.payload)
                    }
                    None => Ok(()),
                }
            }
            EventPayload::TimerComplete(ctx) => {
                let state = &mut core.nodes[index];
                if state
                    .pending_timer
                    .is_some_and(|pending| pending.timer_id == ctx.timer_id)
                {
                    state.pending_timer = None;
                }
                device.fire_timer(core, node, ctx.timer_id)
            }
            EventPayload::NodePowerOff => return Err(SimError::PowerOffUnsupported),
            other => {
                return Err(SimError::UnexpectedEvent {
                    event_type: other.event_type(),
                })
            }
        };
        result.map_err(|source| device_failure(node, source))
    }

    /// Change a button input, record it, and deliver it to the device.
    pub fn set_button_state(
        &mut self,
        node: NodeId,
        input: u32,
        pressed: bool,
    ) -> Result<(), SimError> {
        if self.state == SimulationState::NotStarted {
            return Err(SimError::NotStarted);
        }
        let index = node.index();
        if index >= self.devices.len() {
            return Err(SimError::UnknownNode(node));
        }
        self.core.nodes[index].buttons.insert(input, pressed);
        self.core.tracer.log_state_change(
            node,
            self.core.clock,
            format!("button {} {}", input, if pressed { "pressed" } else { "released" }),
        );
        self.core.record(
            node,
            EventPayload::ButtonChange(ButtonEventContext { input, pressed }),
            None,
        );
        self.devices[index]
            .input(&mut self.core, node, input, pressed)
            .map_err(|source| device_failure(node, source))
    }

    /// Register the callback fired after every LED change.
    pub fn set_led_listener<F>(&mut self, listener: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.core.led_listener = Some(Box::new(listener));
    }

    /// Uniform draw in `[0, 1)` from this simulation's random source.
    pub fn next_random(&mut self) -> f64 {
        self.core.next_random()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn current_time(&self) -> SimTime {
        self.core.clock
    }

    pub fn pre_run_window(&self) -> SimTime {
        self.pre_run_window
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn node_count(&self) -> usize {
        self.core.nodes.len()
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeState> {
        self.core.nodes.get(node.index())
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.core.nodes
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.core.nodes.len()).map(NodeId)
    }

    pub fn transmission(&self, id: TransmissionId) -> Option<&WirelessPacketTransmission> {
        self.core.transmissions.get(id)
    }

    pub fn transmissions(&self) -> &TransmissionStore {
        &self.core.transmissions
    }

    pub fn pending_event_count(&self) -> usize {
        self.core.queue.len()
    }

    /// Pending events of one type originating at `node`.
    pub fn pending_of_type(&self, node: NodeId, event_type: EventType) -> usize {
        self.core
            .queue
            .iter()
            .filter(|e| e.origin == node && e.event_type() == event_type)
            .count()
    }
}

fn device_failure(node: NodeId, source: DeviceError) -> SimError {
    debug!(node = node.0, error = %source, "device logic failed");
    SimError::Device { node, source }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("clock", &self.core.clock)
            .field("nodes", &self.core.nodes.len())
            .field("pending", &self.core.queue.len())
            .field("seed", &self.seed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceContext, DeviceLogic};

    #[derive(Default)]
    struct Listener;

    impl DeviceLogic for Listener {
        fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
            ctx.radio_set_mode_receive();
            Ok(())
        }

        fn receive_packet(
            &mut self,
            _ctx: &mut DeviceContext<'_, Self>,
            _payload: &[u8],
        ) -> Result<(), DeviceError> {
            Ok(())
        }

        fn input_event(
            &mut self,
            _ctx: &mut DeviceContext<'_, Self>,
            _input: u32,
            _pressed: bool,
        ) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    fn registry() -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        registry.register_default::<Listener>("listener");
        registry
    }

    fn build(nodes: usize) -> Simulation {
        let mut topology = Topology::new(30.0);
        for i in 0..nodes {
            topology = topology.with_node(i as f64, 0.0, "listener");
        }
        Simulation::new(&topology, &registry(), SimulationConfig::default(), 7).unwrap()
    }

    #[test]
    fn test_unknown_node_type_fails_build() {
        let topology = Topology::new(30.0)
            .with_node(0.0, 0.0, "listener")
            .with_node(1.0, 0.0, "toaster");
        let err = Simulation::new(&topology, &registry(), SimulationConfig::default(), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnknownNodeType { index: 1, ref node_type } if node_type == "toaster"
        ));
    }

    #[test]
    fn test_invalid_range_fails_build() {
        let topology = Topology::new(-1.0).with_node(0.0, 0.0, "listener");
        let err = Simulation::new(&topology, &registry(), SimulationConfig::default(), 1)
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidRange(_)));
    }

    #[test]
    fn test_simulate_before_start() {
        let mut sim = build(2);
        assert_eq!(sim.state(), SimulationState::NotStarted);
        assert!(matches!(
            sim.simulate_time(SimTime::from_secs(1.0)),
            Err(SimError::NotStarted)
        ));
        assert!(matches!(
            sim.set_button_state(NodeId(0), 0, true),
            Err(SimError::NotStarted)
        ));
    }

    #[test]
    fn test_start_twice() {
        let mut sim = build(1);
        sim.start_simulation(SimTime::from_secs(1.0)).unwrap();
        assert!(matches!(
            sim.start_simulation(SimTime::from_secs(1.0)),
            Err(SimError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_power_on_within_window() {
        let mut sim = build(10);
        sim.start_simulation(SimTime::from_secs(120.0)).unwrap();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert_eq!(sim.current_time(), SimTime::from_secs(120.0));
        assert_eq!(sim.pre_run_window(), SimTime::from_secs(120.0));
        for node in sim.nodes() {
            let power_on = node.history().last_of_type(EventType::NodePowerOn).unwrap();
            assert!(power_on.start_time < SimTime::from_secs(120.0));
            assert_eq!(node.radio_mode(), wsim_common::RadioMode::ReceiveAlways);
            assert_eq!(node.mode_changed_at(), power_on.start_time);
        }
        assert_eq!(sim.pending_event_count(), 0);
    }

    #[test]
    fn test_zero_window_powers_on_immediately() {
        let mut sim = build(3);
        sim.start_simulation(SimTime::ZERO).unwrap();
        assert_eq!(sim.current_time(), SimTime::ZERO);
        assert!(sim
            .nodes()
            .iter()
            .all(|n| n.history().last_of_type(EventType::NodePowerOn).is_some()));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut sim = build(1);
        sim.start_simulation(SimTime::ZERO).unwrap();
        assert!(matches!(
            sim.simulate_time(SimTime::from_secs(-1.0)),
            Err(SimError::InvalidDuration)
        ));
    }

    #[test]
    fn test_button_state_recorded() {
        let mut sim = build(1);
        sim.start_simulation(SimTime::ZERO).unwrap();
        sim.set_button_state(NodeId(0), 2, true).unwrap();
        let node = sim.node(NodeId(0)).unwrap();
        assert!(node.input_value(2));
        assert!(!node.input_value(0));
        let press = node.history().last_of_type(EventType::ButtonChange).unwrap();
        assert!(matches!(
            press.payload,
            EventPayload::ButtonChange(ButtonEventContext { input: 2, pressed: true })
        ));
        assert!(matches!(
            sim.set_button_state(NodeId(5), 0, true),
            Err(SimError::UnknownNode(NodeId(5)))
        ));
    }
}
