//! A seeded simulation under test, with query and assertion helpers.

use crate::HarnessError;
use tracing::debug;
use wsim_common::RandomSource;
use wsim_engine::{
    Color, DeviceRegistry, EventPayload, EventType, NodeId, SimTime, Simulation,
    SimulationConfig, SimulationEvent, Topology,
};

/// Seconds before time zero during which nodes may power on.
pub const DEFAULT_PRE_RUN_WINDOW_SECS: f64 = 120.0;

/// Default slack for timing assertions, in seconds.
pub const DEFAULT_TOLERANCE_SECS: f64 = 0.005;

/// One started simulation plus the instance's own random source.
///
/// The instance generator is separate from the simulation's, so choices a
/// test makes (which node to press) do not perturb the radio model.
#[derive(Debug)]
pub struct UnitTestInstance {
    simulation: Simulation,
    rng: RandomSource,
    seed: u64,
}

impl UnitTestInstance {
    /// Build and start a simulation derived from `seed`.
    pub fn new(
        topology: &Topology,
        devices: &DeviceRegistry,
        config: SimulationConfig,
        seed: u64,
    ) -> Result<Self, HarnessError> {
        let mut rng = RandomSource::new(seed);
        let mut simulation = Simulation::new(topology, devices, config, rng.next_u64())?;
        simulation.start_simulation(SimTime::from_secs(DEFAULT_PRE_RUN_WINDOW_SECS))?;
        debug!(seed, nodes = simulation.node_count(), "unit test instance ready");
        Ok(UnitTestInstance {
            simulation,
            rng,
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Uniform integer in `[0, max)`.
    pub fn next_random(&mut self, max: usize) -> usize {
        self.rng.next_below(max)
    }

    pub fn random_node(&mut self) -> Result<NodeId, HarnessError> {
        let count = self.simulation.node_count();
        if count == 0 {
            return Err(HarnessError::EmptyNetwork);
        }
        Ok(NodeId(self.rng.next_below(count)))
    }

    /// Run for `after + tolerance`, then require that every node changed its
    /// LED to `expected` within the last `2 * tolerance`.
    pub fn verify_all_leds_change(
        &mut self,
        after: SimTime,
        expected: Color,
        tolerance: SimTime,
    ) -> Result<(), HarnessError> {
        self.simulation.simulate_time(after + tolerance)?;
        let now = self.simulation.current_time();
        let earliest = now - tolerance - tolerance;

        for node in self.simulation.nodes() {
            let changed = node
                .history()
                .iter()
                .rev()
                .take_while(|e| e.start_time >= earliest)
                .any(|e| e.led_color() == Some(expected));
            if !changed {
                return Err(HarnessError::verification(format!(
                    "{} did not change LED to {} by {}",
                    node.id(),
                    expected,
                    now
                )));
            }
        }
        Ok(())
    }

    /// Earliest event across all nodes after `exclusive_start` matching `filter`.
    fn find_next_event<F>(&self, exclusive_start: SimTime, filter: F) -> Option<&SimulationEvent>
    where
        F: Fn(&SimulationEvent) -> bool,
    {
        self.simulation
            .nodes()
            .iter()
            .filter_map(|node| {
                node.history()
                    .iter()
                    .skip_while(|e| e.start_time <= exclusive_start)
                    .find(|e| filter(e))
            })
            .min_by(|a, b| a.start_time.cmp(&b.start_time))
    }

    pub fn find_next_button_press(&self, exclusive_start: SimTime) -> Option<&SimulationEvent> {
        self.find_next_event(exclusive_start, |e| {
            matches!(e.payload, EventPayload::ButtonChange(ctx) if ctx.pressed)
        })
    }

    pub fn find_first_node_event<F>(
        &self,
        node: NodeId,
        exclusive_start: SimTime,
        inclusive_end: SimTime,
        filter: F,
    ) -> Option<&SimulationEvent>
    where
        F: FnMut(&SimulationEvent) -> bool,
    {
        self.simulation
            .node(node)?
            .history()
            .find_first(exclusive_start, inclusive_end, filter)
    }

    /// First successful packet receipt. Its start time is the receive time.
    pub fn find_first_received_packet(
        &self,
        node: NodeId,
        exclusive_start: SimTime,
        inclusive_end: SimTime,
    ) -> Option<&SimulationEvent> {
        self.find_first_node_event(node, exclusive_start, inclusive_end, |e| {
            e.event_type() == EventType::PacketComplete
                && e.transmission_id()
                    .and_then(|id| self.simulation.transmission(id))
                    .is_some_and(|tx| tx.receive_success)
        })
    }

    pub fn find_first_led_color<F>(
        &self,
        node: NodeId,
        exclusive_start: SimTime,
        inclusive_end: SimTime,
        filter: F,
    ) -> Option<&SimulationEvent>
    where
        F: Fn(Color) -> bool,
    {
        self.find_first_node_event(node, exclusive_start, inclusive_end, |e| {
            e.led_color().is_some_and(&filter)
        })
    }
}
