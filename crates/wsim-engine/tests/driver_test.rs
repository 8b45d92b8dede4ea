//! Driver behaviour: clock, timers, replay, and error propagation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use wsim_engine::{
    Color, DeviceContext, DeviceError, DeviceLogic, DeviceRegistry, EventType, NodeId, SimError,
    SimTime, Simulation, SimulationConfig, Topology,
};

// ============================================================================
// Test Devices
// ============================================================================

/// Re-arms its timer several times on start; only the last one should fire.
/// A press cancels it, showing blue if a timer was pending and white if not.
#[derive(Default)]
struct Rearm;

impl DeviceLogic for Rearm {
    fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
        for tag in 0..3u32 {
            let delay = SimTime::from_secs(0.1 * (tag + 1) as f64);
            ctx.set_timer(delay, move |_: &mut Rearm, ctx| {
                ctx.set_led_color(Color::rgb(tag as u8, 0, 0));
                Ok(())
            });
        }
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
        ctx: &mut DeviceContext<'_, Self>,
        _input: u32,
        pressed: bool,
    ) -> Result<(), DeviceError> {
        if pressed {
            let armed = ctx.has_pending_timer();
            ctx.cancel_timer();
            if ctx.has_pending_timer() {
                return Err(DeviceError::new("timer survived cancel"));
            }
            ctx.set_led_color(if armed { Color::BLUE } else { Color::WHITE });
        }
        Ok(())
    }
}

/// Blinks forever: every timer schedules the next one.
#[derive(Default)]
struct Ticker;

fn tick(_dev: &mut Ticker, ctx: &mut DeviceContext<'_, Ticker>) -> Result<(), DeviceError> {
    let next = if ctx.current_time().as_secs_f64() as u64 % 2 == 0 {
        Color::WHITE
    } else {
        Color::BLACK
    };
    ctx.set_led_color(next);
    ctx.set_timer(SimTime::from_secs(0.25), tick);
    Ok(())
}

impl DeviceLogic for Ticker {
    fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
        ctx.set_timer(SimTime::from_secs(0.25), tick);
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
        Err(DeviceError::new("buttons are not wired"))
    }
}

/// Spreads a rumour: transmits once at a random time, re-floods on first receipt.
#[derive(Default)]
struct Gossip {
    heard: bool,
}

fn announce(_dev: &mut Gossip, ctx: &mut DeviceContext<'_, Gossip>) -> Result<(), DeviceError> {
    let id = ctx.node_id().index() as u8;
    ctx.radio_transmit_packet(vec![id], SimTime::ZERO);
    Ok(())
}

impl DeviceLogic for Gossip {
    fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
        ctx.radio_set_mode_polling(SimTime::from_secs(0.05), SimTime::from_secs(0.1));
        let delay = SimTime::from_secs(ctx.random() * 0.5);
        ctx.set_timer(delay, announce);
        Ok(())
    }

    fn receive_packet(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        _payload: &[u8],
    ) -> Result<(), DeviceError> {
        if !self.heard {
            self.heard = true;
            ctx.set_led_color(Color::RED);
            let delay = SimTime::from_secs(ctx.random() * 0.01);
            ctx.set_timer(delay, announce);
        }
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

// ============================================================================
// Helpers
// ============================================================================

fn registry() -> DeviceRegistry {
    let mut registry = DeviceRegistry::new();
    registry.register_default::<Rearm>("rearm");
    registry.register_default::<Ticker>("ticker");
    registry.register_default::<Gossip>("gossip");
    registry
}

fn single(node_type: &str) -> Simulation {
    let topology = Topology::new(30.0).with_node(0.0, 0.0, node_type);
    Simulation::new(&topology, &registry(), SimulationConfig::default(), 11).unwrap()
}

fn gossip_network(seed: u64) -> Simulation {
    let mut topology = Topology::new(12.0);
    for i in 0..25 {
        topology = topology.with_node((i % 5) as f64 * 6.0, (i / 5) as f64 * 6.0, "gossip");
    }
    Simulation::new(&topology, &registry(), SimulationConfig::default(), seed).unwrap()
}

/// Every node's history rendered to comparable strings.
fn histories(sim: &Simulation) -> Vec<Vec<String>> {
    sim.nodes()
        .iter()
        .map(|node| {
            node.history()
                .iter()
                .map(|e| {
                    format!(
                        "{:.12} {} {} {:?}",
                        e.start_time.as_secs_f64(),
                        e.event_type(),
                        e.origin,
                        e.led_color()
                    )
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_clock_is_monotonic_and_additive() {
    let mut sim = single("ticker");
    sim.start_simulation(SimTime::from_secs(1.0)).unwrap();

    let mut expected = 1.0;
    let mut previous = sim.current_time();
    for step in [0.001, 0.5, 0.0, 0.13, 2.0, 0.0001, 0.37] {
        sim.simulate_time(SimTime::from_secs(step)).unwrap();
        expected += step;
        assert!(sim.current_time() >= previous);
        assert_relative_eq!(sim.current_time().as_secs_f64(), expected, epsilon = 1e-9);
        previous = sim.current_time();
    }
}

#[test]
fn test_at_most_one_pending_timer() {
    let mut sim = single("rearm");
    sim.start_simulation(SimTime::ZERO).unwrap();
    assert_eq!(sim.pending_of_type(NodeId(0), EventType::TimerComplete), 1);

    let node = sim.node(NodeId(0)).unwrap();
    assert_eq!(node.history().of_type(EventType::TimerSet).count(), 3);
    assert_relative_eq!(node.pending_timer_time().unwrap().as_secs_f64(), 0.3);

    sim.simulate_time(SimTime::from_secs(1.0)).unwrap();
    let node = sim.node(NodeId(0)).unwrap();
    let leds: Vec<Color> = node.history().iter().filter_map(|e| e.led_color()).collect();
    assert_eq!(leds, vec![Color::rgb(2, 0, 0)]);
    assert_eq!(sim.pending_of_type(NodeId(0), EventType::TimerComplete), 0);
    assert!(node.pending_timer_time().is_none());
}

#[test]
fn test_cancelled_timer_never_fires() {
    let mut sim = single("rearm");
    sim.start_simulation(SimTime::ZERO).unwrap();
    sim.set_button_state(NodeId(0), 0, true).unwrap();
    assert_eq!(sim.pending_event_count(), 0);

    sim.simulate_time(SimTime::from_secs(1.0)).unwrap();
    let node = sim.node(NodeId(0)).unwrap();
    let leds: Vec<Color> = node.history().iter().filter_map(|e| e.led_color()).collect();
    assert_eq!(leds, vec![Color::BLUE]);
    assert_eq!(node.history().of_type(EventType::TimerSet).count(), 4);
}

#[test]
fn test_press_after_timer_fired_sees_no_pending_timer() {
    let mut sim = single("rearm");
    sim.start_simulation(SimTime::ZERO).unwrap();
    sim.simulate_time(SimTime::from_secs(1.0)).unwrap();
    sim.set_button_state(NodeId(0), 0, true).unwrap();

    let node = sim.node(NodeId(0)).unwrap();
    let leds: Vec<Color> = node.history().iter().filter_map(|e| e.led_color()).collect();
    assert_eq!(leds, vec![Color::rgb(2, 0, 0), Color::WHITE]);
}

#[test]
fn test_chained_timers_keep_single_pending() {
    let mut sim = single("ticker");
    sim.start_simulation(SimTime::ZERO).unwrap();
    for _ in 0..15 {
        sim.simulate_time(SimTime::from_secs(0.125)).unwrap();
        assert!(sim.pending_of_type(NodeId(0), EventType::TimerComplete) <= 1);
    }
    let node = sim.node(NodeId(0)).unwrap();
    assert_eq!(node.history().of_type(EventType::TimerComplete).count(), 7);
}

#[test]
fn test_led_listener_fires_per_change() {
    let mut sim = single("ticker");
    let count = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&count);
    sim.set_led_listener(move || {
        observed.fetch_add(1, Ordering::SeqCst);
    });
    sim.start_simulation(SimTime::ZERO).unwrap();
    sim.simulate_time(SimTime::from_secs(1.1)).unwrap();

    let changes = sim
        .node(NodeId(0))
        .unwrap()
        .history()
        .of_type(EventType::LedChange)
        .count();
    assert_eq!(changes, 4);
    assert_eq!(count.load(Ordering::SeqCst), changes);
}

#[test]
fn test_device_error_reaches_caller() {
    let mut sim = single("ticker");
    sim.start_simulation(SimTime::ZERO).unwrap();
    let err = sim.set_button_state(NodeId(0), 0, true).unwrap_err();
    match err {
        SimError::Device { node, source } => {
            assert_eq!(node, NodeId(0));
            assert_eq!(source.message(), "buttons are not wired");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_same_seed_same_history() {
    let run = |seed: u64| {
        let mut sim = gossip_network(seed);
        sim.start_simulation(SimTime::from_secs(0.2)).unwrap();
        sim.simulate_time(SimTime::from_secs(2.0)).unwrap();
        histories(&sim)
    };

    let first = run(42);
    assert_eq!(first, run(42));
    assert_ne!(first, run(43));
}

#[test]
fn test_same_seed_same_history_with_stimuli() {
    let run = || {
        let mut sim = gossip_network(5);
        sim.start_simulation(SimTime::from_secs(0.1)).unwrap();
        sim.simulate_time(SimTime::from_secs(0.3)).unwrap();
        sim.set_button_state(NodeId(12), 0, true).unwrap();
        sim.simulate_time(SimTime::from_secs(0.3)).unwrap();
        sim.set_button_state(NodeId(12), 0, false).unwrap();
        sim.simulate_time(SimTime::from_secs(1.0)).unwrap();
        (histories(&sim), sim.transmissions().len())
    };
    assert_eq!(run(), run());
}
