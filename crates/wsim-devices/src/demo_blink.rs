//! A minimal device: blinks red on any packet, green on its own button.
//!
//! The receiver is always on, which is simple and not power efficient.

use wsim_engine::{Color, DeviceContext, DeviceError, DeviceLogic, SimTime};

pub const NODE_TYPE: &str = "demo-blink";

/// How long the LED stays lit.
const BLINK_SECS: f64 = 1.0;

#[derive(Debug, Default)]
pub struct DemoBlink;

fn led_off(_dev: &mut DemoBlink, ctx: &mut DeviceContext<'_, DemoBlink>) -> Result<(), DeviceError> {
    ctx.set_led_color(Color::BLACK);
    Ok(())
}

impl DeviceLogic for DemoBlink {
    fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
        ctx.radio_set_mode_receive();
        Ok(())
    }

    fn receive_packet(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        _payload: &[u8],
    ) -> Result<(), DeviceError> {
        ctx.set_led_color(Color::RED);
        ctx.set_timer(SimTime::from_secs(BLINK_SECS), led_off);
        Ok(())
    }

    fn input_event(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        _input: u32,
        pressed: bool,
    ) -> Result<(), DeviceError> {
        if pressed {
            // Contents are irrelevant to receivers.
            ctx.radio_transmit_packet(Vec::new(), SimTime::ZERO);
            ctx.set_led_color(Color::GREEN);
            ctx.set_timer(SimTime::from_secs(BLINK_SECS), led_off);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsim_engine::{
        DeviceRegistry, EventType, NodeId, RadioConfig, Simulation, SimulationConfig, Topology,
    };

    fn pair() -> Simulation {
        let mut devices = DeviceRegistry::new();
        devices.register_default::<DemoBlink>(NODE_TYPE);
        let topology = Topology::new(30.0)
            .with_node(0.0, 0.0, NODE_TYPE)
            .with_node(10.0, 0.0, NODE_TYPE);
        let config = SimulationConfig::default().with_radio(RadioConfig::lossless());
        let mut sim = Simulation::new(&topology, &devices, config, 4).unwrap();
        sim.start_simulation(SimTime::from_secs(1.0)).unwrap();
        sim
    }

    fn leds(sim: &Simulation, node: NodeId) -> Vec<Color> {
        sim.node(node)
            .unwrap()
            .history()
            .of_type(EventType::LedChange)
            .filter_map(|e| e.led_color())
            .collect()
    }

    #[test]
    fn test_press_blinks_both_nodes() {
        let mut sim = pair();
        sim.set_button_state(NodeId(0), 0, true).unwrap();
        assert_eq!(sim.node(NodeId(0)).unwrap().led_color(), Color::GREEN);

        sim.simulate_time(SimTime::from_secs(0.5)).unwrap();
        assert_eq!(sim.node(NodeId(1)).unwrap().led_color(), Color::RED);

        sim.simulate_time(SimTime::from_secs(1.0)).unwrap();
        assert_eq!(leds(&sim, NodeId(0)), vec![Color::GREEN, Color::BLACK]);
        assert_eq!(leds(&sim, NodeId(1)), vec![Color::RED, Color::BLACK]);
    }

    #[test]
    fn test_release_does_nothing() {
        let mut sim = pair();
        sim.set_button_state(NodeId(0), 0, false).unwrap();
        sim.simulate_time(SimTime::from_secs(2.0)).unwrap();
        assert!(leds(&sim, NodeId(0)).is_empty());
        assert!(sim.transmissions().is_empty());
    }
}
