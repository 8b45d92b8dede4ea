//! Network-wide synchronized activation.
//!
//! A button press on any node schedules an activation one second later.
//! The pressed node floods activation packets carrying the time remaining;
//! every node that hears one adopts the deadline, turns red, and joins the
//! flood after a random jitter. At the deadline every node turns green, then
//! black two seconds later. Receivers poll to save power, so the flood must
//! repeat often enough to land inside each node's listening window.

use thiserror::Error;
use tracing::trace;
use wsim_engine::{Color, DeviceContext, DeviceError, DeviceLogic, NodeId, SimTime};
use wsim_harness::{HarnessError, TestRegistry, UnitTestInstance, DEFAULT_TOLERANCE_SECS};

pub const NODE_TYPE: &str = "mesh-activation";

const POLL_ON_SECS: f64 = 0.05;
const POLL_OFF_SECS: f64 = 0.5;
/// Interval between flood packets from one node.
const PACKET_SPACING_SECS: f64 = 0.01;
const ACTIVATION_DELAY_SECS: f64 = 1.0;
/// Green hold before the node stops treating the activation as pending.
const SETTLE_SECS: f64 = 0.1;
const LED_OFF_AFTER_SETTLE_SECS: f64 = 1.9;

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum PacketError {
    #[error("activation packet must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl From<PacketError> for DeviceError {
    fn from(err: PacketError) -> Self {
        DeviceError::new(err.to_string())
    }
}

/// Payload of a flood packet: little-endian `f64` seconds then `u32` source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationPacket {
    pub time_to_activation: f64,
    /// Node whose button started this activation.
    pub source: u32,
}

impl ActivationPacket {
    pub const LEN: usize = 12;

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.time_to_activation.to_le_bytes());
        bytes.extend_from_slice(&self.source.to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let (time, source) = match (bytes.get(0..8), bytes.get(8..12)) {
            (Some(time), Some(source)) if bytes.len() == Self::LEN => (time, source),
            _ => {
                return Err(PacketError::Length {
                    expected: Self::LEN,
                    actual: bytes.len(),
                })
            }
        };
        let mut time_bytes = [0u8; 8];
        time_bytes.copy_from_slice(time);
        let mut source_bytes = [0u8; 4];
        source_bytes.copy_from_slice(source);
        Ok(ActivationPacket {
            time_to_activation: f64::from_le_bytes(time_bytes),
            source: u32::from_le_bytes(source_bytes),
        })
    }
}

// ============================================================================
// Device
// ============================================================================

#[derive(Debug, Default)]
pub struct MeshActivation {
    waiting_for_activation: bool,
    activating_source: Option<u32>,
    activate_at: SimTime,
}

impl MeshActivation {
    fn send_activation(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        pre_delay: SimTime,
    ) -> Result<(), DeviceError> {
        let now = ctx.current_time();
        // Stamped relative to the end of the packet, when receivers see it.
        let time_to_activation =
            (self.activate_at - now - pre_delay - ctx.packet_airtime()).as_secs_f64();
        if time_to_activation > 0.0 {
            let packet = ActivationPacket {
                time_to_activation,
                source: self.activating_source.unwrap_or(ctx.node_id().index() as u32),
            };
            ctx.radio_transmit_packet(packet.encode(), pre_delay);
        }

        let time_to_end = self.activate_at - now;
        if time_to_end.as_secs_f64() < PACKET_SPACING_SECS {
            ctx.set_timer(time_to_end, |dev: &mut Self, ctx| dev.activate(ctx));
        } else {
            ctx.set_timer(SimTime::from_secs(PACKET_SPACING_SECS), |dev: &mut Self, ctx| {
                dev.send_activation(ctx, SimTime::ZERO)
            });
        }
        Ok(())
    }

    fn activate(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
        ctx.set_led_color(Color::GREEN);
        ctx.set_timer(SimTime::from_secs(SETTLE_SECS), |dev: &mut Self, ctx| {
            dev.waiting_for_activation = false;
            ctx.set_timer(SimTime::from_secs(LED_OFF_AFTER_SETTLE_SECS), |_: &mut Self, ctx| {
                ctx.set_led_color(Color::BLACK);
                Ok(())
            });
            Ok(())
        });
        Ok(())
    }
}

impl DeviceLogic for MeshActivation {
    fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError> {
        ctx.radio_set_mode_polling(
            SimTime::from_secs(POLL_ON_SECS),
            SimTime::from_secs(POLL_OFF_SECS),
        );
        Ok(())
    }

    fn receive_packet(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        payload: &[u8],
    ) -> Result<(), DeviceError> {
        let packet = ActivationPacket::decode(payload)?;
        // A second, independent activation while one is pending is ignored.
        if self.waiting_for_activation {
            return Ok(());
        }

        self.activate_at = ctx.current_time() + SimTime::from_secs(packet.time_to_activation);
        self.activating_source = Some(packet.source);
        self.waiting_for_activation = true;
        trace!(
            node = ctx.node_id().0,
            source = packet.source,
            activate_at = self.activate_at.as_secs_f64(),
            "activation heard"
        );

        let jitter = SimTime::from_secs(ctx.random() * PACKET_SPACING_SECS);
        ctx.set_timer(jitter, |dev: &mut Self, ctx| {
            dev.send_activation(ctx, SimTime::ZERO)
        });
        ctx.set_led_color(Color::RED);
        Ok(())
    }

    fn input_event(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        _input: u32,
        pressed: bool,
    ) -> Result<(), DeviceError> {
        if pressed {
            self.activate_at = ctx.current_time() + SimTime::from_secs(ACTIVATION_DELAY_SECS);
            self.activating_source = Some(ctx.node_id().index() as u32);
            self.waiting_for_activation = true;
            self.send_activation(ctx, SimTime::ZERO)?;
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests and Reports
// ============================================================================

pub fn register(tests: &mut TestRegistry) {
    tests.register_test("verify_behavior", NODE_TYPE, verify_behavior);
    tests.register_report("node_response", NODE_TYPE, node_response);
}

/// Press a random node; every node must go green one second later and
/// black two seconds after that.
pub fn verify_behavior(instance: &mut UnitTestInstance) -> Result<(), HarnessError> {
    let tolerance = SimTime::from_secs(DEFAULT_TOLERANCE_SECS);
    let node = instance.random_node()?;

    let sim = instance.simulation_mut();
    sim.set_button_state(node, 0, true)?;
    sim.simulate_time(SimTime::from_secs(0.5))?;
    sim.set_button_state(node, 0, false)?;

    instance.verify_all_leds_change(SimTime::from_secs(0.5), Color::GREEN, tolerance)?;
    instance.verify_all_leds_change(SimTime::from_secs(2.0 - 0.005), Color::BLACK, tolerance)
}

/// How long after the press a node did something, if it did.
struct NodeTime {
    node: NodeId,
    after: Option<f64>,
}

fn sort_node_times(times: &mut [NodeTime]) {
    times.sort_by(|a, b| match (a.after, b.after) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.node.cmp(&b.node),
    });
}

/// For every button press: when each node first received a packet and when
/// it first turned green, relative to the press.
pub fn node_response(instance: &mut UnitTestInstance) -> Result<String, HarnessError> {
    let window = SimTime::from_secs(1.5);
    let mut lines: Vec<String> = Vec::new();
    let mut start = SimTime::ZERO;

    while let Some(press) = instance.find_next_button_press(start) {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        start = press.start_time;
        lines.push(format!("Button press on {} at {}:", press.origin, start));

        let mut first_packet = Vec::new();
        let mut first_green = Vec::new();
        for node in instance.simulation().node_ids() {
            let received = instance
                .find_first_received_packet(node, start, start + window)
                .map(|e| (e.start_time - start).as_secs_f64());
            first_packet.push(NodeTime {
                node,
                after: received,
            });

            let green = instance
                .find_first_led_color(node, start, start + window, |c| c == Color::GREEN)
                .map(|e| (e.start_time - start).as_secs_f64());
            first_green.push(NodeTime { node, after: green });
        }
        sort_node_times(&mut first_packet);
        sort_node_times(&mut first_green);

        for entry in &first_packet {
            lines.push(format_entry("received", entry));
        }
        for entry in &first_green {
            lines.push(format_entry("LED change", entry));
        }
    }
    Ok(lines.join("\n"))
}

fn format_entry(what: &str, entry: &NodeTime) -> String {
    match entry.after {
        Some(after) => format!("  {}: {} at {:.6}s (true)", entry.node, what, after),
        None => format!("  {}: {} never (false)", entry.node, what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_codec() {
        let packet = ActivationPacket {
            time_to_activation: 0.734,
            source: 17,
        };
        let bytes = packet.encode();
        assert_eq!(bytes.len(), ActivationPacket::LEN);
        assert_eq!(ActivationPacket::decode(&bytes), Ok(packet));
    }

    #[test]
    fn test_packet_rejects_bad_length() {
        assert_eq!(
            ActivationPacket::decode(&[0u8; 5]),
            Err(PacketError::Length {
                expected: 12,
                actual: 5
            })
        );
        assert!(ActivationPacket::decode(&[0u8; 13]).is_err());
    }

    #[test]
    fn test_sort_node_times_puts_misses_last() {
        let mut times = vec![
            NodeTime {
                node: NodeId(0),
                after: None,
            },
            NodeTime {
                node: NodeId(1),
                after: Some(0.4),
            },
            NodeTime {
                node: NodeId(2),
                after: Some(0.1),
            },
        ];
        sort_node_times(&mut times);
        let order: Vec<usize> = times.iter().map(|t| t.node.0).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }
}
