//! Reconstruction of receiver-on intervals from a node's event history.

use wsim_common::{EventLog, EventPayload, RadioMode, SimTime, WirelessPacketTransmission};

/// A closed time interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: SimTime,
    pub end: SimTime,
}

impl TimeWindow {
    pub fn new(start: SimTime, end: SimTime) -> Self {
        TimeWindow { start, end }
    }

    pub fn duration(&self) -> SimTime {
        self.end - self.start
    }

    pub fn contains(&self, at: SimTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Intervals during which the node's receiver was listening, up to `now`.
///
/// Built from the PowerState events in `history`. Each mode holds until the
/// next PowerState event (or `now`): ReceiveAlways is one window, Polling is
/// a window of `time_on` every `time_on + time_off` from the change, and Off
/// contributes nothing. Polling with no listen time yields no windows; with
/// no sleep time it is one continuous window.
pub fn receive_windows(history: &EventLog, now: SimTime) -> Vec<TimeWindow> {
    let changes: Vec<(SimTime, RadioMode)> = history
        .iter()
        .filter_map(|e| match e.payload {
            EventPayload::PowerState(ctx) if e.start_time <= now => Some((e.start_time, ctx.mode)),
            _ => None,
        })
        .collect();

    let mut windows = Vec::new();
    for (i, (changed_at, mode)) in changes.iter().enumerate() {
        let until = changes.get(i + 1).map_or(now, |(next, _)| *next);
        if until <= *changed_at {
            continue;
        }
        match *mode {
            RadioMode::Off => {}
            RadioMode::ReceiveAlways => windows.push(TimeWindow::new(*changed_at, until)),
            RadioMode::Polling { time_on, time_off } => {
                if time_on.as_secs_f64() <= 0.0 {
                    continue;
                }
                if time_off.as_secs_f64() <= 0.0 {
                    windows.push(TimeWindow::new(*changed_at, until));
                    continue;
                }
                let origin = changed_at.as_secs_f64();
                let period = (time_on + time_off).as_secs_f64();
                let cycles = ((until.as_secs_f64() - origin) / period).ceil() as u64;
                windows.extend((0..cycles).filter_map(|cycle| {
                    let start = SimTime::from_secs(origin + cycle as f64 * period);
                    let end = start + time_on;
                    let end = if end > until { until } else { end };
                    (end > start).then(|| TimeWindow::new(start, end))
                }));
            }
        }
    }
    windows
}

/// When a transmission occupies its receiver: the packet's airtime shifted
/// by the propagation delay.
pub fn transmission_window(tx: &WirelessPacketTransmission) -> TimeWindow {
    TimeWindow::new(tx.start_time(), tx.end_time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use wsim_common::{
        EventId, NodeId, PowerStateContext, SimulationEvent, TransmissionId, WirelessPacket,
    };

    fn power_state(log: &mut EventLog, at: f64, mode: RadioMode) {
        let id = EventId(log.len() as u64);
        log.append(SimulationEvent::new(
            id,
            SimTime::from_secs(at),
            NodeId(0),
            EventPayload::PowerState(PowerStateContext { mode }),
        ));
    }

    #[test]
    fn test_receive_always_until_off() {
        let mut log = EventLog::new();
        power_state(&mut log, 1.0, RadioMode::ReceiveAlways);
        power_state(&mut log, 3.0, RadioMode::Off);
        let windows = receive_windows(&log, SimTime::from_secs(10.0));
        assert_eq!(
            windows,
            vec![TimeWindow::new(SimTime::from_secs(1.0), SimTime::from_secs(3.0))]
        );
    }

    #[test]
    fn test_open_window_clipped_at_now() {
        let mut log = EventLog::new();
        power_state(&mut log, 0.0, RadioMode::ReceiveAlways);
        let windows = receive_windows(&log, SimTime::from_secs(2.5));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end, SimTime::from_secs(2.5));
    }

    #[test]
    fn test_polling_windows() {
        let mut log = EventLog::new();
        power_state(
            &mut log,
            0.0,
            RadioMode::Polling {
                time_on: SimTime::from_secs(0.05),
                time_off: SimTime::from_secs(0.5),
            },
        );
        let windows = receive_windows(&log, SimTime::from_secs(1.2));
        assert_eq!(windows.len(), 3);
        assert_relative_eq!(windows[1].start.as_secs_f64(), 0.55);
        assert_relative_eq!(windows[1].duration().as_secs_f64(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(windows[2].start.as_secs_f64(), 1.1);
    }

    #[test]
    fn test_polling_without_listen_time_has_no_windows() {
        let mut log = EventLog::new();
        power_state(
            &mut log,
            0.0,
            RadioMode::Polling {
                time_on: SimTime::ZERO,
                time_off: SimTime::from_secs(0.5),
            },
        );
        assert!(receive_windows(&log, SimTime::from_secs(3600.0)).is_empty());
    }

    #[test]
    fn test_polling_without_sleep_is_one_window() {
        let mut log = EventLog::new();
        power_state(
            &mut log,
            1.0,
            RadioMode::Polling {
                time_on: SimTime::from_secs(0.05),
                time_off: SimTime::ZERO,
            },
        );
        power_state(&mut log, 4.0, RadioMode::Off);
        let windows = receive_windows(&log, SimTime::from_secs(10.0));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], TimeWindow::new(SimTime::from_secs(1.0), SimTime::from_secs(4.0)));
    }

    #[test]
    fn test_no_power_state_no_windows() {
        assert!(receive_windows(&EventLog::new(), SimTime::from_secs(5.0)).is_empty());
    }

    #[test]
    fn test_transmission_window_includes_delay() {
        let packet = Arc::new(WirelessPacket {
            origin: NodeId(1),
            payload: vec![],
            start_time: SimTime::from_secs(1.0),
            end_time: SimTime::from_secs(1.001),
        });
        let tx = WirelessPacketTransmission {
            id: TransmissionId(0),
            packet,
            receiver: NodeId(2),
            distance: 3.0,
            propagation_delay: SimTime::from_secs(1e-8),
            signal_dbm: -8.0,
            receive_success: true,
            collision: false,
        };
        let window = transmission_window(&tx);
        assert_relative_eq!(window.start.as_secs_f64(), 1.0 + 1e-8);
        assert_relative_eq!(window.end.as_secs_f64(), 1.001 + 1e-8);
        assert!(window.contains(SimTime::from_secs(1.0005)));
    }
}
