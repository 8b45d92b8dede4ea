//! Device logic contract and the capability API it drives.

use crate::runtime::SimCore;
use crate::DeviceError;
use wsim_common::{Color, NodeId, RadioMode, SimTime};

/// Behaviour of one kind of simulated device.
///
/// Each entry point runs to completion before the driver continues. While it
/// runs, the device may call into its [`DeviceContext`] any number of times;
/// any future effects (packet completions, timers) are queued, never run
/// inline.
pub trait DeviceLogic: Sized + Send + 'static {
    /// Called once when the node powers on.
    fn device_start(&mut self, ctx: &mut DeviceContext<'_, Self>) -> Result<(), DeviceError>;

    /// Called when a transmission to this node completes successfully.
    fn receive_packet(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        payload: &[u8],
    ) -> Result<(), DeviceError>;

    /// Called when one of the node's button inputs changes.
    fn input_event(
        &mut self,
        ctx: &mut DeviceContext<'_, Self>,
        input: u32,
        pressed: bool,
    ) -> Result<(), DeviceError>;
}

/// Deferred work scheduled with [`DeviceContext::set_timer_callback`].
pub type TimerCallback<D> =
    Box<dyn FnOnce(&mut D, &mut DeviceContext<'_, D>) -> Result<(), DeviceError> + Send>;

pub(crate) struct PendingCallback<D> {
    timer_id: u64,
    callback: TimerCallback<D>,
}

/// The only view a device has of the simulation: its own node.
pub struct DeviceContext<'a, D> {
    core: &'a mut SimCore,
    node: NodeId,
    timer: &'a mut Option<PendingCallback<D>>,
}

impl<'a, D: DeviceLogic> DeviceContext<'a, D> {
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn current_time(&self) -> SimTime {
        self.core.clock()
    }

    pub fn radio_set_mode_receive(&mut self) {
        self.core.set_radio_mode(self.node, RadioMode::ReceiveAlways);
    }

    pub fn radio_set_mode_off(&mut self) {
        self.core.set_radio_mode(self.node, RadioMode::Off);
    }

    /// Listen for `time_on`, sleep for `time_off`, repeating from now.
    pub fn radio_set_mode_polling(&mut self, time_on: SimTime, time_off: SimTime) {
        self.core
            .set_radio_mode(self.node, RadioMode::Polling { time_on, time_off });
    }

    /// Send `payload` to every node in range, starting `pre_delay` from now.
    /// A negative `pre_delay` is treated as zero.
    pub fn radio_transmit_packet(&mut self, payload: impl Into<Vec<u8>>, pre_delay: SimTime) {
        self.core.transmit(self.node, payload.into(), pre_delay);
    }

    /// Replace the node's timer. Any pending timer is cancelled first; with
    /// `None` nothing new is armed. A TimerSet event is recorded either way.
    pub fn set_timer_callback(&mut self, delay: SimTime, callback: Option<TimerCallback<D>>) {
        *self.timer = None;
        let armed = self.core.arm_timer(self.node, delay, callback.is_some());
        if let (Some(timer_id), Some(callback)) = (armed, callback) {
            *self.timer = Some(PendingCallback { timer_id, callback });
        }
    }

    /// Closure form of [`set_timer_callback`](Self::set_timer_callback).
    pub fn set_timer<F>(&mut self, delay: SimTime, callback: F)
    where
        F: FnOnce(&mut D, &mut DeviceContext<'_, D>) -> Result<(), DeviceError> + Send + 'static,
    {
        self.set_timer_callback(delay, Some(Box::new(callback)));
    }

    pub fn cancel_timer(&mut self) {
        self.set_timer_callback(SimTime::ZERO, None);
    }

    /// Time this node's radio needs to put one packet on the air.
    pub fn packet_airtime(&self) -> SimTime {
        self.core.packet_airtime(self.node)
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn set_led_color(&mut self, color: Color) {
        self.core.set_led(self.node, color);
    }

    /// Last known state of a button input; `false` if it never changed.
    pub fn get_input_value(&self, input: u32) -> bool {
        self.core.node(self.node).input_value(input)
    }

    /// Uniform draw in `[0, 1)` from the simulation's random source.
    pub fn random(&mut self) -> f64 {
        self.core.next_random()
    }
}

// ============================================================================
// Type-erased hosting
// ============================================================================

/// Object-safe face of a device and its timer slot, as seen by the driver.
pub(crate) trait NodeBehavior: Send {
    fn start(&mut self, core: &mut SimCore, node: NodeId) -> Result<(), DeviceError>;
    fn receive(&mut self, core: &mut SimCore, node: NodeId, payload: &[u8])
        -> Result<(), DeviceError>;
    fn input(
        &mut self,
        core: &mut SimCore,
        node: NodeId,
        input: u32,
        pressed: bool,
    ) -> Result<(), DeviceError>;
    fn fire_timer(&mut self, core: &mut SimCore, node: NodeId, timer_id: u64)
        -> Result<(), DeviceError>;
}

pub(crate) struct DeviceHost<D> {
    logic: D,
    timer: Option<PendingCallback<D>>,
}

impl<D: DeviceLogic> DeviceHost<D> {
    pub(crate) fn new(logic: D) -> Self {
        DeviceHost { logic, timer: None }
    }
}

impl<D: DeviceLogic> NodeBehavior for DeviceHost<D> {
    fn start(&mut self, core: &mut SimCore, node: NodeId) -> Result<(), DeviceError> {
        let mut ctx = DeviceContext {
            core,
            node,
            timer: &mut self.timer,
        };
        self.logic.device_start(&mut ctx)
    }

    fn receive(
        &mut self,
        core: &mut SimCore,
        node: NodeId,
        payload: &[u8],
    ) -> Result<(), DeviceError> {
        let mut ctx = DeviceContext {
            core,
            node,
            timer: &mut self.timer,
        };
        self.logic.receive_packet(&mut ctx, payload)
    }

    fn input(
        &mut self,
        core: &mut SimCore,
        node: NodeId,
        input: u32,
        pressed: bool,
    ) -> Result<(), DeviceError> {
        let mut ctx = DeviceContext {
            core,
            node,
            timer: &mut self.timer,
        };
        self.logic.input_event(&mut ctx, input, pressed)
    }

    fn fire_timer(
        &mut self,
        core: &mut SimCore,
        node: NodeId,
        timer_id: u64,
    ) -> Result<(), DeviceError> {
        // A superseded timer is simply not fired.
        let pending = match self.timer.take() {
            Some(pending) if pending.timer_id == timer_id => pending,
            other => {
                self.timer = other;
                return Ok(());
            }
        };
        let mut ctx = DeviceContext {
            core,
            node,
            timer: &mut self.timer,
        };
        (pending.callback)(&mut self.logic, &mut ctx)
    }
}
