//! Hotplug monitoring on a dedicated libusb event thread.
//!
//! libusb delivers hotplug callbacks from inside `handle_events`, so a thread
//! drives the context and forwards every arrival and departure of a matching
//! device to the session's dispatch loop over a channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use cm6206_core::TargetIdentity;
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::backend::{BusDevice, DeviceKey};
use crate::error::{UsbError, UsbResult};
use crate::rusb_backend::RusbDevice;

/// How long one `handle_events` call may block before the stop flag is checked.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Events emitted by the hotplug monitor.
#[derive(Debug)]
pub enum HotplugEvent {
    /// A matching device was attached
    Arrived(RusbDevice),
    /// A matching device was detached
    Left(DeviceKey),
}

/// Running hotplug monitor. Dropping it stops the event thread.
pub struct HotplugMonitor {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HotplugMonitor {
    /// Register for arrivals and departures of `target` and start the event thread.
    ///
    /// Devices already attached are not reported; enumerate them separately
    /// after this returns.
    ///
    /// # Errors
    /// Returns an error if libusb lacks hotplug support or the registration fails.
    pub fn spawn(
        context: Context,
        target: TargetIdentity,
        events: mpsc::UnboundedSender<HotplugEvent>,
    ) -> UsbResult<Self> {
        if !rusb::has_hotplug() {
            return Err(UsbError::HotplugUnsupported);
        }

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let flag = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name("usb-hotplug".to_string())
            .spawn(move || run_event_thread(&context, target, events, &flag, &ready_tx))
            .map_err(|e| UsbError::Other(format!("failed to spawn hotplug thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { running, thread: Some(thread) }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(UsbError::Other("hotplug thread exited during setup".to_string())),
        }
    }

    /// Stop the event thread and wait for it.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Hotplug thread panicked");
        }
    }
}

impl Drop for HotplugMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_event_thread(
    context: &Context,
    target: TargetIdentity,
    events: mpsc::UnboundedSender<HotplugEvent>,
    running: &AtomicBool,
    ready: &std_mpsc::Sender<UsbResult<()>>,
) {
    let registration: rusb::Result<Registration<Context>> = HotplugBuilder::new()
        .vendor_id(target.vendor_id)
        .product_id(target.product_id)
        .enumerate(false)
        .register(context, Box::new(Forwarder { events }));

    let _registration = match registration {
        Ok(registration) => {
            let _ = ready.send(Ok(()));
            registration
        }
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };
    debug!(%target, "Hotplug callbacks registered");

    while running.load(Ordering::SeqCst) {
        if let Err(e) = context.handle_events(Some(POLL_INTERVAL)) {
            warn!(error = %e, "libusb event handling failed");
        }
    }
    debug!("Hotplug thread stopped");
}

/// Forwards libusb hotplug callbacks to the dispatch loop.
struct Forwarder {
    events: mpsc::UnboundedSender<HotplugEvent>,
}

impl Hotplug<Context> for Forwarder {
    fn device_arrived(&mut self, device: Device<Context>) {
        let device = RusbDevice::new(device);
        debug!(device = %device.key(), "Hotplug: device arrived");
        if self.events.send(HotplugEvent::Arrived(device)).is_err() {
            debug!("Dispatch loop gone, arrival dropped");
        }
    }

    fn device_left(&mut self, device: Device<Context>) {
        let key = DeviceKey { bus: device.bus_number(), address: device.address() };
        debug!(device = %key, "Hotplug: device left");
        if self.events.send(HotplugEvent::Left(key)).is_err() {
            debug!("Dispatch loop gone, departure dropped");
        }
    }
}
