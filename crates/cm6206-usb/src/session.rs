//! Persistent-mode session: reacting to attach, detach and power events.
//!
//! The session does not own an event loop. Whoever drives it hands events to
//! [`Session::handle`] one at a time, and each handler runs to completion
//! before the next event is looked at, so the watched-device table needs no
//! locking.

use std::collections::HashMap;
use std::thread;

use cm6206_core::Settings;
use tracing::{debug, error, info, warn};

use crate::backend::{BusDevice, DeviceKey, UsbBus};
use crate::error::UsbResult;
use crate::locator::{activate_all, activate_device};

/// System power transitions the session cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// The system asks whether it may sleep
    CanSleep,
    /// The system is about to sleep
    WillSleep,
    /// The system has woken up
    PoweredOn,
}

/// Acknowledges power-change requests so the system does not wait for us.
#[cfg_attr(test, mockall::automock)]
pub trait PowerControl {
    /// Let the pending power change proceed.
    fn allow_power_change(&mut self);
}

/// Something that happened while the session was running.
#[derive(Debug)]
pub enum SessionEvent<D> {
    /// Matching devices appeared on the bus
    DevicesArrived(Vec<D>),
    /// A device went away
    DeviceLeft(DeviceKey),
    /// The system power state changed
    Power(PowerEvent),
    /// SIGHUP: resend the activation commands to every device
    Hangup,
    /// SIGINT/SIGTERM: stop
    Interrupt,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, no subscriptions yet
    #[default]
    Idle,
    /// Dispatching events
    Running,
    /// Asked to stop
    Terminating,
    /// Stopped
    Exited,
}

/// What the driver of the session should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep dispatching
    Continue,
    /// Terminate the process
    Exit,
}

/// A device the session watches for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedDevice {
    /// Removal subscription id
    pub subscription: u64,
    /// Name captured on arrival
    pub name: String,
}

/// Persistent-mode session over a bus `B`.
pub struct Session<'s, B: UsbBus, P: PowerControl> {
    bus: B,
    power: P,
    settings: &'s Settings,
    state: SessionState,
    watched: HashMap<DeviceKey, WatchedDevice>,
    next_subscription: u64,
}

impl<'s, B: UsbBus, P: PowerControl> Session<'s, B, P> {
    /// Create an idle session.
    pub fn new(bus: B, power: P, settings: &'s Settings) -> Self {
        Self {
            bus,
            power,
            settings,
            state: SessionState::Idle,
            watched: HashMap::new(),
            next_subscription: 1,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Devices currently watched for removal.
    #[must_use]
    pub fn watched(&self) -> &HashMap<DeviceKey, WatchedDevice> {
        &self.watched
    }

    /// Start the session: handle every matching device that is already
    /// attached as if it had just arrived, then start accepting events.
    ///
    /// Arrival and power subscriptions must be in place before this is
    /// called so that nothing attached afterwards is missed.
    ///
    /// # Errors
    /// Returns an error if the bus cannot be enumerated.
    pub fn start(&mut self) -> UsbResult<()> {
        if self.state != SessionState::Idle {
            warn!(state = ?self.state, "Session already started");
            return Ok(());
        }
        let present = self.bus.matching_devices(self.settings.target)?;
        self.state = SessionState::Running;
        self.on_devices_arrived(present);
        if self.settings.verbose {
            info!("Starting run loop.");
        }
        Ok(())
    }

    /// Dispatch one event.
    pub fn handle(&mut self, event: SessionEvent<B::Device>) -> Disposition {
        if self.state != SessionState::Running {
            debug!(state = ?self.state, event = ?EventKind::of(&event), "Event ignored");
            return match self.state {
                SessionState::Terminating | SessionState::Exited => Disposition::Exit,
                SessionState::Idle | SessionState::Running => Disposition::Continue,
            };
        }

        match event {
            SessionEvent::DevicesArrived(devices) => self.on_devices_arrived(devices),
            SessionEvent::DeviceLeft(key) => self.on_device_left(key),
            SessionEvent::Power(power) => self.on_power(power),
            SessionEvent::Hangup => self.reactivate_all(),
            SessionEvent::Interrupt => {
                if self.settings.verbose {
                    info!("cm6206-enabler caught signal, exiting");
                }
                self.state = SessionState::Terminating;
                return Disposition::Exit;
            }
        }
        Disposition::Continue
    }

    /// Mark the session as finished and drop every removal subscription.
    pub fn exit(&mut self) {
        self.watched.clear();
        self.state = SessionState::Exited;
    }

    fn on_devices_arrived(&mut self, devices: Vec<B::Device>) {
        for device in devices {
            let key = device.key();
            info!(device = %key, "CM6206 device added.");

            let name = device.display_name();
            if self.settings.verbose {
                info!(device = %key, name = %name, "Device name");
            }

            let subscription = self.next_subscription;
            self.next_subscription += 1;
            if let Some(previous) = self.watched.insert(key, WatchedDevice { subscription, name }) {
                debug!(device = %key, subscription = previous.subscription, "Replaced stale removal subscription");
            }

            // Some third-party audio enhancers misbehave when the chip is
            // poked right after it enumerates.
            thread::sleep(self.settings.timing.settle_delay);

            if let Err(e) = activate_device(&device, self.settings) {
                debug!(device = %key, error = %e, "Arrival pass failed");
            }
        }
    }

    fn on_device_left(&mut self, key: DeviceKey) {
        let Some(record) = self.watched.remove(&key) else {
            debug!(device = %key, "Departure of an unwatched device ignored");
            return;
        };
        if self.settings.verbose {
            info!(device = %key, name = %record.name, subscription = record.subscription, "CM6206 device removed.");
        }
    }

    fn on_power(&mut self, event: PowerEvent) {
        match event {
            PowerEvent::PoweredOn => {
                if self.settings.verbose {
                    info!("Waking from sleep, re-activating any CM6206 devices...");
                }
                thread::sleep(self.settings.timing.wake_delay);
                self.reactivate_all();
            }
            PowerEvent::CanSleep | PowerEvent::WillSleep => {
                debug!(?event, "Allowing power change");
                self.power.allow_power_change();
            }
        }
    }

    fn reactivate_all(&mut self) {
        if let Err(e) = activate_all(&self.bus, self.settings) {
            error!(error = %e, "Unable to enumerate CM6206 devices");
        }
    }
}

/// Event name for diagnostics without requiring `D: Debug`.
#[derive(Debug)]
enum EventKind {
    DevicesArrived,
    DeviceLeft,
    Power,
    Hangup,
    Interrupt,
}

impl EventKind {
    fn of<D>(event: &SessionEvent<D>) -> Self {
        match event {
            SessionEvent::DevicesArrived(_) => Self::DevicesArrived,
            SessionEvent::DeviceLeft(_) => Self::DeviceLeft,
            SessionEvent::Power(_) => Self::Power,
            SessionEvent::Hangup => Self::Hangup,
            SessionEvent::Interrupt => Self::Interrupt,
        }
    }
}
