//! System power notifications from systemd-logind.
//!
//! logind announces suspend with `PrepareForSleep(true)` and resume with
//! `PrepareForSleep(false)`. Holding a delay inhibitor lock makes logind wait
//! until the lock is dropped, which is how a sleep is acknowledged.

use std::sync::Arc;

use anyhow::{Context, Result};
use cm6206_usb::{PowerControl, PowerEvent};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use zbus::Connection;
use zbus::zvariant::OwnedFd;

const LOGIND_DESTINATION: &str = "org.freedesktop.login1";
const LOGIND_PATH: &str = "/org/freedesktop/login1";
const LOGIND_MANAGER: &str = "org.freedesktop.login1.Manager";

type SleepLock = Arc<Mutex<Option<OwnedFd>>>;

/// Acknowledges sleep notifications by releasing the inhibitor lock.
#[derive(Debug)]
pub struct LogindPower {
    lock: SleepLock,
}

impl PowerControl for LogindPower {
    fn allow_power_change(&mut self) {
        if self.lock.lock().take().is_some() {
            debug!("Released sleep inhibitor lock");
        }
    }
}

/// Subscribe to logind sleep notifications.
///
/// Returns the acknowledgement handle and a receiver of power events. The
/// inhibitor lock is taken again after every resume.
pub async fn register_for_system_power() -> Result<(LogindPower, mpsc::Receiver<PowerEvent>)> {
    let connection = Connection::system().await.context("Failed to connect to the system bus")?;
    let manager = zbus::Proxy::new(&connection, LOGIND_DESTINATION, LOGIND_PATH, LOGIND_MANAGER)
        .await
        .context("Failed to create logind proxy")?;

    let mut signals = manager
        .receive_signal("PrepareForSleep")
        .await
        .context("Failed to subscribe to PrepareForSleep")?;
    let lock: SleepLock = Arc::new(Mutex::new(Some(take_sleep_lock(&manager).await?)));

    let (tx, rx) = mpsc::channel(8);
    let task_lock = Arc::clone(&lock);
    tokio::spawn(async move {
        while let Some(message) = signals.next().await {
            let going_to_sleep = match message.body().deserialize::<(bool,)>() {
                Ok((start,)) => start,
                Err(e) => {
                    warn!(error = %e, "Malformed PrepareForSleep signal");
                    continue;
                }
            };

            let event = if going_to_sleep {
                PowerEvent::WillSleep
            } else {
                match take_sleep_lock(&manager).await {
                    Ok(fd) => *task_lock.lock() = Some(fd),
                    Err(e) => warn!(error = %e, "Could not take sleep inhibitor lock"),
                }
                PowerEvent::PoweredOn
            };

            if tx.send(event).await.is_err() {
                break;
            }
        }
        debug!("logind signal stream ended");
    });

    Ok((LogindPower { lock }, rx))
}

async fn take_sleep_lock(manager: &zbus::Proxy<'_>) -> Result<OwnedFd> {
    manager
        .call("Inhibit", &("sleep", "cm6206-enabler", "Re-activating CM6206 outputs", "delay"))
        .await
        .context("logind refused the sleep inhibitor lock")
}
