//! cm6206-enabler - activates sound outputs on CM6206 USB audio devices.
//!
//! In one-shot mode every CM6206 present is activated once. In daemon mode
//! the process keeps running and re-activates devices as they are attached
//! and after the system wakes from sleep.

use anyhow::{Context, Result, anyhow};
use cm6206_core::{RunMode, Settings};
use cm6206_usb::{Disposition, HotplugEvent, HotplugMonitor, RusbBus, Session, SessionEvent, activate_all};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod power;
mod service;
mod signals;

use cli::Cli;
use config::{ConfigSource, DaemonConfig};
use signals::SignalEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, ignored) = Cli::parse_lenient(std::env::args());
    if cli.version {
        println!("cm6206-enabler version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if !cli.reads_config() {
        init_logging(&DaemonConfig::default().log_level)?;
        report_ignored(&ignored);
        return cli.command.map_or(Ok(()), service::run);
    }

    let (config, source) = config::load_config()?;
    init_logging(&config.daemon.log_level)?;

    match &source {
        ConfigSource::File(path) => debug!(?path, "Configuration loaded"),
        ConfigSource::Defaults(path) => debug!(?path, "Config file not found, using defaults"),
    }
    report_ignored(&ignored);

    let settings = Settings::new(cli.mode(), cli.verbose(), config.timing.to_timing())?;
    match settings.mode {
        RunMode::OneShot => run_once(&settings),
        RunMode::Persistent => run_persistent(&settings).await,
    }
}

fn report_ignored(ignored: &[String]) {
    for arg in ignored {
        warn!("Ignoring unknown argument `{arg}'");
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.parse().with_context(|| format!("invalid log level `{level}'"))?)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

/// Activate every device present and return.
fn run_once(settings: &Settings) -> Result<()> {
    let bus = RusbBus::new().context("Could not create main bus port")?;
    tokio::task::block_in_place(|| activate_all(&bus, settings))
        .context("Could not enumerate USB devices")?;
    Ok(())
}

/// Watch for arrivals, wake-ups and signals until interrupted.
///
/// Only returns on a setup failure or if every event source closes. A
/// termination signal exits the process directly.
async fn run_persistent(settings: &Settings) -> Result<()> {
    let bus = RusbBus::new().context("Could not create main bus port")?;

    let (hotplug_tx, mut hotplug_rx) = mpsc::unbounded_channel();
    let mut monitor = HotplugMonitor::spawn(bus.context().clone(), settings.target, hotplug_tx)
        .context("Could not register for device notifications")?;
    let (power, mut power_rx) = power::register_for_system_power()
        .await
        .context("Could not register for system power notifications")?;
    let mut signal_rx = signals::setup_signal_handlers()?;

    let mut session = Session::new(bus, power, settings);
    tokio::task::block_in_place(|| session.start()).context("Could not enumerate USB devices")?;

    loop {
        let event = tokio::select! {
            Some(event) = hotplug_rx.recv() => match event {
                HotplugEvent::Arrived(device) => SessionEvent::DevicesArrived(vec![device]),
                HotplugEvent::Left(key) => SessionEvent::DeviceLeft(key),
            },
            Some(event) = power_rx.recv() => SessionEvent::Power(event),
            Some(signal) = signal_rx.recv() => match signal {
                SignalEvent::Interrupt => SessionEvent::Interrupt,
                SignalEvent::Hangup => SessionEvent::Hangup,
            },
            else => break,
        };

        if tokio::task::block_in_place(|| session.handle(event)) == Disposition::Exit {
            session.exit();
            monitor.shutdown();
            debug!("Exiting");
            std::process::exit(0);
        }
    }

    monitor.shutdown();
    error!("Unexpectedly back from the event loop");
    Err(anyhow!("event loop ended without a termination signal"))
}
