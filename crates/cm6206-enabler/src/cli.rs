//! Command-line surface.
//!
//! Unknown arguments never stop the program: they are split off before clap
//! sees the command line and reported once logging is up.

use clap::{Parser, Subcommand};
use cm6206_core::RunMode;

/// Activates sound outputs on CM6206 USB devices.
#[derive(Debug, Parser)]
#[command(name = "cm6206-enabler", disable_version_flag = true, args_override_self = true)]
pub struct Cli {
    /// Silent mode (default in daemon mode)
    #[arg(short = 's', global = true)]
    pub silent: bool,

    /// Verbose mode (default in non-daemon mode)
    #[arg(short = 'v', global = true)]
    pub verbose: bool,

    /// Daemon mode: keep running and activate any device that is connected,
    /// or all devices upon wake-from-sleep
    #[arg(short = 'd', global = true)]
    pub daemon: bool,

    /// Print version number and exit
    #[arg(short = 'V', global = true)]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<ServiceCommand>,
}

/// Auto-start service management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ServiceCommand {
    /// Install as systemd user service (starts on login, no root required)
    InstallAgent,
    /// Uninstall the systemd user service
    UninstallAgent,
    /// Install as systemd system service (starts on boot, requires root)
    InstallDaemon,
    /// Uninstall the systemd system service
    UninstallDaemon,
}

const FLAGS: &[&str] = &["-s", "-v", "-d", "-V", "-h", "--help"];
const COMMANDS: &[&str] = &["install-agent", "uninstall-agent", "install-daemon", "uninstall-daemon"];

impl Cli {
    /// Parse `args` (program name first), returning the ignored arguments too.
    ///
    /// Only the first service command is honoured; later ones are ignored.
    pub fn parse_lenient<I>(args: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let program = args.next().unwrap_or_else(|| "cm6206-enabler".to_string());

        let mut known = vec![program];
        let mut ignored = Vec::new();
        let mut have_command = false;
        for arg in args {
            if FLAGS.contains(&arg.as_str()) {
                known.push(arg);
            } else if COMMANDS.contains(&arg.as_str()) && !have_command {
                have_command = true;
                known.push(arg);
            } else {
                ignored.push(arg);
            }
        }

        (Self::parse_from(known), ignored)
    }

    /// Run mode requested on the command line.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        if self.daemon { RunMode::Persistent } else { RunMode::OneShot }
    }

    /// Whether this run reads the config file. Service commands never do.
    #[must_use]
    pub fn reads_config(&self) -> bool {
        self.command.is_none()
    }

    /// Resolved verbosity: `-s` wins over `-v`, and without either the
    /// program is verbose unless it runs as a daemon.
    #[must_use]
    pub fn verbose(&self) -> bool {
        if self.silent {
            false
        } else {
            self.verbose || !self.daemon
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Cli, Vec<String>) {
        let args = std::iter::once("cm6206-enabler").chain(args.iter().copied()).map(String::from);
        Cli::parse_lenient(args)
    }

    #[test]
    fn test_defaults_are_one_shot_and_verbose() {
        let (cli, ignored) = parse(&[]);
        assert_eq!(cli.mode(), RunMode::OneShot);
        assert!(cli.verbose());
        assert!(cli.command.is_none());
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_daemon_defaults_to_silent() {
        let (cli, _) = parse(&["-d"]);
        assert_eq!(cli.mode(), RunMode::Persistent);
        assert!(!cli.verbose());

        let (cli, _) = parse(&["-d", "-v"]);
        assert!(cli.verbose());
    }

    #[test]
    fn test_silent_wins() {
        let (cli, _) = parse(&["-v", "-s"]);
        assert!(!cli.verbose());
    }

    #[test]
    fn test_repeated_flags_are_accepted() {
        let (cli, ignored) = parse(&["-v", "-v"]);
        assert!(cli.verbose());
        assert!(ignored.is_empty());

        let (cli, _) = parse(&["-d", "-d"]);
        assert_eq!(cli.mode(), RunMode::Persistent);

        let (cli, _) = parse(&["-s", "-v", "-s"]);
        assert!(!cli.verbose());
    }

    #[test]
    fn test_unknown_arguments_are_ignored() {
        let (cli, ignored) = parse(&["--frobnicate", "-d", "extra"]);
        assert!(cli.daemon);
        assert_eq!(ignored, vec!["--frobnicate".to_string(), "extra".to_string()]);
    }

    #[test]
    fn test_service_commands() {
        let (cli, _) = parse(&["install-agent"]);
        assert_eq!(cli.command, Some(ServiceCommand::InstallAgent));

        let (cli, ignored) = parse(&["-v", "uninstall-daemon", "install-daemon"]);
        assert_eq!(cli.command, Some(ServiceCommand::UninstallDaemon));
        assert_eq!(ignored, vec!["install-daemon".to_string()]);
    }

    #[test]
    fn test_service_commands_skip_config() {
        let (cli, _) = parse(&["uninstall-agent"]);
        assert!(!cli.reads_config());

        let (cli, _) = parse(&["-d"]);
        assert!(cli.reads_config());
    }

    #[test]
    fn test_version_flag() {
        let (cli, _) = parse(&["-V"]);
        assert!(cli.version);
    }
}
