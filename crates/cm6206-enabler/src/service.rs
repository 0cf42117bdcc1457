//! Auto-start installation as a systemd unit.
//!
//! The agent variant is a user unit started on login. The daemon variant is a
//! system unit started on boot and needs root.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use directories::BaseDirs;
use tracing::{debug, warn};

use crate::cli::ServiceCommand;

/// Unit file name used for both scopes.
pub const UNIT_NAME: &str = "cm6206-enabler.service";

const SYSTEM_UNIT_DIR: &str = "/etc/systemd/system";
const INSTALL_DIR: &str = "/usr/local/libexec/cm6206-enabler";
const INSTALLED_BINARY: &str = "/usr/local/libexec/cm6206-enabler/cm6206-enabler";

/// Which systemd instance manages the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    System,
}

impl Scope {
    fn wanted_by(self) -> &'static str {
        match self {
            Self::User => "default.target",
            Self::System => "multi-user.target",
        }
    }

    fn systemctl_args(self) -> &'static [&'static str] {
        match self {
            Self::User => &["--user"],
            Self::System => &[],
        }
    }
}

/// Run one service command.
pub fn run(command: ServiceCommand) -> Result<()> {
    match command {
        ServiceCommand::InstallAgent => install_agent(),
        ServiceCommand::UninstallAgent => uninstall_agent(),
        ServiceCommand::InstallDaemon => install_daemon(),
        ServiceCommand::UninstallDaemon => uninstall_daemon(),
    }
}

/// Render the unit file that starts `exec` in daemon mode.
#[must_use]
pub fn render_unit(exec: &Path, scope: Scope) -> String {
    format!(
        "[Unit]\n\
         Description=Activate CM6206 USB audio outputs\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={} -d\n\
         Restart=always\n\
         \n\
         [Install]\n\
         WantedBy={}\n",
        exec.display(),
        scope.wanted_by()
    )
}

/// Install and start the user unit.
pub fn install_agent() -> Result<()> {
    let exec = current_exe()?;
    let unit_path = write_unit(&user_unit_dir()?, &render_unit(&exec, Scope::User))?;

    if enable(Scope::User) {
        println!("✓ Successfully installed as systemd user service");
        println!("  Unit: {}", unit_path.display());
        println!("  The service will start automatically on login.");
    } else {
        eprintln!("Warning: unit created but systemctl failed");
        println!("You may need to enable it manually:");
        println!("  systemctl --user enable --now {UNIT_NAME}");
    }
    Ok(())
}

/// Stop and remove the user unit.
pub fn uninstall_agent() -> Result<()> {
    disable(Scope::User);
    let unit_path = user_unit_dir()?.join(UNIT_NAME);
    if !remove_unit(&unit_path)? {
        bail!("could not find {}; the user service may not be installed", unit_path.display());
    }
    reload(Scope::User);
    println!("✓ Successfully uninstalled systemd user service");
    Ok(())
}

/// Copy the binary to a fixed location, then install and start the system unit.
pub fn install_daemon() -> Result<()> {
    require_root("install-daemon")?;

    let exec = current_exe()?;
    fs::create_dir_all(INSTALL_DIR).with_context(|| format!("failed to create {INSTALL_DIR}"))?;
    fs::copy(&exec, INSTALLED_BINARY)
        .with_context(|| format!("failed to copy binary to {INSTALLED_BINARY}"))?;
    fs::set_permissions(INSTALLED_BINARY, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to make {INSTALLED_BINARY} executable"))?;

    let unit_path =
        write_unit(Path::new(SYSTEM_UNIT_DIR), &render_unit(Path::new(INSTALLED_BINARY), Scope::System))?;

    if enable(Scope::System) {
        println!("✓ Successfully installed as systemd system service");
        println!("  Binary: {INSTALLED_BINARY}");
        println!("  Unit: {}", unit_path.display());
        println!("  The service will start automatically on boot.");
    } else {
        eprintln!("Warning: unit created but systemctl failed");
        println!("You may need to enable it manually:");
        println!("  sudo systemctl enable --now {UNIT_NAME}");
    }
    Ok(())
}

/// Stop and remove the system unit and the installed binary.
pub fn uninstall_daemon() -> Result<()> {
    require_root("uninstall-daemon")?;

    disable(Scope::System);
    let unit_path = Path::new(SYSTEM_UNIT_DIR).join(UNIT_NAME);
    if remove_unit(&unit_path)? {
        println!("✓ Removed unit: {}", unit_path.display());
    } else {
        eprintln!("Warning: could not remove {} (may not exist)", unit_path.display());
    }
    reload(Scope::System);

    match fs::remove_file(INSTALLED_BINARY) {
        Ok(()) => println!("✓ Removed binary: {INSTALLED_BINARY}"),
        Err(e) => eprintln!("Warning: could not remove {INSTALLED_BINARY} ({e})"),
    }

    println!("✓ Successfully uninstalled systemd system service");
    Ok(())
}

/// Write the unit file into `dir`, creating it if needed.
fn write_unit(dir: &Path, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(UNIT_NAME);
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644))
        .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    Ok(path)
}

/// Remove a unit file. Returns whether there was one.
fn remove_unit(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

fn user_unit_dir() -> Result<PathBuf> {
    let dirs = BaseDirs::new().context("Could not determine home directory")?;
    Ok(dirs.config_dir().join("systemd/user"))
}

fn current_exe() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to get executable path")?;
    Ok(exe.canonicalize().unwrap_or(exe))
}

#[allow(unsafe_code)] // libc::geteuid() is safe to call
fn require_root(command: &str) -> Result<()> {
    if unsafe { libc::geteuid() } != 0 {
        bail!("{command} requires root privileges; run it with sudo");
    }
    Ok(())
}

fn enable(scope: Scope) -> bool {
    reload(scope) && systemctl(scope, &["enable", "--now", UNIT_NAME])
}

fn disable(scope: Scope) {
    systemctl(scope, &["disable", "--now", UNIT_NAME]);
}

fn reload(scope: Scope) -> bool {
    systemctl(scope, &["daemon-reload"])
}

fn systemctl(scope: Scope, args: &[&str]) -> bool {
    let output = Command::new("systemctl").args(scope.systemctl_args()).args(args).output();
    match output {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(?args, status = %output.status, stderr = %stderr.trim(), "systemctl failed");
            false
        }
        Err(e) => {
            warn!(error = %e, "Could not run systemctl");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_user_unit() {
        let unit = render_unit(Path::new("/home/me/bin/cm6206-enabler"), Scope::User);
        assert!(unit.contains("ExecStart=/home/me/bin/cm6206-enabler -d\n"));
        assert!(unit.contains("Restart=always\n"));
        assert!(unit.contains("WantedBy=default.target\n"));
        assert!(unit.starts_with("[Unit]\n"));
    }

    #[test]
    fn test_render_system_unit() {
        let unit = render_unit(Path::new(INSTALLED_BINARY), Scope::System);
        assert!(unit.contains(&format!("ExecStart={INSTALLED_BINARY} -d\n")));
        assert!(unit.contains("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn test_write_and_remove_unit() {
        let dir = tempfile::tempdir().unwrap();
        let unit_dir = dir.path().join("systemd/user");
        let contents = render_unit(Path::new("/usr/bin/cm6206-enabler"), Scope::User);

        let path = write_unit(&unit_dir, &contents).unwrap();
        assert_eq!(path, unit_dir.join(UNIT_NAME));
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);

        assert!(remove_unit(&path).unwrap());
        assert!(!path.exists());
        assert!(!remove_unit(&path).unwrap());
    }

    #[test]
    fn test_rewrite_replaces_existing_unit() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(dir.path(), "old").unwrap();
        let path = write_unit(dir.path(), "new").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "new");
    }
}
