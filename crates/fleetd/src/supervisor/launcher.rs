//! Starting tier executables.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::unistd::Pid;

use fleet_core::{FleetConfig, Slot};

use super::SupervisorError;

pub struct Launcher {
    bin_dir: PathBuf,
    env: Vec<(&'static str, String)>,
}

impl Launcher {
    pub fn new(bin_dir: impl Into<PathBuf>, env: Vec<(&'static str, String)>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            env,
        }
    }

    /// Tier executables live in `supervisor.bin_dir`, or next to the
    /// running `fleetd` when that is empty.
    pub fn from_config(config: &FleetConfig) -> Result<Self, SupervisorError> {
        let bin_dir = if config.supervisor.bin_dir.as_os_str().is_empty() {
            let exe = std::env::current_exe().map_err(SupervisorError::BinDir)?;
            exe.parent().map(Path::to_path_buf).ok_or_else(|| {
                SupervisorError::BinDir(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} has no parent directory", exe.display()),
                ))
            })?
        } else {
            config.supervisor.bin_dir.clone()
        };
        Ok(Self::new(bin_dir, config.child_env()))
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn program_path(&self, slot: Slot) -> PathBuf {
        self.bin_dir.join(slot.role.program())
    }

    /// The command for `slot`, ready to spawn.
    ///
    /// Children get their own process group so a terminal Ctrl-C or Ctrl-Z
    /// reaches only the supervisor, and they inherit the resolved config
    /// through the environment.
    pub fn command(&self, slot: Slot) -> Command {
        let mut cmd = Command::new(self.program_path(slot));
        if slot.role.takes_index() {
            cmd.arg(slot.index.to_string());
        }
        cmd.envs(self.env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .process_group(0);
        cmd
    }

    /// Spawn `slot` and return its pid. The child is reaped by the
    /// supervisor's control loop, never through the `Child` handle.
    pub fn spawn(&self, slot: Slot) -> Result<Pid, SupervisorError> {
        let child = self
            .command(slot)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                slot,
                program: self.program_path(slot),
                source,
            })?;
        Ok(Pid::from_raw(child.id() as i32))
    }
}
