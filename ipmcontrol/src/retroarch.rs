//! Starts or stops the RetroArch emulator.

use std::process::{Child, Command};

use ipmconfig::Config;
use ipmutils::{find_processes, kill_processes};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::errors::LauncherError;

const PROCESS_NAME: &str = "retroarch";

pub struct RetroArchLauncher {
    command: String,
    child: Mutex<Option<Child>>,
}

impl RetroArchLauncher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            child: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.get_retroarch_command())
    }

    /// `true` when a child we launched is alive or a `retroarch` process runs.
    pub fn is_running(&self) -> bool {
        let mut child = self.child.lock();
        if let Some(process) = child.as_mut() {
            match process.try_wait() {
                Ok(None) => return true,
                _ => *child = None,
            }
        }
        !find_processes(PROCESS_NAME).is_empty()
    }

    fn launch(&self) -> Result<Child, LauncherError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or(LauncherError::EmptyCommand)?;

        Command::new(program)
            .args(parts)
            .env("MESA_GL_VERSION_OVERRIDE", "3.3")
            .spawn()
            .map_err(|e| LauncherError::Spawn(self.command.clone(), e))
    }

    /// Kills a running emulator, or launches one. Returns the new state.
    ///
    /// A failed launch is logged and reports `false`.
    pub fn toggle(&self) -> bool {
        if self.is_running() {
            info!("RetroArch already open. Trying to close it.");
            let killed = kill_processes(PROCESS_NAME);
            if let Some(mut child) = self.child.lock().take() {
                let _ = child.kill();
                let _ = child.wait();
            }
            info!(killed, "RetroArch stopped");
            return false;
        }

        info!("Launching RetroArch: {}", self.command);
        match self.launch() {
            Ok(child) => {
                *self.child.lock() = Some(child);
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }
}
