//! External command run on every session state change

use crate::error::{Error, Result};
use crate::SessionState;
use std::process::{Command, Stdio};
use tracing::debug;

/// Environment variable carrying the new state to the hook command
pub const STATE_ENV: &str = "POMO_STATE";

/// Told about every transition the runner makes. Failures are reported
/// back but the runner never stops because of them.
pub trait StateHook: Send + Sync {
    fn on_state_change(&self, state: SessionState) -> Result<()>;
}

/// Runs the configured `on_event` command, e.g. `["notify-send", "pomo"]`
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: String,
    args: Vec<String>,
}

impl CommandHook {
    /// `None` when no command is configured.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
        })
    }
}

impl StateHook for CommandHook {
    fn on_state_change(&self, state: SessionState) -> Result<()> {
        debug!("Running hook {} for {}", self.program, state);
        let status = Command::new(&self.program)
            .args(&self.args)
            .env(STATE_ENV, state.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Hook(format!("failed to run {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(Error::Hook(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}
