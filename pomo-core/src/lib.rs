//! Core of pomo: tasks, the interval store and the session runner
//!
//! A task asks for a number of fixed-length work intervals. The runner
//! times them one after another in a background tokio task, pausing and
//! breaking on request, and appends every finished interval to the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod hook;
pub mod notifier;
pub mod runner;
pub mod store;
pub mod task;

pub use config::Config;
pub use error::{Error, Result};
pub use hook::{CommandHook, StateHook};
pub use notifier::{DesktopNotifier, NoopNotifier, Notifier};
pub use runner::{Progress, RunnerHandle, TaskRunner};
pub use store::{IntervalStore, SqliteStore};
pub use task::{Pomodoro, Tags, Task, TaskFilter};

/// Lifecycle of one task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    Created,
    Running,
    Paused,
    Breaking,
    Complete,
}

impl SessionState {
    /// Canonical name, as handed to the `on_event` hook
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "CREATED",
            SessionState::Running => "RUNNING",
            SessionState::Paused => "PAUSED",
            SessionState::Breaking => "BREAKING",
            SessionState::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub state: SessionState,
    pub count: u32,
    pub n_pomodoros: u32,
    /// Time left in the current interval, whole seconds
    pub remaining: Duration,
    /// Time since the current pause began, zero unless paused
    pub pause_duration: Duration,
}

/// Drops the sub-second part, the resolution status is reported at.
pub(crate) fn truncate_secs(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs())
}
