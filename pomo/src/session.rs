//! Foreground controller for one running task
//!
//! Relays stdin lines into the runner and prints a line per transition.

use anyhow::{Context, Result};
use pomo_core::config::Config;
use pomo_core::{
    CommandHook, DesktopNotifier, NoopNotifier, Notifier, RunnerHandle, SessionState,
    SqliteStore, StateHook, Status, Task, TaskRunner,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::info;

pub async fn run(task: Task, store: Arc<SqliteStore>, config: &Config) -> Result<()> {
    let notifier: Arc<dyn Notifier> = if config.notifications {
        Arc::new(DesktopNotifier::new(config.icon_path.clone()))
    } else {
        Arc::new(NoopNotifier)
    };
    let hook = CommandHook::from_argv(config.on_event.clone())
        .map(|hook| Arc::new(hook) as Arc<dyn StateHook>);

    let runner = TaskRunner::new(&task, store, notifier, hook)
        .with_context(|| format!("Cannot run task {}", task.id))?;
    let (handle, join) = runner.start();
    info!("Session started for task {}", task.id);

    println!("[{}] {}", task.id, task.message);
    println!("p: pause/resume  enter: end break  s: status");

    drive(handle, join, BufReader::new(tokio::io::stdin())).await
}

/// Relays `input` lines into the session until it ends. Once `input` is
/// exhausted the controls are released, so a session that then needs a
/// pause or break answered fails with `ControlClosed` instead of hanging.
async fn drive<R>(
    handle: RunnerHandle,
    mut join: JoinHandle<pomo_core::Result<()>>,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut progress = handle.subscribe();
    let mut handle = Some(handle);
    let mut last_state = SessionState::Created;
    let mut watching = true;
    let mut lines = input.lines();

    loop {
        tokio::select! {
            result = &mut join => {
                let outcome = result.context("Session task panicked")?;
                print_status(&progress.borrow().status());
                return outcome.context("Session ended early");
            }
            changed = progress.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let status = progress.borrow_and_update().status();
                if status.state != last_state {
                    last_state = status.state;
                    print_status(&status);
                }
            }
            line = lines.next_line(), if handle.is_some() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if let Some(handle) = &handle {
                            handle_input(handle, line.trim()).await;
                        }
                    }
                    None => {
                        info!("Input closed, releasing session controls");
                        handle = None;
                    }
                }
            }
        }
    }
}

async fn handle_input(handle: &RunnerHandle, input: &str) {
    match input {
        "p" => handle.pause().await,
        "" => match handle.status().state {
            SessionState::Breaking => handle.resume_break().await,
            SessionState::Paused => handle.resume().await,
            _ => {}
        },
        "s" => print_status(&handle.status()),
        _ => {}
    }
}

fn print_status(status: &Status) {
    let secs = status.remaining.as_secs();
    let mut line = format!(
        "{} {}/{} {:02}:{:02}",
        status.state,
        status.count,
        status.n_pomodoros,
        secs / 60,
        secs % 60
    );
    if status.state == SessionState::Paused {
        line.push_str(&format!(" (paused {}s)", status.pause_duration.as_secs()));
    }
    println!("{}", line);
}
