//! Session runner
//!
//! Drives one task through its intervals in a background tokio task:
//!
//! ```text
//! Created -> Running <-> Paused
//!               |
//!               +-> Breaking -> Running ...
//!               +-> Complete
//! ```
//!
//! Control requests reach the loop over two bounded channels (pause and
//! break toggle). The loop selects on whichever of the interval timer and
//! the two channels is ready first; a signal that means nothing in the
//! current state is read and dropped so it can't fire later, and both
//! channels are emptied before every new phase is published. Progress is
//! published on a watch channel, so status reads never wait on the loop.
//!
//! The store append, the hook and the notification are blocking calls; they
//! run on tokio's blocking pool and the loop awaits each one in place.

use crate::error::{Error, Result};
use crate::hook::StateHook;
use crate::notifier::Notifier;
use crate::store::IntervalStore;
use crate::task::{Pomodoro, Task};
use crate::{truncate_secs, SessionState, Status};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

const NOTIFY_TITLE: &str = "Pomo";
const BREAK_MESSAGE: &str = "It is time to take a break!";
const COMPLETE_MESSAGE: &str = "Pomo session has completed!";

/// Runner state together with the data that only makes sense in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    /// Timer armed at `since` for `duration`
    Running { since: Instant, duration: Duration },
    /// `remaining` is what the timer had left when the pause began at `since`
    Paused { remaining: Duration, since: Instant },
    Breaking,
    Complete,
}

impl Phase {
    pub fn state(&self) -> SessionState {
        match self {
            Phase::Created => SessionState::Created,
            Phase::Running { .. } => SessionState::Running,
            Phase::Paused { .. } => SessionState::Paused,
            Phase::Breaking => SessionState::Breaking,
            Phase::Complete => SessionState::Complete,
        }
    }
}

/// Published by the loop after every transition and every stored interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    /// Intervals durably stored so far
    pub count: u32,
    pub n_pomodoros: u32,
    /// Configured interval length
    pub duration: Duration,
}

impl Progress {
    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    pub fn time_remaining(&self) -> Duration {
        self.time_remaining_at(Instant::now())
    }

    fn time_remaining_at(&self, now: Instant) -> Duration {
        let remaining = match self.phase {
            Phase::Created => self.duration,
            Phase::Running { since, duration } => {
                duration.saturating_sub(now.saturating_duration_since(since))
            }
            Phase::Paused { remaining, .. } => remaining,
            Phase::Breaking | Phase::Complete => Duration::ZERO,
        };
        truncate_secs(remaining)
    }

    pub fn status(&self) -> Status {
        let now = Instant::now();
        let pause_duration = match self.phase {
            Phase::Paused { since, .. } => truncate_secs(now.saturating_duration_since(since)),
            _ => Duration::ZERO,
        };
        Status {
            state: self.state(),
            count: self.count,
            n_pomodoros: self.n_pomodoros,
            remaining: self.time_remaining_at(now),
            pause_duration,
        }
    }
}

/// A session that has not been started yet
pub struct TaskRunner {
    run_loop: RunLoop,
    control: Control,
}

impl TaskRunner {
    /// Resumes from the intervals already recorded on `task`. Fails when
    /// the task has a zero duration or more intervals than it asks for.
    pub fn new(
        task: &Task,
        store: Arc<dyn IntervalStore>,
        notifier: Arc<dyn Notifier>,
        hook: Option<Arc<dyn StateHook>>,
    ) -> Result<Self> {
        task.validate()?;

        let (pause_tx, pause_rx) = mpsc::channel(1);
        let (toggle_tx, toggle_rx) = mpsc::channel(1);
        let (progress_tx, progress_rx) = watch::channel(Progress {
            phase: Phase::Created,
            count: task.completed(),
            n_pomodoros: task.n_pomodoros,
            duration: task.duration,
        });

        Ok(Self {
            run_loop: RunLoop {
                task_id: task.id,
                duration: task.duration,
                n_pomodoros: task.n_pomodoros,
                count: task.completed(),
                store,
                notifier,
                hook,
                pause_rx,
                toggle_rx,
                progress: progress_tx,
            },
            control: Control {
                pause_tx,
                toggle_tx,
                guard: Mutex::new(()),
                progress: progress_rx,
            },
        })
    }

    /// Spawns the session loop on the current tokio runtime and returns at
    /// once. The join handle yields the loop's result: Ok once the session
    /// is complete, or the store error that ended it early.
    pub fn start(self) -> (RunnerHandle, JoinHandle<Result<()>>) {
        let join = tokio::spawn(self.run_loop.run());
        let handle = RunnerHandle {
            control: Arc::new(self.control),
        };
        (handle, join)
    }
}

/// Controller side of a started session. Clones share one send guard.
#[derive(Clone)]
pub struct RunnerHandle {
    control: Arc<Control>,
}

struct Control {
    pause_tx: mpsc::Sender<()>,
    toggle_tx: mpsc::Sender<()>,
    guard: Mutex<()>,
    progress: watch::Receiver<Progress>,
}

impl Control {
    fn state(&self) -> SessionState {
        self.progress.borrow().state()
    }

    /// Delivers one signal, then waits until the loop has left `observed`.
    async fn signal(&self, tx: &mpsc::Sender<()>, observed: SessionState) {
        if tx.send(()).await.is_err() {
            debug!("Session loop has exited, dropping request");
            return;
        }
        let mut progress = self.progress.clone();
        let _ = progress.wait_for(|p| p.state() != observed).await;
    }
}

impl RunnerHandle {
    /// Pauses a running interval or resumes a paused one. Does nothing in
    /// any other state.
    pub async fn pause(&self) {
        let _guard = self.control.guard.lock().await;
        match self.control.state() {
            state @ (SessionState::Running | SessionState::Paused) => {
                self.control.signal(&self.control.pause_tx, state).await
            }
            state => debug!("Ignoring pause request while {}", state),
        }
    }

    /// Resumes a paused interval. Does nothing unless paused.
    pub async fn resume(&self) {
        let _guard = self.control.guard.lock().await;
        match self.control.state() {
            SessionState::Paused => {
                self.control
                    .signal(&self.control.pause_tx, SessionState::Paused)
                    .await
            }
            state => debug!("Ignoring resume request while {}", state),
        }
    }

    /// Ends the current break and starts the next interval. Does nothing
    /// unless breaking.
    pub async fn resume_break(&self) {
        let _guard = self.control.guard.lock().await;
        match self.control.state() {
            SessionState::Breaking => {
                self.control
                    .signal(&self.control.toggle_tx, SessionState::Breaking)
                    .await
            }
            state => debug!("Ignoring break toggle while {}", state),
        }
    }

    pub fn status(&self) -> Status {
        self.progress().status()
    }

    pub fn time_remaining(&self) -> Duration {
        self.progress().time_remaining()
    }

    pub fn progress(&self) -> Progress {
        *self.control.progress.borrow()
    }

    /// Change feed for callers that want to react to transitions.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.control.progress.clone()
    }
}

struct RunLoop {
    task_id: i64,
    duration: Duration,
    n_pomodoros: u32,
    count: u32,
    store: Arc<dyn IntervalStore>,
    notifier: Arc<dyn Notifier>,
    hook: Option<Arc<dyn StateHook>>,
    pause_rx: mpsc::Receiver<()>,
    toggle_rx: mpsc::Receiver<()>,
    progress: watch::Sender<Progress>,
}

impl RunLoop {
    async fn run(mut self) -> Result<()> {
        info!(
            "Starting task {} at {}/{} intervals of {:?}",
            self.task_id, self.count, self.n_pomodoros, self.duration
        );

        while self.count < self.n_pomodoros {
            self.run_interval().await?;
            if self.count == self.n_pomodoros {
                break;
            }

            self.transition(Phase::Breaking).await;
            self.notify(BREAK_MESSAGE).await;
            self.wait_for_break_end().await?;
        }

        self.notify(COMPLETE_MESSAGE).await;
        self.transition(Phase::Complete).await;
        info!("Task {} complete", self.task_id);
        Ok(())
    }

    /// Times one interval to its end, then stores it.
    async fn run_interval(&mut self) -> Result<()> {
        let started_at = Local::now();
        let mut since = Instant::now();
        // every interval starts from the configured length, whatever a
        // pause did to the previous one
        let mut armed = self.duration;
        self.transition(Phase::Running {
            since,
            duration: armed,
        })
        .await;

        let timer = time::sleep_until(since + armed);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                () = &mut timer => break,
                Some(()) = self.toggle_rx.recv() => {
                    debug!("Ignoring break toggle while running");
                }
                Some(()) = self.pause_rx.recv() => {
                    let paused_at = Instant::now();
                    let elapsed = paused_at.saturating_duration_since(since);
                    let remaining = armed.saturating_sub(elapsed);
                    self.transition(Phase::Paused {
                        remaining,
                        since: paused_at,
                    })
                    .await;

                    self.wait_for_resume().await?;

                    since = Instant::now();
                    armed = remaining;
                    timer.as_mut().reset(since + armed);
                    self.transition(Phase::Running {
                        since,
                        duration: armed,
                    })
                    .await;
                }
            }
        }

        let pomodoro = Pomodoro::new(started_at, Local::now());
        let store = self.store.clone();
        let task_id = self.task_id;
        let appended = blocking(move || store.append_interval(task_id, &pomodoro)).await;
        if let Err(e) = appended {
            error!("Failed to store interval for task {}: {}", self.task_id, e);
            return Err(e);
        }
        self.count += 1;
        let count = self.count;
        self.progress.send_modify(|p| p.count = count);
        info!(
            "Stored interval {}/{} for task {}",
            self.count, self.n_pomodoros, self.task_id
        );
        Ok(())
    }

    async fn wait_for_resume(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                Some(()) = self.pause_rx.recv() => return Ok(()),
                Some(()) = self.toggle_rx.recv() => {
                    debug!("Ignoring break toggle while paused");
                }
                else => return Err(Error::ControlClosed),
            }
        }
    }

    async fn wait_for_break_end(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                Some(()) = self.toggle_rx.recv() => return Ok(()),
                Some(()) = self.pause_rx.recv() => {
                    debug!("Ignoring pause request while breaking");
                }
                else => return Err(Error::ControlClosed),
            }
        }
    }

    /// Publishes the new phase, then runs the hook before going on.
    ///
    /// Whatever is still queued on the control channels was sent against the
    /// phase being left, so it is dropped first. That includes a pause that
    /// lost the race with the timer; its caller returns once the new phase
    /// is published.
    async fn transition(&mut self, phase: Phase) {
        self.drain_signals();
        let count = self.count;
        self.progress.send_modify(|p| {
            p.phase = phase;
            p.count = count;
        });
        let state = phase.state();
        info!("Task {} is {}", self.task_id, state);

        if let Some(hook) = self.hook.clone() {
            if let Err(e) = blocking(move || hook.on_state_change(state)).await {
                warn!("on_event hook failed for {}: {}", state, e);
            }
        }
    }

    fn drain_signals(&mut self) {
        while self.pause_rx.try_recv().is_ok() {
            debug!("Dropping stale pause request");
        }
        while self.toggle_rx.try_recv().is_ok() {
            debug!("Dropping stale break toggle");
        }
    }

    async fn notify(&self, body: &'static str) {
        let notifier = self.notifier.clone();
        if let Err(e) = blocking(move || notifier.notify(NOTIFY_TITLE, body)).await {
            warn!("Failed to send notification: {}", e);
        }
    }
}

/// Runs `f` on the blocking pool and waits for it.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Tags;
    use std::sync::Mutex as StdMutex;

    const MINUTE: Duration = Duration::from_secs(60);

    #[derive(Default)]
    struct RecordingStore {
        appended: StdMutex<Vec<(i64, Pomodoro)>>,
        attempts: StdMutex<u32>,
        fail: bool,
    }

    impl RecordingStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn appended(&self) -> Vec<(i64, Pomodoro)> {
            self.appended.lock().unwrap().clone()
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    impl IntervalStore for RecordingStore {
        fn append_interval(&self, task_id: i64, pomodoro: &Pomodoro) -> Result<()> {
            *self.attempts.lock().unwrap() += 1;
            if self.fail {
                return Err(Error::TaskNotFound(task_id));
            }
            self.appended.lock().unwrap().push((task_id, *pomodoro));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingHook {
        states: StdMutex<Vec<SessionState>>,
        fail: bool,
    }

    impl RecordingHook {
        fn states(&self) -> Vec<SessionState> {
            self.states.lock().unwrap().clone()
        }
    }

    impl StateHook for RecordingHook {
        fn on_state_change(&self, state: SessionState) -> Result<()> {
            self.states.lock().unwrap().push(state);
            if self.fail {
                return Err(Error::Hook("exit status: 1".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: StdMutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) -> Result<()> {
            assert_eq!(title, NOTIFY_TITLE);
            self.messages.lock().unwrap().push(body.to_string());
            Err(Error::Notify("no notification daemon".into()))
        }
    }

    struct Fixture {
        runner: TaskRunner,
        store: Arc<RecordingStore>,
        hook: Arc<RecordingHook>,
        notifier: Arc<RecordingNotifier>,
    }

    fn task(minutes: u64, n_pomodoros: u32) -> Task {
        let mut task = Task::new(
            "focus",
            Duration::from_secs(minutes * 60),
            n_pomodoros,
            Tags::default(),
        );
        task.id = 7;
        task
    }

    fn fixture_with(task: Task, store: RecordingStore, hook: RecordingHook) -> Fixture {
        let store = Arc::new(store);
        let hook = Arc::new(hook);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = TaskRunner::new(
            &task,
            store.clone(),
            notifier.clone(),
            Some(hook.clone() as Arc<dyn StateHook>),
        )
        .unwrap();
        Fixture {
            runner,
            store,
            hook,
            notifier,
        }
    }

    fn fixture(minutes: u64, n_pomodoros: u32) -> Fixture {
        fixture_with(
            task(minutes, n_pomodoros),
            RecordingStore::default(),
            RecordingHook::default(),
        )
    }

    async fn wait_for_state(handle: &RunnerHandle, state: SessionState) {
        handle
            .subscribe()
            .wait_for(|p| p.state() == state)
            .await
            .unwrap();
    }

    use SessionState::{Breaking, Complete, Paused, Running};

    #[tokio::test(start_paused = true)]
    async fn single_interval_runs_to_completion() {
        let f = fixture(25, 1);
        let (handle, join) = f.runner.start();

        wait_for_state(&handle, Running).await;
        let started = Instant::now();
        assert_eq!(handle.time_remaining(), 25 * MINUTE);

        join.await.unwrap().unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= 25 * MINUTE && elapsed < 25 * MINUTE + Duration::from_secs(1));

        let appended = f.store.appended();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].0, 7);
        assert!(appended[0].1.end >= appended[0].1.start);

        let status = handle.status();
        assert_eq!(status.state, Complete);
        assert_eq!(status.count, 1);
        assert_eq!(status.n_pomodoros, 1);
        assert_eq!(status.remaining, Duration::ZERO);

        assert_eq!(f.hook.states(), vec![Running, Complete]);
        assert_eq!(f.notifier.messages(), vec![COMPLETE_MESSAGE]);
    }

    #[tokio::test(start_paused = true)]
    async fn break_waits_for_acknowledgement() {
        let f = fixture(10, 2);
        let (handle, join) = f.runner.start();

        wait_for_state(&handle, Breaking).await;
        assert_eq!(handle.status().count, 1);
        assert_eq!(f.store.appended().len(), 1);
        assert_eq!(f.notifier.messages(), vec![BREAK_MESSAGE]);
        assert_eq!(handle.time_remaining(), Duration::ZERO);

        // a break lasts as long as the user wants
        time::sleep(30 * MINUTE).await;
        assert_eq!(handle.status().state, Breaking);

        handle.resume_break().await;
        assert_eq!(handle.status().state, Running);
        assert_eq!(handle.time_remaining(), 10 * MINUTE);

        join.await.unwrap().unwrap();
        assert_eq!(f.store.appended().len(), 2);
        assert_eq!(f.hook.states(), vec![Running, Breaking, Running, Complete]);
        assert_eq!(f.notifier.messages(), vec![BREAK_MESSAGE, COMPLETE_MESSAGE]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_keeps_remaining_time() {
        let f = fixture(10, 1);
        let (handle, join) = f.runner.start();
        wait_for_state(&handle, Running).await;

        time::sleep(3 * MINUTE).await;
        handle.pause().await;

        let status = handle.status();
        assert_eq!(status.state, Paused);
        assert_eq!(status.remaining, 7 * MINUTE);
        assert_eq!(status.pause_duration, Duration::ZERO);

        time::sleep(Duration::from_secs(3600)).await;
        let status = handle.status();
        assert_eq!(status.remaining, 7 * MINUTE);
        assert_eq!(status.pause_duration, Duration::from_secs(3600));
        assert!(f.store.appended().is_empty());

        // pausing again resumes
        handle.pause().await;
        let resumed = Instant::now();
        let status = handle.status();
        assert_eq!(status.state, Running);
        assert_eq!(status.remaining, 7 * MINUTE);
        assert_eq!(status.pause_duration, Duration::ZERO);

        join.await.unwrap().unwrap();
        let elapsed = resumed.elapsed();
        assert!(elapsed >= 7 * MINUTE && elapsed < 7 * MINUTE + Duration::from_secs(1));
        assert_eq!(f.hook.states(), vec![Running, Paused, Running, Complete]);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_pause_calls_are_serialized() {
        let f = fixture(10, 1);
        let (handle, join) = f.runner.start();
        wait_for_state(&handle, Running).await;

        // the second call sees PAUSED and resumes instead of pausing twice
        tokio::join!(handle.pause(), handle.pause());
        assert_eq!(handle.status().state, Running);
        assert_eq!(f.hook.states(), vec![Running, Paused, Running]);

        join.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_place_requests_are_no_ops() {
        let f = fixture(10, 2);
        let (handle, join) = f.runner.start();
        wait_for_state(&handle, Running).await;

        handle.resume().await;
        handle.resume_break().await;
        assert_eq!(handle.status().state, Running);
        assert_eq!(handle.time_remaining(), 10 * MINUTE);

        wait_for_state(&handle, Breaking).await;
        handle.pause().await;
        handle.resume().await;
        assert_eq!(handle.status().state, Breaking);

        handle.resume_break().await;
        join.await.unwrap().unwrap();
        assert_eq!(f.hook.states(), vec![Running, Breaking, Running, Complete]);
    }

    #[tokio::test(start_paused = true)]
    async fn stray_toggle_is_drained_while_running() {
        let f = fixture(10, 2);
        let (handle, _join) = f.runner.start();
        wait_for_state(&handle, Running).await;

        // bypass the state check to put a toggle in front of the loop
        handle.control.toggle_tx.send(()).await.unwrap();
        while handle.control.toggle_tx.capacity() == 0 {
            tokio::task::yield_now().await;
        }

        let status = handle.status();
        assert_eq!(status.state, Running);
        assert_eq!(status.count, 0);
        assert_eq!(status.remaining, 10 * MINUTE);

        // the drained toggle must not end the coming break
        wait_for_state(&handle, Breaking).await;
        time::sleep(5 * MINUTE).await;
        assert_eq!(handle.status().state, Breaking);
        assert_eq!(handle.status().count, 1);
    }

    /// Queues a pause and a break toggle from inside the first BREAKING hook,
    /// the way a pause that lost the race with the timer sits behind a
    /// prompt acknowledgement.
    #[derive(Default)]
    struct QueueOnBreak {
        states: StdMutex<Vec<SessionState>>,
        senders: StdMutex<Option<(mpsc::Sender<()>, mpsc::Sender<()>)>>,
    }

    impl StateHook for QueueOnBreak {
        fn on_state_change(&self, state: SessionState) -> Result<()> {
            self.states.lock().unwrap().push(state);
            if state == Breaking {
                if let Some((pause_tx, toggle_tx)) = self.senders.lock().unwrap().take() {
                    pause_tx.try_send(()).unwrap();
                    toggle_tx.try_send(()).unwrap();
                }
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pause_queued_across_a_break_does_not_pause_the_next_interval() {
        // select! picks among ready branches at random, so repeat
        for _ in 0..20 {
            let hook = Arc::new(QueueOnBreak::default());
            let runner = TaskRunner::new(
                &task(10, 2),
                Arc::new(RecordingStore::default()),
                Arc::new(RecordingNotifier::default()),
                Some(hook.clone() as Arc<dyn StateHook>),
            )
            .unwrap();
            *hook.senders.lock().unwrap() = Some((
                runner.control.pause_tx.clone(),
                runner.control.toggle_tx.clone(),
            ));
            let (handle, join) = runner.start();

            handle
                .subscribe()
                .wait_for(|p| p.count == 1 && p.state() == Running)
                .await
                .unwrap();
            assert_eq!(handle.time_remaining(), 10 * MINUTE);

            time::sleep(Duration::from_secs(30)).await;
            let status = handle.status();
            assert_eq!(status.state, Running);
            assert_eq!(status.remaining, 10 * MINUTE - Duration::from_secs(30));

            join.await.unwrap().unwrap();
            assert_eq!(
                *hook.states.lock().unwrap(),
                vec![Running, Breaking, Running, Complete]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn appends_once_per_interval() {
        let f = fixture(5, 3);
        let (handle, join) = f.runner.start();

        for _ in 0..2 {
            wait_for_state(&handle, Breaking).await;
            handle.resume_break().await;
        }
        join.await.unwrap().unwrap();

        let appended = f.store.appended();
        assert_eq!(appended.len(), 3);
        assert_eq!(f.store.attempts(), 3);
        for (task_id, pomodoro) in &appended {
            assert_eq!(*task_id, 7);
            assert!(pomodoro.end >= pomodoro.start);
        }
        assert_eq!(handle.status().count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn store_failure_ends_the_session() {
        let f = fixture_with(task(10, 3), RecordingStore::failing(), RecordingHook::default());
        let (handle, join) = f.runner.start();

        let err = join.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(7)));
        assert_eq!(f.store.attempts(), 1);
        assert_eq!(handle.status().count, 0);
        assert_eq!(f.hook.states(), vec![Running]);
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hook_failures_do_not_stop_the_session() {
        let hook = RecordingHook {
            fail: true,
            ..RecordingHook::default()
        };
        let f = fixture_with(task(1, 1), RecordingStore::default(), hook);
        let (_handle, join) = f.runner.start();

        join.await.unwrap().unwrap();
        assert_eq!(f.hook.states(), vec![Running, Complete]);
        assert_eq!(f.store.appended().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_partially_completed_task() {
        let mut partial = task(10, 2);
        let now = Local::now();
        partial.pomodoros.push(Pomodoro::new(now, now));
        let f = fixture_with(partial, RecordingStore::default(), RecordingHook::default());

        let (handle, join) = f.runner.start();
        assert_eq!(handle.status().count, 1);
        join.await.unwrap().unwrap();

        assert_eq!(f.store.appended().len(), 1);
        assert_eq!(handle.status().count, 2);
        assert_eq!(f.hook.states(), vec![Running, Complete]);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_task_completes_immediately() {
        let mut done = task(10, 1);
        let now = Local::now();
        done.pomodoros.push(Pomodoro::new(now, now));
        let f = fixture_with(done, RecordingStore::default(), RecordingHook::default());

        let (_handle, join) = f.runner.start();
        join.await.unwrap().unwrap();
        assert_eq!(f.store.attempts(), 0);
        assert_eq!(f.hook.states(), vec![Complete]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_during_a_break_ends_the_loop() {
        let f = fixture(10, 2);
        let (handle, join) = f.runner.start();
        wait_for_state(&handle, Breaking).await;

        drop(handle);
        let err = join.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::ControlClosed));
    }

    #[test]
    fn rejects_invalid_tasks() {
        let store: Arc<dyn IntervalStore> = Arc::new(RecordingStore::default());
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let zero = task(0, 1);
        assert!(matches!(
            TaskRunner::new(&zero, store, notifier, None),
            Err(Error::InvalidTask(_))
        ));
    }

    #[test]
    fn created_status_reports_full_duration() {
        let progress = Progress {
            phase: Phase::Created,
            count: 0,
            n_pomodoros: 4,
            duration: 25 * MINUTE,
        };
        let status = progress.status();
        assert_eq!(status.state, SessionState::Created);
        assert_eq!(status.remaining, 25 * MINUTE);
        assert_eq!(status.pause_duration, Duration::ZERO);
    }
}
