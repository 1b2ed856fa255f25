use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{AbortHandle, Abortable, LocalBoxFuture};
use tracing::{debug, info, warn};

use crate::config::SupportConfig;
use crate::error::ApiError;

#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Runs a task on the current thread's executor.
pub trait LocalSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}

/// Something whose latest server state can be fetched repeatedly.
#[async_trait(?Send)]
pub trait PollSource {
    type Snapshot: Clone + PartialEq + 'static;

    async fn fetch(&self) -> Result<Self::Snapshot, ApiError>;

    fn is_terminal(&self, snapshot: &Self::Snapshot) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Terminal,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub backoff: Duration,
}

impl PollSchedule {
    pub fn from_config(config: &SupportConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            backoff: config.error_backoff(),
        }
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::from_config(&SupportConfig::default())
    }
}

#[derive(Default)]
struct PollState {
    generation: Cell<u64>,
    active: Cell<bool>,
    abort: RefCell<Option<AbortHandle>>,
}

/// Background refresh loop for one session or ticket.
///
/// At most one loop runs per poller. [`stop`](Poller::stop) clears the pending
/// timer and bumps a generation token, so a fetch that resolves afterwards is
/// thrown away instead of applied.
pub struct Poller {
    schedule: PollSchedule,
    sleeper: Rc<dyn Sleeper>,
    spawner: Rc<dyn LocalSpawner>,
    state: Rc<PollState>,
}

impl Poller {
    pub fn new(
        schedule: PollSchedule,
        sleeper: Rc<dyn Sleeper>,
        spawner: Rc<dyn LocalSpawner>,
    ) -> Self {
        Self {
            schedule,
            sleeper,
            spawner,
            state: Rc::new(PollState::default()),
        }
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    pub fn is_active(&self) -> bool {
        self.state.active.get()
    }

    /// Builds the loop future without spawning it.
    ///
    /// Returns `None` when a loop is already running or `initial` is
    /// terminal. `on_change` is called with every snapshot that differs from
    /// the previous one.
    pub fn start<S, F>(
        &self,
        source: S,
        initial: &S::Snapshot,
        on_change: F,
    ) -> Option<LocalBoxFuture<'static, PollExit>>
    where
        S: PollSource + 'static,
        F: FnMut(S::Snapshot) + 'static,
    {
        if self.state.active.get() {
            debug!("poll loop already running");
            return None;
        }
        if source.is_terminal(initial) {
            debug!("not polling a terminal snapshot");
            return None;
        }

        let generation = self.state.generation.get() + 1;
        self.state.generation.set(generation);
        self.state.active.set(true);
        let (handle, registration) = AbortHandle::new_pair();
        *self.state.abort.borrow_mut() = Some(handle);

        let run = run_loop(
            source,
            initial.clone(),
            on_change,
            Rc::clone(&self.sleeper),
            self.schedule,
            Rc::clone(&self.state),
            generation,
        );
        let state = Rc::clone(&self.state);
        Some(Box::pin(async move {
            let exit = Abortable::new(run, registration)
                .await
                .unwrap_or(PollExit::Cancelled);
            if state.generation.get() == generation {
                state.active.set(false);
                state.abort.borrow_mut().take();
            }
            exit
        }))
    }

    /// Starts the loop on the spawner. Returns whether a new loop started.
    pub fn launch<S, F>(&self, source: S, initial: &S::Snapshot, on_change: F) -> bool
    where
        S: PollSource + 'static,
        F: FnMut(S::Snapshot) + 'static,
    {
        let Some(task) = self.start(source, initial, on_change) else {
            return false;
        };
        self.spawner.spawn_local(Box::pin(async move {
            let exit = task.await;
            debug!(?exit, "poll loop finished");
        }));
        true
    }

    pub fn stop(&self) {
        if !self.state.active.get() {
            return;
        }
        self.state.generation.set(self.state.generation.get() + 1);
        self.state.active.set(false);
        if let Some(handle) = self.state.abort.borrow_mut().take() {
            handle.abort();
        }
        debug!("poll loop stopped");
    }
}

async fn run_loop<S, F>(
    source: S,
    initial: S::Snapshot,
    mut on_change: F,
    sleeper: Rc<dyn Sleeper>,
    schedule: PollSchedule,
    state: Rc<PollState>,
    generation: u64,
) -> PollExit
where
    S: PollSource,
    F: FnMut(S::Snapshot),
{
    let is_current = || state.generation.get() == generation;
    let mut last_known = initial;
    let mut delay = schedule.interval;

    loop {
        sleeper.sleep(delay).await;
        if !is_current() {
            return PollExit::Cancelled;
        }

        let fetched = source.fetch().await;
        if !is_current() {
            debug!("discarding poll result that landed after stop");
            return PollExit::Cancelled;
        }

        match fetched {
            Ok(snapshot) => {
                delay = schedule.interval;
                let terminal = source.is_terminal(&snapshot);
                if snapshot != last_known {
                    last_known = snapshot.clone();
                    on_change(snapshot);
                }
                if terminal {
                    info!("polled resource reached a terminal status");
                    return PollExit::Terminal;
                }
            }
            Err(err) => {
                warn!(error = %err, backoff_ms = schedule.backoff.as_millis() as u64, "poll failed");
                delay = schedule.backoff;
            }
        }
    }
}
