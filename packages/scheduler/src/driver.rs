//! Immediate-then-daily job driver.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::SchedulerError;
use crate::clock::Clock;
use crate::schedule::DailySchedule;
use crate::shutdown::ShutdownToken;

/// How often the polling task checks whether the schedule is due.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Work driven by the [`RecurrenceDriver`].
///
/// `run` must contain its own failures: the driver never inspects an
/// outcome and always keeps its cadence.
#[async_trait]
pub trait Job: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Executes one run to completion.
    async fn run(&self);
}

/// Lifecycle of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Constructed, nothing has run yet.
    Idle,
    /// Executing the startup run.
    RunningImmediate,
    /// Polling for the next due trigger.
    Waiting,
    /// Executing a scheduled run.
    Ticking,
    /// Polling has ended after shutdown.
    Stopped,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::RunningImmediate => "running-immediate",
            Self::Waiting => "waiting",
            Self::Ticking => "ticking",
            Self::Stopped => "stopped",
        })
    }
}

/// Runs a job once at startup and then once per day.
pub struct RecurrenceDriver {
    job: Arc<dyn Job>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state_tx: watch::Sender<DriverState>,
}

/// Handle to a started driver's polling task.
pub struct DriverHandle {
    task: JoinHandle<DailySchedule>,
}

impl RecurrenceDriver {
    #[must_use]
    pub fn new(job: Arc<dyn Job>, clock: Arc<dyn Clock>) -> Self {
        let (state_tx, _) = watch::channel(DriverState::Idle);
        Self {
            job,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state_tx,
        }
    }

    /// Overrides the due-check interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<DriverState> {
        self.state_tx.subscribe()
    }

    /// Runs the job once, registers the daily schedule, and spawns the
    /// polling task.
    ///
    /// The startup run is awaited before this returns. If `shutdown` is
    /// already cancelled by then, the polling task stops at its first
    /// check without firing.
    pub async fn start(self, shutdown: ShutdownToken) -> DriverHandle {
        let name = self.job.name().to_string();

        set_state(&self.state_tx, DriverState::RunningImmediate);
        log::info!("Running {name} once at startup");
        self.job.run().await;

        let schedule = DailySchedule::daily(self.clock.now());
        log::info!(
            "{name} scheduled daily, next run at {}",
            schedule.next_due().to_rfc3339()
        );

        set_state(&self.state_tx, DriverState::Waiting);

        let task = tokio::spawn(poll_loop(
            self.job,
            self.clock,
            schedule,
            self.poll_interval,
            shutdown,
            self.state_tx,
        ));

        DriverHandle { task }
    }

    /// Starts the driver and keeps it running until `stop` resolves.
    ///
    /// `stop` is polled from the start, including while the startup run is
    /// in progress. Once it resolves, the run in flight completes, polling
    /// ends, and the final schedule is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Join`] if the startup run or the polling
    /// task panicked.
    pub async fn run_until(
        self,
        stop: impl Future<Output = ()>,
    ) -> Result<DailySchedule, SchedulerError> {
        let name = self.job.name().to_string();
        let shutdown = ShutdownToken::new();
        let mut start = tokio::spawn(self.start(shutdown.clone()));
        tokio::pin!(stop);

        let handle = tokio::select! {
            biased;
            () = &mut stop => {
                log::info!("Stop requested during {name} startup run, letting it finish");
                shutdown.cancel();
                start.await?
            }
            handle = &mut start => {
                let handle = handle?;
                stop.await;
                log::info!("Stop requested, stopping {name} scheduler");
                shutdown.cancel();
                handle
            }
        };

        handle.join().await
    }
}

impl DriverHandle {
    /// Waits for the polling task to finish and returns the final schedule.
    ///
    /// Only resolves after the shutdown token passed to
    /// [`RecurrenceDriver::start`] has been cancelled. A run in progress at
    /// that point completes first.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Join`] if the polling task panicked.
    pub async fn join(self) -> Result<DailySchedule, SchedulerError> {
        Ok(self.task.await?)
    }
}

fn set_state(tx: &watch::Sender<DriverState>, state: DriverState) {
    log::debug!("Driver state -> {state}");
    tx.send_replace(state);
}

async fn poll_loop(
    job: Arc<dyn Job>,
    clock: Arc<dyn Clock>,
    mut schedule: DailySchedule,
    poll_interval: Duration,
    shutdown: ShutdownToken,
    state_tx: watch::Sender<DriverState>,
) -> DailySchedule {
    let name = job.name().to_string();

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(poll_interval) => {}
        }

        let now = clock.now();
        if !schedule.is_due(now) {
            continue;
        }

        set_state(&state_tx, DriverState::Ticking);
        log::info!("Scheduled {name} run is due");
        job.run().await;

        let skipped = schedule.mark_fired(now);
        if skipped > 0 {
            log::warn!("Skipped {skipped} missed {name} run(s)");
        }
        log::info!("Next {name} run at {}", schedule.next_due().to_rfc3339());
        set_state(&state_tx, DriverState::Waiting);
    }

    log::info!("{name} scheduler stopped");
    set_state(&state_tx, DriverState::Stopped);
    schedule
}
