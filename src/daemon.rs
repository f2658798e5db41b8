//! Daemon control loop
//!
//! Two tokio tasks share one [`DeviceControl`] and one [`StateTracker`]:
//!
//! - the poll trigger reads every drive's power state each interval and
//!   disables the spindown timer on drives that are spinning when first seen
//!   or that just left standby;
//! - the schedule trigger applies the configured standby timeout to every
//!   drive once a day.
//!
//! Both stop at their next wait point once the cancellation token fires.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::DaemonConfig;
use crate::hw::{DeviceControl, PowerState, SPINDOWN_DISABLED};
use crate::schedule::{format_duration, Schedule};
use crate::standby::apply_standby;
use crate::state::StateTracker;

/// Lifecycle of a [`Daemon`]; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

impl Phase {
    pub fn successor(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::Running),
            Phase::Running => Some(Phase::ShuttingDown),
            Phase::ShuttingDown => Some(Phase::Stopped),
            Phase::Stopped => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("poll interval must be greater than 0")]
    ZeroPollInterval,
    #[error("daemon already started (phase: {0:?})")]
    AlreadyStarted(Phase),
}

/// How a fresh reading relates to the last recorded one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Never seen before and spinning
    FirstActive,
    /// Never seen before and already in standby
    FirstStandby,
    /// Was in standby at the last poll, spinning now
    Woke,
    /// Anything else
    Steady,
}

impl Transition {
    pub fn between(previous: Option<PowerState>, current: PowerState) -> Self {
        match previous {
            None if current.is_standby() => Transition::FirstStandby,
            None => Transition::FirstActive,
            Some(last) if last.is_standby() && !current.is_standby() => Transition::Woke,
            Some(_) => Transition::Steady,
        }
    }

    /// Whether this reading calls for `set_standby_timeout(dev, 0)`
    pub fn disables_spindown(self) -> bool {
        matches!(self, Transition::FirstActive | Transition::Woke)
    }
}

pub struct Daemon<C> {
    config: DaemonConfig,
    control: Arc<C>,
    tracker: Arc<StateTracker>,
    phase: watch::Sender<Phase>,
}

impl<C> Daemon<C>
where
    C: DeviceControl + 'static,
{
    pub fn new(config: DaemonConfig, control: C) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            config,
            control: Arc::new(control),
            tracker: Arc::new(StateTracker::new()),
            phase,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase changes, e.g. to wait for [`Phase::Running`]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Move from `from` to its successor. Returns false if the daemon was elsewhere.
    fn advance_from(&self, from: Phase) -> bool {
        self.phase.send_if_modified(|phase| {
            match phase.successor() {
                Some(next) if *phase == from => {
                    debug!("daemon phase {:?} -> {:?}", phase, next);
                    *phase = next;
                    true
                }
                _ => false,
            }
        })
    }

    /// Run both triggers until `cancel` fires.
    ///
    /// Only fails on configuration problems or when called twice; errors from
    /// individual drives are logged and absorbed.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), DaemonError> {
        if self.config.poll_interval.is_zero() {
            return Err(DaemonError::ZeroPollInterval);
        }
        if !self.advance_from(Phase::Idle) {
            return Err(DaemonError::AlreadyStarted(self.phase()));
        }

        let devices: Arc<[String]> = self.config.canonical_devices().into();
        info!("monitoring devices: {:?}", devices);

        let poll = PollTrigger {
            control: Arc::clone(&self.control),
            tracker: Arc::clone(&self.tracker),
            devices: Arc::clone(&devices),
            period: self.config.poll_interval,
        };
        let poll_task = tokio::spawn(poll.run(cancel.clone()));

        let schedule_task = match &self.config.schedule {
            Ok(schedule) => {
                let trigger = ScheduleTrigger {
                    control: Arc::clone(&self.control),
                    devices: Arc::clone(&devices),
                    schedule: *schedule,
                    standby_value: self.config.standby_value,
                };
                Some(tokio::spawn(trigger.run(cancel.clone())))
            }
            Err(e) => {
                warn!("invalid schedule, scheduler disabled (polling continues): {}", e);
                None
            }
        };

        cancel.cancelled().await;
        info!("shutdown requested, waiting for in-flight sweeps");
        self.advance_from(Phase::Running);

        join_trigger("poll", poll_task).await;
        if let Some(task) = schedule_task {
            join_trigger("schedule", task).await;
        }

        self.advance_from(Phase::ShuttingDown);
        info!("daemon stopped");
        Ok(())
    }
}

async fn join_trigger(name: &str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        error!("{} trigger task failed: {}", name, e);
    }
}

struct PollTrigger<C> {
    control: Arc<C>,
    tracker: Arc<StateTracker>,
    devices: Arc<[String]>,
    period: Duration,
}

impl<C: DeviceControl> PollTrigger<C> {
    async fn run(self, cancel: CancellationToken) {
        // First tick completes immediately
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.sweep().await;
        }
        debug!("poll trigger stopped");
    }

    async fn sweep(&self) {
        trace!("polling {} devices", self.devices.len());
        for device in self.devices.iter() {
            self.observe(device).await;
        }
    }

    async fn observe(&self, device: &str) {
        let current = match self.control.get_state(device).await {
            Ok(state) => state,
            Err(e) => {
                warn!("failed to read power state of {}: {}", device, e);
                return;
            }
        };

        let transition = Transition::between(self.tracker.get(device), current);
        match transition {
            Transition::FirstActive => {
                debug!("initial state for {}: {}", device, current);
            }
            Transition::FirstStandby => {
                debug!("initial state for {}: {}, leaving timer alone", device, current);
            }
            Transition::Woke => {
                info!("device {} left standby (state={}), disabling spindown timer", device, current);
            }
            Transition::Steady => {}
        }

        if transition.disables_spindown() {
            self.disable_spindown(device).await;
        }
        self.tracker.set(device, current);
    }

    async fn disable_spindown(&self, device: &str) {
        match self.control.set_standby_timeout(device, SPINDOWN_DISABLED).await {
            Ok(()) => info!("disabled spindown timer on {}", device),
            Err(e) => error!("failed to disable spindown on {}: {}", device, e),
        }
    }
}

struct ScheduleTrigger<C> {
    control: Arc<C>,
    devices: Arc<[String]>,
    schedule: Schedule,
    standby_value: u8,
}

impl<C: DeviceControl> ScheduleTrigger<C> {
    async fn run(self, cancel: CancellationToken) {
        let mut next = self.schedule.next(&Local::now());
        log_next_run(&next);

        loop {
            let wait = Schedule::until(&next, &Local::now());
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(wait) => {}
            }

            info!(
                "scheduler triggered at {}, setting standby={} for all devices",
                Local::now().to_rfc3339(),
                self.standby_value
            );
            let report = apply_standby(self.control.as_ref(), &self.devices, self.standby_value).await;
            if !report.is_success() {
                warn!(
                    "scheduled standby failed on {} of {} devices",
                    report.failed.len(),
                    self.devices.len()
                );
            }

            // An early wakeup must not fire the same instant twice
            let now = Local::now();
            let reference = if now > next { now } else { next };
            next = self.schedule.next(&reference);
            log_next_run(&next);
        }
        debug!("schedule trigger stopped");
    }
}

fn log_next_run(next: &DateTime<Local>) {
    let wait = Schedule::until(next, &Local::now());
    info!("scheduler: next run at {} (in {})", next.to_rfc3339(), format_duration(wait));
}
