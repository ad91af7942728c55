//! # SupervisedSubsystem: the restart loop of one subsystem.
//!
//! Wraps a [`ManagedSubsystem`] and keeps re-running it according to its
//! [`RestartPolicy`], while exposing `stop` / `start` / `terminate` controls.
//!
//! ## States
//! ```text
//! Idle ─► Running ─► Failed ─► BackingOff ─► Running ...
//!            │   └─► (Ok) reset policy ─► Running ...
//!            ├─► Stopped ─► (start) ─► Running
//!            └─► Terminated
//! ```
//!
//! ## Loop body
//! ```text
//! loop {
//!   ├─► stopped?      → hook Stopped, wait {resume, terminate, parent}, hook Resumed
//!   ├─► terminate?    → hook Terminated, return Ok(())
//!   ├─► parent done?  → return Err(Canceled)
//!   ├─► run_once()    (child token, cancelled by stop/terminate)
//!   ├─► interrupted by stop → back to the stopped wait (not a failure)
//!   ├─► Ok(())        → policy.reset_state(), run again
//!   └─► Err(e)
//!        ├─► !should_restart(e)        → Failed, return Err(e)
//!        ├─► record_failure(e, now)
//!        ├─► check_restart(now) denied → hook MaxRestartReached{reason}, return Err(e)
//!        ├─► hook WillRestart{delay}
//!        ├─► sleep(delay) | terminate | parent
//!        ├─► record_attempt()
//!        └─► hook Restarted
//! }
//! ```
//!
//! ## Rules
//! - All hooks of one subsystem are dispatched from its own loop, in order.
//! - A run cut short by terminate or parent cancellation never consults the policy.
//! - A clean return is not "finished": the policy is reset and `run` is called again.

use std::{sync::Arc, time::SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    clock::ClockRef,
    core::{
        control::{Controls, Interrupt},
        runner::run_once,
    },
    error::SubsystemError,
    hooks::{Hook, HookBus, HookKind},
    policies::{RestartOptions, RestartPolicy, RestartState},
    subsystems::{ManagedSubsystem, Subsystem, SubsystemRef},
};

/// Where a supervised subsystem currently is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SubsystemState {
    /// Created, restart loop not started yet.
    #[default]
    Idle,
    /// A `run` attempt is in flight.
    Running,
    /// Waiting out the delay before a restart.
    BackingOff,
    /// Stopped through its control; waiting for `start` or `terminate`.
    Stopped,
    /// The loop returned an error the policy would not restart.
    Failed,
    /// The loop exited on terminate or shutdown.
    Terminated,
}

impl SubsystemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemState::Idle => "idle",
            SubsystemState::Running => "running",
            SubsystemState::BackingOff => "backing-off",
            SubsystemState::Stopped => "stopped",
            SubsystemState::Failed => "failed",
            SubsystemState::Terminated => "terminated",
        }
    }
}

/// Point-in-time view of one supervised subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemStatus {
    pub name: String,
    pub state: SubsystemState,
    /// Terminal error, set once the state is `Failed`.
    pub error: Option<SubsystemError>,
    pub restart: RestartState,
}

#[derive(Debug, Default)]
struct Status {
    state: SubsystemState,
    error: Option<SubsystemError>,
}

/// Restart loop around one subsystem.
pub struct SupervisedSubsystem {
    managed: ManagedSubsystem,
    name: Arc<str>,
    bus: Arc<HookBus>,
    clock: ClockRef,
    policy: RestartPolicy,
    controls: Controls,
    status: Mutex<Status>,
}

impl SupervisedSubsystem {
    /// Wraps `inner` in a [`ManagedSubsystem`] and a fresh [`RestartPolicy`].
    pub fn new(
        inner: SubsystemRef,
        options: RestartOptions,
        bus: Arc<HookBus>,
        clock: ClockRef,
    ) -> Self {
        let name: Arc<str> = Arc::from(inner.name());
        Self {
            managed: ManagedSubsystem::new(inner, bus.clone(), clock.clone()),
            name,
            bus,
            clock,
            policy: RestartPolicy::new(options),
            controls: Controls::new(),
            status: Mutex::new(Status::default()),
        }
    }

    /// Requests a stop: the in-flight run is cancelled and the loop waits for
    /// [`start`](Self::start) or [`terminate`](Self::terminate). No-op if already stopped.
    pub fn stop(&self) {
        self.controls.stop();
    }

    /// Resumes a stopped subsystem. No-op if not stopped.
    pub fn start(&self) {
        self.controls.start();
    }

    /// Ends the restart loop. Idempotent; never blocks.
    pub fn terminate(&self) {
        self.controls.terminate();
    }

    /// True strictly while a `run` call is executing.
    pub fn is_running(&self) -> bool {
        self.controls.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.controls.is_stopped()
    }

    pub fn state(&self) -> SubsystemState {
        self.status.lock().state
    }

    pub fn status(&self) -> SubsystemStatus {
        let status = self.status.lock();
        SubsystemStatus {
            name: self.name.to_string(),
            state: status.state,
            error: status.error.clone(),
            restart: self.policy.state(),
        }
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    async fn restart_loop(&self, parent: CancellationToken) -> Result<(), SubsystemError> {
        loop {
            if self.controls.is_stopped() {
                self.set_state(SubsystemState::Stopped);
                self.emit(HookKind::SubsystemStopped).await;

                tokio::select! {
                    biased;
                    _ = self.controls.terminated() => return self.exit_terminated().await,
                    _ = parent.cancelled() => return self.exit_canceled(),
                    _ = self.controls.resumed() => {}
                }
                self.emit(HookKind::SubsystemResumed).await;
                continue;
            }

            if self.controls.is_terminated() {
                return self.exit_terminated().await;
            }
            if parent.is_cancelled() {
                return self.exit_canceled();
            }

            self.set_state(SubsystemState::Running);
            let attempt = run_once(&self.managed, &parent, &self.controls).await;

            if self.controls.is_terminated() {
                return self.exit_terminated().await;
            }
            if parent.is_cancelled() {
                return self.exit_canceled();
            }
            if attempt.interrupted == Some(Interrupt::Stop) || self.controls.is_stopped() {
                continue;
            }

            let err = match attempt.result {
                Ok(()) => {
                    self.policy.reset_state();
                    continue;
                }
                Err(err) => err,
            };

            if !self.policy.should_restart(&Err(err.clone())) {
                return self.exit_failed(err);
            }

            let now = self.clock.now();
            self.policy.record_failure(&err, now);

            if let Err(denied) = self.policy.check_restart(now) {
                let state = self.policy.state();
                let hook = self
                    .hook(HookKind::MaxRestartReached, now)
                    .with_restart_count(state.attempt_count)
                    .with_max_attempts(self.policy.options().max_retries)
                    .with_reason(denied.as_reason())
                    .with_error(err.clone())
                    .with_breaker(state.failure_count, state.circuit_open);
                self.bus.dispatch(&hook).await;
                return self.exit_failed(err);
            }

            self.backoff(&parent, &err, now).await?;
            if self.controls.is_terminated() {
                return self.exit_terminated().await;
            }
        }
    }

    /// Waits out the restart delay, then counts the attempt.
    ///
    /// Returns early (without counting) on terminate or parent cancellation;
    /// the caller tells the two apart.
    async fn backoff(
        &self,
        parent: &CancellationToken,
        err: &SubsystemError,
        scheduled_at: SystemTime,
    ) -> Result<(), SubsystemError> {
        let state = self.policy.state();
        let delay = self.policy.next_retry_delay();
        let max_attempts = self.policy.options().max_retries;

        let hook = self
            .hook(HookKind::WillRestart, scheduled_at)
            .with_restart_count(state.attempt_count.saturating_add(1))
            .with_max_attempts(max_attempts)
            .with_delay(delay)
            .with_error(err.clone())
            .with_breaker(state.failure_count, state.circuit_open);
        self.bus.dispatch(&hook).await;

        self.set_state(SubsystemState::BackingOff);
        tokio::select! {
            biased;
            _ = self.controls.terminated() => return Ok(()),
            _ = parent.cancelled() => return Err(self.exit_canceled_err()),
            _ = tokio::time::sleep(delay) => {}
        }

        self.policy.record_attempt();
        let hook = self
            .hook(HookKind::Restarted, scheduled_at)
            .with_ended_at(self.clock.now())
            .with_restart_count(self.policy.state().attempt_count)
            .with_max_attempts(max_attempts)
            .with_error(err.clone());
        self.bus.dispatch(&hook).await;
        Ok(())
    }

    fn hook(&self, kind: HookKind, at: SystemTime) -> Hook {
        Hook::new(kind, at).with_subject(self.name.clone())
    }

    async fn emit(&self, kind: HookKind) {
        let hook = self.hook(kind, self.clock.now());
        self.bus.dispatch(&hook).await;
    }

    fn set_state(&self, state: SubsystemState) {
        self.status.lock().state = state;
    }

    async fn exit_terminated(&self) -> Result<(), SubsystemError> {
        self.set_state(SubsystemState::Terminated);
        self.emit(HookKind::SubsystemTerminated).await;
        Ok(())
    }

    fn exit_canceled(&self) -> Result<(), SubsystemError> {
        Err(self.exit_canceled_err())
    }

    fn exit_canceled_err(&self) -> SubsystemError {
        self.set_state(SubsystemState::Terminated);
        SubsystemError::Canceled
    }

    fn exit_failed(&self, err: SubsystemError) -> Result<(), SubsystemError> {
        let mut status = self.status.lock();
        status.state = SubsystemState::Failed;
        status.error = Some(err.clone());
        Err(err)
    }
}

#[async_trait]
impl Subsystem for SupervisedSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.managed.initialize(ctx).await
    }

    /// Runs the restart loop until terminate, parent cancellation or a terminal failure.
    ///
    /// - terminate → `Ok(())`
    /// - parent cancellation → `Err(SubsystemError::Canceled)`
    /// - terminal failure → the last error `run` returned
    async fn run(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.restart_loop(ctx).await
    }

    async fn teardown(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.managed.teardown(ctx).await
    }
}
