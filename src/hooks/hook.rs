//! # Lifecycle hooks broadcast to plugins.
//!
//! The [`HookKind`] enum classifies hooks across three groups:
//! - **Lifecycle hooks**: `*Started` / `*Ended` pairs around a subsystem's
//!   initialize, run and teardown calls
//! - **Restart hooks**: decisions taken by the restart loop
//! - **Supervisor hooks**: shutdown and teardown of the whole set
//!
//! The [`Hook`] struct carries the metadata. Hooks are built with consuming
//! `with_*` setters and are never mutated once dispatched.
//!
//! ## Example
//! ```rust
//! use std::time::{Duration, SystemTime};
//! use subvisor::{Hook, HookKind, SubsystemError};
//!
//! let hook = Hook::new(HookKind::WillRestart, SystemTime::UNIX_EPOCH)
//!     .with_subject("ingest")
//!     .with_restart_count(2)
//!     .with_delay(Duration::from_secs(2))
//!     .with_error(SubsystemError::fail("boom"));
//!
//! assert_eq!(hook.kind.as_str(), "subsystem.will.restart");
//! assert_eq!(hook.subject.as_deref(), Some("ingest"));
//! assert_eq!(hook.delay, Some(Duration::from_secs(2)));
//! ```

use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use crate::error::SubsystemError;

/// Classification of hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    // === Plugin registry ===
    /// A plugin was registered.
    ///
    /// Sets:
    /// - `subject`: plugin name
    PluginAdded,

    // === Subsystem lifecycle ===
    /// `initialize` is about to be called.
    ///
    /// Sets: `subject`, `started_at`
    InitializationStarted,
    /// `initialize` returned.
    ///
    /// Sets: `subject`, `started_at`, `ended_at`, `error` (if it failed)
    InitializationEnded,
    /// One `run` attempt is about to start.
    ///
    /// Sets: `subject`, `started_at`
    RunStarted,
    /// One `run` attempt returned.
    ///
    /// Sets: `subject`, `started_at`, `ended_at`, `error` (if it failed)
    RunEnded,
    /// `teardown` is about to be called.
    ///
    /// Sets: `subject`, `started_at`
    TeardownStarted,
    /// `teardown` returned.
    ///
    /// Sets: `subject`, `started_at`, `ended_at`, `error` (if it failed)
    TeardownEnded,

    // === Restart loop ===
    /// A restart was approved and the loop is about to wait out the delay.
    ///
    /// Sets:
    /// - `subject`, `started_at`
    /// - `restart_count`: number of the upcoming restart (1-based)
    /// - `max_attempts`: configured max retries (0 = unlimited)
    /// - `delay`: wait before the restart
    /// - `error`: failure that triggered it
    /// - `failure_count`, `circuit_open`: breaker state after recording the failure
    WillRestart,
    /// The delay elapsed and the attempt was recorded; the next run follows.
    ///
    /// Sets: `subject`, `started_at` (when the restart was scheduled), `ended_at`,
    /// `restart_count`, `max_attempts`, `error` (the failure that caused the restart)
    Restarted,
    /// The restart policy refused any further restart.
    ///
    /// Sets: `subject`, `started_at`, `restart_count` (restarts actually made),
    /// `max_attempts`, `reason`, `error`, `failure_count`, `circuit_open`
    MaxRestartReached,
    /// The subsystem was stopped through its external control.
    ///
    /// Sets: `subject`, `started_at`
    SubsystemStopped,
    /// A stopped subsystem was resumed.
    ///
    /// Sets: `subject`, `started_at`
    SubsystemResumed,
    /// The restart loop exited because of a terminate request.
    ///
    /// Sets: `subject`, `started_at`
    SubsystemTerminated,

    // === Supervisor ===
    /// The supervisor's run token was cancelled; terminating every subsystem.
    ///
    /// Sets: `started_at`
    ShutdownRequested,
    /// Every restart loop exited within the grace period.
    ///
    /// Sets: `started_at`, `ended_at`
    AllTerminated,
    /// Some restart loops were still alive when the grace period ran out.
    ///
    /// Sets: `started_at`, `ended_at`, `reason` (stuck subsystems)
    GraceExceeded,
    /// Some teardowns did not return within the teardown timeout.
    ///
    /// Sets: `started_at`, `ended_at`, `reason` (stuck subsystems)
    TeardownTimedOut,
}

impl HookKind {
    /// Stable dotted name, suitable for logs and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::PluginAdded => "plugin.added",
            HookKind::InitializationStarted => "subsystem.initialization.started",
            HookKind::InitializationEnded => "subsystem.initialization.ended",
            HookKind::RunStarted => "subsystem.run.started",
            HookKind::RunEnded => "subsystem.run.ended",
            HookKind::TeardownStarted => "subsystem.teardown.started",
            HookKind::TeardownEnded => "subsystem.teardown.ended",
            HookKind::WillRestart => "subsystem.will.restart",
            HookKind::Restarted => "subsystem.restarted",
            HookKind::MaxRestartReached => "subsystem.max.restart.reached",
            HookKind::SubsystemStopped => "subsystem.stopped",
            HookKind::SubsystemResumed => "subsystem.resumed",
            HookKind::SubsystemTerminated => "subsystem.terminated",
            HookKind::ShutdownRequested => "supervisor.shutdown.requested",
            HookKind::AllTerminated => "supervisor.all.terminated",
            HookKind::GraceExceeded => "supervisor.grace.exceeded",
            HookKind::TeardownTimedOut => "supervisor.teardown.timed_out",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, timestamped fact about a lifecycle transition.
///
/// Fields other than `kind` and `started_at` are set depending on the
/// [`HookKind`]; see each variant for the list.
#[derive(Debug, Clone)]
pub struct Hook {
    /// Hook classification.
    pub kind: HookKind,
    /// Subsystem (or plugin) the hook is about.
    pub subject: Option<Arc<str>>,
    /// When the transition started.
    pub started_at: SystemTime,
    /// When the transition ended (`*Ended` and summary hooks only).
    pub ended_at: Option<SystemTime>,
    /// Error the transition ended with, if any.
    pub error: Option<SubsystemError>,
    /// Restart number (see [`HookKind::WillRestart`] / [`HookKind::Restarted`]).
    pub restart_count: Option<u32>,
    /// Configured max retries (0 = unlimited).
    pub max_attempts: Option<u32>,
    /// Delay before the next attempt.
    pub delay: Option<Duration>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Failures currently inside the circuit breaker window.
    pub failure_count: Option<u32>,
    /// Whether the circuit breaker is open.
    pub circuit_open: Option<bool>,
}

impl Hook {
    /// Creates a hook of the given kind stamped with `started_at`.
    pub fn new(kind: HookKind, started_at: SystemTime) -> Self {
        Self {
            kind,
            subject: None,
            started_at,
            ended_at: None,
            error: None,
            restart_count: None,
            max_attempts: None,
            delay: None,
            reason: None,
            failure_count: None,
            circuit_open: None,
        }
    }

    /// Attaches the subject name.
    #[inline]
    pub fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches the end time.
    #[inline]
    pub fn with_ended_at(mut self, at: SystemTime) -> Self {
        self.ended_at = Some(at);
        self
    }

    /// Attaches an error.
    #[inline]
    pub fn with_error(mut self, error: SubsystemError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches an optional error (keeps `None` as is).
    #[inline]
    pub fn with_result(mut self, result: &Result<(), SubsystemError>) -> Self {
        self.error = result.as_ref().err().cloned();
        self
    }

    /// Attaches a restart count.
    #[inline]
    pub fn with_restart_count(mut self, n: u32) -> Self {
        self.restart_count = Some(n);
        self
    }

    /// Attaches the configured max attempts.
    #[inline]
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Attaches a delay.
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches circuit breaker state.
    #[inline]
    pub fn with_breaker(mut self, failure_count: u32, circuit_open: bool) -> Self {
        self.failure_count = Some(failure_count);
        self.circuit_open = Some(circuit_open);
        self
    }

    /// Creates a plugin-added hook.
    #[inline]
    pub fn plugin_added(name: &str, at: SystemTime) -> Self {
        Hook::new(HookKind::PluginAdded, at).with_subject(name)
    }

    /// Time between `started_at` and `ended_at`, if the hook has an end.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at
            .map(|end| crate::clock::elapsed_between(self.started_at, end))
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
