//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] holds the two shutdown bounds of a [`Supervisor`](crate::Supervisor).
//! Per-subsystem restart behavior lives in [`RestartOptions`](crate::RestartOptions).
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for restart loops after shutdown
//! - `teardown_timeout = 0s` → every teardown that does not finish immediately times out

use std::time::Duration;

/// Global configuration for the supervisor.
///
/// ## Field semantics
/// - `grace`: how long [`Supervisor::run`](crate::Supervisor::run) waits for the
///   terminated restart loops once shutdown was requested
/// - `teardown_timeout`: overall bound for [`Supervisor::teardown`](crate::Supervisor::teardown);
///   teardowns still running when it expires are reported as stuck
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Maximum wait for restart loops to exit after shutdown.
    ///
    /// On overrun `run` returns `SupervisorError::GraceExceeded` with the stuck names.
    pub grace: Duration,

    /// Maximum wait for all teardowns together.
    ///
    /// On overrun `teardown` returns `SupervisorError::TeardownTimeout`.
    pub teardown_timeout: Duration,
}

impl SupervisorConfig {
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }
}

impl Default for SupervisorConfig {
    /// `grace = 30s`, `teardown_timeout = 30s`.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            teardown_timeout: Duration::from_secs(30),
        }
    }
}
