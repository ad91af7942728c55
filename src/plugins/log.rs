//! # LogWriter: renders hooks through `tracing`
//!
//! A plugin that turns every [`Hook`] into one `tracing` event, so whatever
//! subscriber the application installed (fmt, JSON, journald) receives the
//! supervision lifecycle.
//!
//! ## Levels
//! - `error`: failed initialize/teardown, max restart reached, grace exceeded, teardown timeout
//! - `warn`: failed run, will restart
//! - `info`: stop / resume / terminate, shutdown, plugin added, restarted
//! - `debug`: successful lifecycle pairs
//!
//! ## Example output (fmt subscriber)
//! ```text
//! WARN  subsystem.run.ended subsystem="ingest" error="connection refused" duration=12ms
//! WARN  subsystem.will.restart subsystem="ingest" restart=1 max_attempts=5 delay=1s
//! INFO  subsystem.restarted subsystem="ingest" restart=1 max_attempts=5
//! ERROR subsystem.max.restart.reached subsystem="ingest" reason="circuit breaker open"
//! ```

use async_trait::async_trait;

use crate::hooks::{Hook, HookBus, HookKind, Plugin};

/// Hook writer plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for LogWriter {
    fn name(&self) -> &str {
        "log-writer"
    }

    async fn on_hook(&self, _bus: &HookBus, h: &Hook) -> anyhow::Result<()> {
        let kind = h.kind.as_str();
        let subsystem = h.subject.as_deref().unwrap_or("-");
        let error = h.error.as_ref().map(ToString::to_string);

        match h.kind {
            HookKind::RunEnded if h.is_failure() => {
                tracing::warn!(subsystem, error = ?error, duration = ?h.duration(), "{kind}");
            }
            HookKind::InitializationEnded | HookKind::TeardownEnded if h.is_failure() => {
                tracing::error!(subsystem, error = ?error, duration = ?h.duration(), "{kind}");
            }
            HookKind::InitializationEnded | HookKind::RunEnded | HookKind::TeardownEnded => {
                tracing::debug!(subsystem, duration = ?h.duration(), "{kind}");
            }
            HookKind::InitializationStarted | HookKind::RunStarted | HookKind::TeardownStarted => {
                tracing::debug!(subsystem, "{kind}");
            }
            HookKind::WillRestart => {
                tracing::warn!(
                    subsystem,
                    restart = ?h.restart_count,
                    max_attempts = ?h.max_attempts,
                    delay = ?h.delay,
                    failures = ?h.failure_count,
                    error = ?error,
                    "{kind}"
                );
            }
            HookKind::Restarted => {
                tracing::info!(
                    subsystem,
                    restart = ?h.restart_count,
                    max_attempts = ?h.max_attempts,
                    "{kind}"
                );
            }
            HookKind::MaxRestartReached => {
                tracing::error!(
                    subsystem,
                    reason = ?h.reason,
                    restarts = ?h.restart_count,
                    circuit_open = ?h.circuit_open,
                    error = ?error,
                    "{kind}"
                );
            }
            HookKind::GraceExceeded | HookKind::TeardownTimedOut => {
                tracing::error!(reason = ?h.reason, duration = ?h.duration(), "{kind}");
            }
            HookKind::PluginAdded => {
                tracing::info!(plugin = subsystem, "{kind}");
            }
            HookKind::SubsystemStopped
            | HookKind::SubsystemResumed
            | HookKind::SubsystemTerminated => {
                tracing::info!(subsystem, "{kind}");
            }
            HookKind::ShutdownRequested | HookKind::AllTerminated => {
                tracing::info!(duration = ?h.duration(), "{kind}");
            }
        }
        Ok(())
    }
}
