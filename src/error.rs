//! Error types used by the supervision runtime and by subsystems.
//!
//! This module defines two main error enums:
//!
//! - [`SupervisorError`]: errors raised by the supervisor itself.
//! - [`SubsystemError`]: errors raised by individual subsystem lifecycle calls.
//!
//! Both types provide `as_label` for logs/metrics. Every supervisor error that
//! concerns one subsystem carries that subsystem's name.

use std::{any::Any, time::Duration};
use thiserror::Error;

/// # Errors produced by the supervisor.
///
/// Initialization and teardown failures are attributed to exactly one subsystem.
/// [`SupervisorError::TeardownTimeout`] is the unrecoverable case: some subsystem
/// never finished its teardown and may still hold resources.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// A subsystem failed to initialize; remaining initializations were skipped.
    #[error("subsystem {name:?} failed to initialize: {source}")]
    Initialization {
        /// Name of the failing subsystem.
        name: String,
        /// The subsystem's own error.
        #[source]
        source: SubsystemError,
    },

    /// No subsystem with this name is registered.
    #[error("subsystem {name:?} not found")]
    UnknownSubsystem {
        /// The requested name.
        name: String,
    },

    /// A control call arrived before [`Supervisor::initialize`](crate::Supervisor::initialize).
    #[error("supervisor is not initialized")]
    NotInitialized,

    /// The run was ended by its parent cancellation token (shutdown request).
    #[error("supervisor run cancelled")]
    Canceled,

    /// Some restart loops did not acknowledge termination within the grace period.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Subsystems still running when the grace period ran out.
        stuck: Vec<String>,
    },

    /// A subsystem's teardown returned an error.
    #[error("subsystem {name:?} failed to tear down: {source}")]
    Teardown {
        /// Name of the failing subsystem.
        name: String,
        /// The subsystem's own error.
        #[source]
        source: SubsystemError,
    },

    /// Teardown did not complete within the bounded timeout.
    #[error("teardown timeout {timeout:?} exceeded; stuck: {stuck:?}; resources may have leaked")]
    TeardownTimeout {
        /// The configured teardown timeout.
        timeout: Duration,
        /// Subsystems whose teardown never returned.
        stuck: Vec<String>,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use subvisor::SupervisorError;
    /// use std::time::Duration;
    ///
    /// let err = SupervisorError::TeardownTimeout { timeout: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "supervisor_teardown_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::Initialization { .. } => "supervisor_initialization_failed",
            SupervisorError::UnknownSubsystem { .. } => "supervisor_unknown_subsystem",
            SupervisorError::NotInitialized => "supervisor_not_initialized",
            SupervisorError::Canceled => "supervisor_canceled",
            SupervisorError::GraceExceeded { .. } => "supervisor_grace_exceeded",
            SupervisorError::Teardown { .. } => "supervisor_teardown_failed",
            SupervisorError::TeardownTimeout { .. } => "supervisor_teardown_timeout",
        }
    }

    /// True for integrity violations that must not be silently continued past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SupervisorError::TeardownTimeout { .. })
    }

    /// Name of the subsystem this error is attributed to, if any.
    pub fn subsystem(&self) -> Option<&str> {
        match self {
            SupervisorError::Initialization { name, .. }
            | SupervisorError::UnknownSubsystem { name }
            | SupervisorError::Teardown { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// # Errors produced by subsystem lifecycle calls.
///
/// Values are cheap to clone so the same error can travel in hooks, in the
/// subsystem status, and back to the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubsystemError {
    /// The call failed; the restart policy decides what happens next.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The call observed cancellation of its context.
    #[error("context cancelled")]
    Canceled,
}

impl SubsystemError {
    /// Shorthand for [`SubsystemError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        SubsystemError::Fail {
            error: error.into(),
        }
    }

    /// Failure for a lifecycle call (`call`) that panicked with `payload`.
    pub(crate) fn panicked(call: &str, payload: &(dyn Any + Send)) -> Self {
        SubsystemError::fail(format!("{call} panicked: {}", panic_message(payload)))
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use subvisor::SubsystemError;
    ///
    /// assert_eq!(SubsystemError::fail("boom").as_label(), "subsystem_failed");
    /// assert_eq!(SubsystemError::Canceled.as_label(), "subsystem_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubsystemError::Fail { .. } => "subsystem_failed",
            SubsystemError::Canceled => "subsystem_canceled",
        }
    }
}

impl From<anyhow::Error> for SubsystemError {
    fn from(err: anyhow::Error) -> Self {
        SubsystemError::Fail {
            error: format!("{err:#}"),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_error_names_subsystem() {
        let err = SupervisorError::Initialization {
            name: "db".into(),
            source: SubsystemError::fail("no connection"),
        };
        assert_eq!(err.subsystem(), Some("db"));
        assert!(err.to_string().contains("\"db\""));
        assert!(err.to_string().contains("no connection"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_only_teardown_timeout_is_fatal() {
        let timeout = SupervisorError::TeardownTimeout {
            timeout: Duration::from_secs(1),
            stuck: vec!["a".into()],
        };
        assert!(timeout.is_fatal());
        assert!(!SupervisorError::Canceled.is_fatal());
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err: SubsystemError = anyhow::anyhow!("inner").context("outer").into();
        assert_eq!(
            err,
            SubsystemError::Fail {
                error: "outer: inner".into()
            }
        );
    }
}
