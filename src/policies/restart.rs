//! # Restart modes and options.
//!
//! [`RestartMode`] decides whether a finished `run` attempt may be restarted at all.
//! [`RestartOptions`] bundles the mode with the limits the stateful
//! [`RestartPolicy`](super::RestartPolicy) enforces.
//!
//! | mode             | string           | restart after error | restart after success |
//! |------------------|------------------|---------------------|-----------------------|
//! | `Never`          | `no`             | no                  | n/a                   |
//! | `OnFailure`      | `on-failure`     | yes                 | n/a                   |
//! | `Always`         | `always`         | yes                 | n/a                   |
//! | `UnlessStopped`  | `unless-stopped` | yes                 | n/a                   |
//!
//! A successful `run` never consults the mode: the restart loop resets the
//! policy and runs the subsystem again.

use std::{fmt, str::FromStr, time::Duration};

use crate::policies::backoff::BackoffPolicy;

/// Whether a failed run may be restarted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RestartMode {
    /// Never restart.
    Never,
    /// Restart when `run` returned an error (default).
    #[default]
    OnFailure,
    /// Restart unconditionally.
    Always,
    /// Restart unless stopped; stop requests are handled by the loop itself,
    /// so for the policy this behaves like `Always`.
    UnlessStopped,
}

impl RestartMode {
    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartMode::Never => "no",
            RestartMode::OnFailure => "on-failure",
            RestartMode::Always => "always",
            RestartMode::UnlessStopped => "unless-stopped",
        }
    }
}

impl fmt::Display for RestartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown restart mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown restart mode {0:?} (expected no, on-failure, always or unless-stopped)")]
pub struct ParseRestartModeError(pub String);

impl FromStr for RestartMode {
    type Err = ParseRestartModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no" | "never" => Ok(RestartMode::Never),
            "on-failure" => Ok(RestartMode::OnFailure),
            "always" => Ok(RestartMode::Always),
            "unless-stopped" => Ok(RestartMode::UnlessStopped),
            other => Err(ParseRestartModeError(other.to_string())),
        }
    }
}

/// Time-windowed circuit breaker settings.
///
/// With `threshold = k` and `window = w`, `k` failures inside `w` open the
/// breaker; it stays open for `reset_timeout`, after which it closes and the
/// failure window starts empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitBreakerOptions {
    /// When `false`, failures are still counted but never open the breaker.
    pub enabled: bool,
    /// Failures inside `window` that open the breaker.
    pub threshold: u32,
    /// Sliding window for counting failures.
    pub window: Duration,
    /// How long the breaker stays open.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerOptions {
    /// Enabled; 3 failures within 10s open it for 30s.
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 3,
            window: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerOptions {
    /// A breaker that never opens.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Configuration of one subsystem's restart behavior.
///
/// ## Sentinel values
/// - `max_retries = 0` → unlimited restarts
/// - `max_retry_duration = 0s` → no limit on how long a failure episode may last
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestartOptions {
    /// Whether failures are restarted at all.
    pub mode: RestartMode,
    /// Restarts allowed within one failure episode.
    pub max_retries: u32,
    /// Longest a failure episode may last before restarts stop.
    pub max_retry_duration: Duration,
    /// Rapid-failure protection.
    pub circuit_breaker: CircuitBreakerOptions,
    /// Delay between restarts.
    pub backoff: BackoffPolicy,
}

impl Default for RestartOptions {
    /// `on-failure`, 5 retries, no duration limit, default breaker and backoff.
    fn default() -> Self {
        Self {
            mode: RestartMode::OnFailure,
            max_retries: 5,
            max_retry_duration: Duration::ZERO,
            circuit_breaker: CircuitBreakerOptions::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RestartOptions {
    /// Default options with the given mode.
    pub fn new(mode: RestartMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_max_retry_duration(mut self, d: Duration) -> Self {
        self.max_retry_duration = d;
        self
    }

    pub fn with_circuit_breaker(mut self, cb: CircuitBreakerOptions) -> Self {
        self.circuit_breaker = cb;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_string_forms_round_trip() {
        for mode in [
            RestartMode::Never,
            RestartMode::OnFailure,
            RestartMode::Always,
            RestartMode::UnlessStopped,
        ] {
            assert_eq!(mode.as_str().parse::<RestartMode>(), Ok(mode));
        }
        assert_eq!("never".parse::<RestartMode>(), Ok(RestartMode::Never));
        assert!("sometimes".parse::<RestartMode>().is_err());
    }

    #[test]
    fn test_documented_defaults() {
        let opts = RestartOptions::default();
        assert_eq!(opts.mode, RestartMode::OnFailure);
        assert_eq!(opts.max_retries, 5);
        assert!(opts.circuit_breaker.enabled);
        assert_eq!(opts.circuit_breaker.threshold, 3);
        assert_eq!(opts.circuit_breaker.window, Duration::from_secs(10));
        assert_eq!(opts.circuit_breaker.reset_timeout, Duration::from_secs(30));
        assert_eq!(opts.backoff.max, Duration::from_secs(300));
    }
}
