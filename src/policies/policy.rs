//! # Stateful restart policy.
//!
//! [`RestartPolicy`] owns one subsystem's restart bookkeeping and answers the
//! restart loop's questions:
//!
//! ```text
//! run() -> Err(e)
//!   ├─► should_restart(e)?           pure function of the mode
//!   ├─► record_failure(e, now)        append, prune window, maybe open breaker
//!   ├─► check_restart(now)?           breaker / max retries / max duration
//!   ├─► next_retry_delay()            backoff(attempt_count)
//!   └─► record_attempt()              attempt_count += 1
//! run() -> Ok(())
//!   └─► reset_state()                 fresh episode
//! ```
//!
//! ## Rules
//! - All state sits behind one lock; every method is a single critical section,
//!   so "prune the window, then compare with the threshold" is atomic.
//! - An open breaker that has been open for at least `reset_timeout` is closed
//!   (and its window cleared) by the first call that looks at it.
//! - The max-retry-duration limit is measured from the first failure of the
//!   current episode, independently of the breaker's sliding window.

use std::{
    collections::VecDeque,
    fmt,
    time::{Duration, SystemTime},
};

use parking_lot::Mutex;

use crate::{clock::elapsed_between, error::SubsystemError};

use super::restart::{RestartMode, RestartOptions};

/// Why a restart was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDenied {
    /// The circuit breaker is open and its reset timeout has not elapsed.
    CircuitOpen,
    /// `max_retries` restarts were already made in this episode.
    MaxRetries,
    /// The episode has lasted longer than `max_retry_duration`.
    MaxDuration,
}

impl RestartDenied {
    /// Human-readable reason carried by the max-restart-reached hook.
    pub fn as_reason(&self) -> &'static str {
        match self {
            RestartDenied::CircuitOpen => "circuit breaker open",
            RestartDenied::MaxRetries => "max retries exceeded",
            RestartDenied::MaxDuration => "max retry duration exceeded",
        }
    }
}

impl fmt::Display for RestartDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reason())
    }
}

/// Consistent snapshot of a policy's bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartState {
    /// Restarts made in the current episode.
    pub attempt_count: u32,
    /// Failures inside the breaker window.
    pub failure_count: u32,
    /// Whether the breaker is open.
    pub circuit_open: bool,
    /// Last recorded failure.
    pub last_error: Option<SubsystemError>,
}

#[derive(Debug, Default)]
struct Inner {
    attempt_count: u32,
    failure_window: VecDeque<SystemTime>,
    episode_started_at: Option<SystemTime>,
    circuit_opened_at: Option<SystemTime>,
    last_error: Option<SubsystemError>,
}

/// Decision and bookkeeping object for one subsystem's restarts.
#[derive(Debug)]
pub struct RestartPolicy {
    options: RestartOptions,
    inner: Mutex<Inner>,
}

impl RestartPolicy {
    /// Creates a policy with fresh state.
    pub fn new(options: RestartOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The options this policy enforces.
    pub fn options(&self) -> &RestartOptions {
        &self.options
    }

    /// Whether the mode allows restarting after `result`. Does not touch state.
    pub fn should_restart(&self, result: &Result<(), SubsystemError>) -> bool {
        match self.options.mode {
            RestartMode::Never => false,
            RestartMode::Always | RestartMode::UnlessStopped => true,
            RestartMode::OnFailure => result.is_err(),
        }
    }

    /// Records a failure at `now` and opens the breaker if the threshold is reached.
    pub fn record_failure(&self, err: &SubsystemError, now: SystemTime) {
        let cb = &self.options.circuit_breaker;
        let mut inner = self.inner.lock();

        self.close_if_reset(&mut inner, now);

        inner.last_error = Some(err.clone());
        inner.episode_started_at.get_or_insert(now);
        inner.failure_window.push_back(now);

        while let Some(&oldest) = inner.failure_window.front() {
            if elapsed_between(oldest, now) > cb.window {
                inner.failure_window.pop_front();
            } else {
                break;
            }
        }

        if cb.enabled
            && inner.circuit_opened_at.is_none()
            && inner.failure_window.len() >= cb.threshold.max(1) as usize
        {
            inner.circuit_opened_at = Some(now);
        }
    }

    /// Returns why a restart at `now` is refused, if it is.
    ///
    /// Checks, in order: open breaker, max retries, max retry duration.
    pub fn check_restart(&self, now: SystemTime) -> Result<(), RestartDenied> {
        let mut inner = self.inner.lock();

        self.close_if_reset(&mut inner, now);
        if inner.circuit_opened_at.is_some() {
            return Err(RestartDenied::CircuitOpen);
        }

        let max_retries = self.options.max_retries;
        if max_retries > 0 && inner.attempt_count >= max_retries {
            return Err(RestartDenied::MaxRetries);
        }

        let max_duration = self.options.max_retry_duration;
        if max_duration > Duration::ZERO {
            if let Some(first) = inner.episode_started_at {
                if elapsed_between(first, now) > max_duration {
                    return Err(RestartDenied::MaxDuration);
                }
            }
        }

        Ok(())
    }

    /// `check_restart(now).is_ok()`.
    pub fn can_restart(&self, now: SystemTime) -> bool {
        self.check_restart(now).is_ok()
    }

    /// Delay before the next restart: the backoff for the current attempt count.
    pub fn next_retry_delay(&self) -> Duration {
        let attempt = self.inner.lock().attempt_count;
        self.options.backoff.next(attempt)
    }

    /// Counts one restart.
    pub fn record_attempt(&self) {
        let mut inner = self.inner.lock();
        inner.attempt_count = inner.attempt_count.saturating_add(1);
    }

    /// Starts a fresh episode: attempts, window, breaker and last error are cleared.
    pub fn reset_state(&self) {
        *self.inner.lock() = Inner::default();
    }

    /// Snapshot of the bookkeeping.
    pub fn state(&self) -> RestartState {
        let inner = self.inner.lock();
        RestartState {
            attempt_count: inner.attempt_count,
            failure_count: inner.failure_window.len() as u32,
            circuit_open: inner.circuit_opened_at.is_some(),
            last_error: inner.last_error.clone(),
        }
    }

    fn close_if_reset(&self, inner: &mut Inner, now: SystemTime) {
        if let Some(opened_at) = inner.circuit_opened_at {
            if elapsed_between(opened_at, now) >= self.options.circuit_breaker.reset_timeout {
                inner.circuit_opened_at = None;
                inner.failure_window.clear();
            }
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::new(RestartOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::{BackoffPolicy, CircuitBreakerOptions};

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000 + secs)
    }

    fn boom() -> SubsystemError {
        SubsystemError::fail("boom")
    }

    fn policy(options: RestartOptions) -> RestartPolicy {
        RestartPolicy::new(options)
    }

    #[test]
    fn test_never_never_restarts() {
        let p = policy(RestartOptions::new(RestartMode::Never));
        assert!(!p.should_restart(&Err(boom())));
        assert!(!p.should_restart(&Err(SubsystemError::Canceled)));
        assert!(!p.should_restart(&Ok(())));
    }

    #[test]
    fn test_always_ignores_the_error_value() {
        for mode in [RestartMode::Always, RestartMode::UnlessStopped] {
            let p = policy(RestartOptions::new(mode));
            assert!(p.should_restart(&Err(boom())));
            assert!(p.should_restart(&Err(SubsystemError::Canceled)));
            assert!(p.should_restart(&Ok(())));
        }
    }

    #[test]
    fn test_on_failure_follows_the_result() {
        let p = policy(RestartOptions::new(RestartMode::OnFailure));
        assert!(p.should_restart(&Err(boom())));
        assert!(!p.should_restart(&Ok(())));
    }

    #[test]
    fn test_should_restart_does_not_mutate() {
        let p = RestartPolicy::default();
        let before = p.state();
        let _ = p.should_restart(&Err(boom()));
        assert_eq!(p.state(), before);
    }

    #[test]
    fn test_breaker_opens_at_threshold_within_window() {
        let p = RestartPolicy::default();
        p.record_failure(&boom(), t(0));
        p.record_failure(&boom(), t(1));
        assert!(p.can_restart(t(1)));

        p.record_failure(&boom(), t(2));
        assert_eq!(p.check_restart(t(2)), Err(RestartDenied::CircuitOpen));
        assert!(p.state().circuit_open);
    }

    #[test]
    fn test_failures_outside_window_do_not_count() {
        let p = RestartPolicy::default();
        p.record_failure(&boom(), t(0));
        p.record_failure(&boom(), t(5));
        p.record_failure(&boom(), t(12));
        assert_eq!(p.state().failure_count, 2);
        assert!(p.can_restart(t(12)));
    }

    #[test]
    fn test_breaker_closes_after_reset_timeout_and_needs_k_more() {
        let p = RestartPolicy::default();
        for s in 0..3 {
            p.record_failure(&boom(), t(s));
        }
        // Opened at t(2); reset timeout is 30s.
        assert!(!p.can_restart(t(31)));
        assert!(p.can_restart(t(32)));

        let state = p.state();
        assert!(!state.circuit_open);
        assert_eq!(state.failure_count, 0);

        p.record_failure(&boom(), t(33));
        p.record_failure(&boom(), t(34));
        assert!(p.can_restart(t(34)));
        p.record_failure(&boom(), t(35));
        assert_eq!(p.check_restart(t(35)), Err(RestartDenied::CircuitOpen));
    }

    #[test]
    fn test_failure_after_reset_timeout_starts_a_new_window() {
        let p = RestartPolicy::default();
        for s in 0..3 {
            p.record_failure(&boom(), t(s));
        }
        p.record_failure(&boom(), t(40));
        let state = p.state();
        assert!(!state.circuit_open);
        assert_eq!(state.failure_count, 1);
    }

    #[test]
    fn test_disabled_breaker_never_opens() {
        let p = policy(
            RestartOptions::default()
                .with_max_retries(0)
                .with_circuit_breaker(CircuitBreakerOptions::disabled()),
        );
        for s in 0..20 {
            p.record_failure(&boom(), t(s / 4));
        }
        assert!(p.can_restart(t(5)));
        assert!(!p.state().circuit_open);
    }

    #[test]
    fn test_max_retries() {
        let p = policy(
            RestartOptions::default()
                .with_max_retries(2)
                .with_circuit_breaker(CircuitBreakerOptions::disabled()),
        );
        assert!(p.can_restart(t(0)));
        p.record_attempt();
        assert!(p.can_restart(t(0)));
        p.record_attempt();
        assert_eq!(p.check_restart(t(0)), Err(RestartDenied::MaxRetries));
    }

    #[test]
    fn test_zero_max_retries_is_unlimited() {
        let p = policy(RestartOptions::default().with_max_retries(0));
        for _ in 0..1_000 {
            p.record_attempt();
        }
        assert!(p.can_restart(t(0)));
    }

    #[test]
    fn test_max_retry_duration_from_first_failure() {
        let p = policy(
            RestartOptions::default()
                .with_max_retries(0)
                .with_max_retry_duration(Duration::from_secs(60))
                .with_circuit_breaker(CircuitBreakerOptions::disabled()),
        );
        p.record_failure(&boom(), t(0));
        assert!(p.can_restart(t(60)));
        p.record_failure(&boom(), t(61));
        assert_eq!(p.check_restart(t(61)), Err(RestartDenied::MaxDuration));
    }

    #[test]
    fn test_breaker_is_checked_before_max_retries() {
        let p = policy(RestartOptions::default().with_max_retries(1));
        p.record_attempt();
        for s in 0..3 {
            p.record_failure(&boom(), t(s));
        }
        assert_eq!(p.check_restart(t(3)), Err(RestartDenied::CircuitOpen));
    }

    #[test]
    fn test_delay_doubles_with_attempts_and_is_capped() {
        let p = policy(RestartOptions::default().with_max_retries(0));
        let mut prev = Duration::ZERO;
        for attempt in 0..20u32 {
            let d = p.next_retry_delay();
            let expected =
                Duration::from_secs(2u64.saturating_pow(attempt)).min(Duration::from_secs(300));
            assert_eq!(d, expected);
            assert!(d >= prev);
            prev = d;
            p.record_attempt();
        }
    }

    #[test]
    fn test_custom_backoff_is_used() {
        let backoff = BackoffPolicy::fixed(Duration::from_millis(10));
        let p = policy(RestartOptions::default().with_backoff(backoff));
        p.record_attempt();
        p.record_attempt();
        assert_eq!(p.next_retry_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_reset_makes_next_failure_look_like_the_first() {
        let p = RestartPolicy::default();
        let fresh = RestartPolicy::default();

        for s in 0..3 {
            p.record_failure(&boom(), t(s));
            p.record_attempt();
        }
        assert!(p.state().circuit_open);

        p.reset_state();
        assert_eq!(p.state(), RestartState::default());

        p.record_failure(&boom(), t(4));
        fresh.record_failure(&boom(), t(4));
        assert_eq!(p.state(), fresh.state());
        assert_eq!(p.next_retry_delay(), fresh.next_retry_delay());
        assert_eq!(p.check_restart(t(4)), fresh.check_restart(t(4)));
    }

    #[test]
    fn test_last_error_is_tracked() {
        let p = RestartPolicy::default();
        p.record_failure(&SubsystemError::fail("first"), t(0));
        p.record_failure(&SubsystemError::fail("second"), t(1));
        assert_eq!(p.state().last_error, Some(SubsystemError::fail("second")));
    }
}
