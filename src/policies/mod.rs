//! Restart policies.
//!
//! This module groups the knobs that control **if/when** a failed subsystem is
//! restarted and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RestartMode`]     whether failures are restarted (no / on-failure / always / unless-stopped)
//! - [`RestartOptions`]  mode + max retries + max retry duration + breaker + backoff
//! - [`RestartPolicy`]   the stateful decision object built from options
//! - [`BackoffPolicy`]   how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]    randomization to avoid synchronized restarts
//!
//! ## Quick wiring
//! ```text
//! Supervisor::builder().with_supervised(sub, RestartOptions)
//!      └─► core::supervised::SupervisedSubsystem owns a RestartPolicy:
//!           - should_restart / record_failure / check_restart to decide
//!           - next_retry_delay to schedule, record_attempt to count
//!           - reset_state after every successful run
//! ```
//!
//! ## Defaults
//! - `on-failure`, 5 retries, breaker 3 failures / 10s window / 30s reset.
//! - Backoff `min(2^attempt s, 5min)`, no jitter.

mod backoff;
mod jitter;
mod policy;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use policy::{RestartDenied, RestartPolicy, RestartState};
pub use restart::{CircuitBreakerOptions, ParseRestartModeError, RestartMode, RestartOptions};
