//! # subvisor
//!
//! **Subvisor** is an in-process supervision runtime for Rust.
//!
//! It manages the lifecycle (initialize / run / teardown) of independently
//! failing, long-running subsystems, restarts them according to a configurable
//! policy, and broadcasts every lifecycle transition to pluggable observers that
//! can never block or break the core.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Subsystem   │   │  Subsystem   │   │  Subsystem   │
//!     │ (user code)  │   │ (user code)  │   │ (user code)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - initialize in registration order (first error aborts)          │
//! │  - one restart loop task per subsystem                            │
//! │  - shutdown: terminate all, wait within grace                     │
//! │  - teardown: concurrent, bounded by teardown_timeout              │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//!  │ Supervised      │ │ Supervised      │ │ Supervised      │
//!  │ Subsystem       │ │ Subsystem       │ │ Subsystem       │
//!  │ (restart loop + │ │ (restart loop + │ │ (restart loop + │
//!  │  RestartPolicy) │ │  RestartPolicy) │ │  RestartPolicy) │
//!  └───────┬─────────┘ └───────┬─────────┘ └───────┬─────────┘
//!          ▼                   ▼                   ▼
//!   ManagedSubsystem    ManagedSubsystem    ManagedSubsystem
//!   (*Started / *Ended hooks around every lifecycle call)
//!          │                   │                   │
//!          └─────────── dispatch(&Hook) ───────────┘
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ HookBus: plugins called in registration order, on the caller's    │
//! │ task; errors and panics are logged and skipped                    │
//! └───────────────────────────────────────────────────────────────────┘
//!                 ▼              ▼              ▼
//!             plugin 1       plugin 2  ...  plugin N
//! ```
//!
//! ### Restart loop
//! ```text
//! loop {
//!   ├─► stopped?  → wait { start, terminate, parent cancel }
//!   ├─► run_once(child token)          stop/terminate cancel the child
//!   │       ├─ Ok  ──► policy.reset_state(), run again
//!   │       └─ Err ──► should_restart? ── no ──► Failed, return Err
//!   │                  record_failure(now)
//!   │                  check_restart(now) ── denied ──► MaxRestartReached{reason}, return Err
//!   │                  WillRestart{delay} ─► sleep (cancellable) ─► Restarted
//!   └─ exit: terminate → Ok(()), parent cancel → Err(Canceled)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                                  |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------------------|
//! | **Subsystems**    | Units of work with initialize / run / teardown.              | [`Subsystem`], [`SubsystemRef`], [`SubsystemFn`]    |
//! | **Hooks**         | Observe every lifecycle transition.                          | [`Plugin`], [`Hook`], [`HookKind`], [`HookBus`]     |
//! | **Policies**      | Restart modes, retry limits, backoff, circuit breaker.       | [`RestartOptions`], [`RestartPolicy`], [`BackoffPolicy`] |
//! | **Supervision**   | Restart loops, stop / start / terminate, bounded shutdown.   | [`Supervisor`], [`SupervisedSubsystem`]             |
//! | **Time**          | Injectable clocks for deterministic tests.                   | [`Clock`], [`ManualClock`], [`SwappableClock`]      |
//! | **Errors**        | Typed errors for supervision and subsystem calls.            | [`SupervisorError`], [`SubsystemError`]             |
//! | **Configuration** | Shutdown bounds.                                             | [`SupervisorConfig`]                                |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] plugin (renders hooks through `tracing`).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use subvisor::{
//!     RestartMode, RestartOptions, SubsystemError, SubsystemFn, SubsystemRef, SupervisorBuilder,
//!     SupervisorConfig,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker: SubsystemRef = SubsystemFn::arc("worker", |ctx: CancellationToken| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => Err::<(), _>(SubsystemError::Canceled),
//!             _ = tokio::time::sleep(Duration::from_millis(10)) => Err(SubsystemError::fail("lost connection")),
//!         }
//!     });
//!
//!     #[allow(unused_mut)]
//!     let mut builder = SupervisorBuilder::new(SupervisorConfig::default())
//!         .with_supervised(worker, RestartOptions::new(RestartMode::OnFailure).with_max_retries(2));
//!     #[cfg(feature = "logging")]
//!     {
//!         builder = builder.with_plugin(std::sync::Arc::new(subvisor::LogWriter::new()));
//!     }
//!     let sup = builder.build().await;
//!
//!     let token = CancellationToken::new();
//!     sup.initialize(token.clone()).await?;
//!     // `serve()` would wait for SIGINT/SIGTERM instead.
//!     token.cancel();
//!     let _ = sup.run(token).await;
//!     sup.teardown(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

mod clock;
mod core;
mod error;
mod hooks;
mod plugins;
mod policies;
mod subsystems;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use clock::{Clock, ClockRef, ManualClock, SwappableClock, SystemClock};
pub use crate::core::{
    SubsystemState, SubsystemStatus, SupervisedSubsystem, Supervisor, SupervisorBuilder,
    SupervisorConfig,
};
pub use error::{SubsystemError, SupervisorError};
pub use hooks::{Hook, HookBus, HookKind, Plugin};
pub use policies::{
    BackoffPolicy, CircuitBreakerOptions, JitterPolicy, ParseRestartModeError, RestartDenied,
    RestartMode, RestartOptions, RestartPolicy, RestartState,
};
pub use subsystems::{ManagedSubsystem, Subsystem, SubsystemFn, SubsystemRef};

// Optional: expose a simple built-in logger plugin (demo/reference).
#[cfg(feature = "logging")]
pub use plugins::LogWriter;
