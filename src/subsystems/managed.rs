//! # Hook-bracketing decorator.
//!
//! [`ManagedSubsystem`] wraps a [`SubsystemRef`] so every lifecycle call is
//! announced on the [`HookBus`]:
//!
//! ```text
//! initialize/run/teardown(ctx)
//!   ├─► start = clock.now()
//!   ├─► dispatch *Started { subject, started_at: start }
//!   ├─► inner.<method>(ctx).await      panic → Err(Fail("<method> panicked: .."))
//!   ├─► dispatch *Ended   { subject, started_at: start, ended_at: clock.now(), error }
//!   └─► return the inner result
//! ```
//!
//! Errors pass through unchanged. A panic in the inner call is caught and
//! reported as a failure of that call, so the restart policy sees it like any
//! other error.

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    clock::ClockRef,
    error::SubsystemError,
    hooks::{Hook, HookBus, HookKind},
    subsystems::subsystem::{Subsystem, SubsystemRef},
};

/// Subsystem wrapper that dispatches a started/ended hook pair around each call.
pub struct ManagedSubsystem {
    inner: SubsystemRef,
    name: Arc<str>,
    bus: Arc<HookBus>,
    clock: ClockRef,
}

impl ManagedSubsystem {
    /// Wraps `inner`, reporting to `bus` with timestamps from `clock`.
    pub fn new(inner: SubsystemRef, bus: Arc<HookBus>, clock: ClockRef) -> Self {
        let name: Arc<str> = Arc::from(inner.name());
        Self {
            inner,
            name,
            bus,
            clock,
        }
    }

    /// The wrapped subsystem.
    pub fn inner(&self) -> &SubsystemRef {
        &self.inner
    }

    async fn observe<F>(
        &self,
        call_name: &'static str,
        started: HookKind,
        ended: HookKind,
        call: F,
    ) -> Result<(), SubsystemError>
    where
        F: Future<Output = Result<(), SubsystemError>> + Send,
    {
        let start = self.clock.now();
        self.bus
            .dispatch(&Hook::new(started, start).with_subject(self.name.clone()))
            .await;

        let res = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => {
                let err = SubsystemError::panicked(call_name, payload.as_ref());
                tracing::error!(subsystem = %self.name, error = %err, "subsystem panicked");
                Err(err)
            }
        };

        let hook = Hook::new(ended, start)
            .with_subject(self.name.clone())
            .with_ended_at(self.clock.now())
            .with_result(&res);
        self.bus.dispatch(&hook).await;
        res
    }
}

#[async_trait]
impl Subsystem for ManagedSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.observe(
            "initialize",
            HookKind::InitializationStarted,
            HookKind::InitializationEnded,
            self.inner.initialize(ctx),
        )
        .await
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.observe(
            "run",
            HookKind::RunStarted,
            HookKind::RunEnded,
            self.inner.run(ctx),
        )
        .await
    }

    async fn teardown(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.observe(
            "teardown",
            HookKind::TeardownStarted,
            HookKind::TeardownEnded,
            self.inner.teardown(ctx),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{Clock, ManualClock},
        subsystems::SubsystemFn,
        testing::HookLog,
    };
    use std::time::{Duration, SystemTime};

    /// Advances the clock by one second on every lifecycle call.
    struct Ticking {
        clock: Arc<ManualClock>,
    }

    #[async_trait]
    impl Subsystem for Ticking {
        fn name(&self) -> &str {
            "ticking"
        }

        async fn initialize(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
            self.clock.tick(Duration::from_secs(1));
            Ok(())
        }

        async fn run(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
            self.clock.tick(Duration::from_secs(1));
            Err(SubsystemError::fail("run failed"))
        }

        async fn teardown(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
            self.clock.tick(Duration::from_secs(1));
            Ok(())
        }
    }

    async fn managed(inner: SubsystemRef, clock: ClockRef) -> (ManagedSubsystem, Arc<HookLog>) {
        let bus = Arc::new(HookBus::new(clock.clone()));
        let log = HookLog::new();
        bus.add_plugin(log.clone()).await;
        (ManagedSubsystem::new(inner, bus, clock), log)
    }

    #[tokio::test]
    async fn test_each_call_is_bracketed_by_hooks() {
        let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
        let inner = Arc::new(Ticking {
            clock: clock.clone(),
        });
        let (m, log) = managed(inner, clock.clone()).await;
        let ctx = CancellationToken::new();

        assert!(m.initialize(ctx.clone()).await.is_ok());
        assert!(m.run(ctx.clone()).await.is_err());
        assert!(m.teardown(ctx).await.is_ok());

        assert_eq!(
            log.kinds(),
            vec![
                HookKind::PluginAdded,
                HookKind::InitializationStarted,
                HookKind::InitializationEnded,
                HookKind::RunStarted,
                HookKind::RunEnded,
                HookKind::TeardownStarted,
                HookKind::TeardownEnded,
            ]
        );

        let run_ended = log.last(HookKind::RunEnded).unwrap();
        assert_eq!(run_ended.subject.as_deref(), Some("ticking"));
        assert_eq!(
            run_ended.started_at,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1)
        );
        assert_eq!(run_ended.duration(), Some(Duration::from_secs(1)));
        assert_eq!(run_ended.error, Some(SubsystemError::fail("run failed")));

        let init_ended = log.last(HookKind::InitializationEnded).unwrap();
        assert!(!init_ended.is_failure());
    }

    #[tokio::test]
    async fn test_error_is_returned_unchanged() {
        let clock: ClockRef = Arc::new(ManualClock::default());
        let inner: SubsystemRef = SubsystemFn::arc("cancelled", |_ctx: CancellationToken| async {
            Err::<(), _>(SubsystemError::Canceled)
        });
        let (m, _log) = managed(inner, clock.clone()).await;

        assert_eq!(m.name(), "cancelled");
        assert_eq!(
            m.run(CancellationToken::new()).await,
            Err(SubsystemError::Canceled)
        );
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_panic_becomes_a_failure_with_ended_hook() {
        let clock: ClockRef = Arc::new(ManualClock::default());
        let inner: SubsystemRef = SubsystemFn::arc("panicky", |_ctx: CancellationToken| async {
            if true {
                panic!("index out of bounds");
            }
            Ok::<_, SubsystemError>(())
        });
        let (m, log) = managed(inner, clock).await;

        let err = SubsystemError::fail("run panicked: index out of bounds");
        assert_eq!(m.run(CancellationToken::new()).await, Err(err.clone()));
        assert_eq!(
            log.kinds(),
            vec![HookKind::PluginAdded, HookKind::RunStarted, HookKind::RunEnded]
        );
        assert_eq!(log.last(HookKind::RunEnded).unwrap().error, Some(err));
    }
}
