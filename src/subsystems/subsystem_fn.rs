//! # Closure-backed subsystem (`SubsystemFn`)
//!
//! [`SubsystemFn`] wraps a closure `F: Fn(CancellationToken) -> Fut` and calls it
//! for every `run`, producing a fresh future each time. State that must survive
//! restarts has to live in an explicit `Arc<...>` captured by the closure.
//!
//! `initialize` and `teardown` are no-ops.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use subvisor::{SubsystemError, SubsystemFn, SubsystemRef};
//!
//! let s: SubsystemRef = SubsystemFn::arc("ticker", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, SubsystemError>(())
//! });
//!
//! assert_eq!(s.name(), "ticker");
//! ```

use std::{borrow::Cow, future::Future, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{error::SubsystemError, subsystems::subsystem::Subsystem};

/// Function-backed subsystem.
pub struct SubsystemFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SubsystemFn<F> {
    /// Creates a new function-backed subsystem.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the subsystem and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Subsystem for SubsystemFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SubsystemError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_each_run_builds_a_fresh_future() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let s = SubsystemFn::arc("counter", move |_ctx: CancellationToken| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let token = CancellationToken::new();
        assert!(s.initialize(token.clone()).await.is_ok());
        assert!(s.run(token.clone()).await.is_ok());
        assert!(s.run(token.clone()).await.is_ok());
        assert!(s.teardown(token).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
