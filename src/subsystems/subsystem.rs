//! # Subsystem contract.
//!
//! A subsystem is a long-running unit of work with a three-phase lifecycle.
//! The shared handle type is [`SubsystemRef`], an `Arc<dyn Subsystem>`.
//!
//! Each phase receives a [`CancellationToken`]; `run` in particular should watch
//! it and return promptly once it is cancelled (stop, terminate or shutdown).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SubsystemError;

/// # Restartable, cancelable unit of work.
///
/// `name` is the subsystem's identity and must be unique within one supervisor.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use subvisor::{Subsystem, SubsystemError};
///
/// struct Poller;
///
/// #[async_trait]
/// impl Subsystem for Poller {
///     fn name(&self) -> &str { "poller" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
///         ctx.cancelled().await;
///         Err(SubsystemError::Canceled)
///     }
/// }
/// ```
#[async_trait]
pub trait Subsystem: Send + Sync + 'static {
    /// Stable, unique name.
    fn name(&self) -> &str;

    /// Prepares resources before the first run. Default: nothing.
    async fn initialize(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Does the work. Blocks until the work is done, fails, or `ctx` is cancelled.
    ///
    /// May be called many times: after every restart and after every clean return.
    async fn run(&self, ctx: CancellationToken) -> Result<(), SubsystemError>;

    /// Releases resources. Default: nothing.
    async fn teardown(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
        Ok(())
    }
}

/// Shared subsystem handle.
pub type SubsystemRef = Arc<dyn Subsystem>;
