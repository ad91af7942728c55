//! # Core plugin trait
//!
//! `Plugin` is the extension point for observing the runtime. Plugins are
//! registered on a [`HookBus`] and called for every [`Hook`], in registration
//! order, on the task that dispatched the hook.
//!
//! ## Contract
//! - `on_hook` runs inline with the dispatching subsystem: keep it short, or
//!   hand the work off to your own task/queue.
//! - Returning an error (or panicking) never reaches the code that emitted the
//!   hook; the failure is logged and dispatch moves on to the next plugin.
//! - A plugin may register further plugins through the `bus` argument; they
//!   receive the rest of the current dispatch as well as every later one.
//!
//! ## Example
//! ```rust
//! use subvisor::{Hook, HookBus, HookKind, Plugin};
//! use async_trait::async_trait;
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Plugin for Alerts {
//!     fn name(&self) -> &str { "alerts" }
//!
//!     async fn on_hook(&self, _bus: &HookBus, hook: &Hook) -> anyhow::Result<()> {
//!         if hook.kind == HookKind::MaxRestartReached {
//!             // page someone...
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use super::{bus::HookBus, hook::Hook};

/// Contract for hook observers.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str;

    /// Handle a single hook.
    ///
    /// # Parameters
    /// - `bus`: the bus dispatching this hook (may be used to add plugins)
    /// - `hook`: the hook itself
    async fn on_hook(&self, bus: &HookBus, hook: &Hook) -> anyhow::Result<()>;
}
