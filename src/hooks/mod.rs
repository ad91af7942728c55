//! Lifecycle hooks: types, the plugin contract and the dispatching bus.
//!
//! ## Contents
//! - [`HookKind`], [`Hook`] hook classification and payload
//! - [`Plugin`] observer contract
//! - [`HookBus`] ordered, failure-isolated, reentrant dispatch
//!
//! ## Quick reference
//! - **Emitters**: `ManagedSubsystem` (lifecycle pairs), `SupervisedSubsystem`
//!   (restart decisions, stop/resume/terminate), `Supervisor` (shutdown, teardown),
//!   `HookBus::add_plugin` (plugin added).
//! - **Consumers**: every registered [`Plugin`], e.g. the built-in `LogWriter`.

mod bus;
mod hook;
mod plugin;

pub use bus::HookBus;
pub use hook::{Hook, HookKind};
pub use plugin::Plugin;
