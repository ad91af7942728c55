//! Subsystem contract and ready-made wrappers.
//!
//! ## Contents
//! - [`Subsystem`], [`SubsystemRef`] the lifecycle contract implemented by user code
//! - [`SubsystemFn`] run-only subsystem built from a closure
//! - [`ManagedSubsystem`] decorator that reports every lifecycle call as hooks
//!
//! ## Notes
//! - `run` gets a fresh child token per attempt; return once it is cancelled.
//! - Restarts call `run` again on the same value; keep cross-attempt state in
//!   fields guarded for concurrent access.

mod managed;
mod subsystem;
mod subsystem_fn;

pub use managed::ManagedSubsystem;
pub use subsystem::{Subsystem, SubsystemRef};
pub use subsystem_fn::SubsystemFn;
