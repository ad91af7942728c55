//! Runtime core: restart loops and orchestration.
//!
//! The public API from this module is [`Supervisor`] (with its
//! [`SupervisorBuilder`] and [`SupervisorConfig`]) and [`SupervisedSubsystem`],
//! the restart loop around a single subsystem.
//!
//! Internal modules:
//! - [`control`]: stop / resume / terminate signals of one subsystem;
//! - [`runner`]: executes one interruptible run attempt;
//! - [`supervised`]: restart loop driven by the restart policy;
//! - [`supervisor`]: initialization order, shutdown grace, bounded teardown;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod control;
mod runner;
mod shutdown;
mod supervised;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervised::{SubsystemState, SubsystemStatus, SupervisedSubsystem};
pub use supervisor::Supervisor;
