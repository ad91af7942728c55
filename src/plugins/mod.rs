//! Built-in plugins.
//!
//! - [`LogWriter`] renders every hook as a `tracing` event (feature `logging`).

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
