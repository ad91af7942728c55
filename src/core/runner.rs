//! # Run a single attempt of a subsystem.
//!
//! Executes one `run` call with a per-attempt child token and cancels that token
//! as soon as a stop or terminate request arrives.
//!
//! ## Flow
//!
//! ```text
//! child = parent.child_token()
//! running = true
//! select {
//!   run(child)        → Ok/Err          → Attempt { result, interrupted: None }
//!   controls.interrupted() → Stop/Terminate
//!                     → child.cancel()
//!                     → run(child).await → Attempt { result, interrupted: Some(..) }
//! }
//! running = false, child cancelled (drop guard)
//! ```
//!
//! ## Rules
//! - The watcher lives inside this call: it cannot outlive the attempt.
//! - Parent cancellation reaches `run` through the child token.
//! - Child cancellation does **not** affect the parent.

use tokio_util::sync::CancellationToken;

use crate::{
    core::control::{Controls, Interrupt},
    error::SubsystemError,
    subsystems::Subsystem,
};

/// Outcome of one run attempt.
#[derive(Debug)]
pub(crate) struct Attempt {
    pub result: Result<(), SubsystemError>,
    /// Set when a control request cancelled the attempt.
    pub interrupted: Option<Interrupt>,
}

/// Executes one attempt of `sub` under `parent`, interruptible through `controls`.
pub(crate) async fn run_once<S: Subsystem + ?Sized>(
    sub: &S,
    parent: &CancellationToken,
    controls: &Controls,
) -> Attempt {
    let child = parent.child_token();
    let _cancel_on_exit = child.clone().drop_guard();
    let _running = controls.running_guard();

    let mut run = sub.run(child.clone());
    let mut interrupted = None;

    let finished = tokio::select! {
        res = &mut run => Some(res),
        why = controls.interrupted() => {
            interrupted = Some(why);
            None
        }
    };

    let result = match finished {
        Some(res) => res,
        None => {
            child.cancel();
            run.await
        }
    };

    Attempt {
        result,
        interrupted,
    }
}
