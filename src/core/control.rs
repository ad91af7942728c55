//! # External controls of one supervised subsystem.
//!
//! [`Controls`] pairs two flags with three wake-up primitives:
//!
//! | control     | flag effect        | signal                                   |
//! |-------------|--------------------|------------------------------------------|
//! | `stop`      | `stopped = true`   | single-slot stop permit (`Notify`)       |
//! | `start`     | `stopped = false`  | single-slot resume permit (`Notify`)     |
//! | `terminate` | none               | persistent `CancellationToken`           |
//!
//! ## Rules
//! - The flags are the truth; permits are only wake-ups. A waiter that wakes on
//!   a stale permit re-reads the flag and goes back to sleep.
//! - A permit is never queued twice: a second `stop` while one is pending is a no-op.
//! - `terminate` is sticky and overrides both stop and resume.
//! - Everything is created in the constructor, so a subsystem that never ran can
//!   still be terminated.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Why an in-flight run attempt was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Stop,
    Terminate,
}

#[derive(Debug, Default)]
pub(crate) struct Controls {
    running: AtomicBool,
    stopped: AtomicBool,
    stop: Notify,
    resume: Notify,
    terminate: CancellationToken,
}

impl Controls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Marks the subsystem stopped and wakes the run watcher.
    pub(crate) fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.stop.notify_one();
        }
    }

    /// Clears the stopped flag and wakes the stopped wait.
    pub(crate) fn start(&self) {
        if self.stopped.swap(false, Ordering::AcqRel) {
            self.resume.notify_one();
        }
    }

    pub(crate) fn terminate(&self) {
        self.terminate.cancel();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminate.is_cancelled()
    }

    /// Resolves once `terminate` has been called.
    pub(crate) async fn terminated(&self) {
        self.terminate.cancelled().await
    }

    /// Resolves once the subsystem is no longer stopped.
    pub(crate) async fn resumed(&self) {
        while self.is_stopped() {
            self.resume.notified().await;
        }
    }

    /// Resolves on the first effective stop or terminate request.
    pub(crate) async fn interrupted(&self) -> Interrupt {
        loop {
            tokio::select! {
                biased;
                _ = self.terminate.cancelled() => return Interrupt::Terminate,
                _ = self.stop.notified() => {
                    if self.is_stopped() {
                        return Interrupt::Stop;
                    }
                }
            }
        }
    }

    /// Sets `running` until the returned guard is dropped.
    pub(crate) fn running_guard(&self) -> RunningGuard<'_> {
        self.running.store(true, Ordering::Release);
        RunningGuard {
            running: &self.running,
        }
    }
}

pub(crate) struct RunningGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_stop_and_start_flip_the_flag() {
        let c = Controls::new();
        assert!(!c.is_stopped());
        c.stop();
        c.stop();
        assert!(c.is_stopped());
        c.start();
        assert!(!c.is_stopped());
    }

    #[test]
    fn test_running_guard_resets_on_drop() {
        let c = Controls::new();
        {
            let _g = c.running_guard();
            assert!(c.is_running());
        }
        assert!(!c.is_running());
    }

    #[tokio::test]
    async fn test_stale_stop_permit_is_ignored() {
        let c = Controls::new();
        c.stop();
        c.start();
        // The stop permit is still stored but the flag says "not stopped".
        assert!(c.interrupted().now_or_never().is_none());

        c.terminate();
        assert_eq!(c.interrupted().await, Interrupt::Terminate);
        assert!(c.is_terminated());
    }

    #[tokio::test]
    async fn test_resumed_returns_immediately_when_not_stopped() {
        let c = Controls::new();
        assert!(c.resumed().now_or_never().is_some());

        c.stop();
        assert!(c.resumed().now_or_never().is_none());
        c.start();
        assert!(c.resumed().now_or_never().is_some());
    }
}
