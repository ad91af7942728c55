//! # Injectable time sources.
//!
//! Everything that records *when* something happened (restart policy failure
//! windows, hook timestamps) reads time through [`Clock`] instead of calling
//! [`SystemTime::now`] directly, so timing logic can be driven deterministically
//! in tests.
//!
//! - [`SystemClock`] wall clock, the default.
//! - [`ManualClock`] only moves when told to (`set` / `tick`).
//! - [`SwappableClock`] forwards to an inner clock that can be replaced at runtime.
//!
//! Sleeping (backoff delays, timeouts) still goes through `tokio::time`; pause
//! the tokio clock in tests to make those instantaneous.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use parking_lot::{Mutex, RwLock};

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// Shared clock handle.
pub type ClockRef = Arc<dyn Clock>;

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock whose value only changes through [`ManualClock::set`] and [`ManualClock::tick`].
///
/// # Example
/// ```
/// use std::time::{Duration, SystemTime};
/// use subvisor::{Clock, ManualClock};
///
/// let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
/// clock.tick(Duration::from_secs(3));
/// assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(3));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn tick(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Sets the clock to an absolute time (may move backwards).
    pub fn set(&self, at: SystemTime) {
        *self.now.lock() = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}

/// Clock that delegates to a replaceable inner clock.
///
/// `swap` and `now` may be called concurrently; a reader observes either the old
/// or the new clock, never a torn state.
pub struct SwappableClock {
    inner: RwLock<ClockRef>,
}

impl SwappableClock {
    /// Wraps `clock`.
    pub fn new(clock: ClockRef) -> Self {
        Self {
            inner: RwLock::new(clock),
        }
    }

    /// Replaces the inner clock, returning the previous one.
    pub fn swap(&self, clock: ClockRef) -> ClockRef {
        std::mem::replace(&mut *self.inner.write(), clock)
    }
}

impl Default for SwappableClock {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Clock for SwappableClock {
    fn now(&self) -> SystemTime {
        let clock = Arc::clone(&self.inner.read());
        clock.now()
    }
}

/// Elapsed time from `earlier` to `later`, zero if the clock went backwards.
pub(crate) fn elapsed_between(earlier: SystemTime, later: SystemTime) -> Duration {
    later.duration_since(earlier).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_set_and_tick() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.tick(Duration::from_millis(1500));
        assert_eq!(clock.now(), start + Duration::from_millis(1500));

        clock.set(SystemTime::UNIX_EPOCH);
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_swappable_clock_follows_swap() {
        let a = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH));
        let b = Arc::new(ManualClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(60),
        ));
        let clock = SwappableClock::new(a.clone());
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);

        let prev = clock.swap(b.clone());
        assert_eq!(prev.now(), SystemTime::UNIX_EPOCH);
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(60));

        b.tick(Duration::from_secs(1));
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(61));
    }

    #[test]
    fn test_swap_concurrent_with_reads() {
        let clock = Arc::new(SwappableClock::new(Arc::new(ManualClock::default())));
        let reader = {
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    let _ = clock.now();
                }
            })
        };
        for i in 0..1_000 {
            clock.swap(Arc::new(ManualClock::new(
                SystemTime::UNIX_EPOCH + Duration::from_secs(i),
            )));
        }
        assert!(reader.join().is_ok());
    }

    #[test]
    fn test_elapsed_between_saturates() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(elapsed_between(t, t + Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(elapsed_between(t, SystemTime::UNIX_EPOCH), Duration::ZERO);
    }
}
