/*!
 * Time Source
 *
 * Deadlines are absolute offsets from a clock's epoch, expressed as
 * `Duration`. The wall clock counts from the Unix epoch (like a POSIX
 * `abstime`); the monotonic clock counts from the first time it was read
 * in this process.
 */

use crate::core::errors::ClockError;
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of the current time
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// Time elapsed since this clock's epoch
    fn now(&self) -> Result<Duration, ClockError>;

    /// Absolute deadline `timeout` from now
    fn deadline_after(&self, timeout: Duration) -> Result<Duration, ClockError> {
        Ok(self.now()?.saturating_add(timeout))
    }
}

/// Realtime clock measured from the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl WallClock {
    /// Convert a wall-clock instant into a deadline for this clock
    pub fn at(time: SystemTime) -> Duration {
        time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO)
    }
}

impl Clock for WallClock {
    #[inline]
    fn now(&self) -> Result<Duration, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ClockError::BeforeEpoch)
    }
}

static MONOTONIC_ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Monotonic clock anchored at its first use in the process
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    fn anchor() -> Instant {
        *MONOTONIC_ANCHOR.get_or_init(Instant::now)
    }

    /// Convert an `Instant` into a deadline for this clock
    ///
    /// Instants earlier than the anchor map to zero, which is always in
    /// the past.
    pub fn at(instant: Instant) -> Duration {
        instant.saturating_duration_since(Self::anchor())
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Result<Duration, ClockError> {
        Ok(Self::anchor().elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_advances() {
        let clock = MonotonicClock;
        let a = clock.now().unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.now().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_monotonic_at_matches_now() {
        let clock = MonotonicClock;
        let before = clock.now().unwrap();
        let at = MonotonicClock::at(Instant::now());
        let after = clock.now().unwrap();
        assert!(before <= at && at <= after);
    }

    #[test]
    fn test_wall_clock_after_epoch() {
        let now = WallClock.now().unwrap();
        assert!(now > Duration::from_secs(1_600_000_000));
        assert_eq!(WallClock::at(UNIX_EPOCH), Duration::ZERO);
    }

    struct FixedClock(Duration);

    impl Clock for FixedClock {
        fn now(&self) -> Result<Duration, ClockError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_deadline_after() {
        let clock = FixedClock(Duration::from_secs(5));
        assert_eq!(
            clock.deadline_after(Duration::from_millis(250)).unwrap(),
            Duration::from_millis(5_250)
        );
    }
}
