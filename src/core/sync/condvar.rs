/*!
 * Spin Condition Variable
 *
 * Guard-based handle over the spin table, shaped like
 * `parking_lot::Condvar` so it can be dropped in next to a
 * `parking_lot::Mutex`.
 */

use super::clock::{Clock, MonotonicClock};
use super::lifecycle::global;
use super::ordering::{acquire_barrier, release_barrier};
use super::slot::CondId;
use super::table::{SpinTable, WaitStatus};
use parking_lot::MutexGuard;
use std::time::{Duration, Instant};

/// Condition variable that spins instead of parking
///
/// Each handle draws a fresh [`CondId`], so handles created one after
/// another land in different slots until the table wraps around.
///
/// # Examples
///
/// ```
/// use parking_lot::Mutex;
/// use spincond::SpinCondvar;
/// use std::sync::Arc;
/// use std::thread;
///
/// let pair = Arc::new((Mutex::new(false), SpinCondvar::new()));
/// let pair2 = pair.clone();
///
/// thread::spawn(move || {
///     let (lock, cvar) = &*pair2;
///     *lock.lock() = true;
///     cvar.notify_one();
/// });
///
/// let (lock, cvar) = &*pair;
/// let mut ready = lock.lock();
/// while !*ready {
///     cvar.wait(&mut ready);
/// }
/// ```
#[derive(Debug)]
pub struct SpinCondvar<'t> {
    id: CondId,
    table: &'t SpinTable,
}

impl SpinCondvar<'static> {
    /// Handle on the process-wide table
    pub fn new() -> Self {
        Self::in_table(global())
    }
}

impl Default for SpinCondvar<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'t> SpinCondvar<'t> {
    /// Handle on a caller-owned table
    pub fn in_table(table: &'t SpinTable) -> Self {
        Self {
            id: CondId::next(),
            table,
        }
    }

    #[inline]
    pub fn id(&self) -> CondId {
        self.id
    }

    /// Release the guard's mutex, spin one budget, relock
    ///
    /// May return without a notification; re-check the predicate.
    pub fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        MutexGuard::unlocked(guard, || {
            release_barrier();
            self.table.spin_once(self.id);
            acquire_barrier();
        });
    }

    /// Wait until notified or `deadline` passes
    ///
    /// The mutex is left untouched when the deadline is already in the past.
    pub fn wait_until<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Instant,
    ) -> WaitStatus {
        self.wait_until_offset(guard, MonotonicClock::at(deadline))
    }

    /// Wait until notified or `timeout` elapses
    pub fn wait_for<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
    ) -> WaitStatus {
        let deadline = MonotonicClock
            .deadline_after(timeout)
            .unwrap_or(Duration::MAX);
        self.wait_until_offset(guard, deadline)
    }

    /// Wait while `condition` holds
    pub fn wait_while<T, F>(&self, guard: &mut MutexGuard<'_, T>, mut condition: F)
    where
        T: ?Sized,
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut **guard) {
            self.wait(guard);
        }
    }

    fn wait_until_offset<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Duration,
    ) -> WaitStatus {
        let clock = MonotonicClock;
        match clock.now() {
            Ok(now) if now < deadline => {}
            _ => return WaitStatus::TimedOut,
        }

        let consumed = MutexGuard::unlocked(guard, || {
            release_barrier();
            let consumed = self.table.spin_until(self.id, &clock, deadline);
            acquire_barrier();
            consumed
        });

        match consumed {
            Ok(true) => WaitStatus::Signaled,
            _ => WaitStatus::TimedOut,
        }
    }

    /// Post one wakeup credit
    #[inline]
    pub fn notify_one(&self) {
        self.table.signal(self.id);
    }

    /// Post a broadcast's worth of credits
    #[inline]
    pub fn notify_all(&self) {
        self.table.broadcast(self.id);
    }
}
