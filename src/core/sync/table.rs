/*!
 * Spin Table
 *
 * The wait engine and signal dispatcher over a fixed table of spin slots.
 *
 * # Wait State Machine
 *
 * Armed -> Spinning -> {Consumed | SpinExhausted} -> Reacquiring -> Done
 *
 * The caller's mutex is released before spinning and reacquired after,
 * whatever the outcome. Spinning is pure user-space polling; reacquiring
 * the mutex is the only place a waiter can block in the kernel.
 *
 * # Contract
 *
 * `wait` always reports success once the mutex is back, even when the spin
 * budget ran out without a signal. Callers re-check their predicate after
 * every wakeup, as with any POSIX condition variable, so exhaustion is just
 * another spurious wakeup. `timedwait` does report `TimedOut`.
 */

use super::calibrate::Calibrator;
use super::clock::Clock;
use super::config::SpinConfig;
use super::lock::RawLock;
use super::ordering::{acquire_barrier, release_barrier};
use super::slot::{slot_index, CondId, Slot};
use crate::core::errors::{ClockError, CondResult};
use crate::core::limits::SPIN_TABLE_SLOTS;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Outcome of a timed wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStatus {
    /// A signal credit was consumed
    Signaled,
    /// The deadline passed without a credit
    TimedOut,
}

impl WaitStatus {
    #[inline]
    pub fn timed_out(self) -> bool {
        self == WaitStatus::TimedOut
    }
}

/// Phases of a wait, reported on trace events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    Armed,
    Spinning,
    Consumed,
    SpinExhausted,
    Reacquiring,
    Done,
}

/// Aggregated spin diagnostics across all slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinReport {
    pub successful_spins: u64,
    pub failed_spins: u64,
    pub total_spins: u64,
}

impl SpinReport {
    /// Number of spin chunks run
    pub fn attempts(&self) -> u64 {
        self.successful_spins + self.failed_spins
    }

    /// Fraction of chunks that consumed a signal, `None` before any wait
    pub fn success_rate(&self) -> Option<f64> {
        match self.attempts() {
            0 => None,
            n => Some(self.successful_spins as f64 / n as f64),
        }
    }
}

/// Fixed table of spin slots plus the calibrated budget
///
/// Read-only after construction: every mutation goes through a slot's
/// atomics, so lookups need no synchronization.
pub struct SpinTable {
    /// Fixed array of slots (never resizes, stable addresses)
    slots: Box<[Slot; SPIN_TABLE_SLOTS]>,
    calibrator: Calibrator,
    config: SpinConfig,
}

impl SpinTable {
    /// Build a table and run the calibrator
    pub fn new(config: SpinConfig) -> Self {
        let calibrator = Calibrator::new(&config);
        let spin_iterations = calibrator.iterations();

        debug!(
            slots = SPIN_TABLE_SLOTS,
            spin_iterations,
            hz = calibrator.cycles_per_second(),
            target_us = config.target_spin.as_micros() as u64,
            "spin table constructed"
        );

        Self {
            slots: Box::new([const { Slot::new() }; SPIN_TABLE_SLOTS]),
            calibrator,
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SpinConfig::default())
    }

    /// Slot a condition variable maps to
    #[inline(always)]
    pub fn locate(&self, cv: CondId) -> &Slot {
        &self.slots[slot_index(cv)]
    }

    /// Release `mutex`, spin one budget for a signal on `cv`, reacquire
    ///
    /// Returns `Ok(())` whether or not a signal arrived. Fails only if the
    /// mutex cannot be released (nothing else happens) or reacquired.
    pub fn wait<L>(&self, cv: CondId, mutex: &L) -> CondResult<()>
    where
        L: RawLock + ?Sized,
    {
        trace!(cv = cv.as_raw(), phase = ?WaitPhase::Armed, "wait");
        mutex.unlock()?;
        release_barrier();

        let consumed = self.spin_once(cv);

        acquire_barrier();
        trace!(cv = cv.as_raw(), phase = ?WaitPhase::Reacquiring, consumed, "wait");
        mutex.lock()?;
        trace!(cv = cv.as_raw(), phase = ?WaitPhase::Done, "wait");
        Ok(())
    }

    /// Like [`wait`](Self::wait), bounded by an absolute `deadline` on `clock`
    ///
    /// If the deadline has already passed the mutex is never released and
    /// `TimedOut` is returned. Otherwise the mutex is always reacquired
    /// before returning; a clock failure while spinning is reported after
    /// the reacquire.
    pub fn timedwait<L, C>(
        &self,
        cv: CondId,
        mutex: &L,
        clock: &C,
        deadline: Duration,
    ) -> CondResult<WaitStatus>
    where
        L: RawLock + ?Sized,
        C: Clock + ?Sized,
    {
        trace!(cv = cv.as_raw(), phase = ?WaitPhase::Armed, "timedwait");
        if clock.now()? >= deadline {
            trace!(cv = cv.as_raw(), phase = ?WaitPhase::Done, timed_out = true, "timedwait");
            return Ok(WaitStatus::TimedOut);
        }

        mutex.unlock()?;
        release_barrier();

        let outcome = self.spin_until(cv, clock, deadline);

        acquire_barrier();
        trace!(cv = cv.as_raw(), phase = ?WaitPhase::Reacquiring, "timedwait");
        mutex.lock()?;

        let status = match outcome? {
            true => WaitStatus::Signaled,
            false => WaitStatus::TimedOut,
        };
        trace!(
            cv = cv.as_raw(),
            phase = ?WaitPhase::Done,
            timed_out = status.timed_out(),
            "timedwait"
        );
        Ok(status)
    }

    /// One spin chunk on `cv`'s slot
    #[inline]
    pub(crate) fn spin_once(&self, cv: CondId) -> bool {
        let budget = self.spin_iterations();
        trace!(cv = cv.as_raw(), phase = ?WaitPhase::Spinning, budget, "spin");
        let consumed = self.locate(cv).spin(budget);
        let phase = if consumed {
            WaitPhase::Consumed
        } else {
            WaitPhase::SpinExhausted
        };
        trace!(cv = cv.as_raw(), phase = ?phase, "spin");
        consumed
    }

    /// Spin chunk after chunk until a signal is consumed or `deadline` passes
    ///
    /// The clock is read between chunks, so the deadline is overrun by at
    /// most one chunk.
    pub(crate) fn spin_until<C>(
        &self,
        cv: CondId,
        clock: &C,
        deadline: Duration,
    ) -> Result<bool, ClockError>
    where
        C: Clock + ?Sized,
    {
        loop {
            if self.spin_once(cv) {
                return Ok(true);
            }
            if clock.now()? >= deadline {
                return Ok(false);
            }
        }
    }

    /// Post one wakeup credit to `cv`'s slot
    ///
    /// Any thread spinning on that slot may take it, including waiters on
    /// an aliased condition variable.
    #[inline]
    pub fn signal(&self, cv: CondId) {
        self.locate(cv).post(1);
    }

    /// Post enough credits for every waiter spinning on `cv`'s slot
    ///
    /// Approximates waking all waiters: credits not consumed stay pending
    /// and turn later waits on the slot into immediate spurious wakeups.
    #[inline]
    pub fn broadcast(&self, cv: CondId) {
        self.locate(cv).post(self.config.broadcast_credit);
    }

    /// Threads currently spinning on `cv`'s slot (diagnostic)
    pub fn waiters(&self, cv: CondId) -> usize {
        self.locate(cv).waiters()
    }

    /// Credits pending on `cv`'s slot
    pub fn pending(&self, cv: CondId) -> i64 {
        self.locate(cv).pending()
    }

    /// Iterations per spin chunk, as cached by the calibrator
    #[inline]
    pub fn spin_iterations(&self) -> u32 {
        self.calibrator.iterations()
    }

    /// Cycle rate the budget was derived from
    pub fn cycles_per_second(&self) -> u64 {
        self.calibrator.cycles_per_second()
    }

    /// Times the budget was computed for this table (1 after construction)
    pub fn calibration_runs(&self) -> u32 {
        self.calibrator.runs()
    }

    pub fn config(&self) -> &SpinConfig {
        &self.config
    }

    /// Sum the diagnostics of every slot
    ///
    /// Counters are read with relaxed ordering; the totals are only exact
    /// when no thread is spinning.
    pub fn report(&self) -> SpinReport {
        self.slots.iter().fold(SpinReport::default(), |acc, slot| SpinReport {
            successful_spins: acc.successful_spins + slot.successful_spins(),
            failed_spins: acc.failed_spins + slot.failed_spins(),
            total_spins: acc.total_spins + slot.total_spins(),
        })
    }
}

impl Default for SpinTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for SpinTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinTable")
            .field("slots", &SPIN_TABLE_SLOTS)
            .field("spin_iterations", &self.spin_iterations())
            .field("config", &self.config)
            .finish()
    }
}
