/*!
 * Spin Slots
 *
 * Per-bucket state shared by every condition variable hashing to it.
 *
 * # Design: Fixed Buckets Over Per-Condvar State
 *
 * Condition variables are never registered. Their identity is shifted and
 * masked into a 256-entry table, like the sharded parking slots of a futex
 * implementation. Two condvars landing in the same bucket share a counter,
 * so a signal on one may be consumed by a waiter on the other. Waiters
 * already re-check their predicate, so this shows up as a spurious wakeup.
 */

use super::ordering::{CONSUME_FAILURE, CONSUME_LOAD, CONSUME_SUCCESS, POST, STATS};
use crate::core::limits::{CACHE_LINE_SIZE, IDENTITY_SHIFT, SPIN_TABLE_MASK};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, AtomicUsize, Ordering};

/// Identity of a condition variable
///
/// A lookup key only: nothing is owned or dereferenced through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CondId(usize);

/// Next identity handed out by [`CondId::next`]
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

impl CondId {
    /// Wrap a raw address or handle
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Use the address of a value as its identity
    #[inline]
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize)
    }

    /// Allocate a fresh identity
    ///
    /// Identities advance by one cache line, so consecutive allocations map
    /// to consecutive slots and only alias after a full lap of the table.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(CACHE_LINE_SIZE, Ordering::Relaxed))
    }

    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Hash an identity to its slot index
///
/// Pure function of the identity; objects within one cache line share a slot.
#[inline(always)]
pub const fn slot_index(id: CondId) -> usize {
    (id.0 >> IDENTITY_SHIFT) & SPIN_TABLE_MASK
}

/// A single spin slot
///
/// Holds pending wakeup credits plus diagnostics. Only the counter takes part
/// in synchronization; every other field is relaxed and advisory.
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
#[derive(Debug)]
pub struct Slot {
    /// Pending wakeup credits (never observed negative)
    signal_count: AtomicI64,
    /// Threads currently spinning on this slot
    waiting_threads: AtomicI32,
    successful_spins: AtomicU64,
    failed_spins: AtomicU64,
    /// Sum of iteration budgets handed out to waiters
    total_spins: AtomicU64,
}

const _: () = assert!(std::mem::size_of::<Slot>() == CACHE_LINE_SIZE);
const _: () = assert!(std::mem::align_of::<Slot>() == CACHE_LINE_SIZE);

impl Slot {
    pub const fn new() -> Self {
        Self {
            signal_count: AtomicI64::new(0),
            waiting_threads: AtomicI32::new(0),
            successful_spins: AtomicU64::new(0),
            failed_spins: AtomicU64::new(0),
            total_spins: AtomicU64::new(0),
        }
    }

    /// Consume one credit if any is pending
    ///
    /// Decrement-if-positive: the CAS never takes the counter below zero.
    /// A successful claim synchronizes with the release post that produced
    /// the credit.
    #[inline(always)]
    pub fn try_consume(&self) -> bool {
        let mut current = self.signal_count.load(CONSUME_LOAD);
        loop {
            if current <= 0 {
                return false;
            }
            match self.signal_count.compare_exchange_weak(
                current,
                current - 1,
                CONSUME_SUCCESS,
                CONSUME_FAILURE,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Add wakeup credits
    #[inline(always)]
    pub fn post(&self, credits: i64) {
        self.signal_count.fetch_add(credits, POST);
    }

    /// Spin for at most `iterations` polls, returning whether a credit was taken
    ///
    /// Registers the caller as a waiter for the duration and records the
    /// outcome in the slot's diagnostics.
    pub fn spin(&self, iterations: u32) -> bool {
        self.waiting_threads.fetch_add(1, STATS);

        let mut consumed = false;
        for _ in 0..iterations {
            if self.try_consume() {
                consumed = true;
                break;
            }
            super::ordering::cpu_relax();
        }

        self.waiting_threads.fetch_sub(1, STATS);
        if consumed {
            self.successful_spins.fetch_add(1, STATS);
        } else {
            self.failed_spins.fetch_add(1, STATS);
        }
        self.total_spins.fetch_add(iterations as u64, STATS);

        consumed
    }

    /// Pending credits
    #[inline]
    pub fn pending(&self) -> i64 {
        self.signal_count.load(Ordering::Acquire)
    }

    /// Threads currently spinning
    #[inline]
    pub fn waiters(&self) -> usize {
        self.waiting_threads.load(STATS).max(0) as usize
    }

    pub fn successful_spins(&self) -> u64 {
        self.successful_spins.load(STATS)
    }

    pub fn failed_spins(&self) -> u64 {
        self.failed_spins.load(STATS)
    }

    pub fn total_spins(&self) -> u64 {
        self.total_spins.load(STATS)
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}
