/*!
 * Platform Memory-Ordering Layer
 *
 * Chooses barrier strength at build time so the wait engine stays
 * architecture independent.
 *
 * # Design
 *
 * x86 and x86_64 are TSO: a store is never reordered with an earlier store
 * and a load never with a later load, so the barriers around the spin window
 * only have to stop the compiler. Weakly ordered targets (aarch64, riscv,
 * powerpc) get real hardware fences.
 *
 * The counter operations themselves always use acquire/release at the
 * language level; on x86 these lower to plain `mov`/`lock` instructions, so
 * there is no cost to keeping them strong.
 */

use std::sync::atomic::{compiler_fence, fence, Ordering};

/// True when the target guarantees TSO ordering in hardware
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub const STRONG_MEMORY_MODEL: bool = true;

/// True when the target guarantees TSO ordering in hardware
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub const STRONG_MEMORY_MODEL: bool = false;

/// Load that observes posted credits
pub const CONSUME_LOAD: Ordering = Ordering::Acquire;

/// CAS success ordering when claiming a credit
pub const CONSUME_SUCCESS: Ordering = Ordering::AcqRel;

/// CAS failure ordering (the loop reloads anyway)
pub const CONSUME_FAILURE: Ordering = Ordering::Relaxed;

/// Ordering for signal and broadcast posts
pub const POST: Ordering = Ordering::Release;

/// Ordering for diagnostic counters
pub const STATS: Ordering = Ordering::Relaxed;

/// Barrier emitted after releasing the caller's mutex
#[inline(always)]
pub fn release_barrier() {
    if STRONG_MEMORY_MODEL {
        compiler_fence(Ordering::Release);
    } else {
        fence(Ordering::Release);
    }
}

/// Barrier emitted before reacquiring the caller's mutex
#[inline(always)]
pub fn acquire_barrier() {
    if STRONG_MEMORY_MODEL {
        compiler_fence(Ordering::Acquire);
    } else {
        fence(Ordering::Acquire);
    }
}

/// Per-iteration pause inside the spin loop
///
/// Compiler barrier only on x86: `pause` costs up to ~140 cycles on recent
/// cores, which would stretch a chunk far past its calibrated length.
/// aarch64 gets `yield`.
#[inline(always)]
pub fn cpu_relax() {
    #[cfg(target_arch = "aarch64")]
    std::hint::spin_loop();
    #[cfg(not(target_arch = "aarch64"))]
    compiler_fence(Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_model_matches_target() {
        #[cfg(target_arch = "x86_64")]
        assert!(STRONG_MEMORY_MODEL);
        #[cfg(target_arch = "aarch64")]
        assert!(!STRONG_MEMORY_MODEL);
    }

    #[test]
    fn test_consume_orderings_are_valid_cas_pair() {
        // Failure ordering may not be Release or AcqRel.
        assert!(!matches!(
            CONSUME_FAILURE,
            Ordering::Release | Ordering::AcqRel
        ));
        assert!(matches!(CONSUME_SUCCESS, Ordering::AcqRel | Ordering::SeqCst));
    }
}
