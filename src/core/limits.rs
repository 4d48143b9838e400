/*!
 * System Limits and Constants
 *
 * Centralized location for the spin-condvar tunables and table geometry.
 *
 * ## Conventions
 * - Performance-critical constants are marked with [PERF]
 * - Values tied to the slot layout are marked with [LAYOUT]
 */

use std::time::Duration;

// =============================================================================
// SLOT TABLE GEOMETRY
// =============================================================================

/// Cache line size assumed for slot padding (64 bytes)
/// [LAYOUT] Every slot record occupies exactly one line
pub const CACHE_LINE_SIZE: usize = 64;

/// Number of slots in the spin table (256)
/// [PERF] Must be power of 2 for fast modulo via bitmask
pub const SPIN_TABLE_SLOTS: usize = 256;

/// Bitmask applied to the shifted identity
pub const SPIN_TABLE_MASK: usize = SPIN_TABLE_SLOTS - 1;

/// Identity bits discarded before masking (log2 of the cache line)
/// [LAYOUT] Objects within one cache line share a slot
pub const IDENTITY_SHIFT: u32 = CACHE_LINE_SIZE.trailing_zeros();

// =============================================================================
// SPIN BUDGET
// =============================================================================

/// Target wall-clock duration of one spin chunk (10µs)
/// [PERF] Also the nominal chunk size used by timed waits
pub const TARGET_SPIN_TIME: Duration = Duration::from_micros(10);

/// Lower bound on the calibrated iteration count
pub const MIN_SPIN_ITERATIONS: u32 = 100;

/// Upper bound on the calibrated iteration count
/// [PERF] Caps CPU burn when the frequency estimate is high
pub const MAX_SPIN_ITERATIONS: u32 = 50_000;

/// Assumed cycle rate when no measurement is taken (3.6 GHz)
pub const FALLBACK_CPU_FREQUENCY_HZ: u64 = 3_600_000_000;

/// Sleep window used when measuring the time-stamp counter (10ms)
pub const CALIBRATION_WINDOW: Duration = Duration::from_millis(10);

// =============================================================================
// DISPATCH
// =============================================================================

/// Credits posted by a broadcast (1000)
/// Must be >= the maximum number of concurrently spinning waiters on a slot
pub const BROADCAST_SIGNAL_COUNT: i64 = 1000;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the target spin duration, in microseconds
pub const ENV_TARGET_SPIN_US: &str = "SPINCOND_TARGET_SPIN_US";

/// Overrides the iteration ceiling
pub const ENV_MAX_ITERATIONS: &str = "SPINCOND_MAX_ITERATIONS";

/// Overrides the broadcast credit
pub const ENV_BROADCAST_CREDIT: &str = "SPINCOND_BROADCAST_CREDIT";

/// Enables time-stamp-counter calibration ("1" or "true")
pub const ENV_CALIBRATE: &str = "SPINCOND_CALIBRATE";

/// Switches the tracing subscriber to JSON output ("1" or "true")
pub const ENV_TRACE_JSON: &str = "SPINCOND_TRACE_JSON";
