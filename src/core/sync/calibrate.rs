/*!
 * Spin Budget Calibration
 *
 * Converts a target spin duration into a loop bound for the wait engine.
 *
 * # Policy
 *
 * iterations = cycles_per_second * target_spin, clamped to [min, max].
 * One iteration is assumed to cost roughly one cycle. That assumption is
 * loose (a contended CAS costs far more), so the clamp is what actually
 * bounds CPU burn.
 *
 * The default source is a fixed 3.6 GHz estimate. Measuring the
 * time-stamp counter is available but opt-in: it costs a 10ms sleep at
 * startup and is meaningless on targets without an invariant TSC.
 */

use super::config::{FrequencySource, SpinConfig};
use crate::core::limits::{CALIBRATION_WINDOW, FALLBACK_CPU_FREQUENCY_HZ};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Compute the iteration bound for a cycle rate and target duration
#[inline]
pub fn spin_iterations(cycles_per_second: u64, target: Duration, min: u32, max: u32) -> u32 {
    // Saturates: an oversized product only needs to land above `max`
    let cycles = (cycles_per_second as u128).saturating_mul(target.as_nanos()) / 1_000_000_000;
    let bounded = cycles.clamp(min as u128, max.max(min) as u128);
    bounded as u32
}

/// Resolve a frequency source into a cycle rate
pub fn cycles_per_second(source: FrequencySource) -> u64 {
    match source {
        FrequencySource::Fixed(hz) if hz > 0 => hz,
        FrequencySource::Fixed(_) => FALLBACK_CPU_FREQUENCY_HZ,
        FrequencySource::Measured => {
            measure_tsc_frequency().unwrap_or(FALLBACK_CPU_FREQUENCY_HZ)
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
#[allow(unused_unsafe)]
fn read_tsc() -> u64 {
    // SAFETY: rdtsc has no memory effects and is available on every x86_64 CPU
    unsafe {
        std::arch::x86_64::_rdtsc()
    }
}

#[cfg(target_arch = "x86")]
#[inline(always)]
#[allow(unused_unsafe)]
fn read_tsc() -> u64 {
    // SAFETY: see x86_64 variant
    unsafe {
        std::arch::x86::_rdtsc()
    }
}

/// Measure the TSC rate across one calibration window
///
/// Returns `None` when there is no TSC or the reading is degenerate.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn measure_tsc_frequency() -> Option<u64> {
    let start = std::time::Instant::now();
    let tsc_start = read_tsc();
    std::thread::sleep(CALIBRATION_WINDOW);
    let tsc_end = read_tsc();
    let elapsed_ns = start.elapsed().as_nanos();

    if tsc_end <= tsc_start || elapsed_ns == 0 {
        return None;
    }

    let hz = (tsc_end - tsc_start) as u128 * 1_000_000_000 / elapsed_ns;
    debug!(hz = hz as u64, "measured time-stamp counter rate");
    u64::try_from(hz).ok().filter(|hz| *hz > 0)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn measure_tsc_frequency() -> Option<u64> {
    let _ = CALIBRATION_WINDOW;
    debug!("no time-stamp counter on this target, using fallback rate");
    None
}

/// Cached spin budget
///
/// `iterations()` computes on first use and caches the result. Racing first
/// callers may both compute; they store the same value for a fixed source,
/// so the duplicate work is harmless. Zero means "not yet computed" since a
/// computed budget is always at least `min_iterations` (itself forced >= 1).
#[derive(Debug)]
pub struct Calibrator {
    source: FrequencySource,
    target: Duration,
    min: u32,
    max: u32,
    iterations: AtomicU32,
    hz: AtomicU64,
    runs: AtomicU32,
}

impl Calibrator {
    pub fn new(config: &SpinConfig) -> Self {
        Self {
            source: config.frequency,
            target: config.target_spin,
            min: config.min_iterations.max(1),
            max: config.max_iterations,
            iterations: AtomicU32::new(0),
            hz: AtomicU64::new(0),
            runs: AtomicU32::new(0),
        }
    }

    /// Spin iterations per chunk, computing them on first call
    pub fn iterations(&self) -> u32 {
        let cached = self.iterations.load(Ordering::Acquire);
        if cached != 0 {
            return cached;
        }

        let hz = cycles_per_second(self.source);
        let iterations = spin_iterations(hz, self.target, self.min, self.max);
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.hz.store(hz, Ordering::Relaxed);
        self.iterations.store(iterations, Ordering::Release);
        iterations
    }

    /// Cycle rate used by the last calibration (0 before the first)
    pub fn cycles_per_second(&self) -> u64 {
        self.hz.load(Ordering::Relaxed)
    }

    /// Number of times the budget was actually computed
    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fixed_frequency_budget() {
        // 3.6 GHz * 10µs = 36_000 cycles, inside [100, 50_000]
        let iterations = spin_iterations(3_600_000_000, Duration::from_micros(10), 100, 50_000);
        assert_eq!(iterations, 36_000);
    }

    #[test]
    fn test_budget_clamped() {
        assert_eq!(spin_iterations(1_000, Duration::from_micros(10), 100, 50_000), 100);
        assert_eq!(spin_iterations(u64::MAX, Duration::from_secs(60), 100, 50_000), 50_000);
    }

    #[test]
    fn test_extreme_inputs_saturate_to_max() {
        assert_eq!(spin_iterations(u64::MAX, Duration::MAX, 100, 50_000), 50_000);

        let calibrator = Calibrator::new(&SpinConfig {
            target_spin: Duration::from_secs(u64::MAX),
            frequency: FrequencySource::Fixed(u64::MAX),
            ..SpinConfig::default()
        });
        assert_eq!(calibrator.iterations(), 50_000);
    }

    #[test]
    fn test_inverted_bounds_resolve_to_min() {
        assert_eq!(spin_iterations(3_600_000_000, Duration::from_secs(1), 500, 10), 500);
    }

    #[test]
    fn test_zero_fixed_frequency_falls_back() {
        assert_eq!(cycles_per_second(FrequencySource::Fixed(0)), FALLBACK_CPU_FREQUENCY_HZ);
    }

    #[test]
    fn test_measured_frequency_is_positive() {
        assert!(cycles_per_second(FrequencySource::Measured) > 0);
    }

    #[test]
    fn test_calibrator_caches() {
        let calibrator = Calibrator::new(&SpinConfig::default());
        assert_eq!(calibrator.cycles_per_second(), 0);

        let first = calibrator.iterations();
        let second = calibrator.iterations();

        assert_eq!(first, 36_000);
        assert_eq!(first, second);
        assert_eq!(calibrator.runs(), 1);
        assert_eq!(calibrator.cycles_per_second(), FALLBACK_CPU_FREQUENCY_HZ);
    }

    #[test]
    fn test_concurrent_calibration_agrees() {
        let calibrator = Arc::new(Calibrator::new(&SpinConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let calibrator = calibrator.clone();
                thread::spawn(move || calibrator.iterations())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 36_000);
        }
        assert!(calibrator.runs() >= 1);
    }
}
