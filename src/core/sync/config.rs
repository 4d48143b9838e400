/*!
 * Spin Configuration
 *
 * Runtime configuration for the spin budget and dispatcher
 */

use crate::core::limits::{
    BROADCAST_SIGNAL_COUNT, ENV_BROADCAST_CREDIT, ENV_CALIBRATE, ENV_MAX_ITERATIONS,
    ENV_TARGET_SPIN_US, FALLBACK_CPU_FREQUENCY_HZ, MAX_SPIN_ITERATIONS, MIN_SPIN_ITERATIONS,
    TARGET_SPIN_TIME,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Where the calibrator gets its cycle rate from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencySource {
    /// Assume a fixed rate in Hz
    Fixed(u64),
    /// Measure the time-stamp counter once (x86 only, falls back elsewhere)
    Measured,
}

impl Default for FrequencySource {
    fn default() -> Self {
        Self::Fixed(FALLBACK_CPU_FREQUENCY_HZ)
    }
}

/// Spin-condvar configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinConfig {
    /// Wall-clock length of one spin chunk
    pub target_spin: Duration,
    /// Iteration floor
    pub min_iterations: u32,
    /// Iteration ceiling
    pub max_iterations: u32,
    /// Credits added by a broadcast
    pub broadcast_credit: i64,
    /// Cycle-rate policy
    pub frequency: FrequencySource,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            target_spin: TARGET_SPIN_TIME,
            min_iterations: MIN_SPIN_ITERATIONS,
            max_iterations: MAX_SPIN_ITERATIONS,
            broadcast_credit: BROADCAST_SIGNAL_COUNT,
            frequency: FrequencySource::default(),
        }
    }
}

impl SpinConfig {
    /// Configuration that spins longer before giving up (50µs chunks)
    pub const fn low_latency() -> Self {
        Self {
            target_spin: Duration::from_micros(50),
            min_iterations: MIN_SPIN_ITERATIONS,
            max_iterations: MAX_SPIN_ITERATIONS * 4,
            broadcast_credit: BROADCAST_SIGNAL_COUNT,
            frequency: FrequencySource::Fixed(FALLBACK_CPU_FREQUENCY_HZ),
        }
    }

    /// Default configuration with environment overrides applied
    ///
    /// Environment variables:
    /// - SPINCOND_TARGET_SPIN_US: chunk length in microseconds
    /// - SPINCOND_MAX_ITERATIONS: iteration ceiling
    /// - SPINCOND_BROADCAST_CREDIT: credits per broadcast
    /// - SPINCOND_CALIBRATE: measure the cycle rate ("1" or "true")
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Unparseable or out-of-range values are ignored with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(us) = parse_var::<u64>(&lookup, ENV_TARGET_SPIN_US) {
            if us > 0 {
                self.target_spin = Duration::from_micros(us);
            } else {
                warn!(var = ENV_TARGET_SPIN_US, "target spin must be non-zero, ignoring");
            }
        }

        if let Some(max) = parse_var::<u32>(&lookup, ENV_MAX_ITERATIONS) {
            if max >= self.min_iterations {
                self.max_iterations = max;
            } else {
                warn!(
                    var = ENV_MAX_ITERATIONS,
                    max,
                    min = self.min_iterations,
                    "iteration ceiling below floor, ignoring"
                );
            }
        }

        if let Some(credit) = parse_var::<i64>(&lookup, ENV_BROADCAST_CREDIT) {
            if credit > 0 {
                self.broadcast_credit = credit;
            } else {
                warn!(
                    var = ENV_BROADCAST_CREDIT,
                    credit,
                    "broadcast credit must be positive, ignoring"
                );
            }
        }

        if let Some(flag) = lookup(ENV_CALIBRATE) {
            if flag == "1" || flag.eq_ignore_ascii_case("true") {
                self.frequency = FrequencySource::Measured;
            }
        }

        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "unparseable override, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SpinConfig::default();
        assert_eq!(config.target_spin, Duration::from_micros(10));
        assert_eq!(config.min_iterations, 100);
        assert_eq!(config.max_iterations, 50_000);
        assert_eq!(config.broadcast_credit, 1000);
        assert_eq!(config.frequency, FrequencySource::Fixed(3_600_000_000));
    }

    #[test]
    fn test_overrides_applied() {
        let config = SpinConfig::default().with_overrides(lookup_from(&[
            (ENV_TARGET_SPIN_US, "25"),
            (ENV_MAX_ITERATIONS, "90000"),
            (ENV_BROADCAST_CREDIT, "64"),
            (ENV_CALIBRATE, "true"),
        ]));

        assert_eq!(config.target_spin, Duration::from_micros(25));
        assert_eq!(config.max_iterations, 90_000);
        assert_eq!(config.broadcast_credit, 64);
        assert_eq!(config.frequency, FrequencySource::Measured);
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let config = SpinConfig::default().with_overrides(lookup_from(&[
            (ENV_TARGET_SPIN_US, "0"),
            (ENV_MAX_ITERATIONS, "10"),
            (ENV_BROADCAST_CREDIT, "lots"),
            (ENV_CALIBRATE, "no"),
        ]));

        assert_eq!(config, SpinConfig::default());
    }
}
