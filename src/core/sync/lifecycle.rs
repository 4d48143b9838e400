/*!
 * Lifecycle Controller
 *
 * Owns the process-wide spin table: built once on first use, drained of
 * diagnostics at shutdown.
 *
 * # Design: Explicit Service Over Bare Globals
 *
 * The table lives inside a `Lifecycle`, which is an ordinary value. The
 * process-wide instance is one `static Lifecycle`; tests and embedders can
 * build their own and get the same once-only guarantees in isolation.
 */

use super::clock::WallClock;
use super::config::SpinConfig;
use super::lock::RawLock;
use super::slot::CondId;
use super::table::{SpinReport, SpinTable, WaitStatus};
use crate::core::errors::CondResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::info;

/// One-time owner of a spin table
pub struct Lifecycle {
    table: OnceLock<SpinTable>,
    config: fn() -> SpinConfig,
    constructions: AtomicUsize,
}

impl Lifecycle {
    /// Lifecycle building its table from the default configuration
    pub const fn new() -> Self {
        Self::with_config(SpinConfig::default)
    }

    /// Lifecycle building its table from `config` on first use
    pub const fn with_config(config: fn() -> SpinConfig) -> Self {
        Self {
            table: OnceLock::new(),
            config,
            constructions: AtomicUsize::new(0),
        }
    }

    /// Build the table if needed and return it
    ///
    /// Idempotent and safe to race: exactly one caller constructs (and
    /// calibrates) the table, the rest block until it is published.
    pub fn init(&self) -> &SpinTable {
        self.table.get_or_init(|| {
            self.constructions.fetch_add(1, Ordering::Relaxed);
            let table = SpinTable::new((self.config)());
            let config = table.config();
            info!(
                spin_iterations = table.spin_iterations(),
                cpu_ghz = table.cycles_per_second() as f64 / 1e9,
                target_us = config.target_spin.as_micros() as u64,
                broadcast_credit = config.broadcast_credit,
                "spin condvar table initialized"
            );
            table
        })
    }

    /// The table, initializing on first use
    #[inline]
    pub fn table(&self) -> &SpinTable {
        self.init()
    }

    pub fn is_initialized(&self) -> bool {
        self.table.get().is_some()
    }

    /// Aggregate and log spin diagnostics
    ///
    /// Observational only. Returns `None` if the table was never built.
    /// Call it once no thread is waiting, or the totals will be in flux.
    pub fn shutdown(&self) -> Option<SpinReport> {
        let table = self.table.get()?;
        let report = table.report();

        if let Some(rate) = report.success_rate() {
            info!(
                success_pct = format_args!("{:.1}", rate * 100.0),
                successful = report.successful_spins,
                attempts = report.attempts(),
                total_spins = report.total_spins,
                "spin condvar success rate"
            );
        }
        info!("spin condvar table shut down");
        Some(report)
    }

    /// Number of tables ever constructed by this lifecycle (0 or 1)
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::Relaxed)
    }

    /// Number of calibration runs behind the current table
    pub fn calibrations(&self) -> u32 {
        self.table.get().map_or(0, SpinTable::calibration_runs)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide lifecycle, configured from the environment
static GLOBAL: Lifecycle = Lifecycle::with_config(SpinConfig::from_env);

/// The process-wide lifecycle
pub fn lifecycle() -> &'static Lifecycle {
    &GLOBAL
}

/// The process-wide spin table, initializing on first use
#[inline]
pub fn global() -> &'static SpinTable {
    GLOBAL.table()
}

/// Initialize the process-wide table (idempotent)
pub fn init() {
    GLOBAL.init();
}

/// Log and return the process-wide diagnostics
pub fn shutdown() -> Option<SpinReport> {
    GLOBAL.shutdown()
}

/// Wait on `cv` using the process-wide table; see [`SpinTable::wait`]
pub fn wait<L: RawLock + ?Sized>(cv: CondId, mutex: &L) -> CondResult<()> {
    global().wait(cv, mutex)
}

/// Timed wait against a wall-clock deadline; see [`SpinTable::timedwait`]
pub fn timedwait<L: RawLock + ?Sized>(
    cv: CondId,
    mutex: &L,
    deadline: SystemTime,
) -> CondResult<WaitStatus> {
    global().timedwait(cv, mutex, &WallClock, WallClock::at(deadline))
}

/// Signal `cv` using the process-wide table
pub fn signal(cv: CondId) {
    global().signal(cv);
}

/// Broadcast `cv` using the process-wide table
pub fn broadcast(cv: CondId) {
    global().broadcast(cv);
}
