/*!
 * Tracing Setup
 * Structured logging for the spin condvar using the tracing crate
 *
 * Features:
 * - Env-filtered levels via RUST_LOG
 * - JSON-formatted logs for structured parsing
 * - Timed spans for measurement runs
 */

use crate::core::limits::ENV_TRACE_JSON;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SPINCOND_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "structured tracing initialized");
    }
    installed
}

/// Span around a measurement run
///
/// Logs the elapsed time when dropped; runs slower than 1s are flagged.
pub struct RunSpan {
    span: tracing::Span,
    start: Instant,
    name: &'static str,
}

impl RunSpan {
    pub fn new(name: &'static str) -> Self {
        let span = span!(
            Level::INFO,
            "run",
            run = name,
            iterations = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );
        debug!(parent: &span, run = name, "run started");

        Self {
            span,
            start: Instant::now(),
            name,
        }
    }

    /// Record how many iterations the run performed
    pub fn record_iterations(&self, count: u64) {
        self.span.record("iterations", count);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_millis() as u64);

        if duration.as_secs() >= 1 {
            warn!(
                parent: &self.span,
                run = self.name,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow run"
            );
        } else {
            debug!(
                parent: &self.span,
                run = self.name,
                duration_us = duration.as_micros() as u64,
                "run completed"
            );
        }
    }
}
