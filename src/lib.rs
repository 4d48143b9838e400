/*!
 * Spin Condvar Library
 * Busy-polling condition variables for latency-critical handoffs
 */

pub mod core;
#[cfg(all(unix, feature = "ffi"))]
pub mod ffi;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::*;
pub use crate::core::sync::{
    broadcast, init, shutdown, signal, timedwait, wait, CondId, Lifecycle, RawLock, SpinConfig,
    SpinCondvar, SpinMutex, SpinReport, SpinTable, WaitStatus,
};
pub use monitoring::init_tracing;
