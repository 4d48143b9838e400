/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the mutex collaborator
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MutexError {
    #[error("Mutex is not locked")]
    #[diagnostic(
        code(mutex::not_locked),
        help("The caller must hold the mutex before waiting on a condition variable.")
    )]
    NotLocked,

    #[error("Mutex operation failed with code {0}")]
    #[diagnostic(
        code(mutex::os),
        help("The underlying mutex reported an error. The code is passed through unchanged.")
    )]
    Os(i32),
}

/// Errors reported by the time source
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ClockError {
    #[error("System clock is set before the Unix epoch")]
    #[diagnostic(
        code(clock::before_epoch),
        help("Check the system time configuration.")
    )]
    BeforeEpoch,

    #[error("Clock read failed with code {0}")]
    #[diagnostic(code(clock::os), help("The time source is unavailable."))]
    Os(i32),
}

/// Errors surfaced by wait operations
///
/// Timeouts are not errors; see [`crate::core::sync::WaitStatus`].
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CondError {
    #[error("Mutex error: {0}")]
    #[diagnostic(code(cond::mutex))]
    Mutex(#[from] MutexError),

    #[error("Clock error: {0}")]
    #[diagnostic(code(cond::clock))]
    Clock(#[from] ClockError),
}

/// Result type for condition-variable operations
pub type CondResult<T> = Result<T, CondError>;
