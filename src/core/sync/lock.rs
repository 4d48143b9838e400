/*!
 * Mutex Collaborator
 *
 * The wait engine never owns the caller's mutex. It only needs to release it
 * before spinning and take it back afterwards, with errors passed through.
 */

use crate::core::errors::MutexError;
use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

/// A mutex the wait engine can release and reacquire
///
/// `lock` may block; it is the only point at which a wait can park.
#[cfg_attr(test, mockall::automock)]
pub trait RawLock {
    /// Acquire the mutex, blocking if needed
    fn lock(&self) -> Result<(), MutexError>;

    /// Release the mutex held by the caller
    fn unlock(&self) -> Result<(), MutexError>;
}

/// Unguarded mutex backed by `parking_lot::RawMutex`
///
/// Unlocking a mutex that is not locked reports
/// [`MutexError::NotLocked`] instead of corrupting state. Ownership is not
/// tracked: any thread may unlock a locked `SpinMutex`.
pub struct SpinMutex {
    raw: RawMutex,
}

impl SpinMutex {
    pub const fn new() -> Self {
        Self { raw: RawMutex::INIT }
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl Default for SpinMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpinMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinMutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl RawLock for SpinMutex {
    #[inline]
    fn lock(&self) -> Result<(), MutexError> {
        self.raw.lock();
        Ok(())
    }

    #[inline]
    fn unlock(&self) -> Result<(), MutexError> {
        if !self.raw.is_locked() {
            return Err(MutexError::NotLocked);
        }
        // SAFETY: the mutex is locked; SpinMutex does not track owners, so
        // releasing on behalf of the caller is the documented contract
        unsafe { self.raw.unlock() };
        Ok(())
    }
}
