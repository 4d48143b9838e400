/*!
 * C ABI
 *
 * `pthread_cond_*`-compatible entry points over the process-wide spin
 * table, for preloading into existing C programs. The condition variable
 * pointer is used only as an identity; its contents are never read.
 *
 * Return values follow pthread conventions: 0 on success, an errno value
 * otherwise. Mutex error codes are passed through unchanged.
 */

use crate::core::errors::{ClockError, CondError, MutexError};
use crate::core::sync::{self, Clock, CondId, RawLock, WaitStatus};
use libc::{c_int, pthread_cond_t, pthread_mutex_t, timespec};
use std::time::Duration;

const NANOS_PER_SEC: libc::c_long = 1_000_000_000;

/// Borrowed `pthread_mutex_t` driven through the wait engine
pub struct PthreadMutex {
    raw: *mut pthread_mutex_t,
}

impl PthreadMutex {
    /// # Safety
    ///
    /// `raw` must point to an initialized mutex that outlives the wrapper.
    pub unsafe fn from_raw(raw: *mut pthread_mutex_t) -> Self {
        Self { raw }
    }
}

impl RawLock for PthreadMutex {
    fn lock(&self) -> Result<(), MutexError> {
        // SAFETY: validity guaranteed by from_raw's contract
        match unsafe { libc::pthread_mutex_lock(self.raw) } {
            0 => Ok(()),
            rc => Err(MutexError::Os(rc)),
        }
    }

    fn unlock(&self) -> Result<(), MutexError> {
        // SAFETY: validity guaranteed by from_raw's contract
        match unsafe { libc::pthread_mutex_unlock(self.raw) } {
            0 => Ok(()),
            rc => Err(MutexError::Os(rc)),
        }
    }
}

/// `CLOCK_REALTIME` read through `clock_gettime`, matching `abstime`
#[derive(Debug, Clone, Copy, Default)]
pub struct RealtimeClock;

impl Clock for RealtimeClock {
    fn now(&self) -> Result<Duration, ClockError> {
        let mut ts = make_timespec(0, 0);
        // SAFETY: ts is a valid out-pointer
        if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) } != 0 {
            let code = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EINVAL);
            return Err(ClockError::Os(code));
        }
        timespec_to_duration(&ts).ok_or(ClockError::BeforeEpoch)
    }
}

/// Build a timespec (zeroed first: some targets carry padding fields)
pub fn make_timespec(sec: libc::time_t, nsec: libc::c_long) -> timespec {
    // SAFETY: timespec is plain old data; all-zero is a valid value
    let mut ts: timespec = unsafe { std::mem::zeroed() };
    ts.tv_sec = sec;
    ts.tv_nsec = nsec;
    ts
}

/// Convert a timespec to an offset from the epoch
///
/// `None` for negative seconds or out-of-range nanoseconds.
fn timespec_to_duration(ts: &timespec) -> Option<Duration> {
    if ts.tv_sec < 0 || !(0..NANOS_PER_SEC).contains(&ts.tv_nsec) {
        return None;
    }
    Some(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
}

/// errno value for a wait failure
pub fn errno_of(err: CondError) -> c_int {
    match err {
        CondError::Mutex(MutexError::Os(code)) => code,
        CondError::Mutex(MutexError::NotLocked) => libc::EPERM,
        CondError::Clock(ClockError::Os(code)) => code,
        CondError::Clock(ClockError::BeforeEpoch) => libc::EINVAL,
    }
}

#[inline]
fn cond_id(cond: *const pthread_cond_t) -> CondId {
    CondId::from_raw(cond as usize)
}

/// Initialize the spin table (idempotent)
#[no_mangle]
pub extern "C" fn my_pthread_init_spin_states() {
    sync::init();
}

/// # Safety
///
/// `mutex` must be a valid mutex locked by the calling thread.
#[no_mangle]
pub unsafe extern "C" fn my_pthread_cond_wait(
    cond: *mut pthread_cond_t,
    mutex: *mut pthread_mutex_t,
) -> c_int {
    if cond.is_null() || mutex.is_null() {
        return libc::EINVAL;
    }
    let mutex = PthreadMutex::from_raw(mutex);
    match sync::global().wait(cond_id(cond), &mutex) {
        Ok(()) => 0,
        Err(err) => errno_of(err),
    }
}

/// # Safety
///
/// `mutex` must be a valid mutex locked by the calling thread and
/// `abstime` a valid pointer to a `CLOCK_REALTIME` deadline.
#[no_mangle]
pub unsafe extern "C" fn my_pthread_cond_timedwait(
    cond: *mut pthread_cond_t,
    mutex: *mut pthread_mutex_t,
    abstime: *const timespec,
) -> c_int {
    if cond.is_null() || mutex.is_null() || abstime.is_null() {
        return libc::EINVAL;
    }
    let abstime = &*abstime;
    if !(0..NANOS_PER_SEC).contains(&abstime.tv_nsec) {
        return libc::EINVAL;
    }
    // Negative seconds are before the epoch, which is always in the past
    let deadline = timespec_to_duration(abstime).unwrap_or(Duration::ZERO);

    let mutex = PthreadMutex::from_raw(mutex);
    match sync::global().timedwait(cond_id(cond), &mutex, &RealtimeClock, deadline) {
        Ok(WaitStatus::Signaled) => 0,
        Ok(WaitStatus::TimedOut) => libc::ETIMEDOUT,
        Err(err) => errno_of(err),
    }
}

/// Post one wakeup credit
#[no_mangle]
pub extern "C" fn my_pthread_cond_signal(cond: *mut pthread_cond_t) -> c_int {
    if cond.is_null() {
        return libc::EINVAL;
    }
    sync::signal(cond_id(cond));
    0
}

/// Post a broadcast's worth of credits
#[no_mangle]
pub extern "C" fn my_pthread_cond_broadcast(cond: *mut pthread_cond_t) -> c_int {
    if cond.is_null() {
        return libc::EINVAL;
    }
    sync::broadcast(cond_id(cond));
    0
}

/// Log aggregated spin statistics
#[no_mangle]
pub extern "C" fn my_pthread_spin_destroy() {
    sync::shutdown();
}
