/*!
 * C ABI Integration Tests
 *
 * Drive the exported entry points with real pthread mutexes
 */

#![cfg(all(unix, feature = "ffi"))]

use pretty_assertions::assert_eq;
use serial_test::serial;
use spincond::core::sync::{self, Clock, CondId};
use spincond::ffi::{
    make_timespec, my_pthread_cond_broadcast, my_pthread_cond_signal, my_pthread_cond_timedwait,
    my_pthread_cond_wait, my_pthread_init_spin_states, RealtimeClock,
};
use std::thread;
use std::time::{Duration, Instant};

fn new_mutex() -> Box<libc::pthread_mutex_t> {
    Box::new(libc::PTHREAD_MUTEX_INITIALIZER)
}

fn new_cond() -> Box<libc::pthread_cond_t> {
    Box::new(libc::PTHREAD_COND_INITIALIZER)
}

/// Absolute CLOCK_REALTIME deadline `offset` from now
fn abstime_in(offset: Duration) -> libc::timespec {
    let at = RealtimeClock.now().unwrap() + offset;
    make_timespec(at.as_secs() as libc::time_t, at.subsec_nanos() as libc::c_long)
}

#[test]
#[serial]
fn test_signal_then_wait_returns_zero() {
    my_pthread_init_spin_states();
    let mut cond = new_cond();
    let mut mutex = new_mutex();

    unsafe {
        assert_eq!(libc::pthread_mutex_lock(&mut *mutex), 0);
        assert_eq!(my_pthread_cond_signal(&mut *cond), 0);
        assert_eq!(my_pthread_cond_wait(&mut *cond, &mut *mutex), 0);
        // Reacquired on return
        assert_eq!(libc::pthread_mutex_trylock(&mut *mutex), libc::EBUSY);
        assert_eq!(libc::pthread_mutex_unlock(&mut *mutex), 0);
    }

    let id = CondId::of(&*cond);
    assert_eq!(sync::global().pending(id), 0);
}

#[test]
#[serial]
fn test_timedwait_past_deadline_keeps_mutex() {
    let mut cond = new_cond();
    let mut mutex = new_mutex();
    let past = make_timespec(1, 0);

    unsafe {
        assert_eq!(libc::pthread_mutex_lock(&mut *mutex), 0);
        let rc = my_pthread_cond_timedwait(&mut *cond, &mut *mutex, &past);
        assert_eq!(rc, libc::ETIMEDOUT);
        assert_eq!(libc::pthread_mutex_trylock(&mut *mutex), libc::EBUSY);
        assert_eq!(libc::pthread_mutex_unlock(&mut *mutex), 0);
    }
}

#[test]
#[serial]
fn test_timedwait_times_out() {
    let mut cond = new_cond();
    let mut mutex = new_mutex();
    let deadline = abstime_in(Duration::from_millis(30));

    let start = Instant::now();
    unsafe {
        assert_eq!(libc::pthread_mutex_lock(&mut *mutex), 0);
        let rc = my_pthread_cond_timedwait(&mut *cond, &mut *mutex, &deadline);
        assert_eq!(rc, libc::ETIMEDOUT);
        assert_eq!(libc::pthread_mutex_unlock(&mut *mutex), 0);
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(25));
    assert!(elapsed < Duration::from_secs(1));
}

#[test]
#[serial]
fn test_timedwait_rejects_bad_nanoseconds() {
    let mut cond = new_cond();
    let mut mutex = new_mutex();
    let bad = make_timespec(1, 1_000_000_000);

    unsafe {
        assert_eq!(libc::pthread_mutex_lock(&mut *mutex), 0);
        assert_eq!(my_pthread_cond_timedwait(&mut *cond, &mut *mutex, &bad), libc::EINVAL);
        assert_eq!(libc::pthread_mutex_unlock(&mut *mutex), 0);
    }
}

#[test]
#[serial]
fn test_broadcast_wakes_timed_waiters() {
    const WAITERS: usize = 3;
    let mut cond = new_cond();
    let id = CondId::of(&*cond);
    let addr = &mut *cond as *mut libc::pthread_cond_t as usize;

    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            thread::spawn(move || {
                let cond = addr as *mut libc::pthread_cond_t;
                let mut mutex = new_mutex();
                let deadline = abstime_in(Duration::from_secs(5));
                unsafe {
                    assert_eq!(libc::pthread_mutex_lock(&mut *mutex), 0);
                    let rc = my_pthread_cond_timedwait(cond, &mut *mutex, &deadline);
                    assert_eq!(libc::pthread_mutex_unlock(&mut *mutex), 0);
                    rc
                }
            })
        })
        .collect();

    let start = Instant::now();
    while sync::global().waiters(id) < WAITERS {
        assert!(start.elapsed() < Duration::from_secs(5), "waiters never started spinning");
        thread::yield_now();
    }
    assert_eq!(my_pthread_cond_broadcast(&mut *cond), 0);

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 0);
    }

    // Drain leftover credits so later tests reusing this address start clean
    let slot = sync::global().locate(id);
    while slot.try_consume() {}
}

#[test]
fn test_null_arguments_rejected() {
    let mut cond = new_cond();
    let deadline = make_timespec(1, 0);

    unsafe {
        let rc = my_pthread_cond_timedwait(&mut *cond, std::ptr::null_mut(), &deadline);
        assert_eq!(rc, libc::EINVAL);
        let rc = my_pthread_cond_timedwait(
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null(),
        );
        assert_eq!(rc, libc::EINVAL);
    }
    assert_eq!(my_pthread_cond_signal(std::ptr::null_mut()), libc::EINVAL);
}
