//! Unnamed POSIX semaphore, placeable in shared memory.
//!
//! The semaphore is stored inline in the structure that lives in the shared
//! segment, so it must be `#[repr(C)]`, initialized in place, and operated
//! on without ever moving it. With the process-shared flag set, `sem_post`
//! from any process mapping the segment wakes a `sem_wait` in the consumer
//! process.

use crate::fatal;
use std::cell::UnsafeCell;
use std::io;
use std::time::Duration;

#[repr(C)]
pub(crate) struct Semaphore {
    raw: UnsafeCell<libc::sem_t>,
}

// SAFETY: the kernel object is designed for concurrent use from any thread
// or process; all access goes through sem_* calls on a stable address.
unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// Initialize the semaphore in place with a count of zero.
    ///
    /// # Safety
    /// `slot` must point to writable, properly aligned memory that does not
    /// already hold an initialized semaphore.
    pub(crate) unsafe fn init_at(slot: *mut Semaphore, process_shared: bool) -> io::Result<()> {
        let pshared = if process_shared { 1 } else { 0 };
        let rc = unsafe { libc::sem_init((*slot).raw.get(), pshared, 0) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Tear down an initialized semaphore.
    ///
    /// # Safety
    /// The caller must be the sole remaining user; no thread or process may
    /// still be blocked on it.
    pub(crate) unsafe fn destroy(&self) {
        unsafe { libc::sem_destroy(self.raw.get()) };
    }

    /// Increment the count, waking one blocked waiter.
    pub(crate) fn post(&self) {
        let rc = unsafe { libc::sem_post(self.raw.get()) };
        if rc != 0 {
            fatal::sync_primitive_failure("sem_post", io::Error::last_os_error());
        }
    }

    /// Block until the count can be decremented.
    pub(crate) fn wait(&self) {
        loop {
            let rc = unsafe { libc::sem_wait(self.raw.get()) };
            if rc == 0 {
                return;
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            fatal::sync_primitive_failure("sem_wait", err);
        }
    }

    /// Decrement the count only if that is possible without blocking.
    pub(crate) fn try_wait(&self) -> bool {
        loop {
            let rc = unsafe { libc::sem_trywait(self.raw.get()) };
            if rc == 0 {
                return true;
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) => return false,
                Some(libc::EINTR) => continue,
                _ => fatal::sync_primitive_failure("sem_trywait", err),
            }
        }
    }

    /// Block until the count can be decremented or `timeout` elapses.
    /// Returns `false` on timeout.
    pub(crate) fn timed_wait(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        loop {
            let rc = unsafe { libc::sem_timedwait(self.raw.get(), &deadline) };
            if rc == 0 {
                return true;
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ETIMEDOUT) => return false,
                Some(libc::EINTR) => continue,
                _ => fatal::sync_primitive_failure("sem_timedwait", err),
            }
        }
    }
}

/// `sem_timedwait` takes an absolute CLOCK_REALTIME deadline.
fn deadline_after(timeout: Duration) -> libc::timespec {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_REALTIME, &mut now);
    }
    let mut tv_sec = now.tv_sec + timeout.as_secs() as libc::time_t;
    let mut tv_nsec = now.tv_nsec + timeout.subsec_nanos() as libc::c_long;
    if tv_nsec >= 1_000_000_000 {
        tv_sec += 1;
        tv_nsec -= 1_000_000_000;
    }
    libc::timespec { tv_sec, tv_nsec }
}
