//! Shared-memory layout of the condition structure.
//!
//! A `SharedCondition` is one counting semaphore plus a fixed array of
//! notification flags, one per event slot. It lives either on the private
//! heap (single process) or at offset 0 of a mapped segment; `#[repr(C)]`
//! keeps field offsets identical in every process that maps it.
//!
//! # Memory Layout
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬───────────────┬────────────┬──────────────────────────┐
//! │  magic   │ version  │ capacity │ to_be_destroyed │ semaphore │ notifications[MAX_EVENTS] │
//! │  (8B)    │  (8B)    │  (8B)    │ (1B atomic)     │ (sem_t)   │ (1B atomic each)          │
//! └──────────┴──────────┴──────────┴───────────────┴────────────┴──────────────────────────┘
//! ```

use crate::sema::Semaphore;
use std::io;
use std::mem::size_of;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Maximum number of event slots per condition.
///
/// Fixed at build time so that every process mapping the same segment
/// agrees on the flag-array size and offsets.
pub const MAX_EVENTS: usize = 128;

/// ASCII "FLINTCND". Rejects segments that are not condition segments.
pub const COND_MAGIC: u64 = 0x464C_494E_5443_4E44;

/// Incremented on incompatible layout changes; attaching processes reject
/// a mismatch.
pub const COND_VERSION: u64 = 1;

/// The wake-up structure one consumer and many producers share.
///
/// Flag protocol: a producer only ever sets its own index (release
/// ordering); only the bound waiter clears flags. Clearing is relaxed —
/// the semaphore post/wait pair already orders the handoff.
#[repr(C)]
pub struct SharedCondition {
    magic: u64,
    version: u64,
    capacity: u64,
    to_be_destroyed: AtomicBool,
    semaphore: Semaphore,
    notifications: [AtomicBool; MAX_EVENTS],
}

impl SharedCondition {
    /// Initialize a condition in place.
    ///
    /// # Safety
    /// `ptr` must point to writable, properly aligned memory of at least
    /// `bytes_for_condition()` bytes that does not yet hold a live
    /// condition.
    pub(crate) unsafe fn init_at(
        ptr: *mut SharedCondition,
        process_shared: bool,
    ) -> io::Result<()> {
        unsafe {
            ptr::addr_of_mut!((*ptr).magic).write(COND_MAGIC);
            ptr::addr_of_mut!((*ptr).version).write(COND_VERSION);
            ptr::addr_of_mut!((*ptr).capacity).write(MAX_EVENTS as u64);
            ptr::addr_of_mut!((*ptr).to_be_destroyed).write(AtomicBool::new(false));
            for i in 0..MAX_EVENTS {
                ptr::addr_of_mut!((*ptr).notifications[i]).write(AtomicBool::new(false));
            }
            Semaphore::init_at(ptr::addr_of_mut!((*ptr).semaphore), process_shared)
        }
    }

    /// Validate a condition found in an existing segment.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.magic != COND_MAGIC {
            return Err("bad magic");
        }
        if self.version != COND_VERSION {
            return Err("wrong version");
        }
        if self.capacity != MAX_EVENTS as u64 {
            return Err("capacity mismatch");
        }
        if self.is_to_be_destroyed() {
            return Err("condition is marked for destruction");
        }
        Ok(())
    }

    /// Number of event slots. Always `MAX_EVENTS` for a valid condition.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Mark the condition so no further process attaches to it. Called by
    /// the owning side before the backing memory is reclaimed; the core
    /// itself never frees a segment.
    pub fn mark_to_be_destroyed(&self) {
        self.to_be_destroyed.store(true, Ordering::Relaxed);
    }

    pub fn is_to_be_destroyed(&self) -> bool {
        self.to_be_destroyed.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_notification(&self, index: usize) {
        self.notifications[index].store(true, Ordering::Release);
    }

    /// Clear and report the flag at `index`. Waiter-side only.
    #[inline]
    pub(crate) fn take_notification(&self, index: usize) -> bool {
        self.notifications[index].swap(false, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn semaphore(&self) -> &Semaphore {
        &self.semaphore
    }
}

/// Bytes required to place a `SharedCondition` in a segment.
pub const fn bytes_for_condition() -> usize {
    size_of::<SharedCondition>()
}
