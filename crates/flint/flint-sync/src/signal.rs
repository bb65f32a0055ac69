//! Producer/consumer signaling over a `SharedCondition`.

use crate::arena::ConditionArena;
use crate::layout::MAX_EVENTS;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Producer-side handle bound to one notification slot.
///
/// Any number of notifiers — in any process mapping the segment — may
/// signal concurrently; each one only ever writes its own index.
pub struct Notifier {
    cond: Arc<ConditionArena>,
    index: u64,
}

impl Notifier {
    pub fn new(cond: Arc<ConditionArena>, index: u64) -> Self {
        Self { cond, index }
    }

    /// Set this slot's flag and wake the waiter.
    ///
    /// An out-of-range index is a configuration error, not a memory-safety
    /// event: the write is suppressed and an error logged. Repeated
    /// notifies before the waiter consumes the slot collapse into a single
    /// observed "triggered" state.
    pub fn notify(&self) {
        if self.index >= MAX_EVENTS as u64 {
            tracing::error!(
                index = self.index,
                max = MAX_EVENTS,
                "notification index out of range, dropped"
            );
            return;
        }
        let cond = self.cond.condition();
        cond.set_notification(self.index as usize);
        cond.semaphore().post();
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

/// Consumer-side handle; exactly one per condition.
pub struct Waiter {
    cond: Arc<ConditionArena>,
    to_be_destroyed: AtomicBool,
}

impl Waiter {
    pub fn new(cond: Arc<ConditionArena>) -> Self {
        Self {
            cond,
            to_be_destroyed: AtomicBool::new(false),
        }
    }

    /// Block until at least one slot fires; returns all currently set
    /// indices in ascending order, clearing them as they are collected.
    ///
    /// After `destroy()` every call returns an empty batch without
    /// blocking — including a call that was already blocked when
    /// `destroy()` ran.
    pub fn wait(&self) -> Vec<u64> {
        self.drain_stale_posts();
        loop {
            if self.is_destroyed() {
                return Vec::new();
            }
            let fired = self.collect();
            if !fired.is_empty() {
                return fired;
            }
            self.cond.condition().semaphore().wait();
            if self.is_destroyed() {
                return Vec::new();
            }
        }
    }

    /// Like `wait`, but blocks at most once and never past `timeout`;
    /// returns an empty batch when nothing fired in time.
    pub fn timed_wait(&self, timeout: Duration) -> Vec<u64> {
        self.drain_stale_posts();
        if self.is_destroyed() {
            return Vec::new();
        }
        let fired = self.collect();
        if !fired.is_empty() {
            return fired;
        }
        self.cond.condition().semaphore().timed_wait(timeout);
        if self.is_destroyed() {
            return Vec::new();
        }
        self.collect()
    }

    /// Unblock any current or future `wait`. Idempotent and callable from
    /// any thread; only the first call posts the semaphore.
    pub fn destroy(&self) {
        if !self.to_be_destroyed.swap(true, Ordering::Relaxed) {
            self.cond.condition().semaphore().post();
        }
    }

    fn is_destroyed(&self) -> bool {
        self.to_be_destroyed.load(Ordering::Relaxed)
    }

    /// A crashed or abandoned previous wait can leave the semaphore
    /// over-counted; consume the surplus so it does not surface as
    /// spurious wakeups with no flags set.
    fn drain_stale_posts(&self) {
        let sem = self.cond.condition().semaphore();
        while sem.try_wait() {}
    }

    /// Collection order is ascending by index, not by trigger time; a
    /// batch says nothing about the order in which slots fired.
    fn collect(&self) -> Vec<u64> {
        let cond = self.cond.condition();
        let mut fired = Vec::new();
        for index in 0..MAX_EVENTS {
            if cond.take_notification(index) {
                fired.push(index as u64);
            }
        }
        fired
    }
}
