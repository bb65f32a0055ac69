//! A minimal port-like origin used by the dispatcher tests.
#![allow(dead_code)]

use flint_dispatch::{EventOrigin, EventTag, SlotId, TriggerHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortEvent {
    DataReceived = 0,
    ConnectionOffered = 1,
}

impl EventTag for PortEvent {
    fn id(self) -> u64 {
        self as u64
    }
}

/// Stores one trigger handle per event, counts callback runs, and lets a
/// test flip the satisfied-predicate off to provoke filtered wakeups.
pub struct TestPort {
    handles: [Mutex<Option<TriggerHandle>>; 2],
    pub hits: AtomicU64,
    satisfied: AtomicBool,
}

impl TestPort {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handles: [Mutex::new(None), Mutex::new(None)],
            hits: AtomicU64::new(0),
            satisfied: AtomicBool::new(true),
        })
    }

    fn cell(&self, event: PortEvent) -> &Mutex<Option<TriggerHandle>> {
        &self.handles[event as usize]
    }

    /// The state change: signal the dispatcher through the stored handle.
    pub fn raise(&self, event: PortEvent) {
        if let Some(handle) = self.cell(event).lock().as_ref() {
            handle.trigger();
        }
    }

    pub fn has_attachment(&self, event: PortEvent) -> bool {
        self.cell(event).lock().as_ref().is_some_and(|h| h.is_valid())
    }

    pub fn set_satisfied(&self, value: bool) {
        self.satisfied.store(value, Ordering::SeqCst);
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }
}

impl EventOrigin for TestPort {
    type Event = PortEvent;

    fn enable_event(&self, trigger: TriggerHandle, event: PortEvent) {
        *self.cell(event).lock() = Some(trigger);
    }

    fn disable_event(&self, event: PortEvent) {
        // Take the handle out first; dropping it resets, and the release
        // path calls back into invalidate_trigger.
        let taken = self.cell(event).lock().take();
        drop(taken);
    }

    fn invalidate_trigger(&self, slot: SlotId) {
        for cell in &self.handles {
            let guard = cell.lock();
            if let Some(handle) = guard.as_ref()
                && handle.slot_id() == Some(slot)
            {
                handle.invalidate();
            }
        }
    }

    fn is_condition_satisfied(&self, _event: PortEvent) -> bool {
        self.satisfied.load(Ordering::SeqCst)
    }
}

/// Poll `predicate` until it holds or five seconds pass.
pub fn eventually(predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}
