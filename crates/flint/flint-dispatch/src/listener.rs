//! Asynchronous dispatch face: attached callbacks run on a dedicated
//! background thread.

use crate::SlotId;
use crate::origin::EventOrigin;
use crate::table::{Core, TableError, attach_origin};
use flint_sync::{ConditionArena, MAX_EVENTS};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    /// Every slot is in use; detach something first.
    #[error("listener capacity exhausted, no free event slot")]
    ListenerFull,
    /// The same (origin, event) pair is already attached.
    #[error("event is already attached to this listener")]
    EventAlreadyAttached,
}

/// Reacts to attached events by running their callbacks on an internal
/// thread, spawned on construction and joined on drop.
///
/// Attach, detach and triggering are safe from any thread, including from
/// inside a running callback. Bursts are level-triggered: a trigger that
/// arrives while the slot's callback is running guarantees at least one
/// further callback run, not one run per trigger.
pub struct ListenerImpl<const CAPACITY: usize> {
    core: Arc<Core<CAPACITY>>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

pub type Listener = ListenerImpl<MAX_EVENTS>;

impl<const CAPACITY: usize> ListenerImpl<CAPACITY> {
    /// Listener over a fresh in-process condition.
    pub fn new() -> io::Result<Self> {
        Self::with_arena(Arc::new(ConditionArena::in_process()?))
    }

    /// Listener over caller-provided condition storage, e.g. a mapped
    /// segment whose producers live in other processes.
    pub fn with_arena(cond: Arc<ConditionArena>) -> io::Result<Self> {
        const {
            assert!(CAPACITY <= MAX_EVENTS);
        }
        let core = Arc::new(Core::new(cond));
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread = {
            let core = Arc::clone(&core);
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("flint-listener".into())
                .spawn(move || dispatch_loop(core, shutdown))?
        };
        Ok(Self {
            core,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Register `callback` to run on the dispatch thread whenever `origin`
    /// raises `event`. Hands a bound `TriggerHandle` to the origin and
    /// returns the claimed slot id.
    pub fn attach_event<T: EventOrigin>(
        &self,
        origin: &Arc<T>,
        event: T::Event,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<SlotId, ListenerError> {
        attach_origin(&self.core, origin, event, 0, callback).map_err(|e| match e {
            TableError::Full => ListenerError::ListenerFull,
            TableError::AlreadyAttached => ListenerError::EventAlreadyAttached,
        })
    }

    /// Undo an attachment. Blocks while the slot's callback is executing;
    /// once this returns, the callback is guaranteed not to be observed
    /// running again and the origin may be torn down. Detaching an event
    /// that was never attached is a no-op.
    pub fn detach_event<T: EventOrigin>(&self, origin: &T, event: T::Event) {
        origin.disable_event(event);
    }

    pub const fn capacity(&self) -> u64 {
        CAPACITY as u64
    }

    /// Number of slots currently in use.
    pub fn size(&self) -> u64 {
        self.core.table.size()
    }
}

fn dispatch_loop<const CAPACITY: usize>(core: Arc<Core<CAPACITY>>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Relaxed) {
        for index in core.waiter.wait() {
            core.table.execute(index as usize);
        }
    }
}

impl<const CAPACITY: usize> Drop for ListenerImpl<CAPACITY> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.core.waiter.destroy();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        // The dispatch thread is gone, so no callback can run anymore;
        // invalidate whatever is still attached so origins do not try to
        // release reclaimed slots later.
        self.core.table.clear_all();
    }
}
