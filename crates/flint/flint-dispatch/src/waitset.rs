//! Synchronous dispatch face: the caller waits on its own thread and
//! inspects what fired.

use crate::SlotId;
use crate::origin::EventOrigin;
use crate::table::{Core, TableError, attach_origin};
use flint_sync::{ConditionArena, MAX_EVENTS};
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitSetError {
    /// Every slot is in use; detach something first.
    #[error("wait set capacity exhausted, no free event slot")]
    WaitSetFull,
    /// The same (origin, event) pair is already attached.
    #[error("event is already attached to this wait set")]
    AlreadyAttached,
}

/// What a fired slot looks like to the caller of `wait`: enough to
/// identify the origin and the user-assigned id, and to invoke the stored
/// callback manually.
pub struct EventInfo {
    slot: SlotId,
    user_id: u64,
    origin_addr: usize,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl EventInfo {
    pub(crate) fn new(
        slot: SlotId,
        user_id: u64,
        origin_addr: usize,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            slot,
            user_id,
            origin_addr,
            callback,
        }
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot
    }

    /// The id the caller passed to `attach_event`.
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Whether this notification came from `origin`.
    pub fn does_originate_from<T>(&self, origin: &T) -> bool {
        std::ptr::from_ref(origin) as usize == self.origin_addr
    }

    /// Invoke the callback stored at attach time.
    pub fn call(&self) {
        (self.callback)();
    }
}

/// Logical disjunction of up to `CAPACITY` attached events: `wait` blocks
/// until at least one of them fires and reports which.
pub struct WaitSetImpl<const CAPACITY: usize> {
    core: Arc<Core<CAPACITY>>,
}

pub type WaitSet = WaitSetImpl<MAX_EVENTS>;

impl<const CAPACITY: usize> WaitSetImpl<CAPACITY> {
    /// Wait set over a fresh in-process condition.
    pub fn new() -> io::Result<Self> {
        Ok(Self::with_arena(Arc::new(ConditionArena::in_process()?)))
    }

    /// Wait set over caller-provided condition storage.
    pub fn with_arena(cond: Arc<ConditionArena>) -> Self {
        const {
            assert!(CAPACITY <= MAX_EVENTS);
        }
        Self {
            core: Arc::new(Core::new(cond)),
        }
    }

    /// Register an event. `user_id` is an arbitrary caller-chosen value
    /// carried into every `EventInfo` this attachment produces; `callback`
    /// is stored for manual invocation via `EventInfo::call`.
    pub fn attach_event<T: EventOrigin>(
        &self,
        origin: &Arc<T>,
        event: T::Event,
        user_id: u64,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<SlotId, WaitSetError> {
        attach_origin(&self.core, origin, event, user_id, callback).map_err(|e| match e {
            TableError::Full => WaitSetError::WaitSetFull,
            TableError::AlreadyAttached => WaitSetError::AlreadyAttached,
        })
    }

    /// Undo an attachment. Detaching an event that was never attached is a
    /// no-op.
    pub fn detach_event<T: EventOrigin>(&self, origin: &T, event: T::Event) {
        origin.disable_event(event);
    }

    /// Block until at least one attached event fires; returns the fired
    /// events whose condition still holds, in ascending slot order. May
    /// return empty when every wakeup was filtered out or the wait set was
    /// marked for destruction.
    pub fn wait(&self) -> Vec<EventInfo> {
        self.deliver(self.core.waiter.wait())
    }

    /// Like `wait` but never blocks past `timeout`; returns an empty vec
    /// on timeout.
    pub fn timed_wait(&self, timeout: Duration) -> Vec<EventInfo> {
        self.deliver(self.core.waiter.timed_wait(timeout))
    }

    /// The cancellation primitive: unconditionally unblocks a concurrent
    /// `wait` and makes every future one return empty immediately.
    /// Callable from any thread.
    pub fn mark_for_destruction(&self) {
        self.core.waiter.destroy();
    }

    pub const fn capacity(&self) -> u64 {
        CAPACITY as u64
    }

    /// Number of slots currently in use.
    pub fn size(&self) -> u64 {
        self.core.table.size()
    }

    fn deliver(&self, fired: Vec<u64>) -> Vec<EventInfo> {
        fired
            .into_iter()
            .filter_map(|index| self.core.table.collect_info(index as usize))
            .collect()
    }
}

impl<const CAPACITY: usize> Drop for WaitSetImpl<CAPACITY> {
    fn drop(&mut self) {
        self.core.waiter.destroy();
        self.core.table.clear_all();
    }
}
