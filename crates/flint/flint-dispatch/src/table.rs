//! The slot table shared by both dispatcher faces.
//!
//! A fixed arena of `CAPACITY` slots indexed by integer handle, a lock-free
//! pool allocating the indices, and two tiers of locking: one mutex around
//! the attach scan-and-reserve sequence (coarse, rare) and one independent
//! re-entrant lock per slot (fine-grained, serializes that slot's callback
//! against its own detach). Attaching slot A proceeds while slot B's
//! callback runs, yet "detach returned ⇒ the callback is not observed
//! again" holds per slot.

use crate::SlotId;
use crate::origin::{EventOrigin, EventTag};
use crate::trigger::TriggerHandle;
use crate::waitset::EventInfo;
use flint_sync::{ConditionArena, IndexPool, Notifier, Waiter};
use parking_lot::{Mutex, ReentrantMutex};
use std::any::TypeId;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identity of an attachment. The event tag's `TypeId` disambiguates equal
/// discriminator values coming from different event enums.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotKey {
    origin_addr: usize,
    event_id: u64,
    event_tag: TypeId,
}

/// Everything a fired slot needs: the pre-translated callback (a closure
/// over a weak origin reference and the typed user callback), the WaitSet
/// predicate, and the closure telling the origin to drop its handle
/// without releasing the slot a second time.
pub(crate) struct SlotRecord {
    key: SlotKey,
    user_id: u64,
    callback: Arc<dyn Fn() + Send + Sync>,
    satisfied: Arc<dyn Fn() -> bool + Send + Sync>,
    invalidate: Box<dyn Fn(SlotId) + Send + Sync>,
}

struct Slot {
    /// Serializes this slot's callback against its own detach. Re-entrant
    /// because a callback that drops the last strong reference to its
    /// origin runs the origin's teardown-detach on the dispatch thread,
    /// which enters this lock again.
    exec: ReentrantMutex<RefCell<Option<SlotRecord>>>,
    /// Identity mirror for the duplicate-attach scan, which must not wait
    /// behind a running callback.
    key: Mutex<Option<SlotKey>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableError {
    AlreadyAttached,
    Full,
}

pub(crate) struct SlotTable<const CAPACITY: usize> {
    slots: [Slot; CAPACITY],
    pool: IndexPool,
    in_use: AtomicU64,
    /// Serializes only the scan-and-reserve part of attach; detach and
    /// callback execution never take it.
    attach_lock: Mutex<()>,
}

impl<const CAPACITY: usize> SlotTable<CAPACITY> {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot {
                exec: ReentrantMutex::new(RefCell::new(None)),
                key: Mutex::new(None),
            }),
            pool: IndexPool::new(CAPACITY as u32),
            in_use: AtomicU64::new(0),
            attach_lock: Mutex::new(()),
        }
    }

    /// Scan-and-reserve. Fails on a duplicate `(origin, event)` pair or an
    /// exhausted pool — pool exhaustion is the only source of "full"
    /// errors — and mutates nothing on failure.
    fn attach(&self, record: SlotRecord) -> Result<u32, TableError> {
        let _serialized = self.attach_lock.lock();

        for slot in &self.slots {
            if *slot.key.lock() == Some(record.key) {
                return Err(TableError::AlreadyAttached);
            }
        }

        let Some(index) = self.pool.pop() else {
            return Err(TableError::Full);
        };

        let slot = &self.slots[index as usize];
        {
            // The slot came out of the pool, so nothing runs on it; both
            // locks are free.
            let guard = slot.exec.lock();
            *slot.key.lock() = Some(record.key);
            *guard.borrow_mut() = Some(record);
        }
        self.in_use.fetch_add(1, Ordering::Relaxed);
        Ok(index)
    }

    /// Release a slot: waits until a callback currently running on it has
    /// returned, clears it, invalidates the origin's stored handle, and
    /// returns the index to the pool. Releasing slot A never blocks
    /// operations on slot B. Releasing an already-free slot is a no-op.
    pub(crate) fn release(&self, slot_id: SlotId) {
        let index = slot_id.0 as usize;
        if index >= CAPACITY {
            return;
        }
        let slot = &self.slots[index];
        let record = {
            let guard = slot.exec.lock();
            let record = guard.borrow_mut().take();
            *slot.key.lock() = None;
            record
        };
        let Some(record) = record else { return };
        (record.invalidate)(slot_id);
        self.pool.push(index as u32);
        self.in_use.fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(slot = slot_id.0, "event slot released");
    }

    /// Dispatch-loop entry: run the slot's callback if the slot is still
    /// initialized — it may have been detached between the wait returning
    /// and this lock being acquired, which is checked, not assumed.
    pub(crate) fn execute(&self, index: usize) {
        if index >= CAPACITY {
            return;
        }
        let guard = self.slots[index].exec.lock();
        let callback = guard
            .borrow()
            .as_ref()
            .map(|record| Arc::clone(&record.callback));
        if let Some(callback) = callback {
            // Invoked with the borrow released but the execution lock
            // held: detach blocks until the callback returns, and the
            // callback may itself detach this very slot re-entrantly.
            callback();
        } else {
            tracing::debug!(index, "slot fired but was detached before dispatch");
        }
    }

    /// WaitSet collection: the public info for a fired slot, if it is
    /// still attached and its condition still holds.
    pub(crate) fn collect_info(&self, index: usize) -> Option<EventInfo> {
        if index >= CAPACITY {
            return None;
        }
        let pieces = {
            let guard = self.slots[index].exec.lock();
            let pieces = guard.borrow().as_ref().map(|record| {
                (
                    record.user_id,
                    record.key.origin_addr,
                    Arc::clone(&record.callback),
                    Arc::clone(&record.satisfied),
                )
            });
            pieces
        };
        let (user_id, origin_addr, callback, satisfied) = pieces?;
        satisfied().then(|| EventInfo::new(SlotId(index as u64), user_id, origin_addr, callback))
    }

    /// Release every occupied slot. Dispatcher teardown only.
    pub(crate) fn clear_all(&self) {
        for index in 0..CAPACITY {
            if self.slots[index].key.lock().is_some() {
                self.release(SlotId(index as u64));
            }
        }
    }

    pub(crate) fn size(&self) -> u64 {
        self.in_use.load(Ordering::Relaxed)
    }
}

/// State both faces share: the condition storage, the slot table and the
/// waiter that drains the condition.
pub(crate) struct Core<const CAPACITY: usize> {
    pub(crate) cond: Arc<ConditionArena>,
    pub(crate) table: SlotTable<CAPACITY>,
    pub(crate) waiter: Waiter,
}

impl<const CAPACITY: usize> Core<CAPACITY> {
    pub(crate) fn new(cond: Arc<ConditionArena>) -> Self {
        Self {
            table: SlotTable::new(),
            waiter: Waiter::new(Arc::clone(&cond)),
            cond,
        }
    }
}

/// The attach sequence both faces run: install a record, bind a
/// `TriggerHandle` to the claimed slot, and hand the handle to the origin.
///
/// Every closure captures the origin weakly; a dead origin turns callback,
/// predicate and invalidation into no-ops. The handle's release closure
/// captures the core weakly for the same reason.
pub(crate) fn attach_origin<T, const CAPACITY: usize>(
    core: &Arc<Core<CAPACITY>>,
    origin: &Arc<T>,
    event: T::Event,
    user_id: u64,
    callback: impl Fn(&T) + Send + Sync + 'static,
) -> Result<SlotId, TableError>
where
    T: EventOrigin,
{
    let weak = Arc::downgrade(origin);

    let run: Arc<dyn Fn() + Send + Sync> = {
        let weak = Weak::clone(&weak);
        Arc::new(move || {
            if let Some(origin) = weak.upgrade() {
                callback(&origin);
            }
        })
    };
    let satisfied: Arc<dyn Fn() -> bool + Send + Sync> = {
        let weak = Weak::clone(&weak);
        Arc::new(move || {
            weak.upgrade()
                .is_some_and(|origin| origin.is_condition_satisfied(event))
        })
    };
    let invalidate: Box<dyn Fn(SlotId) + Send + Sync> = Box::new(move |slot| {
        if let Some(origin) = weak.upgrade() {
            origin.invalidate_trigger(slot);
        }
    });

    let index = core.table.attach(SlotRecord {
        key: SlotKey {
            origin_addr: Arc::as_ptr(origin) as usize,
            event_id: event.id(),
            event_tag: TypeId::of::<T::Event>(),
        },
        user_id,
        callback: run,
        satisfied,
        invalidate,
    })?;

    let slot = SlotId(index as u64);
    let release = {
        let core = Arc::downgrade(core);
        move |slot: SlotId| {
            if let Some(core) = core.upgrade() {
                core.table.release(slot);
            }
        }
    };
    let handle = TriggerHandle::new(Notifier::new(Arc::clone(&core.cond), slot.0), slot, release);
    origin.enable_event(handle, event);
    tracing::debug!(slot = slot.0, event = event.id(), "event attached");
    Ok(slot)
}
