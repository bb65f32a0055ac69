//! The capability an origin holds to signal its slot and to release it on
//! teardown.

use crate::SlotId;
use flint_sync::Notifier;
use parking_lot::Mutex;

type ReleaseFn = Box<dyn Fn(SlotId) + Send + Sync>;

struct TriggerState {
    notifier: Notifier,
    slot: SlotId,
    release: ReleaseFn,
}

/// A handle is either fully valid (bound to a slot) or fully invalid; no
/// partial state is observable.
///
/// The two states live behind a plain mutex as `Some`/`None`: state is
/// taken out *under* the lock and the release callback runs *after* the
/// guard is gone, so no operation can ever re-enter the lock and a valid
/// handle releases its slot exactly once no matter how `reset`, drop and
/// moves interleave. Moving the handle transfers validity; overwriting a
/// binding drops — and thereby resets — the previous value first.
pub struct TriggerHandle {
    state: Mutex<Option<TriggerState>>,
}

impl TriggerHandle {
    pub fn new(
        notifier: Notifier,
        slot: SlotId,
        release: impl Fn(SlotId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(Some(TriggerState {
                notifier,
                slot,
                release: Box::new(release),
            })),
        }
    }

    /// A handle that was never bound; every operation on it is a no-op.
    pub fn invalid() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Signal the bound slot. No-op on an invalid handle.
    pub fn trigger(&self) {
        let guard = self.state.lock();
        if let Some(state) = guard.as_ref() {
            state.notifier.notify();
        }
    }

    /// Release the bound slot and become invalid. No-op on an invalid
    /// handle; the release callback runs at most once per binding.
    pub fn reset(&self) {
        let taken = self.state.lock().take();
        if let Some(state) = taken {
            (state.release)(state.slot);
        }
    }

    /// Become invalid *without* releasing the slot. Used when ownership of
    /// the cleanup has already been transferred elsewhere — e.g. the
    /// dispatcher reclaimed the slot and is telling the origin to let go.
    pub fn invalidate(&self) {
        drop(self.state.lock().take());
    }

    pub fn is_valid(&self) -> bool {
        self.state.lock().is_some()
    }

    pub fn slot_id(&self) -> Option<SlotId> {
        self.state.lock().as_ref().map(|state| state.slot)
    }
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        self.reset();
    }
}
