//! The capability contract an object implements to be attachable to a
//! dispatcher.

use crate::{SlotId, TriggerHandle};

/// Discriminates the events a single origin can raise. Usually a small
/// fieldless `Copy` enum; an origin with only one event uses a one-variant
/// enum.
pub trait EventTag: Copy + Send + Sync + 'static {
    fn id(self) -> u64;
}

/// Implemented by any object whose state changes should wake a dispatcher
/// (a port, a user-defined triggerable, ...). Origins are shared through
/// `Arc`; the dispatcher keeps only a weak reference, so an origin that is
/// dropped without detaching is skipped rather than touched.
///
/// `enable_event` stores the handle the dispatcher created for this
/// attachment; the origin calls `trigger()` on it when the event occurs and
/// resets or drops it in its own teardown (which gives the teardown the
/// same blocking guarantee as an explicit detach). `invalidate_trigger`
/// must drop the stored handle via `TriggerHandle::invalidate` — not
/// `reset` — because the dispatcher has already reclaimed the slot.
///
/// `disable_event` should take the stored handle out of whatever lock
/// guards it *before* dropping it: dropping resets the handle, and the
/// release path calls back into `invalidate_trigger`.
pub trait EventOrigin: Send + Sync + 'static {
    type Event: EventTag;

    fn enable_event(&self, trigger: TriggerHandle, event: Self::Event);
    fn disable_event(&self, event: Self::Event);
    fn invalidate_trigger(&self, slot: SlotId);

    /// Whether the condition behind `event` actually holds right now. The
    /// WaitSet face filters fired slots through this, dropping wakeups
    /// whose cause was consumed in the meantime.
    fn is_condition_satisfied(&self, event: Self::Event) -> bool;
}
