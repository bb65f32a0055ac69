mod listener;
mod origin;
mod table;
mod trigger;
mod waitset;

pub use listener::{Listener, ListenerError, ListenerImpl};
pub use origin::{EventOrigin, EventTag};
pub use trigger::TriggerHandle;
pub use waitset::{EventInfo, WaitSet, WaitSetError, WaitSetImpl};

/// Identifier of one slot in a dispatcher's table. Valid slot ids are
/// `< capacity()`; an id is only meaningful for the dispatcher that
/// handed it out.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(pub u64);
