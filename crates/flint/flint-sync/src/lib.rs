mod arena;
mod fatal;
mod layout;
mod pool;
mod sema;
mod signal;

pub use arena::ConditionArena;
pub use layout::{MAX_EVENTS, SharedCondition, bytes_for_condition};
pub use pool::IndexPool;
pub use signal::{Notifier, Waiter};
