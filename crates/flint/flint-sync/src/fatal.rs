//! Last-resort handling for corrupted synchronization primitives.
//!
//! A semaphore call that fails outside of EINTR/EAGAIN/ETIMEDOUT means the
//! primitive's state is no longer trustworthy; every such failure funnels
//! through here and terminates the process instead of limping on with
//! broken wakeups.

use std::io;

#[cold]
pub(crate) fn sync_primitive_failure(op: &'static str, err: io::Error) -> ! {
    tracing::error!(op, error = %err, "semaphore operation failed, aborting");
    std::process::abort();
}
