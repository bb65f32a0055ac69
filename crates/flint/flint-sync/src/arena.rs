//! Storage arenas for `SharedCondition`.
//!
//! An arena owns the memory a condition lives in — a private heap
//! allocation or a mapped file segment — and hands out references bounded
//! by its own lifetime. No raw condition pointer appears in any public API;
//! everything that signals or waits holds the arena through an `Arc`.

use crate::layout::{SharedCondition, bytes_for_condition};
use flint_mmap::MmapRegion;
use std::io;
use std::path::Path;

pub struct ConditionArena {
    backing: Backing,
    /// The creating side. Marks the condition for destruction on drop and,
    /// for heap backings, tears down the semaphore.
    owner: bool,
}

enum Backing {
    Heap(Box<SharedCondition>),
    Mapped(MmapRegion),
}

impl ConditionArena {
    /// Heap-backed condition for use inside one process.
    pub fn in_process() -> io::Result<Self> {
        let mut slot = Box::<SharedCondition>::new_uninit();
        // SAFETY: the box provides aligned writable storage for exactly one
        // condition; init_at fully initializes it before assume_init.
        let cond = unsafe {
            SharedCondition::init_at(slot.as_mut_ptr(), false)?;
            slot.assume_init()
        };
        Ok(Self {
            backing: Backing::Heap(cond),
            owner: true,
        })
    }

    /// Create and initialize a file-backed segment other processes can
    /// attach to.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut region = MmapRegion::create_rw(path, bytes_for_condition() as u64)?;
        // SAFETY: the region was just created with exactly enough room and
        // no other process has attached yet.
        unsafe {
            SharedCondition::init_at(region.as_mut_ptr() as *mut SharedCondition, true)?;
        }
        Ok(Self {
            backing: Backing::Mapped(region),
            owner: true,
        })
    }

    /// Attach to an existing segment created by another process.
    ///
    /// Rejects segments that are too small, are not condition segments, use
    /// an incompatible layout, or are already marked for destruction.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let region = MmapRegion::open_rw(path)?;
        if region.len() < bytes_for_condition() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "segment too small for a condition",
            ));
        }
        // SAFETY: length was checked; validate() rejects foreign contents.
        let cond = unsafe { &*(region.as_ptr() as *const SharedCondition) };
        cond.validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self {
            backing: Backing::Mapped(region),
            owner: false,
        })
    }

    pub fn condition(&self) -> &SharedCondition {
        match &self.backing {
            Backing::Heap(cond) => cond,
            // SAFETY: construction initialized or validated the contents
            // and the mapping lives as long as the arena.
            Backing::Mapped(region) => unsafe { &*(region.as_ptr() as *const SharedCondition) },
        }
    }
}

impl Drop for ConditionArena {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        self.condition().mark_to_be_destroyed();
        if let Backing::Heap(cond) = &self.backing {
            // SAFETY: sole owner of a process-private condition; nothing
            // can still be blocked on its semaphore.
            unsafe { cond.semaphore().destroy() };
        }
    }
}
