use crate::sync::UnsafeCell;
use derive_more::Deref;
use indexmap::IndexSet as _IndexSet;
use rustc_hash::FxBuildHasher;

/// A minimal `UnsafeCell` wrapper that is `Sync` when `T: Sync`.
///
/// Used internally by partition cells and await-all counters to enable
/// interior mutability across threads while correctness is ensured by the
/// publication protocol (a slot is written by exactly one thread, before any
/// reader is allowed to observe it).
#[derive(Debug, Deref)]
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T>(UnsafeCell<T>);

unsafe impl<T: Sync> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    pub(crate) fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }
}

/// `IndexSet` type with fast hasher.
pub type IndexSet<T> = _IndexSet<T, FxBuildHasher>;
