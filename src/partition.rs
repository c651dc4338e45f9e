use crate::{buffer::PartitionBuffer, sync::*, types::SyncUnsafeCell};
use core::fmt;
use derive_more::Deref;

type Continuation = Box<dyn FnOnce() + Send>;

enum CellState {
    /// Not yet published. Holds the continuations to run once it is.
    Pending(Vec<Continuation>),
    Resolved,
}

struct PartitionCell {
    /// Written exactly once, while `state` is `Pending` and its lock is held.
    buffer: SyncUnsafeCell<Option<PartitionBuffer>>,
    state: Mutex<CellState>,
}

/// Single-assignment asynchronous cell holding one [`PartitionBuffer`].
///
/// A partition starts either resolved ([`Partition::ready`]) or pending
/// ([`Partition::pending`]). A pending partition is resolved exactly once by
/// its producer via [`Partition::publish`]; consumers either read it
/// non-blockingly with [`Partition::try_get`] or register a continuation with
/// [`Partition::on_resolved`].
///
/// Cloning a partition clones the handle, not the buffer. The buffer is freed
/// once the last handle is dropped.
#[must_use]
#[derive(Clone)]
pub struct Partition(Arc<PartitionCell>);

impl Partition {
    /// An already resolved partition.
    pub fn ready(buffer: PartitionBuffer) -> Self {
        Self::with_state(Some(buffer), CellState::Resolved)
    }

    /// A partition whose buffer is yet to be published.
    pub fn pending() -> Self {
        Self::with_state(None, CellState::Pending(Vec::new()))
    }

    fn with_state(buffer: Option<PartitionBuffer>, state: CellState) -> Self {
        Self(Arc::new(PartitionCell {
            buffer: SyncUnsafeCell::new(buffer),
            state: Mutex::new(state),
        }))
    }

    /// Resolve the partition and run every continuation registered so far on
    /// the current thread.
    ///
    /// # Panics
    /// If the partition is already resolved.
    pub fn publish(&self, buffer: PartitionBuffer) {
        let Self(cell) = self;
        let mut state = cell.state.lock().expect("Partition::publish: [1]");
        let CellState::Pending(continuations) = &mut *state else {
            panic!("Partition::publish: partition is already resolved");
        };
        let continuations = core::mem::take(continuations);
        // SAFETY: The state is still `Pending` and we hold its lock, so no reader
        // has been allowed to look at the slot yet and no other producer can
        // write it concurrently.
        unsafe {
            cell.buffer
                .get_mut()
                .with(|ptr| *ptr.as_mut().unwrap() = Some(buffer));
        }
        *state = CellState::Resolved;
        drop(state);

        for continuation in continuations {
            continuation();
        }
    }

    /// Run `continuation` once the partition is resolved.
    ///
    /// Runs it right away on the current thread if the partition is already
    /// resolved, otherwise on the thread that eventually publishes it.
    pub fn on_resolved(&self, continuation: impl FnOnce() + Send + 'static) {
        let mut state = self.0.state.lock().expect("Partition::on_resolved: [1]");
        if let CellState::Pending(continuations) = &mut *state {
            continuations.push(Box::new(continuation));
            return;
        }
        drop(state);
        continuation();
    }

    /// Whether the buffer has been published.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        let state = self.0.state.lock().expect("Partition::is_resolved: [1]");
        matches!(*state, CellState::Resolved)
    }

    /// The published buffer, or `None` while the partition is pending.
    #[must_use]
    pub fn try_get(&self) -> Option<&PartitionBuffer> {
        if !self.is_resolved() {
            return None;
        }
        // SAFETY: A resolved slot is never written again, and the lock taken by
        // `is_resolved` orders this read after the publishing write.
        unsafe {
            self.0
                .buffer
                .get()
                .with(|ptr| ptr.as_ref().and_then(Option::as_ref))
        }
    }

    /// The published buffer.
    ///
    /// # Panics
    /// If the partition is still pending.
    pub fn expect_resolved(&self) -> &PartitionBuffer {
        self.try_get()
            .expect("Partition::expect_resolved: partition is still pending")
    }

    /// Number of live handles to this cell.
    #[cfg(all(test, not(feature = "loom")))]
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether both handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Partition").field(&self.try_get()).finish()
    }
}

/// Run `then` once every partition in `dependencies` is resolved.
///
/// No thread waits in the meantime: one continuation is registered per
/// dependency, and whichever dependency resolves last runs `then` on its
/// publishing thread. If everything is resolved already, `then` runs before
/// this function returns.
pub fn when_all<F>(dependencies: &[Partition], then: F)
where
    F: FnOnce() + Send + Sync + 'static,
{
    if dependencies.is_empty() {
        then();
        return;
    }
    let await_all = Arc::new(AwaitAll {
        pending: AtomicUsize::new(dependencies.len()),
        then: SyncUnsafeCell::new(Some(then)),
    });
    for dependency in dependencies {
        let await_all = Arc::clone(&await_all);
        dependency.on_resolved(move || await_all.resolve_one());
    }
}

struct AwaitAll<F> {
    /// Number of dependencies that haven't resolved yet.
    pending: AtomicUsize,
    then: SyncUnsafeCell<Option<F>>,
}

impl<F: FnOnce()> AwaitAll<F> {
    fn resolve_one(&self) {
        fence(Ordering::Release);
        if self.pending.fetch_sub(1, Ordering::Relaxed) != 1 {
            return;
        }
        fence(Ordering::Acquire);
        // SAFETY: Only the call that observed the counter reach zero gets here,
        // and that happens exactly once. The acquire fence orders it after every
        // other dependency's release.
        let then = unsafe {
            self.then
                .get_mut()
                .with(|ptr| ptr.as_mut().and_then(Option::take))
        };
        if let Some(then) = then {
            then();
        }
    }
}

/// All partitions of one generation, ordered by partition index.
#[must_use]
#[derive(Debug, Clone, Default, Deref)]
pub struct Space {
    #[deref(forward)]
    partitions: Vec<Partition>,
}

impl Space {
    /// Generation 0: partition `i` holds `value[j] = i * nx + j`.
    #[allow(clippy::cast_precision_loss)]
    pub fn seeded(np: usize, nx: usize) -> Self {
        (0..np)
            .map(|i| Partition::ready(PartitionBuffer::seeded(nx, i as f64)))
            .collect()
    }

    /// `np` pending partitions.
    pub fn pending(np: usize) -> Self {
        (0..np).map(|_| Partition::pending()).collect()
    }

    /// Whether every partition has been published.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.partitions.iter().all(Partition::is_resolved)
    }
}

impl FromIterator<Partition> for Space {
    fn from_iter<I: IntoIterator<Item = Partition>>(iter: I) -> Self {
        Self {
            partitions: iter.into_iter().collect(),
        }
    }
}
