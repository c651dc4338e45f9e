use core::{fmt, num::NonZeroUsize, ops::Range};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder, prelude::*};
use std::sync::Arc;

/// What the stepper needs from a task runtime.
///
/// Implementations decide where jobs run. The stepper only relies on every
/// spawned job eventually running exactly once, and on `for_each_index`
/// returning after `op` has been called for every index.
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Run `job` asynchronously. Must not block waiting for it.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;

    /// Call `op` for every index in `range`, possibly in parallel, and return
    /// once all calls have completed.
    fn for_each_index<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync;
}

/// Runtime backed by a dedicated rayon thread pool.
///
/// A panicking job aborts the process (rayon's default for `spawn`), so any
/// failed task is fatal to the run.
#[derive(Clone)]
pub struct RayonRuntime {
    pool: Arc<ThreadPool>,
}

impl RayonRuntime {
    /// Pool with `threads` workers, or rayon's default when `None`.
    ///
    /// # Errors
    /// If the operating system refuses to start the worker threads.
    pub fn new(threads: Option<NonZeroUsize>) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.map_or(0, NonZeroUsize::get))
            .thread_name(|i| format!("heat-worker-{i}"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl fmt::Debug for RayonRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonRuntime")
            .field("threads", &self.threads())
            .finish()
    }
}

impl Runtime for RayonRuntime {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }

    fn for_each_index<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        self.pool.install(|| range.into_par_iter().for_each(op));
    }
}

/// Runtime that runs everything immediately on the calling thread.
///
/// Spawned jobs run before `spawn` returns and indices are visited in order,
/// which makes a run fully sequential and reproducible step by step.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRuntime;

impl Runtime for InlineRuntime {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        job();
    }

    fn for_each_index<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        range.for_each(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };

    #[test]
    fn rayon_for_each_visits_every_index_once() {
        let runtime = RayonRuntime::new(NonZeroUsize::new(4)).unwrap();
        assert_eq!(runtime.threads(), 4);
        let hits: Vec<_> = (0..100).map(|_| AtomicUsize::new(0)).collect();
        runtime.for_each_index(0..100, |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn rayon_spawn_runs_on_a_worker() {
        let runtime = RayonRuntime::new(NonZeroUsize::new(2)).unwrap();
        let (tx, rx) = mpsc::channel();
        runtime.spawn(move || {
            tx.send(rayon::current_thread_index().is_some()).unwrap();
        });
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn inline_runtime_is_sequential() {
        let seen = Mutex::new(Vec::new());
        InlineRuntime.for_each_index(0..5, |i| seen.lock().unwrap().push(i));
        assert_eq!(*seen.lock().unwrap(), [0, 1, 2, 3, 4]);

        let ran = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&ran);
        InlineRuntime.spawn(move || {
            observed.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(ran.load(Ordering::Relaxed), 1);
    }
}
