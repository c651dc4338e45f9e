use crate::{
    buffer::PartitionBuffer,
    partition::Space,
    stepper::Generation,
    sync::{Arc, Condvar, Mutex},
};

/// Resolved state of one generation as plain data.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    generation: usize,
    partitions: Vec<PartitionBuffer>,
}

impl Solution {
    /// Generation number.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Partitions in index order.
    #[must_use]
    pub fn partitions(&self) -> &[PartitionBuffer] {
        &self.partitions
    }

    /// Take the partitions.
    #[must_use]
    pub fn into_partitions(self) -> Vec<PartitionBuffer> {
        self.partitions
    }

    /// Every value of the domain, partition after partition.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.partitions.iter().flat_map(|p| p.iter().copied())
    }
}

/// Blocks until a generation is resolved and materializes it.
///
/// This is the only blocking point of a run. Call it from outside the worker
/// pool: it parks the calling thread until the workers have published every
/// partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collector;

impl Collector {
    /// Park the current thread until every partition of `space` is resolved.
    pub fn wait(space: &Space) {
        let latch = Arc::new(Latch::new(space.len()));
        for partition in space.iter() {
            let latch = Arc::clone(&latch);
            partition.on_resolved(move || latch.count_down());
        }
        latch.wait();
    }

    /// Wait for `generation` and return its buffers in partition order.
    pub fn collect(generation: Generation) -> Solution {
        Self::wait(generation.space());
        let number = generation.number();
        let partitions = generation
            .into_space()
            .iter()
            .map(|partition| partition.expect_resolved().clone())
            .collect();
        Solution {
            generation: number,
            partitions,
        }
    }
}

/// Countdown latch released by partition continuations.
struct Latch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl Latch {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    fn count_down(&self) {
        let mut remaining = self.remaining.lock().expect("Latch::count_down: [1]");
        *remaining = remaining.checked_sub(1).expect("Latch::count_down: [2]");
        if *remaining == 0 {
            self.released.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock().expect("Latch::wait: [1]");
        while *remaining != 0 {
            remaining = self.released.wait(remaining).expect("Latch::wait: [2]");
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use std::{thread, time::Duration};

    #[test]
    fn resolved_space_returns_immediately() {
        let space = Space::seeded(2, 2);
        Collector::wait(&space);
        assert!(space.is_resolved());
    }

    #[test]
    fn empty_space_does_not_block() {
        Collector::wait(&Space::default());
    }

    #[test]
    fn waits_for_partitions_published_elsewhere() {
        let space = Space::pending(3);
        let producers = space.clone();
        let handle = thread::spawn(move || {
            for (i, partition) in producers.iter().enumerate().rev() {
                thread::sleep(Duration::from_millis(5));
                partition.publish(PartitionBuffer::from(vec![f64::from(u8::try_from(i).unwrap()); 2]));
            }
        });
        Collector::wait(&space);
        assert!(space.is_resolved());
        handle.join().unwrap();
    }

    #[test]
    fn collect_keeps_partition_order() {
        let space: Space = [2.0, 0.0, 1.0]
            .into_iter()
            .map(|v| Partition::ready(PartitionBuffer::seeded(2, v)))
            .collect();
        let generation = Generation::from_parts(7, space);
        let solution = Collector::collect(generation);
        assert_eq!(solution.generation(), 7);
        assert_eq!(solution.values().collect::<Vec<_>>(), [4.0, 5.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(solution.into_partitions().len(), 3);
    }
}
