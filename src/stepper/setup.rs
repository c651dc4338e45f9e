use crate::{index::neighbours, types::IndexSet};
use rayon::ThreadPoolBuildError;
use rustc_hash::FxBuildHasher;
use thiserror::Error;

/// Error kind for stepper setup failures.
///
/// Every variant is raised before any task is spawned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StepperSetupError {
    /// The problem has no partitions.
    #[error("at least one partition is required")]
    NoPartitions,
    /// A partition has fewer than two points, so it has no distinct edges.
    #[error("partitions need at least 2 points, got {nx}")]
    PartitionTooNarrow {
        /// Requested points per partition.
        nx: usize,
    },
    /// A diffusion constant is outside the range the scheme is defined for.
    #[error("parameter `{name}` is out of range: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The worker pool could not be started.
    #[error("failed to start the worker pool")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// Opaque handle to one subscribed dependency of a partition task.
///
/// It is the position of the dependency in the task's deduplicated dependency
/// list, so several roles may share a subscription when neighbours coincide.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Subscription(pub(crate) usize);

impl Subscription {
    /// Position in the task's dependency list.
    #[must_use]
    pub fn position(self) -> usize {
        self.0
    }
}

/// Dependencies of the task advancing one partition by one generation.
///
/// Identical for every generation: partition `i` of generation `t + 1` reads
/// partitions `idx(i - 1)`, `i` and `idx(i + 1)` of generation `t`.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    index: usize,
    /// Distinct partition indices of the previous generation, in subscription
    /// order.
    dependencies: IndexSet<usize>,
    left: Subscription,
    middle: Subscription,
    right: Subscription,
}

impl Links {
    /// Wire partition `index` of a domain of `np` partitions.
    ///
    /// # Panics
    /// If `np` is zero.
    pub fn setup(index: usize, np: usize) -> Self {
        let (left_index, right_index) = neighbours(index, np);
        let mut dependencies = IndexSet::with_capacity_and_hasher(3, FxBuildHasher);
        let mut subscribe = |partition_index| {
            let (position, _) = dependencies.insert_full(partition_index);
            Subscription(position)
        };
        let left = subscribe(left_index);
        let middle = subscribe(index);
        let right = subscribe(right_index);
        Self {
            index,
            dependencies,
            left,
            middle,
            right,
        }
    }

    /// Partition index this task produces.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Distinct previous-generation partition indices, in subscription order.
    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.dependencies.iter().copied()
    }

    /// Partition index behind a subscription.
    ///
    /// # Panics
    /// If the subscription does not belong to this task.
    #[must_use]
    pub fn resolve(&self, subscription: Subscription) -> usize {
        *self
            .dependencies
            .get_index(subscription.0)
            .expect("Links::resolve: foreign subscription")
    }

    /// Subscription of the left neighbour.
    #[must_use]
    pub fn left(&self) -> Subscription {
        self.left
    }

    /// Subscription of the partition itself.
    #[must_use]
    pub fn middle(&self) -> Subscription {
        self.middle
    }

    /// Subscription of the right neighbour.
    #[must_use]
    pub fn right(&self) -> Subscription {
        self.right
    }
}

/// Wiring of every partition task of one generation step.
///
/// Pure index arithmetic, built once per run and shared by all generations.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyPlan {
    links: Vec<Links>,
}

impl DependencyPlan {
    /// Wire all `np` partitions.
    ///
    /// # Panics
    /// If `np` is zero.
    pub fn setup(np: usize) -> Self {
        assert_ne!(np, 0, "DependencyPlan::setup: no partitions");
        Self {
            links: (0..np).map(|index| Links::setup(index, np)).collect(),
        }
    }

    /// Number of partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Always `false`: a plan has at least one partition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Wiring of partition `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn links(&self, index: usize) -> &Links {
        &self.links[index]
    }

    /// Wiring of every partition, by index.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Links> {
        self.links.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(links: &Links) -> [usize; 3] {
        [links.left(), links.middle(), links.right()].map(|s| links.resolve(s))
    }

    #[test]
    fn interior_partition_reads_three_distinct_neighbours() {
        let plan = DependencyPlan::setup(4);
        assert_eq!(plan.len(), 4);
        let links = plan.links(2);
        assert_eq!(links.index(), 2);
        assert_eq!(links.dependencies().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(roles(links), [1, 2, 3]);
    }

    #[test]
    fn boundary_partitions_wrap_around() {
        let plan = DependencyPlan::setup(4);
        assert_eq!(roles(plan.links(0)), [3, 0, 1]);
        assert_eq!(roles(plan.links(3)), [2, 3, 0]);
    }

    #[test]
    fn single_partition_subscribes_to_itself_once() {
        let plan = DependencyPlan::setup(1);
        let links = plan.links(0);
        assert_eq!(links.dependencies().len(), 1);
        assert_eq!(links.left(), links.middle());
        assert_eq!(links.middle(), links.right());
        assert_eq!(roles(links), [0, 0, 0]);
    }

    #[test]
    fn two_partitions_share_left_and_right() {
        let plan = DependencyPlan::setup(2);
        let links = plan.links(0);
        assert_eq!(links.dependencies().collect::<Vec<_>>(), [1, 0]);
        assert_eq!(links.left(), links.right());
        assert_ne!(links.left(), links.middle());
    }

    #[test]
    fn every_partition_depends_on_at_most_three() {
        let plan = DependencyPlan::setup(7);
        assert!(plan.iter().all(|links| links.dependencies().len() == 3));
        assert!(plan.iter().enumerate().all(|(i, links)| links.index() == i));
    }

    #[test]
    #[should_panic(expected = "no partitions")]
    fn empty_plan_is_rejected() {
        let _ = DependencyPlan::setup(0);
    }
}
