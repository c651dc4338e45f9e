use crate::{
    buffer::PartitionBuffer,
    kernel::{PartitionKernel, Stencil},
    partition::{Partition, Space, when_all},
    runtime::Runtime,
    stepper::setup::{Links, Subscription},
};
use log::trace;

/// Descriptor of the task producing one partition of one generation.
///
/// Holds handles to the previous generation's partitions it reads and to the
/// cell it will publish into. Nothing runs until it is
/// [submitted](PartitionTask::submit).
#[must_use]
#[derive(Debug)]
pub struct PartitionTask {
    generation: usize,
    index: usize,
    /// Distinct previous-generation partitions, in subscription order.
    dependencies: Vec<Partition>,
    left: Subscription,
    middle: Subscription,
    right: Subscription,
    output: Partition,
}

impl PartitionTask {
    /// Capture the dependencies of `links` from `current`, the space of
    /// generation `generation - 1`.
    ///
    /// # Panics
    /// If `current` is smaller than the plan `links` was taken from.
    pub fn setup(generation: usize, links: &Links, current: &Space, output: Partition) -> Self {
        Self {
            generation,
            index: links.index(),
            dependencies: links
                .dependencies()
                .map(|index| current[index].clone())
                .collect(),
            left: links.left(),
            middle: links.middle(),
            right: links.right(),
            output,
        }
    }

    /// Generation this task produces.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Partition index this task produces.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Distinct partitions the task waits for.
    #[must_use]
    pub fn dependencies(&self) -> &[Partition] {
        &self.dependencies
    }

    /// Handle of the left neighbour.
    pub fn left(&self) -> &Partition {
        self.dependency(self.left)
    }

    /// Handle of the partition being advanced.
    pub fn middle(&self) -> &Partition {
        self.dependency(self.middle)
    }

    /// Handle of the right neighbour.
    pub fn right(&self) -> &Partition {
        self.dependency(self.right)
    }

    /// The cell the result is published into.
    pub fn output(&self) -> &Partition {
        &self.output
    }

    fn dependency(&self, subscription: Subscription) -> &Partition {
        &self.dependencies[subscription.position()]
    }

    fn read(&self, subscription: Subscription) -> &PartitionBuffer {
        self.dependency(subscription).expect_resolved()
    }

    /// Hand the task to `runtime` once all of its dependencies are resolved.
    ///
    /// Returns immediately. No worker is occupied while dependencies are
    /// pending; the job is spawned by whichever dependency resolves last.
    pub fn submit<S, R>(self, kernel: PartitionKernel<S>, runtime: &R)
    where
        S: Stencil,
        R: Runtime,
    {
        let dependencies = self.dependencies.clone();
        let runtime = runtime.clone();
        when_all(&dependencies, move || {
            runtime.spawn(move || self.run(&kernel));
        });
    }

    /// Compute and publish. All dependencies must be resolved.
    pub(crate) fn run<S: Stencil>(self, kernel: &PartitionKernel<S>) {
        let next = kernel.apply(self.read(self.left), self.read(self.middle), self.read(self.right));
        let Self {
            generation,
            index,
            dependencies,
            output,
            ..
        } = self;
        // Release the previous generation before anyone can observe the result.
        drop(dependencies);
        trace!("generation {generation}: partition {index} computed");
        output.publish(next);
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::{
        config::HeatParams,
        kernel::HeatKernel,
        runtime::InlineRuntime,
        stepper::setup::DependencyPlan,
    };

    fn kernel(k: f64) -> PartitionKernel<HeatKernel> {
        PartitionKernel::new(HeatKernel::new(&HeatParams {
            k,
            dt: 1.0,
            dx: 1.0,
        }))
    }

    #[test]
    fn single_partition_task_aliases_all_three_inputs() {
        let plan = DependencyPlan::setup(1);
        let current = Space::seeded(1, 2);
        let task = PartitionTask::setup(1, plan.links(0), &current, Partition::pending());
        assert_eq!(task.dependencies().len(), 1);
        assert!(task.left().ptr_eq(task.middle()));
        assert!(task.middle().ptr_eq(task.right()));
        assert!(task.middle().ptr_eq(&current[0]));

        let output = task.output().clone();
        task.submit(kernel(0.25), &InlineRuntime);
        // [0, 1] sees 1 on both sides of 0 and 0 on both sides of 1.
        assert_eq!(
            output.expect_resolved().as_slice(),
            [0.0 + 0.25 * (1.0 - 0.0 + 1.0), 1.0 + 0.25 * (0.0 - 2.0 + 0.0)]
        );
    }

    #[test]
    fn task_captures_periodic_neighbours() {
        let plan = DependencyPlan::setup(4);
        let current = Space::seeded(4, 3);
        let task = PartitionTask::setup(1, plan.links(0), &current, Partition::pending());
        assert_eq!((task.generation(), task.index()), (1, 0));
        assert!(task.left().ptr_eq(&current[3]));
        assert!(task.middle().ptr_eq(&current[0]));
        assert!(task.right().ptr_eq(&current[1]));

        let output = task.output().clone();
        task.submit(kernel(0.5), &InlineRuntime);
        assert_eq!(output.expect_resolved().as_slice(), [6.0, 1.0, 2.0]);
    }

    #[test]
    fn submitted_task_waits_for_pending_dependencies() {
        let plan = DependencyPlan::setup(3);
        let current = Space::pending(3);
        let task = PartitionTask::setup(2, plan.links(1), &current, Partition::pending());
        let output = task.output().clone();
        task.submit(kernel(0.5), &InlineRuntime);

        current[0].publish(PartitionBuffer::seeded(2, 0.0));
        current[2].publish(PartitionBuffer::seeded(2, 2.0));
        assert!(!output.is_resolved());
        current[1].publish(PartitionBuffer::seeded(2, 1.0));
        // left = [0, 1], middle = [2, 3], right = [4, 5]
        assert_eq!(output.expect_resolved().as_slice(), [2.0, 3.0]);
    }
}
