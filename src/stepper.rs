mod execute;
mod setup;

/// Descriptor of one partition task, with the handles it captured.
pub use crate::stepper::execute::PartitionTask;
/// Runtime-independent dependency wiring and setup errors.
///
/// [`StepperSetupError`] is returned before any task is spawned when the
/// problem or the diffusion constants are invalid.
pub use crate::stepper::setup::{DependencyPlan, Links, StepperSetupError, Subscription};
use crate::{
    collector::{Collector, Solution},
    config::{HeatParams, Problem, StepperConfig},
    kernel::{HeatKernel, PartitionKernel},
    partition::Space,
    runtime::{RayonRuntime, Runtime},
};
use log::{debug, info, warn};

/// One generation of the domain: its number and its (possibly still pending)
/// partitions.
#[must_use]
#[derive(Debug, Clone)]
pub struct Generation {
    number: usize,
    space: Space,
}

impl Generation {
    /// Generation 0 of `problem`: partition `i` holds `i * nx + j` at point `j`.
    ///
    /// # Errors
    /// If `problem` has no partitions or partitions narrower than two points.
    pub fn initial(problem: Problem) -> Result<Self, StepperSetupError> {
        problem.validate()?;
        Ok(Self::from_parts(0, Space::seeded(problem.np, problem.nx)))
    }

    pub(crate) fn from_parts(number: usize, space: Space) -> Self {
        Self { number, space }
    }

    /// Generation number; 0 is the initial condition.
    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    /// Partitions of this generation.
    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Take the partitions.
    pub fn into_space(self) -> Space {
        self.space
    }
}

/// Builds and drives the generation-by-generation dataflow graph.
///
/// Task `(t, i)` depends only on tasks `(t - 1, i - 1)`, `(t - 1, i)` and
/// `(t - 1, i + 1)` with periodic wraparound. There is no barrier between
/// generations: a partition is advanced as soon as its three predecessors are
/// published, whatever the state of its siblings.
///
/// Only two generations of handles are kept by the stepper itself (the
/// current and the next one). A generation is released before the one after
/// next is wired, so at most `2 * np` buffers are alive once its readers have
/// run.
#[must_use]
#[derive(Debug, Clone)]
pub struct Stepper<R: Runtime = RayonRuntime> {
    params: HeatParams,
    kernel: PartitionKernel<HeatKernel>,
    runtime: R,
}

impl Stepper<RayonRuntime> {
    /// Stepper running on a fresh rayon pool.
    ///
    /// # Errors
    /// If the diffusion constants are invalid or the pool cannot be started.
    pub fn new(config: &StepperConfig) -> Result<Self, StepperSetupError> {
        config.params.validate()?;
        let runtime = RayonRuntime::new(config.threads)?;
        Self::with_runtime(config, runtime)
    }
}

impl<R: Runtime> Stepper<R> {
    /// Stepper running on `runtime`.
    ///
    /// # Errors
    /// If the diffusion constants are invalid.
    pub fn with_runtime(config: &StepperConfig, runtime: R) -> Result<Self, StepperSetupError> {
        let StepperConfig {
            params,
            threads: _,
            interior_grain,
        } = *config;
        params.validate()?;
        if !params.is_stable() {
            warn!(
                "diffusion number {} exceeds the stability limit {}; the solution will diverge",
                params.diffusion_number(),
                HeatParams::STABILITY_LIMIT
            );
        }
        if params.k < 0.0 {
            warn!("negative diffusion coefficient {}; heat will concentrate", params.k);
        }
        Ok(Self {
            params,
            kernel: PartitionKernel::with_grain(HeatKernel::new(&params), interior_grain),
            runtime,
        })
    }

    /// Diffusion constants of this stepper.
    #[must_use]
    pub fn params(&self) -> &HeatParams {
        &self.params
    }

    /// The runtime tasks are submitted to.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Build the whole task graph for `problem` and return generation `nt`.
    ///
    /// Returns as soon as every task is submitted. The returned partitions
    /// resolve as the tasks complete; use [`Collector`] to wait for them.
    ///
    /// # Errors
    /// If `problem` has no partitions or partitions narrower than two points.
    pub fn do_work(&self, problem: Problem) -> Result<Generation, StepperSetupError> {
        let initial = Generation::initial(problem)?;
        let Problem { np, nx, nt } = problem;
        info!(
            "advancing {np} partitions of {nx} points over {nt} generations (diffusion number {})",
            self.params.diffusion_number()
        );
        Ok(self.advance(initial, nt))
    }

    /// Wire `steps` more generations on top of `generation` and return the
    /// last one.
    ///
    /// Returns as soon as every task is submitted, like [`Stepper::do_work`].
    /// `generation` may itself be pending. Stopping at an intermediate
    /// generation, collecting it and advancing it further gives the same
    /// result as a single longer run.
    pub fn advance(&self, generation: Generation, steps: usize) -> Generation {
        let Generation { number, space } = generation;
        let np = space.len();
        let plan = DependencyPlan::setup(np);
        let mut current = space;

        for t in number..number + steps {
            let next = Space::pending(np);
            self.runtime.for_each_index(0..np, |i| {
                PartitionTask::setup(t + 1, plan.links(i), &current, next[i].clone())
                    .submit(self.kernel, &self.runtime);
            });
            debug!("generation {} wired", t + 1);
            // Generation t is released here, before t + 2 is wired.
            current = next;
        }

        Generation::from_parts(number + steps, current)
    }

    /// Run `problem` to completion and collect generation `nt`.
    ///
    /// # Errors
    /// See [`Stepper::do_work`].
    pub fn run(&self, problem: Problem) -> Result<Solution, StepperSetupError> {
        let generation = self.do_work(problem)?;
        let solution = Collector::collect(generation);
        info!("generation {} collected", solution.generation());
        Ok(solution)
    }
}
