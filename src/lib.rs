//! Periodic 1-D heat diffusion advanced through a dataflow task graph.
//!
//! The domain is split into `np` partitions of `nx` points. Every generation
//! of every partition is a single-assignment cell, and the task producing
//! partition `i` of generation `t + 1` fires as soon as partitions `i - 1`,
//! `i` and `i + 1` (with periodic wraparound) of generation `t` are
//! published. This gives:
//! - No barrier between generations: a wavefront of partitions may run ahead
//!   of its slower siblings.
//! - Results independent of thread count and scheduling order, since every
//!   published buffer is immutable and every output point is a pure function
//!   of already published inputs.
//! - Memory bounded by two generations of handles; older buffers are freed as
//!   soon as the last task reading them completes.
//!
//! Key modules:
//! - `stepper`: seeds generation 0, wires and submits the per-partition tasks.
//! - `partition`: the write-once `Partition` cell, the `Space` of one
//!   generation, and the `when_all` combinator.
//! - `kernel`: the heat stencil and its application to a whole partition.
//! - `collector`: blocks until a generation is resolved and returns it.
//! - `runtime`: what the stepper needs from a task runtime, with rayon-backed
//!   and inline implementations.
//!
//! Quick start:
//! 1. Build a `StepperConfig` (diffusion constants, thread count).
//! 2. Create a `Stepper` and call `run` with a `Problem { np, nx, nt }`.
//! 3. Read the partitions of generation `nt` from the returned `Solution`.
//!
//! Numerical stability (`k * dt / dx^2 <= 0.5`) is the caller's
//! responsibility; an unstable choice is logged and then computed as asked.

/// Immutable state of one partition at one generation.
pub mod buffer;
/// Blocking collection of a generation into plain data.
pub mod collector;
/// Diffusion constants, problem size and stepper configuration.
pub mod config;
/// Periodic index wrapping.
pub mod index;
/// Pointwise heat stencil and the per-partition kernel.
pub mod kernel;
/// Single-assignment partition cells, generation spaces and the await-all
/// combinator.
///
/// A partition is published exactly once. Continuations registered before
/// publication run on the publishing thread, after the buffer is stored.
pub mod partition;
/// Task runtime abstraction.
pub mod runtime;
/// Generation-by-generation construction of the task graph.
///
/// Contains the runtime-independent dependency wiring (periodic neighbours,
/// deduplicated subscriptions) and the submission of partition tasks.
pub mod stepper;
mod sync;
mod types;

pub use crate::{
    buffer::PartitionBuffer,
    collector::{Collector, Solution},
    config::{HeatParams, Problem, StepperConfig},
    partition::{Partition, Space},
    runtime::{InlineRuntime, RayonRuntime, Runtime},
    stepper::{Generation, Stepper, StepperSetupError},
};
