use crate::{kernel::DEFAULT_INTERIOR_GRAIN, stepper::StepperSetupError};
use core::num::NonZeroUsize;

/// Numeric constants of the heat-equation discretization, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatParams {
    /// Diffusion (heat transfer) coefficient.
    pub k: f64,
    /// Time-step size.
    pub dt: f64,
    /// Grid spacing.
    pub dx: f64,
}

impl Default for HeatParams {
    fn default() -> Self {
        Self {
            k: 0.5,
            dt: 1.0,
            dx: 1.0,
        }
    }
}

impl HeatParams {
    /// Largest diffusion number for which the explicit scheme is stable.
    pub const STABILITY_LIMIT: f64 = 0.5;

    /// The diffusion number `k * dt / dx^2`.
    #[must_use]
    pub fn diffusion_number(&self) -> f64 {
        self.k * self.dt / (self.dx * self.dx)
    }

    /// Whether the diffusion number is within [`Self::STABILITY_LIMIT`].
    ///
    /// Not enforced anywhere: an unstable choice just diverges.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.diffusion_number() <= Self::STABILITY_LIMIT
    }

    /// Reject constants the scheme is not defined for.
    ///
    /// # Errors
    /// If `k` is not finite, or if `dt` or `dx` is not a finite positive
    /// number. A negative `k` is accepted like any other unstable choice.
    pub fn validate(&self) -> Result<(), StepperSetupError> {
        let Self { k, dt, dx } = *self;
        if !k.is_finite() {
            return Err(StepperSetupError::InvalidParameter {
                name: "k",
                value: k,
            });
        }
        for (name, value) in [("dt", dt), ("dx", dx)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(StepperSetupError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Size of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Problem {
    /// Number of partitions.
    pub np: usize,
    /// Points per partition.
    pub nx: usize,
    /// Number of generations to advance.
    pub nt: usize,
}

impl Default for Problem {
    fn default() -> Self {
        Self {
            np: 10,
            nx: 10,
            nt: 45,
        }
    }
}

impl Problem {
    /// Problem of `np` partitions with `nx` points each, advanced `nt` times.
    #[must_use]
    pub fn new(np: usize, nx: usize, nt: usize) -> Self {
        Self { np, nx, nt }
    }

    /// Total number of grid points.
    #[must_use]
    pub fn points(&self) -> usize {
        self.np * self.nx
    }

    /// # Errors
    /// If there are no partitions or a partition has fewer than two points.
    pub fn validate(&self) -> Result<(), StepperSetupError> {
        if self.np == 0 {
            return Err(StepperSetupError::NoPartitions);
        }
        if self.nx < 2 {
            return Err(StepperSetupError::PartitionTooNarrow { nx: self.nx });
        }
        Ok(())
    }
}

/// Everything needed to construct a [`Stepper`](crate::stepper::Stepper).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperConfig {
    /// Diffusion constants.
    pub params: HeatParams,
    /// Worker threads; `None` leaves the choice to rayon.
    pub threads: Option<NonZeroUsize>,
    /// Minimum number of interior points per rayon job inside one partition.
    pub interior_grain: usize,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            params: HeatParams::default(),
            threads: None,
            interior_grain: DEFAULT_INTERIOR_GRAIN,
        }
    }
}

impl StepperConfig {
    /// Replace the diffusion constants.
    #[must_use]
    pub fn with_params(self, params: HeatParams) -> Self {
        Self { params, ..self }
    }

    /// Pin the number of worker threads.
    #[must_use]
    pub fn with_threads(self, threads: NonZeroUsize) -> Self {
        Self {
            threads: Some(threads),
            ..self
        }
    }

    /// Replace the interior grain.
    #[must_use]
    pub fn with_interior_grain(self, interior_grain: usize) -> Self {
        Self {
            interior_grain,
            ..self
        }
    }
}
