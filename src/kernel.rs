use crate::{buffer::PartitionBuffer, config::HeatParams};
use rayon::prelude::*;

/// Pointwise three-point stencil operator.
pub trait Stencil: Copy + Send + Sync + 'static {
    /// Next value of `middle` given its left and right neighbours.
    fn apply(&self, left: f64, middle: f64, right: f64) -> f64;
}

/// Explicit finite-difference update of the heat equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatKernel {
    /// `k * dt / dx^2`.
    factor: f64,
}

impl HeatKernel {
    /// Kernel for the given diffusion constants.
    #[must_use]
    pub fn new(params: &HeatParams) -> Self {
        Self {
            factor: params.diffusion_number(),
        }
    }

    /// The diffusion number `k * dt / dx^2`.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// `middle + k*dt/dx^2 * (left - 2*middle + right)`.
    #[inline]
    #[must_use]
    pub fn heat(&self, left: f64, middle: f64, right: f64) -> f64 {
        middle + self.factor * (left - 2.0 * middle + right)
    }
}

impl Stencil for HeatKernel {
    #[inline]
    fn apply(&self, left: f64, middle: f64, right: f64) -> f64 {
        self.heat(left, middle, right)
    }
}

/// Minimum number of interior points handed to a single rayon job.
pub const DEFAULT_INTERIOR_GRAIN: usize = 4096;

/// Applies a [`Stencil`] across every point of one partition.
#[derive(Debug, Clone, Copy)]
pub struct PartitionKernel<S> {
    stencil: S,
    interior_grain: usize,
}

impl<S: Stencil> PartitionKernel<S> {
    /// Kernel splitting the interior into rayon jobs of at least
    /// [`DEFAULT_INTERIOR_GRAIN`] points.
    pub fn new(stencil: S) -> Self {
        Self::with_grain(stencil, DEFAULT_INTERIOR_GRAIN)
    }

    /// Kernel splitting the interior into rayon jobs of at least
    /// `interior_grain` points.
    pub fn with_grain(stencil: S, interior_grain: usize) -> Self {
        Self {
            stencil,
            interior_grain: interior_grain.max(1),
        }
    }

    /// Next generation of `middle`, given its periodic neighbours.
    ///
    /// The first point borrows its left neighbour from the last point of
    /// `left`, the last point borrows its right neighbour from the first point
    /// of `right`. Interior points only read `middle` and are computed in
    /// parallel.
    ///
    /// All three buffers must have the same length of at least 2. They may
    /// alias each other, which is the case for a single-partition domain.
    pub fn apply(
        &self,
        left: &PartitionBuffer,
        middle: &PartitionBuffer,
        right: &PartitionBuffer,
    ) -> PartitionBuffer {
        let size = middle.len();
        debug_assert!(size >= 2, "PartitionKernel::apply: partition too narrow");
        debug_assert_eq!(left.len(), size, "PartitionKernel::apply: [1]");
        debug_assert_eq!(right.len(), size, "PartitionKernel::apply: [2]");

        let Self {
            stencil,
            interior_grain,
        } = *self;
        let mut next = vec![0.0; size];

        next[0] = stencil.apply(left[size - 1], middle[0], middle[1]);
        next[1..size - 1]
            .par_iter_mut()
            .zip(middle.par_windows(3))
            .with_min_len(interior_grain)
            .for_each(|(point, window)| *point = stencil.apply(window[0], window[1], window[2]));
        next[size - 1] = stencil.apply(middle[size - 2], middle[size - 1], right[0]);

        PartitionBuffer::from(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat(k: f64) -> PartitionKernel<HeatKernel> {
        PartitionKernel::new(HeatKernel::new(&HeatParams {
            k,
            dt: 1.0,
            dx: 1.0,
        }))
    }

    #[test]
    fn heat_matches_the_difference_formula() {
        let kernel = HeatKernel::new(&HeatParams {
            k: 0.5,
            dt: 1.0,
            dx: 1.0,
        });
        assert_eq!(kernel.heat(11.0, 0.0, 1.0), 6.0);
        assert_eq!(kernel.heat(0.0, 1.0, 2.0), 1.0);
        assert_eq!(kernel.heat(1.0, 2.0, 3.0), 2.0);
    }

    #[test]
    fn factor_scales_with_grid_spacing() {
        let kernel = HeatKernel::new(&HeatParams {
            k: 1.0,
            dt: 0.5,
            dx: 2.0,
        });
        assert_eq!(kernel.factor(), 0.125);
    }

    #[test]
    fn edges_read_from_neighbouring_partitions() {
        let left = PartitionBuffer::seeded(3, 3.0);
        let middle = PartitionBuffer::seeded(3, 0.0);
        let right = PartitionBuffer::seeded(3, 1.0);
        let next = heat(0.5).apply(&left, &middle, &right);
        assert_eq!(next.as_slice(), [6.0, 1.0, 2.0]);
    }

    /// Takes the left neighbour of every point.
    #[derive(Clone, Copy)]
    struct ShiftRight;

    impl Stencil for ShiftRight {
        fn apply(&self, left: f64, _middle: f64, _right: f64) -> f64 {
            left
        }
    }

    #[test]
    fn any_stencil_sees_the_same_neighbourhood() {
        let left = PartitionBuffer::seeded(4, 0.0);
        let middle = PartitionBuffer::seeded(4, 1.0);
        let right = PartitionBuffer::seeded(4, 2.0);
        let shifted = PartitionKernel::with_grain(ShiftRight, 1).apply(&left, &middle, &right);
        assert_eq!(shifted.as_slice(), [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn zero_diffusion_is_identity() {
        let left = PartitionBuffer::from(vec![-7.0, 100.0, 3.5, 9.0]);
        let middle = PartitionBuffer::from(vec![1.0, -2.0, 0.25, 8.0]);
        let right = PartitionBuffer::from(vec![42.0, 0.0, 1.0, -1.0]);
        let next = heat(0.0).apply(&left, &middle, &right);
        assert_eq!(next, middle);
    }

    #[test]
    fn two_point_partition_has_no_interior() {
        let buffer = PartitionBuffer::from(vec![1.0, 3.0]);
        let next = heat(0.25).apply(&buffer, &buffer, &buffer);
        // Both points see the other point on either side.
        assert_eq!(next.as_slice(), [1.0 + 0.25 * (3.0 - 2.0 + 3.0), 3.0 + 0.25 * (1.0 - 6.0 + 1.0)]);
    }

    #[test]
    fn interior_result_does_not_depend_on_grain() {
        let left = PartitionBuffer::seeded(64, 2.0);
        let middle = PartitionBuffer::from((0..64).map(|j| f64::from(j % 7) * 1.5).collect::<Vec<_>>());
        let right = PartitionBuffer::seeded(64, 1.0);
        let stencil = HeatKernel::new(&HeatParams::default());
        let coarse = PartitionKernel::with_grain(stencil, 1024).apply(&left, &middle, &right);
        let fine = PartitionKernel::with_grain(stencil, 1).apply(&left, &middle, &right);
        assert_eq!(coarse, fine);
    }

    #[test]
    fn inputs_are_left_untouched() {
        let left = PartitionBuffer::seeded(5, 1.0);
        let middle = PartitionBuffer::seeded(5, 2.0);
        let right = PartitionBuffer::seeded(5, 3.0);
        let snapshot = (left.clone(), middle.clone(), right.clone());
        let _ = heat(0.5).apply(&left, &middle, &right);
        assert_eq!((left, middle, right), snapshot);
    }
}
