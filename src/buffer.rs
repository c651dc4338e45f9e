use core::fmt;
use derive_more::Deref;

/// State of one partition at one generation.
///
/// A fixed-size array of `nx` values. There is no way to mutate a buffer once
/// it is constructed, so after it is published into a
/// [`Partition`](crate::partition::Partition) any number of tasks may read it
/// concurrently.
#[must_use]
#[derive(Debug, Clone, PartialEq, Deref)]
pub struct PartitionBuffer {
    #[deref(forward)]
    data: Box<[f64]>,
}

impl PartitionBuffer {
    /// Zero-filled buffer of `size` points.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size].into_boxed_slice(),
        }
    }

    /// Initial condition for generation 0: `value[j] = initial_value * size + j`.
    ///
    /// Seeding partition `i` with `initial_value = i` yields the global ramp
    /// `f(0, x) = x` over the whole domain.
    #[allow(clippy::cast_precision_loss)]
    pub fn seeded(size: usize, initial_value: f64) -> Self {
        let base_value = initial_value * size as f64;
        (0..size).map(|j| base_value + j as f64).collect()
    }

    /// Values of the partition.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy the values out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.to_vec()
    }
}

impl From<Vec<f64>> for PartitionBuffer {
    fn from(data: Vec<f64>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }
}

impl FromIterator<f64> for PartitionBuffer {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for PartitionBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, value) in self.data.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("}")
    }
}
