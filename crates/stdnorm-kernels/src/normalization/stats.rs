//! Per-row statistics and the elementwise normalization pass.

use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Arithmetic type used for the reduction and the division.
pub trait Accumulator: Float + Send + Sync + 'static {
    fn from_storage(x: f32) -> Self;
    fn from_count(n: usize) -> Self;
    fn narrow(self) -> f32;
    fn widen(self) -> f64;
}

impl Accumulator for f32 {
    #[inline]
    fn from_storage(x: f32) -> Self {
        x
    }
    #[inline]
    fn from_count(n: usize) -> Self {
        n as f32
    }
    #[inline]
    fn narrow(self) -> f32 {
        self
    }
    #[inline]
    fn widen(self) -> f64 {
        self as f64
    }
}

impl Accumulator for f64 {
    #[inline]
    fn from_storage(x: f32) -> Self {
        x as f64
    }
    #[inline]
    fn from_count(n: usize) -> Self {
        n as f64
    }
    #[inline]
    fn narrow(self) -> f32 {
        self as f32
    }
    #[inline]
    fn widen(self) -> f64 {
        self
    }
}

/// How mean and variance of a row are accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Sum for the mean, then a second pass over the centered values.
    #[default]
    TwoPass,
    /// Single pass with Welford's online update.
    Welford,
}

/// Statistics of one batch row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowStats {
    pub mean: f64,
    pub stddev: f64,
    /// The row was treated as constant and written as zeros.
    pub degenerate: bool,
}

/// Population mean and variance.
pub fn mean_variance<A: Accumulator>(row: &[A], reduction: Reduction) -> (A, A) {
    let n = A::from_count(row.len());
    match reduction {
        Reduction::TwoPass => {
            let mean = row.iter().fold(A::zero(), |acc, &x| acc + x) / n;
            let sum_sq = row.iter().fold(A::zero(), |acc, &x| {
                let d = x - mean;
                acc + d * d
            });
            (mean, sum_sq / n)
        }
        Reduction::Welford => {
            let mut mean = A::zero();
            let mut m2 = A::zero();
            for (i, &x) in row.iter().enumerate() {
                let delta = x - mean;
                mean = mean + delta / A::from_count(i + 1);
                m2 = m2 + delta * (x - mean);
            }
            (mean, m2 / n)
        }
    }
}

/// Largest standard deviation still treated as zero.
///
/// Accumulated rounding on a constant row leaves a spread of at most a few
/// accumulator ulps of the largest magnitude per element.
pub fn degenerate_threshold<A: Accumulator>(row: &[A]) -> A {
    let scale = row.iter().fold(A::zero(), |m, &x| m.max(x.abs()));
    A::from_count(row.len()) * A::epsilon() * scale
}

/// Normalizes one row to zero mean and unit variance.
///
/// `input` and `output` have the same length, which must be at least one.
pub fn normalize_row<A: Accumulator>(input: &[A], output: &mut [f32], reduction: Reduction) -> RowStats {
    debug_assert!(!input.is_empty());
    debug_assert_eq!(input.len(), output.len());

    let (mean, variance) = mean_variance(input, reduction);
    let stddev = variance.sqrt();

    if stddev <= degenerate_threshold(input) {
        output.fill(0.0);
        return RowStats {
            mean: mean.widen(),
            stddev: stddev.widen(),
            degenerate: true,
        };
    }

    for (y, &x) in output.iter_mut().zip(input) {
        *y = ((x - mean) / stddev).narrow();
    }
    RowStats {
        mean: mean.widen(),
        stddev: stddev.widen(),
        degenerate: false,
    }
}
