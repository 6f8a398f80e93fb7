//! Hand-computed scenarios for the normalization kernel.
//!
//! Every non-constant row has the form `[m - 2d, m - d, m + d, m + 2d]`, whose
//! population stddev is `d * sqrt(2.5)` and whose normalized values are
//! `[-sqrt(1.6), -sqrt(0.4), sqrt(0.4), sqrt(1.6)]` for any mean and diff.

use stdnorm_kernels::{Bhwc, KernelResult, PrecisionMode, Tensor};

/// A single-row scenario and the tolerance it is checked with per precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub mean: f32,
    pub diff: f32,
    pub full_tolerance: f32,
    /// `None` when f16 storage cannot represent the spread, in which case the
    /// row collapses to a constant and the output is exact zeros.
    pub reduced_tolerance: Option<f32>,
}

impl Scenario {
    const fn new(mean: f32, diff: f32, full_tolerance: f32, reduced_tolerance: Option<f32>) -> Self {
        Self {
            mean,
            diff,
            full_tolerance,
            reduced_tolerance,
        }
    }

    pub fn input(&self) -> [f32; 4] {
        symmetric_row(self.mean, self.diff)
    }

    /// Expected output and tolerance under `precision`.
    pub fn expectation(&self, precision: PrecisionMode) -> ([f32; 4], f32) {
        match precision {
            PrecisionMode::Full => (self.expected_nonzero_or_zeros(), self.full_tolerance),
            PrecisionMode::Reduced => match self.reduced_tolerance {
                Some(tolerance) => (self.expected_nonzero_or_zeros(), tolerance),
                None => ([0.0; 4], 0.0),
            },
        }
    }

    fn expected_nonzero_or_zeros(&self) -> [f32; 4] {
        if self.diff == 0.0 {
            [0.0; 4]
        } else {
            normalized_symmetric()
        }
    }

    pub fn label(&self) -> String {
        format!("mean={} diff={}", self.mean, self.diff)
    }
}

/// Means {0, 0.01, 100} × diffs {0, 0.01, 100}.
///
/// At mean 100 and diff 0.01 the f32 inputs are off by up to half an ulp of
/// 100, which bounds full-precision accuracy near 2e-4.
pub const SCENARIOS: [Scenario; 9] = [
    Scenario::new(0.0, 0.0, 0.0, Some(0.0)),
    Scenario::new(0.0, 0.01, 2.53e-5, Some(4.0e-4)),
    Scenario::new(0.0, 100.0, 1.20e-7, Some(4.0e-4)),
    Scenario::new(0.01, 0.0, 0.0, Some(0.0)),
    Scenario::new(0.01, 0.01, 2.53e-5, Some(4.0e-4)),
    Scenario::new(0.01, 100.0, 1.20e-7, Some(4.0e-4)),
    Scenario::new(100.0, 0.0, 0.0, Some(0.0)),
    Scenario::new(100.0, 0.01, 2.0e-4, None),
    Scenario::new(100.0, 100.0, 1.20e-7, Some(4.0e-4)),
];

/// `[m - 2d, m - d, m + d, m + 2d]` evaluated in f32.
pub fn symmetric_row(mean: f32, diff: f32) -> [f32; 4] {
    [mean - 2.0 * diff, mean - diff, mean + diff, mean + 2.0 * diff]
}

pub fn normalized_symmetric() -> [f32; 4] {
    let (k16, k04) = (1.6f32.sqrt(), 0.4f32.sqrt());
    [-k16, -k04, k04, k16]
}

/// Nine rows covering zero, small and large means with zero, small and large
/// variances, in that order.
pub const BATCH_INPUT: [[f32; 4]; 9] = [
    [0.0, 0.0, 0.0, 0.0],
    [-0.02, -0.01, 0.01, 0.02],
    [-200.0, -100.0, 100.0, 200.0],
    [0.01, 0.01, 0.01, 0.01],
    [-0.01, 0.0, 0.02, 0.03],
    [-199.99, -99.99, 100.01, 200.01],
    [100.0, 100.0, 100.0, 100.0],
    [99.98, 99.99, 100.01, 100.02],
    [-100.0, 0.0, 200.0, 300.0],
];

/// Row of [`BATCH_INPUT`] whose spread is below f16 resolution.
pub const BATCH_SUB_F16_ROW: usize = 7;

pub fn batch_tensor() -> KernelResult<Tensor> {
    Tensor::new(Bhwc::new(9, 1, 1, 4), BATCH_INPUT.concat())
}

/// Expected flattened output of [`BATCH_INPUT`] and its tolerance.
pub fn batch_expectation(precision: PrecisionMode) -> (Vec<f32>, f32) {
    let tolerance = match precision {
        PrecisionMode::Full => 2.0e-4,
        PrecisionMode::Reduced => 4.0e-4,
    };
    let expected = BATCH_INPUT
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            let constant = row.iter().all(|&x| x == row[0]);
            let collapsed = precision == PrecisionMode::Reduced && i == BATCH_SUB_F16_ROW;
            if constant || collapsed {
                [0.0; 4]
            } else {
                normalized_symmetric()
            }
        })
        .collect();
    (expected, tolerance)
}
