//! Error types for the harness.

use stdnorm_kernels::KernelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The kernel refused the invocation.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Observed output deviates from the expectation beyond the tolerance.
    #[error(
        "'{label}' differs at index {index}: actual {actual}, expected {expected}, |diff| {diff} > tolerance {tolerance}"
    )]
    ToleranceViolation {
        label: String,
        index: usize,
        actual: f32,
        expected: f32,
        diff: f32,
        tolerance: f32,
    },

    #[error("'{label}' has {actual} values, expected {expected}")]
    LengthMismatch {
        label: String,
        actual: usize,
        expected: usize,
    },

    /// A backend was asked for that the environment does not have.
    #[error("Unknown backend: '{0}'")]
    UnknownBackend(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
