//! Error types for kernel construction and execution.

use thiserror::Error;

/// Errors raised before any row is computed.
///
/// Every variant aborts the invocation that produced it; no partial output
/// tensor is ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// Channel dimension is zero, the rank is unsupported, or the data length
    /// does not match the declared shape.
    #[error("Invalid shape {shape:?}: {reason}")]
    InvalidShape { shape: Vec<usize>, reason: String },

    /// Storage layout / precision / tensor layout combination that the
    /// selected backend or the kernel does not implement.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The operation definition itself is malformed.
    #[error("Invalid operation definition: {0}")]
    InvalidDefinition(String),
}

impl KernelError {
    pub(crate) fn invalid_shape(shape: &[usize], reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            shape: shape.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
