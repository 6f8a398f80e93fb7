//! Per-channel mean/stddev normalization for BHWC tensors.
//!
//! Every batch row (the channel vector at one batch/height/width coordinate)
//! is normalized independently to zero mean and unit population variance.
//! The kernel is configured with an [`OperationDef`] selecting the precision
//! mode and the storage layout of its operands, and runs on a [`Backend`].

pub mod backend;
pub mod error;
pub mod normalization;
pub mod operation;
pub mod tensor;

pub use backend::{Backend, BackendConfig, ExecutionSummary, ParallelBackend, ReferenceBackend};
pub use error::{KernelError, KernelResult};
pub use normalization::{MeanStdDevNormalization, Reduction, RowStats};
pub use operation::{Layout, OperationDef, TensorDescriptor};
pub use tensor::{Bhwc, DataType, PrecisionMode, StorageLayout, Tensor, TensorStorage};

pub mod prelude {
    pub use crate::backend::{Backend, ParallelBackend, ReferenceBackend};
    pub use crate::normalization::MeanStdDevNormalization;
    pub use crate::operation::OperationDef;
    pub use crate::tensor::{Bhwc, PrecisionMode, StorageLayout, Tensor};
}
