//! Execution backends.
//!
//! A backend describes which storage layouts and precision modes it can
//! execute and runs the kernel's row routine over a source storage. Support is
//! checked up front so an unsupported combination never falls back silently.

mod parallel;
mod reference;

pub use parallel::ParallelBackend;
pub use reference::ReferenceBackend;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::normalization::MeanStdDevNormalization;
use crate::operation::OperationDef;
use crate::tensor::{PrecisionMode, StorageLayout, TensorStorage};

/// Capabilities and tuning of one execution device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Storage layouts the device can address.
    #[serde(default = "default_storages")]
    pub storages: Vec<StorageLayout>,

    /// Whether f16 storage with f32 arithmetic is available.
    #[serde(default = "default_reduced_precision")]
    pub reduced_precision: bool,

    /// Rows handed to one parallel task.
    #[serde(default = "default_rows_per_task")]
    pub rows_per_task: usize,

    /// Worker threads for the parallel backend; the global pool when unset.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            storages: default_storages(),
            reduced_precision: default_reduced_precision(),
            rows_per_task: default_rows_per_task(),
            num_threads: None,
        }
    }
}

fn default_storages() -> Vec<StorageLayout> { StorageLayout::ALL.to_vec() }
fn default_reduced_precision() -> bool { true }
fn default_rows_per_task() -> usize { 64 }

/// What one kernel run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub rows: usize,
    pub degenerate_rows: usize,
    pub tasks: usize,
}

impl ExecutionSummary {
    pub(crate) fn new(rows: usize, degenerate_rows: usize, tasks: usize) -> Self {
        Self {
            rows,
            degenerate_rows,
            tasks,
        }
    }
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &BackendConfig;

    fn supported_storages(&self) -> Vec<StorageLayout> {
        self.config().storages.clone()
    }

    fn supported_precisions(&self) -> Vec<PrecisionMode> {
        if self.config().reduced_precision {
            PrecisionMode::ALL.to_vec()
        } else {
            vec![PrecisionMode::Full]
        }
    }

    /// Rejects definitions that use a storage or precision this backend lacks.
    fn supports(&self, definition: &OperationDef) -> KernelResult<()> {
        if !self.supported_precisions().contains(&definition.precision) {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "backend '{}' does not support {} precision",
                self.name(),
                definition.precision
            )));
        }
        let storages = self.supported_storages();
        if let Some(storage) = definition.storages().find(|s| !storages.contains(s)) {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "backend '{}' does not support {} storage",
                self.name(),
                storage
            )));
        }
        Ok(())
    }

    /// Normalizes all rows of `src` into `dst`.
    ///
    /// Fails with `InvalidShape` when the two storages differ in shape or the
    /// rows are empty.
    fn run(
        &self,
        kernel: &MeanStdDevNormalization,
        src: &TensorStorage,
        dst: &mut TensorStorage,
    ) -> KernelResult<ExecutionSummary>;
}

/// Rejects a storage pair the row loop cannot walk.
pub(crate) fn check_run_storages(src: &TensorStorage, dst: &TensorStorage) -> KernelResult<()> {
    let (s, d) = (src.shape(), dst.shape());
    if s.c == 0 {
        return Err(KernelError::invalid_shape(
            &s.dims(),
            "channel dimension must be at least 1",
        ));
    }
    if s != d {
        return Err(KernelError::invalid_shape(
            &d.dims(),
            format!("destination storage {d} does not match source {s}"),
        ));
    }
    Ok(())
}

/// Writes dense BHWC rows into a storage of any layout.
pub(crate) fn scatter_rows(dense: &[f32], dst: &mut TensorStorage) {
    let c = dst.shape().c;
    for (row, values) in dense.chunks(c).enumerate() {
        dst.write_row(row, values);
    }
}
