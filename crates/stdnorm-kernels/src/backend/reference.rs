use super::{check_run_storages, scatter_rows, Backend, BackendConfig, ExecutionSummary};
use crate::error::KernelResult;
use crate::normalization::MeanStdDevNormalization;
use crate::tensor::TensorStorage;

/// Single-threaded row loop. Every other backend must match its output.
#[derive(Debug, Clone, Default)]
pub struct ReferenceBackend {
    config: BackendConfig,
}

impl ReferenceBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl Backend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn run(
        &self,
        kernel: &MeanStdDevNormalization,
        src: &TensorStorage,
        dst: &mut TensorStorage,
    ) -> KernelResult<ExecutionSummary> {
        check_run_storages(src, dst)?;
        let shape = src.shape();
        let mut dense = vec![0.0f32; shape.len()];
        let degenerate = kernel.normalize_rows(src, 0, &mut dense);
        scatter_rows(&dense, dst);
        Ok(ExecutionSummary::new(shape.rows(), degenerate, 1))
    }
}
