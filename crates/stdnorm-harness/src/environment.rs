//! Enumerates the (backend, storage, precision) configurations a kernel is
//! checked under and runs operations the way a test harness calls them.

use std::fmt;

use stdnorm_kernels::{
    Backend, Bhwc, KernelError, MeanStdDevNormalization, OperationDef, ParallelBackend,
    PrecisionMode, Reduction, ReferenceBackend, StorageLayout, Tensor,
};

use crate::error::{HarnessError, HarnessResult};

/// One point of the configuration matrix.
#[derive(Clone, Copy)]
pub struct Configuration<'a> {
    pub backend: &'a dyn Backend,
    pub storage: StorageLayout,
    pub precision: PrecisionMode,
}

impl Configuration<'_> {
    pub fn operation_def(&self) -> OperationDef {
        OperationDef::uniform(self.precision, self.storage)
    }

    pub fn kernel(&self, reduction: Reduction) -> HarnessResult<MeanStdDevNormalization> {
        Ok(MeanStdDevNormalization::new(self.operation_def())?.with_reduction(reduction))
    }
}

impl fmt::Display for Configuration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.backend.name(), self.storage, self.precision)
    }
}

impl fmt::Debug for Configuration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration({self})")
    }
}

pub struct TestEnvironment {
    backends: Vec<Box<dyn Backend>>,
    reduction: Reduction,
    tolerance_scale: f32,
}

impl TestEnvironment {
    pub fn new(backends: Vec<Box<dyn Backend>>) -> Self {
        Self {
            backends,
            reduction: Reduction::default(),
            tolerance_scale: 1.0,
        }
    }

    /// Reference and parallel backends with default capabilities.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ReferenceBackend::default()),
            Box::new(ParallelBackend::default()),
        ])
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_tolerance_scale(mut self, scale: f32) -> Self {
        self.tolerance_scale = scale;
        self
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn Backend> {
        self.backends.iter().map(|b| b.as_ref())
    }

    pub fn backend(&self, name: &str) -> HarnessResult<&dyn Backend> {
        self.backends()
            .find(|b| b.name() == name)
            .ok_or_else(|| HarnessError::UnknownBackend(name.to_string()))
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Scales a scenario tolerance by the configured factor.
    pub fn tolerance(&self, base: f32) -> f32 {
        base * self.tolerance_scale
    }

    /// Every supported storage × precision of every backend.
    pub fn configurations(&self) -> Vec<Configuration<'_>> {
        let mut out = Vec::new();
        for backend in self.backends() {
            for storage in backend.supported_storages() {
                for precision in backend.supported_precisions() {
                    out.push(Configuration {
                        backend,
                        storage,
                        precision,
                    });
                }
            }
        }
        out
    }

    /// Builds the kernel for `config` and runs it on a single source.
    pub fn run(&self, config: &Configuration<'_>, src: &Tensor, dst_shape: Bhwc) -> HarnessResult<Tensor> {
        let kernel = config.kernel(self.reduction)?;
        execute_operation(config.backend, std::slice::from_ref(src), &kernel, dst_shape)
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::standard()
    }
}

/// Runs `operation` on `backend` with the given sources and returns the
/// destination tensor of `dst_shape`.
pub fn execute_operation(
    backend: &dyn Backend,
    srcs: &[Tensor],
    operation: &MeanStdDevNormalization,
    dst_shape: Bhwc,
) -> HarnessResult<Tensor> {
    let [src] = srcs else {
        return Err(KernelError::InvalidDefinition(format!(
            "expected exactly one source tensor, got {}",
            srcs.len()
        ))
        .into());
    };
    Ok(operation.execute(backend, src, dst_shape)?)
}
