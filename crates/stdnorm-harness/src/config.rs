// stdnorm-harness/src/config.rs

use serde::{Deserialize, Serialize};
use stdnorm_kernels::{Backend, BackendConfig, KernelResult, ParallelBackend, Reduction, ReferenceBackend};

use crate::environment::TestEnvironment;

/// Harness configuration.
///
/// Loaded from stdnorm.toml; every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub kernel: KernelSection,

    #[serde(default)]
    pub tolerance: ToleranceSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Reference,
    #[default]
    Parallel,
    /// Both backends, checked side by side.
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BackendSection {
    #[serde(default)]
    pub kind: BackendKind,

    /// Device capabilities and task sizing
    #[serde(flatten)]
    pub device: BackendConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct KernelSection {
    #[serde(default)]
    pub reduction: Reduction,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToleranceSection {
    /// Multiplies every scenario tolerance
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl Default for ToleranceSection {
    fn default() -> Self {
        Self { scale: default_scale() }
    }
}

fn default_scale() -> f32 {
    1.0
}

impl HarnessConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Instantiates the configured backend(s).
    pub fn build_backends(&self) -> KernelResult<Vec<Box<dyn Backend>>> {
        let device = &self.backend.device;
        let reference = || Box::new(ReferenceBackend::new(device.clone())) as Box<dyn Backend>;
        let parallel = || -> KernelResult<Box<dyn Backend>> { Ok(Box::new(ParallelBackend::new(device.clone())?)) };
        Ok(match self.backend.kind {
            BackendKind::Reference => vec![reference()],
            BackendKind::Parallel => vec![parallel()?],
            BackendKind::All => vec![reference(), parallel()?],
        })
    }

    pub fn build_environment(&self) -> KernelResult<TestEnvironment> {
        log::info!(
            "Building {:?} environment ({:?}, tolerance scale {})",
            self.backend.kind,
            self.kernel.reduction,
            self.tolerance.scale
        );
        Ok(TestEnvironment::new(self.build_backends()?)
            .with_reduction(self.kernel.reduction)
            .with_tolerance_scale(self.tolerance.scale))
    }
}
