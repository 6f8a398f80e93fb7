//! Operation definitions: tensor descriptors plus the requested precision.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::tensor::{DataType, PrecisionMode, StorageLayout};

/// Logical axis order of a tensor as seen by the kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Bhwc,
    Bchw,
}

/// Element type, storage and layout of one kernel operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorDescriptor {
    pub data_type: DataType,
    pub storage: StorageLayout,
    #[serde(default)]
    pub layout: Layout,
}

impl TensorDescriptor {
    pub fn new(data_type: DataType, storage: StorageLayout, layout: Layout) -> Self {
        Self {
            data_type,
            storage,
            layout,
        }
    }
}

/// Configuration for one kernel invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDef {
    pub precision: PrecisionMode,
    pub src_tensors: Vec<TensorDescriptor>,
    pub dst_tensors: Vec<TensorDescriptor>,
}

impl OperationDef {
    pub fn new(precision: PrecisionMode) -> Self {
        Self {
            precision,
            src_tensors: Vec::new(),
            dst_tensors: Vec::new(),
        }
    }

    /// One BHWC source and destination in `storage`, with the element type
    /// deduced from `precision`.
    pub fn uniform(precision: PrecisionMode, storage: StorageLayout) -> Self {
        let desc = TensorDescriptor::new(DataType::from_precision(precision), storage, Layout::Bhwc);
        Self::new(precision).with_src(desc).with_dst(desc)
    }

    pub fn with_src(mut self, desc: TensorDescriptor) -> Self {
        self.src_tensors.push(desc);
        self
    }

    pub fn with_dst(mut self, desc: TensorDescriptor) -> Self {
        self.dst_tensors.push(desc);
        self
    }

    pub fn src(&self) -> KernelResult<&TensorDescriptor> {
        self.src_tensors
            .first()
            .ok_or_else(|| KernelError::InvalidDefinition("no source tensor".into()))
    }

    pub fn dst(&self) -> KernelResult<&TensorDescriptor> {
        self.dst_tensors
            .first()
            .ok_or_else(|| KernelError::InvalidDefinition("no destination tensor".into()))
    }

    /// Storage layouts referenced by any operand.
    pub fn storages(&self) -> impl Iterator<Item = StorageLayout> + '_ {
        self.src_tensors
            .iter()
            .chain(self.dst_tensors.iter())
            .map(|d| d.storage)
    }

    /// Checks the definition for a single-input, single-output normalization.
    pub fn validate(&self) -> KernelResult<()> {
        if self.src_tensors.len() != 1 || self.dst_tensors.len() != 1 {
            return Err(KernelError::InvalidDefinition(format!(
                "expected exactly one source and one destination, got {} and {}",
                self.src_tensors.len(),
                self.dst_tensors.len()
            )));
        }
        let expected = DataType::from_precision(self.precision);
        for (role, desc) in [("source", self.src()?), ("destination", self.dst()?)] {
            if desc.layout != Layout::Bhwc {
                return Err(KernelError::UnsupportedConfiguration(format!(
                    "{role} layout {:?} is not supported, only Bhwc",
                    desc.layout
                )));
            }
            if desc.data_type != expected {
                return Err(KernelError::UnsupportedConfiguration(format!(
                    "{role} data type {:?} does not match {} precision (expects {:?})",
                    desc.data_type, self.precision, expected
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_definition_is_valid() {
        for precision in PrecisionMode::ALL {
            for storage in StorageLayout::ALL {
                let op = OperationDef::uniform(precision, storage);
                op.validate().unwrap();
                assert_eq!(op.src().unwrap().data_type, precision.data_type());
            }
        }
    }

    #[test]
    fn test_missing_destination_is_rejected() {
        let desc = TensorDescriptor::new(DataType::F32, StorageLayout::Buffer, Layout::Bhwc);
        let op = OperationDef::new(PrecisionMode::Full).with_src(desc);
        assert!(matches!(op.validate(), Err(KernelError::InvalidDefinition(_))));
    }

    #[test]
    fn test_two_sources_are_rejected() {
        let desc = TensorDescriptor::new(DataType::F32, StorageLayout::Buffer, Layout::Bhwc);
        let op = OperationDef::uniform(PrecisionMode::Full, StorageLayout::Buffer).with_src(desc);
        assert!(matches!(op.validate(), Err(KernelError::InvalidDefinition(_))));
    }

    #[test]
    fn test_data_type_must_follow_precision() {
        let f32_desc = TensorDescriptor::new(DataType::F32, StorageLayout::Buffer, Layout::Bhwc);
        let op = OperationDef::new(PrecisionMode::Reduced)
            .with_src(f32_desc)
            .with_dst(f32_desc);
        assert!(matches!(op.validate(), Err(KernelError::UnsupportedConfiguration(_))));
    }

    #[test]
    fn test_channels_first_layout_is_rejected() {
        let desc = TensorDescriptor::new(DataType::F32, StorageLayout::Buffer, Layout::Bchw);
        let op = OperationDef::new(PrecisionMode::Full).with_src(desc).with_dst(desc);
        let err = op.validate().unwrap_err();
        assert!(err.to_string().contains("Bchw"));
    }
}
