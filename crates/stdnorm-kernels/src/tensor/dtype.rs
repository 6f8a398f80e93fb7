use serde::{Deserialize, Serialize};

/// Element type of a tensor once it is placed in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Standard 32-bit float
    F32,
    /// 16-bit float (IEEE 754 half-precision)
    F16,
}

impl DataType {
    /// Storage element type used for a given precision mode.
    pub fn from_precision(precision: PrecisionMode) -> Self {
        match precision {
            PrecisionMode::Full => DataType::F32,
            PrecisionMode::Reduced => DataType::F16,
        }
    }

    pub fn size_of(&self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F16 => 2,
        }
    }

    /// Bytes needed to hold `elements` values of this type.
    pub fn buffer_size(&self, elements: usize) -> usize {
        elements * self.size_of()
    }
}

/// Accuracy/performance tradeoff for one kernel invocation.
///
/// `Full` stores f32 and accumulates row statistics in f64. `Reduced` stores
/// f16 and accumulates, divides and takes the square root in f32.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionMode {
    #[default]
    Full,
    Reduced,
}

impl PrecisionMode {
    pub const ALL: [PrecisionMode; 2] = [PrecisionMode::Full, PrecisionMode::Reduced];

    pub fn data_type(&self) -> DataType {
        DataType::from_precision(*self)
    }
}

impl std::fmt::Display for PrecisionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrecisionMode::Full => write!(f, "full"),
            PrecisionMode::Reduced => write!(f, "reduced"),
        }
    }
}
