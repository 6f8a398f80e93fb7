//! Physical storage layouts.
//!
//! A [`TensorStorage`] holds the values of a logical BHWC tensor in one of the
//! arrangements a device backend may use. Sliced layouts group channels in
//! slices of four and zero-fill the unused lanes of the last slice; those
//! lanes are never read back as data.

use half::f16;
use serde::{Deserialize, Serialize};

use super::{Bhwc, DataType, Tensor};
use crate::error::{KernelError, KernelResult};
use crate::normalization::Accumulator;
use crate::operation::TensorDescriptor;

/// Channels per slice in sliced layouts.
pub const SLICE_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageLayout {
    /// Dense `[B, H, W, C]`.
    #[serde(rename = "buffer")]
    Buffer,
    /// `[B, H, W, S, 4]`: slices innermost, one row stays contiguous.
    #[serde(rename = "image_buffer")]
    ImageBuffer,
    /// `[B, S, H, W, 4]`: each slice is a separate plane.
    #[serde(rename = "texture_2d")]
    Texture2D,
    /// `[B, H, W, 4]`: a single texel per pixel, at most four channels.
    #[serde(rename = "single_texture_2d")]
    SingleTexture2D,
}

impl StorageLayout {
    pub const ALL: [StorageLayout; 4] = [
        StorageLayout::Buffer,
        StorageLayout::ImageBuffer,
        StorageLayout::Texture2D,
        StorageLayout::SingleTexture2D,
    ];

    /// Rejects shapes this layout cannot represent.
    pub fn check_shape(&self, shape: Bhwc) -> KernelResult<()> {
        if *self == StorageLayout::SingleTexture2D && shape.c > SLICE_WIDTH {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "{self:?} holds at most {SLICE_WIDTH} channels, tensor has {}",
                shape.c
            )));
        }
        Ok(())
    }

    /// Number of physical elements needed for `shape`, padding included.
    pub fn physical_len(&self, shape: Bhwc) -> usize {
        match self {
            StorageLayout::Buffer => shape.len(),
            StorageLayout::ImageBuffer | StorageLayout::Texture2D => {
                shape.rows() * slices(shape.c) * SLICE_WIDTH
            }
            StorageLayout::SingleTexture2D => shape.rows() * SLICE_WIDTH,
        }
    }

    /// Physical offset of `channel` in batch row `row`.
    pub fn offset(&self, shape: Bhwc, row: usize, channel: usize) -> usize {
        match self {
            StorageLayout::Buffer => row * shape.c + channel,
            StorageLayout::ImageBuffer => row * slices(shape.c) * SLICE_WIDTH + channel,
            StorageLayout::Texture2D => {
                let plane = shape.h * shape.w;
                let (b, pixel) = (row / plane, row % plane);
                let (slice, lane) = (channel / SLICE_WIDTH, channel % SLICE_WIDTH);
                ((b * slices(shape.c) + slice) * plane + pixel) * SLICE_WIDTH + lane
            }
            StorageLayout::SingleTexture2D => row * SLICE_WIDTH + channel,
        }
    }
}

impl std::fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageLayout::Buffer => "buffer",
            StorageLayout::ImageBuffer => "image_buffer",
            StorageLayout::Texture2D => "texture_2d",
            StorageLayout::SingleTexture2D => "single_texture_2d",
        };
        f.write_str(name)
    }
}

fn slices(channels: usize) -> usize {
    channels.div_ceil(SLICE_WIDTH)
}

#[derive(Debug, Clone, PartialEq)]
enum StorageData {
    F32(Vec<f32>),
    F16(Vec<f16>),
}

/// A tensor placed in a concrete layout and element type.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorStorage {
    shape: Bhwc,
    layout: StorageLayout,
    data: StorageData,
}

impl TensorStorage {
    /// Zero-filled storage for `shape` as described by `desc`.
    pub fn allocate(shape: Bhwc, desc: &TensorDescriptor) -> KernelResult<Self> {
        desc.storage.check_shape(shape)?;
        let len = desc.storage.physical_len(shape);
        let data = match desc.data_type {
            DataType::F32 => StorageData::F32(vec![0.0; len]),
            DataType::F16 => StorageData::F16(vec![f16::ZERO; len]),
        };
        Ok(Self {
            shape,
            layout: desc.storage,
            data,
        })
    }

    /// Copies a host tensor into storage, converting to the descriptor's
    /// element type.
    pub fn upload(tensor: &Tensor, desc: &TensorDescriptor) -> KernelResult<Self> {
        let mut storage = Self::allocate(tensor.shape(), desc)?;
        for (row, values) in tensor.rows().enumerate() {
            storage.write_row(row, values);
        }
        Ok(storage)
    }

    /// Reads the logical tensor back, dropping padding lanes.
    pub fn download(&self) -> KernelResult<Tensor> {
        let mut dense = vec![0.0f32; self.shape.len()];
        if self.shape.c > 0 {
            for (row, out) in dense.chunks_mut(self.shape.c).enumerate() {
                self.read_row(row, out);
            }
        }
        Tensor::new(self.shape, dense)
    }

    pub fn shape(&self) -> Bhwc {
        self.shape
    }

    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    pub fn data_type(&self) -> DataType {
        match self.data {
            StorageData::F32(_) => DataType::F32,
            StorageData::F16(_) => DataType::F16,
        }
    }

    pub fn physical_len(&self) -> usize {
        match &self.data {
            StorageData::F32(v) => v.len(),
            StorageData::F16(v) => v.len(),
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data_type().buffer_size(self.physical_len())
    }

    pub fn offset(&self, row: usize, channel: usize) -> usize {
        self.layout.offset(self.shape, row, channel)
    }

    /// Gathers the channels of one row, widening to the accumulator type.
    pub fn read_row<A: Accumulator>(&self, row: usize, out: &mut [A]) {
        debug_assert_eq!(out.len(), self.shape.c);
        match &self.data {
            StorageData::F32(v) => {
                for (ch, slot) in out.iter_mut().enumerate() {
                    *slot = A::from_storage(v[self.offset(row, ch)]);
                }
            }
            StorageData::F16(v) => {
                for (ch, slot) in out.iter_mut().enumerate() {
                    *slot = A::from_storage(v[self.offset(row, ch)].to_f32());
                }
            }
        }
    }

    /// Scatters one row of values, rounding to the storage element type.
    pub fn write_row(&mut self, row: usize, values: &[f32]) {
        debug_assert_eq!(values.len(), self.shape.c);
        let (shape, layout) = (self.shape, self.layout);
        match &mut self.data {
            StorageData::F32(v) => {
                for (ch, &x) in values.iter().enumerate() {
                    v[layout.offset(shape, row, ch)] = x;
                }
            }
            StorageData::F16(v) => {
                for (ch, &x) in values.iter().enumerate() {
                    v[layout.offset(shape, row, ch)] = f16::from_f32(x);
                }
            }
        }
    }

    /// Raw physical values widened to f32, padding lanes included.
    pub fn physical_values(&self) -> Vec<f32> {
        match &self.data {
            StorageData::F32(v) => v.clone(),
            StorageData::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
        }
    }
}
