//! Host tensors in BHWC order and their physical storage forms.

pub mod dtype;
pub mod storage;

use std::fmt;

use ndarray::{Array4, ArrayD, ArrayView1, ArrayView4};

use crate::error::{KernelError, KernelResult};

pub use dtype::{DataType, PrecisionMode};
pub use storage::{StorageLayout, TensorStorage};

/// Logical tensor shape: batch, height, width, channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bhwc {
    pub b: usize,
    pub h: usize,
    pub w: usize,
    pub c: usize,
}

impl Bhwc {
    pub const fn new(b: usize, h: usize, w: usize, c: usize) -> Self {
        Self { b, h, w, c }
    }

    /// Number of independent batch rows (one per `(b, h, w)` coordinate).
    pub fn rows(&self) -> usize {
        self.b * self.h * self.w
    }

    /// Total number of logical elements.
    pub fn len(&self) -> usize {
        self.rows() * self.c
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dims(&self) -> [usize; 4] {
        [self.b, self.h, self.w, self.c]
    }

    /// Flat BHWC offset of one element.
    pub fn index(&self, b: usize, h: usize, w: usize, c: usize) -> usize {
        ((b * self.h + h) * self.w + w) * self.c + c
    }
}

impl fmt::Display for Bhwc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BHWC({}, {}, {}, {})", self.b, self.h, self.w, self.c)
    }
}

/// A dense f32 tensor in BHWC order.
///
/// The backing array is always kept in standard (row-major) layout so the
/// channels of one batch row are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Bhwc,
    data: Array4<f32>,
}

impl Tensor {
    pub fn new(shape: Bhwc, data: Vec<f32>) -> KernelResult<Self> {
        if shape.c == 0 {
            return Err(KernelError::invalid_shape(
                &shape.dims(),
                "channel dimension must be at least 1",
            ));
        }
        if data.len() != shape.len() {
            return Err(KernelError::invalid_shape(
                &shape.dims(),
                format!("expected {} values, got {}", shape.len(), data.len()),
            ));
        }
        let data = Array4::from_shape_vec(shape.dims(), data)
            .map_err(|e| KernelError::invalid_shape(&shape.dims(), e.to_string()))?;
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Bhwc) -> Self {
        Self {
            shape,
            data: Array4::zeros(shape.dims()),
        }
    }

    /// Wraps an array of rank 1 to 4. Missing leading axes are treated as 1,
    /// so `[C]`, `[W, C]`, `[H, W, C]` and `[B, H, W, C]` are all accepted.
    pub fn from_ndarray(array: ArrayD<f32>) -> KernelResult<Self> {
        let dims = array.shape().to_vec();
        if dims.is_empty() || dims.len() > 4 {
            return Err(KernelError::invalid_shape(
                &dims,
                format!("rank {} is not supported, expected 1 to 4", dims.len()),
            ));
        }
        let mut padded = [1usize; 4];
        padded[4 - dims.len()..].copy_from_slice(&dims);
        let shape = Bhwc::new(padded[0], padded[1], padded[2], padded[3]);

        let data = array
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order(padded)
            .map_err(|e| KernelError::invalid_shape(&dims, e.to_string()))?;
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> Bhwc {
        self.shape
    }

    /// Flat view of all values in BHWC order.
    pub fn data(&self) -> &[f32] {
        self.data
            .as_slice()
            .expect("tensor data is always in standard layout")
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Channel vector of one batch row, or `None` past the last row.
    pub fn row(&self, row: usize) -> Option<ArrayView1<'_, f32>> {
        if row >= self.shape.rows() {
            return None;
        }
        let (b, rest) = (row / (self.shape.h * self.shape.w), row % (self.shape.h * self.shape.w));
        let (h, w) = (rest / self.shape.w, rest % self.shape.w);
        Some(self.data.slice(ndarray::s![b, h, w, ..]))
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }

    /// Iterates batch rows as contiguous channel slices.
    pub fn rows(&self) -> std::slice::Chunks<'_, f32> {
        self.data().chunks(self.shape.c.max(1))
    }
}
