//! Mean/stddev normalization over the channel axis.

pub mod stats;

pub use stats::{degenerate_threshold, mean_variance, normalize_row, Accumulator, Reduction, RowStats};

use crate::backend::{Backend, ExecutionSummary};
use crate::error::{KernelError, KernelResult};
use crate::operation::OperationDef;
use crate::tensor::{Bhwc, PrecisionMode, Tensor, TensorStorage};

/// Normalizes every batch row to zero mean and unit population variance.
///
/// Rows whose standard deviation is indistinguishable from zero at the
/// accumulator's precision are written as zeros.
#[derive(Debug, Clone)]
pub struct MeanStdDevNormalization {
    definition: OperationDef,
    reduction: Reduction,
}

impl MeanStdDevNormalization {
    pub fn new(definition: OperationDef) -> KernelResult<Self> {
        definition.validate()?;
        Ok(Self {
            definition,
            reduction: Reduction::default(),
        })
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn definition(&self) -> &OperationDef {
        &self.definition
    }

    pub fn precision(&self) -> PrecisionMode {
        self.definition.precision
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn check_shapes(&self, src: Bhwc, dst: Bhwc) -> KernelResult<()> {
        if src.c == 0 {
            return Err(KernelError::invalid_shape(
                &src.dims(),
                "channel dimension must be at least 1",
            ));
        }
        if src != dst {
            return Err(KernelError::invalid_shape(
                &dst.dims(),
                format!("destination shape {dst} does not match source {src}"),
            ));
        }
        Ok(())
    }

    /// Runs the kernel on `backend` and returns a new tensor of `dst_shape`.
    ///
    /// All configuration and shape checks happen before any row is touched.
    pub fn execute(&self, backend: &dyn Backend, src: &Tensor, dst_shape: Bhwc) -> KernelResult<Tensor> {
        backend.supports(&self.definition)?;
        self.check_shapes(src.shape(), dst_shape)?;

        let src_storage = TensorStorage::upload(src, self.definition.src()?)?;
        let mut dst_storage = TensorStorage::allocate(dst_shape, self.definition.dst()?)?;

        let summary = backend.run(self, &src_storage, &mut dst_storage)?;
        log::debug!(
            "mean_stddev_normalization on {}: {} rows of {} ({} storage, {} precision, {:?}), {} degenerate, {} tasks",
            backend.name(),
            summary.rows,
            src.shape(),
            src_storage.layout(),
            self.precision(),
            self.reduction,
            summary.degenerate_rows,
            summary.tasks,
        );
        if self.precision() == PrecisionMode::Reduced {
            self.warn_on_collapsed_rows(src, summary.degenerate_rows);
        }

        dst_storage.download()
    }

    fn warn_on_collapsed_rows(&self, src: &Tensor, degenerate_rows: usize) {
        let constant_rows = src
            .rows()
            .filter(|row| row.iter().all(|&x| x == row[0]))
            .count();
        if degenerate_rows > constant_rows {
            log::warn!(
                "{} non-constant rows collapsed to zeros at f16 resolution",
                degenerate_rows - constant_rows
            );
        }
    }

    /// Normalizes the consecutive rows starting at `first_row` into `out`,
    /// a dense chunk of whole rows. Returns the number of degenerate rows.
    pub fn normalize_rows(&self, src: &TensorStorage, first_row: usize, out: &mut [f32]) -> usize {
        match self.precision() {
            PrecisionMode::Full => self.normalize_rows_with::<f64>(src, first_row, out),
            PrecisionMode::Reduced => self.normalize_rows_with::<f32>(src, first_row, out),
        }
    }

    fn normalize_rows_with<A: Accumulator>(&self, src: &TensorStorage, first_row: usize, out: &mut [f32]) -> usize {
        let c = src.shape().c;
        let mut scratch = vec![A::zero(); c];
        let mut degenerate = 0;
        for (i, out_row) in out.chunks_mut(c).enumerate() {
            src.read_row(first_row + i, &mut scratch);
            if normalize_row(&scratch, out_row, self.reduction).degenerate {
                degenerate += 1;
            }
        }
        degenerate
    }

    /// Per-row statistics as the kernel sees them, after the input has been
    /// rounded to the storage element type.
    pub fn row_stats(&self, src: &Tensor) -> KernelResult<Vec<RowStats>> {
        self.check_shapes(src.shape(), src.shape())?;
        let storage = TensorStorage::upload(src, self.definition.src()?)?;
        let stats = match self.precision() {
            PrecisionMode::Full => self.row_stats_with::<f64>(&storage),
            PrecisionMode::Reduced => self.row_stats_with::<f32>(&storage),
        };
        Ok(stats)
    }

    fn row_stats_with<A: Accumulator>(&self, storage: &TensorStorage) -> Vec<RowStats> {
        let shape = storage.shape();
        let mut scratch = vec![A::zero(); shape.c];
        let mut out = vec![0.0f32; shape.c];
        (0..shape.rows())
            .map(|row| {
                storage.read_row(row, &mut scratch);
                normalize_row(&scratch, &mut out, self.reduction)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
