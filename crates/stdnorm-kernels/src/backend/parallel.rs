use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{check_run_storages, scatter_rows, Backend, BackendConfig, ExecutionSummary};
use crate::error::{KernelError, KernelResult};
use crate::normalization::MeanStdDevNormalization;
use crate::tensor::TensorStorage;

/// Splits rows into tasks of `rows_per_task` and runs them on rayon.
///
/// Each task owns a disjoint chunk of the dense output, computes the
/// statistics of its rows and then their normalized values; the chunks are
/// scattered into the destination layout once every task has finished.
pub struct ParallelBackend {
    config: BackendConfig,
    pool: Option<ThreadPool>,
}

impl ParallelBackend {
    pub fn new(config: BackendConfig) -> KernelResult<Self> {
        if config.rows_per_task == 0 {
            return Err(KernelError::UnsupportedConfiguration(
                "rows_per_task must be at least 1".into(),
            ));
        }
        let pool = match config.num_threads {
            Some(n) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("stdnorm-worker-{i}"))
                    .build()
                    .map_err(|e| {
                        KernelError::UnsupportedConfiguration(format!("thread pool: {e}"))
                    })?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |p| p.current_num_threads())
    }
}

impl Default for ParallelBackend {
    fn default() -> Self {
        Self {
            config: BackendConfig::default(),
            pool: None,
        }
    }
}

impl std::fmt::Debug for ParallelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelBackend")
            .field("config", &self.config)
            .field("threads", &self.threads())
            .finish()
    }
}

impl Backend for ParallelBackend {
    fn name(&self) -> &str {
        "parallel"
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
        // A task never spans more than the whole batch.
        let rows_per_task = self.config.rows_per_task.min(shape.rows().max(1));
        let chunk = rows_per_task * shape.c;
        let tasks = shape.rows().div_ceil(rows_per_task);
        log::trace!(
            "{} rows in {} tasks of up to {} rows on {} threads",
            shape.rows(),
            tasks,
            rows_per_task,
            self.threads()
        );

        let mut dense = vec![0.0f32; shape.len()];
        let normalize = |dense: &mut [f32]| -> usize {
            dense
                .par_chunks_mut(chunk)
                .enumerate()
                .map(|(task, out)| kernel.normalize_rows(src, task * rows_per_task, out))
                .sum()
        };
        let degenerate = match &self.pool {
            Some(pool) => pool.install(|| normalize(&mut dense)),
            None => normalize(&mut dense),
        };

        scatter_rows(&dense, dst);
        Ok(ExecutionSummary::new(shape.rows(), degenerate, tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReferenceBackend;
    use crate::operation::OperationDef;
    use crate::tensor::{Bhwc, PrecisionMode, StorageLayout, Tensor};
    use ndarray::Array;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn random_tensor(shape: Bhwc, seed: u64) -> Tensor {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = Array::random_using(shape.len(), Uniform::new(-50.0f32, 50.0), &mut rng);
        Tensor::new(shape, data.to_vec()).unwrap()
    }

    #[test]
    fn test_zero_rows_per_task_is_rejected() {
        let err = ParallelBackend::new(BackendConfig {
            rows_per_task: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, KernelError::UnsupportedConfiguration(_)));
    }

    #[test]
    fn test_matches_reference_bitwise() {
        let shape = Bhwc::new(3, 7, 5, 9);
        let src = random_tensor(shape, 7);
        let reference = ReferenceBackend::default();
        let parallel = ParallelBackend::new(BackendConfig {
            rows_per_task: 4,
            num_threads: Some(3),
            ..Default::default()
        })
        .unwrap();

        for precision in PrecisionMode::ALL {
            for storage in [StorageLayout::Buffer, StorageLayout::ImageBuffer, StorageLayout::Texture2D] {
                let kernel = MeanStdDevNormalization::new(OperationDef::uniform(precision, storage)).unwrap();
                let expected = kernel.execute(&reference, &src, shape).unwrap();
                let actual = kernel.execute(&parallel, &src, shape).unwrap();
                assert_eq!(actual, expected, "{precision} / {storage}");
            }
        }
    }

    #[test]
    fn test_task_count_covers_remainder_rows() {
        let shape = Bhwc::new(1, 1, 10, 4);
        let src = random_tensor(shape, 11);
        let kernel =
            MeanStdDevNormalization::new(OperationDef::uniform(PrecisionMode::Full, StorageLayout::Buffer)).unwrap();
        let desc = kernel.definition().src().unwrap();
        let src_storage = TensorStorage::upload(&src, desc).unwrap();
        let mut dst = TensorStorage::allocate(shape, desc).unwrap();

        let backend = ParallelBackend::new(BackendConfig {
            rows_per_task: 3,
            ..Default::default()
        })
        .unwrap();
        let summary = backend.run(&kernel, &src_storage, &mut dst).unwrap();
        assert_eq!(summary.tasks, 4);
        assert_eq!(summary.rows, 10);
        assert_eq!(summary.degenerate_rows, 0);
    }

    #[test]
    fn test_huge_rows_per_task_runs_as_one_task() {
        let shape = Bhwc::new(9, 1, 1, 4);
        let src = random_tensor(shape, 5);
        let kernel =
            MeanStdDevNormalization::new(OperationDef::uniform(PrecisionMode::Full, StorageLayout::Buffer)).unwrap();
        let desc = kernel.definition().src().unwrap();
        let src_storage = TensorStorage::upload(&src, desc).unwrap();
        let mut dst = TensorStorage::allocate(shape, desc).unwrap();

        let backend = ParallelBackend::new(BackendConfig {
            rows_per_task: usize::MAX / 4,
            ..Default::default()
        })
        .unwrap();
        let summary = backend.run(&kernel, &src_storage, &mut dst).unwrap();
        assert_eq!(summary.tasks, 1);

        let expected = kernel.execute(&ReferenceBackend::default(), &src, shape).unwrap();
        assert_eq!(dst.download().unwrap(), expected);
    }
}
