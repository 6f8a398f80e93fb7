use super::*;
use crate::backend::{BackendConfig, ReferenceBackend};
use crate::operation::{Layout, TensorDescriptor};
use crate::tensor::{DataType, StorageLayout};
use approx::assert_abs_diff_eq;
use ndarray::{Array, Array4, Axis};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

fn kernel(precision: PrecisionMode, storage: StorageLayout) -> MeanStdDevNormalization {
    MeanStdDevNormalization::new(OperationDef::uniform(precision, storage)).unwrap()
}

fn expected_symmetric() -> [f32; 4] {
    let (k16, k04) = (1.6f32.sqrt(), 0.4f32.sqrt());
    [-k16, -k04, k04, k16]
}

/// Straightforward f64 normalization along the channel axis.
fn reference_normalize(input: &Array4<f32>) -> Array4<f32> {
    let x = input.mapv(f64::from);
    let mean = x.mean_axis(Axis(3)).unwrap().insert_axis(Axis(3));
    let std = x.var_axis(Axis(3), 0.0).mapv(f64::sqrt).insert_axis(Axis(3));
    ((&x - &mean) / &std).mapv(|v| v as f32)
}

#[test]
fn test_single_row_symmetric_input() {
    let backend = ReferenceBackend::default();
    let src = Tensor::new(Bhwc::new(1, 1, 1, 4), vec![-199.99, -99.99, 100.01, 200.01]).unwrap();
    let out = kernel(PrecisionMode::Full, StorageLayout::Buffer)
        .execute(&backend, &src, src.shape())
        .unwrap();
    for (a, e) in out.data().iter().zip(expected_symmetric()) {
        assert_abs_diff_eq!(*a, e, epsilon = 1.2e-7);
    }
}

#[test]
fn test_matches_f64_reference_on_random_batch() {
    let mut rng = StdRng::seed_from_u64(42);
    let input = Array::random_using((2, 3, 4, 17), Uniform::new(-10.0f32, 10.0), &mut rng);
    let src = Tensor::from_ndarray(input.clone().into_dyn()).unwrap();
    let expected = reference_normalize(&input);

    let backend = ReferenceBackend::default();
    for storage in [StorageLayout::Buffer, StorageLayout::ImageBuffer, StorageLayout::Texture2D] {
        let out = kernel(PrecisionMode::Full, storage)
            .execute(&backend, &src, src.shape())
            .unwrap()
            .into_array();
        assert_eq!(out.dim(), expected.dim());
        for (a, e) in out.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_zero_channels_is_invalid_shape() {
    let backend = ReferenceBackend::default();
    let src = Tensor::zeros(Bhwc::new(1, 1, 1, 0));
    let err = kernel(PrecisionMode::Full, StorageLayout::Buffer)
        .execute(&backend, &src, src.shape())
        .unwrap_err();
    assert!(matches!(err, KernelError::InvalidShape { .. }));
}

#[test]
fn test_destination_shape_mismatch_is_invalid_shape() {
    let backend = ReferenceBackend::default();
    let src = Tensor::zeros(Bhwc::new(2, 1, 1, 4));
    let err = kernel(PrecisionMode::Full, StorageLayout::Buffer)
        .execute(&backend, &src, Bhwc::new(1, 1, 1, 4))
        .unwrap_err();
    assert!(err.to_string().contains("does not match"));
}

#[test]
fn test_single_texture_with_wide_rows_is_unsupported() {
    let backend = ReferenceBackend::default();
    let src = Tensor::zeros(Bhwc::new(1, 1, 1, 8));
    let err = kernel(PrecisionMode::Full, StorageLayout::SingleTexture2D)
        .execute(&backend, &src, src.shape())
        .unwrap_err();
    assert!(matches!(err, KernelError::UnsupportedConfiguration(_)));
}

#[test]
fn test_backend_without_storage_fails_before_shape_checks() {
    let backend = ReferenceBackend::new(BackendConfig {
        storages: vec![StorageLayout::Buffer],
        ..Default::default()
    });
    // Both the storage and the shape are wrong; the configuration error wins.
    let src = Tensor::zeros(Bhwc::new(1, 1, 1, 0));
    let err = kernel(PrecisionMode::Full, StorageLayout::ImageBuffer)
        .execute(&backend, &src, src.shape())
        .unwrap_err();
    assert!(matches!(err, KernelError::UnsupportedConfiguration(_)));
}

#[test]
fn test_invalid_definition_is_rejected_at_construction() {
    let desc = TensorDescriptor::new(DataType::F16, StorageLayout::Buffer, Layout::Bhwc);
    let def = OperationDef::new(PrecisionMode::Full).with_src(desc).with_dst(desc);
    assert!(matches!(
        MeanStdDevNormalization::new(def),
        Err(KernelError::UnsupportedConfiguration(_))
    ));
}

#[test]
fn test_padding_lanes_do_not_leak_into_statistics() {
    let backend = ReferenceBackend::default();
    for c in [1, 2, 3, 5, 6, 7, 9] {
        let shape = Bhwc::new(1, 2, 2, c);
        let data = (0..shape.len()).map(|i| 3.0 + (i * 7 % 11) as f32).collect();
        let src = Tensor::new(shape, data).unwrap();
        let dense = kernel(PrecisionMode::Full, StorageLayout::Buffer)
            .execute(&backend, &src, shape)
            .unwrap();
        for storage in [StorageLayout::ImageBuffer, StorageLayout::Texture2D] {
            let sliced = kernel(PrecisionMode::Full, storage)
                .execute(&backend, &src, shape)
                .unwrap();
            assert_eq!(sliced, dense, "c = {c}, {storage}");
        }
    }
}

#[test]
fn test_welford_agrees_with_two_pass() {
    let mut rng = StdRng::seed_from_u64(3);
    let input = Array::random_using((4, 1, 3, 33), Uniform::new(-1000.0f32, 1000.0), &mut rng);
    let src = Tensor::from_ndarray(input.into_dyn()).unwrap();
    let backend = ReferenceBackend::default();
    for precision in PrecisionMode::ALL {
        let two_pass = kernel(precision, StorageLayout::Buffer);
        let welford = two_pass.clone().with_reduction(Reduction::Welford);
        let a = two_pass.execute(&backend, &src, src.shape()).unwrap();
        let b = welford.execute(&backend, &src, src.shape()).unwrap();
        let tolerance = match precision {
            PrecisionMode::Full => 1e-6,
            PrecisionMode::Reduced => 4e-3,
        };
        for (x, y) in a.data().iter().zip(b.data()) {
            assert_abs_diff_eq!(*x, *y, epsilon = tolerance);
        }
    }
}

#[test]
fn test_reduced_precision_collapses_sub_resolution_spread() {
    let backend = ReferenceBackend::default();
    let src = Tensor::new(Bhwc::new(1, 1, 1, 4), vec![99.98, 99.99, 100.01, 100.02]).unwrap();

    let full = kernel(PrecisionMode::Full, StorageLayout::Buffer)
        .execute(&backend, &src, src.shape())
        .unwrap();
    assert!(full.data()[3] > 1.2);

    let reduced = kernel(PrecisionMode::Reduced, StorageLayout::Buffer)
        .execute(&backend, &src, src.shape())
        .unwrap();
    assert_eq!(reduced.data(), &[0.0f32; 4]);
}

#[test]
fn test_reduced_precision_output_is_f16_rounded() {
    let backend = ReferenceBackend::default();
    let src = Tensor::new(Bhwc::new(1, 1, 1, 4), vec![-2.0, -1.0, 1.0, 2.0]).unwrap();
    let out = kernel(PrecisionMode::Reduced, StorageLayout::Buffer)
        .execute(&backend, &src, src.shape())
        .unwrap();
    for (a, e) in out.data().iter().zip(expected_symmetric()) {
        assert_eq!(half::f16::from_f32(*a).to_f32(), *a);
        assert_abs_diff_eq!(*a, e, epsilon = 5e-4);
    }
}

#[test]
fn test_row_stats_report_mean_and_stddev() {
    let src = Tensor::new(
        Bhwc::new(2, 1, 1, 4),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0],
    )
    .unwrap();
    let stats = kernel(PrecisionMode::Full, StorageLayout::Buffer)
        .row_stats(&src)
        .unwrap();
    assert_eq!(stats.len(), 2);
    assert_abs_diff_eq!(stats[0].mean, 2.5, epsilon = 1e-12);
    assert_abs_diff_eq!(stats[0].stddev, 1.25f64.sqrt(), epsilon = 1e-12);
    assert!(!stats[0].degenerate);
    assert!(stats[1].degenerate);
    assert_eq!(stats[1].stddev, 0.0);
}

#[test]
fn test_empty_batch_produces_empty_output() {
    let backend = ReferenceBackend::default();
    let src = Tensor::zeros(Bhwc::new(0, 1, 1, 4));
    let out = kernel(PrecisionMode::Full, StorageLayout::Texture2D)
        .execute(&backend, &src, src.shape())
        .unwrap();
    assert!(out.data().is_empty());
}
