//! Pointwise comparison of kernel output against expected values.

use crate::error::{HarnessError, HarnessResult};

/// Largest absolute difference and the index where it occurs.
pub fn max_abs_diff(actual: &[f32], expected: &[f32]) -> Option<(usize, f32)> {
    actual
        .iter()
        .zip(expected)
        .map(|(a, e)| (a - e).abs())
        .enumerate()
        .fold(None, |best, (i, d)| match best {
            Some((_, m)) if m >= d => best,
            _ => Some((i, d)),
        })
}

/// Checks `|actual[i] - expected[i]| <= tolerance` for every element.
///
/// A tolerance of zero demands exact equality. NaN never matches. The first
/// violating element is reported.
pub fn check_pointwise_near(
    label: &str,
    actual: &[f32],
    expected: &[f32],
    tolerance: f32,
) -> HarnessResult<()> {
    if actual.len() != expected.len() {
        return Err(HarnessError::LengthMismatch {
            label: label.to_string(),
            actual: actual.len(),
            expected: expected.len(),
        });
    }
    for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let diff = (a - e).abs();
        if !(diff <= tolerance) {
            if let Some((worst, max)) = max_abs_diff(actual, expected) {
                log::debug!("'{label}': max |diff| {max} at index {worst}");
            }
            return Err(HarnessError::ToleranceViolation {
                label: label.to_string(),
                index,
                actual: a,
                expected: e,
                diff,
                tolerance,
            });
        }
    }
    Ok(())
}

/// Panicking form of [`check_pointwise_near`] for use inside tests.
#[track_caller]
pub fn assert_pointwise_near(label: &str, actual: &[f32], expected: &[f32], tolerance: f32) {
    if let Err(e) = check_pointwise_near(label, actual, expected, tolerance) {
        println!("actual:   {actual:?}");
        println!("expected: {expected:?}");
        panic!("{e}");
    }
}
