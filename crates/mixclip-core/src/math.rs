//! Shared math utilities: embedding blending, normalization, summary stats.

use crate::error::PipelineError;

/// Linearly combine an image and a text embedding.
///
/// Computes `alpha * image + (1 - alpha) * text` element-wise. `alpha = 1.0`
/// keeps only the image, `alpha = 0.0` only the text.
pub fn blend(image: &[f32], text: &[f32], alpha: f32) -> Result<Vec<f32>, PipelineError> {
    if !(0.0..=1.0).contains(&alpha) || alpha.is_nan() {
        return Err(PipelineError::InvalidAlpha(alpha));
    }
    if image.len() != text.len() {
        return Err(PipelineError::DimensionMismatch {
            path: Default::default(),
            expected: image.len(),
            actual: text.len(),
        });
    }

    let beta = 1.0 - alpha;
    Ok(image
        .iter()
        .zip(text)
        .map(|(&i, &t)| alpha * i + beta * t)
        .collect())
}

/// L2-normalize a vector in place so its magnitude is 1.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// L2-normalize a slice, returning a new vector with unit magnitude.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let mut result = v.to_vec();
    l2_normalize_in_place(&mut result);
    result
}

/// Mean and population standard deviation (ddof = 0).
///
/// Returns `(0.0, 0.0)` for an empty slice.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
