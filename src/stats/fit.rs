/*!
The Complexity Fitter: least-squares fit of observed per-value means against a
fixed family of growth curves, picking the curve with the smallest normalized
RMS residual.
*/

use crate::model::{ComplexityFit, ComplexityTag};

const FAMILY: &[ComplexityTag] = &[
    ComplexityTag::Constant,
    ComplexityTag::Linear,
    ComplexityTag::Quadratic,
    ComplexityTag::Cubic,
    ComplexityTag::Logarithmic,
    ComplexityTag::Linearithmic,
];

/// The fitting kernel `g(x)` for a given curve tag.
fn kernel(tag: ComplexityTag, x: f64) -> f64 {
    match tag {
        ComplexityTag::Constant => 1.0,
        ComplexityTag::Linear => x,
        ComplexityTag::Quadratic => x * x,
        ComplexityTag::Cubic => x * x * x,
        ComplexityTag::Logarithmic => x.log2(),
        ComplexityTag::Linearithmic => x * x.log2(),
    }
}

/// Fits `(x, y)` pairs to a single curve, returning its least-squares
/// coefficient and normalized RMS residual.
fn fit_one(tag: ComplexityTag, xs: &[f64], ys: &[f64]) -> ComplexityFit {
    let n = xs.len() as f64;
    let gs: Vec<f64> = xs.iter().map(|&x| kernel(tag, x)).collect();
    let numerator: f64 = ys.iter().zip(&gs).map(|(y, g)| y * g).sum();
    let denominator: f64 = gs.iter().map(|g| g * g).sum();
    let coefficient = if denominator == 0.0 { 0.0 } else { numerator / denominator };

    let mean_y = ys.iter().sum::<f64>() / n;
    let residual_sq: f64 = ys
        .iter()
        .zip(&gs)
        .map(|(y, g)| (y - coefficient * g).powi(2))
        .sum();
    let rms = (residual_sq / n).sqrt();
    let normalized_rms = if mean_y == 0.0 { rms } else { rms / mean_y };

    ComplexityFit { tag, coefficient, normalized_rms }
}

/// Fits `(x, y)` pairs against every curve in the family and returns the one
/// with the smallest normalized RMS.
///
/// Panics if `xs` and `ys` differ in length or are empty; every call site
/// first checks that a group's values all parsed as numbers before reaching
/// here.
pub fn fit(xs: &[f64], ys: &[f64]) -> ComplexityFit {
    assert_eq!(xs.len(), ys.len(), "fit: xs and ys must have equal length");
    assert!(!xs.is_empty(), "fit: xs must be non-empty");

    FAMILY
        .iter()
        .map(|&tag| fit_one(tag, xs, ys))
        .min_by(|a, b| a.normalized_rms.partial_cmp(&b.normalized_rms).unwrap())
        .expect("FAMILY is non-empty")
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn exact_linear_data_fits_linear_with_zero_rms() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.5 * x).collect();
        let result = fit(&xs, &ys);
        assert_eq!(result.tag, ComplexityTag::Linear);
        assert_relative_eq!(result.coefficient, 2.5, epsilon = 1e-9);
        assert!(result.normalized_rms < 1e-9);
    }

    #[test]
    fn exact_quadratic_data_fits_quadratic() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys: Vec<f64> = xs.iter().map(|x| 0.75 * x * x).collect();
        let result = fit(&xs, &ys);
        assert_eq!(result.tag, ComplexityTag::Quadratic);
        assert_relative_eq!(result.coefficient, 0.75, epsilon = 1e-9);
        assert!(result.normalized_rms < 1e-9);
    }

    #[test]
    fn exact_constant_data_fits_constant() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        let ys = vec![7.0, 7.0, 7.0, 7.0];
        let result = fit(&xs, &ys);
        assert_eq!(result.tag, ComplexityTag::Constant);
        assert_relative_eq!(result.coefficient, 7.0, epsilon = 1e-9);
        assert!(result.normalized_rms < 1e-9);
    }

    #[test]
    fn exact_log_data_fits_logarithmic() {
        let xs: Vec<f64> = vec![2.0, 4.0, 8.0, 16.0, 32.0, 64.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x.log2()).collect();
        let result = fit(&xs, &ys);
        assert_eq!(result.tag, ComplexityTag::Logarithmic);
        assert!((result.coefficient - 3.0).abs() < 1e-6);
    }

    #[test]
    fn noisy_quadratic_still_prefers_quadratic_over_cubic() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| x * x + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let result = fit(&xs, &ys);
        assert_eq!(result.tag, ComplexityTag::Quadratic);
    }
}
