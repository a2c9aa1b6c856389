/*!
Outlier classification and the outlier-variance effect.

Samples are classified against Tukey fences (1.5x and 3x IQR), and a single
"outlier variance" fraction in `[0, 1]` estimates how much of the observed
standard deviation is attributable to outliers rather than to the underlying
distribution.
*/

use crate::model::{OutlierClassification, QuantileSnapshot};

/// Classifies every sample against the Tukey fences derived from `quantiles`
/// and computes the outlier-variance fraction from `mean`/`stdev`.
pub fn classify(
    samples: &[f64],
    quantiles: &QuantileSnapshot,
    mean: f64,
    stdev: f64,
) -> OutlierClassification {
    let iqr = quantiles.q3 - quantiles.q1;
    let low_severe_fence = quantiles.q1 - 3.0 * iqr;
    let low_mild_fence = quantiles.q1 - 1.5 * iqr;
    let high_mild_fence = quantiles.q3 + 1.5 * iqr;
    let high_severe_fence = quantiles.q3 + 3.0 * iqr;

    let mut low_severe = 0;
    let mut low_mild = 0;
    let mut high_mild = 0;
    let mut high_severe = 0;
    for &x in samples {
        if x < low_severe_fence {
            low_severe += 1;
        } else if x > high_severe_fence {
            high_severe += 1;
        } else if x < low_mild_fence {
            low_mild += 1;
        } else if x > high_mild_fence {
            high_mild += 1;
        }
    }

    OutlierClassification {
        low_severe,
        low_mild,
        high_mild,
        high_severe,
        low_severe_fence,
        low_mild_fence,
        high_mild_fence,
        high_severe_fence,
        variance_fraction: outlier_variance(mean, stdev, samples.len()),
    }
}

/// The largest plausible outlier count for threshold `x`, the positive root
/// of the quadratic this effect's derivation reduces to.
fn c_max(x: f64, u_a: f64, sigma_b2: f64, sigma_g2: f64, a: f64) -> f64 {
    let k = u_a - x;
    let k1 = sigma_b2 - a * sigma_g2 + a * k * k;
    let k0 = -a * a * k * k;
    let det = k1 * k1 - 4.0 * sigma_g2 * k0;
    let denom = k1 + det.max(0.0).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (-2.0 * k0 / denom).floor()
}

/// The variance attributable to `c` outliers among `a` total samples.
fn var_out(c: f64, a: f64, sigma_b2: f64, sigma_g2: f64) -> f64 {
    let c = c.clamp(0.0, a);
    ((a - c) / a) * (sigma_b2 - (a - c) * sigma_g2)
}

/// The outlier-variance fraction: the share of `stdev` attributable to
/// outliers, clamped to `[0, 1]`.
///
/// Returns `0.0` when `stdev` is zero (a constant sample has no variance for
/// outliers to explain), which is also the `NumericDegenerate` guard against
/// dividing by zero.
fn outlier_variance(mean: f64, stdev: f64, n: usize) -> f64 {
    let a = n as f64;
    if a == 0.0 || stdev == 0.0 {
        return 0.0;
    }
    let sigma_b2 = stdev * stdev;
    let u_a = mean / a;
    let u_g_min = u_a / 2.0;
    let sigma_g = (u_g_min / 4.0).min(stdev / a.sqrt());
    let sigma_g2 = sigma_g * sigma_g;

    let c_max_0 = c_max(0.0, u_a, sigma_b2, sigma_g2, a);
    let c_max_ugmin = c_max(u_g_min, u_a, sigma_b2, sigma_g2, a);
    let var1 = var_out(1.0, a, sigma_b2, sigma_g2);
    let var2 = var_out(c_max_0.min(c_max_ugmin), a, sigma_b2, sigma_g2);

    (var1.min(var2) / sigma_b2).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{mean, quantile_snapshot, stdev};

    #[test]
    fn no_outliers_in_a_tight_sample() {
        let samples: Vec<f64> = (0..100).map(|i| 1.0 + (i as f64) * 0.0001).collect();
        let q = quantile_snapshot(&samples);
        let m = mean(&samples);
        let s = stdev(&samples);
        let outliers = classify(&samples, &q, m, s);
        assert_eq!(outliers.total(), 0);
    }

    #[test]
    fn severe_high_outlier_is_counted_once() {
        let mut samples: Vec<f64> = (0..50).map(|_| 1.0).collect();
        samples.push(1000.0);
        let q = quantile_snapshot(&samples);
        let m = mean(&samples);
        let s = stdev(&samples);
        let outliers = classify(&samples, &q, m, s);
        assert!(outliers.total() <= samples.len());
        // The single extreme value should land in exactly one bucket.
        assert_eq!(
            outliers.low_severe + outliers.low_mild + outliers.high_mild,
            0
        );
        assert_eq!(outliers.high_severe, 1);
    }

    #[test]
    fn a_value_outside_severe_fence_is_never_mild() {
        let mut samples: Vec<f64> = vec![10.0; 40];
        samples.push(-1000.0);
        let q = quantile_snapshot(&samples);
        let m = mean(&samples);
        let s = stdev(&samples);
        let outliers = classify(&samples, &q, m, s);
        assert_eq!(outliers.low_severe, 1);
        assert_eq!(outliers.low_mild, 0);
    }

    #[test]
    fn variance_fraction_is_bounded() {
        let samples: Vec<f64> = vec![
            1.0, 1.1, 0.9, 1.05, 0.95, 50.0, 1.0, 1.0, 1.2, 0.8,
        ];
        let m = mean(&samples);
        let s = stdev(&samples);
        let frac = outlier_variance(m, s, samples.len());
        assert!((0.0..=1.0).contains(&frac));
    }

    #[test]
    fn variance_fraction_is_zero_for_constant_sample() {
        let samples = vec![5.0; 20];
        let m = mean(&samples);
        let s = stdev(&samples);
        assert_eq!(outlier_variance(m, s, samples.len()), 0.0);
    }
}
