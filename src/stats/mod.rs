/*!
The Statistics Kernel: mean, population standard deviation, quantile
snapshots and bootstrap resampling.

Resampling uses a per-worker [`xorshift::Xorshift32`] rather than any kind of
shared or thread-local global RNG: two workers must never share RNG state,
and results must be reproducible given a fixed seed.
*/

pub mod fit;
pub mod kde;
pub mod outliers;

use xorshift::Xorshift32;

use crate::model::{Estimate, QuantileSnapshot};

/// Arithmetic mean. Panics on an empty slice, since every call site first
/// establishes that the benchmark recorded at least one run.
pub fn mean(samples: &[f64]) -> f64 {
    assert!(!samples.is_empty(), "mean: samples must be non-empty");
    samples.iter().sum::<f64>() / (samples.len() as f64)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
///
/// Returns `0.0` for `n < 2`: the kernel must not divide by zero or produce
/// `NaN` on a degenerate sample.
pub fn stdev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let variance = samples.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        / (samples.len() as f64);
    variance.sqrt()
}

/// A sorted-quantile snapshot of `samples` at fixed percentile positions.
/// Panics on an empty slice.
pub fn quantile_snapshot(samples: &[f64]) -> QuantileSnapshot {
    assert!(!samples.is_empty(), "quantile_snapshot: samples must be non-empty");
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN sample"));
    let n = sorted.len();
    let at = |pos: usize| sorted[pos.min(n - 1)];
    QuantileSnapshot {
        min: sorted[0],
        p1: at(n / 100),
        p5: at(5 * n / 100),
        q1: at(n / 4),
        q3: at(3 * n / 4),
        p95: at(95 * n / 100),
        p99: at(99 * n / 100),
        max: sorted[n - 1],
    }
}

/// Builds one bootstrap resample of `samples` (drawing `n` indices with
/// replacement) into `out`, which is cleared first.
fn resample_into(samples: &[f64], rng: &mut Xorshift32, out: &mut Vec<f64>) {
    out.clear();
    out.extend((0..samples.len()).map(|_| samples[rng.next_index(samples.len())]));
}

/// Computes a bootstrap [`Estimate`] for the given statistic over `samples`.
///
/// This is a min/max envelope across `resamples` bootstrap resamples, not a
/// percentile confidence interval: the point estimate is the statistic on
/// the original sample, and the bounds are the minimum and maximum value the
/// statistic took across every resample. The envelope therefore widens,
/// rather than tightens, as `resamples` grows.
pub fn bootstrap<F>(
    samples: &[f64],
    resamples: u64,
    rng: &mut Xorshift32,
    statistic: F,
) -> Estimate
where
    F: Fn(&[f64]) -> f64,
{
    let point = statistic(samples);
    if samples.len() < 2 {
        return Estimate::degenerate(point);
    }
    let mut lower = f64::INFINITY;
    let mut upper = f64::NEG_INFINITY;
    let mut scratch = Vec::with_capacity(samples.len());
    for _ in 0..resamples {
        resample_into(samples, rng, &mut scratch);
        let value = statistic(&scratch);
        if value < lower {
            lower = value;
        }
        if value > upper {
            upper = value;
        }
    }
    Estimate { lower, point, upper }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_constant_sample() {
        assert_eq!(mean(&[3.0, 3.0, 3.0]), 3.0);
    }

    #[test]
    fn stdev_below_two_samples_is_zero() {
        assert_eq!(stdev(&[]), 0.0);
        assert_eq!(stdev(&[5.0]), 0.0);
    }

    #[test]
    fn stdev_is_population_form() {
        // [1, 2, 3, 4]: mean 2.5, population variance = 1.25, stdev ~1.1180
        let s = stdev(&[1.0, 2.0, 3.0, 4.0]);
        assert!((s - 1.118_033_988_75).abs() < 1e-9);
    }

    #[test]
    fn quantile_snapshot_is_monotonic() {
        let samples: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let q = quantile_snapshot(&samples);
        assert!(q.min <= q.p1);
        assert!(q.p1 <= q.p5);
        assert!(q.p5 <= q.q1);
        assert!(q.q1 <= q.q3);
        assert!(q.q3 <= q.p95);
        assert!(q.p95 <= q.p99);
        assert!(q.p99 <= q.max);
    }

    #[test]
    fn bootstrap_triple_is_ordered() {
        let mut rng = Xorshift32::new(1234);
        let samples = [1.0, 5.0, 2.0, 9.0, 3.0, 7.0];
        let est = bootstrap(&samples, 2_000, &mut rng, mean);
        assert!(est.lower <= est.point);
        assert!(est.point <= est.upper);
    }

    #[test]
    fn bootstrap_on_constant_sample_collapses() {
        let mut rng = Xorshift32::new(7);
        let samples = [1.0, 1.0, 1.0, 1.0];
        let mean_est = bootstrap(&samples, 500, &mut rng, mean);
        assert_eq!(mean_est, Estimate::degenerate(1.0));
        let stdev_est = bootstrap(&samples, 500, &mut rng, stdev);
        assert_eq!(stdev_est, Estimate::degenerate(0.0));
    }

    #[test]
    fn bootstrap_is_deterministic_given_seed() {
        let samples = [1.0, 5.0, 2.0, 9.0, 3.0, 7.0, 4.0, 8.0];
        let mut rng_a = Xorshift32::new(99);
        let mut rng_b = Xorshift32::new(99);
        let est_a = bootstrap(&samples, 5_000, &mut rng_a, mean);
        let est_b = bootstrap(&samples, 5_000, &mut rng_b, mean);
        assert_eq!(est_a.lower, est_b.lower);
        assert_eq!(est_a.upper, est_b.upper);
    }

    #[test]
    fn bootstrap_degenerate_for_single_sample() {
        let mut rng = Xorshift32::new(1);
        let est = bootstrap(&[42.0], 100, &mut rng, mean);
        assert_eq!(est, Estimate::degenerate(42.0));
    }
}
