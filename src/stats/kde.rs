/*!
The KDE Builder: a Gaussian kernel density estimate over a sample, with a
Silverman-style bandwidth and a fixed-size sampled curve.
*/

use crate::model::QuantileSnapshot;

const GRID_POINTS: usize = 200;

/// A sampled kernel density estimate: `GRID_POINTS` equally spaced
/// `(x, y)` pairs plus the interpolated height at the sample mean.
#[derive(Clone, Debug, PartialEq)]
pub struct Density {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub mean_height: f64,
}

/// Which domain to sample the density over.
#[derive(Clone, Copy, Debug)]
pub enum Domain {
    /// `[max(mean - 3*stdev, p5), min(mean + 3*stdev, p95)]`.
    Regular,
    /// `[max(mean - 6*stdev, p1), min(mean + 6*stdev, p99)]`.
    Extended,
}

fn bandwidth(samples: &[f64], stdev: f64, quantiles: &QuantileSnapshot) -> f64 {
    let n = samples.len() as f64;
    let iqr = quantiles.q3 - quantiles.q1;
    0.9 * stdev.min(iqr / 1.34) * n.powf(-1.0 / 5.0)
}

fn gaussian(u: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * u * u).exp()
}

fn domain_bounds(
    domain: Domain,
    mean: f64,
    stdev: f64,
    quantiles: &QuantileSnapshot,
) -> (f64, f64) {
    match domain {
        Domain::Regular => (
            (mean - 3.0 * stdev).max(quantiles.p5),
            (mean + 3.0 * stdev).min(quantiles.p95),
        ),
        Domain::Extended => (
            (mean - 6.0 * stdev).max(quantiles.p1),
            (mean + 6.0 * stdev).min(quantiles.p99),
        ),
    }
}

/// Builds a Gaussian KDE of `samples` over `domain`.
///
/// `stdev` and `quantiles` are passed in rather than recomputed, since every
/// caller already has a [`crate::model::DistributionSummary`] in hand.
pub fn build(
    samples: &[f64],
    mean: f64,
    stdev: f64,
    quantiles: &QuantileSnapshot,
    domain: Domain,
) -> Density {
    let n = samples.len() as f64;
    let h = bandwidth(samples, stdev, quantiles);
    let (lo, hi) = domain_bounds(domain, mean, stdev, quantiles);

    let mut xs = Vec::with_capacity(GRID_POINTS);
    let mut ys = Vec::with_capacity(GRID_POINTS);
    for i in 0..GRID_POINTS {
        let x = if GRID_POINTS == 1 {
            lo
        } else {
            lo + (hi - lo) * (i as f64) / ((GRID_POINTS - 1) as f64)
        };
        let density = if h == 0.0 {
            0.0
        } else {
            samples.iter().map(|&xj| gaussian((x - xj) / h)).sum::<f64>() / (n * h)
        };
        xs.push(x);
        ys.push(density);
    }

    let mean_height = interpolate(&xs, &ys, mean);
    Density { xs, ys, mean_height }
}

/// Linear interpolation of the curve `(xs, ys)` at `x`, clamping to the
/// endpoints outside the sampled domain.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    // xs is non-decreasing, so the first index whose x exceeds the target
    // brackets the interpolation interval with its predecessor.
    let idx = xs.partition_point(|&xi| xi <= x);
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);
    if x1 == x0 {
        return y0;
    }
    let t = (x - x0) / (x1 - x0);
    y0 + t * (y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{mean, quantile_snapshot, stdev};

    #[test]
    fn density_is_nonnegative_everywhere() {
        let samples: Vec<f64> = (0..100).map(|i| 1.0 + (i as f64) * 0.01).collect();
        let m = mean(&samples);
        let s = stdev(&samples);
        let q = quantile_snapshot(&samples);
        let density = build(&samples, m, s, &q, Domain::Regular);
        assert_eq!(density.xs.len(), GRID_POINTS);
        assert_eq!(density.ys.len(), GRID_POINTS);
        assert!(density.ys.iter().all(|&y| y >= 0.0));
    }

    #[test]
    fn extended_domain_is_at_least_as_wide_as_regular() {
        let samples: Vec<f64> = (0..100).map(|i| 1.0 + (i as f64) * 0.01).collect();
        let m = mean(&samples);
        let s = stdev(&samples);
        let q = quantile_snapshot(&samples);
        let regular = build(&samples, m, s, &q, Domain::Regular);
        let extended = build(&samples, m, s, &q, Domain::Extended);
        let regular_width = regular.xs[regular.xs.len() - 1] - regular.xs[0];
        let extended_width = extended.xs[extended.xs.len() - 1] - extended.xs[0];
        assert!(extended_width >= regular_width - 1e-9);
    }

    #[test]
    fn mean_height_matches_interpolation_at_the_mean() {
        let samples: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let m = mean(&samples);
        let s = stdev(&samples);
        let q = quantile_snapshot(&samples);
        let density = build(&samples, m, s, &q, Domain::Regular);
        let expected = interpolate(&density.xs, &density.ys, m);
        assert!((density.mean_height - expected).abs() < 1e-12);
    }

    #[test]
    fn degenerate_bandwidth_does_not_produce_nan() {
        let samples = vec![5.0; 10];
        let m = mean(&samples);
        let s = stdev(&samples);
        let q = quantile_snapshot(&samples);
        let density = build(&samples, m, s, &q, Domain::Regular);
        assert!(density.ys.iter().all(|y| !y.is_nan()));
    }
}
