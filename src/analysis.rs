/*!
The Cross-Bench Analyzer: turns raw per-run sample vectors into distribution
summaries, picks the fastest benchmark per measurement, analyzes parameter
sweep groups (invoking the Complexity Fitter when every value is numeric), and
computes pairwise speed ratios against the fastest benchmark.
*/

use xorshift::Xorshift32;

use crate::model::{CommandGroup, DistributionSummary, GroupAnalysis, KdeCurve, PairwiseComparison};
use crate::stats::{self, fit, kde, outliers};

/// Builds the full [`DistributionSummary`] for one sample vector.
pub fn summarize(samples: &[f64], resamples: u64, rng: &mut Xorshift32) -> DistributionSummary {
    let quantiles = stats::quantile_snapshot(samples);
    let mean = stats::bootstrap(samples, resamples, rng, stats::mean);
    let stdev = stats::bootstrap(samples, resamples, rng, stats::stdev);
    let outlier_classification =
        outliers::classify(samples, &quantiles, mean.point, stdev.point);
    let density = kde::build(samples, mean.point, stdev.point, &quantiles, kde::Domain::Regular);
    DistributionSummary {
        quantiles,
        mean,
        stdev,
        outliers: outlier_classification,
        kde: KdeCurve { xs: density.xs, ys: density.ys, mean_height: density.mean_height },
    }
}

/// For each measurement index, the index of the bench whose mean point
/// estimate is smallest, skipping any bench that aborted with an error (an
/// empty entry in `distributions`).
///
/// `distributions[bench_index][measurement_index]`, matching
/// [`crate::model::ResultsBundle::distributions`].
pub fn fastest_per_measurement(distributions: &[Vec<DistributionSummary>]) -> Vec<usize> {
    let num_measurements = distributions.iter().find(|d| !d.is_empty()).map_or(0, |d| d.len());
    (0..num_measurements)
        .map(|measurement_index| {
            distributions
                .iter()
                .enumerate()
                .filter(|(_, d)| !d.is_empty())
                .min_by(|(_, a), (_, b)| {
                    a[measurement_index]
                        .mean
                        .point
                        .partial_cmp(&b[measurement_index].mean.point)
                        .unwrap()
                })
                .map(|(bench_index, _)| bench_index)
                .expect("num_measurements is derived from a non-empty distribution")
        })
        .collect()
}

/// Analyzes one (measurement, group) pair: per-value means, fastest/slowest
/// member, and (when every value string parses as a number) a complexity
/// fit over those means. A group member whose bench aborted with an error
/// (an empty entry in `distributions`) is left out of `per_value_mean`
/// entirely.
pub fn analyze_group(
    group: &CommandGroup,
    group_index: usize,
    measurement_index: usize,
    distributions: &[Vec<DistributionSummary>],
) -> GroupAnalysis {
    let per_value_mean: Vec<(String, f64)> = group
        .values
        .iter()
        .filter(|(_, bench_index)| !distributions[*bench_index].is_empty())
        .map(|(value, bench_index)| {
            (value.clone(), distributions[*bench_index][measurement_index].mean.point)
        })
        .collect();

    if per_value_mean.is_empty() {
        return GroupAnalysis {
            measurement_index,
            group_index,
            per_value_mean,
            fastest: 0,
            slowest: 0,
            numeric: false,
            fit: None,
        };
    }

    let fastest = argmin(&per_value_mean);
    let slowest = argmax(&per_value_mean);

    let numeric_xs: Option<Vec<f64>> = per_value_mean
        .iter()
        .map(|(value, _)| value.parse::<f64>().ok())
        .collect();

    let (numeric, complexity_fit) = match numeric_xs {
        Some(xs) if !xs.is_empty() => {
            let ys: Vec<f64> = per_value_mean.iter().map(|(_, mean)| *mean).collect();
            (true, Some(fit::fit(&xs, &ys)))
        }
        _ => (false, None),
    };

    GroupAnalysis {
        measurement_index,
        group_index,
        per_value_mean,
        fastest,
        slowest,
        numeric,
        fit: complexity_fit,
    }
}

fn argmin(per_value_mean: &[(String, f64)]) -> usize {
    per_value_mean
        .iter()
        .enumerate()
        .min_by(|(_, (_, a)), (_, (_, b))| a.partial_cmp(b).unwrap())
        .map(|(i, _)| i)
        .expect("per_value_mean is non-empty")
}

fn argmax(per_value_mean: &[(String, f64)]) -> usize {
    per_value_mean
        .iter()
        .enumerate()
        .max_by(|(_, (_, a)), (_, (_, b))| a.partial_cmp(b).unwrap())
        .map(|(i, _)| i)
        .expect("per_value_mean is non-empty")
}

/// Pairwise speed ratios for every bench against the fastest bench, for one
/// measurement index. A bench that aborted with an error (an empty entry in
/// `distributions`) is left out.
pub fn pairwise_for_measurement(
    measurement_index: usize,
    fastest_index: usize,
    distributions: &[Vec<DistributionSummary>],
) -> Vec<PairwiseComparison> {
    let fastest_summary = &distributions[fastest_index][measurement_index];
    let mu_fastest = fastest_summary.mean.point;
    let sigma_fastest = fastest_summary.stdev.point;

    distributions
        .iter()
        .enumerate()
        .filter(|(_, dists)| !dists.is_empty())
        .map(|(bench_index, dists)| {
            let summary = &dists[measurement_index];
            let mu = summary.mean.point;
            let sigma = summary.stdev.point;
            let ratio = if mu_fastest == 0.0 { 0.0 } else { mu / mu_fastest };
            let ratio_stdev = if mu == 0.0 || mu_fastest == 0.0 {
                0.0
            } else {
                ratio
                    * ((sigma / mu).powi(2) + (sigma_fastest / mu_fastest).powi(2)).sqrt()
            };
            PairwiseComparison { bench_index, fastest_index, ratio, ratio_stdev }
        })
        .collect()
}
