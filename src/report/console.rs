/*!
The console summary table: one short table per measurement, benchmark display
string, mean ± stdev, min…max and outlier count, printed with `termcolor` +
`tabwriter` elastic tabstops. The fastest benchmark for each measurement is
bolded.
*/

use std::io::Write;

use crate::args::Color;
use crate::model::{
    BenchmarkRecord, DistributionSummary, GroupAnalysis, MeasurementDescriptor,
    PairwiseComparison,
};
use crate::util;

/// Prints one table per measurement to stdout.
///
/// `display_names[i]` and `distributions[i]` both index by benchmark; the
/// caller is responsible for keeping them in the same order. A benchmark
/// that aborted with an error has an empty entry in `distributions` and is
/// skipped here; see `print_failures` for surfacing it.
pub fn print_summary(
    color: Color,
    measurements: &[MeasurementDescriptor],
    display_names: &[String],
    distributions: &[Vec<DistributionSummary>],
    fastest: &[usize],
) -> anyhow::Result<()> {
    let mut wtr = color.elastic_stdout();
    for (measurement_index, descriptor) in measurements.iter().enumerate() {
        writeln!(wtr, "measurement: {} ({})", descriptor.name, descriptor.unit)?;
        writeln!(wtr, "benchmark\tmean\tstdev\tmin\tmax\toutliers\tkde@mean")?;
        for (bench_index, name) in display_names.iter().enumerate() {
            if distributions[bench_index].is_empty() {
                continue;
            }
            let summary = &distributions[bench_index][measurement_index];
            let line = format!(
                "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}\t{:.6}",
                name,
                summary.mean.point,
                summary.stdev.point,
                summary.quantiles.min,
                summary.quantiles.max,
                summary.outliers.total(),
                summary.kde.mean_height,
            );
            if fastest.get(measurement_index) == Some(&bench_index) {
                util::colorize_label(&mut *wtr, |w| writeln!(w, "{}", line))?;
            } else {
                writeln!(wtr, "{}", line)?;
            }
        }
        writeln!(wtr)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Prints the error for every benchmark that aborted partway through, if
/// any. A no-op (no output) when every benchmark completed cleanly.
///
/// `display_names[i]` and `benches[i]` both index by benchmark, the same
/// convention as `print_summary`.
pub fn print_failures(
    color: Color,
    display_names: &[String],
    benches: &[BenchmarkRecord],
) -> anyhow::Result<()> {
    let failures: Vec<_> = display_names
        .iter()
        .zip(benches.iter())
        .filter_map(|(name, record)| record.error.as_ref().map(|err| (name, err)))
        .collect();
    if failures.is_empty() {
        return Ok(());
    }
    let mut wtr = color.elastic_stdout();
    writeln!(wtr, "failures:")?;
    for (name, err) in failures {
        writeln!(wtr, "{}\t{}", name, err)?;
    }
    writeln!(wtr)?;
    wtr.flush()?;
    Ok(())
}

/// Prints each bench's speed ratio against the fastest bench, for one
/// measurement, one table per measurement.
pub fn print_pairwise(
    color: Color,
    measurements: &[MeasurementDescriptor],
    display_names: &[String],
    pairwise: &[Vec<PairwiseComparison>],
) -> anyhow::Result<()> {
    let mut wtr = color.elastic_stdout();
    for (measurement_index, descriptor) in measurements.iter().enumerate() {
        let comparisons = match pairwise.get(measurement_index) {
            Some(comparisons) => comparisons,
            None => continue,
        };
        writeln!(wtr, "speed ratio: {} ({})", descriptor.name, descriptor.unit)?;
        writeln!(wtr, "benchmark\tratio\tratio stdev")?;
        for comparison in comparisons {
            let name = &display_names[comparison.bench_index];
            writeln!(
                wtr,
                "{}\t{:.3}x\t{:.3}",
                name, comparison.ratio, comparison.ratio_stdev
            )?;
        }
        writeln!(wtr)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Prints one table per (measurement, group): each parameter value's mean,
/// which value was fastest/slowest, and the complexity fit when numeric.
pub fn print_groups(
    color: Color,
    measurements: &[MeasurementDescriptor],
    analyses: &[GroupAnalysis],
) -> anyhow::Result<()> {
    let mut wtr = color.elastic_stdout();
    for analysis in analyses {
        let descriptor = &measurements[analysis.measurement_index];
        writeln!(
            wtr,
            "group {}: {} ({})",
            analysis.group_index, descriptor.name, descriptor.unit
        )?;
        writeln!(wtr, "value\tmean")?;
        for (i, (value, mean)) in analysis.per_value_mean.iter().enumerate() {
            let marker = if i == analysis.fastest {
                " (fastest)"
            } else if i == analysis.slowest {
                " (slowest)"
            } else {
                ""
            };
            writeln!(wtr, "{}\t{:.6}{}", value, mean, marker)?;
        }
        if let Some(fit) = analysis.fit {
            writeln!(
                wtr,
                "fit: {} (coefficient {:.6}, normalized rms {:.6})",
                fit.tag, fit.coefficient, fit.normalized_rms
            )?;
        }
        writeln!(wtr)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Estimate, KdeCurve, OutlierClassification, QuantileSnapshot, Unit};

    fn summary(mean: f64) -> DistributionSummary {
        DistributionSummary {
            quantiles: QuantileSnapshot {
                min: mean - 0.1,
                p1: mean - 0.09,
                p5: mean - 0.05,
                q1: mean - 0.02,
                q3: mean + 0.02,
                p95: mean + 0.05,
                p99: mean + 0.09,
                max: mean + 0.1,
            },
            mean: Estimate::degenerate(mean),
            stdev: Estimate::degenerate(0.01),
            outliers: OutlierClassification::default(),
            kde: KdeCurve { xs: vec![mean], ys: vec![1.0], mean_height: 1.0 },
        }
    }

    #[test]
    fn print_summary_does_not_error_with_multiple_benches() {
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        let distributions = vec![vec![summary(0.02)], vec![summary(0.01)]];
        let fastest = vec![1];
        let names = vec!["sleep 0.02".to_string(), "sleep 0.01".to_string()];
        let result = print_summary(
            Color::Never,
            &measurements,
            &names,
            &distributions,
            &fastest,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn print_summary_handles_custom_measurement_units() {
        let measurements = vec![
            MeasurementDescriptor::wall_clock(),
            MeasurementDescriptor {
                name: "throughput".to_string(),
                extractor: Some("cat".to_string()),
                unit: Unit::Custom("req/s".to_string()),
            },
        ];
        let distributions = vec![vec![summary(0.02), summary(100.0)]];
        let fastest = vec![0, 0];
        let names = vec!["noop".to_string()];
        let result = print_summary(
            Color::Never,
            &measurements,
            &names,
            &distributions,
            &fastest,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn print_summary_skips_an_aborted_bench() {
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        let distributions = vec![Vec::new(), vec![summary(0.01)]];
        let fastest = vec![1];
        let names = vec!["broken".to_string(), "sleep 0.01".to_string()];
        let result = print_summary(Color::Never, &measurements, &names, &distributions, &fastest);
        assert!(result.is_ok());
    }

    #[test]
    fn print_failures_is_a_no_op_with_no_errors() {
        use crate::model::{CommandDescriptor, InputPolicy, OutputPolicy};
        use std::path::PathBuf;
        use std::sync::Arc;

        let command = Arc::new(CommandDescriptor {
            display: "true".to_string(),
            executable: PathBuf::from("/bin/sh"),
            argv: vec![],
            input: InputPolicy::Null,
            output: OutputPolicy::Null,
        });
        let benches = vec![crate::model::BenchmarkRecord::new(command, None, 1)];
        let names = vec!["true".to_string()];
        let result = print_failures(Color::Never, &names, &benches);
        assert!(result.is_ok());
    }

    #[test]
    fn print_failures_reports_a_bench_with_an_error_set() {
        use crate::model::{CommandDescriptor, InputPolicy, OutputPolicy};
        use std::path::PathBuf;
        use std::sync::Arc;

        let command = Arc::new(CommandDescriptor {
            display: "exit 1".to_string(),
            executable: PathBuf::from("/bin/sh"),
            argv: vec![],
            input: InputPolicy::Null,
            output: OutputPolicy::Null,
        });
        let mut record = crate::model::BenchmarkRecord::new(command, None, 1);
        record.error = Some("prepare command exited with status 1".to_string());
        let names = vec!["exit 1".to_string()];
        let result = print_failures(Color::Never, &names, &[record]);
        assert!(result.is_ok());
    }

    #[test]
    fn print_pairwise_does_not_error() {
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        let names = vec!["sleep 0.02".to_string(), "sleep 0.01".to_string()];
        let pairwise = vec![vec![
            PairwiseComparison { bench_index: 0, fastest_index: 1, ratio: 2.0, ratio_stdev: 0.1 },
            PairwiseComparison { bench_index: 1, fastest_index: 1, ratio: 1.0, ratio_stdev: 0.0 },
        ]];
        let result = print_pairwise(Color::Never, &measurements, &names, &pairwise);
        assert!(result.is_ok());
    }

    #[test]
    fn print_groups_does_not_error() {
        use crate::model::ComplexityFit;

        let measurements = vec![MeasurementDescriptor::wall_clock()];
        let analyses = vec![GroupAnalysis {
            measurement_index: 0,
            group_index: 0,
            per_value_mean: vec![("1".to_string(), 0.01), ("2".to_string(), 0.02)],
            fastest: 0,
            slowest: 1,
            numeric: true,
            fit: Some(ComplexityFit {
                tag: crate::model::ComplexityTag::Linear,
                coefficient: 0.01,
                normalized_rms: 0.0,
            }),
        }];
        let result = print_groups(Color::Never, &measurements, &analyses);
        assert!(result.is_ok());
    }
}
