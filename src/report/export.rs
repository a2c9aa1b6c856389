/*!
The JSON export wire contract: one `ExportBundle`, serialized with
`serde_json`, holding every benchmark's raw per-run samples (not just the
console summary).
*/

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;

use crate::config::{Config, StopPolicy};
use crate::model::{BenchmarkRecord, DistributionSummary, MeasurementDescriptor};

#[derive(serde::Serialize)]
pub struct ExportSettings {
    pub time_limit: f64,
    pub runs: u64,
    pub min_runs: Option<u64>,
    pub max_runs: Option<u64>,
    pub warmup_time: f64,
    pub nresamp: u64,
}

#[derive(serde::Serialize)]
pub struct ExportCustomMeasurement {
    pub name: String,
    pub units: String,
    pub cmd: String,
    pub val: Vec<f64>,
}

#[derive(serde::Serialize)]
pub struct ExportKde {
    pub measurement: String,
    /// The density interpolated at the sample mean, for annotating a
    /// plotted curve without re-deriving the bandwidth externally.
    pub mean_height: f64,
}

#[derive(serde::Serialize)]
pub struct ExportBench {
    pub prepare: String,
    pub command: String,
    pub run_count: usize,
    pub wallclock: Vec<f64>,
    pub sys: Vec<f64>,
    pub user: Vec<f64>,
    pub exit_codes: Vec<i32>,
    pub custom_meas: Vec<ExportCustomMeasurement>,
    /// One entry per measurement, absent entirely when this bench aborted
    /// before any distribution summary could be computed for it.
    pub kde: Vec<ExportKde>,
    /// Set when this bench's runs were aborted partway through; `None` on
    /// clean completion.
    pub error: Option<String>,
}

#[derive(serde::Serialize)]
pub struct ExportBundle {
    pub settings: ExportSettings,
    pub benches: Vec<ExportBench>,
}

fn settings_from(config: &Config) -> ExportSettings {
    let (runs, min_runs, max_runs) = match config.stop_policy {
        StopPolicy::Fixed(count) => (count, None, None),
        StopPolicy::Adaptive { min_runs, max_runs } => (0, min_runs, max_runs),
    };
    ExportSettings {
        time_limit: config.time_limit.as_secs_f64(),
        runs,
        min_runs,
        max_runs,
        warmup_time: config.warmup_time.as_secs_f64(),
        nresamp: config.resamples,
    }
}

fn bench_from(
    record: &BenchmarkRecord,
    measurements: &[MeasurementDescriptor],
    distributions: &[DistributionSummary],
) -> ExportBench {
    let custom_meas = measurements[1..]
        .iter()
        .zip(record.measurements[1..].iter())
        .map(|(descriptor, values)| ExportCustomMeasurement {
            name: descriptor.name.clone(),
            units: descriptor.unit.to_string(),
            cmd: descriptor.extractor.clone().unwrap_or_default(),
            val: values.clone(),
        })
        .collect();
    let kde = measurements
        .iter()
        .zip(distributions.iter())
        .map(|(descriptor, summary)| ExportKde {
            measurement: descriptor.name.clone(),
            mean_height: summary.kde.mean_height,
        })
        .collect();
    ExportBench {
        prepare: record.prepare.clone().unwrap_or_default(),
        command: record.command.display.clone(),
        run_count: record.len(),
        wallclock: record.measurements[0].clone(),
        sys: record.systime.clone(),
        user: record.usertime.clone(),
        exit_codes: record.exit_codes.clone(),
        custom_meas,
        kde,
        error: record.error.clone(),
    }
}

/// Builds the exportable bundle from a config, the distribution summaries
/// computed for each record (`distributions[bench_index][measurement_index]`,
/// empty for a bench that aborted), and the records themselves.
pub fn build(
    config: &Config,
    measurements: &[MeasurementDescriptor],
    distributions: &[Vec<DistributionSummary>],
    records: &[BenchmarkRecord],
) -> ExportBundle {
    ExportBundle {
        settings: settings_from(config),
        benches: records
            .iter()
            .zip(distributions.iter())
            .map(|(r, d)| bench_from(r, measurements, d))
            .collect(),
    }
}

/// Writes `bundle` to `path` as pretty-printed JSON.
pub fn write_to_path(path: &Path, bundle: &ExportBundle) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("could not create '{}'", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, bundle)
        .with_context(|| format!("could not write JSON to '{}'", path.display()))?;
    Ok(())
}
