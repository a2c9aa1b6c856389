/*!
The data model shared by every component of the engine: measurement
descriptors, command descriptors, benchmark records and the various summary
types produced by the statistics kernel and the cross-bench analyzer.

Nothing in this module runs a process or computes a statistic; it's pure data,
mutated in the well-defined places the design calls out (the benchmark loop
appends to a `BenchmarkRecord`'s vectors, the dispatcher never touches them
concurrently for the same record).
*/

use std::path::PathBuf;
use std::sync::Arc;

/// The unit a measurement's values are reported in.
///
/// Index 0 of a [`ResultsBundle`]'s measurement descriptor list is always
/// wall-clock time (always [`Unit::Seconds`], produced by the process runner
/// itself, no extractor). Every other index is user-defined and requires an
/// extractor command.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Unit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    /// A free-form unit string supplied by the user (e.g. "requests/sec").
    Custom(String),
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Unit::Seconds => write!(f, "s"),
            Unit::Milliseconds => write!(f, "ms"),
            Unit::Microseconds => write!(f, "us"),
            Unit::Nanoseconds => write!(f, "ns"),
            Unit::Custom(s) => write!(f, "{s}"),
        }
    }
}

/// Describes one of the values recorded for every run of every benchmark.
///
/// The descriptor list is fixed for the whole invocation and shared (by
/// reference, never copied) across every command. Index 0 is reserved for
/// wall-clock time and has no extractor.
#[derive(Clone, Debug)]
pub struct MeasurementDescriptor {
    pub name: String,
    /// The shell command line used to extract this measurement's value from
    /// a run's captured stdout. `None` for the wall-clock descriptor at index
    /// 0, and only ever `None` there.
    pub extractor: Option<String>,
    pub unit: Unit,
}

impl MeasurementDescriptor {
    /// The built-in wall-clock descriptor that every results bundle starts
    /// with.
    pub fn wall_clock() -> MeasurementDescriptor {
        MeasurementDescriptor {
            name: "wall_time".to_string(),
            extractor: None,
            unit: Unit::Seconds,
        }
    }
}

/// Where a command's stdin comes from.
#[derive(Clone, Debug, Default)]
pub enum InputPolicy {
    /// Redirected from `/dev/null`.
    #[default]
    Null,
    /// Redirected from the given file.
    File(PathBuf),
}

/// Where a command's stdout/stderr goes, when not being captured for a
/// custom measurement extractor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Redirected to `/dev/null`.
    #[default]
    Null,
    /// Inherited from the harness's own stdout/stderr.
    Inherit,
}

/// A single command to benchmark.
#[derive(Clone, Debug)]
pub struct CommandDescriptor {
    /// The command line as the user wrote it, used for display and (when a
    /// shell is configured) as the literal string passed to `<shell> -c`.
    pub display: String,
    /// The executable, resolved against `PATH`, used only when no shell is
    /// configured.
    pub executable: PathBuf,
    /// The argument vector; `argv[0]` repeats the executable name, matching
    /// normal `execvp` conventions. Used only when no shell is configured.
    pub argv: Vec<String>,
    pub input: InputPolicy,
    pub output: OutputPolicy,
}

/// A parameter sweep: one template, one substituted variable, and the
/// resulting (value, command-index) pairs.
#[derive(Clone, Debug)]
pub struct CommandGroup {
    pub template: String,
    pub variable: String,
    /// Each entry is the literal value substituted for `variable`, paired
    /// with the index of the resulting command in the results bundle's
    /// `benches` vector.
    pub values: Vec<(String, usize)>,
}

/// The growable per-run sample vectors for one benchmark, plus the command
/// (and optional prepare command) that produced them.
///
/// Invariant: after `n` runs, `exit_codes`, `systime`, `usertime` and every
/// vector in `measurements` all have length `n`.
#[derive(Clone, Debug)]
pub struct BenchmarkRecord {
    pub command: Arc<CommandDescriptor>,
    /// A shell command line run between measured runs to reset state (e.g.
    /// drop caches). Never run during warmup.
    pub prepare: Option<String>,
    pub exit_codes: Vec<i32>,
    pub systime: Vec<f64>,
    pub usertime: Vec<f64>,
    /// One vector per shared measurement descriptor; `measurements[0]` is
    /// wall-clock time in seconds.
    pub measurements: Vec<Vec<f64>>,
    /// Set when this benchmark's runs were aborted partway through by an
    /// [`crate::error::EngineError`] (rendered to a string since the runner
    /// catches it per record, not per invocation). The vectors above hold
    /// only whatever runs completed before the failure; no distribution
    /// summary is computed for a record with an error set.
    pub error: Option<String>,
}

impl BenchmarkRecord {
    pub fn new(
        command: Arc<CommandDescriptor>,
        prepare: Option<String>,
        num_measurements: usize,
    ) -> BenchmarkRecord {
        BenchmarkRecord {
            command,
            prepare,
            exit_codes: Vec::new(),
            systime: Vec::new(),
            usertime: Vec::new(),
            measurements: vec![Vec::new(); num_measurements],
            error: None,
        }
    }

    /// The number of measured runs recorded so far.
    pub fn len(&self) -> usize {
        self.exit_codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks the length invariant across every vector. Intended for tests
    /// and for defensive assertions right before analysis.
    pub fn check_invariant(&self) -> bool {
        let n = self.len();
        self.systime.len() == n
            && self.usertime.len() == n
            && self.measurements.iter().all(|m| m.len() == n)
    }
}

/// A statistic's point estimate plus a bootstrap min/max envelope.
///
/// This is *not* a percentile confidence interval: `lower`/`upper` are the
/// minimum and maximum of the statistic across every bootstrap resample, so
/// the envelope widens as the resample count grows. See the statistics kernel
/// module for the rationale.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Estimate {
    pub lower: f64,
    pub point: f64,
    pub upper: f64,
}

impl Estimate {
    /// An estimate with no spread, used for the `n < 2` degenerate case.
    pub fn degenerate(point: f64) -> Estimate {
        Estimate { lower: point, point, upper: point }
    }
}

/// A sorted-quantile snapshot of a sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuantileSnapshot {
    pub min: f64,
    pub p1: f64,
    pub p5: f64,
    pub q1: f64,
    pub q3: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

/// Outlier bucket counts, the fences used to compute them, and the share of
/// standard deviation attributable to outliers.
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct OutlierClassification {
    pub low_severe: usize,
    pub low_mild: usize,
    pub high_mild: usize,
    pub high_severe: usize,
    pub low_severe_fence: f64,
    pub low_mild_fence: f64,
    pub high_mild_fence: f64,
    pub high_severe_fence: f64,
    /// Fraction of `stdev` attributable to outliers, clamped to `[0, 1]`.
    pub variance_fraction: f64,
}

impl OutlierClassification {
    pub fn total(&self) -> usize {
        self.low_severe + self.low_mild + self.high_mild + self.high_severe
    }
}

/// The full distribution summary for one (benchmark, measurement) pair.
#[derive(Clone, Debug)]
pub struct DistributionSummary {
    pub quantiles: QuantileSnapshot,
    pub mean: Estimate,
    pub stdev: Estimate,
    pub outliers: OutlierClassification,
    pub kde: KdeCurve,
}

/// A sampled Gaussian kernel density estimate over a benchmark's samples,
/// plus the density interpolated at the sample mean for annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct KdeCurve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub mean_height: f64,
}

/// One of the fixed complexity curves the fitter chooses among.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ComplexityTag {
    Constant,
    Linear,
    Quadratic,
    Cubic,
    Logarithmic,
    Linearithmic,
}

impl std::fmt::Display for ComplexityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ComplexityTag::Constant => "O(1)",
            ComplexityTag::Linear => "O(n)",
            ComplexityTag::Quadratic => "O(n^2)",
            ComplexityTag::Cubic => "O(n^3)",
            ComplexityTag::Logarithmic => "O(log n)",
            ComplexityTag::Linearithmic => "O(n log n)",
        };
        write!(f, "{s}")
    }
}

/// The result of fitting a group's per-value means against the complexity
/// curve family.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ComplexityFit {
    pub tag: ComplexityTag,
    pub coefficient: f64,
    /// Root-mean-square residual, normalized by the mean of the fitted
    /// values.
    pub normalized_rms: f64,
}

/// The analysis for one (measurement, group) pair.
#[derive(Clone, Debug)]
pub struct GroupAnalysis {
    pub measurement_index: usize,
    pub group_index: usize,
    /// `(value string, mean)` for every member of the group, in the group's
    /// original order.
    pub per_value_mean: Vec<(String, f64)>,
    /// Index into `per_value_mean` of the fastest (smallest mean) entry.
    pub fastest: usize,
    /// Index into `per_value_mean` of the slowest (largest mean) entry.
    pub slowest: usize,
    /// True iff every value string in the group parses as `f64`.
    pub numeric: bool,
    /// Present only when `numeric` is true.
    pub fit: Option<ComplexityFit>,
}

/// A speed comparison between one benchmark and the fastest benchmark for a
/// given measurement.
#[derive(Clone, Copy, Debug)]
pub struct PairwiseComparison {
    pub bench_index: usize,
    pub fastest_index: usize,
    pub ratio: f64,
    pub ratio_stdev: f64,
}

/// Everything produced by a single invocation of the engine: every
/// benchmark's raw samples, their distribution summaries, and the
/// cross-benchmark analyses. Owns all of it; descriptors and groups are only
/// ever referenced from the analyses.
pub struct ResultsBundle {
    pub measurements: Arc<Vec<MeasurementDescriptor>>,
    pub groups: Vec<CommandGroup>,
    pub benches: Vec<BenchmarkRecord>,
    /// `distributions[bench_index][measurement_index]`.
    pub distributions: Vec<Vec<DistributionSummary>>,
    /// `fastest[measurement_index]` is the index of the fastest bench.
    pub fastest: Vec<usize>,
    /// `pairwise[measurement_index][bench_index]`.
    pub pairwise: Vec<Vec<PairwiseComparison>>,
    pub group_analyses: Vec<GroupAnalysis>,
    /// The first per-benchmark error encountered, if any. Set whenever at
    /// least one entry in `benches` has its own `error` set; the affected
    /// benches are excluded from `distributions`, `fastest`, `pairwise` and
    /// `group_analyses`, not just partially represented in them.
    pub error: Option<String>,
}
