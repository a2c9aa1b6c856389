/*!
The 'run' sub-command: the primary entry point. Parses command-line
templates and flags into a [`Config`], expands `--parameter-list` sweeps,
dispatches the benchmarks, prints the console summary and (optionally)
writes the JSON export.
*/

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lexopt::Arg;

use crate::analysis;
use crate::args::{self, Color, Usage};
use crate::config::{Config, Shell, StopPolicy};
use crate::dispatch;
use crate::model::{
    CommandDescriptor, CommandGroup, InputPolicy, MeasurementDescriptor, OutputPolicy,
    ResultsBundle, Unit,
};
use crate::report::{console, export};

const USAGES: &[Usage] = &[
    Usage::WARMUP,
    Usage::TIME_LIMIT,
    Usage::RUNS,
    Usage::MIN_RUNS,
    Usage::MAX_RUNS,
    Usage::PREPARE,
    Usage::RESAMPLES,
    Usage::SHELL,
    Usage::INPUT,
    Usage::OUTPUT,
    Usage::WORKERS,
    Usage::PARAMETER_LIST,
    Usage::MEASURE,
    Usage::EXPORT_JSON,
    Color::USAGE,
];

fn usage_short() -> String {
    format!(
        "Run one or more command lines as benchmarks.\n\n\
         USAGE:\n    benchbar run [OPTIONS] -- <command>...\n\n\
         OPTIONS:\n{}",
        Usage::short(USAGES)
    )
}

fn usage_long() -> String {
    format!(
        "Run one or more command lines as benchmarks.\n\n\
         USAGE:\n    benchbar run [OPTIONS] -- <command>...\n\n\
         Each <command> is a single shell command line, given as one \
         argument (quote it so your own shell doesn't split it). A command \
         may contain '{{name}}' placeholders filled in by --parameter-list.\n\n\
         OPTIONS:\n{}",
        Usage::long(USAGES)
    )
}

/// Tokenizes a command line with POSIX-shell-like single/double quoting.
/// This is the "glue" tokenizer named out of scope for deep engineering:
/// it understands quoting and backslash escapes, nothing fancier.
fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' if !in_token => continue,
            ' ' | '\t' => {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
            '\'' => {
                in_token = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_token = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                            current.push(chars.next().unwrap());
                        }
                        c => current.push(c),
                    }
                }
            }
            '\\' => {
                in_token = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

fn command_descriptor(
    display: String,
    input: InputPolicy,
    output: OutputPolicy,
) -> CommandDescriptor {
    let argv = tokenize(&display);
    let executable = PathBuf::from(argv.first().cloned().unwrap_or_default());
    CommandDescriptor { display, executable, argv, input, output }
}

fn parse_measurement(spec: &str) -> anyhow::Result<MeasurementDescriptor> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().filter(|s| !s.is_empty());
    let unit = parts.next().filter(|s| !s.is_empty());
    let command = parts.next().filter(|s| !s.is_empty());
    let (name, unit, command) = match (name, unit, command) {
        (Some(n), Some(u), Some(c)) => (n, u, c),
        _ => anyhow::bail!(
            "--measure expects '<name>:<unit>:<command>', got '{}'",
            spec
        ),
    };
    let unit = match unit {
        "s" => Unit::Seconds,
        "ms" => Unit::Milliseconds,
        "us" => Unit::Microseconds,
        "ns" => Unit::Nanoseconds,
        other => Unit::Custom(other.to_string()),
    };
    Ok(MeasurementDescriptor {
        name: name.to_string(),
        extractor: Some(command.to_string()),
        unit,
    })
}

/// Expands `{name}` in `template` for every value of a matching
/// `--parameter-list` definition. Returns `None` if no definition's name
/// appears in the template, in which case the template is a standalone
/// command with no group.
fn expand_template<'a>(
    template: &str,
    param_lists: &'a [(String, Vec<String>)],
) -> Option<(&'a str, &'a [String])> {
    param_lists
        .iter()
        .find(|(name, _)| template.contains(&format!("{{{name}}}")))
        .map(|(name, values)| (name.as_str(), values.as_slice()))
}

struct Expanded {
    commands: Vec<CommandDescriptor>,
    groups: Vec<CommandGroup>,
}

fn expand_templates(
    templates: &[String],
    param_lists: &[(String, Vec<String>)],
    input: &InputPolicy,
    output: OutputPolicy,
) -> Expanded {
    let mut commands = Vec::new();
    let mut groups = Vec::new();
    for template in templates {
        match expand_template(template, param_lists) {
            None => {
                commands.push(command_descriptor(template.clone(), input.clone(), output));
            }
            Some((name, values)) => {
                let placeholder = format!("{{{name}}}");
                let mut group_values = Vec::with_capacity(values.len());
                for value in values {
                    let display = template.replace(&placeholder, value);
                    let index = commands.len();
                    commands.push(command_descriptor(display, input.clone(), output));
                    group_values.push((value.clone(), index));
                }
                groups.push(CommandGroup {
                    template: template.clone(),
                    variable: name.to_string(),
                    values: group_values,
                });
            }
        }
    }
    Expanded { commands, groups }
}

fn parse_seconds(p: &mut lexopt::Parser, flag_name: &'static str) -> anyhow::Result<Duration> {
    let secs: f64 = args::parse(p, flag_name)?;
    anyhow::ensure!(secs >= 0.0, "{}: must be non-negative, got {}", flag_name, secs);
    Ok(Duration::from_secs_f64(secs))
}

#[derive(Default)]
struct RawArgs {
    templates: Vec<String>,
    warmup: Option<Duration>,
    time_limit: Option<Duration>,
    runs: Option<u64>,
    min_runs: Option<u64>,
    max_runs: Option<u64>,
    prepare: Option<String>,
    resamples: Option<u64>,
    shell: Option<Shell>,
    input: Option<InputPolicy>,
    output: Option<OutputPolicy>,
    workers: Option<usize>,
    param_lists: Vec<(String, Vec<String>)>,
    measurements: Vec<MeasurementDescriptor>,
    export_json: Option<PathBuf>,
    color: Color,
}

fn parse_args(p: &mut lexopt::Parser) -> anyhow::Result<RawArgs> {
    let mut a = RawArgs::default();
    while let Some(arg) = p.next()? {
        match arg {
            Arg::Short('h') => anyhow::bail!("{}", usage_short()),
            Arg::Long("help") => anyhow::bail!("{}", usage_long()),
            Arg::Long("warmup") => {
                a.warmup = Some(parse_seconds(p, "--warmup")?);
            }
            Arg::Long("time-limit") => {
                a.time_limit = Some(parse_seconds(p, "--time-limit")?);
            }
            Arg::Long("runs") => {
                a.runs = Some(args::parse(p, "--runs")?);
            }
            Arg::Long("min-runs") => {
                a.min_runs = Some(args::parse(p, "--min-runs")?);
            }
            Arg::Long("max-runs") => {
                a.max_runs = Some(args::parse(p, "--max-runs")?);
            }
            Arg::Long("prepare") => {
                a.prepare = Some(p.value().context("--prepare")?.string()?);
            }
            Arg::Long("resamples") => {
                a.resamples = Some(args::parse(p, "--resamples")?);
            }
            Arg::Long("shell") => {
                let v = p.value().context("--shell")?.string()?;
                a.shell = Some(if v == "none" { Shell::None } else { Shell::Command(v) });
            }
            Arg::Long("input") => {
                let v = p.value().context("--input")?.string()?;
                a.input = Some(if v == "null" {
                    InputPolicy::Null
                } else {
                    InputPolicy::File(PathBuf::from(v))
                });
            }
            Arg::Long("output") => {
                let v = p.value().context("--output")?.string()?;
                a.output = Some(match v.as_str() {
                    "null" => OutputPolicy::Null,
                    "inherit" => OutputPolicy::Inherit,
                    _ => anyhow::bail!(
                        "--output: expected 'null' or 'inherit', got '{}'",
                        v
                    ),
                });
            }
            Arg::Long("workers") => {
                a.workers = Some(args::parse(p, "--workers")?);
            }
            Arg::Long("parameter-list") => {
                let name = p.value().context("--parameter-list")?.string()?;
                let list = p.value().context("--parameter-list")?.string()?;
                let values = list.split(',').map(|s| s.to_string()).collect();
                a.param_lists.push((name, values));
            }
            Arg::Long("measure") => {
                let spec = p.value().context("--measure")?.string()?;
                a.measurements.push(parse_measurement(&spec)?);
            }
            Arg::Long("export-json") => {
                a.export_json = Some(PathBuf::from(p.value().context("--export-json")?));
            }
            Arg::Long("color") => {
                a.color = args::parse(p, "--color")?;
            }
            Arg::Value(v) => {
                a.templates.push(v.string()?);
            }
            arg => return Err(arg.unexpected().into()),
        }
    }
    Ok(a)
}

fn build_config(a: &RawArgs) -> Config {
    let mut c = Config::adaptive_default();
    if let Some(warmup) = a.warmup {
        c.warmup_time = warmup;
    }
    if let Some(time_limit) = a.time_limit {
        c.time_limit = time_limit;
    }
    c.stop_policy = match a.runs {
        Some(count) => StopPolicy::Fixed(count),
        None => StopPolicy::Adaptive {
            min_runs: Some(a.min_runs.unwrap_or(10)),
            max_runs: a.max_runs,
        },
    };
    c.prepare = a.prepare.clone();
    if let Some(resamples) = a.resamples {
        c.resamples = resamples;
    }
    if let Some(ref shell) = a.shell {
        c.shell = shell.clone();
    }
    if let Some(workers) = a.workers {
        c.workers = workers;
    }
    c
}

/// Runs the 'run' sub-command.
pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let a = parse_args(p)?;
    anyhow::ensure!(!a.templates.is_empty(), "no command given; see --help");

    let config = build_config(&a);
    let input = a.input.clone().unwrap_or_default();
    let output = a.output.unwrap_or_default();

    let mut measurements = vec![MeasurementDescriptor::wall_clock()];
    measurements.extend(a.measurements.iter().cloned());

    let Expanded { commands, groups } =
        expand_templates(&a.templates, &a.param_lists, &input, output);
    let display_names: Vec<String> = commands.iter().map(|c| c.display.clone()).collect();

    let mut records: Vec<_> = commands
        .into_iter()
        .map(|cmd| {
            crate::model::BenchmarkRecord::new(
                Arc::new(cmd),
                config.prepare.clone(),
                measurements.len(),
            )
        })
        .collect();

    log::info!("running {} benchmark(s) across {} worker(s)", records.len(), config.workers);
    let distributions = dispatch::run_all(&mut records, &config, &measurements)
        .map_err(anyhow::Error::from)
        .context("benchmark run failed")?;
    let first_error = records.iter().find_map(|r| r.error.clone());

    let fastest = analysis::fastest_per_measurement(&distributions);

    let mut group_analyses = Vec::new();
    for (group_index, group) in groups.iter().enumerate() {
        for measurement_index in 0..measurements.len() {
            group_analyses.push(analysis::analyze_group(
                group,
                group_index,
                measurement_index,
                &distributions,
            ));
        }
    }

    let mut pairwise = Vec::with_capacity(measurements.len());
    for (measurement_index, &fastest_index) in fastest.iter().enumerate() {
        pairwise.push(analysis::pairwise_for_measurement(
            measurement_index,
            fastest_index,
            &distributions,
        ));
    }

    let bundle = ResultsBundle {
        measurements: Arc::new(measurements),
        groups,
        benches: records,
        distributions,
        fastest,
        pairwise,
        group_analyses,
        error: first_error,
    };

    console::print_summary(
        a.color,
        &bundle.measurements,
        &display_names,
        &bundle.distributions,
        &bundle.fastest,
    )?;
    if bundle.benches.len() > 1 {
        console::print_pairwise(a.color, &bundle.measurements, &display_names, &bundle.pairwise)?;
    }
    if !bundle.group_analyses.is_empty() {
        console::print_groups(a.color, &bundle.measurements, &bundle.group_analyses)?;
    }
    console::print_failures(a.color, &display_names, &bundle.benches)?;

    if let Some(path) = a.export_json {
        let export_bundle =
            export::build(&config, &bundle.measurements, &bundle.distributions, &bundle.benches);
        export::write_to_path(&path, &export_bundle)?;
        log::info!("wrote JSON export to '{}'", path.display());
    }

    anyhow::ensure!(
        bundle.error.is_none(),
        "{} benchmark(s) failed; first failure: {}",
        bundle.benches.iter().filter(|b| b.error.is_some()).count(),
        bundle.error.as_deref().unwrap_or_default()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_plain_whitespace() {
        assert_eq!(tokenize("sleep 0.1"), vec!["sleep", "0.1"]);
    }

    #[test]
    fn tokenize_respects_single_quotes() {
        assert_eq!(
            tokenize("echo 'hello world'"),
            vec!["echo", "hello world"]
        );
    }

    #[test]
    fn tokenize_respects_double_quotes_with_escapes() {
        assert_eq!(
            tokenize(r#"echo "a \"b\" c""#),
            vec!["echo", "a \"b\" c"]
        );
    }

    #[test]
    fn expand_template_matches_by_placeholder_name() {
        let lists = vec![("n".to_string(), vec!["1".to_string(), "2".to_string()])];
        let found = expand_template("sleep {n}", &lists);
        assert!(found.is_some());
        let (name, values) = found.unwrap();
        assert_eq!(name, "n");
        assert_eq!(values, &["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn expand_template_returns_none_without_a_placeholder() {
        let lists = vec![("n".to_string(), vec!["1".to_string()])];
        assert!(expand_template("sleep 1", &lists).is_none());
    }

    #[test]
    fn expand_templates_builds_a_group_per_matching_template() {
        let templates = vec!["sleep {n}".to_string()];
        let lists = vec![("n".to_string(), vec!["0.01".to_string(), "0.02".to_string()])];
        let expanded = expand_templates(&templates, &lists, &InputPolicy::Null, OutputPolicy::Null);
        assert_eq!(expanded.commands.len(), 2);
        assert_eq!(expanded.groups.len(), 1);
        assert_eq!(expanded.groups[0].variable, "n");
        assert_eq!(expanded.commands[0].display, "sleep 0.01");
        assert_eq!(expanded.commands[1].display, "sleep 0.02");
    }

    #[test]
    fn expand_templates_leaves_unparameterized_commands_ungrouped() {
        let templates = vec!["true".to_string(), "false".to_string()];
        let expanded = expand_templates(&templates, &[], &InputPolicy::Null, OutputPolicy::Null);
        assert_eq!(expanded.commands.len(), 2);
        assert!(expanded.groups.is_empty());
    }

    #[test]
    fn parse_measurement_splits_name_unit_command() {
        let m = parse_measurement("throughput:req/s:cat").unwrap();
        assert_eq!(m.name, "throughput");
        assert_eq!(m.extractor.as_deref(), Some("cat"));
        assert_eq!(m.unit, Unit::Custom("req/s".to_string()));
    }

    #[test]
    fn parse_measurement_recognizes_builtin_units() {
        let m = parse_measurement("latency:ms:cat").unwrap();
        assert_eq!(m.unit, Unit::Milliseconds);
    }

    #[test]
    fn parse_measurement_rejects_missing_parts() {
        assert!(parse_measurement("latency:ms").is_err());
    }
}
