/*!
The Benchmark Loop: warmup, then either a fixed number of measured runs or an
adaptive batch-growth loop, populating a [`BenchmarkRecord`] in place.
*/

use std::io;
use std::process::Stdio;
use std::time::Instant;

use crate::config::Config;
use crate::error::EngineError;
use crate::model::{BenchmarkRecord, MeasurementDescriptor};
use crate::{extractor, process};

/// Runs `record`'s command through warmup and then its configured stop
/// policy, appending every measured run's samples to `record`'s vectors.
pub fn run(
    record: &mut BenchmarkRecord,
    config: &Config,
    measurements: &[MeasurementDescriptor],
) -> Result<(), EngineError> {
    warmup(record, config)?;
    match config.stop_policy {
        crate::config::StopPolicy::Fixed(count) => run_fixed(record, config, measurements, count),
        crate::config::StopPolicy::Adaptive { min_runs, max_runs } => {
            run_adaptive(record, config, measurements, min_runs, max_runs)
        }
    }
}

fn warmup(record: &BenchmarkRecord, config: &Config) -> Result<(), EngineError> {
    if config.warmup_time.is_zero() {
        return Ok(());
    }
    log::debug!("warming up: {}", record.command.display);
    let start = Instant::now();
    while start.elapsed() < config.warmup_time {
        // Warmup never invokes prepare and never captures stdout; its
        // results are discarded by construction.
        process::run(&record.command, &config.shell, false)?;
    }
    Ok(())
}

fn run_fixed(
    record: &mut BenchmarkRecord,
    config: &Config,
    measurements: &[MeasurementDescriptor],
    count: u64,
) -> Result<(), EngineError> {
    for _ in 0..count {
        one_iteration(record, config, measurements)?;
    }
    Ok(())
}

fn run_adaptive(
    record: &mut BenchmarkRecord,
    config: &Config,
    measurements: &[MeasurementDescriptor],
    min_runs: Option<u64>,
    max_runs: Option<u64>,
) -> Result<(), EngineError> {
    let start = Instant::now();
    let mut accumulator: f64 = 1.0;
    let mut batch_size: u64 = 1;

    loop {
        for _ in 0..batch_size {
            one_iteration(record, config, measurements)?;
        }

        let total_runs = record.len() as u64;
        let min_satisfied = min_runs.map_or(true, |m| total_runs >= m);
        let time_up = start.elapsed() >= config.time_limit;
        let max_reached = max_runs.map_or(false, |m| total_runs >= m);
        if min_satisfied && (time_up || max_reached) {
            break;
        }

        let previous_batch = batch_size;
        loop {
            accumulator *= 1.05;
            if accumulator.floor() as u64 != previous_batch {
                break;
            }
        }
        batch_size = accumulator.floor() as u64;
        log::info!(
            "{}: growing adaptive batch size to {batch_size} ({total_runs} runs so far)",
            record.command.display
        );
    }
    Ok(())
}

/// Runs one measured iteration: the command itself, any custom extractors it
/// needs, and then (if configured) the prepare command.
fn one_iteration(
    record: &mut BenchmarkRecord,
    config: &Config,
    measurements: &[MeasurementDescriptor],
) -> Result<(), EngineError> {
    measured_run(record, config, measurements)?;
    if let Some(prepare) = record.prepare.clone() {
        run_prepare(&prepare)?;
    }
    Ok(())
}

/// Runs the command once and, on success, appends its samples. An extractor
/// failure discards this run (nothing is appended) without aborting the
/// benchmark; a process-level failure propagates and aborts it.
fn measured_run(
    record: &mut BenchmarkRecord,
    config: &Config,
    measurements: &[MeasurementDescriptor],
) -> Result<(), EngineError> {
    let needs_capture = measurements.len() > 1;
    log::debug!("running: {}", record.command.display);
    let outcome = process::run(&record.command, &config.shell, needs_capture)?;

    let mut custom_values = Vec::with_capacity(measurements.len().saturating_sub(1));
    if needs_capture {
        let captured = outcome
            .captured_stdout
            .as_ref()
            .expect("needs_capture implies captured_stdout is Some");
        for descriptor in &measurements[1..] {
            let extractor_cmd = descriptor
                .extractor
                .as_deref()
                .expect("non-wall-clock descriptors always carry an extractor");
            match extractor::extract(captured, extractor_cmd, &record.command.display) {
                Ok(value) => custom_values.push(value),
                Err(err) => {
                    log::warn!(
                        "discarding run of {}: {err}",
                        record.command.display
                    );
                    return Ok(());
                }
            }
        }
    }

    record.exit_codes.push(outcome.exit_code);
    record.systime.push(outcome.sys_seconds);
    record.usertime.push(outcome.user_seconds);
    record.measurements[0].push(outcome.wall_seconds);
    for (slot, value) in record.measurements[1..].iter_mut().zip(custom_values) {
        slot.push(value);
    }
    Ok(())
}

fn run_prepare(prepare: &str) -> Result<(), EngineError> {
    log::debug!("running prepare: {prepare}");
    let shell_path = if cfg!(windows) { "cmd.exe" } else { "/bin/sh" };
    let flag = if cfg!(windows) { "/C" } else { "-c" };
    let mut cmd = std::process::Command::new(shell_path);
    cmd.arg(flag)
        .arg(prepare)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = cmd.spawn().map_err(|source| EngineError::ChildSpawn {
        command: prepare.to_string(),
        source,
    })?;
    let status = child.wait().map_err(|source| EngineError::ChildWait {
        command: prepare.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(EngineError::ChildWait {
            command: prepare.to_string(),
            source: io::Error::new(
                io::ErrorKind::Other,
                format!("prepare command exited with {status}"),
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Shell, StopPolicy};
    use crate::model::{CommandDescriptor, InputPolicy, OutputPolicy, Unit};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn shell_command(display: &str) -> Arc<CommandDescriptor> {
        Arc::new(CommandDescriptor {
            display: display.to_string(),
            executable: PathBuf::from("/bin/sh"),
            argv: vec![],
            input: InputPolicy::Null,
            output: OutputPolicy::Null,
        })
    }

    fn base_config() -> Config {
        Config {
            warmup_time: Duration::from_secs(0),
            time_limit: Duration::from_secs(1),
            stop_policy: StopPolicy::Fixed(5),
            prepare: None,
            resamples: 100,
            shell: Shell::Command("/bin/sh".to_string()),
            workers: 1,
        }
    }

    #[test]
    fn fixed_mode_runs_exactly_the_configured_count() {
        let command = shell_command("true");
        let mut record = BenchmarkRecord::new(command, None, 1);
        let config = base_config();
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        run(&mut record, &config, &measurements).unwrap();
        assert_eq!(record.len(), 5);
        assert!(record.check_invariant());
    }

    #[test]
    fn adaptive_mode_respects_min_runs() {
        let command = shell_command("true");
        let mut record = BenchmarkRecord::new(command, None, 1);
        let mut config = base_config();
        config.time_limit = Duration::from_millis(1);
        config.stop_policy =
            crate::config::StopPolicy::Adaptive { min_runs: Some(8), max_runs: None };
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        run(&mut record, &config, &measurements).unwrap();
        assert!(record.len() >= 8);
        assert!(record.check_invariant());
    }

    #[test]
    fn adaptive_mode_honors_max_runs() {
        let command = shell_command("true");
        let mut record = BenchmarkRecord::new(command, None, 1);
        let mut config = base_config();
        config.time_limit = Duration::from_secs(30);
        config.stop_policy =
            crate::config::StopPolicy::Adaptive { min_runs: Some(1), max_runs: Some(3) };
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        run(&mut record, &config, &measurements).unwrap();
        assert!(record.len() >= 3);
        assert!(record.check_invariant());
    }

    #[test]
    fn exit_codes_are_recorded_for_every_run() {
        let command = shell_command("exit 3");
        let mut record = BenchmarkRecord::new(command, None, 1);
        let config = base_config();
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        run(&mut record, &config, &measurements).unwrap();
        assert!(record.exit_codes.iter().all(|&c| c == 3));
    }

    #[test]
    fn custom_measurement_is_extracted_for_every_run() {
        let command = shell_command("printf 42.5");
        let mut record = BenchmarkRecord::new(command, None, 2);
        let config = base_config();
        let measurements = vec![
            MeasurementDescriptor::wall_clock(),
            MeasurementDescriptor {
                name: "value".to_string(),
                extractor: Some("cat".to_string()),
                unit: Unit::Custom("units".to_string()),
            },
        ];
        run(&mut record, &config, &measurements).unwrap();
        assert!(record.measurements[1].iter().all(|&v| v == 42.5));
        assert_eq!(record.measurements[1].len(), record.len());
    }

    #[test]
    fn prepare_runs_between_measured_runs() {
        let command = shell_command("true");
        let mut record = BenchmarkRecord::new(command, Some("true".to_string()), 1);
        let config = base_config();
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        run(&mut record, &config, &measurements).unwrap();
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn failing_prepare_aborts_the_benchmark() {
        let command = shell_command("true");
        let mut record = BenchmarkRecord::new(command, Some("exit 1".to_string()), 1);
        let config = base_config();
        let measurements = vec![MeasurementDescriptor::wall_clock()];
        let err = run(&mut record, &config, &measurements).unwrap_err();
        assert!(matches!(err, EngineError::ChildWait { .. }));
    }
}
