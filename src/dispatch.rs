/*!
The Parallel Dispatcher: partitions the benchmark vector into contiguous
ranges and runs each range on its own OS thread, each with its own worker-local
PRNG.
*/

use xorshift::Xorshift32;

use crate::analysis;
use crate::bench_loop;
use crate::config::Config;
use crate::error::EngineError;
use crate::model::{BenchmarkRecord, DistributionSummary, MeasurementDescriptor};

/// Runs every record in `records`, in place, and returns each one's
/// distribution summary per measurement, indexed the same way as `records`.
/// A record whose runs fail gets `record.error` set and an empty entry here
/// in its place; it does not stop the other records in its range or any
/// other worker's range.
///
/// `config.workers` is clamped to `[1, records.len()]`. This only returns
/// `Err` for a worker-spawn failure (the OS couldn't create the thread at
/// all): launching further workers is aborted, but workers already spawned
/// are still joined before the error is returned. A command that fails to
/// run is not a spawn failure in this sense; it's caught per record instead
/// (see `run_range`).
pub fn run_all(
    records: &mut [BenchmarkRecord],
    config: &Config,
    measurements: &[MeasurementDescriptor],
) -> Result<Vec<Vec<DistributionSummary>>, EngineError> {
    let bench_count = records.len();
    if bench_count == 0 {
        return Ok(Vec::new());
    }
    let workers = config.workers.max(1).min(bench_count);

    if workers == 1 {
        return run_range(records, 0, config, measurements);
    }

    let ranges = partition_ranges(bench_count, workers);
    let mut chunks = Vec::with_capacity(workers);
    let mut rest = records;
    for (start, end) in ranges {
        let (chunk, remainder) = rest.split_at_mut(end - start);
        chunks.push(chunk);
        rest = remainder;
    }

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(chunks.len());
        let mut spawn_error = None;
        for (worker_index, chunk) in chunks.into_iter().enumerate() {
            let builder = std::thread::Builder::new().name(format!("bench-worker-{worker_index}"));
            match builder.spawn_scoped(scope, move || {
                run_range(chunk, worker_index, config, measurements)
            }) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    spawn_error = Some(EngineError::ChildSpawn {
                        command: format!("worker thread {worker_index}"),
                        source,
                    });
                    break;
                }
            }
        }

        let mut per_worker_results = Vec::with_capacity(handles.len());
        for handle in handles {
            per_worker_results.push(handle.join().expect("worker thread panicked"));
        }

        if let Some(err) = spawn_error {
            return Err(err);
        }

        let mut distributions = Vec::with_capacity(bench_count);
        for result in per_worker_results {
            distributions.extend(result?);
        }
        Ok(distributions)
    })
}

/// Splits `bench_count` items into `workers` contiguous, equal-width ranges;
/// the last range absorbs any remainder.
fn partition_ranges(bench_count: usize, workers: usize) -> Vec<(usize, usize)> {
    let base = bench_count / workers;
    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let end = if w == workers - 1 { bench_count } else { start + base };
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Seeds a worker's PRNG so that distinct workers never share state.
fn worker_seed(worker_index: usize) -> u32 {
    0x2545_F491u32.wrapping_add((worker_index as u32).wrapping_mul(0x9E37_79B9))
}

/// Runs every record in `chunk`, in place.
///
/// A record whose runs abort with an [`EngineError`] has the error stored on
/// `record.error`, no further runs attempted for it, and an empty entry
/// pushed onto the returned vector in its place; the worker moves on to the
/// next record in its range rather than propagating the error. This never
/// returns `Err`: the per-record catch is the only failure path below the
/// worker-spawn failure handled in `run_all`.
fn run_range(
    chunk: &mut [BenchmarkRecord],
    worker_index: usize,
    config: &Config,
    measurements: &[MeasurementDescriptor],
) -> Result<Vec<Vec<DistributionSummary>>, EngineError> {
    let mut rng = Xorshift32::new(worker_seed(worker_index));
    let mut out = Vec::with_capacity(chunk.len());
    for record in chunk.iter_mut() {
        if let Err(err) = bench_loop::run(record, config, measurements) {
            log::warn!(
                "{}: aborting after {} run(s): {err}",
                record.command.display,
                record.len()
            );
            record.error = Some(err.to_string());
            out.push(Vec::new());
            continue;
        }
        let per_measurement = (0..measurements.len())
            .map(|i| analysis::summarize(&record.measurements[i], config.resamples, &mut rng))
            .collect();
        out.push(per_measurement);
    }
    Ok(out)
}
