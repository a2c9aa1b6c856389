/*!
The engine's configuration value.

Parsed once from CLI flags in a per-subcommand `Config::parse` and then
handed around read-only: nothing below the CLI layer mutates a [`Config`]
after construction. Workers only ever read it.
*/

use std::time::Duration;

/// How a command line is invoked.
#[derive(Clone, Debug)]
pub enum Shell {
    /// Tokenize the command line with POSIX-shell-like quoting and `exec` it
    /// directly, with no intervening shell process.
    None,
    /// Invoke `<program> -c <command line>`.
    Command(String),
}

impl Default for Shell {
    fn default() -> Shell {
        if cfg!(windows) {
            Shell::Command("cmd.exe".to_string())
        } else {
            Shell::Command("/bin/sh".to_string())
        }
    }
}

/// The stop policy for the benchmark loop's main phase.
#[derive(Clone, Copy, Debug)]
pub enum StopPolicy {
    /// Run exactly this many measured runs.
    Fixed(u64),
    /// Grow the batch size geometrically until `time_limit` elapses,
    /// bounded by `min_runs`/`max_runs`.
    Adaptive { min_runs: Option<u64>, max_runs: Option<u64> },
}

/// The immutable configuration shared by every worker for the lifetime of
/// one engine invocation.
#[derive(Clone, Debug)]
pub struct Config {
    pub warmup_time: Duration,
    pub time_limit: Duration,
    pub stop_policy: StopPolicy,
    /// A shell command line run between measured runs. Never run during
    /// warmup.
    pub prepare: Option<String>,
    pub resamples: u64,
    pub shell: Shell,
    pub workers: usize,
}

impl Config {
    pub const DEFAULT_RESAMPLES: u64 = 100_000;

    /// A configuration good for quick, adaptive runs with no minimum/maximum
    /// run count and a three second time budget, matching the defaults a
    /// benchmarking CLI would ship with.
    pub fn adaptive_default() -> Config {
        Config {
            warmup_time: Duration::from_secs(0),
            time_limit: Duration::from_secs(3),
            stop_policy: StopPolicy::Adaptive { min_runs: Some(10), max_runs: None },
            prepare: None,
            resamples: Config::DEFAULT_RESAMPLES,
            shell: Shell::default(),
            workers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shell_is_not_none() {
        assert!(matches!(Shell::default(), Shell::Command(_)));
    }

    #[test]
    fn adaptive_default_has_sane_bounds() {
        let cfg = Config::adaptive_default();
        match cfg.stop_policy {
            StopPolicy::Adaptive { min_runs, max_runs } => {
                assert_eq!(min_runs, Some(10));
                assert_eq!(max_runs, None);
            }
            StopPolicy::Fixed(_) => panic!("expected adaptive stop policy"),
        }
    }
}
