use std::{
    fmt::{Debug, Display, Write},
    str::FromStr,
};

use {
    anyhow::Context,
    lexopt::{Arg, Parser, ValueExt},
};

/// Parses the argument from the given parser as a command name, and returns
/// it. If the next arg isn't a simple value, then this returns an error.
///
/// This also handles the case where -h/--help is given, in which case, the
/// given usage information is converted into an error and printed.
pub fn next_as_command(usage: &str, p: &mut Parser) -> anyhow::Result<String> {
    let usage = usage.trim();
    let arg = match p.next()? {
        Some(arg) => arg,
        None => anyhow::bail!("{}", usage),
    };
    let cmd = match arg {
        Arg::Value(cmd) => cmd.string()?,
        Arg::Short('h') | Arg::Long("help") => anyhow::bail!("{}", usage),
        arg => return Err(arg.unexpected().into()),
    };
    Ok(cmd)
}

/// Parses the next `p.value()` into `T`. Any error messages will include the
/// given flag name in them.
pub fn parse<T>(p: &mut Parser, flag_name: &'static str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display + Debug + Send + Sync + 'static,
{
    let osv = p.value().context(flag_name)?;
    let strv = match osv.to_str() {
        Some(strv) => strv,
        None => {
            let err = lexopt::Error::NonUnicodeValue(osv.into());
            return Err(anyhow::Error::from(err).context(flag_name));
        }
    };
    let parsed = match strv.parse() {
        Err(err) => return Err(anyhow::Error::msg(err)),
        Ok(parsed) => parsed,
    };
    Ok(parsed)
}

/// This defines a flag for controlling the use of color in the output.
#[derive(Clone, Copy, Debug)]
pub enum Color {
    /// Color is only enabled when the output is a tty.
    Auto,
    /// Color is always enabled.
    Always,
    /// Color is disabled.
    Never,
}

impl Color {
    pub const USAGE: Usage = Usage::new(
        "--color <mode>",
        "One of: auto, always, never.",
        r#"
Whether to use color (default: auto).

When enabled, a modest amount of color is used to help make the console
summary easier to scan: the fastest benchmark per measurement is highlighted.
The choices are: auto, always, never.
"#,
    );

    /// Return a possibly colorized stdout.
    pub fn stdout(&self) -> Box<dyn termcolor::WriteColor> {
        use termcolor::{Ansi, NoColor};

        if self.should_color() {
            Box::new(Ansi::new(std::io::stdout()))
        } else {
            Box::new(NoColor::new(std::io::stdout()))
        }
    }

    /// Return a possibly colorized stdout, just like `stdout`, except the
    /// output supports elastic tabstops.
    pub fn elastic_stdout(&self) -> Box<dyn termcolor::WriteColor> {
        use {
            tabwriter::TabWriter,
            termcolor::{Ansi, NoColor},
        };

        if self.should_color() {
            Box::new(Ansi::new(TabWriter::new(std::io::stdout())))
        } else {
            Box::new(NoColor::new(TabWriter::new(std::io::stdout())))
        }
    }

    /// Return true if colors should be used. When the color choice is
    /// `auto`, this only returns true if stdout is a tty.
    pub fn should_color(&self) -> bool {
        match *self {
            Color::Auto => atty::is(atty::Stream::Stdout),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

impl Default for Color {
    fn default() -> Color {
        Color::Auto
    }
}

impl std::str::FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Color> {
        let color = match s {
            "auto" => Color::Auto,
            "always" => Color::Always,
            "never" => Color::Never,
            unknown => {
                anyhow::bail!(
                    "unrecognized color config '{}', must be \
                     one of auto, always or never.",
                    unknown,
                )
            }
        };
        Ok(color)
    }
}

/// A type for expressing the documentation of a flag.
///
/// The `Usage::short` and `Usage::long` functions take a slice of usages and
/// format them into a human readable display. It does simple word wrapping
/// and column alignment for you.
#[derive(Clone, Debug)]
pub struct Usage {
    /// The format of the flag, for example, `-w, --warmup <seconds>`.
    pub format: &'static str,
    /// A very short description of the flag. Should fit on one line along
    /// with the format.
    pub short: &'static str,
    /// A longer form description of the flag. May be multiple paragraphs
    /// long (but doesn't have to be).
    pub long: &'static str,
}

impl Usage {
    pub const WARMUP: Usage = Usage::new(
        "--warmup <seconds>",
        "Warmup time budget, in seconds (default: 0).",
        r#"
The approximate amount of time to spend warming up each benchmark before
measured runs begin.

Warmup runs execute the command exactly like a measured run, but their
results are discarded. The prepare command, if any, is never invoked during
warmup.
"#,
    );

    pub const TIME_LIMIT: Usage = Usage::new(
        "--time-limit <seconds>",
        "Time budget for the main loop, in seconds (default: 3).",
        r#"
In adaptive mode, the approximate wall-clock budget for a single benchmark's
measured runs. Once this elapses and --min-runs (if set) has been satisfied,
the benchmark stops.

Has no effect in fixed mode (when --runs is given).
"#,
    );

    pub const RUNS: Usage = Usage::new(
        "--runs <count>",
        "Run exactly this many times instead of adapting.",
        r#"
Runs the command exactly this many times instead of growing the batch size
adaptively until --time-limit elapses. When given, --min-runs and --max-runs
have no effect.
"#,
    );

    pub const MIN_RUNS: Usage = Usage::new(
        "--min-runs <count>",
        "Never stop before this many runs (adaptive mode).",
        r#"
In adaptive mode, the benchmark never stops before this many measured runs
have completed, even if --time-limit has already elapsed.
"#,
    );

    pub const MAX_RUNS: Usage = Usage::new(
        "--max-runs <count>",
        "Never exceed this many runs (adaptive mode).",
        r#"
In adaptive mode, the benchmark stops once this many measured runs have
completed, even if --time-limit has not yet elapsed.
"#,
    );

    pub const PREPARE: Usage = Usage::new(
        "--prepare <command>",
        "Run this shell command between measured runs.",
        r#"
A shell command line run between every measured run (never during warmup),
with its stdio redirected to /dev/null. Useful for resetting state the
benchmarked command depends on, such as dropping caches or recreating
fixtures. Must exit cleanly; a non-zero exit aborts the benchmark.
"#,
    );

    pub const RESAMPLES: Usage = Usage::new(
        "--resamples <count>",
        "Bootstrap resample count (default: 100000).",
        r#"
The number of bootstrap resamples used to compute the lower/upper bounds on
mean and standard deviation. Larger values produce a wider min/max envelope,
not a narrower one; this is a min/max envelope across every resample, not a
percentile confidence interval.
"#,
    );

    pub const SHELL: Usage = Usage::new(
        "--shell <command|none>",
        "Shell used to invoke each command line (default: platform shell).",
        r#"
The shell used to run each benchmarked command line, invoked as
'<shell> -c <command line>'. Pass 'none' to tokenize the command line with
POSIX-shell-like quoting and exec it directly, with no intervening shell.
"#,
    );

    pub const INPUT: Usage = Usage::new(
        "--input <path|null>",
        "File to redirect each command's stdin from (default: null).",
        r#"
The file whose contents are redirected to each benchmarked command's stdin.
Defaults to /dev/null.
"#,
    );

    pub const OUTPUT: Usage = Usage::new(
        "--output <null|inherit>",
        "What to do with each command's stdout/stderr (default: null).",
        r#"
Whether each benchmarked command's stdout and stderr are discarded or
inherited from this process. Has no effect on a measurement that requires
capturing stdout for a custom extractor: that measurement always captures
stdout regardless of this setting.
"#,
    );

    pub const WORKERS: Usage = Usage::new(
        "--workers <count>",
        "Number of OS threads to run benchmarks concurrently with (default: 1).",
        r#"
The number of benchmarks to run concurrently, each on its own OS thread. The
benchmark vector is split into this many contiguous ranges; each worker runs
its range sequentially. Clamped to the number of benchmarks given.
"#,
    );

    pub const PARAMETER_LIST: Usage = Usage::new(
        "--parameter-list <name> <v1,v2,...>",
        "Expand a command template over a comma-separated value list.",
        r#"
Expands a command-line template containing '{name}' into one command per
value in the comma-separated list, substituting the literal value string for
every occurrence of '{name}'. May be given multiple times for multiple
command templates.
"#,
    );

    pub const MEASURE: Usage = Usage::new(
        "--measure <name>:<unit>:<command>",
        "Extract an additional measurement from each run's captured stdout.",
        r#"
Adds a custom measurement beyond wall-clock time. '<command>' is run as a
shell command with the benchmarked command's captured stdout piped to its
stdin; its own stdout must begin with a floating-point number, which becomes
the measured value. '<unit>' is a free-form label shown in the console
summary and JSON export (for example 'ms', 'MB', 'requests'). May be given
multiple times to record more than one custom measurement.
"#,
    );

    pub const EXPORT_JSON: Usage = Usage::new(
        "--export-json <path>",
        "Write the full results bundle to this path as JSON.",
        r#"
Writes every benchmark's raw per-run samples (not just the console summary)
to the given path as JSON, matching the wire format documented in the crate's
design notes.
"#,
    );

    /// Create a new usage from the given components.
    pub const fn new(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { format, short, long }
    }

    /// Format a two column table from the given usages, where the first
    /// column is the format and the second column is the short description.
    pub fn short(usages: &[Usage]) -> String {
        const MIN_SPACE: usize = 2;

        let mut result = String::new();
        let max_len = match usages.iter().map(|u| u.format.len()).max() {
            None => return result,
            Some(len) => len,
        };
        for usage in usages.iter() {
            let padlen = MIN_SPACE + (max_len - usage.format.len());
            let padding = " ".repeat(padlen);
            writeln!(result, "    {}{}{}", usage.format, padding, usage.short)
                .unwrap();
        }
        result
    }

    /// Print the format of each usage and its long description below the
    /// format. This also does appropriate indentation with the assumption
    /// that it is in an OPTIONS section of a bigger usage message.
    pub fn long(usages: &[Usage]) -> String {
        let wrap_opts = textwrap::Options::new(79)
            .initial_indent("        ")
            .subsequent_indent("        ");
        let mut result = String::new();
        for (i, usage) in usages.iter().enumerate() {
            if i > 0 {
                writeln!(result, "").unwrap();
            }
            writeln!(result, "    {}", usage.format).unwrap();
            for (i, paragraph) in usage.long.trim().split("\n\n").enumerate() {
                if i > 0 {
                    result.push('\n');
                }
                let flattened = paragraph.replace("\n", " ");
                for line in textwrap::wrap(&flattened, &wrap_opts) {
                    result.push_str(&line);
                    result.push('\n');
                }
            }
        }
        result
    }
}
