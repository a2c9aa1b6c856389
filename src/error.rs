/*!
The typed error taxonomy used at the engine boundary.

Everything below the CLI layer (the process runner, the extractor, the
benchmark loop and the dispatcher) fails with an [`EngineError`]. The CLI
layer (`src/cmd/*.rs`) wraps these in `anyhow::Error` with additional context,
the same way `args::parse` wraps a `FromStr` error with `.context(flag_name)`.
*/

use std::io;

/// An error produced by the measurement engine.
///
/// This is deliberately narrow: it covers only the failure modes that
/// actually arise below the CLI layer (spawning, waiting, and extraction).
/// Anything else (e.g. a bug in the statistics kernel) is a programming error
/// and should panic rather than be threaded through this type; anything
/// caught before a benchmark runs (bad flags, an empty command list) is an
/// `anyhow::Error` raised directly by the CLI layer instead.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The child process could not be spawned at all.
    #[error("failed to spawn command `{command}`: {source}")]
    ChildSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// `wait4` failed, or returned a pid that didn't match the child we just
    /// spawned.
    #[error("failed to wait for command `{command}`: {source}")]
    ChildWait {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The custom measurement extractor exited non-zero, or its stdout did
    /// not begin with a parseable floating-point number.
    #[error("extractor `{extractor}` failed for command `{command}`: {reason}")]
    ExtractorFailure {
        command: String,
        extractor: String,
        reason: String,
    },
}
