use std::io::Write;

mod analysis;
mod args;
mod bench_loop;
mod cmd;
mod config;
mod dispatch;
mod error;
mod extractor;
mod model;
mod process;
mod report;
mod stats;
mod util;

const USAGE: &'static str = "\
A command-line microbenchmark harness.

USAGE:
    benchbar <command> ...

COMMANDS:
    run       Run one or more command lines as benchmarks.
    version   Print the version of benchbar and exit.

";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .init();
    if let Err(err) = run(&mut lexopt::Parser::from_env()) {
        if std::env::var("RUST_BACKTRACE").map_or(false, |v| v == "1") {
            writeln!(&mut std::io::stderr(), "{:?}", err).unwrap();
        } else {
            writeln!(&mut std::io::stderr(), "{:#}", err).unwrap();
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let cmd = args::next_as_command(USAGE, p)?;
    match &*cmd {
        "run" => cmd::run::run(p),
        "version" => cmd::version::run(p),
        unk => anyhow::bail!("unrecognized command '{}'", unk),
    }
}
