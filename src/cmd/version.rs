use std::io::Write;

use lexopt::Arg;

use crate::util;

fn usage() -> String {
    let s = "
Print the version of this benchbar command.

USAGE:
    benchbar version
";
    s.trim().to_string()
}

/// Runs the 'version' sub-command.
pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    while let Some(arg) = p.next()? {
        match arg {
            Arg::Short('h') | Arg::Long("help") => anyhow::bail!("{}", usage()),
            arg => return Err(arg.unexpected().into()),
        }
    }
    let mut wtr = std::io::stdout();
    writeln!(wtr, "{}", util::version())?;
    Ok(())
}
