/// The benchbar Cargo package version. This environment variable is
/// guaranteed to be made available by Cargo.
pub const BENCHBAR_VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// The commit revision hash that benchbar was built from. This environment
/// variable is set by a custom build script, and is only available when
/// `git` is available.
pub const BENCHBAR_REVISION: Option<&'static str> = option_env!("BENCHBAR_REVISION");

/// Returns a complete version string for `benchbar`.
///
/// If `git` was available while building `benchbar`, then this includes the
/// revision hash.
pub fn version() -> String {
    let mut s = BENCHBAR_VERSION.to_string();
    if let Some(rev) = BENCHBAR_REVISION {
        s.push_str(&format!(" (rev {})", rev));
    }
    s
}

/// Colorize the given writer in a "label" style.
pub fn colorize_label<W: termcolor::WriteColor>(
    mut wtr: W,
    mut with: impl FnMut(&mut W) -> std::io::Result<()>,
) -> anyhow::Result<()> {
    let mut spec = termcolor::ColorSpec::new();
    spec.set_bold(true);
    wtr.set_color(&spec)?;
    with(&mut wtr)?;
    wtr.reset()?;
    Ok(())
}
