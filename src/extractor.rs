/*!
The Custom Measurement Extractor: pipes a captured run's stdout through a
user-supplied extractor command and parses a floating-point scalar from the
extractor's own stdout.
*/

use std::fs::File;
use std::io::{Read, Seek};
use std::process::Stdio;

use crate::error::EngineError;

const MAX_EXTRACTOR_OUTPUT: usize = 4096;

/// Runs `extractor` (always via a shell, per the design) with `captured`
/// piped to its stdin, and parses a leading floating-point number from its
/// stdout.
///
/// `command_display` is only used to build error messages; it names the
/// benchmark command whose output is being measured, not the extractor
/// itself.
pub fn extract(
    captured: &File,
    extractor: &str,
    command_display: &str,
) -> Result<f64, EngineError> {
    let mut stdin_fd = captured.try_clone().map_err(|source| {
        EngineError::ExtractorFailure {
            command: command_display.to_string(),
            extractor: extractor.to_string(),
            reason: format!("could not duplicate captured stdout: {source}"),
        }
    })?;
    stdin_fd.rewind().map_err(|source| EngineError::ExtractorFailure {
        command: command_display.to_string(),
        extractor: extractor.to_string(),
        reason: format!("could not rewind captured stdout: {source}"),
    })?;

    let mut capture_out = tempfile::tempfile().map_err(|source| {
        EngineError::ExtractorFailure {
            command: command_display.to_string(),
            extractor: extractor.to_string(),
            reason: format!("could not create temporary file: {source}"),
        }
    })?;
    let stdout_fd = capture_out.try_clone().map_err(|source| {
        EngineError::ExtractorFailure {
            command: command_display.to_string(),
            extractor: extractor.to_string(),
            reason: format!("could not duplicate temporary file: {source}"),
        }
    })?;

    let shell_path = if cfg!(windows) { "cmd.exe" } else { "/bin/sh" };
    let flag = if cfg!(windows) { "/C" } else { "-c" };
    let mut cmd = std::process::Command::new(shell_path);
    cmd.arg(flag)
        .arg(extractor)
        .stdin(Stdio::from(stdin_fd))
        .stdout(Stdio::from(stdout_fd))
        .stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|source| EngineError::ExtractorFailure {
        command: command_display.to_string(),
        extractor: extractor.to_string(),
        reason: format!("failed to spawn extractor: {source}"),
    })?;
    let status = child.wait().map_err(|source| EngineError::ExtractorFailure {
        command: command_display.to_string(),
        extractor: extractor.to_string(),
        reason: format!("failed to wait for extractor: {source}"),
    })?;
    if !status.success() {
        return Err(EngineError::ExtractorFailure {
            command: command_display.to_string(),
            extractor: extractor.to_string(),
            reason: format!("extractor exited with {status}"),
        });
    }

    capture_out.rewind().map_err(|source| EngineError::ExtractorFailure {
        command: command_display.to_string(),
        extractor: extractor.to_string(),
        reason: format!("could not rewind extractor output: {source}"),
    })?;
    let mut buf = vec![0u8; MAX_EXTRACTOR_OUTPUT];
    let n = capture_out.read(&mut buf).map_err(|source| {
        EngineError::ExtractorFailure {
            command: command_display.to_string(),
            extractor: extractor.to_string(),
            reason: format!("could not read extractor output: {source}"),
        }
    })?;
    buf.truncate(n);
    let text = String::from_utf8_lossy(&buf);
    parse_leading_float(&text).ok_or_else(|| EngineError::ExtractorFailure {
        command: command_display.to_string(),
        extractor: extractor.to_string(),
        reason: format!(
            "could not parse a floating-point number from extractor output: {:?}",
            text.trim()
        ),
    })
}

/// Parses the longest numeric prefix of `s` as an `f64`, skipping leading
/// whitespace. Returns `None` if no such prefix exists.
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == digits_start || (i == digits_start + 1 && bytes[digits_start] == b'.')
    {
        return None;
    }
    // Optional exponent, but only if it's well-formed; otherwise we stop
    // before it and parse what we have so far.
    let mantissa_end = i;
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
            j += 1;
        }
        let exp_digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits_start {
            i = j;
        }
    }
    s[..i].parse::<f64>().ok().or_else(|| s[..mantissa_end].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer() {
        assert_eq!(parse_leading_float("42\n"), Some(42.0));
    }

    #[test]
    fn parses_decimal() {
        assert_eq!(parse_leading_float("42.5\n"), Some(42.5));
    }

    #[test]
    fn parses_with_leading_whitespace() {
        assert_eq!(parse_leading_float("   3.14 is pi"), Some(3.14));
    }

    #[test]
    fn parses_negative() {
        assert_eq!(parse_leading_float("-1.5"), Some(-1.5));
    }

    #[test]
    fn parses_exponent() {
        assert_eq!(parse_leading_float("1.5e3"), Some(1500.0));
    }

    #[test]
    fn rejects_non_numeric() {
        assert_eq!(parse_leading_float("not a number"), None);
        assert_eq!(parse_leading_float(""), None);
        assert_eq!(parse_leading_float("."), None);
    }

    #[test]
    fn extracts_from_real_command() {
        let mut f = tempfile::tempfile().unwrap();
        use std::io::Write;
        write!(f, "42.5\n").unwrap();
        f.rewind().unwrap();
        let value = extract(&f, "cat", "printf 42.5").unwrap();
        assert_eq!(value, 42.5);
    }

    #[test]
    fn nonzero_extractor_exit_fails() {
        let f = tempfile::tempfile().unwrap();
        let err = extract(&f, "exit 1", "some command").unwrap_err();
        assert!(matches!(err, EngineError::ExtractorFailure { .. }));
    }

    #[test]
    fn unparseable_output_fails() {
        let f = tempfile::tempfile().unwrap();
        let err = extract(&f, "echo not-a-number", "some command").unwrap_err();
        assert!(matches!(err, EngineError::ExtractorFailure { .. }));
    }
}
