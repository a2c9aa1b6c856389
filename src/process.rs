/*!
The Process Runner: spawns one child per benchmark run, redirects its stdio
per policy, and reports back exit status, CPU times and wall-clock time.

`std::process::Child::wait` doesn't expose resource usage, so on Unix this
reaps the child itself via the POSIX `wait4(2)` syscall instead of going
through `Child::wait`.
*/

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::error::EngineError;
use crate::model::{CommandDescriptor, InputPolicy, OutputPolicy};

/// The outcome of running a single command once.
#[derive(Debug)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub wall_seconds: f64,
    pub user_seconds: f64,
    pub sys_seconds: f64,
    /// The child's captured stdout, rewound to the start, when capture was
    /// requested.
    pub captured_stdout: Option<File>,
}

/// Builds the `std::process::Command` for a command descriptor, honoring the
/// shell configuration.
fn build_command(
    command: &CommandDescriptor,
    shell: &crate::config::Shell,
) -> Command {
    match shell {
        crate::config::Shell::None => {
            let mut cmd = Command::new(&command.executable);
            cmd.args(&command.argv[1..]);
            cmd
        }
        crate::config::Shell::Command(shell_path) => {
            let on_windows_cmd = cfg!(windows) && shell_path == "cmd.exe";
            let mut cmd = Command::new(shell_path);
            cmd.arg(if on_windows_cmd { "/C" } else { "-c" });
            cmd.arg(&command.display);
            cmd
        }
    }
}

fn stdin_stdio(input: &InputPolicy) -> Result<Stdio, EngineError> {
    match input {
        InputPolicy::Null => Ok(Stdio::null()),
        InputPolicy::File(path) => open_stdio(path),
    }
}

fn open_stdio(path: &Path) -> Result<Stdio, EngineError> {
    let file = File::open(path).map_err(|source| EngineError::ChildSpawn {
        command: path.display().to_string(),
        source,
    })?;
    Ok(Stdio::from(file))
}

fn output_stdio(output: OutputPolicy) -> Stdio {
    match output {
        OutputPolicy::Null => Stdio::null(),
        OutputPolicy::Inherit => Stdio::inherit(),
    }
}

/// Runs `command` once and returns its measurement. When `capture_stdout` is
/// true, stderr is discarded and stdout is redirected to a fresh, unnamed
/// temporary file (unlinked from the filesystem the moment it's created)
/// whose contents are returned, rewound, for the custom measurement
/// extractor to consume.
pub fn run(
    command: &CommandDescriptor,
    shell: &crate::config::Shell,
    capture_stdout: bool,
) -> Result<RunOutcome, EngineError> {
    let mut cmd = build_command(command, shell);

    let capture_file = if capture_stdout {
        let f = tempfile::tempfile().map_err(|source| EngineError::ChildSpawn {
            command: command.display.clone(),
            source,
        })?;
        Some(f)
    } else {
        None
    };

    cmd.stdin(stdin_stdio(&command.input)?);
    if let Some(ref f) = capture_file {
        let stdout_fd =
            f.try_clone().map_err(|source| EngineError::ChildSpawn {
                command: command.display.clone(),
                source,
            })?;
        cmd.stdout(Stdio::from(stdout_fd));
        cmd.stderr(Stdio::null());
    } else {
        cmd.stdout(output_stdio(command.output));
        cmd.stderr(output_stdio(command.output));
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| EngineError::ChildSpawn {
        command: command.display.clone(),
        source,
    })?;
    let (exit_code, user_seconds, sys_seconds) = wait_with_rusage(
        &mut child,
        &command.display,
    )?;
    let wall_seconds = start.elapsed().as_secs_f64();

    let captured_stdout = match capture_file {
        None => None,
        Some(mut f) => {
            f.rewind().map_err(|source| EngineError::ChildWait {
                command: command.display.clone(),
                source,
            })?;
            Some(f)
        }
    };

    Ok(RunOutcome {
        exit_code,
        wall_seconds,
        user_seconds,
        sys_seconds,
        captured_stdout,
    })
}

#[cfg(unix)]
fn wait_with_rusage(
    child: &mut std::process::Child,
    display: &str,
) -> Result<(i32, f64, f64), EngineError> {
    let pid = child.id() as libc::pid_t;
    let mut status: libc::c_int = 0;
    let mut rusage: libc::rusage = unsafe { std::mem::zeroed() };
    let waited = unsafe { libc::wait4(pid, &mut status, 0, &mut rusage) };
    if waited == -1 {
        return Err(EngineError::ChildWait {
            command: display.to_string(),
            source: std::io::Error::last_os_error(),
        });
    }
    if waited != pid {
        return Err(EngineError::ChildWait {
            command: display.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("wait4 returned pid {waited}, expected {pid}"),
            ),
        });
    }
    let exit_code = if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        128 + libc::WTERMSIG(status)
    } else {
        // Neither exited nor signalled: treat as the sentinel used
        // elsewhere for "the child never got to exec".
        255
    };
    let user_seconds = timeval_seconds(rusage.ru_utime);
    let sys_seconds = timeval_seconds(rusage.ru_stime);
    Ok((exit_code, user_seconds, sys_seconds))
}

#[cfg(unix)]
fn timeval_seconds(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + (tv.tv_usec as f64) / 1_000_000.0
}

#[cfg(not(unix))]
fn wait_with_rusage(
    child: &mut std::process::Child,
    display: &str,
) -> Result<(i32, f64, f64), EngineError> {
    // CPU-time accounting via rusage is a POSIX concept; on non-Unix
    // platforms we fall back to wall-clock-only measurement and report zero
    // CPU times rather than fabricate a number.
    let status = child.wait().map_err(|source| EngineError::ChildWait {
        command: display.to_string(),
        source,
    })?;
    let exit_code = match status.code() {
        Some(code) => code,
        None => 255,
    };
    Ok((exit_code, 0.0, 0.0))
}
