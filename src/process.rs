//! Blocking invocation of the external preprocessing and query programs.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::ProcessError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const OUTPUT_TAIL_LINES: usize = 20;

/// A finished, successful invocation.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    /// Wall-clock time as seen by the harness, including process start-up.
    pub elapsed: Duration,
    /// Interleaved stdout and stderr.
    pub output: String,
}

/// Makes a relative program path like `./benchmark` absolute so it keeps
/// pointing at the same file when the child runs in another directory. Bare
/// names are left for `PATH` lookup.
pub fn resolve_program(program: &Path) -> PathBuf {
    if program.components().count() > 1 {
        std::fs::canonicalize(program).unwrap_or_else(|_| program.to_path_buf())
    } else {
        program.to_path_buf()
    }
}

/// Runs `command` to completion, killing it once `timeout` has passed.
///
/// Output goes to an anonymous temporary file rather than a pipe so a chatty
/// child can never block on a full buffer while the harness is polling it.
pub fn run(mut command: Command, timeout: Option<Duration>) -> Result<ProcessOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let spawn_err = |source| ProcessError::Spawn {
        program: program.clone(),
        source,
    };
    let wait_err = |source| ProcessError::Wait {
        program: program.clone(),
        source,
    };

    let capture = tempfile::tempfile().map_err(spawn_err)?;
    command
        .stdin(Stdio::null())
        .stdout(capture.try_clone().map_err(spawn_err)?)
        .stderr(capture.try_clone().map_err(spawn_err)?);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout also takes down any workers.
        command.process_group(0);
    }

    debug!("running {:?}", command);
    let start = Instant::now();
    let mut child = command.spawn().map_err(spawn_err)?;

    let status = match timeout {
        None => child.wait().map_err(wait_err)?,
        Some(limit) => loop {
            if let Some(status) = child.try_wait().map_err(wait_err)? {
                break status;
            }
            if start.elapsed() >= limit {
                kill_group(&mut child);
                let _ = child.wait();
                return Err(ProcessError::Timeout {
                    program,
                    after: limit,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        },
    };
    let elapsed = start.elapsed();

    let output = read_capture(capture);
    if !output.trim().is_empty() {
        debug!("{} output:\n{}", program, output.trim_end());
    }

    if !status.success() {
        return Err(ProcessError::NonZeroExit {
            program,
            status: status.to_string(),
            output: tail(&output, OUTPUT_TAIL_LINES),
        });
    }

    Ok(ProcessOutput {
        status,
        elapsed,
        output,
    })
}

/// Kills the child and every process in its group.
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain syscall; a negative pid addresses the group led by the child.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

fn read_capture(mut file: File) -> String {
    let mut bytes = Vec::new();
    if file.seek(SeekFrom::Start(0)).is_err() || file.read_to_end(&mut bytes).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
