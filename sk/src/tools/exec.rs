//! Subprocess execution - run a shell command under a deadline
//!
//! The child is started in its own process group. When the deadline expires
//! the whole group is killed and the child reaped before returning; after a
//! normal exit the group is swept as well, so no process started by a call
//! outlives it.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tracing::{debug, warn};

use super::ToolError;

/// Marker appended to output that exceeded the cap
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Output shaping limits
#[derive(Debug, Clone, Copy)]
pub struct ExecLimits {
    /// Longest output returned before truncation (bytes)
    pub max_output_length: usize,
    /// Append the working-directory suffix only below this length (bytes)
    pub context_threshold: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            max_output_length: 10_000,
            context_threshold: 500,
        }
    }
}

/// A single command invocation
#[derive(Debug, Clone)]
pub struct ExecRequest<'a> {
    pub command: &'a str,
    pub working_dir: &'a Path,
    pub timeout: Duration,
    pub shell: &'a Path,
}

/// Outcome of a command that ran to completion
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub truncated: bool,
    pub elapsed: Duration,
}

/// Run a command, capturing stdout and stderr separately
///
/// Returns `ToolError::CommandTimeout` when the deadline passes and
/// `ToolError::Spawn` when the shell cannot be started. A non-zero exit is a
/// normal `CommandOutput` with `success == false`.
pub async fn run(req: &ExecRequest<'_>, limits: &ExecLimits) -> Result<CommandOutput, ToolError> {
    debug!(command = %req.command, timeout = ?req.timeout, "exec::run: called");
    let started = Instant::now();
    let deadline = tokio::time::Instant::now()
        .checked_add(req.timeout)
        .ok_or_else(|| ToolError::InvalidArgument(format!("timeout is out of range: {:?}", req.timeout)))?;

    let mut child = spawn(req)?;
    let pid = child.id();
    let capture_cap = limits.max_output_length.saturating_mul(2).saturating_add(1024);
    let stdout_task = tokio::spawn(drain(child.stdout.take(), capture_cap));
    let stderr_task = tokio::spawn(drain(child.stderr.take(), capture_cap));
    let readers = [stdout_task.abort_handle(), stderr_task.abort_handle()];

    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(?status, "exec::run: child exited");
            status
        }
        Ok(Err(e)) => {
            debug!(%e, "exec::run: wait failed");
            terminate(&mut child, pid).await;
            readers.iter().for_each(|r| r.abort());
            return Err(ToolError::Io(e));
        }
        Err(_) => {
            warn!(command = %req.command, timeout = ?req.timeout, "Command timed out, killing process group");
            terminate(&mut child, pid).await;
            readers.iter().for_each(|r| r.abort());
            return Err(timeout_error(req));
        }
    };

    // A background job can keep the pipes open after the shell exits
    let captured = tokio::time::timeout_at(deadline, async { tokio::join!(stdout_task, stderr_task) }).await;
    kill_group(pid);
    let (stdout, stderr) = match captured {
        Ok((Ok(out), Ok(err))) => (out, err),
        Ok(_) => {
            debug!("exec::run: output reader task failed");
            return Err(ToolError::Io(std::io::Error::other("output reader task failed")));
        }
        Err(_) => {
            warn!(command = %req.command, "Command output still open at deadline");
            readers.iter().for_each(|r| r.abort());
            return Err(timeout_error(req));
        }
    };

    let stdout = String::from_utf8_lossy(&stdout);
    let stderr = String::from_utf8_lossy(&stderr);
    debug!(stdout_len = %stdout.len(), stderr_len = %stderr.len(), "exec::run: output lengths");

    let body = format_body(status, stdout.trim(), stderr.trim(), req.working_dir);
    let (text, truncated) = shape_output(body, req.working_dir, limits);

    Ok(CommandOutput {
        text,
        exit_code: status.code(),
        success: status.success(),
        truncated,
        elapsed: started.elapsed(),
    })
}

fn spawn(req: &ExecRequest<'_>) -> Result<Child, ToolError> {
    let mut std_cmd = std::process::Command::new(req.shell);
    std_cmd
        .arg("-c")
        .arg(req.command)
        .current_dir(req.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    let mut cmd = tokio::process::Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd.spawn().map_err(|source| ToolError::Spawn {
        working_dir: req.working_dir.to_path_buf(),
        source,
    })
}

/// Read a pipe to EOF, keeping at most `cap` bytes
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, cap: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let Some(mut pipe) = pipe else {
        return kept;
    };

    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = cap.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                debug!(%e, "exec::drain: read error");
                break;
            }
        }
    }
    kept
}

/// Kill the child's process group and reap the child
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);
    if let Err(e) = child.kill().await {
        debug!(%e, "exec::terminate: kill failed");
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => debug!(pid, "exec::kill_group: group signalled"),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => debug!(pid, %e, "exec::kill_group: killpg failed"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

fn timeout_error(req: &ExecRequest<'_>) -> ToolError {
    ToolError::CommandTimeout {
        timeout_secs: req.timeout.as_secs_f64(),
        working_dir: req.working_dir.to_path_buf(),
    }
}

fn format_body(status: ExitStatus, stdout: &str, stderr: &str, working_dir: &Path) -> String {
    if status.success() {
        return if stdout.is_empty() {
            format!("Command executed successfully in {}", working_dir.display())
        } else {
            stdout.to_string()
        };
    }

    let mut body = match (status.code(), stderr.is_empty()) {
        (Some(code), false) => format!("Error: exit code {}: {}", code, stderr),
        (Some(code), true) => format!("Error: command failed with exit code {}", code),
        (None, _) => {
            let mut text = format!("Error: command terminated by signal {}", signal_of(status));
            if !stderr.is_empty() {
                text.push_str(&format!(": {}", stderr));
            }
            text
        }
    };
    if !stdout.is_empty() {
        body.push_str(&format!("\nStdout: {}", stdout));
    }
    body
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> i32 {
    -1
}

/// Apply the context suffix (short outputs only) and then the length cap
fn shape_output(mut text: String, working_dir: &Path, limits: &ExecLimits) -> (String, bool) {
    if text.len() < limits.context_threshold {
        text.push_str(&format!("\n[Executed in: {}]", working_dir.display()));
    }

    if text.len() <= limits.max_output_length {
        return (text, false);
    }

    let mut cut = limits.max_output_length;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(TRUNCATION_MARKER);
    (text, true)
}

/// Resolve a configured shell, falling back to `/bin/sh` when it is missing
pub fn resolve_shell(configured: &Path) -> PathBuf {
    if configured.exists() {
        configured.to_path_buf()
    } else {
        warn!(shell = ?configured, "Configured shell not found, using /bin/sh");
        PathBuf::from("/bin/sh")
    }
}
