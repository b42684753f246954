//! Supervised child processes.
//!
//! [`run_supervised`] owns the child for its whole lifetime: output is
//! drained concurrently, a timeout kills the child's whole process group, and
//! `kill_on_drop` reaps it if the calling future is cancelled.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::ExecutionError;
use crate::obs;

/// Upper bound on draining pipes after the child has exited or been killed.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// What to launch and how.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one.
    pub envs: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// Bytes written to the child's stdin, which is then closed.
    pub stdin: Option<Vec<u8>>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    /// Shown instead of the full argument vector in logs and errors.
    pub label: Option<String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Human-readable command line for errors and logs.
    pub fn command_line(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a child that ran to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

/// Run a child to completion or until its timeout elapses.
///
/// A non-zero exit is still `Ok`; callers decide what it means. Launch
/// failures and timeouts are errors, the latter carrying whatever output was
/// captured before the kill.
pub async fn run_supervised(spec: &ProcessSpec) -> Result<ProcessOutput, ExecutionError> {
    let start = Instant::now();
    let command_line = spec.command_line();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.envs {
        cmd.env(key, value);
    }
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| ExecutionError::LaunchFailed {
        command: command_line.clone(),
        reason: e.to_string(),
    })?;
    obs::emit_cli_spawned(&command_line, child.id());

    if let (Some(mut pipe), Some(bytes)) = (child.stdin.take(), spec.stdin.clone()) {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&bytes).await {
                debug!(error = %e, "child closed stdin early");
            }
        });
    }

    let stdout_buf = SharedBuf::default();
    let stderr_buf = SharedBuf::default();
    let mut readers = Vec::with_capacity(2);
    if let Some(pipe) = child.stdout.take() {
        readers.push(spawn_reader(pipe, Arc::clone(&stdout_buf)));
    }
    if let Some(pipe) = child.stderr.take() {
        readers.push(spawn_reader(pipe, Arc::clone(&stderr_buf)));
    }

    let waited = match spec.timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
        None => Some(child.wait().await),
    };

    let status = match waited {
        Some(status) => status.map_err(|e| ExecutionError::LaunchFailed {
            command: command_line.clone(),
            reason: format!("wait failed: {e}"),
        })?,
        None => {
            let limit_ms = spec.timeout.map(|t| t.as_millis() as u64).unwrap_or(0);
            obs::emit_cli_timeout(&command_line, limit_ms);
            kill_group(&mut child).await;
            drain(&mut readers).await;
            let stdout = take_string(&stdout_buf).await;
            let stderr = take_string(&stderr_buf).await;
            return Err(ExecutionError::Timeout {
                command: command_line,
                limit_ms,
                partial_output: join_partial(stdout, stderr),
            });
        }
    };

    drain(&mut readers).await;
    Ok(ProcessOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: take_string(&stdout_buf).await,
        stderr: take_string(&stderr_buf).await,
        duration_ms: start.elapsed().as_millis() as u64,
        success: status.success(),
    })
}

/// Kill the child and everything it started.
async fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) takes plain integers; the group was created at spawn.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %std::io::Error::last_os_error(), "group kill failed");
        }
    }
    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill after timeout failed");
    }
}

fn spawn_reader<R>(mut pipe: R, buf: SharedBuf) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buf.lock().await.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    debug!(error = %e, "pipe read failed");
                    break;
                }
            }
        }
    })
}

/// Wait for the readers to hit EOF, at most [`KILL_GRACE`].
///
/// A grandchild holding the pipe open must not stall the caller, so readers
/// still running after the grace period are aborted.
async fn drain(readers: &mut [JoinHandle<()>]) {
    let all = async {
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
    };
    if tokio::time::timeout(KILL_GRACE, all).await.is_err() {
        for reader in readers.iter() {
            reader.abort();
        }
    }
}

async fn take_string(buf: &SharedBuf) -> String {
    String::from_utf8_lossy(&buf.lock().await).into_owned()
}

fn join_partial(stdout: String, stderr: String) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (_, true) => stdout,
        (true, false) => stderr,
        (false, false) => format!("{stdout}\nstderr: {stderr}"),
    }
}
