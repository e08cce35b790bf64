//! Subprocess supervision shared by every local adapter in `scriberr-adapters`.
//!
//! Generalizes the teacher's `FluidDiarizationEngine::diarize_with_embeddings`
//! (spawn, write stdin, `wait_with_output`, parse JSON, map non-zero exit to
//! an error carrying the stderr tail) from one hardcoded binary to any
//! subprocess-backed adapter, and adds cancellation: the child is launched
//! in its own POSIX process group so `ctx.cancel()` can kill the whole group,
//! not just the immediate child (a child's own grandchildren would otherwise
//! survive a plain `Child::kill`).

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const STDERR_TAIL_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write stdin: {0}")]
    StdinWrite(#[source] std::io::Error),

    #[error("failed to wait for subprocess: {0}")]
    Wait(#[source] std::io::Error),

    /// Non-zero exit. `stderr_tail` is at most the last
    /// [`STDERR_TAIL_BYTES`] of stderr, lossily decoded.
    #[error("subprocess exited with {code:?}: {stderr_tail}")]
    NonZeroExit {
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("failed to parse subprocess JSON output: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("subprocess was cancelled")]
    Cancelled,
}

/// One subprocess invocation: binary, argv, and optional bytes piped to stdin.
pub struct SubprocessRequest<'a> {
    pub binary: &'a Path,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

/// Run `request`, returning its stdout parsed as JSON. Honors `cancel`:
/// if it fires before the child exits, the child's process group is
/// killed and [`SubprocessError::Cancelled`] is returned.
pub async fn run_json<T: DeserializeOwned>(
    request: SubprocessRequest<'_>,
    cancel: &CancellationToken,
) -> Result<T, SubprocessError> {
    let stdout = run_raw(request, cancel).await?;
    serde_json::from_slice(&stdout).map_err(SubprocessError::InvalidJson)
}

/// Run `request`, returning raw stdout bytes. Lower-level than [`run_json`]
/// for adapters that parse a non-JSON wire format.
pub async fn run_raw(
    request: SubprocessRequest<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, SubprocessError> {
    let mut command = Command::new(request.binary);
    command
        .args(&request.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        // Own process group so cancellation can kill the whole subtree.
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|source| SubprocessError::Spawn {
        binary: request.binary.display().to_string(),
        source,
    })?;

    if let Some(bytes) = request.stdin {
        let stdin = child.stdin.take().expect("stdin was piped");
        write_and_close(stdin, bytes).await?;
    } else {
        drop(child.stdin.take());
    }

    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            kill_process_group(&child);
            let _ = child.wait().await;
            Err(SubprocessError::Cancelled)
        }

        result = child.wait_with_output() => {
            let output = result.map_err(SubprocessError::Wait)?;
            if !output.status.success() {
                let tail = tail_lossy(&output.stderr, STDERR_TAIL_BYTES);
                tracing::warn!(
                    "subprocess {:?} exited {:?}: {tail}",
                    request.binary,
                    output.status.code()
                );
                return Err(SubprocessError::NonZeroExit {
                    code: output.status.code(),
                    stderr_tail: tail,
                });
            }
            Ok(output.stdout)
        }
    }
}

async fn write_and_close(
    mut stdin: tokio::process::ChildStdin,
    bytes: Vec<u8>,
) -> Result<(), SubprocessError> {
    stdin
        .write_all(&bytes)
        .await
        .map_err(SubprocessError::StdinWrite)?;
    stdin.shutdown().await.map_err(SubprocessError::StdinWrite)
}

fn tail_lossy(bytes: &[u8], max: usize) -> String {
    let start = bytes.len().saturating_sub(max);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

/// Default timeout applied by adapters that don't have a more specific one
/// (cloud HTTP calls use their own per-request timeout instead).
pub const DEFAULT_SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(600);
