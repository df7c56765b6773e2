//! Classifier worker lifecycle management.
//!
//! This module provides the `WorkerManager` that supplies a running
//! saldowsd process reachable via its standard streams, abstracting over
//! two lifecycle strategies:
//!
//! - **One-shot** (default): spawn a fresh process per call, write the whole
//!   request, close stdin and collect the complete output.
//! - **Persistent**: spawn once, keep the handle, and exchange framed
//!   request/response batches over the long-lived pipes. An unhealthy
//!   worker (dead process, failed call, timeout) is marked for restart and
//!   replaced before the next request is written.
//!
//! # Safety
//!
//! This implementation:
//! - Uses pure async I/O (no blocking)
//! - Ensures child process cleanup on drop (`kill_on_drop`)
//! - Bounds every call with a timeout so a hung classifier cannot block
//!   the caller indefinitely

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, error, info, warn};

use crate::config::WsdConfig;
use crate::error::WsdError;
use crate::response::response_separator;

/// Manager for the external classifier process.
///
/// States of the owned worker handle: absent, healthy, needs-restart,
/// terminated. A single caller drives it; calls are strictly serialized.
pub struct WorkerManager {
    binary: PathBuf,
    sense_model: PathBuf,
    context_model: PathBuf,
    persistent: bool,
    call_timeout: Duration,
    worker: Option<WsdWorker>,
    needs_restart: bool,
}

/// A live persistent worker: process handle plus its captured streams.
struct WsdWorker {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerManager {
    pub fn new(config: &WsdConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            sense_model: config.sense_model.clone(),
            context_model: config.context_model.clone(),
            persistent: config.persistent,
            call_timeout: config.call_timeout(),
            worker: None,
            needs_restart: false,
        }
    }

    /// Eagerly spawn the persistent worker before the first call.
    ///
    /// No-op in one-shot mode.
    pub async fn preload(&mut self) -> Result<(), WsdError> {
        if self.persistent {
            self.ensure_worker().await?;
        }
        Ok(())
    }

    /// Between-calls hook: if the previous call marked the worker for
    /// restart, tear it down and respawn it transparently to callers.
    pub async fn cleanup(&mut self) -> Result<(), WsdError> {
        if self.persistent && self.needs_restart {
            info!("Restarting classifier worker between calls");
            self.ensure_worker().await?;
        }
        Ok(())
    }

    /// Whether the next call will replace the worker first.
    pub fn needs_restart(&self) -> bool {
        self.needs_restart
    }

    /// Process id of the persistent worker, if one is running.
    pub fn worker_pid(&self) -> Option<u32> {
        self.worker.as_ref().and_then(|w| w.process.id())
    }

    /// Send one request batch and return the raw response text.
    ///
    /// `sentence_token_counts` carries the token count of each sentence in
    /// the request, which fixes the exact line cadence the persistent
    /// worker's output is read with.
    pub async fn call(
        &mut self,
        request: &str,
        sentence_token_counts: &[usize],
    ) -> Result<String, WsdError> {
        if !self.persistent {
            return self.call_oneshot(request).await;
        }

        self.ensure_worker().await?;
        let timeout = self.call_timeout;
        let result = match self.worker.as_mut() {
            Some(worker) => {
                match tokio::time::timeout(
                    timeout,
                    exchange(worker, request, sentence_token_counts),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(WsdError::Timeout(timeout)),
                }
            }
            None => Err(WsdError::WorkerUnhealthy("worker absent after respawn".into())),
        };
        if result.is_err() {
            warn!("Classifier call failed, marking worker for restart");
            self.needs_restart = true;
        }
        result
    }

    /// Terminate the persistent worker, if any.
    pub async fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            info!("Shutting down classifier worker");
            worker.kill().await;
        }
    }

    /// One-shot strategy: fresh process, full write, full read, exit.
    ///
    /// The write and the read are overlapped: a request larger than the OS
    /// pipe buffers would otherwise deadlock against the child's echo.
    async fn call_oneshot(&self, request: &str) -> Result<String, WsdError> {
        debug!(request_bytes = request.len(), "Spawning one-shot classifier");
        let mut child = self
            .command()
            .spawn()
            .map_err(WsdError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WsdError::WorkerUnhealthy("stdin not captured".into()))?;
        let payload = format!("{request}\n");
        let write = async move {
            let result = stdin.write_all(payload.as_bytes()).await;
            // Closing stdin signals end-of-input so the classifier flushes
            // and exits on its own.
            drop(stdin);
            result
        };

        let output = tokio::time::timeout(self.call_timeout, async {
            let (write_result, output) = tokio::join!(write, child.wait_with_output());
            match write_result {
                // A child that exits without draining its input reports the
                // real failure through its exit status.
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => output,
            }
        })
        .await
        .map_err(|_| WsdError::Timeout(self.call_timeout))??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!(status = %output.status, stderr = %stderr, "Classifier call failed");
            return Err(WsdError::WorkerFailed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.is_empty() {
            // The classifier reports model loading progress on stderr.
            debug!(stderr = %stderr.trim(), "Classifier stderr");
        }
        Ok(String::from_utf8(output.stdout)?)
    }

    /// Make sure a healthy persistent worker exists, replacing a dead or
    /// restart-marked one. The replaced worker never sees another write.
    async fn ensure_worker(&mut self) -> Result<(), WsdError> {
        let respawn = self.needs_restart
            || match self.worker.as_mut() {
                Some(worker) => !worker.is_alive(),
                None => true,
            };
        if respawn {
            if let Some(old) = self.worker.take() {
                warn!(pid = ?old.process.id(), "Replacing unhealthy classifier worker");
                old.kill().await;
            }
            let worker = self.spawn_persistent().await?;
            self.worker = Some(worker);
            self.needs_restart = false;
        }
        Ok(())
    }

    async fn spawn_persistent(&self) -> Result<WsdWorker, WsdError> {
        info!(binary = %self.binary.display(), "Starting persistent classifier worker");
        let mut child = self.command().spawn().map_err(WsdError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WsdError::WorkerUnhealthy("stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| WsdError::WorkerUnhealthy("stdout not captured".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        info!(pid = ?child.id(), "Classifier worker spawned");
        Ok(WsdWorker {
            process: child,
            stdin,
            stdout,
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(self.classifier_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn classifier_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("--format"),
            OsString::from("tab"),
            OsString::from("vector-wsd"),
            OsString::from("--sv-file"),
            self.sense_model.clone().into_os_string(),
            OsString::from("--cv-file"),
            self.context_model.clone().into_os_string(),
            OsString::from("--s1-prior"),
            OsString::from("1"),
            OsString::from("--decay"),
            OsString::from("--context-width"),
            OsString::from("10"),
        ]
    }
}

impl WsdWorker {
    /// Liveness check via the process handle.
    fn is_alive(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    async fn kill(mut self) {
        if let Err(e) = self.process.kill().await {
            warn!(error = %e, "Error while killing classifier worker");
        }
    }
}

/// Exchange one request batch over the persistent pipes.
///
/// Writes the request and flushes without closing stdin while reading
/// exactly one line per token in each sentence plus one terminator line
/// per sentence. Premature end-of-stream is fatal for the call.
async fn exchange(
    worker: &mut WsdWorker,
    request: &str,
    sentence_token_counts: &[usize],
) -> Result<String, WsdError> {
    let WsdWorker { stdin, stdout, .. } = worker;

    let write = async {
        stdin.write_all(request.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok::<(), WsdError>(())
    };

    let read = async {
        let separator = response_separator();
        let mut out = String::new();
        for &count in sentence_token_counts {
            for _ in 0..count {
                let line = read_line(stdout).await?;
                out.push_str(&line);
                out.push('\n');
            }
            let terminator = read_line(stdout).await?;
            if !terminator.is_empty() && terminator != separator {
                return Err(WsdError::MalformedRecord(
                    terminator.split('\t').count(),
                    terminator,
                ));
            }
            // Canonicalize so both lifecycle strategies share one parser.
            out.push_str(&separator);
            out.push('\n');
        }
        Ok(out)
    };

    // Drive both pipe directions together: with a large request the worker
    // echoes while the tail is still being written, and neither pipe can
    // fill up unread.
    let (write_result, read_result) = tokio::join!(write, read);
    write_result?;
    read_result
}

async fn read_line(stdout: &mut BufReader<ChildStdout>) -> Result<String, WsdError> {
    let mut line = String::new();
    let n = stdout.read_line(&mut line).await?;
    if n == 0 {
        return Err(WsdError::TruncatedOutput);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "wsd_bridge::classifier", "{line}");
    }
}
