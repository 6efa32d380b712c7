//! # Process Runner
//!
//! Launches the scanner executable and waits for it to finish.
//!
//! One background task drains stdout and stderr. The runner waits for the
//! process to exit and for that task to see both pipes close, racing the pair
//! against the caller's cancellation token and the optional deadline. A child
//! that inherited the pipes therefore cannot hold a finished scan past either
//! of them. A stopped scan is killed and reaped before the runner returns. The
//! child is also spawned with `kill_on_drop`, so it cannot outlive the runner
//! on any other path (a panic, or the future being dropped).

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nmapr_common::error::{CancelReason, Result, ScanError};

const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Everything a finished scanner process produced.
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Executes one scanner invocation.
///
/// Implemented by [`ProcessRunner`]; tests substitute their own executor.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, args: &[String], cancel: &CancellationToken) -> Result<RawOutput>;
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    timeout: Option<Duration>,
}

enum Outcome {
    Finished(ExitStatus, RawOutput),
    Stopped(CancelReason),
}

impl ProcessRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    fn spawn(&self, args: &[String]) -> Result<Child> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.launch_error(source))
    }

    fn launch_error(&self, source: std::io::Error) -> ScanError {
        ScanError::Launch {
            binary: self.binary.display().to_string(),
            source,
        }
    }

    async fn wait(
        &self,
        child: &mut Child,
        output: &mut JoinHandle<RawOutput>,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        // Ready only once the process has exited and both pipes are closed
        let finished = async {
            let status = child.wait().await.map_err(|source| self.launch_error(source))?;
            let captured = output.await.unwrap_or_default();
            Ok::<_, ScanError>(Outcome::Finished(status, captured))
        };

        tokio::select! {
            outcome = finished => outcome,
            _ = cancel.cancelled() => Ok(Outcome::Stopped(CancelReason::Cancelled)),
            _ = deadline => Ok(Outcome::Stopped(CancelReason::TimedOut)),
        }
    }
}

#[async_trait]
impl Executor for ProcessRunner {
    async fn execute(&self, args: &[String], cancel: &CancellationToken) -> Result<RawOutput> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled {
                reason: CancelReason::Cancelled,
                diagnostics: String::new(),
            });
        }

        debug!("Running {} {}", self.binary.display(), args.join(" "));
        let start_time = Instant::now();
        let mut child = self.spawn(args)?;
        info!("Scanner started (pid {})", child.id().unwrap_or_default());

        let mut output = drain(child.stdout.take(), child.stderr.take());
        let outcome = self.wait(&mut child, &mut output, cancel).await;
        let elapsed = start_time.elapsed();

        match outcome {
            Ok(Outcome::Finished(status, output)) if !status.success() => Err(ScanError::Process {
                code: status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Outcome::Finished(_, output)) => {
                info!("Scanner finished in {:.2}s", elapsed.as_secs_f64());
                Ok(output)
            }
            Ok(Outcome::Stopped(reason)) => {
                stop(&mut child).await;
                let stderr = collect(output).await.stderr;
                warn!("Scan {reason} after {:.2}s", elapsed.as_secs_f64());
                Err(ScanError::Cancelled {
                    reason,
                    diagnostics: String::from_utf8_lossy(&stderr).into_owned(),
                })
            }
            Err(e) => {
                stop(&mut child).await;
                output.abort();
                Err(e)
            }
        }
    }
}

/// Kills the child unless it already exited. kill() also reaps it, which
/// closes its end of both pipes.
async fn stop(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to stop scanner process: {e}");
    }
}

fn drain(stdout: Option<ChildStdout>, stderr: Option<ChildStderr>) -> JoinHandle<RawOutput> {
    tokio::spawn(async move {
        let (stdout, stderr) = tokio::join!(read_all(stdout), read_all(stderr));
        RawOutput { stdout, stderr }
    })
}

async fn read_all<R>(pipe: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe
        && let Err(e) = pipe.read_to_end(&mut buffer).await
    {
        warn!("Failed to read scanner output: {e}");
    }
    buffer
}

/// Waits briefly for the drain task of a stopped scan. A grandchild may still
/// hold the pipes open, in which case whatever was read is dropped.
async fn collect(mut task: JoinHandle<RawOutput>) -> RawOutput {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            task.abort();
            RawOutput::default()
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
