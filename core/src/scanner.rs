//! # Scanner
//!
//! Runs one [`ScanRequest`] from start to finish: build the argument vector,
//! execute the scanner, parse its report and apply the request's filters.
//!
//! A scanner moves through
//! `Unconfigured -> Configured -> Running -> {Completed, Failed, Cancelled}`
//! and runs at most once. The request is consumed by [`Scanner::run`]; a second
//! call (or a call before [`Scanner::configure`]) fails without launching
//! anything.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use nmapr_common::error::{Result, ScanError};
use nmapr_common::options::ScanRequest;
use nmapr_common::result::{ExitStatus, ScanResult};

use crate::command::build_args;
use crate::parser::parse;
use crate::runner::{Executor, ProcessRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Unconfigured,
    Configured,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// A finished scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// The parsed report after the request's filters were applied.
    pub result: ScanResult,
    /// Non-empty lines the scanner wrote to stderr.
    pub warnings: Vec<String>,
    /// The unmodified XML report.
    pub raw_output: Vec<u8>,
    pub wall_clock: Duration,
}

impl ScanReport {
    pub async fn write_raw(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        tokio::fs::write(path, &self.raw_output).await
    }
}

pub struct Scanner {
    state: ScannerState,
    request: Option<ScanRequest>,
    executor: Option<Arc<dyn Executor>>,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            state: ScannerState::Unconfigured,
            request: None,
            executor: None,
            cancel,
        }
    }

    pub fn with_request(request: ScanRequest, cancel: CancellationToken) -> Self {
        let mut scanner = Self::new(cancel);
        scanner.configure(request);
        scanner
    }

    /// Replaces the process runner, mostly useful in tests.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn configure(&mut self, request: ScanRequest) {
        self.request = Some(request);
        self.state = ScannerState::Configured;
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&mut self) -> Result<ScanReport> {
        let request = self.request.take().ok_or_else(|| {
            ScanError::config("request", "the scanner has no request to run")
        })?;

        self.state = ScannerState::Running;
        let outcome = self.execute(request).await;

        self.state = match &outcome {
            Ok(_) => ScannerState::Completed,
            Err(e) if e.is_cancelled() => ScannerState::Cancelled,
            Err(e) => {
                error!("Scan failed: {e}");
                ScannerState::Failed
            }
        };
        outcome
    }

    async fn execute(&self, request: ScanRequest) -> Result<ScanReport> {
        let args = build_args(&request)?;
        let executor: Arc<dyn Executor> = match &self.executor {
            Some(executor) => Arc::clone(executor),
            None => Arc::new(
                ProcessRunner::new(request.binary_path()).with_timeout(request.timeout()),
            ),
        };

        let start_time = Instant::now();
        let output = executor.execute(&args, &self.cancel).await?;

        let warnings = collect_warnings(&output.stderr);
        let parsed = parse(&output.stdout)?;

        if parsed.stats.exit == ExitStatus::Error {
            let stderr = parsed
                .stats
                .error_message
                .clone()
                .unwrap_or_else(|| warnings.join("\n"));
            return Err(ScanError::Process {
                code: Some(0),
                stderr,
            });
        }

        let result = if request.filters().is_empty() {
            parsed
        } else {
            request.filters().apply(&parsed)
        };

        info!(
            "Scan completed: {} hosts up of {}",
            result.stats.hosts.up, result.stats.hosts.total
        );

        Ok(ScanReport {
            result,
            warnings,
            raw_output: output.stdout,
            wall_clock: start_time.elapsed(),
        })
    }
}

fn collect_warnings(stderr: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            warn!("{line}");
            line.to_string()
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RawOutput;
    use async_trait::async_trait;
    use nmapr_common::error::CancelReason;
    use nmapr_common::filter::{HostStatusFilter, PortStateFilter};
    use nmapr_common::options::{ScanRequestBuilder, TcpFlag, TimingTemplate};
    use nmapr_common::result::{HostStatus, PortStatus};
    use std::sync::Mutex;

    const LOCALHOST: &str = include_str!("../../tests/fixtures/localhost.xml");
    const THREE_HOSTS: &str = include_str!("../../tests/fixtures/three_hosts.xml");

    enum Reply {
        Output {
            stdout: &'static str,
            stderr: &'static str,
        },
        Exit {
            code: i32,
            stderr: &'static str,
        },
        Cancelled,
    }

    struct FakeExecutor {
        reply: Reply,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeExecutor {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn execute(&self, args: &[String], _cancel: &CancellationToken) -> Result<RawOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            match &self.reply {
                Reply::Output { stdout, stderr } => Ok(RawOutput {
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: stderr.as_bytes().to_vec(),
                }),
                Reply::Exit { code, stderr } => Err(ScanError::Process {
                    code: Some(*code),
                    stderr: stderr.to_string(),
                }),
                Reply::Cancelled => Err(ScanError::Cancelled {
                    reason: CancelReason::Cancelled,
                    diagnostics: String::new(),
                }),
            }
        }
    }

    fn localhost_request() -> ScanRequestBuilder {
        ScanRequest::builder()
            .targets(["localhost"])
            .and_then(|b| b.ports(["8976", "8977"]))
            .unwrap()
    }

    fn scanner(request: ScanRequest, executor: Arc<FakeExecutor>) -> Scanner {
        Scanner::with_request(request, CancellationToken::new()).with_executor(executor)
    }

    #[tokio::test]
    async fn closed_port_filter_on_localhost() {
        let request = localhost_request()
            .port_filter(PortStateFilter::only(PortStatus::Closed))
            .build()
            .unwrap();
        let executor = FakeExecutor::new(Reply::Output {
            stdout: LOCALHOST,
            stderr: "",
        });
        let mut scanner = scanner(request, executor.clone());

        let report = scanner.run().await.unwrap();

        assert_eq!(scanner.state(), ScannerState::Completed);
        assert_eq!(report.result.hosts.len(), 1);
        let ports = &report.result.hosts[0].ports;
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].id, 8976);
        assert_eq!(ports[0].status, PortStatus::Closed);
        assert_eq!(report.result.stats.hosts.up, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(report.raw_output, LOCALHOST.as_bytes());

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["-p", "8976,8977", "-oX", "-", "localhost"]);
    }

    #[tokio::test]
    async fn simple_example_scan() {
        let request = ScanRequest::builder()
            .targets(["google.com", "facebook.com", "youtube.com"])
            .and_then(|b| b.dns_servers(["8.8.8.8", "8.8.4.4"]))
            .map(|b| b.timing(TimingTemplate::Fastest))
            .and_then(|b| b.tcp_flags([TcpFlag::Ack, TcpFlag::Null, TcpFlag::Rst]))
            .map(|b| b.host_filter(HostStatusFilter::only(HostStatus::Up)))
            .and_then(ScanRequestBuilder::build)
            .unwrap();
        let executor = FakeExecutor::new(Reply::Output {
            stdout: THREE_HOSTS,
            stderr: "Warning: 142.250.74.46 giving up on port because retransmission cap hit (2).\n\n",
        });

        let report = scanner(request, executor.clone()).run().await.unwrap();

        assert_eq!(report.result.hosts.len(), 3);
        for host in &report.result.hosts {
            assert_eq!(host.ports.len(), 2);
        }
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Warning:"));
        assert_eq!(&executor.calls()[0][..2], ["--scanflags", "20"]);
    }

    #[tokio::test]
    async fn unconfigured_scanner_launches_nothing() {
        let executor = FakeExecutor::new(Reply::Cancelled);
        let mut scanner = Scanner::new(CancellationToken::new()).with_executor(executor.clone());

        let err = scanner.run().await.unwrap_err();

        assert!(matches!(err, ScanError::Configuration { .. }));
        assert_eq!(scanner.state(), ScannerState::Unconfigured);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn a_scanner_runs_only_once() {
        let executor = FakeExecutor::new(Reply::Output {
            stdout: LOCALHOST,
            stderr: "",
        });
        let mut scanner = scanner(localhost_request().build().unwrap(), executor.clone());

        scanner.run().await.unwrap();
        let err = scanner.run().await.unwrap_err();

        assert!(matches!(err, ScanError::Configuration { .. }));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn process_failure_is_reported_verbatim() {
        let executor = FakeExecutor::new(Reply::Exit {
            code: 1,
            stderr: "permission denied",
        });
        let mut scanner = scanner(localhost_request().build().unwrap(), executor);

        let err = scanner.run().await.unwrap_err();

        assert!(err.is_process_failure());
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(scanner.state(), ScannerState::Failed);
    }

    #[tokio::test]
    async fn cancellation_moves_to_cancelled() {
        let executor = FakeExecutor::new(Reply::Cancelled);
        let mut scanner = scanner(localhost_request().build().unwrap(), executor);

        assert!(scanner.run().await.unwrap_err().is_cancelled());
        assert_eq!(scanner.state(), ScannerState::Cancelled);
    }

    #[tokio::test]
    async fn incompatible_options_fail_before_launch() {
        let request = localhost_request().top_ports(10).unwrap().build().unwrap();
        let executor = FakeExecutor::new(Reply::Cancelled);
        let mut scanner = scanner(request, executor.clone());

        let err = scanner.run().await.unwrap_err();

        assert!(matches!(err, ScanError::Build(_)));
        assert_eq!(scanner.state(), ScannerState::Failed);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_output_is_a_parse_error() {
        let truncated = &LOCALHOST[..LOCALHOST.len() / 2];
        let executor = FakeExecutor::new(Reply::Output {
            stdout: truncated,
            stderr: "",
        });
        let mut scanner = scanner(localhost_request().build().unwrap(), executor);

        let err = scanner.run().await.unwrap_err();

        assert!(matches!(err, ScanError::Parse { .. }));
        assert_eq!(scanner.state(), ScannerState::Failed);
    }

    #[tokio::test]
    async fn scanner_reported_error_is_a_process_failure() {
        let executor = FakeExecutor::new(Reply::Output {
            stdout: r#"<nmaprun scanner="nmap" version="7.94"><runstats><finished time="1" elapsed="0.00" exit="error" errormsg="Failed to open device eth9"/><hosts up="0" down="0" total="0"/></runstats></nmaprun>"#,
            stderr: "",
        });
        let mut scanner = scanner(localhost_request().build().unwrap(), executor);

        let err = scanner.run().await.unwrap_err();

        assert!(err.is_process_failure());
        assert!(err.to_string().contains("eth9"));
    }

    #[tokio::test]
    async fn raw_report_can_be_saved() {
        let executor = FakeExecutor::new(Reply::Output {
            stdout: LOCALHOST,
            stderr: "",
        });
        let report = scanner(localhost_request().build().unwrap(), executor)
            .run()
            .await
            .unwrap();

        let path = std::env::temp_dir().join(format!("nmapr-report-{}.xml", std::process::id()));
        report.write_raw(&path).await.unwrap();
        let saved = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(saved, LOCALHOST.as_bytes());
    }
}
