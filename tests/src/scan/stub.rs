use std::time::{Duration, Instant};

use nmapr_common::error::{CancelReason, ScanError};
use nmapr_common::filter::PortStateFilter;
use nmapr_common::options::{ScanRequest, ScanRequestBuilder};
use nmapr_common::result::PortStatus;
use nmapr_core::{Scanner, ScannerState};
use tokio_util::sync::CancellationToken;

use crate::util;

fn localhost_request(binary: &std::path::Path) -> ScanRequestBuilder {
    ScanRequest::builder()
        .targets(["localhost"])
        .and_then(|b| b.ports(["8976", "8977"]))
        .and_then(|b| b.binary_path(binary))
        .unwrap()
}

#[tokio::test]
async fn closed_port_filter_through_a_real_process() {
    let _serial = util::serial().await;
    let dir = util::scratch_dir("replay").unwrap();
    let binary = util::replaying_scanner(&dir, "localhost.xml", "").unwrap();

    let request = localhost_request(&binary)
        .port_filter(PortStateFilter::only(PortStatus::Closed))
        .build()
        .unwrap();
    let mut scanner = Scanner::with_request(request, CancellationToken::new());
    let report = scanner.run().await.unwrap();

    assert_eq!(scanner.state(), ScannerState::Completed);
    let ports = &report.result.hosts[0].ports;
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].id, 8976);
    assert_eq!(
        util::recorded_args(&dir).unwrap(),
        vec!["-p", "8976,8977", "-oX", "-", "localhost"]
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn stderr_lines_become_warnings() {
    let _serial = util::serial().await;
    let dir = util::scratch_dir("warnings").unwrap();
    let binary = util::replaying_scanner(
        &dir,
        "three_hosts.xml",
        "Warning: giving up on port because retransmission cap hit (2).",
    )
    .unwrap();

    let request = ScanRequest::builder()
        .targets(["google.com", "facebook.com", "youtube.com"])
        .and_then(|b| b.binary_path(&binary))
        .and_then(ScanRequestBuilder::build)
        .unwrap();
    let report = Scanner::with_request(request, CancellationToken::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.result.hosts.len(), 3);
    assert_eq!(
        report.warnings,
        vec!["Warning: giving up on port because retransmission cap hit (2)."]
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn permission_denied_is_a_process_error() {
    let _serial = util::serial().await;
    let dir = util::scratch_dir("denied").unwrap();
    let binary = util::stub_scanner(&dir, "echo 'permission denied' >&2\nexit 1").unwrap();

    let mut scanner = Scanner::with_request(
        localhost_request(&binary).build().unwrap(),
        CancellationToken::new(),
    );
    let err = scanner.run().await.unwrap_err();

    match &err {
        ScanError::Process { code, stderr } => {
            assert_eq!(*code, Some(1));
            assert!(stderr.contains("permission denied"));
        }
        other => panic!("expected a process error, got {other:?}"),
    }
    assert_eq!(scanner.state(), ScannerState::Failed);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn garbage_output_is_a_parse_error() {
    let _serial = util::serial().await;
    let dir = util::scratch_dir("garbage").unwrap();
    let binary = util::stub_scanner(&dir, "echo 'Starting Nmap 7.94'\necho '<nmaprun><host>'").unwrap();

    let err = Scanner::with_request(
        localhost_request(&binary).build().unwrap(),
        CancellationToken::new(),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, ScanError::Parse { .. }), "got {err:?}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_executable_is_a_launch_error() {
    let _serial = util::serial().await;
    let request = localhost_request(std::path::Path::new("/nonexistent/nmap"))
        .build()
        .unwrap();
    let err = Scanner::with_request(request, CancellationToken::new())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Launch { .. }));
    assert!(err.is_process_failure());
}

#[tokio::test]
async fn cancelling_stops_a_hanging_scan() {
    let _serial = util::serial().await;
    let dir = util::scratch_dir("hang").unwrap();
    let binary = util::stub_scanner(&dir, "echo 'Starting Nmap 7.94' >&2\nexec sleep 30").unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let mut scanner = Scanner::with_request(localhost_request(&binary).build().unwrap(), cancel);
    let err = scanner.run().await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(scanner.state(), ScannerState::Cancelled);
    match err {
        ScanError::Cancelled {
            reason,
            diagnostics,
        } => {
            assert_eq!(reason, CancelReason::Cancelled);
            assert!(diagnostics.contains("Starting Nmap"));
        }
        other => panic!("expected cancellation, got {other:?}"),
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn scan_timeout_is_reported() {
    let _serial = util::serial().await;
    let dir = util::scratch_dir("timeout").unwrap();
    let binary = util::stub_scanner(&dir, "exec sleep 30").unwrap();

    let request = localhost_request(&binary)
        .timeout(Duration::from_millis(200))
        .and_then(ScanRequestBuilder::build)
        .unwrap();
    let err = Scanner::with_request(request, CancellationToken::new())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScanError::Cancelled {
            reason: CancelReason::TimedOut,
            ..
        }
    ));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn concurrent_scanners_are_independent() {
    let _serial = util::serial().await;
    let first_dir = util::scratch_dir("concurrent").unwrap();
    let second_dir = util::scratch_dir("concurrent").unwrap();
    let first = util::replaying_scanner(&first_dir, "localhost.xml", "").unwrap();
    let second = util::replaying_scanner(&second_dir, "three_hosts.xml", "Warning: slow network").unwrap();

    let mut closed_only = Scanner::with_request(
        localhost_request(&first)
            .port_filter(PortStateFilter::only(PortStatus::Closed))
            .build()
            .unwrap(),
        CancellationToken::new(),
    );
    let mut unfiltered = Scanner::with_request(
        ScanRequest::builder()
            .targets(["google.com", "facebook.com", "youtube.com"])
            .and_then(|b| b.binary_path(&second))
            .and_then(ScanRequestBuilder::build)
            .unwrap(),
        CancellationToken::new(),
    );

    let (first_report, second_report) = tokio::join!(closed_only.run(), unfiltered.run());
    let first_report = first_report.unwrap();
    let second_report = second_report.unwrap();

    assert_eq!(closed_only.state(), ScannerState::Completed);
    assert_eq!(unfiltered.state(), ScannerState::Completed);

    assert_eq!(first_report.result.hosts.len(), 1);
    assert_eq!(first_report.result.hosts[0].ports.len(), 1);
    assert!(first_report.warnings.is_empty());
    assert_eq!(
        util::recorded_args(&first_dir).unwrap(),
        vec!["-p", "8976,8977", "-oX", "-", "localhost"]
    );

    assert_eq!(second_report.result.hosts.len(), 3);
    assert_eq!(second_report.warnings, vec!["Warning: slow network"]);
    assert_eq!(
        util::recorded_args(&second_dir).unwrap(),
        vec!["-oX", "-", "google.com", "facebook.com", "youtube.com"]
    );

    let _ = std::fs::remove_dir_all(&first_dir);
    let _ = std::fs::remove_dir_all(&second_dir);
}
