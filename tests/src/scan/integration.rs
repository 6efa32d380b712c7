use nmapr_common::filter::PortStateFilter;
use nmapr_common::options::{PrivilegeMode, ScanRequest, ScanRequestBuilder, TcpScanTechnique};
use nmapr_common::result::{HostStatus, PortStatus, Protocol};
use nmapr_core::Scanner;
use tokio_util::sync::CancellationToken;

use crate::util;

const CLOSED_PORT: u16 = 8976;
const OPEN_PORT: u16 = 8977;

/// Runs a connect scan of localhost with the real nmap: 8977 has a listener,
/// 8976 has none, and only closed ports are kept.
#[tokio::test]
async fn real_nmap_reports_only_the_closed_port() {
    let _serial = util::serial().await;
    if !util::nmap_available() {
        eprintln!("skipping: nmap is not installed");
        return;
    }
    let Some(_listener) = util::listen_on(OPEN_PORT).await else {
        eprintln!("skipping: port {OPEN_PORT} is already in use");
        return;
    };
    if !util::port_is_closed(CLOSED_PORT).await {
        eprintln!("skipping: port {CLOSED_PORT} is in use");
        return;
    }

    let request = ScanRequest::builder()
        .targets(["127.0.0.1"])
        .and_then(|b| b.ports([CLOSED_PORT.to_string(), OPEN_PORT.to_string()]))
        .map(|b| {
            b.tcp_scan(TcpScanTechnique::Connect)
                .skip_host_discovery(true)
                .privilege(PrivilegeMode::Unprivileged)
                .port_filter(PortStateFilter::only(PortStatus::Closed))
        })
        .and_then(ScanRequestBuilder::build)
        .unwrap();

    let report = Scanner::with_request(request, CancellationToken::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.result.hosts.len(), 1);
    let host = &report.result.hosts[0];
    assert_eq!(host.status, HostStatus::Up);
    let ports: Vec<(u16, Protocol, PortStatus)> = host
        .ports
        .iter()
        .map(|port| (port.id, port.protocol, port.status))
        .collect();
    assert_eq!(ports, vec![(CLOSED_PORT, Protocol::Tcp, PortStatus::Closed)]);
    assert_eq!(report.result.stats.hosts.up, 1);
}

#[tokio::test]
async fn real_nmap_rejects_unknown_options() {
    let _serial = util::serial().await;
    if !util::nmap_available() {
        eprintln!("skipping: nmap is not installed");
        return;
    }

    let request = ScanRequest::builder()
        .targets(["127.0.0.1"])
        .and_then(|b| b.custom_args(["--definitely-not-an-nmap-option"]))
        .and_then(ScanRequestBuilder::build)
        .unwrap();

    let err = Scanner::with_request(request, CancellationToken::new())
        .run()
        .await
        .unwrap_err();

    assert!(err.is_process_failure(), "got {err:?}");
}
