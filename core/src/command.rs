//! # Command Builder
//!
//! Pure mapping from a [`ScanRequest`] to the argument vector handed to the
//! scanner. The same request always yields the same vector.
//!
//! Arguments are passed to the process directly, without a shell, so values
//! need no quoting. Values that could be read as flags never get this far:
//! the option model rejects them.
//!
//! Order of the emitted arguments:
//! scan techniques, scan flags, host discovery, ports, port exclusions,
//! detection, timing, rates, retries, host timeout, DNS, privilege, output
//! switches, verbosity, custom arguments, target exclusions, XML output and
//! finally the targets.

use nmapr_common::error::{Result, ScanError};
use nmapr_common::network::port::PortSpec;
use nmapr_common::options::tcp::flags_mask;
use nmapr_common::options::{DnsResolution, PrivilegeMode, ScanRequest, TcpScanTechnique};

/// Makes the scanner write its XML report to stdout.
pub const XML_TO_STDOUT: [&str; 2] = ["-oX", "-"];

pub fn build_args(request: &ScanRequest) -> Result<Vec<String>> {
    check_compatibility(request)?;

    let mut args: Vec<String> = Vec::new();
    let mut push = |arg: &str| args.push(arg.to_string());

    if let Some(technique) = request.tcp_scan() {
        push(technique.as_arg());
    }
    if request.udp_scan() {
        push("-sU");
    }
    if !request.tcp_flags().is_empty() {
        push("--scanflags");
        push(&flags_mask(request.tcp_flags()).to_string());
    }

    if request.ping_scan() {
        push("-sn");
    }
    if request.skip_host_discovery() {
        push("-Pn");
    }

    if !request.ports().is_empty() {
        push("-p");
        push(&join_ports(request.ports()));
    }
    if let Some(count) = request.top_ports() {
        push("--top-ports");
        push(&count.to_string());
    }
    if request.fast_mode() {
        push("-F");
    }
    if !request.port_exclusions().is_empty() {
        push("--exclude-ports");
        push(&join_ports(request.port_exclusions()));
    }

    if request.service_detection() {
        push("-sV");
    }
    if request.os_detection() {
        push("-O");
    }

    if let Some(timing) = request.timing() {
        push(&timing.as_arg());
    }
    if let Some(rate) = request.min_rate() {
        push("--min-rate");
        push(&rate.to_string());
    }
    if let Some(rate) = request.max_rate() {
        push("--max-rate");
        push(&rate.to_string());
    }
    if let Some(retries) = request.max_retries() {
        push("--max-retries");
        push(&retries.to_string());
    }
    if let Some(timeout) = request.host_timeout() {
        push("--host-timeout");
        push(&format!("{}ms", timeout.as_millis()));
    }

    if !request.dns_servers().is_empty() {
        let servers: Vec<String> = request.dns_servers().iter().map(ToString::to_string).collect();
        push("--dns-servers");
        push(&servers.join(","));
    }
    if request.system_dns() {
        push("--system-dns");
    }
    match request.resolution() {
        DnsResolution::Default => {}
        DnsResolution::Never => push("-n"),
        DnsResolution::Always => push("-R"),
    }

    match request.privilege() {
        Some(PrivilegeMode::Privileged) => push("--privileged"),
        Some(PrivilegeMode::Unprivileged) => push("--unprivileged"),
        None => {}
    }

    if request.ipv6() {
        push("-6");
    }
    if request.reason() {
        push("--reason");
    }
    if request.open_only() {
        push("--open");
    }
    if let Some(level) = request.verbosity() {
        push(&format!("-v{level}"));
    }

    for arg in request.custom_args() {
        push(arg);
    }

    if !request.target_exclusions().is_empty() {
        let excluded: Vec<String> = request
            .target_exclusions()
            .iter()
            .flat_map(|target| target.to_args())
            .collect();
        push("--exclude");
        push(&excluded.join(","));
    }

    for arg in XML_TO_STDOUT {
        push(arg);
    }

    for target in request.targets() {
        for arg in target.to_args() {
            push(&arg);
        }
    }

    Ok(args)
}

fn join_ports(ports: &[PortSpec]) -> String {
    ports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(",")
}

fn check_compatibility(request: &ScanRequest) -> Result<()> {
    let scans_ports = !request.ports().is_empty()
        || request.top_ports().is_some()
        || request.fast_mode()
        || request.tcp_scan().is_some()
        || request.udp_scan()
        || !request.tcp_flags().is_empty();

    if request.ping_scan() && scans_ports {
        return Err(incompatible(
            "a ping scan (-sn) cannot be combined with port scanning options",
        ));
    }
    if request.ping_scan() && request.skip_host_discovery() {
        return Err(incompatible(
            "a ping scan (-sn) cannot skip host discovery (-Pn)",
        ));
    }
    if !request.tcp_flags().is_empty() && request.tcp_scan() == Some(TcpScanTechnique::Connect) {
        return Err(incompatible(
            "custom TCP flags cannot be sent by a connect scan (-sT)",
        ));
    }
    if !request.dns_servers().is_empty() && request.system_dns() {
        return Err(incompatible(
            "custom DNS servers cannot be combined with the system resolver",
        ));
    }
    if !request.dns_servers().is_empty() && request.resolution() == DnsResolution::Never {
        return Err(incompatible(
            "custom DNS servers are useless when name resolution is disabled",
        ));
    }
    if !request.ports().is_empty() && (request.top_ports().is_some() || request.fast_mode()) {
        return Err(incompatible(
            "an explicit port list cannot be combined with top ports or fast mode",
        ));
    }
    if request.top_ports().is_some() && request.fast_mode() {
        return Err(incompatible("top ports cannot be combined with fast mode"));
    }
    if let (Some(min), Some(max)) = (request.min_rate(), request.max_rate())
        && min > max
    {
        return Err(incompatible(&format!(
            "minimum rate {min} exceeds maximum rate {max}"
        )));
    }
    Ok(())
}

fn incompatible(reason: &str) -> ScanError {
    ScanError::Build(reason.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
