use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use colored::*;
use is_root::is_root;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use nmapr_common::config::Config;
use nmapr_common::error::{CancelReason, Result, ScanError};
use nmapr_common::filter::{
    HasPortsFilter, HostStatusFilter, PortProtocolFilter, PortStateFilter, ServiceNameFilter,
};
use nmapr_common::options::{
    DEFAULT_BINARY, DnsResolution, PrivilegeMode, ScanRequest, TcpFlag, TcpScanTechnique,
    TimingTemplate,
};
use nmapr_common::result::{AddressKind, Host, HostStatus, Port, PortStatus, Protocol};
use nmapr_core::command::build_args;
use nmapr_core::{ScanReport, Scanner};

use crate::terminal::input::InputHandle;
use crate::terminal::{colors, print, spinner};

type Detail = (String, ColoredString);

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Hosts, IP addresses, ranges (10.0.0.1-20) or CIDR blocks
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Ports to scan, e.g. 22,80,1000-2000,U:53
    #[arg(short, long, value_delimiter = ',')]
    pub ports: Vec<String>,

    /// Ports to leave out
    #[arg(long, value_delimiter = ',')]
    pub exclude_ports: Vec<String>,

    /// Targets to leave out
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Scan the N most common ports
    #[arg(long)]
    pub top_ports: Option<u32>,

    /// Scan fewer ports than the default
    #[arg(short = 'F', long)]
    pub fast: bool,

    /// Resolve names through these servers
    #[arg(long, value_delimiter = ',')]
    pub dns_servers: Vec<String>,

    /// Use the operating system resolver
    #[arg(long)]
    pub system_dns: bool,

    /// Never resolve names
    #[arg(short = 'n', long, conflicts_with = "always_resolve")]
    pub no_resolve: bool,

    /// Resolve names of every target, even down ones
    #[arg(short = 'R', long)]
    pub always_resolve: bool,

    /// Timing template: 0-5 or paranoid, sneaky, polite, normal, aggressive, insane
    #[arg(short = 'T', long)]
    pub timing: Option<TimingTemplate>,

    /// TCP scan technique: syn, connect, ack, window, maimon, null, fin, xmas
    #[arg(long)]
    pub technique: Option<TcpScanTechnique>,

    /// Also scan UDP ports
    #[arg(short = 'U', long)]
    pub udp: bool,

    /// Custom TCP flags, e.g. ack,rst
    #[arg(long, value_delimiter = ',')]
    pub scanflags: Vec<TcpFlag>,

    /// Only discover hosts, do not scan ports
    #[arg(long)]
    pub ping_only: bool,

    /// Treat every target as up
    #[arg(long)]
    pub skip_discovery: bool,

    /// Probe open ports for service versions
    #[arg(long)]
    pub service_version: bool,

    /// Detect the operating system
    #[arg(short = 'O', long)]
    pub os: bool,

    /// Report why each state was assigned
    #[arg(long)]
    pub reason: bool,

    /// Only report open ports
    #[arg(long)]
    pub open: bool,

    #[arg(short = '6', long)]
    pub ipv6: bool,

    /// Assume raw socket privileges
    #[arg(long, conflicts_with = "unprivileged")]
    pub privileged: bool,

    /// Assume no raw socket privileges
    #[arg(long)]
    pub unprivileged: bool,

    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Give up on a host after this many seconds
    #[arg(long)]
    pub host_timeout: Option<u64>,

    /// Packets per second, lower bound
    #[arg(long)]
    pub min_rate: Option<u32>,

    /// Packets per second, upper bound
    #[arg(long)]
    pub max_rate: Option<u32>,

    /// Verbosity level passed to nmap
    #[arg(long)]
    pub nmap_verbosity: Option<u8>,

    /// Extra argument for nmap, passed verbatim; repeatable
    #[arg(long = "nmap-arg", allow_hyphen_values = true)]
    pub nmap_args: Vec<String>,

    /// Keep only ports in these states, e.g. open,closed
    #[arg(long, value_delimiter = ',')]
    pub only_state: Vec<PortStatus>,

    /// Keep only ports of this protocol
    #[arg(long)]
    pub protocol: Option<Protocol>,

    /// Keep only ports running this service
    #[arg(long)]
    pub service: Option<String>,

    /// Keep only hosts that are up
    #[arg(long)]
    pub only_up: bool,

    /// Keep only hosts with at least one port left
    #[arg(long)]
    pub with_ports: bool,

    /// Stop the scan after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to the nmap executable
    #[arg(long = "nmap", default_value = DEFAULT_BINARY)]
    pub binary: PathBuf,

    /// Save nmap's XML report to this file
    #[arg(long)]
    pub xml: Option<PathBuf>,

    /// Print the nmap command line instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

impl ScanArgs {
    pub fn to_request(&self) -> Result<ScanRequest> {
        let mut builder = ScanRequest::builder()
            .targets(&self.targets)?
            .exclude_targets(&self.exclude)?
            .ports(&self.ports)?
            .exclude_ports(&self.exclude_ports)?
            .dns_servers(&self.dns_servers)?
            .custom_args(self.nmap_args.iter().cloned())?
            .binary_path(&self.binary)?
            .fast_mode(self.fast)
            .system_dns(self.system_dns)
            .udp_scan(self.udp)
            .ping_scan(self.ping_only)
            .skip_host_discovery(self.skip_discovery)
            .service_detection(self.service_version)
            .os_detection(self.os)
            .reason(self.reason)
            .open_only(self.open)
            .ipv6(self.ipv6);

        if let Some(count) = self.top_ports {
            builder = builder.top_ports(count)?;
        }
        if self.no_resolve {
            builder = builder.resolution(DnsResolution::Never);
        } else if self.always_resolve {
            builder = builder.resolution(DnsResolution::Always);
        }
        if let Some(timing) = self.timing {
            builder = builder.timing(timing);
        }
        if let Some(technique) = self.technique {
            builder = builder.tcp_scan(technique);
        }
        if !self.scanflags.is_empty() {
            builder = builder.tcp_flags(self.scanflags.iter().copied())?;
        }
        if self.privileged {
            builder = builder.privilege(PrivilegeMode::Privileged);
        } else if self.unprivileged {
            builder = builder.privilege(PrivilegeMode::Unprivileged);
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(secs) = self.host_timeout {
            builder = builder.host_timeout(Duration::from_secs(secs))?;
        }
        if let Some(rate) = self.min_rate {
            builder = builder.min_rate(rate)?;
        }
        if let Some(rate) = self.max_rate {
            builder = builder.max_rate(rate)?;
        }
        if let Some(level) = self.nmap_verbosity {
            builder = builder.verbosity(level)?;
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs))?;
        }

        if !self.only_state.is_empty() {
            builder = builder.port_filter(PortStateFilter {
                statuses: self.only_state.clone(),
            });
        }
        if let Some(protocol) = self.protocol {
            builder = builder.port_filter(PortProtocolFilter { protocol });
        }
        if let Some(name) = &self.service {
            builder = builder.port_filter(ServiceNameFilter { name: name.clone() });
        }
        if self.only_up {
            builder = builder.host_filter(HostStatusFilter::only(HostStatus::Up));
        }
        if self.with_ports {
            builder = builder.host_filter(HasPortsFilter::default());
        }

        builder.build()
    }
}

pub async fn scan(args: &ScanArgs, cfg: &Config) -> anyhow::Result<()> {
    let request = args.to_request()?;

    if cfg.dry_run {
        let argv = build_args(&request)?;
        print::aligned_line(
            "command",
            format!("{} {}", request.binary_path().display(), argv.join(" ")),
        );
        return Ok(());
    }

    if request.needs_raw_sockets() && !is_root() {
        warn!("This scan sends raw packets; nmap will likely refuse to run without root");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    let input = InputHandle::start(cancel.clone());

    let span = info_span!("scan", indicatif.pb_show = true);
    let done = CancellationToken::new();
    let spinner_handle = spinner::start_scan_spinner(span.clone(), done.clone());

    let mut scanner = Scanner::with_request(request, cancel);
    let outcome = scanner.run().instrument(span).await;

    done.cancel();
    let _ = spinner_handle.await;
    drop(input);

    let report = match outcome {
        Ok(report) => report,
        Err(ScanError::Cancelled {
            reason,
            diagnostics,
        }) => return Err(stopped_scan(reason, &diagnostics)),
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.xml {
        report
            .write_raw(path)
            .await
            .with_context(|| format!("could not write {}", path.display()))?;
        info!("XML report saved to {}", path.display());
    }

    scan_ends(&report, cfg);
    Ok(())
}

/// Replays what the scanner printed before it was stopped. The returned error
/// makes the process exit unsuccessfully.
fn stopped_scan(reason: CancelReason, diagnostics: &str) -> anyhow::Error {
    for line in diagnostics.lines().filter(|line| !line.trim().is_empty()) {
        warn!("{}", line.trim());
    }
    anyhow::Error::new(ScanError::Cancelled {
        reason,
        diagnostics: diagnostics.to_string(),
    })
    .context("no results were collected")
}

fn scan_ends(report: &ScanReport, cfg: &Config) {
    let hosts = &report.result.hosts;
    if hosts.is_empty() {
        print::header("zero hosts reported", cfg.quiet);
        print::centerln(&"no host matched the targets and filters".red().bold().to_string());
    } else {
        if cfg.quiet > 0 {
            print::blank();
        }
        print::header("scan results", cfg.quiet);
        for (idx, host) in hosts.iter().enumerate() {
            if cfg.quiet < 2 {
                print_host_tree(host, idx);
            }
            if idx + 1 != hosts.len() && cfg.quiet < 2 {
                print::blank();
            }
        }
    }
    print_summary(report, cfg);
}

fn print_summary(report: &ScanReport, cfg: &Config) {
    let stats = &report.result.stats;
    let hosts_up: ColoredString = format!("{} hosts up", stats.hosts.up).bold().green();
    let total_time: ColoredString = format!("{:.2}s", report.wall_clock.as_secs_f64()).bold().yellow();
    let output: ColoredString = format!(
        "Scan Complete: {hosts_up} of {} in {total_time}",
        stats.hosts.total
    )
    .color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::separator();
            print::centerln(&output.to_string());
        }
        _ => {
            print::blank();
            info!("{}", output);
        }
    }
    if !report.warnings.is_empty() {
        info!("nmap reported {} warnings", report.warnings.len());
    }
    if cfg.quiet < 2 {
        print::separator();
    }
}

fn print_host_tree(host: &Host, idx: usize) {
    print::tree_head(idx, &host.display_name());

    let mut details: Vec<Detail> = host
        .addresses
        .iter()
        .map(|address| {
            let color = match address.kind {
                AddressKind::Mac => colors::MAC_ADDR,
                AddressKind::Ipv6 => colors::IPV6_ADDR,
                AddressKind::Ipv4 => colors::IPV4_ADDR,
            };
            (address.kind.as_str().to_uppercase(), address.addr.color(color))
        })
        .collect();

    if let Some(vendor) = host.mac_address().and_then(|mac| mac.vendor.as_deref()) {
        details.push(("Vendor".to_string(), vendor.normal()));
    }

    let status = match host.status_reason.as_str() {
        "" => host.status.to_string(),
        reason => format!("{} ({reason})", host.status),
    };
    details.push(("Status".to_string(), status.normal()));

    if let Some(os) = host.os_matches.first() {
        details.push(("OS".to_string(), format!("{} ({}%)", os.name, os.accuracy).normal()));
    }
    if let Some(uptime) = &host.uptime {
        let days = uptime.seconds as f64 / 86_400.0;
        details.push(("Uptime".to_string(), format!("{days:.1} days").normal()));
    }

    details.extend(host.ports.iter().map(port_to_detail));
    details.extend(host.extra_ports.iter().map(|extra| {
        (
            "Other".to_string(),
            format!("{} {} ports", extra.count, extra.status).bright_black(),
        )
    }));

    print::as_tree_one_level(&details);
}

fn port_to_detail(port: &Port) -> Detail {
    let color = match port.status {
        PortStatus::Open => colors::PORT_OPEN,
        PortStatus::Closed => colors::PORT_CLOSED,
        _ => colors::PORT_FILTERED,
    };

    let mut value = format!("{}", port.status.to_string().color(color));
    if let Some(service) = &port.service {
        value.push_str(&format!(" {}", service.name));
        let version: Vec<&str> = [&service.product, &service.version, &service.extra_info]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        if !version.is_empty() {
            value.push_str(&format!(" {}", version.join(" ").bright_black()));
        }
    }

    (format!("{}/{}", port.id, port.protocol), value.normal())
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
    use crate::commands::{CommandLine, Commands};
    use clap::Parser;

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let cli = CommandLine::try_parse_from(std::iter::once("nmapr").chain(argv.iter().copied())).unwrap();
        match cli.command {
            Commands::Scan(args) => args,
            Commands::Version { .. } => panic!("expected the scan command"),
        }
    }

    #[test]
    fn simple_example_arguments() {
        let args = scan_args(&[
            "scan",
            "google.com",
            "facebook.com",
            "youtube.com",
            "--dns-servers",
            "8.8.8.8,8.8.4.4",
            "-T",
            "insane",
            "--scanflags",
            "ack,null,rst",
        ]);
        let request = args.to_request().unwrap();
        let argv = build_args(&request).unwrap();

        assert_eq!(
            argv,
            vec![
                "--scanflags",
                "20",
                "-T5",
                "--dns-servers",
                "8.8.8.8,8.8.4.4",
                "-oX",
                "-",
                "google.com",
                "facebook.com",
                "youtube.com",
            ]
        );
    }

    #[test]
    fn filters_are_registered() {
        let args = scan_args(&[
            "scan",
            "localhost",
            "-p",
            "8976,8977",
            "--only-state",
            "closed",
            "--with-ports",
        ]);
        let request = args.to_request().unwrap();
        assert!(!request.filters().is_empty());
        assert_eq!(request.ports().len(), 2);
    }

    #[test]
    fn invalid_values_name_the_option() {
        let args = scan_args(&["scan", "localhost", "--dns-servers", "not-an-ip"]);
        match args.to_request() {
            Err(ScanError::Configuration { option, .. }) => assert_eq!(option, "dns_servers"),
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn resolver_switches_conflict() {
        let parsed = CommandLine::try_parse_from(["nmapr", "scan", "localhost", "-n", "-R"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn nmap_args_may_look_like_flags() {
        let args = scan_args(&["scan", "localhost", "--nmap-arg", "--defeat-rst-ratelimit"]);
        let request = args.to_request().unwrap();
        assert_eq!(request.custom_args(), ["--defeat-rst-ratelimit"]);
    }

    #[test]
    fn stopped_scans_fail_with_their_reason() {
        let err = stopped_scan(CancelReason::TimedOut, "Starting Nmap 7.94\n");
        assert_eq!(err.to_string(), "no results were collected");
        match err.downcast_ref::<ScanError>() {
            Some(ScanError::Cancelled {
                reason,
                diagnostics,
            }) => {
                assert_eq!(*reason, CancelReason::TimedOut);
                assert_eq!(diagnostics, "Starting Nmap 7.94\n");
            }
            other => panic!("expected a cancellation, got {other:?}"),
        }

        let err = stopped_scan(CancelReason::Cancelled, "");
        assert!(format!("{err:#}").ends_with("scan cancelled"));
    }
}
