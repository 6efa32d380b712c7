//! # Scan Options
//!
//! A [`ScanRequest`] is the immutable, validated description of one scan.
//! It can only be obtained from [`ScanRequestBuilder::build`].
//!
//! Setters that take free-form input validate it immediately and return
//! [`ScanError::Configuration`] naming the offending option. Switches cannot
//! fail. List options append to what was given before; every other option
//! overrides the previous value.
//!
//! Checks that depend on several options together (e.g. a ping-only scan
//! combined with a port list) are left to the command builder.

pub mod tcp;
pub mod timing;

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScanError};
use crate::filter::{FilterPipeline, HostFilter, PortFilter};
use crate::network::port::PortSpec;
use crate::network::target::TargetSpec;

pub use tcp::{TcpFlag, TcpScanTechnique};
pub use timing::TimingTemplate;

pub const DEFAULT_BINARY: &str = "nmap";
const MAX_VERBOSITY: u8 = 10;

/// How the scanner resolves host names of live targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnsResolution {
    /// Resolve only hosts found to be up.
    #[default]
    Default,
    /// Never resolve (`-n`).
    Never,
    /// Always resolve, even down hosts (`-R`).
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeMode {
    /// Assume raw socket privileges (`--privileged`).
    Privileged,
    /// Assume no raw socket privileges (`--unprivileged`).
    Unprivileged,
}

/// The validated description of one scan.
///
/// Fields are private: a request is only obtainable from
/// [`ScanRequestBuilder::build`] and cannot be changed afterwards.
///
/// ```compile_fail
/// use nmapr_common::options::ScanRequest;
///
/// let mut request = ScanRequest::builder().targets(["localhost"])?.build()?;
/// request.targets.clear();
/// # Ok::<(), nmapr_common::error::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScanRequest {
    targets: Vec<TargetSpec>,
    target_exclusions: Vec<TargetSpec>,
    ports: Vec<PortSpec>,
    port_exclusions: Vec<PortSpec>,
    top_ports: Option<u32>,
    fast_mode: bool,
    dns_servers: Vec<IpAddr>,
    system_dns: bool,
    resolution: DnsResolution,
    timing: Option<TimingTemplate>,
    tcp_scan: Option<TcpScanTechnique>,
    udp_scan: bool,
    tcp_flags: BTreeSet<TcpFlag>,
    ping_scan: bool,
    skip_host_discovery: bool,
    service_detection: bool,
    os_detection: bool,
    reason: bool,
    open_only: bool,
    ipv6: bool,
    privilege: Option<PrivilegeMode>,
    max_retries: Option<u32>,
    host_timeout: Option<Duration>,
    min_rate: Option<u32>,
    max_rate: Option<u32>,
    verbosity: Option<u8>,
    custom_args: Vec<String>,
    binary_path: PathBuf,
    /// Wall-clock limit for the whole scan, enforced by the runner.
    timeout: Option<Duration>,
    filters: FilterPipeline,
}

impl ScanRequest {
    pub fn builder() -> ScanRequestBuilder {
        ScanRequestBuilder::default()
    }

    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    pub fn target_exclusions(&self) -> &[TargetSpec] {
        &self.target_exclusions
    }

    pub fn ports(&self) -> &[PortSpec] {
        &self.ports
    }

    pub fn port_exclusions(&self) -> &[PortSpec] {
        &self.port_exclusions
    }

    pub fn top_ports(&self) -> Option<u32> {
        self.top_ports
    }

    pub fn fast_mode(&self) -> bool {
        self.fast_mode
    }

    pub fn dns_servers(&self) -> &[IpAddr] {
        &self.dns_servers
    }

    pub fn system_dns(&self) -> bool {
        self.system_dns
    }

    pub fn resolution(&self) -> DnsResolution {
        self.resolution
    }

    pub fn timing(&self) -> Option<TimingTemplate> {
        self.timing
    }

    pub fn tcp_scan(&self) -> Option<TcpScanTechnique> {
        self.tcp_scan
    }

    pub fn udp_scan(&self) -> bool {
        self.udp_scan
    }

    pub fn tcp_flags(&self) -> &BTreeSet<TcpFlag> {
        &self.tcp_flags
    }

    pub fn ping_scan(&self) -> bool {
        self.ping_scan
    }

    pub fn skip_host_discovery(&self) -> bool {
        self.skip_host_discovery
    }

    pub fn service_detection(&self) -> bool {
        self.service_detection
    }

    pub fn os_detection(&self) -> bool {
        self.os_detection
    }

    pub fn reason(&self) -> bool {
        self.reason
    }

    pub fn open_only(&self) -> bool {
        self.open_only
    }

    pub fn ipv6(&self) -> bool {
        self.ipv6
    }

    pub fn privilege(&self) -> Option<PrivilegeMode> {
        self.privilege
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    pub fn host_timeout(&self) -> Option<Duration> {
        self.host_timeout
    }

    pub fn min_rate(&self) -> Option<u32> {
        self.min_rate
    }

    pub fn max_rate(&self) -> Option<u32> {
        self.max_rate
    }

    pub fn verbosity(&self) -> Option<u8> {
        self.verbosity
    }

    pub fn custom_args(&self) -> &[String] {
        &self.custom_args
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }

    /// True when the requested scan needs raw socket access.
    pub fn needs_raw_sockets(&self) -> bool {
        self.os_detection
            || self.udp_scan
            || !self.tcp_flags.is_empty()
            || self.tcp_scan.is_some_and(|technique| technique.needs_raw_sockets())
    }
}

#[derive(Debug, Clone)]
pub struct ScanRequestBuilder {
    request: ScanRequest,
}

impl Default for ScanRequestBuilder {
    fn default() -> Self {
        Self {
            request: ScanRequest {
                targets: Vec::new(),
                target_exclusions: Vec::new(),
                ports: Vec::new(),
                port_exclusions: Vec::new(),
                top_ports: None,
                fast_mode: false,
                dns_servers: Vec::new(),
                system_dns: false,
                resolution: DnsResolution::Default,
                timing: None,
                tcp_scan: None,
                udp_scan: false,
                tcp_flags: BTreeSet::new(),
                ping_scan: false,
                skip_host_discovery: false,
                service_detection: false,
                os_detection: false,
                reason: false,
                open_only: false,
                ipv6: false,
                privilege: None,
                max_retries: None,
                host_timeout: None,
                min_rate: None,
                max_rate: None,
                verbosity: None,
                custom_args: Vec::new(),
                binary_path: PathBuf::from(DEFAULT_BINARY),
                timeout: None,
                filters: FilterPipeline::new(),
            },
        }
    }
}

impl ScanRequestBuilder {
    /// Appends targets. The list must not be empty.
    pub fn targets<I, S>(mut self, targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_targets("targets", targets)?;
        if parsed.is_empty() {
            return Err(ScanError::config("targets", "at least one target is required"));
        }
        self.request.targets.extend(parsed);
        Ok(self)
    }

    /// Appends targets that must not be scanned (`--exclude`).
    pub fn exclude_targets<I, S>(mut self, targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_targets("exclude_targets", targets)?;
        self.request.target_exclusions.extend(parsed);
        Ok(self)
    }

    /// Appends port items. Each item may itself be a comma separated list.
    pub fn ports<I, S>(mut self, ports: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_ports("ports", ports)?;
        self.request.ports.extend(parsed);
        Ok(self)
    }

    pub fn exclude_ports<I, S>(mut self, ports: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_ports("exclude_ports", ports)?;
        self.request.port_exclusions.extend(parsed);
        Ok(self)
    }

    pub fn top_ports(mut self, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(ScanError::config("top_ports", "must scan at least one port"));
        }
        self.request.top_ports = Some(count);
        Ok(self)
    }

    pub fn fast_mode(mut self, enabled: bool) -> Self {
        self.request.fast_mode = enabled;
        self
    }

    /// Appends DNS servers used for name resolution (`--dns-servers`).
    pub fn dns_servers<I, S>(mut self, servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for server in servers {
            let server = server.as_ref().trim();
            let addr = server.parse::<IpAddr>().map_err(|e| {
                ScanError::config("dns_servers", format!("'{server}' is not an IP address: {e}"))
            })?;
            self.request.dns_servers.push(addr);
        }
        Ok(self)
    }

    pub fn system_dns(mut self, enabled: bool) -> Self {
        self.request.system_dns = enabled;
        self
    }

    pub fn resolution(mut self, resolution: DnsResolution) -> Self {
        self.request.resolution = resolution;
        self
    }

    pub fn timing(mut self, template: TimingTemplate) -> Self {
        self.request.timing = Some(template);
        self
    }

    pub fn tcp_scan(mut self, technique: TcpScanTechnique) -> Self {
        self.request.tcp_scan = Some(technique);
        self
    }

    pub fn udp_scan(mut self, enabled: bool) -> Self {
        self.request.udp_scan = enabled;
        self
    }

    /// Adds flags to the custom TCP flag set (`--scanflags`).
    pub fn tcp_flags<I>(mut self, flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = TcpFlag>,
    {
        let mut given = 0usize;
        for flag in flags {
            self.request.tcp_flags.insert(flag);
            given += 1;
        }
        if given == 0 {
            return Err(ScanError::config("tcp_flags", "at least one flag is required"));
        }
        Ok(self)
    }

    pub fn ping_scan(mut self, enabled: bool) -> Self {
        self.request.ping_scan = enabled;
        self
    }

    pub fn skip_host_discovery(mut self, enabled: bool) -> Self {
        self.request.skip_host_discovery = enabled;
        self
    }

    pub fn service_detection(mut self, enabled: bool) -> Self {
        self.request.service_detection = enabled;
        self
    }

    pub fn os_detection(mut self, enabled: bool) -> Self {
        self.request.os_detection = enabled;
        self
    }

    pub fn reason(mut self, enabled: bool) -> Self {
        self.request.reason = enabled;
        self
    }

    pub fn open_only(mut self, enabled: bool) -> Self {
        self.request.open_only = enabled;
        self
    }

    pub fn ipv6(mut self, enabled: bool) -> Self {
        self.request.ipv6 = enabled;
        self
    }

    pub fn privilege(mut self, mode: PrivilegeMode) -> Self {
        self.request.privilege = Some(mode);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.request.max_retries = Some(retries);
        self
    }

    pub fn host_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.as_millis() == 0 {
            return Err(ScanError::config("host_timeout", "must be at least one millisecond"));
        }
        self.request.host_timeout = Some(timeout);
        Ok(self)
    }

    pub fn min_rate(mut self, packets_per_second: u32) -> Result<Self> {
        if packets_per_second == 0 {
            return Err(ScanError::config("min_rate", "must be greater than zero"));
        }
        self.request.min_rate = Some(packets_per_second);
        Ok(self)
    }

    pub fn max_rate(mut self, packets_per_second: u32) -> Result<Self> {
        if packets_per_second == 0 {
            return Err(ScanError::config("max_rate", "must be greater than zero"));
        }
        self.request.max_rate = Some(packets_per_second);
        Ok(self)
    }

    pub fn verbosity(mut self, level: u8) -> Result<Self> {
        if !(1..=MAX_VERBOSITY).contains(&level) {
            return Err(ScanError::config(
                "verbosity",
                format!("level must be between 1 and {MAX_VERBOSITY}"),
            ));
        }
        self.request.verbosity = Some(level);
        Ok(self)
    }

    /// Appends raw arguments, passed to the scanner verbatim before the targets.
    pub fn custom_args<I, S>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            let arg: String = arg.into();
            if arg.trim().is_empty() {
                return Err(ScanError::config("custom_args", "arguments cannot be empty"));
            }
            self.request.custom_args.push(arg);
        }
        Ok(self)
    }

    /// Overrides the scanner executable. Defaults to `nmap` from `PATH`.
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path: PathBuf = path.into();
        if path.as_os_str().is_empty() {
            return Err(ScanError::config("binary_path", "path cannot be empty"));
        }
        self.request.binary_path = path;
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ScanError::config("timeout", "must be greater than zero"));
        }
        self.request.timeout = Some(timeout);
        Ok(self)
    }

    pub fn host_filter(mut self, filter: impl HostFilter + 'static) -> Self {
        self.request.filters.add_host_filter(filter);
        self
    }

    pub fn port_filter(mut self, filter: impl PortFilter + 'static) -> Self {
        self.request.filters.add_port_filter(filter);
        self
    }

    pub fn build(self) -> Result<ScanRequest> {
        if self.request.targets.is_empty() {
            return Err(ScanError::config("targets", "at least one target is required"));
        }
        Ok(self.request)
    }
}

fn parse_targets<I, S>(option: &'static str, targets: I) -> Result<Vec<TargetSpec>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    targets
        .into_iter()
        .map(|target| TargetSpec::from_str(target.as_ref()).map_err(|e| ScanError::config(option, e)))
        .collect()
}

fn parse_ports<I, S>(option: &'static str, ports: I) -> Result<Vec<PortSpec>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();
    for item in ports {
        let specs = PortSpec::parse_list(item.as_ref()).map_err(|e| ScanError::config(option, e))?;
        if specs.is_empty() {
            return Err(ScanError::config(option, "port list cannot be empty"));
        }
        parsed.extend(specs);
    }
    Ok(parsed)
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
    use crate::filter::PortStateFilter;
    use crate::result::PortStatus;

    fn option_of(err: ScanError) -> &'static str {
        match err {
            ScanError::Configuration { option, .. } => option,
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn empty_target_list_fails_construction() {
        let err = ScanRequest::builder()
            .targets(Vec::<String>::new())
            .unwrap_err();
        assert_eq!(option_of(err), "targets");

        let err = ScanRequest::builder().build().unwrap_err();
        assert_eq!(option_of(err), "targets");
    }

    #[test]
    fn invalid_values_name_their_option() {
        let err = ScanRequest::builder().targets(["-oN"]).unwrap_err();
        assert_eq!(option_of(err), "targets");

        let err = ScanRequest::builder().ports(["80", "70000"]).unwrap_err();
        assert_eq!(option_of(err), "ports");

        let err = ScanRequest::builder().dns_servers(["8.8.8.8", "dns.google"]).unwrap_err();
        assert_eq!(option_of(err), "dns_servers");

        let err = ScanRequest::builder().tcp_flags([]).unwrap_err();
        assert_eq!(option_of(err), "tcp_flags");

        let err = ScanRequest::builder().verbosity(0).unwrap_err();
        assert_eq!(option_of(err), "verbosity");

        let err = ScanRequest::builder().timeout(Duration::ZERO).unwrap_err();
        assert_eq!(option_of(err), "timeout");

        let err = ScanRequest::builder().custom_args(["  "]).unwrap_err();
        assert_eq!(option_of(err), "custom_args");
    }

    #[test]
    fn list_options_append_and_scalars_override() {
        let request = ScanRequest::builder()
            .targets(["google.com", "facebook.com"])
            .and_then(|b| b.targets(["youtube.com"]))
            .and_then(|b| b.ports(["8976"]))
            .and_then(|b| b.ports(["8977,9000-9010"]))
            .and_then(|b| b.dns_servers(["8.8.8.8", "8.8.4.4"]))
            .map(|b| b.timing(TimingTemplate::Polite).timing(TimingTemplate::Fastest))
            .and_then(|b| b.tcp_flags([TcpFlag::Ack, TcpFlag::Null]))
            .and_then(|b| b.tcp_flags([TcpFlag::Rst, TcpFlag::Ack]))
            .and_then(ScanRequestBuilder::build)
            .unwrap();

        let targets: Vec<String> = request.targets.iter().map(ToString::to_string).collect();
        assert_eq!(targets, vec!["google.com", "facebook.com", "youtube.com"]);
        assert_eq!(request.ports.len(), 3);
        assert_eq!(request.dns_servers.len(), 2);
        assert_eq!(request.timing, Some(TimingTemplate::Fastest));
        assert_eq!(
            request.tcp_flags,
            BTreeSet::from([TcpFlag::Null, TcpFlag::Ack, TcpFlag::Rst])
        );
    }

    #[test]
    fn defaults_use_scanner_from_path() {
        let request = ScanRequest::builder()
            .targets(["localhost"])
            .and_then(ScanRequestBuilder::build)
            .unwrap();
        assert_eq!(request.binary_path, PathBuf::from(DEFAULT_BINARY));
        assert!(request.filters.is_empty());
        assert!(!request.needs_raw_sockets());
    }

    #[test]
    fn filters_are_carried_by_the_request() {
        let request = ScanRequest::builder()
            .targets(["localhost"])
            .map(|b| b.port_filter(PortStateFilter::only(PortStatus::Closed)))
            .and_then(ScanRequestBuilder::build)
            .unwrap();
        assert!(!request.filters.is_empty());
    }

    #[test]
    fn raw_socket_techniques_are_detected() {
        let request = ScanRequest::builder()
            .targets(["localhost"])
            .map(|b| b.tcp_scan(TcpScanTechnique::Ack))
            .and_then(ScanRequestBuilder::build)
            .unwrap();
        assert!(request.needs_raw_sockets());
    }

    #[test]
    fn built_request_is_read_through_accessors() {
        let request = ScanRequest::builder()
            .targets(["localhost"])
            .and_then(|b| b.custom_args(["--defeat-rst-ratelimit"]))
            .and_then(|b| b.timeout(Duration::from_secs(90)))
            .map(|b| b.resolution(DnsResolution::Always))
            .and_then(ScanRequestBuilder::build)
            .unwrap();

        let copy = request.clone();
        assert_eq!(copy.targets().len(), 1);
        assert_eq!(copy.targets()[0].to_string(), "localhost");
        assert_eq!(copy.custom_args(), ["--defeat-rst-ratelimit"]);
        assert_eq!(copy.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(copy.resolution(), DnsResolution::Always);
        assert_eq!(copy.binary_path(), Path::new(DEFAULT_BINARY));
    }
}
