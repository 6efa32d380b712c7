//! # Scan Result Model
//!
//! Typed view of a finished scan. A [`ScanResult`] owns its [`Host`]s, each
//! host owns its [`Port`]s, and [`Stats`] summarise the whole run as the
//! scanner reported it. Values are produced once by the parser and are not
//! mutated afterwards; filtering builds a new `ScanResult`.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub scanner: String,
    pub version: String,
    /// The command line as the scanner echoed it back.
    pub args: String,
    /// Unix timestamp of the scan start.
    pub start: Option<u64>,
    pub xml_output_version: Option<String>,
    pub scan_info: Vec<ScanInfo>,
    pub verbose: Option<u8>,
    pub debugging: Option<u8>,
    pub hosts: Vec<Host>,
    pub stats: Stats,
}

impl ScanResult {
    pub fn hosts_with_status(&self, status: HostStatus) -> impl Iterator<Item = &Host> {
        self.hosts.iter().filter(move |host| host.status == status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInfo {
    pub scan_type: String,
    pub protocol: String,
    pub num_services: u32,
    pub services: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub addresses: Vec<Address>,
    pub hostnames: Vec<Hostname>,
    pub status: HostStatus,
    pub status_reason: String,
    pub status_reason_ttl: Option<u16>,
    pub ports: Vec<Port>,
    pub extra_ports: Vec<ExtraPorts>,
    pub os_matches: Vec<OsMatch>,
    pub uptime: Option<Uptime>,
    pub distance: Option<u32>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

impl Host {
    /// First IPv4 address, falling back to the first IPv6 address.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        let ips = || {
            self.addresses
                .iter()
                .filter_map(|address| address.addr.parse::<IpAddr>().ok())
        };
        ips().find(IpAddr::is_ipv4).or_else(|| ips().next())
    }

    pub fn mac_address(&self) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|address| address.kind == AddressKind::Mac)
    }

    /// Best human readable name: first hostname, then first address.
    pub fn display_name(&self) -> String {
        if let Some(hostname) = self.hostnames.first() {
            return hostname.name.clone();
        }
        self.addresses
            .first()
            .map(|address| address.addr.clone())
            .unwrap_or_else(|| "unknown host".to_string())
    }

    pub fn port(&self, id: u16, protocol: Protocol) -> Option<&Port> {
        self.ports
            .iter()
            .find(|port| port.id == id && port.protocol == protocol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub addr: String,
    pub kind: AddressKind,
    /// Hardware vendor, only reported for MAC addresses.
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hostname {
    pub name: String,
    /// `user` for names given on the command line, `PTR` for reverse lookups.
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: u16,
    pub protocol: Protocol,
    pub status: PortStatus,
    pub reason: String,
    pub reason_ttl: Option<u16>,
    pub service: Option<Service>,
    pub scripts: Vec<Script>,
}

impl Port {
    pub fn status(&self) -> PortStatus {
        self.status
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.id, self.protocol, self.status)?;
        if let Some(service) = &self.service {
            write!(f, " {}", service.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub product: Option<String>,
    pub version: Option<String>,
    pub extra_info: Option<String>,
    pub os_type: Option<String>,
    /// `table` (port lookup) or `probed` (version detection).
    pub method: Option<String>,
    pub confidence: Option<u8>,
    pub tunnel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub id: String,
    pub output: String,
}

/// Ports the scanner collapsed into a single line, e.g. "997 closed ports".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraPorts {
    pub status: PortStatus,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsMatch {
    pub name: String,
    pub accuracy: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uptime {
    pub seconds: u64,
    pub last_boot: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCounts {
    pub up: u32,
    pub down: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub hosts: HostCounts,
    pub elapsed: Duration,
    /// Unix timestamp of the scan end.
    pub finished_at: Option<u64>,
    pub finished_str: Option<String>,
    pub summary: Option<String>,
    pub exit: ExitStatus,
    pub error_message: Option<String>,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", $what, other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Reachability of a host.
    HostStatus, "host state" {
        Up => "up",
        Down => "down",
        Unknown => "unknown",
        Skipped => "skipped",
    }
);

string_enum!(
    /// Exposure of a port as the scanner classified it.
    PortStatus, "port state" {
        Open => "open",
        Closed => "closed",
        Filtered => "filtered",
        Unfiltered => "unfiltered",
        OpenFiltered => "open|filtered",
        ClosedFiltered => "closed|filtered",
    }
);

string_enum!(
    Protocol, "protocol" {
        Tcp => "tcp",
        Udp => "udp",
        Sctp => "sctp",
        Ip => "ip",
    }
);

string_enum!(
    AddressKind, "address type" {
        Ipv4 => "ipv4",
        Ipv6 => "ipv6",
        Mac => "mac",
    }
);

string_enum!(
    /// How the scanner itself says the run ended.
    ExitStatus, "exit status" {
        Success => "success",
        Error => "error",
    }
);

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
