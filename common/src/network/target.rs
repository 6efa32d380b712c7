//! # Scan Target Model
//!
//! Defines the possible inputs for a network scan.
//!
//! This module handles parsing and representing targets, which can be:
//! * A single IP address (host).
//! * An IPv4 Range (e.g., `192.168.1.1-100` or `192.168.1.1-192.168.2.50`).
//! * A CIDR block (e.g., `192.168.1.0/24`, `fe80::/64`).
//! * An octet pattern understood by the scanner (e.g., `10.0.0-3.*`).
//! * A hostname (e.g., `scanme.nmap.org`).
//!
//! Every accepted target renders to one or more command-line arguments that
//! can never be mistaken for a flag.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use pnet::ipnetwork::Ipv6Network;

use crate::network::range::{self, Ipv4Range};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Represents a distinct target to be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSpec {
    /// Scan a single specific host.
    Host { target_addr: IpAddr },
    /// Scan an inclusive range of IPv4 addresses.
    Range { ipv4_range: Ipv4Range },
    /// Scan a whole network block.
    Cidr { network_addr: IpAddr, prefix: u8 },
    /// Octet pattern such as `192.168.0-255.1-254` or `10.0.*.1`.
    Pattern { pattern: String },
    /// A name resolved by the scanner itself.
    Hostname { name: String },
}

impl FromStr for TargetSpec {
    type Err = String;

    /// Parses a string into a `TargetSpec`.
    ///
    /// Supported formats:
    /// * **Host**: Single IPv4/IPv6 address (e.g., "192.168.1.5").
    /// * **Range**: "Start-End" (e.g., "192.168.1.1-50", "192.168.1.1-192.168.1.50").
    /// * **CIDR**: "Network/Prefix" (e.g., "192.168.1.0/24").
    /// * **Pattern**: per-octet ranges, lists and wildcards (e.g., "10.0.0-3.1,5,9").
    /// * **Hostname**: RFC 1123 host name (e.g., "localhost").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target cannot be empty".to_string());
        }

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_octet_pattern(s) {
            return Ok(target);
        }

        if let Some(target) = parse_hostname(s) {
            return Ok(target);
        }

        Err(format!("invalid target: {s}"))
    }
}

impl TargetSpec {
    /// Renders the target as scanner arguments.
    ///
    /// Ranges inside one /24 use the native octet syntax; wider ranges are
    /// split into the smallest set of covering CIDR blocks.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            TargetSpec::Host { target_addr } => vec![target_addr.to_string()],
            TargetSpec::Range { ipv4_range } => range_to_args(ipv4_range),
            TargetSpec::Cidr {
                network_addr,
                prefix,
            } => vec![format!("{network_addr}/{prefix}")],
            TargetSpec::Pattern { pattern } => vec![pattern.clone()],
            TargetSpec::Hostname { name } => vec![name.clone()],
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Host { target_addr } => write!(f, "{target_addr}"),
            TargetSpec::Range { ipv4_range } => write!(f, "{ipv4_range}"),
            TargetSpec::Cidr {
                network_addr,
                prefix,
            } => write!(f, "{network_addr}/{prefix}"),
            TargetSpec::Pattern { pattern } => write!(f, "{pattern}"),
            TargetSpec::Hostname { name } => write!(f, "{name}"),
        }
    }
}

fn range_to_args(ipv4_range: &Ipv4Range) -> Vec<String> {
    let start = ipv4_range.start_addr.octets();
    let end = ipv4_range.end_addr.octets();

    if ipv4_range.start_addr == ipv4_range.end_addr {
        return vec![ipv4_range.start_addr.to_string()];
    }

    if start[..3] == end[..3] {
        return vec![format!(
            "{}.{}.{}.{}-{}",
            start[0], start[1], start[2], start[3], end[3]
        )];
    }

    cidr_blocks(ipv4_range)
        .into_iter()
        .map(|(addr, prefix)| {
            if prefix == 32 {
                addr.to_string()
            } else {
                format!("{addr}/{prefix}")
            }
        })
        .collect()
}

/// Splits an inclusive range into aligned CIDR blocks, lowest address first.
fn cidr_blocks(ipv4_range: &Ipv4Range) -> Vec<(Ipv4Addr, u8)> {
    let mut blocks = Vec::new();
    let mut start: u64 = u64::from(u32::from(ipv4_range.start_addr));
    let end: u64 = u64::from(u32::from(ipv4_range.end_addr));

    while start <= end {
        let alignment: u32 = if start == 0 { 32 } else { start.trailing_zeros().min(32) };
        let mut size_bits: u32 = alignment;
        while size_bits > 0 && start + (1u64 << size_bits) - 1 > end {
            size_bits -= 1;
        }
        // start never exceeds u32::MAX inside the loop
        blocks.push((Ipv4Addr::from(start as u32), (32 - size_bits) as u8));
        start += 1u64 << size_bits;
    }

    blocks
}

/// Parses a single IP address.
fn parse_host(s: &str) -> Option<TargetSpec> {
    s.parse::<IpAddr>()
        .ok()
        .map(|target_addr| TargetSpec::Host { target_addr })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
///
/// Returns `Ok(None)` when the start is not a plain IPv4 address, so the
/// input can still be tried as an octet pattern.
fn parse_ip_range(s: &str) -> Result<Option<TargetSpec>, String> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let Ok(start_addr) = start_str.parse::<Ipv4Addr>() else {
        return Ok(None);
    };

    let end_addr = parse_range_end_addr(end_str, &start_addr, s)?;
    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    if ipv4_range.is_empty() {
        return Err(format!("Range end precedes range start: {s}"));
    }
    Ok(Some(TargetSpec::Range { ipv4_range }))
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err(format!("End range cannot be empty: {original_s}"));
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("Invalid end range '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("End range has too many octets: {end_str}"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24" or "fe80::/64".
fn parse_cidr_range(s: &str) -> Result<Option<TargetSpec>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let network_addr = ip_str
        .parse::<IpAddr>()
        .map_err(|e| format!("Invalid IP in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("Invalid prefix in CIDR '{prefix_str}': {e}"))?;

    match network_addr {
        IpAddr::V4(v4) => {
            range::cidr_range(v4, prefix)?;
        }
        IpAddr::V6(v6) => {
            Ipv6Network::new(v6, prefix).map_err(|e| e.to_string())?;
        }
    }

    Ok(Some(TargetSpec::Cidr {
        network_addr,
        prefix,
    }))
}

/// Parses per-octet IPv4 patterns: each of the four octets is `*` or a
/// comma separated list of numbers and `a-b` ranges.
fn parse_octet_pattern(s: &str) -> Option<TargetSpec> {
    let octets: Vec<&str> = s.split('.').collect();
    if octets.len() != 4 || !octets.iter().all(|octet| is_octet_expr(octet)) {
        return None;
    }

    Some(TargetSpec::Pattern {
        pattern: s.to_string(),
    })
}

fn is_octet_expr(octet: &str) -> bool {
    if octet == "*" {
        return true;
    }

    octet.split(',').all(|item| match item.split_once('-') {
        Some((low, high)) => match (low.parse::<u8>(), high.parse::<u8>()) {
            (Ok(low), Ok(high)) => low <= high,
            _ => false,
        },
        None => item.parse::<u8>().is_ok(),
    })
}

/// Parses an RFC 1123 host name. The last label must not be all digits,
/// which keeps malformed addresses such as "10.0.0.256" out.
fn parse_hostname(s: &str) -> Option<TargetSpec> {
    let name = s.strip_suffix('.').unwrap_or(s);
    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        return None;
    }

    let labels: Vec<&str> = name.split('.').collect();
    let valid_labels = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });

    let numeric_tld = labels
        .last()
        .is_some_and(|label| label.chars().all(|c| c.is_ascii_digit()));

    if !valid_labels || numeric_tld {
        return None;
    }

    Some(TargetSpec::Hostname {
        name: s.to_string(),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
