//! # Result Filters
//!
//! Host and port predicates applied to a parsed [`ScanResult`].
//!
//! A filter is any type implementing [`HostFilter`] or [`PortFilter`]; the
//! concrete filters below cover the common cases. The [`FilterPipeline`]
//! applies them in registration order and always returns a new result: the
//! original, including its [`Stats`](crate::result::Stats), is left untouched.
//!
//! Port filters run first, inside every host. Host filters then see the host
//! with its already filtered ports, which keeps the pipeline idempotent for
//! stateless filters.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::result::{Host, HostStatus, Port, PortStatus, Protocol, ScanResult};

pub trait HostFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, host: &Host) -> bool;
}

pub trait PortFilter: Send + Sync + fmt::Debug {
    fn accepts(&self, port: &Port) -> bool;
}

/// Keeps hosts whose status is one of `statuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStatusFilter {
    pub statuses: Vec<HostStatus>,
}

impl HostStatusFilter {
    pub fn only(status: HostStatus) -> Self {
        Self {
            statuses: vec![status],
        }
    }
}

impl HostFilter for HostStatusFilter {
    fn accepts(&self, host: &Host) -> bool {
        self.statuses.contains(&host.status)
    }
}

/// Keeps hosts that carry at least one of `addresses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddressFilter {
    pub addresses: Vec<IpAddr>,
}

impl HostFilter for HostAddressFilter {
    fn accepts(&self, host: &Host) -> bool {
        host.addresses.iter().any(|address| {
            address
                .addr
                .parse::<IpAddr>()
                .is_ok_and(|ip| self.addresses.contains(&ip))
        })
    }
}

/// Keeps hosts with at least `min_ports` ports left after port filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasPortsFilter {
    pub min_ports: usize,
}

impl Default for HasPortsFilter {
    fn default() -> Self {
        Self { min_ports: 1 }
    }
}

impl HostFilter for HasPortsFilter {
    fn accepts(&self, host: &Host) -> bool {
        host.ports.len() >= self.min_ports
    }
}

/// Keeps ports whose status is one of `statuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStateFilter {
    pub statuses: Vec<PortStatus>,
}

impl PortStateFilter {
    pub fn only(status: PortStatus) -> Self {
        Self {
            statuses: vec![status],
        }
    }
}

impl PortFilter for PortStateFilter {
    fn accepts(&self, port: &Port) -> bool {
        self.statuses.contains(&port.status)
    }
}

/// Keeps ports inside the inclusive range `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRangeFilter {
    pub start: u16,
    pub end: u16,
}

impl PortFilter for PortRangeFilter {
    fn accepts(&self, port: &Port) -> bool {
        (self.start..=self.end).contains(&port.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortProtocolFilter {
    pub protocol: Protocol,
}

impl PortFilter for PortProtocolFilter {
    fn accepts(&self, port: &Port) -> bool {
        port.protocol == self.protocol
    }
}

/// Keeps ports whose detected service name matches, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNameFilter {
    pub name: String,
}

impl PortFilter for ServiceNameFilter {
    fn accepts(&self, port: &Port) -> bool {
        port.service
            .as_ref()
            .is_some_and(|service| service.name.eq_ignore_ascii_case(&self.name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    host_filters: Vec<Arc<dyn HostFilter>>,
    port_filters: Vec<Arc<dyn PortFilter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_host_filter(&mut self, filter: impl HostFilter + 'static) {
        self.host_filters.push(Arc::new(filter));
    }

    pub fn add_port_filter(&mut self, filter: impl PortFilter + 'static) {
        self.port_filters.push(Arc::new(filter));
    }

    pub fn with_host_filter(mut self, filter: impl HostFilter + 'static) -> Self {
        self.add_host_filter(filter);
        self
    }

    pub fn with_port_filter(mut self, filter: impl PortFilter + 'static) -> Self {
        self.add_port_filter(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.host_filters.is_empty() && self.port_filters.is_empty()
    }

    /// Builds the filtered view of `result`. Stats are copied unchanged.
    pub fn apply(&self, result: &ScanResult) -> ScanResult {
        let hosts: Vec<Host> = result
            .hosts
            .iter()
            .filter_map(|host| {
                let host = self.filter_ports(host);
                self.host_filters
                    .iter()
                    .all(|filter| filter.accepts(&host))
                    .then_some(host)
            })
            .collect();

        ScanResult {
            hosts,
            ..result.clone()
        }
    }

    fn filter_ports(&self, host: &Host) -> Host {
        let ports: Vec<Port> = host
            .ports
            .iter()
            .filter(|port| self.port_filters.iter().all(|filter| filter.accepts(port)))
            .cloned()
            .collect();

        Host {
            ports,
            ..host.clone()
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
