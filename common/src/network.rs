//! # Network Specifications
//!
//! Typed forms of the values handed to the scanner on its command line:
//! * [`target::TargetSpec`]: what to scan.
//! * [`port::PortSpec`]: which ports to probe.
//! * [`range::Ipv4Range`]: an inclusive IPv4 range used by both.

pub mod port;
pub mod range;
pub mod target;
