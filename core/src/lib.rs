//! # nmapr core
//!
//! Drives the external `nmap` executable:
//!
//! * [`command`]: turns a [`ScanRequest`](nmapr_common::options::ScanRequest) into an argument vector.
//! * [`runner`]: runs the executable under a cancellation token.
//! * [`parser`]: decodes the XML report into a [`ScanResult`](nmapr_common::result::ScanResult).
//! * [`scanner`]: ties the stages together behind a small state machine.

pub mod command;
pub mod parser;
pub mod runner;
pub mod scanner;

pub use scanner::{ScanReport, Scanner, ScannerState};
