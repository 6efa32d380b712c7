//! Shared building blocks for `nmapr`.
//!
//! * [`options`]: the validated [`options::ScanRequest`] and its builder.
//! * [`network`]: target and port specifications accepted by the scanner.
//! * [`result`]: the typed model of a finished scan.
//! * [`filter`]: host and port predicates applied to a parsed result.
//! * [`error`]: the error taxonomy shared by every crate in the workspace.

pub mod config;
pub mod error;
pub mod filter;
pub mod network;
pub mod options;
pub mod result;
