//! # Error Taxonomy
//!
//! Every failure a scan can run into is reported as a single [`ScanError`].
//! The variants map onto the stages of a scan:
//!
//! * [`ScanError::Configuration`]: an option was rejected before anything ran.
//! * [`ScanError::Build`]: options are individually valid but cannot be combined.
//! * [`ScanError::Launch`] / [`ScanError::Process`]: the external scanner could not
//!   be started or exited with a failure.
//! * [`ScanError::Cancelled`]: the caller stopped the scan (or its deadline passed).
//! * [`ScanError::Parse`]: the scanner's output could not be decoded.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid option `{option}`: {reason}")]
    Configuration { option: &'static str, reason: String },

    #[error("incompatible options: {0}")]
    Build(String),

    #[error("failed to launch `{binary}`: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scanner exited with {}: {stderr}", exit_label(.code))]
    Process { code: Option<i32>, stderr: String },

    #[error("scan {reason}")]
    Cancelled {
        reason: CancelReason,
        /// Whatever the scanner wrote to stderr before it was stopped.
        /// Diagnostic only, never a result.
        diagnostics: String,
    },

    #[error("malformed scanner output at {location}: {message}")]
    Parse {
        location: ParseLocation,
        message: String,
    },
}

impl ScanError {
    pub fn config(option: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            option,
            reason: reason.into(),
        }
    }

    pub fn parse_at(offset: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            location: ParseLocation::Offset(offset),
            message: message.into(),
        }
    }

    pub fn parse_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            location: ParseLocation::Field(field.into()),
            message: message.into(),
        }
    }

    /// True for both launch failures and non-zero exits.
    pub fn is_process_failure(&self) -> bool {
        matches!(self, Self::Launch { .. } | Self::Process { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The configured scan timeout elapsed.
    TimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "cancelled"),
            CancelReason::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Where in the scanner output a decoding failure was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseLocation {
    /// Byte offset into the raw output.
    Offset(u64),
    /// Path of the offending element or attribute, e.g. `host[0].ports.port[1].state`.
    Field(String),
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseLocation::Offset(offset) => write!(f, "byte {offset}"),
            ParseLocation::Field(field) => write!(f, "field `{field}`"),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
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
