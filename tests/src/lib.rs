//! End-to-end tests that run the scanner as a real child process.
//!
//! Most tests use small shell scripts standing in for `nmap`, so they only
//! need a Unix shell. Tests against a real `nmap` skip themselves when the
//! executable is not installed.

pub mod util;

#[cfg(all(test, unix))]
mod scan {
    mod integration;
    mod stub;
}
