pub mod scan;
pub mod version;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use nmapr_common::options::DEFAULT_BINARY;

use scan::ScanArgs;

#[derive(Parser)]
#[command(name = "nmapr")]
#[command(about = "Runs nmap scans and reports typed, filtered results.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Reduce output; repeat for less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan one or more targets with nmap
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Show the version of the nmap executable
    #[command(alias = "v")]
    Version {
        /// Path to the nmap executable
        #[arg(long = "nmap", default_value = DEFAULT_BINARY)]
        binary: PathBuf,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
