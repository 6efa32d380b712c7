use std::path::Path;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use nmapr_common::config::Config;
use nmapr_core::runner::{Executor, ProcessRunner};

use crate::terminal::print;

/// Prints the first line of `nmap --version`, e.g. "Nmap version 7.94 ( https://nmap.org )".
pub async fn version(binary: &Path, cfg: &Config) -> anyhow::Result<()> {
    let runner = ProcessRunner::new(binary);
    let output = runner
        .execute(&["--version".to_string()], &CancellationToken::new())
        .await
        .with_context(|| format!("could not query {}", binary.display()))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().find(|line| !line.trim().is_empty()).unwrap_or("unknown version");

    print::header("scanner", cfg.quiet);
    print::aligned_line("nmapr", env!("CARGO_PKG_VERSION"));
    print::aligned_line("binary", binary.display().to_string());
    print::aligned_line("nmap", line.trim());
    Ok(())
}
