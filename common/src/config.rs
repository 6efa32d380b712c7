/// Front-end settings that shape how a scan is presented, not what is scanned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Skips the banner printed at start-up.
    pub no_banner: bool,
    /// 0 prints everything, 1 drops decorations, 2 prints only the summary.
    pub quiet: u8,
    /// Prints the scanner command line instead of running it.
    pub dry_run: bool,
}
