mod commands;
mod terminal;

use commands::{CommandLine, Commands, scan, version};
use nmapr_common::config::Config;
use terminal::{print, spinner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    spinner::init_logging(commands.quiet);

    let mut cfg = Config {
        no_banner: commands.no_banner,
        quiet: commands.quiet,
        dry_run: false,
    };
    print::banner(cfg.no_banner, cfg.quiet);

    match commands.command {
        Commands::Scan(args) => {
            cfg.dry_run = args.dry_run;
            print::header("starting scanner", cfg.quiet);
            scan::scan(&args, &cfg).await
        }
        Commands::Version { binary } => version::version(&binary, &cfg).await,
    }
}
