mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, discover, info};
use netsweep_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();
    let cfg: Config = commands.to_config();

    logging::init_logging(commands.verbose);
    print::banner(commands.no_banner, cfg.quiet);

    match commands.command {
        Commands::Info => {
            print::header("local network", cfg.quiet);
            info::info(&cfg)
        }
        Commands::Discover => {
            print::header("getting ready for discovery", cfg.quiet);
            discover::discover(&cfg).await
        }
    }
}
