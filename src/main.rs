use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod matching;
mod model;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("lod_matcher=debug,info")
    } else {
        EnvFilter::new("lod_matcher=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Match(args) => {
            cli::match_cmd::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Inspect(args) => {
            cli::inspect::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
