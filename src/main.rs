mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &args.command {
        Commands::Apply { dry_run } => {
            cli::commands::apply::execute(&args.manifest, *dry_run, args.verbose, args.quiet)
        }
        Commands::Check => cli::commands::check::execute(&args.manifest, args.verbose, args.quiet),
        Commands::List { user } => cli::commands::list::execute(&args.manifest, user),
        Commands::Log { user, last } => {
            cli::commands::log::execute(&args.manifest, user.as_deref(), *last)
        }
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
