//! Wheelhouse CLI - coordinated wheel building agent
//!
//! Entry point: parses arguments, initializes tracing and dispatches to the
//! command handlers.

mod cli;
mod commands;
mod context;
mod output;
mod version;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Match(args) => commands::matcher::run(args),
        Commands::Claim(args) => commands::claim::claim(args, &cli.agent),
        Commands::Release(args) => commands::claim::release(args, &cli.agent),
        Commands::Claims(args) => commands::claims::run(args, &cli.agent),
        Commands::Gc(args) => commands::gc::run(args, &cli.agent),
        Commands::Pending(command) => commands::pending::run(command, &cli.agent),
        Commands::Build(args) => commands::build::run(args, &cli.agent).await,
        Commands::Next(args) => commands::build::next(args, &cli.agent).await,
        Commands::Config(command) => commands::config::run(command, &cli.agent),
        Commands::Runtimes(args) => commands::runtimes::run(args, &cli.agent),
    }
}

/// Initialize tracing with appropriate verbosity.
///
/// An explicit `RUST_LOG` wins over the verbosity flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("info"),
                1 => EnvFilter::new("debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
