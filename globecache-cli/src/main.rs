//! GlobeCache CLI - Command-line interface
//!
//! This binary provides a command-line interface to the GlobeCache library.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::quadkey::QuadkeyCommands;

#[derive(Parser)]
#[command(name = "globecache")]
#[command(version, about = "Quadtree tile addressing, caching and fetching for virtual globes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect quadkeys and convert positions to quadkeys
    #[command(subcommand)]
    Quadkey(QuadkeyCommands),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Fetch terrain blocks through the configured layers
    Fetch(FetchArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Quadkey(command) => commands::quadkey::run(command),
        Commands::Config(command) => commands::config::run(command),
        Commands::Fetch(args) => commands::fetch::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
