//! Shapecache CLI - shape text through the sub-segment cache and inspect it

mod cli;
mod commands;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Shape(args) => commands::shape::run(args),
        Commands::Classify(args) => commands::classify::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
