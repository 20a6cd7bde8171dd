//! Harbour Translate CLI - convert between C/C++ build descriptions

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.global.verbose {
        EnvFilter::new("harbour_translate=debug")
    } else {
        EnvFilter::new("harbour_translate=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.global.no_color)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Detect(args) => commands::detect::execute(args),
        Commands::Import(args) => commands::import::execute(args, &cli.global),
        Commands::Export(args) => commands::export::execute(args, &cli.global),
        Commands::Convert(args) => commands::convert::execute(args, &cli.global),
    }
}
