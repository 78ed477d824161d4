mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, replay, simulate, CheckArgs, ReplayArgs, SimulateArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Folio CLI - structured document editing tools
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding folio.config.json (defaults to the current directory)
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate document JSON files against the schema
    Check(CheckArgs),

    /// Apply a step log to a document
    Replay(ReplayArgs),

    /// Run concurrent clients against an in-process authority
    Simulate(SimulateArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = cli
        .cwd
        .map(Ok)
        .unwrap_or_else(std::env::current_dir)
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Check(args) => check(args, &cwd),
            Command::Replay(args) => replay(args, &cwd),
            Command::Simulate(args) => simulate(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
