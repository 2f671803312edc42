mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    export, import, init, list, migrate, validate, ExportArgs, ImportArgs, InitArgs, ListArgs,
    MigrateArgs, ValidateArgs,
};

/// Formsmith CLI - manage saved forms and field schemas
#[derive(Parser, Debug)]
#[command(name = "formsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Formsmith project
    Init(InitArgs),

    /// Check saved forms or schemas without changing them
    Validate(ValidateArgs),

    /// Upgrade a saved form to the current schema version
    Migrate(MigrateArgs),

    /// Convert a saved form to a declarative field schema
    Export(ExportArgs),

    /// Turn a field schema (or saved form) into a saved form
    Import(ImportArgs),

    /// List saved forms, newest first
    List(ListArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .context("Cannot get current directory")
        .and_then(|cwd| match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Validate(args) => validate(args, &cwd),
            Command::Migrate(args) => migrate(args, &cwd),
            Command::Export(args) => export(args, &cwd),
            Command::Import(args) => import(args, &cwd),
            Command::List(args) => list(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
