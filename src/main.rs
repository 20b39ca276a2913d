//! Lectern - live preview and code execution for markdown presentations.

#![allow(dead_code)]

mod actor;
mod cli;
mod config;
mod core;
mod exec;
mod gateway;
mod logger;
mod reload;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Serve { args } => cli::serve::serve_deck(args, config_path),
        Commands::Exec { args } => cli::exec::run_exec(args, config_path),
        Commands::Drivers { dir } => cli::drivers::list_drivers(dir.as_deref(), config_path),
    }
}
