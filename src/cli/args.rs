//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::ServeOverrides;

/// Lectern live presentation server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Config file path (default: lectern.toml next to the deck or above it)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve a deck with live reload and code execution
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Run one snippet through a driver and print the result
    #[command(visible_alias = "x")]
    Exec {
        #[command(flatten)]
        args: ExecArgs,
    },

    /// List registered drivers and whether their programs are installed
    #[command(visible_alias = "d")]
    Drivers {
        /// Directory whose lectern.toml defines custom drivers
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Markdown deck to present
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub deck: PathBuf,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// HTTP port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// WebSocket port for live reload
    #[arg(long = "ws-port")]
    pub ws_port: Option<u16>,

    /// Enable file watching for live reload
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub watch: Option<bool>,
}

impl ServeArgs {
    pub fn overrides(&self) -> ServeOverrides {
        ServeOverrides {
            interface: self.interface,
            port: self.port,
            ws_port: self.ws_port,
            watch: self.watch,
        }
    }
}

/// Exec command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ExecArgs {
    /// Driver name (shell, sqlite, mysql, postgres or a custom driver)
    pub driver: String,

    /// Code to run. Use `-` to read it from stdin
    pub code: String,

    /// Named connection from `[drivers.<driver>.connections]`
    #[arg(short = 'n', long)]
    pub connection: Option<String>,

    /// Deck whose directory provides config and relative paths
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub deck: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[allow(unused)]
impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_exec(&self) -> bool {
        matches!(self.command, Commands::Exec { .. })
    }
    pub const fn is_drivers(&self) -> bool {
        matches!(self.command, Commands::Drivers { .. })
    }
}
