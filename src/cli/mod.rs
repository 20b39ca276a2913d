//! Command-line interface module.

mod args;
pub mod drivers;
pub mod exec;
pub mod serve;

pub use args::{Cli, Commands, ExecArgs, ServeArgs};
