//! Exec command implementation.
//!
//! Runs one snippet through the same registry, connection lookup and timeout
//! resolution the execute endpoint uses, then prints the result.

use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::args::ExecArgs;
use crate::config::{PresentationConfig, ServeOverrides};
use crate::debug;
use crate::exec::{ExecResult, Registry};
use crate::gateway::resolve;
use crate::utils::path::parent_dir;

/// Run `lectern exec`. Fails (non-zero exit) when the execution fails.
pub fn run_exec(args: &ExecArgs, config_path: Option<&Path>) -> Result<()> {
    let root = match &args.deck {
        Some(deck) => parent_dir(deck),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let config = PresentationConfig::load_in(&root, config_path, &ServeOverrides::default())?;
    let code = read_code(&args.code)?;

    let result = execute(&config, args, &code)?;
    print_result(&result, args.json)?;

    match result.error {
        Some(error) if !result.success => bail!("{}", error),
        _ => Ok(()),
    }
}

fn execute(config: &PresentationConfig, args: &ExecArgs, code: &str) -> Result<ExecResult> {
    let registry = Registry::from_config(config);
    if !registry.has(&args.driver) {
        bail!(
            "driver not found: {} (available: {})",
            args.driver,
            registry.names().join(", ")
        );
    }

    let plan = resolve(config, &args.driver, args.connection.as_deref())?;

    debug!("exec"; "{} with {}s timeout", args.driver, plan.timeout.as_secs());
    Ok(registry.execute(plan.deadline, &args.driver, code, &plan.settings))
}

/// `-` reads the snippet from stdin.
fn read_code(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut code = String::new();
    io::stdin()
        .read_to_string(&mut code)
        .context("failed to read code from stdin")?;
    Ok(code)
}

fn print_result(result: &ExecResult, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();

    if json {
        serde_json::to_writer_pretty(&mut stdout, result)?;
        writeln!(stdout)?;
        return Ok(());
    }

    match &result.data {
        Some(rows) => {
            serde_json::to_writer_pretty(&mut stdout, rows)?;
            writeln!(stdout)?;
        }
        None => {
            stdout.write_all(result.output.as_bytes())?;
            if !result.output.is_empty() && !result.output.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }
    stdout.flush()?;
    Ok(())
}
