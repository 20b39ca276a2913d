//! Drivers command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::config::{PresentationConfig, ServeOverrides};
use crate::exec::Registry;
use crate::utils::plural::plural_count;

/// One registered driver and whether its program resolves on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverStatus {
    pub name: String,
    pub program: Option<String>,
    pub available: bool,
}

/// Inspect every driver in the registry.
pub fn driver_statuses(registry: &Registry) -> Vec<DriverStatus> {
    registry
        .names()
        .into_iter()
        .filter_map(|name| {
            let driver = registry.get(&name)?;
            let program = driver.program().map(str::to_string);
            let available = program
                .as_deref()
                .is_none_or(|program| which::which(program).is_ok());
            Some(DriverStatus {
                name,
                program,
                available,
            })
        })
        .collect()
}

/// Run `lectern drivers`.
pub fn list_drivers(dir: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let root = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let config = PresentationConfig::load_in(&root, config_path, &ServeOverrides::default())?;
    let statuses = driver_statuses(&Registry::from_config(&config));

    for status in &statuses {
        let mark = if status.available {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        let program = match (&status.program, status.available) {
            (Some(program), true) => program.dimmed().to_string(),
            (Some(program), false) => format!("{program} not found").yellow().to_string(),
            (None, _) => String::new(),
        };
        println!("{mark} {:<10} {program}", status.name);
    }

    let missing = statuses.iter().filter(|s| !s.available).count();
    if missing > 0 {
        println!("\n{} unavailable", plural_count(missing, "driver"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CustomDriver, ShellDriver};

    #[test]
    fn test_statuses_follow_path_lookup() {
        let dir = std::env::temp_dir();
        let mut registry = Registry::new();
        registry.register(ShellDriver::new("sh", &dir));
        registry.register(CustomDriver::new(
            "ghost",
            "lectern-no-such-program",
            Vec::new(),
            &dir,
        ));

        let statuses = driver_statuses(&registry);
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "ghost");
        assert!(!statuses[0].available);
        assert_eq!(statuses[1].name, "shell");
        assert!(statuses[1].available);
        assert_eq!(statuses[1].program.as_deref(), Some("sh"));
    }
}
