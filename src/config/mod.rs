//! Presentation configuration management for `lectern.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── drivers    # [drivers.<name>], [drivers.custom.<name>]
//! │   ├── execute    # [execute]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError
//! │   └── handle     # PresentationStore (arc-swap snapshot)
//! └── mod.rs         # PresentationConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section                    | Purpose                                     |
//! |----------------------------|---------------------------------------------|
//! | `[serve]`                  | Preview server (ports, interface, watch)    |
//! | `[execute]`                | Global execution timeout, shell             |
//! | `[drivers.<name>]`         | Timeout override and named connections      |
//! | `[drivers.custom.<name>]`  | User-defined command drivers                |
//!
//! The file is optional. It is looked up next to the deck, then in each
//! parent directory, unless `--config` names one explicitly.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    ConnectionConfig, CustomDriverConfig, DriverSection, DriversConfig, ExecuteConfig,
    ServeConfig,
};
pub use types::{ConfigError, Presentation, PresentationStore};

use std::{
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::exec::SHELL_DRIVER;
use crate::exec::sql::{MYSQL_DRIVER, POSTGRES_DRIVER, SQLITE_DRIVER};
use crate::log;
use crate::utils::path::{normalize_path, parent_dir};

/// Default config file name.
pub const CONFIG_FILE: &str = "lectern.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing lectern.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory containing the deck (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Execution defaults
    #[serde(default)]
    pub execute: ExecuteConfig,

    /// Per-driver settings and custom drivers
    #[serde(default)]
    pub drivers: DriversConfig,
}

/// Serve options given on the command line; they win over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServeOverrides {
    pub interface: Option<IpAddr>,
    pub port: Option<u16>,
    pub ws_port: Option<u16>,
    pub watch: Option<bool>,
}

impl ServeOverrides {
    fn apply(&self, serve: &mut ServeConfig) {
        update_option(&mut serve.interface, self.interface.as_ref());
        update_option(&mut serve.port, self.port.as_ref());
        update_option(&mut serve.ws_port, self.ws_port.as_ref());
        update_option(&mut serve.watch, self.watch.as_ref());
    }
}

/// Update config option if CLI value is provided.
fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
    if let Some(option) = cli_option {
        *config_option = option.clone();
    }
}

impl PresentationConfig {
    /// Load the configuration for `deck`.
    ///
    /// `explicit` must exist when given. Without it, a missing file means
    /// defaults.
    pub fn load(deck: &Path, explicit: Option<&Path>, overrides: &ServeOverrides) -> Result<Self> {
        Self::load_in(&parent_dir(deck), explicit, overrides)
    }

    /// Load the configuration for a deck directory (or any working directory
    /// when no deck is involved, as for `lectern exec`).
    pub fn load_in(root: &Path, explicit: Option<&Path>, overrides: &ServeOverrides) -> Result<Self> {
        let root = normalize_path(root);

        let config_path = match explicit {
            Some(path) => Some(normalize_path(path)),
            None => find_config_file(&root, Path::new(CONFIG_FILE)),
        };

        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        config.config_path = config_path;
        config.root = root;
        config.drivers.expand_env();
        overrides.apply(&mut config.serve);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::from)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    ///
    /// Serving never prompts: the file is re-read on every save.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} ignored: {}", display_path, fields.join(", "));
    }

    /// Effective timeout for `driver`: its override, else `[execute] timeout`.
    pub fn timeout_for(&self, driver: &str) -> Duration {
        self.drivers
            .timeout(driver)
            .unwrap_or_else(|| self.execute.timeout())
    }

    /// Join a path with the deck directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the whole file, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.serve.port == self.serve.ws_port {
            problems.push(format!(
                "`serve.port` and `serve.ws_port` are both {}",
                self.serve.port
            ));
        }
        if self.execute.timeout == 0 {
            problems.push("`execute.timeout` must be at least 1 second".to_string());
        }
        if self.execute.shell.trim().is_empty() {
            problems.push("`execute.shell` is empty".to_string());
        }

        for (name, section) in &self.drivers.builtin {
            if section.timeout == Some(0) {
                problems.push(format!("`drivers.{name}.timeout` must be at least 1 second"));
            }
        }

        const BUILTIN: [&str; 4] = [SHELL_DRIVER, SQLITE_DRIVER, MYSQL_DRIVER, POSTGRES_DRIVER];
        for (name, custom) in &self.drivers.custom {
            if BUILTIN.contains(&name.as_str()) {
                problems.push(format!("`drivers.custom.{name}` shadows a built-in driver"));
            }
            if custom.command.trim().is_empty() {
                problems.push(format!("`drivers.custom.{name}.command` is empty"));
            }
            if custom.timeout == Some(0) {
                problems.push(format!("`drivers.custom.{name}.timeout` must be at least 1 second"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PresentationConfig {
    let (parsed, ignored) = PresentationConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = PresentationConfig::from_str("[serve\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config() {
        let config = PresentationConfig::default();
        assert!(config.config_path.is_none());
        assert_eq!(config.serve.port, 5277);
        assert_eq!(config.execute.timeout, 30);
        assert!(config.drivers.builtin.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[serve]\nport = 8000\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = PresentationConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.serve.port, 8000);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_timeout_for() {
        let config = test_parse_config("[execute]\ntimeout = 20\n[drivers.postgres]\ntimeout = 5");
        assert_eq!(config.timeout_for("postgres"), Duration::from_secs(5));
        assert_eq!(config.timeout_for("shell"), Duration::from_secs(20));
    }

    #[test]
    fn test_validate_collects_problems() {
        let config = test_parse_config(
            "[serve]\nport = 9000\nws_port = 9000\n[execute]\ntimeout = 0\n[drivers.custom.shell]\ncommand = \"\"",
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("ws_port"));
        assert!(err.contains("execute.timeout"));
        assert!(err.contains("shadows"));
        assert!(err.contains("command` is empty"));
    }

    #[test]
    fn test_load_without_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let deck = dir.path().join("talk.md");
        fs::write(&deck, "# Hello").unwrap();

        let config = PresentationConfig::load(&deck, None, &ServeOverrides::default()).unwrap();
        assert!(config.config_path.is_none());
        assert_eq!(config.root, normalize_path(dir.path()));
        assert_eq!(config.serve, ServeConfig::default());
    }

    #[test]
    fn test_load_next_to_deck_with_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let deck = dir.path().join("talk.md");
        fs::write(&deck, "# Hello").unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[serve]\nport = 8000\nwatch = false").unwrap();

        let overrides = ServeOverrides {
            port: Some(9000),
            ..Default::default()
        };
        let config = PresentationConfig::load(&deck, None, &overrides).unwrap();

        assert!(config.config_path.is_some());
        assert_eq!(config.serve.port, 9000);
        assert!(!config.serve.watch);
    }

    #[test]
    fn test_load_explicit_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let deck = dir.path().join("talk.md");
        let missing = dir.path().join("nope.toml");

        let err = PresentationConfig::load(&deck, Some(&missing), &ServeOverrides::default())
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_load_in_finds_parent_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("demos/sql");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[execute]\ntimeout = 12").unwrap();

        let config = PresentationConfig::load_in(&nested, None, &ServeOverrides::default()).unwrap();
        assert_eq!(config.execute.timeout, 12);
        assert_eq!(config.root, normalize_path(&nested));
    }

    #[test]
    fn test_root_join() {
        let mut config = PresentationConfig::default();
        config.root = PathBuf::from("/decks/talk");
        assert_eq!(config.root_join("demo.db"), PathBuf::from("/decks/talk/demo.db"));
    }
}
