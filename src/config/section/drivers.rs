//! `[drivers]` section configuration.
//!
//! Per-driver timeouts and named connections, plus user-defined drivers.
//!
//! # Example
//!
//! ```toml
//! [drivers.postgres]
//! timeout = 10
//!
//! [drivers.postgres.connections.local]
//! host = "localhost"
//! port = 5432
//! user = "me"
//! password = "$PG_PASSWORD"     # expanded from the environment at load
//! database = "demo"
//!
//! [drivers.sqlite.connections.default]
//! path = "demo.db"              # relative to the deck directory
//!
//! [drivers.custom.python]
//! command = "python3"
//! args = ["-c"]
//! ```
//!
//! A request naming no connection uses `default` if present, or the only
//! connection when exactly one is configured.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::exec::DriverConfig;
use crate::log;

/// Name of the connection used when a request names none.
pub const DEFAULT_CONNECTION: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// User-defined drivers, `[drivers.custom.<name>]`.
    pub custom: BTreeMap<String, CustomDriverConfig>,

    /// Settings for built-in drivers, `[drivers.<name>]`.
    #[serde(flatten)]
    pub builtin: BTreeMap<String, DriverSection>,
}

/// `[drivers.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSection {
    /// Timeout override in seconds.
    pub timeout: Option<u64>,

    pub connections: BTreeMap<String, ConnectionConfig>,
}

/// `[drivers.<name>.connections.<connection>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub path: Option<String>,
}

/// `[drivers.custom.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomDriverConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Timeout override in seconds.
    pub timeout: Option<u64>,
}

impl DriversConfig {
    /// Per-driver timeout override, if any.
    pub fn timeout(&self, driver: &str) -> Option<Duration> {
        self.builtin
            .get(driver)
            .and_then(|section| section.timeout)
            .or_else(|| self.custom.get(driver).and_then(|custom| custom.timeout))
            .map(Duration::from_secs)
    }

    /// Resolve the connection settings for one request.
    ///
    /// Returns `None` only when `name` is given and not configured for
    /// `driver`. Without a name, an absent connection yields empty settings.
    pub fn connection(&self, driver: &str, name: Option<&str>) -> Option<DriverConfig> {
        let connections = self.builtin.get(driver).map(|section| &section.connections);

        match name {
            Some(name) => connections?.get(name).map(ConnectionConfig::to_driver_config),
            None => {
                let Some(connections) = connections else {
                    return Some(DriverConfig::new());
                };
                let fallback = match connections.get(DEFAULT_CONNECTION) {
                    Some(conn) => Some(conn),
                    None if connections.len() == 1 => connections.values().next(),
                    None => None,
                };
                Some(fallback.map(ConnectionConfig::to_driver_config).unwrap_or_default())
            }
        }
    }

    /// Expand `$VAR`, `${VAR}` and `~` in connection values and custom commands.
    pub fn expand_env(&mut self) {
        for section in self.builtin.values_mut() {
            for conn in section.connections.values_mut() {
                conn.expand_env();
            }
        }
        for custom in self.custom.values_mut() {
            custom.command = expand(&custom.command);
        }
    }
}

impl ConnectionConfig {
    /// Flatten into the string map drivers consume. Unset fields are absent.
    pub fn to_driver_config(&self) -> DriverConfig {
        let mut config = DriverConfig::new();
        let fields = [
            ("host", self.host.clone()),
            ("port", self.port.map(|port| port.to_string())),
            ("user", self.user.clone()),
            ("password", self.password.clone()),
            ("database", self.database.clone()),
            ("path", self.path.clone()),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                config.insert(key.to_string(), value);
            }
        }
        config
    }

    fn expand_env(&mut self) {
        for field in [
            &mut self.host,
            &mut self.user,
            &mut self.password,
            &mut self.database,
            &mut self.path,
        ] {
            if let Some(value) = field.as_mut() {
                *value = expand(value);
            }
        }
    }
}

/// Expand a config value; an unset variable leaves the value untouched.
fn expand(value: &str) -> String {
    match shellexpand::full(value) {
        Ok(expanded) => expanded.into_owned(),
        Err(err) => {
            log!("warning"; "cannot expand `{}`: {}", value, err);
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::test_parse_config;

    const SAMPLE: &str = r#"
[drivers.postgres]
timeout = 10

[drivers.postgres.connections.local]
host = "localhost"
port = 5432
user = "me"
password = "pw"
database = "demo"

[drivers.postgres.connections.staging]
host = "staging.internal"

[drivers.sqlite.connections.notes]
path = "notes.db"

[drivers.custom.python]
command = "python3"
args = ["-c"]
timeout = 3
"#;

    #[test]
    fn test_parse_drivers() {
        let config = test_parse_config(SAMPLE);
        let drivers = &config.drivers;

        assert_eq!(drivers.builtin.len(), 2);
        assert_eq!(drivers.custom["python"].command, "python3");
        assert_eq!(drivers.custom["python"].args, ["-c"]);
        assert_eq!(
            drivers.builtin["postgres"].connections["local"].port,
            Some(5432)
        );
    }

    #[test]
    fn test_timeout_overrides() {
        let config = test_parse_config(SAMPLE);
        assert_eq!(config.drivers.timeout("postgres"), Some(Duration::from_secs(10)));
        assert_eq!(config.drivers.timeout("python"), Some(Duration::from_secs(3)));
        assert_eq!(config.drivers.timeout("sqlite"), None);
        assert_eq!(config.drivers.timeout("shell"), None);
    }

    #[test]
    fn test_named_connection() {
        let config = test_parse_config(SAMPLE);
        let conn = config.drivers.connection("postgres", Some("local")).unwrap();

        assert_eq!(conn["host"], "localhost");
        assert_eq!(conn["port"], "5432");
        assert_eq!(conn["password"], "pw");
        assert!(!conn.contains_key("path"));
    }

    #[test]
    fn test_unknown_connection() {
        let config = test_parse_config(SAMPLE);
        assert!(config.drivers.connection("postgres", Some("prod")).is_none());
        assert!(config.drivers.connection("shell", Some("local")).is_none());
    }

    #[test]
    fn test_unnamed_connection_fallbacks() {
        let config = test_parse_config(SAMPLE);

        // Single connection is used implicitly
        let conn = config.drivers.connection("sqlite", None).unwrap();
        assert_eq!(conn["path"], "notes.db");

        // Several connections, none named default: empty settings
        assert!(config.drivers.connection("postgres", None).unwrap().is_empty());

        // Unconfigured driver: empty settings
        assert!(config.drivers.connection("shell", None).unwrap().is_empty());
    }

    #[test]
    fn test_default_connection_preferred() {
        let config = test_parse_config(
            "[drivers.mysql.connections.default]\nhost = \"a\"\n[drivers.mysql.connections.other]\nhost = \"b\"",
        );
        let conn = config.drivers.connection("mysql", None).unwrap();
        assert_eq!(conn["host"], "a");
    }

    #[test]
    fn test_env_expansion() {
        // SAFETY: test-local variable name, no other thread reads it
        unsafe { std::env::set_var("LECTERN_TEST_DB_PASSWORD", "from-env") };

        let mut config = test_parse_config(
            "[drivers.postgres.connections.local]\npassword = \"${LECTERN_TEST_DB_PASSWORD}\"\nuser = \"$LECTERN_TEST_UNSET_VAR\"",
        );
        config.drivers.expand_env();

        let conn = config.drivers.connection("postgres", Some("local")).unwrap();
        assert_eq!(conn["password"], "from-env");
        assert_eq!(conn["user"], "$LECTERN_TEST_UNSET_VAR");
    }
}
