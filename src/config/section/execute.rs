//! `[execute]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [execute]
//! timeout = 30      # seconds, used when a driver has no override
//! shell = "sh"      # interpreter for the `shell` driver
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteConfig {
    /// Global execution timeout in seconds.
    pub timeout: u64,

    /// Program used as `<shell> -c <code>`.
    pub shell: String,
}

impl ExecuteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            shell: "sh".to_string(),
        }
    }
}
