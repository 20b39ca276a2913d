//! User-defined drivers: a command plus a fixed argument prefix, with the
//! snippet appended as the final argument.
//!
//! ```toml
//! [drivers.custom.python]
//! command = "python3"
//! args = ["-c"]
//! ```

use std::path::PathBuf;

use super::driver::{Deadline, Driver, DriverConfig, DriverError, ExecResult};
use crate::utils::exec::Cmd;

pub struct CustomDriver {
    name: String,
    command: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CustomDriver {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            cwd: cwd.into(),
        }
    }
}

impl Driver for CustomDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> Option<&str> {
        Some(&self.command)
    }

    fn execute(
        &self,
        deadline: Deadline,
        code: &str,
        _config: &DriverConfig,
    ) -> Result<ExecResult, DriverError> {
        if self.command.trim().is_empty() {
            return Err(DriverError::InvalidConfig(format!(
                "driver `{}` has an empty command",
                self.name
            )));
        }

        let output = Cmd::new(&self.command)
            .args(&self.args)
            .arg(code)
            .cwd(&self.cwd)
            .deadline(deadline.instant())
            .run()?;

        Ok(ExecResult::from_output(&output))
    }
}
