//! `postgres` driver via `psql` in CSV mode.

use super::{param, table, to_result};
use crate::exec::driver::{Deadline, Driver, DriverConfig, DriverError, ExecResult};
use crate::utils::exec::Cmd;

pub const POSTGRES_DRIVER: &str = "postgres";

pub struct PostgresDriver {
    program: String,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self {
            program: "psql".to_string(),
        }
    }

    /// `-X` skips `~/.psqlrc`, `-w` never prompts for a password and
    /// `ON_ERROR_STOP` turns the first SQL error into a non-zero exit.
    fn command(&self, code: &str, config: &DriverConfig) -> Cmd {
        let mut cmd = Cmd::new(&self.program).args(["--csv", "-X", "-w", "-v", "ON_ERROR_STOP=1"]);
        for (key, flag) in [("host", "-h"), ("port", "-p"), ("user", "-U"), ("database", "-d")] {
            if let Some(value) = param(config, key) {
                cmd = cmd.arg(flag).arg(value);
            }
        }
        if let Some(password) = param(config, "password") {
            cmd = cmd.env("PGPASSWORD", password);
        }
        cmd.arg("-c").arg(code)
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for PostgresDriver {
    fn name(&self) -> &str {
        POSTGRES_DRIVER
    }

    fn program(&self) -> Option<&str> {
        Some(&self.program)
    }

    fn execute(
        &self,
        deadline: Deadline,
        code: &str,
        config: &DriverConfig,
    ) -> Result<ExecResult, DriverError> {
        let output = self
            .command(code, config)
            .deadline(deadline.instant())
            .run()?;

        Ok(to_result(&output, table::parse_csv_rows))
    }
}
