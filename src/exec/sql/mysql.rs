//! `mysql` driver via the `mysql` CLI in batch mode.

use super::{param, table, to_result};
use crate::exec::driver::{Deadline, Driver, DriverConfig, DriverError, ExecResult};
use crate::utils::exec::Cmd;

pub const MYSQL_DRIVER: &str = "mysql";

pub struct MysqlDriver {
    program: String,
}

impl MysqlDriver {
    pub fn new() -> Self {
        Self {
            program: "mysql".to_string(),
        }
    }

    /// Builds the client invocation. The password goes through `MYSQL_PWD`
    /// so it never shows up in the process list.
    fn command(&self, code: &str, config: &DriverConfig) -> Cmd {
        let mut cmd = Cmd::new(&self.program).arg("--batch");
        for (key, flag) in [("host", "-h"), ("port", "-P"), ("user", "-u"), ("database", "-D")] {
            if let Some(value) = param(config, key) {
                cmd = cmd.arg(flag).arg(value);
            }
        }
        if let Some(password) = param(config, "password") {
            cmd = cmd.env("MYSQL_PWD", password);
        }
        cmd.stdin(code)
    }
}

impl Default for MysqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MysqlDriver {
    fn name(&self) -> &str {
        MYSQL_DRIVER
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

        Ok(to_result(&output, table::parse_tsv_rows))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::tests::fake_client;
    use super::*;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10)).unwrap()
    }

    fn full_config() -> DriverConfig {
        let mut config = DriverConfig::new();
        config.insert("host".into(), "db.local".into());
        config.insert("port".into(), "3307".into());
        config.insert("user".into(), "me".into());
        config.insert("password".into(), "hunter2".into());
        config.insert("database".into(), "demo".into());
        config
    }

    #[test]
    fn test_connection_params_as_args_and_env() {
        let temp = tempfile::TempDir::new().unwrap();
        let client = fake_client(
            temp.path(),
            r#"printf '%s ' "$@"; printf 'pwd=%s stdin=' "$MYSQL_PWD"; cat"#,
        );
        let driver = MysqlDriver {
            program: client.display().to_string(),
        };

        let result = driver
            .execute(deadline(), "select 1", &full_config())
            .unwrap();
        assert_eq!(
            result.output,
            "--batch -h db.local -P 3307 -u me -D demo pwd=hunter2 stdin=select 1"
        );
    }

    #[test]
    fn test_batch_output_parsed() {
        let temp = tempfile::TempDir::new().unwrap();
        let client = fake_client(temp.path(), r#"printf 'id\tname\n1\tAlice\n2\tNULL\n'"#);
        let driver = MysqlDriver {
            program: client.display().to_string(),
        };

        let result = driver
            .execute(deadline(), "select id, name from t", &DriverConfig::new())
            .unwrap();
        let rows = result.data.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["name"], "Alice");
        assert!(rows[1]["name"].is_null());
    }

    #[test]
    fn test_missing_client_is_missing_binary() {
        let driver = MysqlDriver {
            program: "no-such-mysql-client".to_string(),
        };
        let err = driver
            .execute(deadline(), "select 1", &DriverConfig::new())
            .unwrap_err();
        assert!(matches!(err, DriverError::MissingBinary(name) if name == "no-such-mysql-client"));
    }
}
