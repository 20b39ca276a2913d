//! `sqlite` driver via the `sqlite3` CLI in JSON mode.

use std::path::PathBuf;

use super::{required, table, to_result};
use crate::exec::driver::{Deadline, Driver, DriverConfig, DriverError, ExecResult};
use crate::utils::exec::Cmd;

pub const SQLITE_DRIVER: &str = "sqlite";

pub struct SqliteDriver {
    program: String,
    root: PathBuf,
}

impl SqliteDriver {
    /// Relative database paths resolve against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            program: "sqlite3".to_string(),
            root: root.into(),
        }
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        SQLITE_DRIVER
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
        let database = self.root.join(required(config, "path", SQLITE_DRIVER)?);

        let output = Cmd::new(&self.program)
            .args(["-json", "-bail"])
            .arg(&database)
            .stdin(code)
            .cwd(&self.root)
            .deadline(deadline.instant())
            .run()?;

        Ok(to_result(&output, table::parse_json_rows))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_path_required() {
        let driver = SqliteDriver::new(std::env::temp_dir());
        let err = driver
            .execute(deadline(), "select 1", &DriverConfig::new())
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidConfig(_)));
    }

    #[test]
    fn test_query_returns_rows() {
        if which::which("sqlite3").is_err() {
            return;
        }
        let temp = tempfile::TempDir::new().unwrap();
        let driver = SqliteDriver::new(temp.path());
        let mut config = DriverConfig::new();
        config.insert("path".into(), "demo.db".into());

        let result = driver
            .execute(
                deadline(),
                "create table t(id integer, name text); \
                 insert into t values (1, 'Alice'); \
                 select id, name from t;",
                &config,
            )
            .unwrap();

        assert!(result.success, "{result:?}");
        let rows = result.data.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["name"], "Alice");
    }

    #[test]
    fn test_sql_error_is_failed_result() {
        if which::which("sqlite3").is_err() {
            return;
        }
        let temp = tempfile::TempDir::new().unwrap();
        let driver = SqliteDriver::new(temp.path());
        let mut config = DriverConfig::new();
        config.insert("path".into(), "demo.db".into());

        let result = driver
            .execute(deadline(), "select * from missing;", &config)
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("missing"));
    }
}
