//! `shell` driver: runs the snippet as a script via the system shell.

use std::path::{Path, PathBuf};

use super::driver::{Deadline, Driver, DriverConfig, DriverError, ExecResult};
use crate::utils::exec::Cmd;

pub const SHELL_DRIVER: &str = "shell";

pub struct ShellDriver {
    shell: String,
    cwd: PathBuf,
}

impl ShellDriver {
    /// `shell` is invoked as `<shell> -c <code>` inside `cwd`.
    pub fn new(shell: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            cwd: cwd.into(),
        }
    }

    /// A `path` entry overrides the working directory, relative to the default.
    fn working_dir(&self, config: &DriverConfig) -> PathBuf {
        match config.get("path") {
            Some(path) if !path.is_empty() => self.cwd.join(Path::new(path)),
            _ => self.cwd.clone(),
        }
    }
}

impl Driver for ShellDriver {
    fn name(&self) -> &str {
        SHELL_DRIVER
    }

    fn program(&self) -> Option<&str> {
        Some(&self.shell)
    }

    fn execute(
        &self,
        deadline: Deadline,
        code: &str,
        config: &DriverConfig,
    ) -> Result<ExecResult, DriverError> {
        let output = Cmd::new(&self.shell)
            .arg("-c")
            .arg(code)
            .cwd(self.working_dir(config))
            .deadline(deadline.instant())
            .run()?;

        Ok(ExecResult::from_output(&output))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_printf() {
        let temp = tempfile::TempDir::new().unwrap();
        let driver = ShellDriver::new("sh", temp.path());
        let result = driver
            .execute(deadline(), "printf hi", &DriverConfig::new())
            .unwrap();
        assert_eq!(result, ExecResult::ok("hi"));
    }

    #[test]
    fn test_runs_in_working_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("data.txt"), "from disk").unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/inner.txt"), "nested").unwrap();

        let driver = ShellDriver::new("sh", temp.path());
        let result = driver
            .execute(deadline(), "cat data.txt", &DriverConfig::new())
            .unwrap();
        assert_eq!(result.output, "from disk");

        let mut config = DriverConfig::new();
        config.insert("path".into(), "sub".into());
        let result = driver.execute(deadline(), "cat inner.txt", &config).unwrap();
        assert_eq!(result.output, "nested");
    }

    #[test]
    fn test_exit_code_maps_to_failure() {
        let driver = ShellDriver::new("sh", std::env::temp_dir());
        let result = driver
            .execute(deadline(), "echo nope >&2; exit 2", &DriverConfig::new())
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("nope"));
    }

    #[test]
    fn test_timeout() {
        let driver = ShellDriver::new("sh", std::env::temp_dir());
        let started = Instant::now();
        let err = driver
            .execute(
                Deadline::after(Duration::from_millis(200)).unwrap(),
                "sleep 10",
                &DriverConfig::new(),
            )
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_missing_shell() {
        let driver = ShellDriver::new("/nonexistent/shell", std::env::temp_dir());
        let err = driver
            .execute(deadline(), "true", &DriverConfig::new())
            .unwrap_err();
        assert!(matches!(err, DriverError::MissingBinary(_)));
    }
}
