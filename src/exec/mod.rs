//! Execution registry: name-keyed table of code execution backends.
//!
//! # Module Structure
//!
//! ```text
//! exec/
//! ├── driver     # Driver trait, ExecResult, DriverError, Deadline
//! ├── shell      # `shell`: <shell> -c <code>
//! ├── sql/       # `sqlite`, `mysql`, `postgres` via their CLI clients
//! ├── custom     # [drivers.custom.<name>] command + arg prefix
//! └── redact     # credential scrubbing for error text
//! ```
//!
//! The table is filled once at startup and only read afterwards, so lookups
//! from concurrent requests need no locking.

pub mod custom;
pub mod driver;
pub mod redact;
pub mod shell;
pub mod sql;

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use custom::CustomDriver;
pub use driver::{Deadline, Driver, DriverConfig, DriverError, ExecResult, Row};
pub use shell::{SHELL_DRIVER, ShellDriver};
pub use sql::{MysqlDriver, PostgresDriver, SqliteDriver};

use crate::config::PresentationConfig;
use crate::debug;

/// Name-keyed table of drivers.
#[derive(Default, Clone)]
pub struct Registry {
    drivers: FxHashMap<String, Arc<dyn Driver>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in drivers: `shell` (using `shell` as interpreter), `sqlite`,
    /// `mysql` and `postgres`. Relative paths resolve against `root`.
    pub fn with_defaults(shell: &str, root: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(ShellDriver::new(shell, root));
        registry.register(SqliteDriver::new(root));
        registry.register(MysqlDriver::new());
        registry.register(PostgresDriver::new());
        registry
    }

    /// Built-ins plus every `[drivers.custom.<name>]` entry.
    pub fn from_config(config: &PresentationConfig) -> Self {
        let mut registry = Self::with_defaults(&config.execute.shell, &config.root);
        for (name, custom) in &config.drivers.custom {
            registry.register(CustomDriver::new(
                name.as_str(),
                custom.command.as_str(),
                custom.args.clone(),
                &config.root,
            ));
        }
        registry
    }

    /// Add a driver under its own name, replacing any previous one.
    pub fn register(&mut self, driver: impl Driver + 'static) {
        let name = driver.name().to_string();
        if self.drivers.insert(name.clone(), Arc::new(driver)).is_some() {
            debug!("exec"; "driver `{}` replaced", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.drivers.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Run `code` with the named driver.
    ///
    /// Never fails: an unknown name, an expired deadline, a driver error and
    /// a panicking driver all come back as a failed [`ExecResult`]. Error text
    /// has the connection password masked.
    pub fn execute(
        &self,
        deadline: Deadline,
        name: &str,
        code: &str,
        config: &DriverConfig,
    ) -> ExecResult {
        let Some(driver) = self.drivers.get(name) else {
            return ExecResult::failed(format!("driver not found: {name}"));
        };

        if deadline.is_expired() {
            return ExecResult::failed(DriverError::DeadlineExpired.to_string());
        }

        debug!("exec"; "{} ({} bytes, budget {}ms)", name, code.len(), deadline.budget().as_millis());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            driver.execute(deadline, code, config)
        }));

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => ExecResult::failed(err.to_string()),
            Err(_) => ExecResult::failed(format!("driver `{name}` panicked")),
        };

        if let Some(error) = result.error.take() {
            result.error = Some(redact::redact(&error, config));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;

    /// Records whether it ran; optionally fails or panics.
    struct Stub {
        name: &'static str,
        mode: StubMode,
        calls: Arc<AtomicUsize>,
    }

    enum StubMode {
        Echo,
        Fail,
        Panic,
    }

    impl Stub {
        fn new(name: &'static str, mode: StubMode) -> Self {
            Self {
                name,
                mode,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Driver for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn execute(
            &self,
            _deadline: Deadline,
            code: &str,
            config: &DriverConfig,
        ) -> Result<ExecResult, DriverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                StubMode::Echo => Ok(ExecResult::ok(code)),
                StubMode::Fail => Err(DriverError::InvalidConfig(format!(
                    "bad login {}:{}",
                    config.get("user").map_or("", String::as_str),
                    config.get("password").map_or("", String::as_str),
                ))),
                StubMode::Panic => panic!("stub exploded"),
            }
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register(Stub::new("echo", StubMode::Echo));

        assert!(registry.has("echo"));
        assert!(!registry.has("nope"));
        assert_eq!(registry.get("echo").unwrap().name(), "echo");
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_defaults_sorted_names() {
        let registry = Registry::with_defaults("sh", &std::env::temp_dir());
        assert_eq!(registry.names(), ["mysql", "postgres", "shell", "sqlite"]);
    }

    #[test]
    fn test_unknown_driver_is_failed_result() {
        let registry = Registry::with_defaults("sh", &std::env::temp_dir());
        let result = registry.execute(deadline(), "cobol", "DISPLAY 'HI'", &DriverConfig::new());
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("driver not found: cobol"));
    }

    #[test]
    fn test_expired_deadline_skips_driver() {
        let stub = Stub::new("echo", StubMode::Echo);
        let calls = Arc::clone(&stub.calls);
        let mut registry = Registry::new();
        registry.register(stub);

        let expired = Deadline::after(Duration::ZERO).unwrap();
        let result = registry.execute(expired, "echo", "x", &DriverConfig::new());
        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry.execute(deadline(), "echo", "x", &DriverConfig::new());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shell_background_job_bounded_by_deadline() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = Registry::with_defaults("sh", dir.path());
        let deadline = Deadline::after(Duration::from_millis(500)).unwrap();

        let started = Instant::now();
        let result = registry.execute(deadline, "shell", "sleep 6 & printf hi", &DriverConfig::new());
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_driver_error_redacted() {
        let mut registry = Registry::new();
        registry.register(Stub::new("db", StubMode::Fail));

        let mut config = DriverConfig::new();
        config.insert("user".into(), "me".into());
        config.insert("password".into(), "hunter2".into());

        let result = registry.execute(deadline(), "db", "select 1", &config);
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(!error.contains("hunter2"), "{error}");
        assert!(error.contains("me:****"));
    }

    #[test]
    fn test_panicking_driver_contained() {
        let mut registry = Registry::new();
        registry.register(Stub::new("boom", StubMode::Panic));
        registry.register(Stub::new("echo", StubMode::Echo));

        let result = registry.execute(deadline(), "boom", "x", &DriverConfig::new());
        assert!(!result.success);
        assert!(result.error.unwrap().contains("panicked"));

        // Registry still usable afterwards
        let result = registry.execute(deadline(), "echo", "still here", &DriverConfig::new());
        assert_eq!(result, ExecResult::ok("still here"));
    }

    #[test]
    fn test_shell_printf() {
        let registry = Registry::with_defaults("sh", &std::env::temp_dir());
        let result = registry.execute(deadline(), SHELL_DRIVER, "printf hi", &DriverConfig::new());
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"success":true,"output":"hi"}"#
        );
    }

    #[test]
    fn test_shell_timeout_within_budget() {
        let registry = Registry::with_defaults("sh", &std::env::temp_dir());
        let started = Instant::now();
        let result = registry.execute(
            Deadline::after(Duration::from_millis(300)).unwrap(),
            SHELL_DRIVER,
            "sleep 10",
            &DriverConfig::new(),
        );
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
        assert!(started.elapsed() < Duration::from_millis(300) + Duration::from_secs(1));
    }

    #[test]
    fn test_concurrent_executions() {
        let registry = Arc::new(Registry::with_defaults("sh", &std::env::temp_dir()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.execute(
                        deadline(),
                        SHELL_DRIVER,
                        &format!("printf {i}"),
                        &DriverConfig::new(),
                    )
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().output, i.to_string());
        }
    }
}
