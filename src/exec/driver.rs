//! Driver capability contract shared by every execution backend.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::utils::exec::{CmdOutput, ExecError, strip_ansi};

/// String-keyed connection settings handed to a driver
/// (`host`, `port`, `user`, `password`, `database`, `path`).
pub type DriverConfig = BTreeMap<String, String>;

/// One row of tabular output, column name to typed value.
pub type Row = Map<String, Value>;

/// A pluggable backend that runs a text snippet.
///
/// Implementations must honor `deadline` themselves; the registry never
/// kills anything on a driver's behalf.
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    /// External program the driver shells out to, if any.
    fn program(&self) -> Option<&str> {
        None
    }

    fn execute(
        &self,
        deadline: Deadline,
        code: &str,
        config: &DriverConfig,
    ) -> Result<ExecResult, DriverError>;
}

// ============================================================================
// Result
// ============================================================================

/// Structured outcome of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecResult {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, rows: Vec<Row>) -> Self {
        self.data = Some(rows);
        self
    }

    /// Map a finished subprocess onto a result.
    ///
    /// Success keeps stdout followed by any stderr chatter. Failure keeps
    /// stdout as output and reports stderr (or the exit code) as the error.
    pub fn from_output(out: &CmdOutput) -> Self {
        let stdout = strip_ansi(&out.stdout).into_owned();
        let stderr = strip_ansi(&out.stderr).into_owned();

        if out.success() {
            let mut output = stdout;
            if !stderr.trim().is_empty() {
                output.push_str(&stderr);
            }
            return Self::ok(output);
        }

        let error = match stderr.trim() {
            "" => format!("exit status {}", out.code()),
            msg => msg.to_string(),
        };
        Self {
            success: false,
            output: stdout,
            data: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A driver could not produce a result at all.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("`{0}` not found in PATH")]
    MissingBinary(String),

    #[error("invalid driver config: {0}")]
    InvalidConfig(String),

    #[error("execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("deadline passed before execution started")]
    DeadlineExpired,

    #[error(transparent)]
    Exec(ExecError),
}

impl From<ExecError> for DriverError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Spawn { program, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::MissingBinary(program)
            }
            ExecError::TimedOut { after, .. } => Self::Timeout(after),
            other => Self::Exec(other),
        }
    }
}

// ============================================================================
// Deadline
// ============================================================================

/// Absolute point in time after which an execution must be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `timeout` from now; `None` if the instant is unrepresentable.
    pub fn after(timeout: Duration) -> Option<Self> {
        Instant::now().checked_add(timeout).map(|at| Self {
            at,
            budget: timeout,
        })
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Total time granted when the deadline was created.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(script: &str) -> CmdOutput {
        crate::utils::exec::Cmd::new("sh")
            .args(["-c", script])
            .run()
            .unwrap()
    }

    #[test]
    fn test_result_serialization_omits_empty() {
        let json = serde_json::to_string(&ExecResult::ok("hi")).unwrap();
        assert_eq!(json, r#"{"success":true,"output":"hi"}"#);

        let json = serde_json::to_string(&ExecResult::failed("driver not found: foo")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"driver not found: foo"}"#);
    }

    #[test]
    fn test_result_with_data() {
        let mut row = Row::new();
        row.insert("id".into(), Value::from(1));
        row.insert("name".into(), Value::from("Alice"));
        let json = serde_json::to_string(&ExecResult::ok("...").with_data(vec![row])).unwrap();
        assert_eq!(
            json,
            r#"{"success":true,"output":"...","data":[{"id":1,"name":"Alice"}]}"#
        );
    }

    #[test]
    fn test_from_output_success_appends_stderr() {
        let result = ExecResult::from_output(&output("printf out; printf warn >&2"));
        assert!(result.success);
        assert_eq!(result.output, "outwarn");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_output_failure_uses_stderr() {
        let result = ExecResult::from_output(&output("printf partial; echo boom >&2; exit 1"));
        assert!(!result.success);
        assert_eq!(result.output, "partial");
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_from_output_failure_without_stderr() {
        let result = ExecResult::from_output(&output("exit 7"));
        assert_eq!(result.error.as_deref(), Some("exit status 7"));
    }

    #[test]
    fn test_missing_binary_maps() {
        let err = crate::utils::exec::Cmd::new("no-such-binary-for-lectern")
            .run()
            .unwrap_err();
        assert!(matches!(
            DriverError::from(err),
            DriverError::MissingBinary(name) if name == "no-such-binary-for-lectern"
        ));
    }

    #[test]
    fn test_deadline() {
        let deadline = Deadline::after(Duration::from_secs(30)).unwrap();
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() <= Duration::from_secs(30));
        assert_eq!(deadline.budget(), Duration::from_secs(30));

        let expired = Deadline::after(Duration::ZERO).unwrap();
        assert!(expired.is_expired());
        assert_eq!(expired.remaining(), Duration::ZERO);
    }
}
