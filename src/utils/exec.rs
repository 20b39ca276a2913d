//! External command execution utilities.
//!
//! Provides a Builder-based API for running subprocesses with captured
//! output, stdin piping, and an optional hard deadline.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Simple command
//! Cmd::new("sh").args(["-c", "echo hi"]).run()?;
//!
//! // With working directory and deadline
//! Cmd::new("psql")
//!     .args(["--csv", "-c", query])
//!     .env("PGPASSWORD", password)
//!     .cwd(root)
//!     .deadline(deadline)
//!     .run()?;
//! ```

use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::{Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::OnceLock,
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use thiserror::Error;

/// How often a deadline-bound child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Subprocess failures that happen before or instead of a normal exit.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {}ms", .after.as_millis())]
    TimedOut { program: String, after: Duration },

    #[error("i/o error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `-1` when killed by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    stdin_data: Option<Vec<u8>>,
    deadline: Option<Instant>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["python3", "-c"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument. Empty strings are kept: an empty snippet is
    /// still a meaningful final argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_owned());
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set one environment variable for the subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Kill the process (and its process group) if it runs past `deadline`.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Get the program name for error messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and capture its output.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    pub fn run(self) -> Result<CmdOutput, ExecError> {
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        // Own process group so a timeout also reaps grandchildren
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: name.clone(),
            source,
        })?;

        if let Some(data) = self.stdin_data
            && let Some(mut stdin) = child.stdin.take()
        {
            // Detached: a grandchild may keep the pipe open without reading.
            // Broken pipe is fine, the child may not read its input.
            std::thread::spawn(move || {
                let _ = stdin.write_all(&data);
            });
        }
        let stdout_rx = spawn_reader(child.stdout.take());
        let stderr_rx = spawn_reader(child.stderr.take());

        let status = match self.deadline {
            Some(deadline) => match wait_until(&mut child, deadline) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    kill_tree(&mut child);
                    return Err(ExecError::TimedOut {
                        program: name,
                        after: started.elapsed(),
                    });
                }
                Err(source) => {
                    kill_tree(&mut child);
                    return Err(ExecError::Io {
                        program: name,
                        source,
                    });
                }
            },
            None => child.wait().map_err(|source| ExecError::Io {
                program: name.clone(),
                source,
            })?,
        };

        // The leader is gone, but a background grandchild may still hold the
        // pipes. The deadline covers draining them too.
        match (
            collect(stdout_rx, self.deadline),
            collect(stderr_rx, self.deadline),
        ) {
            (Ok(stdout), Ok(stderr)) => Ok(CmdOutput {
                status,
                stdout,
                stderr,
            }),
            _ => {
                kill_group(child.id());
                Err(ExecError::TimedOut {
                    program: name,
                    after: started.elapsed(),
                })
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = channel::bounded(1);
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Wait for a reader to hit EOF, at most until `deadline`.
fn collect(
    rx: Option<Receiver<Vec<u8>>>,
    deadline: Option<Instant>,
) -> Result<String, RecvTimeoutError> {
    let Some(rx) = rx else {
        return Ok(String::new());
    };
    let bytes = match deadline {
        Some(deadline) => match rx.recv_deadline(deadline) {
            Ok(bytes) => bytes,
            Err(RecvTimeoutError::Timeout) => return Err(RecvTimeoutError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
        },
        None => rx.recv().unwrap_or_default(),
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Poll the child until it exits or the deadline passes (`Ok(None)`).
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill the child and everything in its process group, then reap it.
fn kill_tree(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// SIGKILL the process group created by `process_group(0)` at spawn.
///
/// Still reaches the group after the leader exited, as long as any member
/// is alive.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(pid) = i32::try_from(pid) {
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Strip ANSI escape codes from string.
pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ansi regex"));
    re.replace_all(s, "")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_args_kept() {
        let cmd = Cmd::from_slice(&["python3", "-c"]).arg("");
        assert_eq!(cmd.program, OsString::from("python3"));
        assert_eq!(cmd.args, vec![OsString::from("-c"), OsString::new()]);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_simple_command() {
        let output = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[test]
    fn test_stdin_pipe() {
        let output = Cmd::new("cat").stdin(b"test data").run().unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "test data");
    }

    #[test]
    fn test_nonzero_exit_is_output() {
        let output = Cmd::new("sh").args(["-c", "echo oops >&2; exit 3"]).run().unwrap();
        assert!(!output.success());
        assert_eq!(output.code(), 3);
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn test_missing_binary() {
        let err = Cmd::new("definitely-not-a-real-binary-xyz").run().unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_deadline_kills_process() {
        let started = Instant::now();
        let err = Cmd::new("sh")
            .args(["-c", "sleep 5"])
            .deadline(Instant::now() + Duration::from_millis(200))
            .run()
            .unwrap_err();

        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_deadline_covers_background_grandchild() {
        let started = Instant::now();
        let err = Cmd::new("sh")
            .args(["-c", "sleep 6 & printf hi"])
            .deadline(Instant::now() + Duration::from_millis(500))
            .run()
            .unwrap_err();

        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_detached_grandchild_without_pipes_is_fine() {
        let output = Cmd::new("sh")
            .args(["-c", "sleep 3 >/dev/null 2>&1 & printf ok"])
            .deadline(Instant::now() + Duration::from_secs(2))
            .run()
            .unwrap();
        assert_eq!(output.stdout, "ok");
    }

    #[test]
    fn test_deadline_not_hit() {
        let output = Cmd::new("sh")
            .args(["-c", "printf ok"])
            .deadline(Instant::now() + Duration::from_secs(5))
            .run()
            .unwrap();
        assert_eq!(output.stdout, "ok");
    }
}
