//! Shared types for running external scripts.
//!
//! A script receives a JSON payload on stdin and reports back on stdout.
//! [`ScriptInput`] describes one invocation, [`ScriptOutput`] what came back.
//! Long-running scripts that answer many requests go through
//! [`ScriptWorker`](super::worker::ScriptWorker) instead.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Input for one script invocation.
#[derive(Debug, Clone)]
pub struct ScriptInput {
    /// JSON payload written to the child's stdin.
    pub data: Value,
    /// Extra command line arguments after the script path.
    pub args: Vec<String>,
    /// Wall-clock limit before the child is killed.
    pub timeout: Duration,
}

impl ScriptInput {
    /// Input carrying `data` with no extra arguments.
    pub fn new(data: Value, timeout: Duration) -> Self {
        Self {
            data,
            args: Vec::new(),
            timeout,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Captured result of a finished script.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by a signal).
    pub exit_code: i32,
    pub duration_ms: u64,
    /// The last stdout line that parsed as JSON, if any.
    pub parsed_output: Option<Value>,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into [`ScriptError::ExecutionFailed`].
    pub fn into_success(self) -> Result<Self, ScriptError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ScriptError::ExecutionFailed {
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }

    /// Deserialize the parsed JSON output into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ScriptError> {
        let value = self.parsed_output.clone().ok_or_else(|| {
            ScriptError::InvalidOutput(format!("no JSON on stdout: {}", self.stdout.trim()))
        })?;
        serde_json::from_value(value).map_err(|e| ScriptError::InvalidOutput(e.to_string()))
    }
}

/// Errors from spawning or running a script.
#[derive(Debug)]
pub enum ScriptError {
    /// The script or interpreter was not found.
    NotFound(String),
    /// The script exceeded its timeout and was killed.
    Timeout {
        elapsed_ms: u64,
    },
    /// The script exited with a non-zero code.
    ExecutionFailed {
        exit_code: i32,
        stderr: String,
    },
    /// The script succeeded but its stdout was not what the caller expected.
    InvalidOutput(String),
    /// A long-running script answered a request with an error message.
    Reported(String),
    /// Spawning or talking to the process failed.
    IoError(std::io::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Script not found: {path}"),
            Self::Timeout { elapsed_ms } => write!(f, "Script timed out after {elapsed_ms}ms"),
            Self::ExecutionFailed { exit_code, stderr } => {
                write!(f, "Script failed with exit code {exit_code}: {}", stderr.trim())
            }
            Self::InvalidOutput(msg) => write!(f, "Unexpected script output: {msg}"),
            Self::Reported(msg) => write!(f, "Script reported an error: {msg}"),
            Self::IoError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            _ => None,
        }
    }
}
