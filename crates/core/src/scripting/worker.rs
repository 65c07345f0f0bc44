//! A script process kept alive across requests.
//!
//! The child reads one JSON request per stdin line and answers each with one
//! JSON object on its own stdout line. Other stdout lines (progress bars,
//! library banners) are skipped. Stderr is drained in the background and its
//! tail kept for error reports.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::executor::ScriptError;

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 40;

/// How long a worker gets to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type StderrTail = Arc<Mutex<VecDeque<String>>>;

/// A running child speaking line-delimited JSON.
///
/// Dropping the worker kills the child.
pub struct ScriptWorker {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_tail: StderrTail,
    stderr_task: Option<JoinHandle<()>>,
}

impl ScriptWorker {
    /// Spawn `cmd` with piped stdio.
    pub fn spawn(cmd: &mut Command) -> Result<Self, ScriptError> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let program = cmd.as_std().get_program().to_string_lossy().into_owned();
        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScriptError::NotFound(program.clone()),
            _ => ScriptError::IoError(e),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScriptError::IoError(std::io::Error::other("child stdout not piped")))?;
        let stdin = child.stdin.take();

        let stderr_tail: StderrTail = Arc::new(Mutex::new(VecDeque::new()));
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(drain_stderr(stderr, Arc::clone(&stderr_tail))));

        tracing::debug!(%program, pid = ?child.id(), "Script worker started");

        Ok(Self {
            program,
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr_tail,
            stderr_task,
        })
    }

    /// Send one request and wait for its reply.
    ///
    /// With `timeout` set, a reply that does not arrive in time kills the
    /// child; later requests on this worker then fail.
    pub async fn request<T, R>(&mut self, payload: &T, timeout: Option<Duration>) -> Result<R, ScriptError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let reply = match timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, self.exchange(payload)).await;
                match outcome {
                    Ok(reply) => reply?,
                    Err(_) => {
                        let elapsed_ms = start.elapsed().as_millis() as u64;
                        tracing::warn!(program = %self.program, elapsed_ms, "Script worker timed out, killing child");
                        let _ = self.child.start_kill();
                        return Err(ScriptError::Timeout { elapsed_ms });
                    }
                }
            }
            None => self.exchange(payload).await?,
        };

        tracing::debug!(
            program = %self.program,
            duration_ms = start.elapsed().as_millis() as u64,
            "Script worker replied"
        );
        serde_json::from_value(reply).map_err(|e| ScriptError::InvalidOutput(e.to_string()))
    }

    /// The last lines the child wrote to stderr.
    pub fn stderr_tail(&self) -> String {
        let tail = self.stderr_tail.lock().unwrap_or_else(PoisonError::into_inner);
        tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    /// Close stdin and wait for the child to exit, killing it after a grace
    /// period.
    pub async fn shutdown(mut self) {
        drop(self.stdin.take());
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(program = %self.program, exit_code = ?status.code(), "Script worker exited");
            }
            _ => {
                tracing::warn!(program = %self.program, "Script worker did not exit, killing it");
                let _ = self.child.kill().await;
            }
        }
    }

    async fn exchange<T: Serialize>(&mut self, payload: &T) -> Result<Value, ScriptError> {
        let mut line = serde_json::to_vec(payload)
            .map_err(|e| ScriptError::InvalidOutput(format!("unserializable payload: {e}")))?;
        line.push(b'\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ScriptError::IoError(std::io::Error::other("worker stdin closed")))?;
        let written = async {
            stdin.write_all(&line).await?;
            stdin.flush().await
        }
        .await;
        if let Err(err) = written {
            // A dead child shows up as a broken pipe; report how it exited.
            return Err(match err.kind() {
                std::io::ErrorKind::BrokenPipe => self.exited().await,
                _ => ScriptError::IoError(err),
            });
        }

        while let Some(line) = self.stdout.next_line().await.map_err(ScriptError::IoError)? {
            match serde_json::from_str::<Value>(line.trim()) {
                Ok(reply @ Value::Object(_)) => return Ok(reply),
                _ => tracing::debug!(program = %self.program, output = %line, "Skipping worker output"),
            }
        }

        Err(self.exited().await)
    }

    /// Error for a child whose stdout closed before it answered.
    async fn exited(&mut self) -> ScriptError {
        let exit_code = match self.child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(err) => return ScriptError::IoError(err),
        };
        if let Some(task) = self.stderr_task.take() {
            let _ = task.await;
        }
        tracing::warn!(program = %self.program, exit_code, "Script worker exited before replying");
        ScriptError::ExecutionFailed {
            exit_code,
            stderr: self.stderr_tail(),
        }
    }
}

async fn drain_stderr(stderr: ChildStderr, tail: StderrTail) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(stderr = %line, "Script worker output");
        let mut kept = tail.lock().unwrap_or_else(PoisonError::into_inner);
        if kept.len() == STDERR_TAIL_LINES {
            kept.pop_front();
        }
        kept.push_back(line);
    }
}
