//! Subprocess plumbing shared by the script runtimes.
//!
//! [`run_command`] takes a prepared [`Command`], pipes the JSON payload to
//! stdin, drains stdout/stderr concurrently and enforces the timeout.

use std::process::Stdio;
use std::time::Instant;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::executor::{ScriptError, ScriptInput, ScriptOutput};

/// Cap on captured bytes per stream (4 MiB). Model libraries can be chatty.
const MAX_OUTPUT_BYTES: u64 = 4 * 1024 * 1024;

/// Run `cmd` with the arguments and stdin payload from `input`.
///
/// The child is killed if it outlives `input.timeout`.
pub async fn run_command(
    cmd: &mut Command,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    cmd.args(&input.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScriptError::NotFound(program.clone()),
        _ => ScriptError::IoError(e),
    })?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = serde_json::to_vec(&input.data)
            .map_err(|e| ScriptError::InvalidOutput(format!("unserializable payload: {e}")))?;
        // The child may exit without reading stdin; a broken pipe is not an error.
        let _ = stdin.write_all(&payload).await;
    }

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = match tokio::time::timeout(input.timeout, child.wait()).await {
        Ok(status) => status.map_err(ScriptError::IoError)?,
        Err(_) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            tracing::warn!(%program, elapsed_ms, "Script timed out, killing child");
            return Err(ScriptError::Timeout { elapsed_ms });
        }
    };

    let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();
    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = status.code().unwrap_or(-1);

    tracing::debug!(%program, exit_code, duration_ms, "Script finished");

    Ok(ScriptOutput {
        parsed_output: last_json_line(&stdout),
        stdout,
        stderr,
        exit_code,
        duration_ms,
    })
}

/// The whole of stdout if it is JSON, else the last line that is.
fn last_json_line(stdout: &str) -> Option<Value> {
    serde_json::from_str(stdout.trim()).ok().or_else(|| {
        stdout
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .find_map(|line| serde_json::from_str(line).ok())
    })
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}
