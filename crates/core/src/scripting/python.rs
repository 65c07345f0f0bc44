//! Python runtime with optional virtual environment management.
//!
//! Without a requirements file scripts run on the configured interpreter
//! (`python3` by default). With one, a venv is created under the base
//! directory, keyed by the SHA-256 of the requirements contents, and reused
//! until the requirements change.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::process::Command;

use super::executor::{ScriptError, ScriptInput, ScriptOutput};
use super::subprocess;
use super::worker::ScriptWorker;

/// Interpreter used when none is configured.
pub const DEFAULT_PYTHON: &str = "python3";

/// Runs Python scripts on a fixed interpreter.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    interpreter: PathBuf,
}

impl PythonRuntime {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Use the interpreter inside an existing venv directory.
    pub fn from_venv(venv_dir: &Path) -> Self {
        Self::new(venv_dir.join("bin").join("python"))
    }

    /// Create (or reuse) a venv for `requirements` under `venv_base_dir`,
    /// bootstrapped from `base_interpreter`.
    pub async fn with_requirements(
        base_interpreter: &Path,
        requirements: &Path,
        venv_base_dir: &Path,
    ) -> Result<Self, ScriptError> {
        let hash = hash_requirements(requirements).await?;
        let venv_dir = ensure_venv(base_interpreter, requirements, venv_base_dir, &hash).await?;
        Ok(Self::from_venv(&venv_dir))
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Whether the interpreter resolves to an executable (absolute path or
    /// found on `PATH`).
    pub fn is_available(&self) -> bool {
        which::which(&self.interpreter).is_ok()
    }

    /// Run `script` with `input` piped to stdin.
    pub async fn run(&self, script: &Path, input: ScriptInput) -> Result<ScriptOutput, ScriptError> {
        if fs::metadata(script).await.is_err() {
            return Err(ScriptError::NotFound(script.display().to_string()));
        }

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script).env("PYTHONUNBUFFERED", "1");
        subprocess::run_command(&mut cmd, input).await
    }

    /// Start `script` as a long-running [`ScriptWorker`].
    pub async fn spawn_worker(&self, script: &Path) -> Result<ScriptWorker, ScriptError> {
        if fs::metadata(script).await.is_err() {
            return Err(ScriptError::NotFound(script.display().to_string()));
        }

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script).env("PYTHONUNBUFFERED", "1");
        ScriptWorker::spawn(&mut cmd)
    }
}

impl Default for PythonRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_PYTHON)
    }
}

/// Hex SHA-256 of a requirements file's contents.
pub async fn hash_requirements(requirements: &Path) -> Result<String, ScriptError> {
    let contents = fs::read(requirements).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScriptError::NotFound(requirements.display().to_string()),
        _ => ScriptError::IoError(e),
    })?;
    Ok(format!("{:x}", Sha256::digest(&contents)))
}

/// Path of the venv for a given requirements hash.
pub fn venv_dir_for(venv_base_dir: &Path, hash: &str) -> PathBuf {
    venv_base_dir.join(format!("venv_{hash}"))
}

async fn ensure_venv(
    base_interpreter: &Path,
    requirements: &Path,
    venv_base_dir: &Path,
    hash: &str,
) -> Result<PathBuf, ScriptError> {
    let venv_dir = venv_dir_for(venv_base_dir, hash);
    if fs::metadata(&venv_dir).await.is_ok() {
        tracing::debug!(venv = %venv_dir.display(), "Reusing python venv");
        return Ok(venv_dir);
    }

    fs::create_dir_all(venv_base_dir)
        .await
        .map_err(ScriptError::IoError)?;

    tracing::info!(venv = %venv_dir.display(), "Creating python venv");
    let created = Command::new(base_interpreter)
        .arg("-m")
        .arg("venv")
        .arg(&venv_dir)
        .output()
        .await
        .map_err(ScriptError::IoError)?;
    if !created.status.success() {
        return Err(ScriptError::ExecutionFailed {
            exit_code: created.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&created.stderr).into_owned(),
        });
    }

    let installed = Command::new(venv_dir.join("bin").join("pip"))
        .arg("install")
        .arg("-r")
        .arg(requirements)
        .output()
        .await
        .map_err(ScriptError::IoError)?;
    if !installed.status.success() {
        // A half-populated venv would be reused next time; remove it.
        let _ = fs::remove_dir_all(&venv_dir).await;
        return Err(ScriptError::ExecutionFailed {
            exit_code: installed.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&installed.stderr).into_owned(),
        });
    }

    Ok(venv_dir)
}
