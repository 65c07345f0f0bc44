use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Prefix of every per-request scratch directory.
pub const SCRATCH_PREFIX: &str = "sd_video_";

/// A per-request temporary directory, removed when dropped.
///
/// Dropping on both the success and the error path is what guarantees
/// cleanup; nothing else deletes request files.
#[derive(Debug)]
pub struct ScratchDir {
    dir: tempfile::TempDir,
}

impl ScratchDir {
    /// Create a fresh directory under `root`, or the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        tracing::debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let root = tempfile::tempdir().expect("create temp dir");
        let scratch = ScratchDir::create(Some(root.path())).unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(scratch.join("frame_0000.png"), b"x").unwrap();

        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn missing_root_is_created() {
        let root = tempfile::tempdir().expect("create temp dir");
        let nested = root.path().join("a/b");
        let scratch = ScratchDir::create(Some(&nested)).unwrap();
        assert!(scratch.path().starts_with(&nested));
    }
}
