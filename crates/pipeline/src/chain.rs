//! Frame chain driver.
//!
//! Frame 0 is the prepared source, copied byte for byte. Frame `i` is the
//! model's output for step `i` conditioned on frame `i - 1`. Steps run
//! strictly in order on one model session, and the first failure aborts the
//! whole chain.

use std::path::{Path, PathBuf};

use frameloop_core::error::CoreError;
use frameloop_core::ffmpeg::frame_file_name;
use frameloop_core::planner::{plan_sequence, AnimationVersion};

use crate::diffusion::{DiffusionModel, DiffusionParams, DiffusionSession};
use crate::error::PipelineError;

/// Ordered frames on disk, named `frame_0000.png` onwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameChain {
    frames: Vec<PathBuf>,
}

impl FrameChain {
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Build a chain of `frame_count` frames in `dir`.
///
/// `frame_count` must already be resolved against the version's table; an
/// overlong count fails before any model call is made.
pub async fn build_chain<M: DiffusionModel>(
    model: &M,
    source: &Path,
    version: AnimationVersion,
    frame_count: usize,
    params: &DiffusionParams,
    dir: &Path,
) -> Result<FrameChain, PipelineError> {
    if frame_count == 0 {
        return Err(CoreError::Validation("frames must be at least 1".to_string()).into());
    }
    let steps = plan_sequence(version, frame_count)?;

    tokio::fs::create_dir_all(dir).await?;
    let first = dir.join(frame_file_name(0));
    tokio::fs::copy(source, &first).await?;

    let mut frames = Vec::with_capacity(frame_count);
    frames.push(first);
    if steps.is_empty() {
        return Ok(FrameChain { frames });
    }

    let mut session = model.open_session().await?;
    for step in &steps {
        let input = &frames[step.index - 1];
        let output = dir.join(frame_file_name(step.index));
        let request = params.request(step, input, &output);

        tracing::info!(
            step = step.index,
            of = steps.len(),
            %version,
            strength = step.strength,
            "Running diffusion step"
        );

        session
            .img2img(&request)
            .await
            .map_err(|e| PipelineError::Step {
                index: step.index,
                source: Box::new(e),
            })?;
        frames.push(output);
    }
    session.close().await;

    Ok(FrameChain { frames })
}

/// Copy `frames` into `dest` under pattern names, creating `dest` if needed.
pub async fn export_frames(frames: &[PathBuf], dest: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    tokio::fs::create_dir_all(dest).await?;

    let mut exported = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        let target = dest.join(frame_file_name(i));
        tokio::fs::copy(frame, &target).await?;
        exported.push(target);
    }

    tracing::info!(frames = exported.len(), dest = %dest.display(), "Exported frames");
    Ok(exported)
}
