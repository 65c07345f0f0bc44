//! Shared fakes and fixtures for pipeline tests.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use frameloop_core::planner::OverflowPolicy;
use frameloop_core::request::{AnimationRequest, RequestParams};
use frameloop_core::scripting::ScriptError;
use frameloop_core::upload::SourceImage;
use image::{ImageFormat, Rgb, RgbImage};

use crate::diffusion::{DiffusionModel, DiffusionSession, Img2ImgRequest};
use crate::error::PipelineError;
use crate::muxer::VideoMuxer;
use crate::providers::GenerationJob;

/// Encode a solid-color PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 180, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

/// Write a solid gray PNG to `path`.
pub fn write_png(path: &Path, width: u32, height: u32, shade: u8) {
    RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]))
        .save(path)
        .expect("write png");
}

/// A prepared job for a small PNG upload.
pub async fn job(version: &str, frames: u32) -> GenerationJob {
    let source = SourceImage::from_bytes(png_bytes(32, 32)).expect("valid png");
    let params = RequestParams {
        version: Some(version.to_string()),
        frames: Some(frames),
        quality: Some("fast".to_string()),
        ..Default::default()
    };
    let request =
        AnimationRequest::accept(source, &params, OverflowPolicy::Clamp).expect("valid request");
    GenerationJob::prepare(request, None).await.expect("prepare job")
}

/// What every session of a [`FakeModel`] records.
#[derive(Debug, Default)]
struct FakeState {
    calls: Mutex<Vec<Img2ImgRequest>>,
    sessions: AtomicUsize,
    closed: AtomicUsize,
}

/// Model that copies its input to its output and records every call.
#[derive(Debug, Default)]
pub struct FakeModel {
    state: Arc<FakeState>,
    /// 1-based call number that fails.
    fail_at: Option<usize>,
    fail_open: bool,
    unready: bool,
}

impl FakeModel {
    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..Default::default()
        }
    }

    pub fn failing_to_open() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn unready() -> Self {
        Self {
            unready: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Img2ImgRequest> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Sessions opened so far.
    pub fn sessions(&self) -> usize {
        self.state.sessions.load(Ordering::SeqCst)
    }

    /// Sessions closed cleanly so far.
    pub fn closed_sessions(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

impl DiffusionModel for FakeModel {
    type Session = FakeSession;

    async fn is_ready(&self) -> bool {
        !self.unready
    }

    async fn open_session(&self) -> Result<FakeSession, PipelineError> {
        if self.fail_open {
            return Err(ScriptError::NotFound("img2img_step.py".to_string()).into());
        }
        self.state.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            fail_at: self.fail_at,
        })
    }
}

#[derive(Debug)]
pub struct FakeSession {
    state: Arc<FakeState>,
    fail_at: Option<usize>,
}

impl DiffusionSession for FakeSession {
    async fn img2img(&mut self, request: &Img2ImgRequest) -> Result<(), PipelineError> {
        let call = {
            let mut calls = self.state.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        if self.fail_at == Some(call) {
            return Err(ScriptError::ExecutionFailed {
                exit_code: 1,
                stderr: "CUDA out of memory".to_string(),
            }
            .into());
        }
        tokio::fs::copy(&request.input_path, &request.output_path).await?;
        Ok(())
    }

    async fn close(self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Muxer that records its input and writes a placeholder file.
#[derive(Debug, Default)]
pub struct FakeMuxer {
    calls: Mutex<Vec<(Vec<PathBuf>, u32)>>,
    unavailable: bool,
}

/// Bytes written by [`FakeMuxer`].
pub const FAKE_VIDEO: &[u8] = b"fake-mp4";

impl FakeMuxer {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(Vec<PathBuf>, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl VideoMuxer for FakeMuxer {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn mux(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<(), PipelineError> {
        self.calls.lock().unwrap().push((frames.to_vec(), fps));
        tokio::fs::write(output, FAKE_VIDEO).await?;
        Ok(())
    }
}
