//! Animation request model.
//!
//! [`RequestParams`] is the loosely typed form clients send (every field
//! optional, labels as strings). [`AnimationRequest::accept`] validates it
//! against the upload and the frame-count policy and produces the immutable
//! request the pipeline works from.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::planner::{resolve_frame_count, AnimationVersion, OverflowPolicy};
use crate::quality::{QualityProfile, QualityTier};
use crate::upload::SourceImage;

/// Frame count used when the client does not send one.
pub const DEFAULT_FRAMES: u32 = 8;

/// Frame rate used when the client does not send one.
pub const DEFAULT_FPS: u32 = 8;

/// Generation parameters as sent by a client.
///
/// `frames` is range-checked here before the overflow policy runs, so even a
/// clamping policy never sees absurd counts.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct RequestParams {
    pub version: Option<String>,
    #[validate(range(min = 1, max = 120, message = "frames must be between 1 and 120"))]
    pub frames: Option<u32>,
    #[validate(range(min = 1, max = 60, message = "fps must be between 1 and 60"))]
    pub fps: Option<u32>,
    pub quality: Option<String>,
}

/// A validated request. Immutable once accepted.
#[derive(Debug, Clone)]
pub struct AnimationRequest {
    pub source: SourceImage,
    pub version: AnimationVersion,
    /// Frame count after the overflow policy has been applied.
    pub frame_count: usize,
    /// Frame count the client asked for.
    pub requested_frames: usize,
    pub fps: u32,
    pub quality: QualityTier,
}

impl AnimationRequest {
    pub fn accept(
        source: SourceImage,
        params: &RequestParams,
        policy: OverflowPolicy,
    ) -> Result<Self, CoreError> {
        params
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let version = match params.version.as_deref() {
            Some(label) if !label.trim().is_empty() => AnimationVersion::from_label(label)?,
            _ => AnimationVersion::default(),
        };
        let quality = QualityTier::from_label(params.quality.as_deref().unwrap_or_default());
        let requested_frames = params.frames.unwrap_or(DEFAULT_FRAMES) as usize;
        let frame_count = resolve_frame_count(version, requested_frames, policy)?;
        let fps = params.fps.unwrap_or(DEFAULT_FPS);

        Ok(Self {
            source,
            version,
            frame_count,
            requested_frames,
            fps,
            quality,
        })
    }

    pub fn profile(&self) -> QualityProfile {
        self.quality.profile()
    }

    /// Whether the overflow policy reduced the requested frame count.
    pub fn was_clamped(&self) -> bool {
        self.frame_count < self.requested_frames
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::upload::test_images::png_bytes;

    fn source() -> SourceImage {
        SourceImage::from_bytes(png_bytes(8, 8)).unwrap()
    }

    fn params(version: Option<&str>, frames: Option<u32>, fps: Option<u32>) -> RequestParams {
        RequestParams {
            version: version.map(str::to_string),
            frames,
            fps,
            quality: None,
        }
    }

    #[test]
    fn defaults_applied() {
        let req = AnimationRequest::accept(source(), &RequestParams::default(), OverflowPolicy::Clamp)
            .unwrap();
        assert_eq!(req.version, AnimationVersion::V1);
        assert_eq!(req.frame_count, DEFAULT_FRAMES as usize);
        assert_eq!(req.fps, DEFAULT_FPS);
        assert_eq!(req.quality, QualityTier::Balanced);
        assert!(!req.was_clamped());
    }

    #[test]
    fn overflow_clamped_to_table() {
        let req = AnimationRequest::accept(
            source(),
            &params(Some("version1"), Some(30), Some(12)),
            OverflowPolicy::Clamp,
        )
        .unwrap();
        assert_eq!(req.frame_count, 9);
        assert_eq!(req.requested_frames, 30);
        assert!(req.was_clamped());
    }

    #[test]
    fn overflow_rejected_under_reject_policy() {
        let result = AnimationRequest::accept(
            source(),
            &params(Some("version2"), Some(30), None),
            OverflowPolicy::Reject,
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_fps_rejected() {
        let result =
            AnimationRequest::accept(source(), &params(None, None, Some(0)), OverflowPolicy::Clamp);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("fps"));
    }

    #[test]
    fn zero_frames_rejected() {
        let result =
            AnimationRequest::accept(source(), &params(None, Some(0), None), OverflowPolicy::Clamp);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("frames"));
    }

    #[test]
    fn unknown_version_rejected() {
        let result = AnimationRequest::accept(
            source(),
            &params(Some("version9"), None, None),
            OverflowPolicy::Clamp,
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn blank_version_uses_default() {
        let req =
            AnimationRequest::accept(source(), &params(Some(" "), None, None), OverflowPolicy::Clamp)
                .unwrap();
        assert_eq!(req.version, AnimationVersion::V1);
    }

    #[test]
    fn unknown_quality_is_balanced() {
        let p = RequestParams {
            quality: Some("cinematic".to_string()),
            ..Default::default()
        };
        let req = AnimationRequest::accept(source(), &p, OverflowPolicy::Clamp).unwrap();
        let profile = req.profile();
        assert_eq!((profile.width, profile.height, profile.inference_steps), (512, 512, 20));
    }
}
