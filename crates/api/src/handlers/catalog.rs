//! Read-only catalogs: animation versions and quality profiles.

use axum::Json;
use serde::Serialize;

use frameloop_core::planner::{AnimationVersion, NEGATIVE_PROMPT};
use frameloop_core::quality::{QualityProfile, QualityTier};

use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct StepInfo {
    /// 1-based step index (frame 0 is the upload).
    pub index: usize,
    pub prompt: &'static str,
    pub strength: f64,
}

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub name: AnimationVersion,
    pub description: &'static str,
    pub max_frames: usize,
    pub negative_prompt: &'static str,
    pub steps: Vec<StepInfo>,
}

impl From<AnimationVersion> for VersionInfo {
    fn from(version: AnimationVersion) -> Self {
        Self {
            name: version,
            description: version.description(),
            max_frames: version.max_frames(),
            negative_prompt: NEGATIVE_PROMPT,
            steps: version
                .steps()
                .iter()
                .enumerate()
                .map(|(i, step)| StepInfo {
                    index: i + 1,
                    prompt: step.prompt,
                    strength: step.strength,
                })
                .collect(),
        }
    }
}

/// GET /versions
pub async fn list_versions() -> Json<DataResponse<Vec<VersionInfo>>> {
    let data = AnimationVersion::all().into_iter().map(VersionInfo::from).collect();
    Json(DataResponse { data })
}

/// GET /quality-profiles
pub async fn list_quality_profiles() -> Json<DataResponse<Vec<QualityProfile>>> {
    let data = QualityTier::all().iter().map(QualityTier::profile).collect();
    Json(DataResponse { data })
}
