//! Frame-sequence planner.
//!
//! Each animation version is a fixed, ordered table of `(prompt, strength)`
//! pairs describing a pose progression that starts and ends near the anchor
//! pose of the uploaded image. Strength rises through the middle of a table
//! (more freedom to move) and falls near the ends (more fidelity to the
//! anchor), so the resulting clip loops.
//!
//! Step indices are 1-based: index 0 is the unmodified source image and is
//! never a table entry. Index `i` addresses table entry `i - 1`.

use serde::Serialize;

use crate::error::CoreError;

/* --------------------------------------------------------------------------
Step tables
-------------------------------------------------------------------------- */

/// Exclusion terms applied identically at every step.
pub const NEGATIVE_PROMPT: &str = "blurry, low quality, distorted, deformed, ugly, disfigured, \
mutated, extra limbs, missing limbs, bad anatomy, bad proportions, malformed, \
different character, not Homer Simpson";

/// One row of a version table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepSpec {
    pub prompt: &'static str,
    pub strength: f64,
}

const fn step(prompt: &'static str, strength: f64) -> StepSpec {
    StepSpec { prompt, strength }
}

/// Continuity with progressive movement.
static VERSION_1_STEPS: [StepSpec; 8] = [
    step("Homer Simpson, yellow skin, cartoon character, arms slightly lowered, same expression", 0.60),
    step("Homer Simpson, yellow skin, cartoon character, arms down, relaxed pose, gentle movement", 0.65),
    step("Homer Simpson, yellow skin, cartoon character, right arm pointing forward, left arm down", 0.70),
    step("Homer Simpson, yellow skin, cartoon character, both arms raised to shoulder height, excited", 0.75),
    step("Homer Simpson, yellow skin, cartoon character, both arms raised high, very excited, jumping", 0.80),
    step("Homer Simpson, yellow skin, cartoon character, hands on hips, confident pose", 0.75),
    step("Homer Simpson, yellow skin, cartoon character, arms crossed, thinking pose", 0.70),
    step("Homer Simpson, yellow skin, cartoon character, original pose, arms raised, returning", 0.65),
];

/// Key-pose interpolation.
static VERSION_2_STEPS: [StepSpec; 10] = [
    step("Homer Simpson, yellow skin, cartoon character, original pose, arms raised", 0.50),
    step("Homer Simpson, yellow skin, cartoon character, arms slightly lowered, transition", 0.60),
    step("Homer Simpson, yellow skin, cartoon character, arms down, relaxed, gentle movement", 0.70),
    step("Homer Simpson, yellow skin, cartoon character, right arm pointing, left arm down", 0.75),
    step("Homer Simpson, yellow skin, cartoon character, both arms to shoulders, excited", 0.80),
    step("Homer Simpson, yellow skin, cartoon character, both arms raised high, very excited", 0.80),
    step("Homer Simpson, yellow skin, cartoon character, hands on hips, confident", 0.75),
    step("Homer Simpson, yellow skin, cartoon character, arms crossed, thinking", 0.70),
    step("Homer Simpson, yellow skin, cartoon character, returning to original, arms up", 0.60),
    step("Homer Simpson, yellow skin, cartoon character, original pose, arms raised", 0.50),
];

/* --------------------------------------------------------------------------
Versions
-------------------------------------------------------------------------- */

/// Version label sent by clients for [`AnimationVersion::V1`].
pub const VERSION_1: &str = "version1";

/// Version label sent by clients for [`AnimationVersion::V2`].
pub const VERSION_2: &str = "version2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AnimationVersion {
    #[default]
    #[serde(rename = "version1")]
    V1,
    #[serde(rename = "version2")]
    V2,
}

impl AnimationVersion {
    /// Parse a client label. Accepts `version1`, `v1` and `1` (and the same
    /// for version 2), case-insensitively.
    pub fn from_label(label: &str) -> Result<Self, CoreError> {
        match label.trim().to_ascii_lowercase().as_str() {
            VERSION_1 | "v1" | "1" => Ok(Self::V1),
            VERSION_2 | "v2" | "2" => Ok(Self::V2),
            other => Err(CoreError::Validation(format!(
                "Unknown animation version '{other}'. Must be one of: {VERSION_1}, {VERSION_2}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => VERSION_1,
            Self::V2 => VERSION_2,
        }
    }

    /// Short human description of the pose progression.
    pub fn description(&self) -> &'static str {
        match self {
            Self::V1 => "Continuity with progressive movement",
            Self::V2 => "Key-pose interpolation",
        }
    }

    /// The static step table for this version.
    pub fn steps(&self) -> &'static [StepSpec] {
        match self {
            Self::V1 => &VERSION_1_STEPS,
            Self::V2 => &VERSION_2_STEPS,
        }
    }

    /// Largest frame count this version can produce: every table entry plus
    /// the source frame.
    pub fn max_frames(&self) -> usize {
        self.steps().len() + 1
    }

    pub fn all() -> [AnimationVersion; 2] {
        [Self::V1, Self::V2]
    }
}

impl std::fmt::Display for AnimationVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Planning
-------------------------------------------------------------------------- */

/// Everything the diffusion model needs from the planner for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStep {
    pub index: usize,
    pub prompt: &'static str,
    pub negative_prompt: &'static str,
    pub strength: f64,
}

/// Look up the step for a 1-based `index`.
///
/// Returns [`CoreError::OutOfRange`] for index 0 and for any index past the
/// end of the version's table.
pub fn plan_step(version: AnimationVersion, index: usize) -> Result<FrameStep, CoreError> {
    let steps = version.steps();
    let out_of_range = || CoreError::OutOfRange {
        version,
        index,
        len: steps.len(),
    };

    let entry = index
        .checked_sub(1)
        .and_then(|i| steps.get(i))
        .ok_or_else(out_of_range)?;

    Ok(FrameStep {
        index,
        prompt: entry.prompt,
        negative_prompt: NEGATIVE_PROMPT,
        strength: entry.strength,
    })
}

/// Every step needed to produce `frame_count` frames, in order.
pub fn plan_sequence(
    version: AnimationVersion,
    frame_count: usize,
) -> Result<Vec<FrameStep>, CoreError> {
    (1..frame_count).map(|i| plan_step(version, i)).collect()
}

/* --------------------------------------------------------------------------
Frame count policy
-------------------------------------------------------------------------- */

/// Label for [`OverflowPolicy::Clamp`].
pub const OVERFLOW_CLAMP: &str = "clamp";

/// Label for [`OverflowPolicy::Reject`].
pub const OVERFLOW_REJECT: &str = "reject";

/// What to do when a request asks for more frames than a version defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Reduce the frame count to [`AnimationVersion::max_frames`] and log a warning.
    #[default]
    Clamp,
    /// Reject the request with a validation error.
    Reject,
}

impl OverflowPolicy {
    pub fn from_label(label: &str) -> Result<Self, CoreError> {
        match label.trim().to_ascii_lowercase().as_str() {
            OVERFLOW_CLAMP => Ok(Self::Clamp),
            OVERFLOW_REJECT => Ok(Self::Reject),
            other => Err(CoreError::Validation(format!(
                "Unknown frame overflow policy '{other}'. Must be one of: {OVERFLOW_CLAMP}, {OVERFLOW_REJECT}"
            ))),
        }
    }
}

/// Apply `policy` to a requested frame count.
///
/// A request for zero frames is always invalid.
pub fn resolve_frame_count(
    version: AnimationVersion,
    requested: usize,
    policy: OverflowPolicy,
) -> Result<usize, CoreError> {
    if requested == 0 {
        return Err(CoreError::Validation(
            "frames must be at least 1".to_string(),
        ));
    }

    let max = version.max_frames();
    if requested <= max {
        return Ok(requested);
    }

    match policy {
        OverflowPolicy::Clamp => {
            tracing::warn!(
                %version,
                requested,
                max,
                "Requested frame count exceeds step table, clamping"
            );
            Ok(max)
        }
        OverflowPolicy::Reject => Err(CoreError::Validation(format!(
            "{version} supports at most {max} frames (requested {requested})"
        ))),
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
