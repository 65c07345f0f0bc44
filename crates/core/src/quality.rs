//! Quality profile lookup.
//!
//! Maps the coarse quality label sent by clients to the target frame size
//! and the number of diffusion inference steps. Unknown labels resolve to
//! [`QualityTier::Balanced`].

use serde::Serialize;

/* --------------------------------------------------------------------------
Named constants
-------------------------------------------------------------------------- */

/// Label: smallest frames, fewest inference steps.
pub const QUALITY_FAST: &str = "fast";

/// Label: default trade-off.
pub const QUALITY_BALANCED: &str = "balanced";

/// Label: largest frames, most inference steps.
pub const QUALITY_HIGH: &str = "high";

/// All recognized quality labels.
pub const ALL_QUALITY_LABELS: &[&str] = &[QUALITY_FAST, QUALITY_BALANCED, QUALITY_HIGH];

/// Diffusion models work on latents downscaled by this factor, so frame
/// dimensions must be multiples of it.
pub const DIMENSION_ALIGNMENT: u32 = 8;

/* --------------------------------------------------------------------------
Types
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Fast,
    Balanced,
    High,
}

impl QualityTier {
    /// Parse a client label. Anything unrecognized (including an empty label)
    /// falls back to `Balanced`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            QUALITY_FAST => Self::Fast,
            QUALITY_HIGH => Self::High,
            _ => Self::Balanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => QUALITY_FAST,
            Self::Balanced => QUALITY_BALANCED,
            Self::High => QUALITY_HIGH,
        }
    }

    pub fn profile(&self) -> QualityProfile {
        match self {
            Self::Fast => QualityProfile {
                tier: *self,
                width: 256,
                height: 256,
                inference_steps: 10,
            },
            Self::Balanced => QualityProfile {
                tier: *self,
                width: 512,
                height: 512,
                inference_steps: 20,
            },
            Self::High => QualityProfile {
                tier: *self,
                width: 768,
                height: 768,
                inference_steps: 25,
            },
        }
    }

    pub fn all() -> [QualityTier; 3] {
        [Self::Fast, Self::Balanced, Self::High]
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target frame size and inference step count for one quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityProfile {
    pub tier: QualityTier,
    pub width: u32,
    pub height: u32,
    pub inference_steps: u32,
}

impl QualityProfile {
    /// Resolve a client label straight to its profile.
    pub fn resolve(label: &str) -> Self {
        QualityTier::from_label(label).profile()
    }

    /// Width and height rounded down to [`DIMENSION_ALIGNMENT`], never below
    /// one alignment unit.
    pub fn aligned_dimensions(&self) -> (u32, u32) {
        (align_down(self.width), align_down(self.height))
    }
}

fn align_down(value: u32) -> u32 {
    (value / DIMENSION_ALIGNMENT * DIMENSION_ALIGNMENT).max(DIMENSION_ALIGNMENT)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
