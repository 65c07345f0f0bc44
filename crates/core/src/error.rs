use crate::planner::AnimationVersion;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Step {index} is out of range for {version} (table has {len} steps)")]
    OutOfRange {
        version: AnimationVersion,
        index: usize,
        len: usize,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
