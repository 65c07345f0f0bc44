use frameloop_core::error::CoreError;
use frameloop_core::ffmpeg::FfmpegError;
use frameloop_core::scripting::ScriptError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("Diffusion step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Provider '{provider}' failed: {source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("No generation provider is available")]
    NoProvider,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the failure was caused by the request rather than the
    /// environment.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Core(CoreError::Validation(_)) => true,
            Self::Provider { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_names_index_and_cause() {
        let err = PipelineError::Step {
            index: 3,
            source: Box::new(ScriptError::Timeout { elapsed_ms: 10 }.into()),
        };
        assert_eq!(
            err.to_string(),
            "Diffusion step 3 failed: Script timed out after 10ms"
        );
    }

    #[test]
    fn validation_is_seen_through_provider_wrapper() {
        let inner = PipelineError::Core(CoreError::Validation("bad".into()));
        let wrapped = PipelineError::Provider {
            provider: "diffusion",
            source: Box::new(inner),
        };
        assert!(wrapped.is_validation());
        assert!(!PipelineError::NoProvider.is_validation());
    }
}
