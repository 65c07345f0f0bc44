//! Last resort: hand the upload back unchanged.

use async_trait::async_trait;

use super::{CapabilityProvider, GenerationJob, ProviderError, PROVIDER_ECHO};
use crate::artifact::VideoArtifact;

pub struct EchoProvider;

#[async_trait]
impl CapabilityProvider for EchoProvider {
    fn name(&self) -> &'static str {
        PROVIDER_ECHO
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        let source = &job.request.source;
        Ok(VideoArtifact::inline(source.mime(), source.bytes().to_vec()))
    }

    fn produces_frames(&self) -> bool {
        false
    }
}
