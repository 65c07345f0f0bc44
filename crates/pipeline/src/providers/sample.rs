//! Fallback: a fixed sample clip URL.

use async_trait::async_trait;

use super::{CapabilityProvider, GenerationJob, ProviderError, PROVIDER_SAMPLE};
use crate::artifact::VideoArtifact;

pub struct SampleProvider {
    url: Option<String>,
}

impl SampleProvider {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }
}

#[async_trait]
impl CapabilityProvider for SampleProvider {
    fn name(&self) -> &'static str {
        PROVIDER_SAMPLE
    }

    async fn is_available(&self) -> bool {
        self.url.is_some()
    }

    async fn generate(&self, _job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        self.url
            .clone()
            .map(|url| VideoArtifact::External { url })
            .ok_or_else(|| ProviderError::Unavailable("no sample video configured".to_string()))
    }

    fn produces_frames(&self) -> bool {
        false
    }
}
