use std::path::Path;

use frameloop_core::data_url;

use crate::error::PipelineError;

/// MIME type of every encoded video.
pub const MP4_MIME: &str = "video/mp4";

/// What a provider hands back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoArtifact {
    /// Bytes inlined into the response as a `data:` URL.
    Inline { mime: String, bytes: Vec<u8> },
    /// A URL the client fetches itself.
    External { url: String },
}

impl VideoArtifact {
    pub fn inline(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Inline {
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a finished file into an inline artifact.
    pub async fn from_file(path: &Path, mime: &str) -> Result<Self, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::inline(mime, bytes))
    }

    /// The value sent as `videoUrl`.
    pub fn url(&self) -> String {
        match self {
            Self::Inline { mime, bytes } => data_url::encode(mime, bytes),
            Self::External { url } => url.clone(),
        }
    }
}
