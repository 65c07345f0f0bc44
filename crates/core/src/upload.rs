//! Upload ingestion.
//!
//! Turns the `image` field of a request into a validated [`SourceImage`] and
//! writes the prepared (RGB, resized, 8-aligned) copy that every generation
//! path starts from.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::data_url;
use crate::error::CoreError;
use crate::quality::QualityProfile;

/// Default upload limit (10 MiB decoded).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image formats accepted as animation sources.
pub const SUPPORTED_FORMATS: &[ImageFormat] =
    &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// A decoded, format-checked upload.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

/// The prepared source written to scratch storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSource {
    pub width: u32,
    pub height: u32,
}

impl SourceImage {
    /// Decode a data URL (or bare base64) and sniff the image format.
    pub fn from_data_url(input: &str, max_bytes: usize) -> Result<Self, CoreError> {
        let decoded = data_url::decode(input, max_bytes)?;
        Self::from_bytes(decoded.bytes)
    }

    /// Accept raw bytes, e.g. a file read from disk by the CLI.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CoreError> {
        let format = image::guess_format(&bytes)
            .map_err(|_| CoreError::Validation("Upload is not a recognizable image".to_string()))?;

        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(CoreError::Validation(format!(
                "Unsupported image format {format:?}. Use PNG, JPEG or WebP"
            )));
        }

        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// The original upload as a data URL.
    pub fn to_data_url(&self) -> String {
        data_url::encode(self.mime(), &self.bytes)
    }

    /// Decode, convert to RGB and resize to the profile's aligned dimensions.
    pub fn prepare(&self, profile: &QualityProfile) -> Result<DynamicImage, CoreError> {
        let (width, height) = profile.aligned_dimensions();
        let decoded = image::load_from_memory_with_format(&self.bytes, self.format)
            .map_err(|e| CoreError::Validation(format!("Failed to decode image: {e}")))?;

        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
        Ok(rgb.resize_exact(width, height, FilterType::Lanczos3))
    }

    /// Prepare the image and write it as PNG to `path`.
    ///
    /// Decoding and Lanczos resampling are CPU-bound, so the work runs on the
    /// blocking pool.
    pub async fn write_prepared(
        &self,
        profile: &QualityProfile,
        path: &Path,
    ) -> Result<PreparedSource, CoreError> {
        let source = self.clone();
        let profile = *profile;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let prepared = source.prepare(&profile)?;
            prepared
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| CoreError::Internal(format!("Failed to write prepared image: {e}")))?;
            Ok(PreparedSource {
                width: prepared.width(),
                height: prepared.height(),
            })
        })
        .await
        .map_err(|e| CoreError::Internal(format!("Image preparation task failed: {e}")))?
    }
}
