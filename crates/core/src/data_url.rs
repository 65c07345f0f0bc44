//! `data:` URL encoding and decoding.
//!
//! Uploads arrive as `data:<mime>;base64,<payload>` strings produced by the
//! browser's `FileReader.readAsDataURL`; generated videos travel back the
//! same way.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::CoreError;

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Declared media type, if the input carried a `data:` header.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// Decode a `data:` URL or a bare base64 string.
///
/// `max_bytes` bounds the decoded size. The bound is checked against the
/// encoded length first so oversized payloads are rejected without decoding.
pub fn decode(input: &str, max_bytes: usize) -> Result<DataUrl, CoreError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoreError::Validation("No image provided".to_string()));
    }

    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                CoreError::Validation("Malformed data URL: missing ',' separator".to_string())
            })?;
            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                CoreError::Validation("Only base64-encoded data URLs are supported".to_string())
            })?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, payload)
        }
        None => (None, input),
    };

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if payload.is_empty() {
        return Err(CoreError::Validation("No image provided".to_string()));
    }
    if payload.len() / 4 * 3 > max_bytes + 2 {
        return Err(too_large(max_bytes));
    }

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| CoreError::Validation(format!("Invalid base64 payload: {e}")))?;

    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    Ok(DataUrl { mime, bytes })
}

/// Encode bytes as a `data:<mime>;base64,...` URL.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn too_large(max_bytes: usize) -> CoreError {
    CoreError::Validation(format!("Image exceeds the {max_bytes} byte upload limit"))
}
