//! The seam between the dispatcher and the generative service.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use insideview_contracts::request::AspectRatio;
use insideview_contracts::results::ChatMessage;
use serde_json::Value;

mod dryrun;
mod gemini;

pub use dryrun::DryrunBackend;
pub use gemini::GeminiBackend;

pub const PERMISSION_DENIED_MESSAGE: &str = "Permission Denied: Please check your API Key. You may need to enable the Gemini API in your Google Cloud Console or use a paid project for Image generation.";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API Key is missing.")]
    MissingApiKey,

    #[error("{}", PERMISSION_DENIED_MESSAGE)]
    PermissionDenied,

    #[error("{backend} request failed ({status}): {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("{backend} transport failed: {message}")]
    Transport { backend: String, message: String },

    #[error("Generation stopped. Reason: {reason}. The content might have violated safety policies.")]
    Stopped { reason: String },

    #[error("No image data found in response")]
    NoImage,

    #[error("{backend} returned no text")]
    EmptyText { backend: String },

    #[error("{backend} returned an invalid payload: {message}")]
    InvalidPayload { backend: String, message: String },
}

/// Base64 image content as the service expects it inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    /// Accepts a `data:<mime>;base64,<payload>` URI or bare base64.
    ///
    /// Everything up to the first comma is dropped. The declared mime type is
    /// kept when present, `default_mime` is used otherwise.
    pub fn from_data_uri(value: &str, default_mime: &str) -> Self {
        let (mime_type, data) = split_data_uri(value);
        Self {
            mime_type: mime_type.unwrap_or(default_mime).to_string(),
            data: data.to_string(),
        }
    }
}

pub fn strip_data_uri_prefix(value: &str) -> &str {
    split_data_uri(value).1
}

fn split_data_uri(value: &str) -> (Option<&str>, &str) {
    let Some((head, payload)) = value.split_once(',') else {
        return (None, value);
    };
    let mime = head
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .map(str::trim)
        .filter(|mime| mime.starts_with("image/"));
    (mime, payload)
}

/// Decoded image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    /// File extension for the declared mime type, `png` when unrecognised.
    /// The bytes are never re-encoded, so the name follows the payload.
    pub fn file_extension(&self) -> &'static str {
        image::ImageFormat::from_mime_type(self.mime_type.trim())
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("png")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCall {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub image_size: Option<String>,
    pub reference: Option<InlineImage>,
}

/// A schema-constrained structured request; the reply is the raw JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonCall {
    pub model: String,
    pub prompt: String,
    pub image: Option<InlineImage>,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    pub model: String,
    pub system_instruction: String,
    /// Prior turns, oldest first.
    pub history: Vec<ChatMessage>,
    pub message: String,
}

pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate_image(&self, call: &ImageCall) -> Result<ImagePayload, BackendError>;
    fn generate_json(&self, call: &JsonCall) -> Result<String, BackendError>;
    fn chat_turn(&self, call: &ChatCall) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_prefix_is_stripped_and_mime_kept() {
        let image = InlineImage::from_data_uri("data:image/jpeg;base64,QUJD", "image/png");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "QUJD");
    }

    #[test]
    fn bare_base64_uses_default_mime() {
        let image = InlineImage::from_data_uri("QUJD", "image/png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "QUJD");
        assert_eq!(strip_data_uri_prefix("QUJD"), "QUJD");
    }

    #[test]
    fn non_image_declared_mime_falls_back_to_default() {
        let image = InlineImage::from_data_uri("data:text/plain;base64,QUJD", "image/png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "QUJD");
    }

    #[test]
    fn payload_renders_data_uri() {
        let payload = ImagePayload {
            bytes: b"ABC".to_vec(),
            mime_type: "image/png".to_string(),
        };
        assert_eq!(payload.data_uri(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn unknown_mime_exports_as_png() {
        let payload = ImagePayload {
            bytes: vec![0],
            mime_type: "application/octet-stream".to_string(),
        };
        assert_eq!(payload.file_extension(), "png");
    }

    #[test]
    fn stopped_error_reads_like_a_safety_notice() {
        let err = BackendError::Stopped {
            reason: "SAFETY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Generation stopped. Reason: SAFETY. The content might have violated safety policies."
        );
    }
}
