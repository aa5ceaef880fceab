use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use insideview_contracts::results::ChatRole;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use super::{
    BackendError, ChatCall, GenerativeBackend, ImageCall, ImagePayload, InlineImage, JsonCall,
};
use crate::config::EngineConfig;

const BACKEND_NAME: &str = "Gemini";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` over REST. The key travels in a header so it
/// never appears in a request URL or in transport error text.
pub struct GeminiBackend {
    api_base: String,
    api_key: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            http: HttpClient::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, BackendError> {
        let Some(api_key) = config.api_key.as_deref() else {
            return Err(BackendError::MissingApiKey);
        };
        Ok(Self::new(api_key, &config.api_base, config.request_timeout))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn post(&self, model: &str, payload: &Value) -> Result<Value, BackendError> {
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(endpoint = %endpoint, "gemini generateContent");
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .map_err(|err| BackendError::Transport {
                backend: BACKEND_NAME.to_string(),
                message: err.without_url().to_string(),
            })?;
        response_json_or_error(BACKEND_NAME, response)
    }
}

impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_image(&self, call: &ImageCall) -> Result<ImagePayload, BackendError> {
        let response = self.post(&call.model, &image_payload(call))?;
        extract_image(&response)
    }

    fn generate_json(&self, call: &JsonCall) -> Result<String, BackendError> {
        let response = self.post(&call.model, &json_payload(call))?;
        extract_text(&response)
    }

    fn chat_turn(&self, call: &ChatCall) -> Result<String, BackendError> {
        let response = self.post(&call.model, &chat_payload(call))?;
        extract_text(&response)
    }
}

fn inline_part(image: &InlineImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data,
        }
    })
}

fn user_content(parts: Vec<Value>) -> Value {
    json!({ "role": "user", "parts": parts })
}

pub(crate) fn image_payload(call: &ImageCall) -> Value {
    let mut parts = vec![json!({ "text": call.prompt })];
    if let Some(reference) = call.reference.as_ref() {
        parts.push(inline_part(reference));
    }

    let mut image_config = Map::new();
    image_config.insert(
        "aspectRatio".to_string(),
        Value::String(call.aspect_ratio.as_str().to_string()),
    );
    if let Some(size) = call.image_size.as_deref() {
        image_config.insert("imageSize".to_string(), Value::String(size.to_string()));
    }

    json!({
        "contents": [user_content(parts)],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": Value::Object(image_config),
        },
    })
}

pub(crate) fn json_payload(call: &JsonCall) -> Value {
    let mut parts = vec![json!({ "text": call.prompt })];
    if let Some(image) = call.image.as_ref() {
        parts.push(inline_part(image));
    }
    json!({
        "contents": [user_content(parts)],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": call.schema,
        },
    })
}

pub(crate) fn chat_payload(call: &ChatCall) -> Value {
    let mut contents: Vec<Value> = call
        .history
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "parts": [{ "text": message.text }],
            })
        })
        .collect();
    contents.push(json!({
        "role": ChatRole::User.as_str(),
        "parts": [{ "text": call.message }],
    }));
    json!({
        "systemInstruction": { "parts": [{ "text": call.system_instruction }] },
        "contents": contents,
    })
}

fn first_candidate(response: &Value) -> Option<&Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
}

fn candidate_parts(candidate: &Value) -> &[Value] {
    candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// First inline image of the first candidate.
///
/// Without one, a finish reason (or prompt block reason) becomes
/// [`BackendError::Stopped`]; otherwise [`BackendError::NoImage`].
pub(crate) fn extract_image(response: &Value) -> Result<ImagePayload, BackendError> {
    let candidate = first_candidate(response);
    for part in candidate.map(candidate_parts).unwrap_or_default() {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64
            .decode(data.as_bytes())
            .map_err(|err| BackendError::InvalidPayload {
                backend: BACKEND_NAME.to_string(),
                message: format!("image base64 decode failed: {err}"),
            })?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or("image/png")
            .to_string();
        return Ok(ImagePayload { bytes, mime_type });
    }

    let reason = candidate
        .and_then(|row| row.get("finishReason"))
        .or_else(|| {
            response
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
        })
        .and_then(Value::as_str)
        .filter(|reason| !reason.trim().is_empty());
    match reason {
        Some(reason) => Err(BackendError::Stopped {
            reason: reason.to_string(),
        }),
        None => Err(BackendError::NoImage),
    }
}

pub(crate) fn extract_text(response: &Value) -> Result<String, BackendError> {
    let text: String = first_candidate(response)
        .map(candidate_parts)
        .unwrap_or_default()
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(BackendError::EmptyText {
            backend: BACKEND_NAME.to_string(),
        });
    }
    Ok(text)
}

fn response_json_or_error(backend: &str, response: HttpResponse) -> Result<Value, BackendError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| BackendError::Transport {
        backend: backend.to_string(),
        message: format!("response body read failed: {}", err.without_url()),
    })?;
    if code == 403 {
        tracing::warn!(body = %truncate_text(&body, 512), "{backend} rejected the API key");
        return Err(BackendError::PermissionDenied);
    }
    if !status.is_success() {
        return Err(BackendError::Status {
            backend: backend.to_string(),
            status: code,
            body: truncate_text(&body, 512),
        });
    }
    serde_json::from_str(&body).map_err(|err| BackendError::InvalidPayload {
        backend: backend.to_string(),
        message: err.to_string(),
    })
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
