//! In-memory backend for unit tests.

use std::sync::Mutex;

use serde_json::Value;

use crate::backend::{BackendError, ChatCall, GenerativeBackend, ImageCall, ImagePayload, JsonCall};

pub(crate) const FAKE_PARTS_JSON: &str = r#"[
    {"id": 2, "name": "Compressor Wheel", "system": "intake", "description": "Draws in air."},
    {"id": 1, "name": "Turbine Housing", "system": "exhaust", "description": "Channels exhaust gas."}
]"#;

pub(crate) const FAKE_ANALYSIS_JSON: &str = r#"{
    "category": "electronics",
    "canonicalName": "Handheld game console",
    "viewpoint": "front",
    "mainRegion": {"x": 0.1, "y": 0.2, "width": 0.6, "height": 0.5},
    "summary": "A handheld console on a desk.",
    "confidence": 0.82,
    "sensitive": false
}"#;

#[derive(Default)]
pub(crate) struct FakeCalls {
    pub images: Vec<ImageCall>,
    pub json: Vec<JsonCall>,
    pub chat: Vec<ChatCall>,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub image_failure: Option<fn() -> BackendError>,
    pub json_failure: Option<fn() -> BackendError>,
    pub fail_chat: bool,
    pub parts_reply: Option<String>,
    pub analysis_reply: Option<String>,
    pub calls: Mutex<FakeCalls>,
}

impl FakeBackend {
    fn record(&self, apply: impl FnOnce(&mut FakeCalls)) {
        if let Ok(mut calls) = self.calls.lock() {
            apply(&mut calls);
        }
    }

    pub fn image_calls(&self) -> Vec<ImageCall> {
        self.calls
            .lock()
            .map(|calls| calls.images.clone())
            .unwrap_or_default()
    }

    pub fn json_calls(&self) -> Vec<JsonCall> {
        self.calls
            .lock()
            .map(|calls| calls.json.clone())
            .unwrap_or_default()
    }

    pub fn chat_calls(&self) -> Vec<ChatCall> {
        self.calls
            .lock()
            .map(|calls| calls.chat.clone())
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.images.len() + calls.json.len() + calls.chat.len())
            .unwrap_or_default()
    }
}

impl GenerativeBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn generate_image(&self, call: &ImageCall) -> Result<ImagePayload, BackendError> {
        self.record(|calls| calls.images.push(call.clone()));
        if let Some(failure) = self.image_failure {
            return Err(failure());
        }
        Ok(ImagePayload {
            bytes: call.prompt.as_bytes().to_vec(),
            mime_type: "image/png".to_string(),
        })
    }

    fn generate_json(&self, call: &JsonCall) -> Result<String, BackendError> {
        self.record(|calls| calls.json.push(call.clone()));
        if let Some(failure) = self.json_failure {
            return Err(failure());
        }
        let reply = match call.schema.get("type").and_then(Value::as_str) {
            Some("ARRAY") => self.parts_reply.as_deref().unwrap_or(FAKE_PARTS_JSON),
            _ => self.analysis_reply.as_deref().unwrap_or(FAKE_ANALYSIS_JSON),
        };
        Ok(reply.to_string())
    }

    fn chat_turn(&self, call: &ChatCall) -> Result<String, BackendError> {
        self.record(|calls| calls.chat.push(call.clone()));
        if self.fail_chat {
            return Err(BackendError::Transport {
                backend: "fake".to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(format!("reply to: {}", call.message))
    }
}
