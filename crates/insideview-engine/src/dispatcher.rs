//! Turns a validated [`GenerationRequest`] into service calls: the image and
//! parts requests of one attempt, photo analysis and coach sessions.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use insideview_contracts::models::{ModelSelector, CAP_CHAT, CAP_JSON, CAP_VISION};
use insideview_contracts::prompt::{parts_prompt, resolve_prompt, vision_prompt, ResolvedPrompt};
use insideview_contracts::request::{GenerationRequest, RequestIssue};
use insideview_contracts::results::{
    analysis_response_schema, parse_analysis, parse_parts, parts_response_schema, AnalysisResult,
    Part,
};

use crate::backend::{GenerativeBackend, ImageCall, ImagePayload, InlineImage, JsonCall};
use crate::coach::CoachSession;

const GENERATION_IMAGE_MIME: &str = "image/png";
const ANALYSIS_IMAGE_MIME: &str = "image/jpeg";
const GENERIC_FAILURE: &str = "Failed to generate image. Please try again.";
const FALLBACK_CHAT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(RequestIssue),

    #[error("Authorization failed. Please reconnect your API Key.")]
    Authorization { detail: String },

    #[error("{0}")]
    Generation(String),

    #[error("A generation is already in progress.")]
    Busy,
}

impl DispatchError {
    /// Sorts a raw failure message: anything that smells like a rejected key
    /// is an authorization failure, the rest is passed through verbatim.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_authorization_failure(&message) {
            return DispatchError::Authorization { detail: message };
        }
        if message.trim().is_empty() {
            return DispatchError::Generation(GENERIC_FAILURE.to_string());
        }
        DispatchError::Generation(message)
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, DispatchError::Authorization { .. })
    }
}

pub fn is_authorization_failure(message: &str) -> bool {
    message.contains("403") || message.contains("permission") || message.contains("API Key")
}

/// Everything one successful attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub image: ImagePayload,
    pub parts: Vec<Part>,
    pub prompt: ResolvedPrompt,
    pub model: String,
}

pub struct Dispatcher {
    backend: Arc<dyn GenerativeBackend>,
    selector: ModelSelector,
    image_model: Option<String>,
    text_model: Option<String>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn GenerativeBackend>, selector: ModelSelector) -> Self {
        Self {
            backend,
            selector,
            image_model: None,
            text_model: None,
        }
    }

    /// Pins the image and/or text model instead of selecting by capability.
    pub fn with_models(mut self, image_model: Option<String>, text_model: Option<String>) -> Self {
        self.image_model = image_model;
        self.text_model = text_model;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn text_model_for(&self, capability: &str) -> Result<String, String> {
        let selection = self.selector.select(self.text_model.as_deref(), capability)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            tracing::warn!(capability, reason, "text model fallback");
        }
        Ok(selection.model.name)
    }

    pub fn generate_image(&self, request: &GenerationRequest) -> Result<ImagePayload, DispatchError> {
        request.validate().map_err(DispatchError::Validation)?;
        let prompt = resolve_prompt(request);
        self.render_image(request, &prompt).map(|(image, _)| image)
    }

    fn render_image(
        &self,
        request: &GenerationRequest,
        prompt: &ResolvedPrompt,
    ) -> Result<(ImagePayload, String), DispatchError> {
        let selection = self
            .selector
            .select_image(request.detail_level, self.image_model.as_deref())
            .map_err(DispatchError::Generation)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            tracing::warn!(reason, "image model fallback");
        }

        let reference = if request.is_photo() {
            request
                .reference_image
                .as_deref()
                .map(|image| InlineImage::from_data_uri(image, GENERATION_IMAGE_MIME))
        } else {
            None
        };

        let call = ImageCall {
            model: selection.model.name.clone(),
            prompt: prompt.text.clone(),
            aspect_ratio: request.aspect_ratio,
            image_size: selection.model.image_size.clone(),
            reference,
        };
        let started = Instant::now();
        let image = self.backend.generate_image(&call).map_err(|err| {
            tracing::error!(model = %call.model, error = %err, "image generation failed");
            DispatchError::classify(err.to_string())
        })?;
        tracing::info!(
            model = %call.model,
            bytes = image.bytes.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "image generated"
        );
        Ok((image, call.model))
    }

    /// Parts list for the request's object. Never fails; any problem yields
    /// an empty list.
    pub fn generate_parts(&self, request: &GenerationRequest) -> Vec<Part> {
        let model = match self.text_model_for(CAP_JSON) {
            Ok(model) => model,
            Err(err) => {
                tracing::warn!(error = %err, "no model for parts list");
                return Vec::new();
            }
        };
        let call = JsonCall {
            model,
            prompt: parts_prompt(request.category, &request.object_name),
            image: None,
            schema: parts_response_schema(),
        };
        let text = match self.backend.generate_json(&call) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "failed to generate parts");
                return Vec::new();
            }
        };
        match parse_parts(&text) {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(error = %err, "parts response did not match schema");
                Vec::new()
            }
        }
    }

    /// One attempt: image and parts run concurrently and are both joined.
    /// A parts failure degrades to an empty list; an image failure fails the
    /// attempt.
    pub fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, DispatchError> {
        request.validate().map_err(DispatchError::Validation)?;
        let prompt = resolve_prompt(request);
        tracing::info!(
            object_name = %request.object_name,
            template = %prompt.template.label(),
            detail = %request.detail_level,
            fallback = prompt.fallback,
            "dispatching generation"
        );

        let (image, parts) = thread::scope(|scope| {
            let parts_worker = scope.spawn(|| self.generate_parts(request));
            let image = self.render_image(request, &prompt);
            let parts = parts_worker.join().unwrap_or_else(|_| {
                tracing::error!("parts worker panicked");
                Vec::new()
            });
            (image, parts)
        });

        let (image, model) = image?;
        Ok(DispatchOutcome {
            image,
            parts,
            prompt,
            model,
        })
    }

    /// Vision analysis of an uploaded photo. `None` on any failure.
    pub fn analyze_image(&self, image: &str, hint: Option<&str>) -> Option<AnalysisResult> {
        let model = match self.text_model_for(CAP_VISION) {
            Ok(model) => model,
            Err(err) => {
                tracing::warn!(error = %err, "no model for image analysis");
                return None;
            }
        };
        let call = JsonCall {
            model,
            prompt: vision_prompt(hint),
            image: Some(InlineImage::from_data_uri(image, ANALYSIS_IMAGE_MIME)),
            schema: analysis_response_schema(),
        };
        let text = match self.backend.generate_json(&call) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "vision analysis failed");
                return None;
            }
        };
        match parse_analysis(&text) {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                tracing::warn!(error = %err, "vision analysis returned malformed JSON");
                None
            }
        }
    }

    pub fn create_chat_session(&self, request: &GenerationRequest) -> CoachSession {
        let model = self.text_model_for(CAP_CHAT).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "no chat model registered; using default");
            FALLBACK_CHAT_MODEL.to_string()
        });
        CoachSession::start(self.backend.clone(), model, request)
    }
}
