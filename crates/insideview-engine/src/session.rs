//! Studio session: the user's working parameters, the auth gate, the
//! per-attempt state machine, history and the coach transcript.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use insideview_contracts::events::{EventLog, SessionEvent};
use insideview_contracts::models::ModelSelector;
use insideview_contracts::presets::find_preset;
use insideview_contracts::prompt::{resolve_prompt, ResolvedPrompt};
use insideview_contracts::request::GenerationRequest;
use insideview_contracts::results::{apply_analysis, AnalysisResult, ChatMessage, Part};

use crate::backend::GenerativeBackend;
use crate::coach::CoachSession;
use crate::config::EngineConfig;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::history::{GeneratedResult, History, HistoryStats};

pub const ANALYSIS_FAILED_NOTICE: &str =
    "Could not analyze image. You can still generate, but auto-fill failed.";
const MISSING_KEY_DETAIL: &str = "API Key is missing.";

/// Whether the session may talk to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGate {
    Unauthenticated { reason: Option<String> },
    Authenticated,
}

/// Per-attempt state. An attempt passes through `Succeeded` or `Failed`
/// and settles back to `Idle`; the last terminal state is kept in
/// [`StudioSession::last_outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Dispatching,
    Succeeded,
    Failed,
}

pub struct StudioSession {
    id: String,
    request: GenerationRequest,
    auth: AuthGate,
    backend: Option<Arc<dyn GenerativeBackend>>,
    selector: ModelSelector,
    image_model: Option<String>,
    text_model: Option<String>,
    state: AttemptState,
    last_outcome: Option<AttemptState>,
    current: Option<GeneratedResult>,
    coach: Option<CoachSession>,
    analysis: Option<AnalysisResult>,
    notice: Option<String>,
    history: History,
    prompt_fallbacks: usize,
    events: Option<EventLog>,
}

impl StudioSession {
    pub fn new(config: &EngineConfig) -> Self {
        let mut session = Self::build(config.backend(), config.selector());
        session.image_model = config.image_model.clone();
        session.text_model = config.text_model.clone();
        if let Some(path) = config.events_path.as_ref() {
            session.events = Some(EventLog::new(path, session.id.clone()));
        }
        session.emit(SessionEvent::SessionStarted {
            authenticated: session.is_authenticated(),
            dryrun: config.dryrun,
        });
        session
    }

    pub fn with_backend(backend: Arc<dyn GenerativeBackend>, selector: ModelSelector) -> Self {
        Self::build(Some(backend), selector)
    }

    fn build(backend: Option<Arc<dyn GenerativeBackend>>, selector: ModelSelector) -> Self {
        let auth = if backend.is_some() {
            AuthGate::Authenticated
        } else {
            AuthGate::Unauthenticated { reason: None }
        };
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            request: GenerationRequest::default(),
            auth,
            backend,
            selector,
            image_model: None,
            text_model: None,
            state: AttemptState::Idle,
            last_outcome: None,
            current: None,
            coach: None,
            analysis: None,
            notice: None,
            history: History::new(),
            prompt_fallbacks: 0,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = self.events.as_ref() {
            events.append_quiet(event);
        }
    }

    fn dispatcher(&self) -> Option<Dispatcher> {
        if self.auth != AuthGate::Authenticated {
            return None;
        }
        let backend = self.backend.clone()?;
        Some(
            Dispatcher::new(backend, self.selector.clone())
                .with_models(self.image_model.clone(), self.text_model.clone()),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut GenerationRequest {
        &mut self.request
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth == AuthGate::Authenticated && self.backend.is_some()
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<AttemptState> {
        self.last_outcome
    }

    fn settle(&mut self, outcome: AttemptState) {
        self.last_outcome = Some(outcome);
        self.state = AttemptState::Idle;
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> HistoryStats {
        self.history.stats()
    }

    pub fn current_result(&self) -> Option<&GeneratedResult> {
        self.current.as_ref()
    }

    pub fn current_parts(&self) -> &[Part] {
        self.current
            .as_ref()
            .map(|result| result.parts.as_slice())
            .unwrap_or_default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.coach
            .as_ref()
            .map(CoachSession::transcript)
            .unwrap_or_default()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Last user-facing error or warning, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// How many successful attempts used the minimal fallback prompt.
    pub fn prompt_fallbacks(&self) -> usize {
        self.prompt_fallbacks
    }

    /// Prompt the current parameters would resolve to.
    pub fn preview_prompt(&self) -> ResolvedPrompt {
        resolve_prompt(&self.request)
    }

    /// Opens the auth gate with a freshly keyed backend.
    pub fn reconnect(&mut self, backend: Arc<dyn GenerativeBackend>) {
        self.backend = Some(backend);
        self.auth = AuthGate::Authenticated;
        self.notice = None;
        self.emit(SessionEvent::AuthConnected);
    }

    fn revoke(&mut self, reason: String) {
        tracing::warn!(reason = %reason, "authorization revoked");
        self.emit(SessionEvent::AuthRevoked {
            reason: reason.clone(),
        });
        self.auth = AuthGate::Unauthenticated {
            reason: Some(reason),
        };
    }

    /// Applies a preset by id or title; presets switch to text mode.
    pub fn apply_preset(&mut self, key: &str) -> bool {
        let Some(preset) = find_preset(key) else {
            return false;
        };
        preset.apply(&mut self.request);
        true
    }

    /// Stores the reference photo and auto-fills from its analysis.
    ///
    /// Analysis failure leaves the parameters alone and sets
    /// [`ANALYSIS_FAILED_NOTICE`]; it never blocks generation.
    pub fn set_reference_image(&mut self, data_uri: String) -> Option<&AnalysisResult> {
        if data_uri.trim().is_empty() {
            self.clear_reference_image();
            return None;
        }
        self.request.reference_image = Some(data_uri);
        self.notice = None;

        let dispatcher = self.dispatcher()?;
        let image = self.request.reference_image.as_deref().unwrap_or_default();
        match dispatcher.analyze_image(image, self.request.hint()) {
            Some(analysis) => {
                apply_analysis(&mut self.request, &analysis);
                self.emit(SessionEvent::AnalysisFinished {
                    category: analysis.category,
                    canonical_name: analysis.canonical_name.clone(),
                    confidence: analysis.confidence,
                });
                self.analysis = Some(analysis);
            }
            None => {
                self.notice = Some(ANALYSIS_FAILED_NOTICE.to_string());
                self.emit(SessionEvent::AnalysisFailed);
            }
        }
        self.analysis.as_ref()
    }

    pub fn clear_reference_image(&mut self) {
        self.request.reference_image = None;
        self.analysis = None;
    }

    /// Runs one generation attempt for the current parameters.
    pub fn generate(&mut self) -> Result<&GeneratedResult, DispatchError> {
        if self.state == AttemptState::Dispatching {
            return Err(DispatchError::Busy);
        }
        if let Err(issue) = self.request.validate() {
            self.notice = Some(issue.to_string());
            return Err(DispatchError::Validation(issue));
        }
        let Some(dispatcher) = self.dispatcher() else {
            let err = DispatchError::Authorization {
                detail: MISSING_KEY_DETAIL.to_string(),
            };
            self.notice = Some(err.to_string());
            return Err(err);
        };

        self.state = AttemptState::Dispatching;
        self.current = None;
        self.coach = None;
        self.notice = None;
        let request = self.request.clone();
        self.emit(SessionEvent::GenerationStarted {
            object_name: request.object_name.clone(),
            category: request.category,
            mode: request.mode,
            detail_level: request.detail_level,
            aspect_ratio: request.aspect_ratio,
        });

        let (coach, outcome) = thread::scope(|scope| {
            let coach_worker = scope.spawn(|| dispatcher.create_chat_session(&request));
            let outcome = dispatcher.dispatch(&request);
            (coach_worker.join().ok(), outcome)
        });
        if coach.is_none() {
            tracing::error!("coach worker panicked");
        }
        self.coach = coach;

        match outcome {
            Ok(outcome) => {
                if outcome.prompt.fallback {
                    self.prompt_fallbacks += 1;
                    self.emit(SessionEvent::PromptFallback {
                        template: outcome.prompt.template.label(),
                        count: self.prompt_fallbacks,
                    });
                }
                let result = GeneratedResult {
                    id: uuid::Uuid::new_v4().simple().to_string(),
                    image: outcome.image,
                    params: request,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    prompt_used: outcome.prompt.text,
                    model: outcome.model,
                    parts: outcome.parts,
                };
                self.emit(SessionEvent::GenerationSucceeded {
                    result_id: result.id.clone(),
                    model: result.model.clone(),
                    parts: result.parts.len(),
                    bytes: result.image.bytes.len(),
                    prompt_sha256: crate::prompt_digest(&result.prompt_used),
                });
                self.history.prepend(result.clone());
                self.current = Some(result);
                self.settle(AttemptState::Succeeded);
                self.current
                    .as_ref()
                    .ok_or_else(|| DispatchError::Generation("result was not recorded".to_string()))
            }
            Err(err) => {
                self.settle(AttemptState::Failed);
                self.emit(SessionEvent::GenerationFailed {
                    error: err.to_string(),
                    authorization: err.is_authorization(),
                });
                if let DispatchError::Authorization { detail } = &err {
                    self.revoke(detail.clone());
                }
                self.notice = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Sends a coach message for the current attempt. `None` when no attempt
    /// has started a coach yet or the text is blank.
    pub fn send_chat(&mut self, text: &str) -> Option<ChatMessage> {
        let reply = self.coach.as_mut()?.send(text).cloned()?;
        self.emit(SessionEvent::ChatTurn {
            chars: text.chars().count(),
        });
        Some(reply)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.history.delete(id);
        if removed {
            self.emit(SessionEvent::HistoryDeleted {
                result_id: id.to_string(),
            });
        }
        removed
    }

    pub fn export_image(&self, id: &str, dir: &Path) -> Result<PathBuf> {
        let result = self
            .history
            .get(id)
            .or_else(|| self.current.as_ref().filter(|current| current.id == id))
            .ok_or_else(|| anyhow!("no generated image with id {id}"))?;
        let path = result.export_to(dir)?;
        self.emit(SessionEvent::ImageExported {
            result_id: id.to_string(),
            path: path.display().to_string(),
        });
        Ok(path)
    }
}
