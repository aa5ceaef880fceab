use std::sync::Arc;

use insideview_contracts::prompt::{coach_greeting, coach_seed_message, COACH_SYSTEM_PROMPT};
use insideview_contracts::request::GenerationRequest;
use insideview_contracts::results::ChatMessage;

use crate::backend::{ChatCall, GenerativeBackend};

pub const CHAT_UNAVAILABLE_REPLY: &str = "Sorry, I'm having trouble connecting right now.";

/// Conversation with the design coach for one generation attempt.
///
/// `history` is what the service sees (seed exchange included); the
/// `transcript` is what the user sees, opening with the greeting.
pub struct CoachSession {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    history: Vec<ChatMessage>,
    transcript: Vec<ChatMessage>,
}

impl CoachSession {
    /// Opens the session and sends the context seed. The seed reply is kept
    /// in the service history but never shown.
    pub fn start(
        backend: Arc<dyn GenerativeBackend>,
        model: impl Into<String>,
        request: &GenerationRequest,
    ) -> Self {
        let mut session = Self {
            backend,
            model: model.into(),
            history: Vec::new(),
            transcript: vec![ChatMessage::model(coach_greeting(&request.object_name))],
        };
        let seed = coach_seed_message(request);
        match session.turn(&seed) {
            Ok(reply) => {
                session.history.push(ChatMessage::user(seed));
                session.history.push(ChatMessage::model(reply));
            }
            Err(err) => {
                tracing::warn!(error = %err, "coach seed message failed");
            }
        }
        session
    }

    fn turn(&self, message: &str) -> Result<String, crate::backend::BackendError> {
        self.backend.chat_turn(&ChatCall {
            model: self.model.clone(),
            system_instruction: COACH_SYSTEM_PROMPT.to_string(),
            history: self.history.clone(),
            message: message.to_string(),
        })
    }

    /// Sends one user message. Blank input is ignored and returns `None`.
    /// Service failures append the canned apology instead of an error.
    pub fn send(&mut self, text: &str) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }
        self.transcript.push(ChatMessage::user(text));
        let reply = match self.turn(text) {
            Ok(reply) => {
                self.history.push(ChatMessage::user(text));
                self.history.push(ChatMessage::model(reply.clone()));
                reply
            }
            Err(err) => {
                tracing::warn!(error = %err, "coach turn failed");
                CHAT_UNAVAILABLE_REPLY.to_string()
            }
        };
        self.transcript.push(ChatMessage::model(reply));
        self.transcript.last()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
