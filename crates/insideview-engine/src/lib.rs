//! InsideView engine: generative backends, the generation dispatcher, the
//! design coach and the studio session that ties them together.

use sha2::{Digest, Sha256};

pub mod backend;
pub mod coach;
pub mod config;
pub mod dispatcher;
pub mod history;
pub mod session;
pub mod upload;

#[cfg(test)]
mod testing;

pub use backend::{
    BackendError, DryrunBackend, GeminiBackend, GenerativeBackend, ImagePayload, InlineImage,
};
pub use coach::CoachSession;
pub use config::EngineConfig;
pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher};
pub use history::{download_file_name, GeneratedResult, History, HistoryStats};
pub use session::{AttemptState, AuthGate, StudioSession, ANALYSIS_FAILED_NOTICE};
pub use upload::load_reference_image;

/// Hex sha256 of a prompt, logged instead of the full text.
pub fn prompt_digest(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}
