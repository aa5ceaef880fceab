//! Session trace: one `events.jsonl` line per studio event.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::request::{AspectRatio, Category, DetailLevel, GenerationMode};
use crate::results::AnalysisCategory;

/// Everything a studio session records. Serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        authenticated: bool,
        dryrun: bool,
    },
    AuthConnected,
    AuthRevoked {
        reason: String,
    },
    AnalysisFinished {
        category: AnalysisCategory,
        canonical_name: String,
        confidence: f64,
    },
    AnalysisFailed,
    GenerationStarted {
        object_name: String,
        category: Category,
        mode: GenerationMode,
        detail_level: DetailLevel,
        aspect_ratio: AspectRatio,
    },
    /// The template failed to parse and the minimal prompt went out.
    PromptFallback {
        template: String,
        count: usize,
    },
    GenerationSucceeded {
        result_id: String,
        model: String,
        parts: usize,
        bytes: usize,
        prompt_sha256: String,
    },
    GenerationFailed {
        error: String,
        authorization: bool,
    },
    ChatTurn {
        chars: usize,
    },
    HistoryDeleted {
        result_id: String,
    },
    ImageExported {
        result_id: String,
        path: String,
    },
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::AuthConnected => "auth_connected",
            Self::AuthRevoked { .. } => "auth_revoked",
            Self::AnalysisFinished { .. } => "analysis_finished",
            Self::AnalysisFailed => "analysis_failed",
            Self::GenerationStarted { .. } => "generation_started",
            Self::PromptFallback { .. } => "prompt_fallback",
            Self::GenerationSucceeded { .. } => "generation_succeeded",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::ChatTurn { .. } => "chat_turn",
            Self::HistoryDeleted { .. } => "history_deleted",
            Self::ImageExported { .. } => "image_exported",
        }
    }
}

/// One stored line: the event plus the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Append-only `events.jsonl` for a single session.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    session_id: String,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn append(&self, event: SessionEvent) -> anyhow::Result<EventRecord> {
        let record = EventRecord {
            session_id: self.session_id.clone(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            event,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(record)
    }

    /// Like [`append`](Self::append) but only logs failures; the trace never
    /// fails an attempt.
    pub fn append_quiet(&self, event: SessionEvent) {
        let kind = event.kind();
        if let Err(err) = self.append(event) {
            tracing::warn!(event = kind, error = %format!("{err:#}"), "failed to append session event");
        }
    }
}

/// Reads back a trace written by [`EventLog`]. Unparseable lines are skipped.
pub fn read_events(path: &Path) -> anyhow::Result<Vec<EventRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
