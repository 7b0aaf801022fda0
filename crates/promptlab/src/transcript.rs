//! Role-tagged conversation turns and their on-disk form.
//!
//! A [`Transcript`] is append-only: turns are never edited once recorded.
//! The single exception is [`trim_to_recent`](Transcript::trim_to_recent),
//! which drops the oldest turns right after they have been folded into a
//! summary (see [`crate::context`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::{Message, MessageRole};

/// One chat exchange unit: a role, its text, and when it was recorded.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// The wire message for this turn (timestamp stripped).
    pub fn message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// On-disk shape: `{ "messages": [ {role, content, timestamp}, ... ] }`.
#[derive(Serialize, Deserialize, Debug, Default)]
struct TranscriptFile {
    messages: Vec<Turn>,
}

/// The ordered history of turns for one session.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `n` turns (or all of them when fewer exist).
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Front-trim to the last `n` turns. Called only after the dropped
    /// turns have been folded into a summary.
    pub fn trim_to_recent(&mut self, n: usize) {
        let excess = self.turns.len().saturating_sub(n);
        if excess > 0 {
            self.turns.drain(..excess);
        }
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("failed to create transcript dir: {e}"))?;
        }

        let file = TranscriptFile {
            messages: self.turns.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| format!("failed to serialize transcript: {e}"))?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| format!("failed to write temp transcript: {e}"))?;
        std::fs::rename(&tmp_path, path).map_err(|e| format!("failed to rename transcript: {e}"))
    }

    /// Load a transcript. A missing file is a fresh session; a malformed
    /// file is logged and treated the same way rather than crashing.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!("unreadable transcript at {}: {e}", path.display());
                return Self::new();
            }
        };
        match serde_json::from_str::<TranscriptFile>(&json) {
            Ok(file) => Self {
                turns: file.messages,
            },
            Err(e) => {
                warn!(
                    "malformed transcript at {}: {e}; starting fresh",
                    path.display()
                );
                Self::new()
            }
        }
    }
}
