//! The durable running summary for a chat session.
//!
//! Once turns are trimmed from the transcript, this file is their only
//! remaining representation, so writes are atomic (temp file + rename)
//! and a malformed file degrades to "no summary" instead of crashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Running summary of the turns no longer kept verbatim.
///
/// On-disk shape: `{ "summary", "originalMessageCount", "lastUpdated" }`.
/// `original_message_count` doubles as the compression cursor: it is the
/// exact number of turns the summary has absorbed, so
/// `original_message_count + transcript.len()` is always the logical
/// session length.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryState {
    pub summary: String,
    pub original_message_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl SummaryState {
    pub fn new(summary: impl Into<String>, original_message_count: usize) -> Self {
        Self {
            summary: summary.into(),
            original_message_count,
            last_updated: Utc::now(),
        }
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("failed to create summary dir: {e}"))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize summary: {e}"))?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| format!("failed to write temp summary: {e}"))?;
        std::fs::rename(&tmp_path, path).map_err(|e| format!("failed to rename summary: {e}"))
    }

    /// Load the summary. Missing file means the session has never been
    /// compressed; a malformed file is logged and treated the same way.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!("unreadable summary at {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(
                    "malformed summary at {}: {e}; treating as absent",
                    path.display()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        let state = SummaryState::new("They discussed Rust lifetimes.", 20);
        state.save(&path).unwrap();

        let loaded = SummaryState::load(&path).unwrap();
        assert_eq!(loaded.summary, "They discussed Rust lifetimes.");
        assert_eq!(loaded.original_message_count, 20);
    }

    #[test]
    fn file_shape_is_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        SummaryState::new("s", 7).save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["originalMessageCount"], 7);
        assert!(raw["lastUpdated"].is_string());
        assert!(raw.get("original_message_count").is_none());
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SummaryState::load(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn malformed_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        std::fs::write(&path, r#"{"summary": 42}"#).unwrap();
        assert!(SummaryState::load(&path).is_none());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        SummaryState::new("s", 1).save(&path).unwrap();
        assert!(!dir.path().join("summary.json.tmp").exists());
    }
}
