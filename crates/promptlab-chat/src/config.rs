//! Chat-session configuration derived from the shared settings file.

use std::path::{Path, PathBuf};

use promptlab::config::Settings;
use promptlab::context::SummaryWindow;

/// Configuration for one chat session.
///
/// Bridges the flat [`Settings`] file into the pieces the chat loop needs:
/// the summarization window and the on-disk location of the session files.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier for both replies and summarization calls.
    pub model: String,
    /// Response token cap.
    pub max_tokens: Option<u32>,
    /// Sampling temperature for replies.
    pub temperature: Option<f32>,
    /// Newest turns always kept verbatim.
    pub recent_window: usize,
    /// Un-summarized non-recent turns required before compression.
    pub batch_threshold: usize,
    /// Directory holding `history.json` and `summary.json`.
    pub session_dir: PathBuf,
}

impl ChatConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            recent_window: settings.recent_window,
            batch_threshold: settings.batch_threshold,
            session_dir: Path::new(&settings.output_dir).join("chat"),
        }
    }

    pub fn history_path(&self) -> PathBuf {
        self.session_dir.join("history.json")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.session_dir.join("summary.json")
    }

    /// Build the [`SummaryWindow`] for this session.
    pub fn window(&self) -> SummaryWindow {
        SummaryWindow::new(self.recent_window, self.batch_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_the_session_dir() {
        let settings = Settings {
            output_dir: "results".to_string(),
            ..Settings::default()
        };

        let config = ChatConfig::from_settings(&settings);
        assert_eq!(config.session_dir, Path::new("results/chat"));
        assert_eq!(config.history_path(), Path::new("results/chat/history.json"));
        assert_eq!(config.summary_path(), Path::new("results/chat/summary.json"));
    }

    #[test]
    fn window_carries_settings_thresholds() {
        let settings = Settings {
            recent_window: 5,
            batch_threshold: 10,
            ..Settings::default()
        };

        let window = ChatConfig::from_settings(&settings).window();
        assert_eq!(window.recent_window, 5);
        assert_eq!(window.batch_threshold, 10);
    }
}
