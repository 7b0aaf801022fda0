//! Flat JSON settings file shared by every binary.
//!
//! Everything in [`Settings`] has a serde default, so a partial file (or no
//! file at all) is fine. The API key deliberately has no place here — it is
//! read from the environment variable named by `api_key_env`.

use serde::Deserialize;
use tracing::info;

use crate::api::retry::RetryConfig;
use crate::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiClient};

/// Settings for a promptlab run, loaded from a `settings.json` file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API root without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Response token cap. `None` leaves it to the server.
    pub max_tokens: Option<u32>,
    /// Sampling temperature. `None` leaves it to the server.
    pub temperature: Option<f32>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient API failures.
    pub max_retries: u32,
    /// Newest turns always kept verbatim in the chat context.
    pub recent_window: usize,
    /// Un-summarized non-recent turns required before compression fires.
    pub batch_threshold: usize,
    /// Directory for Markdown/JSON reports and chat session files.
    pub output_dir: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: Some(1024),
            temperature: Some(0.7),
            timeout_secs: 60,
            max_retries: 2,
            recent_window: 3,
            batch_threshold: 20,
            output_dir: "out".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &str) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read settings file '{path}': {e}"))?;
        serde_json::from_str(&json)
            .map_err(|e| format!("failed to parse settings file '{path}': {e}"))
    }

    /// Load settings, falling back to defaults when the file doesn't exist.
    /// An existing-but-malformed file is still an error — silently ignoring
    /// a broken config sends requests to the wrong place.
    pub fn load_or_default(path: &str) -> Result<Self, String> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            info!("settings file '{path}' not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| format!("{} environment variable is not set", self.api_key_env))
    }

    /// Build an [`OpenAiClient`] from these settings.
    pub fn client(&self) -> Result<OpenAiClient, String> {
        OpenAiClient::new(&self.base_url, self.api_key()?, self.timeout_secs)
    }

    /// Retry policy from these settings.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::with_retries(self.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.model, DEFAULT_MODEL);
        assert_eq!(s.recent_window, 3);
        assert_eq!(s.batch_threshold, 20);
        assert_eq!(s.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"model": "local-llama", "recent_window": 5}}"#).unwrap();

        let s = Settings::load(path.to_str().unwrap()).unwrap();
        assert_eq!(s.model, "local-llama");
        assert_eq!(s.recent_window, 5);
        assert_eq!(s.batch_threshold, 20); // default
        assert_eq!(s.base_url, DEFAULT_BASE_URL); // default
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let s = Settings::load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(s.model, DEFAULT_MODEL);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ model: unquoted }").unwrap();

        assert!(Settings::load_or_default(path.to_str().unwrap()).is_err());
    }
}
