//! Widget configuration
//!
//! Loaded from TOML with environment overrides on top.

use crate::{ChatlineError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8000/chat";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const ENV_CHATBOT_URL: &str = "CHATLINE_CHATBOT_URL";
const ENV_AUDIO_BASE_URL: &str = "CHATLINE_AUDIO_BASE_URL";
const ENV_REQUEST_TIMEOUT_SECS: &str = "CHATLINE_REQUEST_TIMEOUT_SECS";

/// Speech recognition settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 tag, e.g. `en-US`
    pub language: String,

    /// Whisper model file
    pub model_path: PathBuf,

    /// Hard cap on a single utterance
    pub max_capture_secs: u64,

    pub n_threads: i32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            max_capture_secs: 15,
            n_threads: 4,
        }
    }
}

impl SpeechConfig {
    pub fn max_capture(&self) -> Duration {
        Duration::from_secs(self.max_capture_secs)
    }

    /// Primary language subtag, which is what Whisper takes (`en-US` -> `en`)
    pub fn whisper_language(&self) -> String {
        self.language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Configuration for the whole widget
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatlineConfig {
    /// Chat endpoint receiving the POSTed question
    pub endpoint_url: String,

    /// Base for relative audio URLs; the endpoint's origin when unset
    pub audio_base_url: Option<String>,

    /// Per-request deadline in milliseconds
    pub request_timeout_ms: u64,

    /// Whether to offer voice input
    pub enable_speech_input: bool,

    /// Whether to play spoken replies
    pub enable_audio_output: bool,

    pub speech: SpeechConfig,
}

impl Default for ChatlineConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            audio_base_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            enable_speech_input: true,
            enable_audio_output: true,
            speech: SpeechConfig::default(),
        }
    }
}

impl ChatlineConfig {
    /// Load configuration from `path`, or from the user config dir if present.
    ///
    /// Missing files fall back to defaults. Environment overrides are applied
    /// last and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!("No config file at {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ChatlineError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: ChatlineConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CHATLINE_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CHATBOT_URL) {
            debug!("{} overrides endpoint", ENV_CHATBOT_URL);
            self.endpoint_url = url;
        }
        if let Some(url) = lookup(ENV_AUDIO_BASE_URL) {
            self.audio_base_url = Some(url);
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let whole: u64 = secs.trim().parse().map_err(|_| {
                ChatlineError::ConfigError(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}"
                ))
            })?;
            self.request_timeout_ms = whole.saturating_mul(1000);
        }
        Ok(())
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    pub fn with_audio_base_url(mut self, url: impl Into<String>) -> Self {
        self.audio_base_url = Some(url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Disable voice input (text-only mode)
    pub fn without_speech_input(mut self) -> Self {
        self.enable_speech_input = false;
        self
    }

    /// Disable spoken replies
    pub fn without_audio_output(mut self) -> Self {
        self.enable_audio_output = false;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL that relative audio paths are resolved against
    pub fn audio_base_url(&self) -> Result<Url> {
        match &self.audio_base_url {
            Some(base) => parse_url("audio base URL", base),
            None => {
                let endpoint = parse_url("endpoint URL", &self.endpoint_url)?;
                let origin = endpoint.origin().ascii_serialization();
                parse_url("endpoint origin", &origin)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        parse_url("endpoint URL", &self.endpoint_url)?;
        self.audio_base_url()?;

        if self.request_timeout_ms == 0 {
            return Err(ChatlineError::ConfigError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.speech.language.trim().is_empty() {
            return Err(ChatlineError::ConfigError(
                "Speech language must not be empty".to_string(),
            ));
        }
        if self.speech.max_capture_secs == 0 {
            return Err(ChatlineError::ConfigError(
                "Maximum capture length must be greater than 0".to_string(),
            ));
        }
        if self.enable_speech_input && !self.speech.model_path.exists() {
            warn!(
                "Whisper model not found at {:?}; voice input will be unavailable",
                self.speech.model_path
            );
        }

        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chatline").join("config.toml"))
}

fn parse_url(what: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| ChatlineError::ConfigError(format!("Invalid {what} {value:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ChatlineError::ConfigError(format!(
            "Invalid {what} {value:?}: not a hierarchical URL"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ChatlineConfig::default();
        assert_eq!(config.endpoint_url, "http://localhost:8000/chat");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.enable_speech_input);
        assert!(config.enable_audio_output);
        assert_eq!(config.speech.language, "en-US");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ChatlineConfig::default()
            .with_endpoint("https://bot.example.com/api/chat")
            .with_request_timeout(Duration::from_secs(5))
            .without_speech_input()
            .without_audio_output();

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(!config.enable_speech_input);
        assert!(!config.enable_audio_output);
    }

    #[test]
    fn test_sub_second_timeout_is_kept() {
        let config = ChatlineConfig::default().with_request_timeout(Duration::from_millis(1500));
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));

        let config = ChatlineConfig::default().with_request_timeout(Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_audio_base_defaults_to_endpoint_origin() {
        let config = ChatlineConfig::default().with_endpoint("https://bot.example.com:8443/api/chat");
        assert_eq!(
            config.audio_base_url().unwrap().as_str(),
            "https://bot.example.com:8443/"
        );

        let config = config.with_audio_base_url("https://cdn.example.com/voice/");
        assert_eq!(
            config.audio_base_url().unwrap().as_str(),
            "https://cdn.example.com/voice/"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ChatlineConfig::default().with_endpoint("not a url").validate().is_err());
        assert!(ChatlineConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());

        let mut config = ChatlineConfig::default();
        config.speech.language = " ".into();
        assert!(matches!(config.validate(), Err(ChatlineError::ConfigError(_))));

        let mut config = ChatlineConfig::default();
        config.speech.max_capture_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
endpoint_url = "http://127.0.0.1:9000/chat"
enable_audio_output = false

[speech]
language = "de-DE"
"#
        )
        .unwrap();

        let config = ChatlineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint_url, "http://127.0.0.1:9000/chat");
        assert!(!config.enable_audio_output);
        assert!(config.enable_speech_input);
        assert_eq!(config.speech.whisper_language(), "de");
        assert_eq!(config.speech.max_capture_secs, 15);
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_ms = \"soon\"").unwrap();
        assert!(matches!(
            ChatlineConfig::from_file(file.path()),
            Err(ChatlineError::ConfigError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CHATLINE_CHATBOT_URL", "https://bot.example.com/chat"),
            ("CHATLINE_REQUEST_TIMEOUT_SECS", "12"),
        ]
        .into_iter()
        .collect();

        let mut config = ChatlineConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.endpoint_url, "https://bot.example.com/chat");
        assert_eq!(config.request_timeout(), Duration::from_secs(12));
        assert_eq!(config.audio_base_url, None);

        let mut config = ChatlineConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "CHATLINE_REQUEST_TIMEOUT_SECS").then(|| "forever".to_string())
        });
        assert!(result.is_err());
    }
}
