//! Wire types for the remote chat endpoint

use crate::messages::{AudioRef, ExchangePair, Source};
use crate::{ChatlineError, Result};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

/// Body POSTed to the chat endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// Always empty; kept for wire compatibility
    pub context: Vec<serde_json::Value>,
    pub use_voice: bool,
    pub conversation_history: Vec<ExchangePair>,
}

impl ChatRequest {
    pub fn new(
        question: impl Into<String>,
        use_voice: bool,
        conversation_history: Vec<ExchangePair>,
    ) -> Self {
        Self {
            question: question.into(),
            context: Vec::new(),
            use_voice,
            conversation_history,
        }
    }
}

/// Body returned by the chat endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChatResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatResponse {
    /// Resolve `audio_url` against `audio_base` and produce the reply the session consumes.
    ///
    /// An unresolvable audio path drops the audio but keeps the answer.
    pub fn into_reply(self, audio_base: &str) -> ChatReply {
        let audio = match self.audio_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(path) => match resolve_audio_url(audio_base, path) {
                Ok(audio) => Some(audio),
                Err(e) => {
                    tracing::warn!("Dropping unresolvable audio url {:?}: {}", path, e);
                    None
                }
            },
            None => None,
        };

        ChatReply {
            answer: self.answer,
            sources: self.sources,
            audio,
        }
    }
}

/// A decoded, resolved answer ready to be applied to the session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub sources: Vec<Source>,
    pub audio: Option<AudioRef>,
}

impl ChatReply {
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Default::default()
        }
    }

    pub fn with_audio(mut self, audio: AudioRef) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}

/// Append a (usually relative) audio path to the configured base URL.
///
/// `/audio/x.mp3` on `https://cdn.example.com/voice` gives
/// `https://cdn.example.com/voice/audio/x.mp3`. Absolute URLs are kept.
pub fn resolve_audio_url(base: &str, path: &str) -> Result<AudioRef> {
    let mut base = Url::parse(base)
        .map_err(|e| ChatlineError::ConfigError(format!("Invalid audio base url {base:?}: {e}")))?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    let relative = if path.starts_with("//") {
        path
    } else {
        path.trim_start_matches('/')
    };
    let url = base
        .join(relative)
        .map_err(|e| ChatlineError::DecodeError(format!("Invalid audio url {path:?}: {e}")))?;
    Ok(AudioRef::new(url.to_string()))
}
