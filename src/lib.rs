//! Chatline - conversational assistant chat widget
//!
//! The crate coordinates three independently failing subsystems behind one
//! owned session state: voice/text input capture, a remote chat endpoint,
//! and spoken-reply playback.

pub mod audio;
pub mod integration;
pub mod messages;
pub mod remote;
pub mod session;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatlineError {
    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("Response decode error: {0}")]
    DecodeError(String),

    #[error("Speech capture error: {0}")]
    SpeechError(String),

    #[error("Speech input unavailable: {0}")]
    SpeechUnavailable(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Model load error: {0}")]
    ModelLoadError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ChatlineError {
    fn from(e: std::io::Error) -> Self {
        ChatlineError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for ChatlineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatlineError::RequestTimeout(e.to_string())
        } else if e.is_decode() {
            ChatlineError::DecodeError(e.to_string())
        } else {
            ChatlineError::RequestError(e.to_string())
        }
    }
}

impl From<toml::de::Error> for ChatlineError {
    fn from(e: toml::de::Error) -> Self {
        ChatlineError::ConfigError(e.to_string())
    }
}

impl ChatlineError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Network and capture failures are transient, the user can retry
            ChatlineError::RequestError(_) => true,
            ChatlineError::RequestTimeout(_) => true,
            ChatlineError::DecodeError(_) => true,
            ChatlineError::SpeechError(_) => true,
            ChatlineError::PlaybackError(_) => true,
            // Missing platform capabilities need user intervention
            ChatlineError::SpeechUnavailable(_) => false,
            ChatlineError::AudioDeviceError(_) => false,
            ChatlineError::ModelLoadError(_) => false,
            ChatlineError::ConfigError(_) => false,
            ChatlineError::ChannelError(_) => false,
            ChatlineError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ChatlineError::RequestError(_)
            | ChatlineError::RequestTimeout(_)
            | ChatlineError::DecodeError(_) => "Connection failed".to_string(),
            ChatlineError::SpeechError(_) => "Speech recognition failed".to_string(),
            ChatlineError::SpeechUnavailable(_) => {
                "Voice input is not available on this system.".to_string()
            }
            ChatlineError::PlaybackError(_) => "Audio playback failed".to_string(),
            ChatlineError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            ChatlineError::ModelLoadError(_) => {
                "Failed to load the speech model. Please verify model files are present."
                    .to_string()
            }
            ChatlineError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            ChatlineError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            ChatlineError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(ChatlineError::RequestTimeout("30s".into()).is_recoverable());
        assert!(ChatlineError::PlaybackError("decode".into()).is_recoverable());
        assert!(!ChatlineError::ConfigError("bad url".into()).is_recoverable());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ChatlineError::RequestError("status 500".into()).user_message(),
            "Connection failed"
        );
        assert_eq!(
            ChatlineError::SpeechError("aborted".into()).user_message(),
            "Speech recognition failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(ChatlineError::from(io), ChatlineError::IOError(_)));
    }
}
