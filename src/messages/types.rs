use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A citation returned by the remote model alongside an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// Handle to a playable audio resource, already resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the on-screen conversation.
///
/// Fields are private so a message cannot change once it has been built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
    sources: Vec<Source>,
    audio: Option<AudioRef>,
}

impl Message {
    /// Only the session builds messages, and it never passes blank text.
    fn new(role: Role, text: String) -> Self {
        debug_assert!(!text.trim().is_empty(), "message text must not be empty");
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            timestamp: Utc::now(),
            sources: Vec::new(),
            audio: None,
        }
    }

    pub(crate) fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into())
    }

    pub(crate) fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into())
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Audio is only meaningful on assistant replies; it is ignored for user messages.
    pub fn with_audio(mut self, audio: Option<AudioRef>) -> Self {
        if self.role == Role::Assistant {
            self.audio = audio;
        }
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn audio(&self) -> Option<&AudioRef> {
        self.audio.as_ref()
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_ignores_audio() {
        let msg = Message::user("hello").with_audio(Some(AudioRef::new("http://x/a.mp3")));
        assert!(msg.audio().is_none());
        assert!(msg.is_user());
    }

    #[test]
    fn test_assistant_message_with_sources() {
        let msg = Message::assistant("hi")
            .with_sources(vec![Source {
                title: "Project A".into(),
                kind: "project".into(),
                id: "p1".into(),
            }])
            .with_audio(Some(AudioRef::new("http://x/a.mp3")));

        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.sources().len(), 1);
        assert_eq!(msg.audio().map(AudioRef::url), Some("http://x/a.mp3"));
    }

    #[test]
    fn test_source_wire_format() {
        let source: Source =
            serde_json::from_str(r#"{"title":"Blog","type":"blog","id":"b7"}"#).unwrap();
        assert_eq!(source.kind, "blog");
    }
}
