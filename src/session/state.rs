//! Conversation session state machine
//!
//! [`SessionState`] is a single owned value. Every change goes through
//! [`SessionState::apply`], which mutates the state and returns the side
//! effects (network, audio) the caller must carry out. No I/O happens here,
//! so the whole turn lifecycle is testable without adapters.
//!
//! ```text
//! Idle --submit--> AwaitingResponse --response--> Idle
//!                                   --failure---> Error --submit/clear/dismiss--> ...
//! ```

use crate::messages::{
    to_history_pair, AudioRef, ChatTranscript, ExchangeHistoryWindow, Message,
};
use crate::remote::{ChatReply, ChatRequest};
use std::fmt;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Shown when the endpoint answers with an empty body
pub const FALLBACK_ANSWER: &str = "I'm sorry, I couldn't generate a response.";

/// Shown in place of an answer when the request fails
pub const CONNECTION_FAILURE_ANSWER: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again later.";

/// Request lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Ready for input
    #[default]
    Idle,
    /// One request is in flight; further submissions are ignored
    AwaitingResponse,
    /// The last request failed. Accepts input exactly like `Idle`
    Error,
}

impl Phase {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Phase::AwaitingResponse)
    }

    /// Whether the input control should be enabled
    pub fn accepts_input(&self) -> bool {
        !self.is_awaiting()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::AwaitingResponse => write!(f, "AwaitingResponse"),
            Phase::Error => write!(f, "Error"),
        }
    }
}

/// User-visible failure recorded on the session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Speech capture failed: {0}")]
    SpeechCaptureFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

impl SessionError {
    /// Banner text shown in the widget
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::SpeechCaptureFailed(_) => "Speech recognition failed",
            SessionError::RequestFailed(_) => "Connection failed",
            SessionError::PlaybackFailed(_) => "Audio playback failed",
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// User submitted text (typed or transcribed)
    Submit(String),

    /// The endpoint answered request `request_id`
    ResponseReceived { request_id: Uuid, reply: ChatReply },

    /// Request `request_id` failed or timed out
    RequestFailed { request_id: Uuid, error: String },

    /// Wipe the conversation
    Clear,

    ToggleVoiceMode,

    /// Speech capture began
    ListeningStarted,

    /// Speech capture ended, by stop or by a recognized utterance
    ListeningStopped,

    SpeechFailed(String),

    PlaybackStarted,

    /// Playback ended naturally or was stopped
    PlaybackStopped,

    PlaybackFailed(String),

    /// Hide the current error banner
    DismissError,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Issue the remote request; its outcome must come back tagged with `request_id`
    SendRequest {
        request_id: Uuid,
        request: ChatRequest,
    },

    /// Start playback, replacing anything already playing
    PlayAudio(AudioRef),

    StopAudio,
}

/// The turn currently awaiting an answer
#[derive(Debug, Clone)]
struct PendingTurn {
    request_id: Uuid,
    question: String,
}

/// Owned conversation state
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    transcript: ChatTranscript,
    history: ExchangeHistoryWindow,
    phase: Phase,
    pending: Option<PendingTurn>,
    voice_mode: bool,
    listening: bool,
    playing: bool,
    last_error: Option<SessionError>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and return the effects it requires
    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::Submit(text) => self.submit(&text),
            SessionEvent::ResponseReceived { request_id, reply } => {
                self.on_response(request_id, reply)
            }
            SessionEvent::RequestFailed { request_id, error } => {
                self.on_request_failure(request_id, error)
            }
            SessionEvent::Clear => self.clear(),
            SessionEvent::ToggleVoiceMode => self.toggle_voice_mode(),
            SessionEvent::ListeningStarted => {
                self.listening = true;
                self.dismiss_error();
                Vec::new()
            }
            SessionEvent::ListeningStopped => {
                self.listening = false;
                Vec::new()
            }
            SessionEvent::SpeechFailed(code) => {
                self.listening = false;
                self.last_error = Some(SessionError::SpeechCaptureFailed(code));
                Vec::new()
            }
            SessionEvent::PlaybackStarted => {
                self.playing = true;
                Vec::new()
            }
            SessionEvent::PlaybackStopped => {
                self.playing = false;
                Vec::new()
            }
            SessionEvent::PlaybackFailed(reason) => {
                self.playing = false;
                self.last_error = Some(SessionError::PlaybackFailed(reason));
                Vec::new()
            }
            SessionEvent::DismissError => {
                self.dismiss_error();
                Vec::new()
            }
        }
    }

    /// Start a turn. Ignored for blank text or while a request is in flight.
    pub fn submit(&mut self, text: &str) -> Vec<SessionEffect> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return Vec::new();
        }
        if self.phase.is_awaiting() {
            debug!("Ignoring submission while a request is in flight");
            return Vec::new();
        }

        let request_id = Uuid::new_v4();
        // History is captured before this turn's pair exists
        let request = ChatRequest::new(text, self.voice_mode, self.history.snapshot());

        self.transcript.append(Message::user(text));
        self.last_error = None;
        self.phase = Phase::AwaitingResponse;
        self.pending = Some(PendingTurn {
            request_id,
            question: text.to_string(),
        });

        debug!("Submitted turn {}", request_id);
        vec![SessionEffect::SendRequest {
            request_id,
            request,
        }]
    }

    /// Apply an answer. Answers for anything but the pending turn are dropped.
    pub fn on_response(&mut self, request_id: Uuid, reply: ChatReply) -> Vec<SessionEffect> {
        let Some(turn) = self.take_pending(request_id) else {
            debug!("Discarding stale response {}", request_id);
            return Vec::new();
        };

        let audio = if self.voice_mode { reply.audio } else { None };
        let display = if reply.answer.trim().is_empty() {
            FALLBACK_ANSWER.to_string()
        } else {
            reply.answer.clone()
        };

        self.transcript.append(
            Message::assistant(display)
                .with_sources(reply.sources)
                .with_audio(audio.clone()),
        );
        self.history
            .push(to_history_pair(&turn.question, &reply.answer));
        self.phase = Phase::Idle;

        match audio {
            Some(audio) => vec![SessionEffect::PlayAudio(audio)],
            None => Vec::new(),
        }
    }

    /// Record a failed turn: visible in the transcript, absent from history
    pub fn on_request_failure(&mut self, request_id: Uuid, error: String) -> Vec<SessionEffect> {
        if self.take_pending(request_id).is_none() {
            debug!("Discarding stale failure {}: {}", request_id, error);
            return Vec::new();
        }

        self.transcript
            .append(Message::assistant(CONNECTION_FAILURE_ANSWER));
        self.last_error = Some(SessionError::RequestFailed(error));
        self.phase = Phase::Error;
        Vec::new()
    }

    /// Reset transcript and history. The in-flight request, if any, is abandoned.
    pub fn clear(&mut self) -> Vec<SessionEffect> {
        if let Some(turn) = self.pending.take() {
            debug!("Abandoning in-flight request {}", turn.request_id);
        }
        self.transcript.clear();
        self.history.clear();
        self.last_error = None;
        self.phase = Phase::Idle;
        Vec::new()
    }

    /// Flip voice mode. Turning it off silences any playback.
    pub fn toggle_voice_mode(&mut self) -> Vec<SessionEffect> {
        self.voice_mode = !self.voice_mode;
        debug!("Voice mode {}", if self.voice_mode { "on" } else { "off" });

        if !self.voice_mode && self.playing {
            self.playing = false;
            return vec![SessionEffect::StopAudio];
        }
        Vec::new()
    }

    fn dismiss_error(&mut self) {
        self.last_error = None;
        if self.phase == Phase::Error {
            self.phase = Phase::Idle;
        }
    }

    fn take_pending(&mut self, request_id: Uuid) -> Option<PendingTurn> {
        match &self.pending {
            Some(turn) if turn.request_id == request_id => self.pending.take(),
            _ => None,
        }
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn history(&self) -> &ExchangeHistoryWindow {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_request_id(&self) -> Option<Uuid> {
        self.pending.as_ref().map(|turn| turn.request_id)
    }

    pub fn voice_mode_enabled(&self) -> bool {
        self.voice_mode
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_id(effects: &[SessionEffect]) -> Uuid {
        match effects {
            [SessionEffect::SendRequest { request_id, .. }] => *request_id,
            other => panic!("expected a single request, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_trims_and_sends() {
        let mut state = SessionState::new();
        let effects = state.submit("  hello  ");

        match &effects[..] {
            [SessionEffect::SendRequest { request, .. }] => {
                assert_eq!(request.question, "hello");
                assert!(request.conversation_history.is_empty());
                assert!(!request.use_voice);
            }
            other => panic!("unexpected effects: {other:?}"),
        }
        assert_eq!(state.transcript().messages()[0].text(), "hello");
        assert_eq!(state.phase(), Phase::AwaitingResponse);
    }

    #[test]
    fn test_whitespace_submit_is_ignored() {
        let mut state = SessionState::new();
        assert!(state.submit("   \n\t").is_empty());
        assert!(state.transcript().is_empty());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_empty_answer_uses_fallback_text() {
        let mut state = SessionState::new();
        let id = request_id(&state.submit("hello"));
        state.on_response(id, ChatReply::text(""));

        assert_eq!(state.transcript().messages()[1].text(), FALLBACK_ANSWER);
        assert_eq!(state.history().snapshot()[0].assistant, "");
    }

    #[test]
    fn test_blank_answer_never_builds_blank_message() {
        let mut state = SessionState::new();
        let id = request_id(&state.submit("hello"));
        state.on_response(id, ChatReply::text(" \n "));

        assert!(state
            .transcript()
            .messages()
            .iter()
            .all(|message| !message.text().trim().is_empty()));
        assert_eq!(state.transcript().messages()[1].text(), FALLBACK_ANSWER);
    }

    #[test]
    fn test_audio_ignored_outside_voice_mode() {
        let mut state = SessionState::new();
        let id = request_id(&state.submit("hello"));
        let effects = state.on_response(
            id,
            ChatReply::text("hi").with_audio(AudioRef::new("http://x/a.mp3")),
        );

        assert!(effects.is_empty());
        assert!(state.transcript().messages()[1].audio().is_none());
    }

    #[test]
    fn test_failure_enters_error_phase_and_recovers() {
        let mut state = SessionState::new();
        let id = request_id(&state.submit("hello"));
        state.on_request_failure(id, "status 500".into());

        assert_eq!(state.phase(), Phase::Error);
        assert!(state.phase().accepts_input());
        assert_eq!(
            state.last_error(),
            Some(&SessionError::RequestFailed("status 500".into()))
        );

        let effects = state.submit("again");
        assert_eq!(effects.len(), 1);
        assert_eq!(state.phase(), Phase::AwaitingResponse);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_dismiss_error_returns_to_idle() {
        let mut state = SessionState::new();
        let id = request_id(&state.submit("hello"));
        state.on_request_failure(id, "offline".into());

        state.apply(SessionEvent::DismissError);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_speech_failure_leaves_conversation_untouched() {
        let mut state = SessionState::new();
        state.apply(SessionEvent::ListeningStarted);
        assert!(state.is_listening());

        state.apply(SessionEvent::SpeechFailed("no-speech".into()));
        assert!(!state.is_listening());
        assert!(state.transcript().is_empty());
        assert!(state.history().is_empty());
        assert_eq!(state.last_error().map(|e| e.user_message()), Some("Speech recognition failed"));
    }

    #[test]
    fn test_playback_failure_resets_playing() {
        let mut state = SessionState::new();
        state.apply(SessionEvent::PlaybackStarted);
        state.apply(SessionEvent::PlaybackFailed("decode error".into()));

        assert!(!state.is_playing());
        assert_eq!(state.phase(), Phase::Idle);
        assert!(matches!(state.last_error(), Some(SessionError::PlaybackFailed(_))));
    }

    #[test]
    fn test_clear_preserves_voice_mode() {
        let mut state = SessionState::new();
        state.toggle_voice_mode();
        let id = request_id(&state.submit("hello"));
        state.on_response(id, ChatReply::text("hi"));

        state.clear();
        assert!(state.voice_mode_enabled());
        assert!(state.transcript().is_empty());
        assert!(state.history().is_empty());
    }
}
