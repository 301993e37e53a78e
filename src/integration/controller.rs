//! Widget controller
//!
//! Owns the UI-visible flags, the text draft and the [`SessionState`], and
//! wires the session's effects to the chat pipeline, speech adapter and
//! playback controller. All state changes happen on the thread that calls
//! [`WidgetController::poll_events`].

use crate::audio::{AudioPlaybackController, AudioSink, NullSink, PlaybackEvent};
use crate::integration::config::ChatlineConfig;
use crate::messages::AudioRef;
use crate::remote::{ChatBackend, ChatCommand, ChatEvent, ChatPipeline, HttpChatBackend};
use crate::session::{SessionEffect, SessionEvent, SessionState};
use crate::speech::{SpeechEvent, SpeechInputAdapter, SpeechRecognizer};
use crate::{ChatlineError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

pub struct WidgetController {
    config: ChatlineConfig,

    open: bool,
    maximized: bool,

    /// Text box contents
    input: String,

    session: SessionState,

    command_tx: Sender<ChatCommand>,
    event_rx: Receiver<ChatEvent>,
    worker: Option<JoinHandle<()>>,

    speech: SpeechInputAdapter,
    playback: AudioPlaybackController,
}

impl WidgetController {
    /// Build a controller around explicit adapters.
    ///
    /// `recognizer` is `None` when the platform has no speech recognition.
    pub fn new(
        config: ChatlineConfig,
        backend: Arc<dyn ChatBackend>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        sink: Box<dyn AudioSink>,
    ) -> Result<Self> {
        config.validate()?;

        let pipeline = ChatPipeline::new(
            backend,
            config.audio_base_url()?.as_str(),
            config.request_timeout(),
        );
        let command_tx = pipeline.command_sender();
        let event_rx = pipeline.event_receiver();
        let worker = pipeline.start_worker()?;

        let recognizer = if config.enable_speech_input {
            recognizer
        } else {
            None
        };
        let speech = SpeechInputAdapter::new(recognizer);
        let sink: Box<dyn AudioSink> = if config.enable_audio_output {
            sink
        } else {
            Box::new(NullSink)
        };

        info!(
            "Widget controller ready (endpoint: {}, speech: {})",
            config.endpoint_url,
            if speech.is_available() { "available" } else { "unavailable" }
        );

        Ok(Self {
            config,
            open: false,
            maximized: false,
            input: String::new(),
            session: SessionState::new(),
            command_tx,
            event_rx,
            worker: Some(worker),
            speech,
            playback: AudioPlaybackController::new(sink),
        })
    }

    /// Build a controller with the HTTP backend and whatever local audio exists
    pub fn from_config(config: ChatlineConfig) -> Result<Self> {
        let backend = Arc::new(HttpChatBackend::new(config.endpoint_url.clone())?);
        let recognizer = platform_recognizer(&config);
        let sink = platform_sink(&config);
        Self::new(config, backend, recognizer, sink)
    }

    pub fn config(&self) -> &ChatlineConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    pub fn open(&mut self) {
        if !self.open {
            self.open = true;
            info!(widget_opened = true, "Chat widget opened");
        }
    }

    /// Close the widget. The conversation is kept.
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            self.maximized = false;
            info!(widget_closed = true, "Chat widget closed");
        }
    }

    pub fn toggle_open(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn toggle_maximized(&mut self) {
        self.maximized = !self.maximized;
        debug!("Chat widget maximized: {}", self.maximized);
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether the send button should be enabled
    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && self.session.phase().accepts_input()
    }

    /// Submit the draft. The draft is cleared only if the turn was accepted.
    pub fn send_input(&mut self) -> bool {
        let draft = self.input.clone();
        if self.submit(&draft) {
            self.input.clear();
            true
        } else {
            false
        }
    }

    /// Submit `text` as a new turn. Returns whether it was accepted.
    pub fn submit(&mut self, text: &str) -> bool {
        let effects = self.session.apply(SessionEvent::Submit(text.to_string()));
        let accepted = !effects.is_empty();
        self.run_effects(effects);
        accepted
    }

    /// Wipe the conversation. Playback and voice mode are left alone.
    pub fn clear(&mut self) {
        let effects = self.session.apply(SessionEvent::Clear);
        self.run_effects(effects);
        info!("Conversation cleared");
    }

    pub fn toggle_voice_mode(&mut self) {
        let effects = self.session.apply(SessionEvent::ToggleVoiceMode);
        self.run_effects(effects);
        info!(
            "Voice mode {}",
            if self.session.voice_mode_enabled() { "enabled" } else { "disabled" }
        );
    }

    pub fn dismiss_error(&mut self) {
        self.session.apply(SessionEvent::DismissError);
    }

    /// Whether voice input affordances should be enabled
    pub fn speech_available(&self) -> bool {
        self.speech.is_available()
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_listening()
    }

    pub fn start_listening(&mut self) {
        match self.speech.start() {
            Ok(true) => {
                self.session.apply(SessionEvent::ListeningStarted);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Could not start speech capture: {}", e);
                self.session.apply(SessionEvent::SpeechFailed(error_detail(e)));
            }
        }
    }

    /// End the capture early. The transcript of what was said still arrives.
    pub fn stop_listening(&mut self) {
        if self.speech.stop() {
            self.session.apply(SessionEvent::ListeningStopped);
        }
    }

    pub fn toggle_listening(&mut self) {
        if self.speech.is_capturing() {
            self.stop_listening();
        } else {
            self.start_listening();
        }
    }

    /// Replay an assistant message's audio. Ignored while voice mode is off.
    pub fn play_message_audio(&mut self, audio: &AudioRef) {
        if !self.session.voice_mode_enabled() {
            debug!("Voice mode is off, not playing {}", audio);
            return;
        }
        self.start_playback(audio);
    }

    pub fn stop_audio(&mut self) {
        if self.playback.stop() {
            self.session.apply(SessionEvent::PlaybackStopped);
        }
    }

    /// Whether `audio` is the clip currently playing
    pub fn is_playing_audio(&self, audio: &AudioRef) -> bool {
        self.playback.current() == Some(audio)
    }

    /// Drain all adapter channels into the session.
    ///
    /// Call once per frame. Returns the number of events applied.
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;

        let chat_events: Vec<ChatEvent> = self.event_rx.try_iter().collect();
        for event in chat_events {
            let session_event = match event {
                ChatEvent::Answered {
                    request_id,
                    reply,
                    elapsed_ms,
                } => {
                    debug!("Answer for {} after {}ms", request_id, elapsed_ms);
                    SessionEvent::ResponseReceived { request_id, reply }
                }
                ChatEvent::Failed { request_id, error } => SessionEvent::RequestFailed {
                    request_id,
                    error: error.to_string(),
                },
                ChatEvent::Shutdown => {
                    debug!("Chat pipeline shut down");
                    continue;
                }
            };
            let effects = self.session.apply(session_event);
            self.run_effects(effects);
            applied += 1;
        }

        if let Some(event) = self.speech.poll() {
            match event {
                SpeechEvent::Recognized(text) => {
                    info!("Recognized speech: '{}'", text);
                    self.session.apply(SessionEvent::ListeningStopped);
                    self.input = text;
                }
                SpeechEvent::Failed(code) => {
                    warn!("Speech capture failed: {}", code);
                    self.session.apply(SessionEvent::SpeechFailed(code));
                }
            }
            applied += 1;
        }

        while let Some(event) = self.playback.poll() {
            match event {
                PlaybackEvent::Finished(_) => {
                    self.session.apply(SessionEvent::PlaybackStopped);
                }
                PlaybackEvent::Failed { reason, .. } => {
                    self.session.apply(SessionEvent::PlaybackFailed(reason));
                }
            }
            applied += 1;
        }

        applied
    }

    fn run_effects(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::SendRequest {
                    request_id,
                    request,
                } => {
                    if let Err(e) = self.command_tx.send(ChatCommand::Ask {
                        request_id,
                        request,
                    }) {
                        warn!("Chat pipeline unavailable: {}", e);
                        self.session.apply(SessionEvent::RequestFailed {
                            request_id,
                            error: ChatlineError::ChannelError("chat pipeline stopped".into())
                                .to_string(),
                        });
                    }
                }
                SessionEffect::PlayAudio(audio) => self.start_playback(&audio),
                SessionEffect::StopAudio => {
                    self.playback.stop();
                }
            }
        }
    }

    fn start_playback(&mut self, audio: &AudioRef) {
        match self.playback.play(audio) {
            Ok(_) => {
                self.session.apply(SessionEvent::PlaybackStarted);
            }
            Err(e) => {
                warn!("Playback of {} failed: {}", audio, e);
                self.session.apply(SessionEvent::PlaybackFailed(error_detail(e)));
            }
        }
    }
}

impl Drop for WidgetController {
    fn drop(&mut self) {
        let _ = self.command_tx.send(ChatCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Inner message of an adapter error, without the variant prefix
fn error_detail(error: ChatlineError) -> String {
    match error {
        ChatlineError::PlaybackError(detail)
        | ChatlineError::SpeechError(detail)
        | ChatlineError::SpeechUnavailable(detail) => detail,
        other => other.to_string(),
    }
}

#[cfg(feature = "audio-io")]
fn platform_recognizer(config: &ChatlineConfig) -> Option<Box<dyn SpeechRecognizer>> {
    if !config.enable_speech_input {
        return None;
    }
    match crate::speech::WhisperRecognizer::probe(&config.speech) {
        Ok(recognizer) => Some(Box::new(recognizer)),
        Err(e) => {
            warn!("Speech input unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "audio-io"))]
fn platform_recognizer(_config: &ChatlineConfig) -> Option<Box<dyn SpeechRecognizer>> {
    debug!("Built without audio-io, speech input unavailable");
    None
}

#[cfg(feature = "audio-io")]
fn platform_sink(config: &ChatlineConfig) -> Box<dyn AudioSink> {
    if !config.enable_audio_output {
        return Box::new(NullSink);
    }
    match crate::audio::RodioSink::new(config.request_timeout()) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            warn!("Audio output unavailable: {}", e);
            Box::new(NullSink)
        }
    }
}

#[cfg(not(feature = "audio-io"))]
fn platform_sink(_config: &ChatlineConfig) -> Box<dyn AudioSink> {
    Box::new(NullSink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ChatRequest, ChatResponse};
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    struct CannedBackend;

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                answer: format!("you said {}", request.question),
                ..Default::default()
            })
        }
    }

    fn controller() -> WidgetController {
        WidgetController::new(
            ChatlineConfig::default(),
            Arc::new(CannedBackend),
            None,
            Box::new(NullSink),
        )
        .unwrap()
    }

    fn wait_idle(controller: &mut WidgetController) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.session().phase().is_awaiting() && Instant::now() < deadline {
            controller.poll_events();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_close_keeps_conversation_and_unmaximizes() {
        let mut controller = controller();
        controller.open();
        controller.toggle_maximized();
        controller.submit("hi");
        wait_idle(&mut controller);

        controller.close();
        assert!(!controller.is_open());
        assert!(!controller.is_maximized());

        controller.toggle_open();
        assert!(controller.is_open());
        assert_eq!(controller.session().transcript().len(), 2);
    }

    #[test]
    fn test_send_input_clears_draft_only_when_accepted() {
        let mut controller = controller();
        controller.set_input("   ");
        assert!(!controller.can_send());
        assert!(!controller.send_input());
        assert_eq!(controller.input(), "   ");

        controller.set_input("first");
        assert!(controller.send_input());
        assert_eq!(controller.input(), "");

        controller.set_input("second");
        assert!(!controller.can_send());
        assert!(!controller.send_input());
        assert_eq!(controller.input(), "second");
    }

    #[test]
    fn test_unavailable_speech_is_reported() {
        let mut controller = controller();
        assert!(!controller.speech_available());
        controller.start_listening();
        assert!(!controller.is_listening());
        assert!(controller.session().last_error().is_some());
    }
}
