//! Speech input
//!
//! This module provides:
//! - The [`SpeechRecognizer`] seam over a platform speech-to-text capability
//! - [`SpeechInputAdapter`], which enforces one capture at a time and one outcome per capture
//! - A local Whisper recognizer (feature `audio-io`)

pub mod input;
#[cfg(feature = "audio-io")]
pub mod resampler;
#[cfg(feature = "audio-io")]
pub mod whisper;

pub use input::SpeechInputAdapter;
#[cfg(feature = "audio-io")]
pub use whisper::WhisperRecognizer;

use crate::Result;
use crossbeam_channel::Sender;

/// Outcome of one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Final transcript of the utterance
    Recognized(String),
    /// Error code, e.g. `no-speech` or `audio-capture`
    Failed(String),
}

/// A speech-to-text capability capturing one utterance per `start`
pub trait SpeechRecognizer: Send {
    /// Begin capturing. The recognizer reports the outcome on `events`.
    fn start(&mut self, events: Sender<SpeechEvent>) -> Result<()>;

    /// End capture early. Audio captured so far is still transcribed.
    fn stop(&mut self);
}
