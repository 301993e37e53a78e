//! Integration layer
//!
//! Configuration plus the [`WidgetController`] that connects the session
//! state machine to the remote pipeline, speech input and audio playback.

pub mod config;
pub mod controller;

pub use config::{ChatlineConfig, SpeechConfig};
pub use controller::WidgetController;
