//! Spoken-reply playback
//!
//! [`AudioPlaybackController`] keeps at most one clip audible and tags each
//! clip with a [`PlaybackId`] so late reports from stopped clips are ignored.
//! The real output device (feature `audio-io`) is [`RodioSink`].

#[cfg(feature = "audio-io")]
pub mod output;
pub mod playback;

#[cfg(feature = "audio-io")]
pub use output::RodioSink;
pub use playback::{AudioPlaybackController, AudioSink, NullSink, PlaybackEvent, PlaybackId};
