use crate::messages::AudioRef;
use crate::{ChatlineError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

/// Identity of one playback, used to drop reports from superseded clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(u64);

impl PlaybackId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Report from an [`AudioSink`] about a clip it was asked to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The clip reached its natural end
    Finished(PlaybackId),
    /// The clip could not be loaded or played
    Failed { id: PlaybackId, reason: String },
}

impl PlaybackEvent {
    pub fn id(&self) -> PlaybackId {
        match self {
            PlaybackEvent::Finished(id) => *id,
            PlaybackEvent::Failed { id, .. } => *id,
        }
    }
}

/// Something that can play a remote audio clip
pub trait AudioSink: Send {
    /// Start playing `audio`. Completion or asynchronous failure is reported on `events`.
    ///
    /// An `Err` means playback never started.
    fn play(&mut self, id: PlaybackId, audio: &AudioRef, events: Sender<PlaybackEvent>)
        -> Result<()>;

    /// Halt the current clip and discard its position
    fn stop(&mut self);
}

/// Sink for builds or machines without audio output
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, _id: PlaybackId, _audio: &AudioRef, _events: Sender<PlaybackEvent>) -> Result<()> {
        Err(ChatlineError::PlaybackError("audio output unavailable".into()))
    }

    fn stop(&mut self) {}
}

/// Owns the sink and guarantees at most one clip is audible.
///
/// Starting a clip always stops the previous one first.
pub struct AudioPlaybackController {
    sink: Box<dyn AudioSink>,
    current: Option<(PlaybackId, AudioRef)>,
    next_id: u64,
    event_tx: Sender<PlaybackEvent>,
    event_rx: Receiver<PlaybackEvent>,
}

impl AudioPlaybackController {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            sink,
            current: None,
            next_id: 1,
            event_tx,
            event_rx,
        }
    }

    pub fn play(&mut self, audio: &AudioRef) -> Result<PlaybackId> {
        if let Some((previous, _)) = self.current.take() {
            debug!("Stopping clip {} before starting another", previous.value());
            self.sink.stop();
        }

        let id = PlaybackId(self.next_id);
        self.next_id += 1;

        self.sink.play(id, audio, self.event_tx.clone())?;
        info!("Playing {} (clip {})", audio, id.value());
        self.current = Some((id, audio.clone()));
        Ok(id)
    }

    /// Stop the current clip. Returns `false` if nothing was playing.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some((id, _)) => {
                self.sink.stop();
                info!("Stopped clip {}", id.value());
                true
            }
            None => false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&AudioRef> {
        self.current.as_ref().map(|(_, audio)| audio)
    }

    pub fn current_id(&self) -> Option<PlaybackId> {
        self.current.as_ref().map(|(id, _)| *id)
    }

    /// Next report about the current clip, if any.
    ///
    /// Reports about stopped or superseded clips are discarded.
    pub fn poll(&mut self) -> Option<PlaybackEvent> {
        while let Ok(event) = self.event_rx.try_recv() {
            if Some(event.id()) != self.current_id() {
                debug!("Discarding report for stale clip {}", event.id().value());
                continue;
            }

            if let PlaybackEvent::Failed { reason, .. } = &event {
                warn!("Playback failed: {}", reason);
            }
            self.current = None;
            return Some(event);
        }
        None
    }
}

impl Drop for AudioPlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}
