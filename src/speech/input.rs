use super::{SpeechEvent, SpeechRecognizer};
use crate::{ChatlineError, Result};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use tracing::{debug, info, warn};

/// Capture lifecycle
enum CaptureState {
    Idle,
    /// Microphone open
    Capturing(Receiver<SpeechEvent>),
    /// Stopped early, waiting for the transcript of what was captured
    Finishing(Receiver<SpeechEvent>),
}

/// Exclusive wrapper around an optional [`SpeechRecognizer`].
///
/// Each `start` gets a fresh channel, so outcomes from an abandoned capture
/// can never be mistaken for the current one.
pub struct SpeechInputAdapter {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    capture: CaptureState,
}

impl SpeechInputAdapter {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            capture: CaptureState::Idle,
        }
    }

    /// Adapter for platforms without speech recognition
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    /// Whether voice input affordances should be enabled
    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.capture, CaptureState::Capturing(_))
    }

    /// Begin a capture.
    ///
    /// Returns `Ok(false)` when a capture is already running.
    pub fn start(&mut self) -> Result<bool> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return Err(ChatlineError::SpeechUnavailable(
                "no speech recognizer on this platform".into(),
            ));
        };

        if matches!(self.capture, CaptureState::Capturing(_)) {
            debug!("Speech capture already active");
            return Ok(false);
        }
        if matches!(self.capture, CaptureState::Finishing(_)) {
            debug!("Abandoning pending transcript of the previous capture");
        }

        let (tx, rx) = bounded(1);
        recognizer.start(tx)?;
        self.capture = CaptureState::Capturing(rx);
        info!("Speech capture started");
        Ok(true)
    }

    /// End the running capture early. Returns `false` if nothing was capturing.
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.capture, CaptureState::Idle) {
            CaptureState::Capturing(rx) => {
                if let Some(recognizer) = self.recognizer.as_mut() {
                    recognizer.stop();
                }
                self.capture = CaptureState::Finishing(rx);
                info!("Speech capture stopped");
                true
            }
            other => {
                self.capture = other;
                false
            }
        }
    }

    /// Take the outcome of the current capture, if it has arrived.
    ///
    /// Yields at most one event per capture, then returns to idle.
    pub fn poll(&mut self) -> Option<SpeechEvent> {
        let rx = match &self.capture {
            CaptureState::Capturing(rx) | CaptureState::Finishing(rx) => rx,
            CaptureState::Idle => return None,
        };

        let event = match rx.try_recv() {
            Ok(SpeechEvent::Recognized(text)) if text.trim().is_empty() => {
                SpeechEvent::Failed("no-speech".into())
            }
            Ok(SpeechEvent::Recognized(text)) => SpeechEvent::Recognized(text.trim().to_string()),
            Ok(failed) => failed,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                warn!("Speech recognizer ended without a result");
                SpeechEvent::Failed("aborted".into())
            }
        };

        self.capture = CaptureState::Idle;
        Some(event)
    }
}

impl Drop for SpeechInputAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recognizer whose outcome is pushed by the test
    #[derive(Clone, Default)]
    struct ManualRecognizer {
        sender: Arc<Mutex<Option<Sender<SpeechEvent>>>>,
        starts: Arc<Mutex<usize>>,
        stops: Arc<Mutex<usize>>,
    }

    impl ManualRecognizer {
        fn emit(&self, event: SpeechEvent) {
            if let Some(tx) = self.sender.lock().as_ref() {
                tx.send(event).unwrap();
            }
        }

        fn hang_up(&self) {
            self.sender.lock().take();
        }
    }

    impl SpeechRecognizer for ManualRecognizer {
        fn start(&mut self, events: Sender<SpeechEvent>) -> Result<()> {
            *self.sender.lock() = Some(events);
            *self.starts.lock() += 1;
            Ok(())
        }

        fn stop(&mut self) {
            *self.stops.lock() += 1;
        }
    }

    fn adapter() -> (SpeechInputAdapter, ManualRecognizer) {
        let recognizer = ManualRecognizer::default();
        (
            SpeechInputAdapter::new(Some(Box::new(recognizer.clone()))),
            recognizer,
        )
    }

    #[test]
    fn test_unavailable_start_is_an_error() {
        let mut adapter = SpeechInputAdapter::unavailable();
        assert!(!adapter.is_available());
        assert!(matches!(
            adapter.start(),
            Err(ChatlineError::SpeechUnavailable(_))
        ));
    }

    #[test]
    fn test_second_start_is_noop() {
        let (mut adapter, recognizer) = adapter();
        assert!(adapter.start().unwrap());
        assert!(!adapter.start().unwrap());
        assert_eq!(*recognizer.starts.lock(), 1);
    }

    #[test]
    fn test_single_result_then_idle() {
        let (mut adapter, recognizer) = adapter();
        adapter.start().unwrap();
        assert_eq!(adapter.poll(), None);

        recognizer.emit(SpeechEvent::Recognized(" what projects? ".into()));
        assert_eq!(
            adapter.poll(),
            Some(SpeechEvent::Recognized("what projects?".into()))
        );
        assert!(!adapter.is_capturing());
        assert_eq!(adapter.poll(), None);
    }

    #[test]
    fn test_stop_still_delivers_transcript() {
        let (mut adapter, recognizer) = adapter();
        adapter.start().unwrap();
        assert!(adapter.stop());
        assert!(!adapter.is_capturing());
        assert_eq!(*recognizer.stops.lock(), 1);

        recognizer.emit(SpeechEvent::Recognized("hello".into()));
        assert_eq!(adapter.poll(), Some(SpeechEvent::Recognized("hello".into())));
    }

    #[test]
    fn test_blank_transcript_is_no_speech() {
        let (mut adapter, recognizer) = adapter();
        adapter.start().unwrap();
        recognizer.emit(SpeechEvent::Recognized("   ".into()));
        assert_eq!(adapter.poll(), Some(SpeechEvent::Failed("no-speech".into())));
    }

    #[test]
    fn test_dropped_recognizer_reports_abort() {
        let (mut adapter, recognizer) = adapter();
        adapter.start().unwrap();
        recognizer.hang_up();
        assert_eq!(adapter.poll(), Some(SpeechEvent::Failed("aborted".into())));
    }
}
