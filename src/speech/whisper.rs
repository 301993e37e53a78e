//! Local speech recognition: microphone capture via cpal, transcription via Whisper

use super::resampler::to_whisper_rate;
use super::{SpeechEvent, SpeechRecognizer};
use crate::integration::config::SpeechConfig;
use crate::{ChatlineError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// One-utterance recognizer backed by a Whisper model
pub struct WhisperRecognizer {
    config: SpeechConfig,
    context: Arc<WhisperContext>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl WhisperRecognizer {
    /// Load the model and check that an input device exists.
    ///
    /// Failure means speech input is unavailable on this machine.
    pub fn probe(config: &SpeechConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ChatlineError::ModelLoadError(format!(
                "Model file not found: {:?}",
                config.model_path
            )));
        }

        cpal::default_host()
            .default_input_device()
            .ok_or_else(|| ChatlineError::AudioDeviceError("No input device available".into()))?;

        info!("Loading Whisper model from: {:?}", config.model_path);
        let path = config
            .model_path
            .to_str()
            .ok_or_else(|| ChatlineError::ModelLoadError("Invalid model path".into()))?;
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| {
                ChatlineError::ModelLoadError(format!("Failed to load Whisper model: {e:?}"))
            })?;

        Ok(Self {
            config: config.clone(),
            context: Arc::new(context),
            stop_flag: None,
        })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn start(&mut self, events: Sender<SpeechEvent>) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        self.stop_flag = Some(Arc::clone(&stop));

        let context = Arc::clone(&self.context);
        let config = self.config.clone();

        thread::Builder::new()
            .name("chatline-speech".into())
            .spawn(move || {
                let outcome = capture_utterance(&stop, config.max_capture())
                    .and_then(|(samples, rate)| to_whisper_rate(samples, rate))
                    .and_then(|samples| transcribe(&context, &config, &samples));

                let event = match outcome {
                    Ok(text) => SpeechEvent::Recognized(text),
                    Err(ChatlineError::AudioDeviceError(e)) => {
                        error!("Audio capture failed: {}", e);
                        SpeechEvent::Failed("audio-capture".into())
                    }
                    Err(e) => {
                        error!("Speech recognition failed: {}", e);
                        SpeechEvent::Failed("recognition-failed".into())
                    }
                };

                if events.send(event).is_err() {
                    debug!("Speech capture was abandoned");
                }
            })
            .map_err(|e| ChatlineError::SpeechError(format!("Failed to spawn capture: {e}")))?;

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(flag) = self.stop_flag.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

impl Drop for WhisperRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Record mono audio from the default input until stopped or `max` elapses
fn capture_utterance(stop: &AtomicBool, max: Duration) -> Result<(Vec<f32>, u32)> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| ChatlineError::AudioDeviceError("No input device available".into()))?;

    let config: StreamConfig = device
        .default_input_config()
        .map_err(|e| ChatlineError::AudioDeviceError(format!("Failed to get input config: {e}")))?
        .into();
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;

    let buffer = Arc::new(Mutex::new(Vec::with_capacity(
        sample_rate as usize * max.as_secs() as usize,
    )));
    let writer = Arc::clone(&buffer);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut buf = writer.lock();
                if channels == 1 {
                    buf.extend_from_slice(data);
                } else {
                    buf.extend(
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                }
            },
            |err| error!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| ChatlineError::AudioDeviceError(format!("Failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| ChatlineError::AudioDeviceError(format!("Failed to start input stream: {e}")))?;

    let started = Instant::now();
    while !stop.load(Ordering::SeqCst) && started.elapsed() < max {
        thread::sleep(Duration::from_millis(20));
    }
    drop(stream);

    let samples = std::mem::take(&mut *buffer.lock());
    debug!(
        "Captured {} samples ({:.2}s) at {} Hz",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );
    Ok((samples, sample_rate))
}

fn transcribe(context: &WhisperContext, config: &SpeechConfig, samples: &[f32]) -> Result<String> {
    if samples.is_empty() {
        return Ok(String::new());
    }

    let language = config.whisper_language();
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(config.n_threads);
    params.set_translate(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_single_segment(true);
    params.set_language(Some(&language));

    let mut state = context
        .create_state()
        .map_err(|e| ChatlineError::SpeechError(format!("Failed to create state: {e:?}")))?;

    state
        .full(params, samples)
        .map_err(|e| ChatlineError::SpeechError(format!("Transcription failed: {e:?}")))?;

    let segments = state
        .full_n_segments()
        .map_err(|e| ChatlineError::SpeechError(format!("Failed to get segments: {e:?}")))?;

    let mut text = String::new();
    for i in 0..segments {
        let segment = state
            .full_get_segment_text(i)
            .map_err(|e| ChatlineError::SpeechError(format!("Failed to get segment text: {e:?}")))?;
        text.push_str(&segment);
    }

    debug!("Transcription result: '{}'", text.trim());
    Ok(text.trim().to_string())
}
