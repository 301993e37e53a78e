use super::playback::{AudioSink, PlaybackEvent, PlaybackId};
use crate::messages::AudioRef;
use crate::{ChatlineError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

enum SinkCommand {
    Play {
        id: PlaybackId,
        url: String,
        events: Sender<PlaybackEvent>,
    },
    Stop,
    Shutdown,
}

struct ActiveClip {
    id: PlaybackId,
    sink: Sink,
    events: Sender<PlaybackEvent>,
}

/// Plays remote clips on the default output device.
///
/// rodio's output stream is not `Send`, so it lives on a dedicated thread
/// that also fetches the clip bytes. A fetch slower than `fetch_timeout`
/// fails the clip so stop and shutdown commands are not held up.
pub struct RodioSink {
    command_tx: Sender<SinkCommand>,
    worker: Option<JoinHandle<()>>,
}

impl RodioSink {
    pub fn new(fetch_timeout: Duration) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let worker = thread::Builder::new()
            .name("chatline-playback".into())
            .spawn(move || run_worker(command_rx, ready_tx, fetch_timeout))
            .map_err(|e| ChatlineError::AudioDeviceError(format!("Failed to spawn playback: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| ChatlineError::AudioDeviceError("Playback thread exited".into()))??;

        info!("Audio output ready");
        Ok(Self {
            command_tx,
            worker: Some(worker),
        })
    }
}

impl AudioSink for RodioSink {
    fn play(&mut self, id: PlaybackId, audio: &AudioRef, events: Sender<PlaybackEvent>) -> Result<()> {
        self.command_tx
            .send(SinkCommand::Play {
                id,
                url: audio.url().to_string(),
                events,
            })
            .map_err(|_| ChatlineError::ChannelError("Playback thread is gone".into()))
    }

    fn stop(&mut self) {
        let _ = self.command_tx.send(SinkCommand::Stop);
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SinkCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(commands: Receiver<SinkCommand>, ready: Sender<Result<()>>, fetch_timeout: Duration) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(ChatlineError::AudioDeviceError(format!(
                "No output device available: {e}"
            ))));
            return;
        }
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(ChatlineError::IOError(format!(
                "Failed to create runtime: {e}"
            ))));
            return;
        }
    };
    let client = match clip_client(fetch_timeout) {
        Ok(client) => client,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut active: Option<ActiveClip> = None;

    loop {
        match commands.recv_timeout(Duration::from_millis(50)) {
            Ok(SinkCommand::Play { id, url, events }) => {
                if let Some(previous) = active.take() {
                    previous.sink.stop();
                }
                let started = runtime
                    .block_on(fetch_clip(&client, &url))
                    .and_then(|bytes| start_clip(&handle, bytes));
                match started {
                    Ok(sink) => active = Some(ActiveClip { id, sink, events }),
                    Err(e) => {
                        error!("Could not play {}: {}", url, e);
                        let _ = events.send(PlaybackEvent::Failed {
                            id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Ok(SinkCommand::Stop) => {
                if let Some(clip) = active.take() {
                    clip.sink.stop();
                }
            }
            Ok(SinkCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(clip) = active.take() {
            if clip.sink.empty() {
                debug!("Clip {} finished", clip.id.value());
                let _ = clip.events.send(PlaybackEvent::Finished(clip.id));
            } else {
                active = Some(clip);
            }
        }
    }

    if let Some(clip) = active.take() {
        clip.sink.stop();
    }
    debug!("Playback thread exiting");
}

fn clip_client(fetch_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(fetch_timeout)
        .build()
        .map_err(|e| ChatlineError::PlaybackError(format!("Failed to build audio client: {e}")))
}

async fn fetch_clip(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ChatlineError::PlaybackError(format!(
            "audio fetch failed with status {}",
            response.status().as_u16()
        )));
    }
    let bytes = response.bytes().await?;
    debug!("Fetched {} bytes of audio", bytes.len());
    Ok(bytes.to_vec())
}

fn start_clip(handle: &OutputStreamHandle, bytes: Vec<u8>) -> Result<Sink> {
    let source = Decoder::new(Cursor::new(bytes))
        .map_err(|e| ChatlineError::PlaybackError(format!("Unsupported audio: {e}")))?;
    let sink = Sink::try_new(handle)
        .map_err(|e| ChatlineError::AudioDeviceError(format!("Failed to open sink: {e}")))?;
    sink.append(source);
    if sink.empty() {
        warn!("Decoded clip is empty");
    }
    Ok(sink)
}
