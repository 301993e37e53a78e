//! Chat pipeline for issuing remote requests off the UI thread
//!
//! Follows the command/event channel pattern: the UI sends [`ChatCommand`]s,
//! a worker thread runs each request on its own tokio runtime and reports
//! back with [`ChatEvent`]s tagged by request id. Every request resolves to
//! exactly one event, either an answer or a failure.

use crate::remote::client::ChatBackend;
use crate::remote::types::{ChatReply, ChatRequest};
use crate::{ChatlineError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Commands that can be sent to the chat pipeline
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Send a question to the remote model
    Ask {
        /// Id stamped by the session; echoed on the resulting event
        request_id: Uuid,
        request: ChatRequest,
    },

    /// Shutdown the pipeline
    Shutdown,
}

/// Events emitted by the chat pipeline
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// The endpoint answered
    Answered {
        request_id: Uuid,
        reply: ChatReply,
        /// Round trip time in milliseconds
        elapsed_ms: u64,
    },

    /// Network error, non-success status, undecodable body or timeout
    Failed {
        request_id: Uuid,
        error: ChatlineError,
    },

    /// Pipeline has shut down
    Shutdown,
}

/// Chat pipeline with channel-based communication
pub struct ChatPipeline {
    backend: Arc<dyn ChatBackend>,

    /// Base URL relative `audio_url`s are joined onto
    audio_base_url: String,

    /// Upper bound for a single request
    request_timeout: Duration,

    command_tx: Sender<ChatCommand>,
    command_rx: Receiver<ChatCommand>,
    event_tx: Sender<ChatEvent>,
    event_rx: Receiver<ChatEvent>,
}

impl ChatPipeline {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        audio_base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        let (command_tx, command_rx) = bounded(100);
        let (event_tx, event_rx) = bounded(100);

        Self {
            backend,
            audio_base_url: audio_base_url.into(),
            request_timeout,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Get a sender for commands
    pub fn command_sender(&self) -> Sender<ChatCommand> {
        self.command_tx.clone()
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<ChatEvent> {
        self.event_rx.clone()
    }

    /// Start the pipeline worker thread
    ///
    /// Requests run concurrently on the worker's runtime, so a slow request
    /// whose result will be discarded never delays a newer one.
    pub fn start_worker(self) -> Result<JoinHandle<()>> {
        let Self {
            backend,
            audio_base_url,
            request_timeout,
            command_rx,
            event_tx,
            ..
        } = self;

        std::thread::Builder::new()
            .name("chatline-chat".into())
            .spawn(move || {
                info!("Chat pipeline worker starting");

                let runtime = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        fail_all(&command_rx, &event_tx, &format!("Runtime creation failed: {e}"));
                        return;
                    }
                };

                info!("Chat pipeline worker ready");

                loop {
                    match command_rx.recv() {
                        Ok(ChatCommand::Ask {
                            request_id,
                            request,
                        }) => {
                            debug!("Processing chat request: {}", request_id);
                            let backend = Arc::clone(&backend);
                            let event_tx = event_tx.clone();
                            let audio_base_url = audio_base_url.clone();

                            runtime.spawn(async move {
                                let start_time = Instant::now();
                                let outcome =
                                    tokio::time::timeout(request_timeout, backend.ask(&request))
                                        .await;
                                let elapsed_ms = start_time.elapsed().as_millis() as u64;

                                let event = match outcome {
                                    Ok(Ok(response)) => {
                                        debug!("Request {} answered in {}ms", request_id, elapsed_ms);
                                        ChatEvent::Answered {
                                            request_id,
                                            reply: response.into_reply(&audio_base_url),
                                            elapsed_ms,
                                        }
                                    }
                                    Ok(Err(error)) => {
                                        warn!("Request {} failed: {}", request_id, error);
                                        ChatEvent::Failed { request_id, error }
                                    }
                                    Err(_) => {
                                        warn!(
                                            "Request {} timed out after {:?}",
                                            request_id, request_timeout
                                        );
                                        ChatEvent::Failed {
                                            request_id,
                                            error: ChatlineError::RequestTimeout(format!(
                                                "no response after {}s",
                                                request_timeout.as_secs()
                                            )),
                                        }
                                    }
                                };

                                if event_tx.send(event).is_err() {
                                    debug!("Chat event receiver dropped");
                                }
                            });
                        }
                        Ok(ChatCommand::Shutdown) => {
                            info!("Chat pipeline shutdown requested");
                            let _ = event_tx.send(ChatEvent::Shutdown);
                            break;
                        }
                        Err(_) => {
                            debug!("Chat command channel disconnected");
                            break;
                        }
                    }
                }

                runtime.shutdown_background();
                info!("Chat pipeline worker stopped");
            })
            .map_err(|e| ChatlineError::ChannelError(format!("Failed to spawn chat worker: {e}")))
    }
}

/// Answer every remaining request with a failure so no turn is left awaiting forever
fn fail_all(command_rx: &Receiver<ChatCommand>, event_tx: &Sender<ChatEvent>, reason: &str) {
    for command in command_rx.iter() {
        match command {
            ChatCommand::Ask { request_id, .. } => {
                let _ = event_tx.send(ChatEvent::Failed {
                    request_id,
                    error: ChatlineError::ChannelError(reason.to_string()),
                });
            }
            ChatCommand::Shutdown => {
                let _ = event_tx.send(ChatEvent::Shutdown);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::types::ChatResponse;
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                answer: format!("echo: {}", request.question),
                sources: Vec::new(),
                audio_url: Some("/audio/echo.mp3".into()),
            })
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl ChatBackend for SlowBackend {
        async fn ask(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ChatResponse::default())
        }
    }

    #[test]
    fn test_answer_carries_request_id_and_resolved_audio() {
        let pipeline = ChatPipeline::new(
            Arc::new(EchoBackend),
            "http://localhost:8000",
            Duration::from_secs(5),
        );
        let tx = pipeline.command_sender();
        let rx = pipeline.event_receiver();
        pipeline.start_worker().unwrap();

        let request_id = Uuid::new_v4();
        tx.send(ChatCommand::Ask {
            request_id,
            request: ChatRequest::new("hello", false, Vec::new()),
        })
        .unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ChatEvent::Answered {
                request_id: id,
                reply,
                ..
            } => {
                assert_eq!(id, request_id);
                assert_eq!(reply.answer, "echo: hello");
                assert_eq!(
                    reply.audio.map(|a| a.url().to_string()),
                    Some("http://localhost:8000/audio/echo.mp3".to_string())
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }

        tx.send(ChatCommand::Shutdown).unwrap();
    }

    #[test]
    fn test_timeout_becomes_failure() {
        let pipeline = ChatPipeline::new(
            Arc::new(SlowBackend),
            "http://localhost:8000",
            Duration::from_millis(50),
        );
        let tx = pipeline.command_sender();
        let rx = pipeline.event_receiver();
        pipeline.start_worker().unwrap();

        let request_id = Uuid::new_v4();
        tx.send(ChatCommand::Ask {
            request_id,
            request: ChatRequest::new("slow", false, Vec::new()),
        })
        .unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ChatEvent::Failed { request_id: id, error } => {
                assert_eq!(id, request_id);
                assert!(matches!(error, ChatlineError::RequestTimeout(_)));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        tx.send(ChatCommand::Shutdown).unwrap();
    }

    #[test]
    fn test_shutdown_event() {
        let pipeline = ChatPipeline::new(
            Arc::new(EchoBackend),
            "http://localhost:8000",
            Duration::from_secs(1),
        );
        let tx = pipeline.command_sender();
        let rx = pipeline.event_receiver();
        let handle = pipeline.start_worker().unwrap();

        tx.send(ChatCommand::Shutdown).unwrap();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ChatEvent::Shutdown
        ));
        handle.join().unwrap();
    }
}
