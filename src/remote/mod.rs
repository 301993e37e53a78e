//! Remote chat endpoint: wire types, backends and the request pipeline

pub mod client;
pub mod pipeline;
pub mod types;

pub use client::{ChatBackend, HttpChatBackend};
pub use pipeline::{ChatCommand, ChatEvent, ChatPipeline};
pub use types::{resolve_audio_url, ChatReply, ChatRequest, ChatResponse};
