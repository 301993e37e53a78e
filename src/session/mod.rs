//! Conversation session: the per-turn state machine

pub mod state;

pub use state::{
    Phase, SessionEffect, SessionError, SessionEvent, SessionState, CONNECTION_FAILURE_ANSWER,
    FALLBACK_ANSWER,
};
