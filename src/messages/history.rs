//! Rolling exchange history sent to the remote model
//!
//! Only successful turns enter the window, and it is bounded independently
//! of the on-screen transcript so request payloads stay small.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of exchanges carried as model context
pub const MAX_EXCHANGES: usize = 5;

/// One completed question/answer pair, serialized as `{user, assistant}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePair {
    pub user: String,
    pub assistant: String,
}

impl ExchangePair {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Build the value used to update the sliding window
pub fn to_history_pair(user_text: &str, assistant_text: &str) -> ExchangePair {
    ExchangePair::new(user_text, assistant_text)
}

/// FIFO window holding at most [`MAX_EXCHANGES`] pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeHistoryWindow {
    pairs: VecDeque<ExchangePair>,
}

impl ExchangeHistoryWindow {
    pub fn new() -> Self {
        Self {
            pairs: VecDeque::with_capacity(MAX_EXCHANGES + 1),
        }
    }

    /// Add a pair, evicting from the front until the bound holds again
    pub fn push(&mut self, pair: ExchangePair) {
        self.pairs.push_back(pair);
        while self.pairs.len() > MAX_EXCHANGES {
            self.pairs.pop_front();
        }
    }

    /// Copy of the window in oldest-first order, as sent on the wire
    pub fn snapshot(&self) -> Vec<ExchangePair> {
        self.pairs.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExchangePair> {
        self.pairs.iter()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
