pub mod history;
pub mod transcript;
pub mod types;

pub use history::{to_history_pair, ExchangeHistoryWindow, ExchangePair, MAX_EXCHANGES};
pub use transcript::ChatTranscript;
pub use types::{AudioRef, Message, Role, Source};
