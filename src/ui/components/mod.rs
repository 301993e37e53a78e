//! Reusable widget parts

pub mod header;
pub mod input_bar;
pub mod message_list;

pub use header::Header;
pub use input_bar::InputBar;
pub use message_list::MessageList;
