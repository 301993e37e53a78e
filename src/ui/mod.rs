//! UI components and application module
//!
//! The egui/eframe shell around [`WidgetController`](crate::integration::WidgetController):
//! a launcher button when closed, a bottom-right chat window when open.

mod app;
pub mod components;
mod theme;

pub use app::{show_widget, ChatlineApp};
pub use components::{Header, InputBar, MessageList};
pub use theme::Theme;
