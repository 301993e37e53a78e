//! Message list component
//!
//! Shows the transcript, a thinking indicator while a request is in flight,
//! and the error banner.

use crate::integration::WidgetController;
use crate::messages::{AudioRef, Message};
use crate::ui::theme::Theme;
use egui::{self, Align, RichText, Vec2};

/// Clicks collected while the transcript is borrowed
enum ListAction {
    Play(AudioRef),
    Stop,
    DismissError,
}

pub struct MessageList<'a> {
    controller: &'a mut WidgetController,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(controller: &'a mut WidgetController, theme: &'a Theme) -> Self {
        Self { controller, theme }
    }

    pub fn show(self, ui: &mut egui::Ui, max_height: f32) {
        let mut action = None;

        egui::ScrollArea::vertical()
            .id_salt("chatline_messages")
            .auto_shrink([false, false])
            .max_height(max_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let session = self.controller.session();
                let messages = session.transcript().messages();

                if messages.is_empty() && !session.phase().is_awaiting() {
                    self.show_empty_state(ui);
                }

                for message in messages {
                    if let Some(clicked) = self.show_message(ui, message) {
                        action = Some(clicked);
                    }
                    ui.add_space(self.theme.spacing_sm);
                }

                if session.phase().is_awaiting() {
                    self.show_thinking(ui);
                }

                if let Some(error) = session.last_error() {
                    let banner = format!("Error: {}", error.user_message());
                    if self.show_error_banner(ui, &banner) {
                        action = Some(ListAction::DismissError);
                    }
                }
            });

        match action {
            Some(ListAction::Play(audio)) => self.controller.play_message_audio(&audio),
            Some(ListAction::Stop) => self.controller.stop_audio(),
            Some(ListAction::DismissError) => self.controller.dismiss_error(),
            None => {}
        }
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.label(
                RichText::new("Hi! Ask me anything.")
                    .size(16.0)
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing_sm);

            let hint = if self.controller.speech_available() {
                "Type a message or use the microphone to talk."
            } else {
                "Type a message to get started."
            };
            ui.label(RichText::new(hint).size(12.0).color(self.theme.text_muted));
        });
    }

    fn show_message(&self, ui: &mut egui::Ui, message: &Message) -> Option<ListAction> {
        let is_user = message.is_user();
        let (bubble, align, sender) = if is_user {
            (self.theme.user_bubble, Align::RIGHT, "User message")
        } else {
            (self.theme.assistant_bubble, Align::LEFT, "Assistant response")
        };
        let text_color = self.theme.bubble_text(is_user);
        let mut action = None;

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            let max_width = ui.available_width() * 0.8;

            egui::Frame::none()
                .fill(bubble)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(10.0, 6.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);

                    let label = format!("{}: {}", sender, message.text());
                    let response = ui.label(RichText::new(message.text()).color(text_color));
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                    });

                    for source in message.sources() {
                        ui.label(
                            RichText::new(format!("Source: {}", source.title))
                                .size(11.0)
                                .color(text_color.gamma_multiply(0.8)),
                        );
                    }

                    if let Some(audio) = message.audio() {
                        if self.controller.session().voice_mode_enabled() {
                            action = self.show_audio_controls(ui, audio);
                        }
                    }
                });

            let time = message
                .timestamp()
                .with_timezone(&chrono::Local)
                .format("%H:%M")
                .to_string();
            ui.label(RichText::new(time).size(10.0).color(self.theme.text_muted));
        });

        action
    }

    fn show_audio_controls(&self, ui: &mut egui::Ui, audio: &AudioRef) -> Option<ListAction> {
        let playing = self.controller.is_playing_audio(audio);
        let (icon, label) = if playing {
            ("⏹ Stop", "Stop audio")
        } else {
            ("▶ Play", "Play audio")
        };

        let response = ui.add(
            egui::Button::new(RichText::new(icon).size(12.0))
                .rounding(self.theme.button_rounding)
                .min_size(Vec2::new(56.0, 22.0)),
        );
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, label));

        if !response.clicked() {
            return None;
        }
        if playing {
            Some(ListAction::Stop)
        } else {
            Some(ListAction::Play(audio.clone()))
        }
    }

    fn show_thinking(&self, ui: &mut egui::Ui) {
        ui.with_layout(egui::Layout::top_down(Align::LEFT), |ui| {
            egui::Frame::none()
                .fill(self.theme.assistant_bubble)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(10.0, 6.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new().size(12.0));
                        let response = ui.label(
                            RichText::new("Thinking...").color(self.theme.text_secondary),
                        );
                        response.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Thinking...")
                        });
                    });
                });
        });
    }

    /// Returns true when the dismiss button was clicked
    fn show_error_banner(&self, ui: &mut egui::Ui, banner: &str) -> bool {
        let mut dismissed = false;
        egui::Frame::none()
            .fill(self.theme.error.gamma_multiply(0.2))
            .stroke(egui::Stroke::new(1.0, self.theme.error))
            .rounding(self.theme.button_rounding)
            .inner_margin(egui::Margin::symmetric(10.0, 6.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let response = ui.label(RichText::new(banner).color(self.theme.error));
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, banner)
                    });

                    ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                        let response = ui.small_button("✕");
                        response.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Dismiss error")
                        });
                        dismissed = response.clicked();
                    });
                });
            });
        dismissed
    }
}
