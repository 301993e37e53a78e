//! Input bar component
//!
//! Provides the microphone toggle, text input and send button.

use crate::integration::WidgetController;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

pub struct InputBar<'a> {
    controller: &'a mut WidgetController,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(controller: &'a mut WidgetController, theme: &'a Theme) -> Self {
        Self { controller, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        if self.controller.is_listening() {
            let response = ui.label(
                RichText::new("Listening...")
                    .size(12.0)
                    .color(self.theme.listening),
            );
            response.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Listening...")
            });
        }

        ui.horizontal(|ui| {
            self.show_mic_button(ui);
            self.show_text_input(ui);
            self.show_send_button(ui);
        });
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) {
        let available = self.controller.speech_available();
        let listening = self.controller.is_listening();

        let (icon, label, color) = if listening {
            ("⏹", "Stop voice input", self.theme.listening)
        } else {
            ("🎤", "Start voice input", self.theme.text_secondary)
        };

        let mut button = egui::Button::new(RichText::new(icon).size(16.0).color(color))
            .min_size(Vec2::splat(34.0))
            .rounding(self.theme.button_rounding);
        if listening {
            button = button.fill(self.theme.listening.gamma_multiply(0.2));
        }

        let response = ui.add_enabled(available, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, available, label));

        let response = if available {
            response.on_hover_text(label)
        } else {
            response.on_disabled_hover_text("Voice input is not available")
        };

        if response.clicked() {
            self.controller.toggle_listening();
        }

        if listening {
            ui.ctx().request_repaint();
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        let enabled = self.controller.session().phase().accepts_input();
        let width = (ui.available_width() - 50.0).max(80.0);

        let text_edit = egui::TextEdit::singleline(self.controller.input_mut())
            .hint_text("Type your message...")
            .desired_width(width)
            .id(egui::Id::new("chatline_message_input"));

        let response = ui.add_enabled(enabled, text_edit);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, enabled, "Message input")
        });

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            self.controller.send_input();
            response.request_focus();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let can_send = self.controller.can_send();

        let button = egui::Button::new(RichText::new("➤").size(16.0).color(egui::Color32::WHITE))
            .min_size(Vec2::splat(34.0))
            .rounding(self.theme.button_rounding)
            .fill(if can_send {
                self.theme.primary
            } else {
                self.theme.text_muted
            });

        let response = ui.add_enabled(can_send, button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, can_send, "Send message")
        });

        if response.on_hover_text("Send message (Enter)").clicked() {
            self.controller.send_input();
        }
    }
}
