//! Widget header: title, voice mode badge and window controls

use crate::integration::WidgetController;
use crate::ui::theme::Theme;
use egui::{self, Align, RichText, Vec2};

pub struct Header<'a> {
    controller: &'a mut WidgetController,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(controller: &'a mut WidgetController, theme: &'a Theme) -> Self {
        Self { controller, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let voice_mode = self.controller.session().voice_mode_enabled();
        let maximized = self.controller.is_maximized();

        ui.horizontal(|ui| {
            ui.label(
                RichText::new("AI Assistant")
                    .size(16.0)
                    .strong()
                    .color(self.theme.text_primary),
            );

            if voice_mode {
                egui::Frame::none()
                    .fill(self.theme.success.gamma_multiply(0.25))
                    .rounding(self.theme.button_rounding)
                    .inner_margin(egui::Margin::symmetric(6.0, 2.0))
                    .show(ui, |ui| {
                        ui.label(RichText::new("Voice Mode").size(11.0).color(self.theme.success));
                    });
            }

            ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                if icon_button(ui, self.theme, "✕", "Close chat").clicked() {
                    self.controller.close();
                }

                let (icon, label) = if maximized {
                    ("🗗", "Restore chat size")
                } else {
                    ("🗖", "Maximize chat")
                };
                if icon_button(ui, self.theme, icon, label).clicked() {
                    self.controller.toggle_maximized();
                }

                if icon_button(ui, self.theme, "🗑", "Clear conversation").clicked() {
                    self.controller.clear();
                }

                let (icon, label) = if voice_mode {
                    ("🔊", "Disable voice mode")
                } else {
                    ("🔇", "Enable voice mode")
                };
                if icon_button(ui, self.theme, icon, label).clicked() {
                    self.controller.toggle_voice_mode();
                }
            });
        });
    }
}

fn icon_button(ui: &mut egui::Ui, theme: &Theme, icon: &str, label: &str) -> egui::Response {
    let response = ui
        .add(
            egui::Button::new(RichText::new(icon).size(14.0))
                .rounding(theme.button_rounding)
                .min_size(Vec2::splat(26.0)),
        )
        .on_hover_text(label);
    response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, label));
    response
}
