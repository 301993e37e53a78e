//! Main application struct and eframe integration

use crate::integration::WidgetController;
use crate::ui::components::{Header, InputBar, MessageList};
use crate::ui::theme::Theme;
use egui::{self, Align2, RichText, Vec2};
use std::time::Duration;
use tracing::info;

/// Room reserved below the message list for the input bar
const FOOTER_HEIGHT: f32 = 80.0;

pub struct ChatlineApp {
    controller: WidgetController,
    theme: Theme,
}

impl ChatlineApp {
    pub fn new(cc: &eframe::CreationContext<'_>, controller: WidgetController) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);

        Self { controller, theme }
    }
}

impl eframe::App for ChatlineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.poll_events();

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_secondary))
            .show(ctx, |_ui| {});

        show_widget(ctx, &mut self.controller, &self.theme);

        // Adapter results arrive on channels, keep polling while anything is pending
        let session = self.controller.session();
        if session.phase().is_awaiting() || session.is_listening() || session.is_playing() {
            ctx.request_repaint_after(Duration::from_millis(50));
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Chatline shutting down");
    }
}

/// Draw the launcher or the open widget window
pub fn show_widget(ctx: &egui::Context, controller: &mut WidgetController, theme: &Theme) {
    let margin = Vec2::splat(-theme.corner_margin);

    if !controller.is_open() {
        egui::Area::new(egui::Id::new("chatline_launcher"))
            .anchor(Align2::RIGHT_BOTTOM, margin)
            .show(ctx, |ui| {
                let button = egui::Button::new(
                    RichText::new("💬").size(24.0).color(egui::Color32::WHITE),
                )
                .min_size(Vec2::splat(56.0))
                .rounding(egui::Rounding::same(28.0))
                .fill(theme.primary);

                let response = ui.add(button).on_hover_text("Open chat");
                response.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Open chat")
                });
                if response.clicked() {
                    controller.open();
                }
            });
        return;
    }

    let size = if controller.is_maximized() {
        ctx.screen_rect().size() * theme.maximized_fraction
    } else {
        theme.widget_size
    };

    egui::Window::new("chatline_widget")
        .title_bar(false)
        .resizable(false)
        .collapsible(false)
        .anchor(Align2::RIGHT_BOTTOM, margin)
        .fixed_size(size)
        .frame(
            egui::Frame::window(&ctx.style())
                .fill(theme.bg_primary)
                .rounding(theme.card_rounding)
                .inner_margin(theme.spacing),
        )
        .show(ctx, |ui| {
            Header::new(controller, theme).show(ui);
            ui.separator();

            let list_height = (ui.available_height() - FOOTER_HEIGHT).max(60.0);
            MessageList::new(controller, theme).show(ui, list_height);

            ui.separator();
            InputBar::new(controller, theme).show(ui);
        });
}
