//! Chatline - desktop chat widget for a remote conversational assistant

use anyhow::{Context, Result};
use chatline::integration::{ChatlineConfig, WidgetController};
use chatline::ui::ChatlineApp;
use eframe::egui;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatline=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Chatline");

    // Optional config file path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ChatlineConfig::load(config_path.as_deref()).context("loading configuration")?;
    info!("Chat endpoint: {}", config.endpoint_url);

    let controller = WidgetController::from_config(config).context("starting chat widget")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([420.0, 560.0])
            .with_title("Chatline"),
        ..Default::default()
    };

    eframe::run_native(
        "Chatline",
        options,
        Box::new(|cc| Ok(Box::new(ChatlineApp::new(cc, controller)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {e}"))
}
