mod app;
mod color;
mod config;
mod dashboard;
mod data;
mod state;
mod ui;

use std::path::Path;

use anyhow::Context;
use app::SkyFareApp;
use config::{DashboardConfig, CONFIG_FILE};
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::load(Path::new(CONFIG_FILE))?;
    if config.city_coordinates.is_empty() {
        log::warn!("No city coordinates configured, the route map will stay empty");
    } else {
        log::debug!("{} city coordinates configured", config.city_coordinates.len());
    }
    log::info!("Loading tickets from {}", config.data_path.display());
    let state = AppState::from_load(
        data::loader::load_file(&config.data_path),
        config.aggregate_settings(),
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SkyFare – Airline Ticket Price Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(SkyFareApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the dashboard window")
}
