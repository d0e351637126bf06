mod app;
mod color;
mod config;
mod data;
mod export;
mod state;
mod stats;
mod ui;

use app::TownStatsApp;
use config::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::error!("{e}; falling back to defaults");
        AppConfig::default()
    });
    log::info!(
        "Input {}, output directory {}",
        config.input_path.display(),
        config.output_dir.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Town Stats – Indicator Statistics",
        options,
        Box::new(move |cc| {
            // Image loaders let the export preview show the written PNGs.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(TownStatsApp::new(&config)))
        }),
    )
}
