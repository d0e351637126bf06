use eframe::egui;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::ui::{panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TownStatsApp {
    pub state: AppState,
}

impl TownStatsApp {
    /// Build the app and open the configured dataset if it exists.
    pub fn new(config: &AppConfig) -> Self {
        let mut state = AppState::new(config.output_dir.clone());
        if config.input_path.exists() {
            state.open(&config.input_path);
        } else {
            log::warn!("{} not found, waiting for File → Open", config.input_path.display());
            state.status_message = Some(format!(
                "{} not found; use File → Open…",
                config.input_path.display()
            ));
        }
        Self { state }
    }
}

impl eframe::App for TownStatsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: selection ----
        egui::SidePanel::left("selection_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: rows and statistics ----
        egui::CentralPanel::default().show(ctx, |ui| {
            table::results_panel(ui, &self.state);
        });
    }
}
