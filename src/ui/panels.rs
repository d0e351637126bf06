use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::SELECT_ALL;
use crate::data::model::Level;
use crate::state::AppState;
use crate::ui::table;

// ---------------------------------------------------------------------------
// Left side panel – selection widgets and actions
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Selection");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // ---- Level selector ----
    ui.strong("Select level");
    let current = state.selection.level;
    egui::ComboBox::from_id_salt("level")
        .selected_text(current.column())
        .show_ui(ui, |ui: &mut Ui| {
            for level in Level::ALL {
                if ui
                    .selectable_label(current == level, level.column())
                    .clicked()
                {
                    state.set_level(level);
                }
            }
        });
    ui.add_space(6.0);

    // ---- Unit multi-select ----
    let level = state.selection.level;
    let n_selected = state.selected_units().len();
    ui.strong(format!(
        "Select {level}(s)  ({n_selected}/{})",
        state.options.len()
    ));
    ui.horizontal(|ui: &mut Ui| {
        ui.label("🔍");
        ui.text_edit_singleline(&mut state.unit_search);
    });

    // Clone what we need so we can mutate state inside the loop.
    let needle = state.unit_search.to_lowercase();
    let shown: Vec<String> = state
        .options
        .iter()
        .filter(|o| needle.is_empty() || o.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    let select_all = state.selection.select_all;

    ScrollArea::vertical()
        .id_salt("units")
        .max_height((ui.available_height() - 140.0).max(120.0))
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            let mut all = select_all;
            if ui
                .checkbox(&mut all, RichText::new(SELECT_ALL).strong())
                .changed()
            {
                state.toggle_select_all();
            }

            ui.add_enabled_ui(!select_all, |ui: &mut Ui| {
                for unit in &shown {
                    let mut checked = select_all || state.selection.units.contains(unit);
                    if ui.checkbox(&mut checked, unit.as_str()).changed() {
                        state.toggle_unit(unit);
                    }
                }
            });
        });

    ui.separator();

    // ---- Export options and actions ----
    ui.checkbox(
        &mut state.separate_files,
        "Download Separately (Each County/Town in its Own Folder)",
    );
    ui.add_space(4.0);

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Show Statistics").clicked() {
            state.show_statistics();
        }
        if ui.button("Save Output").clicked() {
            if let Some(report) = state.save_output_and_report() {
                table::forget_previews(ui.ctx(), report);
            }
        }
    });
    ui.label(
        RichText::new(format!("Output folder: {}", state.output_dir.display()))
            .small()
            .weak(),
    );
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let source = state
                .source_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(format!(
                "{source}: {} rows loaded, {} visible",
                ds.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open indicator data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}
