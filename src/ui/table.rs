use std::path::Path;

use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::Dataset;
use crate::export::{ExportMode, ExportReport};
use crate::state::AppState;
use crate::stats::{STAT_LABELS, StatsTable, Summary};

const SMALL_SAMPLE_NOTE: &str = "Note: Very small towns with only one data point will not have \
extensive statistics performed on them, as there is no meaningful analysis to be done with only \
one data point.";

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Central panel – filtered rows, statistics, last export
// ---------------------------------------------------------------------------

/// Render the central results panel.
pub fn results_panel(ui: &mut Ui, state: &AppState) {
    let dataset = match &state.dataset {
        Some(ds) => ds,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a file to view indicator data  (File → Open…)");
            });
            return;
        }
    };

    ui.label(RichText::new(SMALL_SAMPLE_NOTE).italics());
    ui.add_space(6.0);

    ScrollArea::vertical()
        .id_salt("results")
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading(format!("Rows ({})", state.visible_indices.len()));
            ui.push_id("rows_table", |ui: &mut Ui| {
                rows_table(ui, dataset, &state.visible_indices);
            });

            if state.show_stats {
                ui.add_space(12.0);
                ui.heading("Statistics");
                if state.stats.is_degenerate() {
                    ui.label(
                        RichText::new(
                            "Fewer than two rows selected: most statistics are undefined (NaN).",
                        )
                        .weak(),
                    );
                }
                ui.push_id("stats_table", |ui: &mut Ui| {
                    stats_table(ui, &state.stats);
                });
            }

            if let Some(report) = &state.last_export {
                ui.add_space(12.0);
                export_summary(ui, report);
            }
        });
}

/// All columns of the visible rows.
fn rows_table(ui: &mut Ui, dataset: &Dataset, rows: &[usize]) {
    ScrollArea::horizontal()
        .id_salt("rows_scroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(320.0)
                .columns(Column::auto().at_least(60.0), dataset.columns.len())
                .header(20.0, |mut header| {
                    for name in &dataset.columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name.as_str());
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                        let cells = &dataset.rows[rows[row.index()]];
                        for cell in cells {
                            row.col(|ui: &mut Ui| {
                                ui.label(cell.to_string());
                            });
                        }
                    });
                });
        });
}

/// One row per statistic, one column per indicator.
fn stats_table(ui: &mut Ui, stats: &StatsTable) {
    let cells: Vec<[String; 8]> = stats.summaries.iter().map(Summary::display_values).collect();
    ScrollArea::horizontal()
        .id_salt("stats_scroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().at_least(50.0))
                .columns(Column::auto().at_least(70.0), stats.columns.len())
                .header(20.0, |mut header| {
                    header.col(|_ui: &mut Ui| {});
                    for name in &stats.columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name.as_str());
                        });
                    }
                })
                .body(|mut body| {
                    for (i, label) in STAT_LABELS.iter().enumerate() {
                        body.row(ROW_HEIGHT, |mut row| {
                            row.col(|ui: &mut Ui| {
                                ui.strong(*label);
                            });
                            for text in &cells {
                                row.col(|ui: &mut Ui| {
                                    ui.label(text[i].as_str());
                                });
                            }
                        });
                    }
                });
        });
}

fn export_summary(ui: &mut Ui, report: &ExportReport) {
    ui.heading("Last export");
    match report.mode {
        ExportMode::Combined => {
            if let Some(path) = report.files.first() {
                ui.label(format!("Statistics saved to: {}", path.display()));
            }
        }
        ExportMode::PerUnit => {
            ui.label(format!("{} file(s) written", report.files.len()));
            egui::CollapsingHeader::new("Files")
                .id_salt("export_files")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    for path in &report.files {
                        ui.label(path.display().to_string());
                    }
                });

            if let Some(path) = report.heatmaps().next() {
                ui.add(
                    egui::Image::new(preview_uri(path))
                        .max_width(480.0)
                        .max_height(400.0),
                );
            }
        }
    }
}

fn preview_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Drop cached heatmap previews so a re-export to the same paths is shown
/// from the new files.
pub fn forget_previews(ctx: &egui::Context, report: &ExportReport) {
    for path in report.heatmaps() {
        ctx.forget_image(&preview_uri(path));
    }
}
