use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::data::filter::{Selection, filtered_indices, unit_options};
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Level};
use crate::data::sanitize::sanitize_indicators;
use crate::export::{ExportReport, ExportRequest, save_output};
use crate::stats::{StatsTable, describe};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file is loaded), already sanitized.
    pub dataset: Option<Dataset>,

    /// Where the current dataset came from.
    pub source_path: Option<PathBuf>,

    /// Level and selected units.
    pub selection: Selection,

    /// Sorted unit names at the current level (cached).
    pub options: BTreeSet<String>,

    /// Text typed into the unit search box.
    pub unit_search: String,

    /// "Download Separately" checkbox.
    pub separate_files: bool,

    /// Indices of rows passing the current selection (cached).
    pub visible_indices: Vec<usize>,

    /// Statistics over `visible_indices` (cached).
    pub stats: StatsTable,

    /// Whether the statistics table is shown.
    pub show_stats: bool,

    /// Directory exports are written under.
    pub output_dir: PathBuf,

    /// Result of the last "Save Output".
    pub last_export: Option<ExportReport>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            dataset: None,
            source_path: None,
            selection: Selection::default(),
            options: BTreeSet::new(),
            unit_search: String::new(),
            separate_files: false,
            visible_indices: Vec::new(),
            stats: StatsTable::default(),
            show_stats: false,
            output_dir,
            last_export: None,
            status_message: None,
        }
    }

    /// Load `path`, reporting failures in the status line.
    pub fn open(&mut self, path: &Path) {
        match load_file(path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows with {} columns from {}",
                    dataset.len(),
                    dataset.columns.len(),
                    path.display()
                );
                self.set_dataset(dataset);
                self.source_path = Some(path.to_path_buf());
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded dataset: sanitize, reset the selection.
    pub fn set_dataset(&mut self, mut dataset: Dataset) {
        let cleared = sanitize_indicators(&mut dataset);
        if cleared > 0 {
            log::info!("Cleared {cleared} negative indicator value(s)");
        }

        self.options = unit_options(&dataset, self.selection.level);
        self.selection = Selection::new(self.selection.level);
        self.dataset = Some(dataset);
        self.show_stats = false;
        self.last_export = None;
        self.status_message = None;
        self.refilter();
    }

    /// Switch between town and county level. Clears the selection.
    pub fn set_level(&mut self, level: Level) {
        if self.selection.level == level {
            return;
        }
        self.selection.set_level(level);
        self.unit_search.clear();
        if let Some(ds) = &self.dataset {
            self.options = unit_options(ds, level);
        }
        self.refilter();
    }

    /// Toggle a single unit.
    pub fn toggle_unit(&mut self, unit: &str) {
        self.selection.toggle(unit);
        self.refilter();
    }

    /// Toggle the `Select All` sentinel.
    pub fn toggle_select_all(&mut self) {
        self.selection.select_all = !self.selection.select_all;
        self.refilter();
    }

    /// Units the current selection stands for, `Select All` expanded.
    pub fn selected_units(&self) -> Vec<String> {
        self.selection.expand(&self.options)
    }

    /// Recompute `visible_indices` and statistics after a selection change.
    pub fn refilter(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let units = self.selection.expand(&self.options);
        self.visible_indices = filtered_indices(ds, self.selection.level, &units);
        self.stats = describe(ds, &self.visible_indices);
        log::debug!(
            "{} unit(s) selected, {} row(s) visible",
            units.len(),
            self.visible_indices.len()
        );
    }

    /// "Show Statistics" button.
    pub fn show_statistics(&mut self) {
        self.show_stats = true;
    }

    /// "Save Output" button.
    pub fn save_output(&mut self) -> Result<()> {
        let Some(ds) = &self.dataset else {
            anyhow::bail!("No dataset loaded");
        };
        let units = self.selection.expand(&self.options);
        let report = save_output(&ExportRequest {
            dataset: ds,
            level: self.selection.level,
            units: &units,
            rows: &self.visible_indices,
            separate_files: self.separate_files,
            output_dir: &self.output_dir,
        })?;
        self.last_export = Some(report);
        Ok(())
    }

    /// Run "Save Output", reporting the outcome in the status line.
    /// Returns the new report when the export succeeded.
    pub fn save_output_and_report(&mut self) -> Option<&ExportReport> {
        match self.save_output() {
            Ok(()) => {
                self.status_message = None;
                self.last_export.as_ref()
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::sample_dataset;
    use crate::export::ExportMode;

    fn state_with_data(out: &Path) -> AppState {
        let mut state = AppState::new(out.to_path_buf());
        state.set_dataset(sample_dataset(&[
            ("Andover", "Tolland", 1.0),
            ("Bolton", "Tolland", -2.0),
            ("Andover", "Tolland", 3.0),
            ("Canton", "Hartford", 4.0),
        ]));
        state
    }

    #[test]
    fn nothing_visible_until_selected() {
        let state = state_with_data(Path::new("unused"));
        assert_eq!(state.options.len(), 3);
        assert!(state.visible_indices.is_empty());
        assert_eq!(state.stats.rows, 0);
    }

    #[test]
    fn selection_updates_view_and_stats() {
        let mut state = state_with_data(Path::new("unused"));
        state.toggle_unit("Andover");
        assert_eq!(state.visible_indices, vec![0, 2]);
        assert_eq!(state.stats.rows, 2);
        assert!(state.stats.summary("Score").unwrap().std.is_some());

        state.toggle_select_all();
        assert_eq!(state.visible_indices, vec![0, 1, 2, 3]);
        assert_eq!(state.selected_units().len(), 3);
    }

    #[test]
    fn loaded_data_is_sanitized() {
        let mut state = state_with_data(Path::new("unused"));
        state.toggle_unit("Bolton");
        let score = state.stats.summary("Score").unwrap();
        assert_eq!(score.count, 0);
        assert_eq!(score.mean, None);
    }

    #[test]
    fn level_change_resets_selection() {
        let mut state = state_with_data(Path::new("unused"));
        state.toggle_unit("Andover");
        state.set_level(Level::County);
        assert!(state.selection.units.is_empty());
        assert!(state.visible_indices.is_empty());
        assert_eq!(
            state.options.iter().collect::<Vec<_>>(),
            vec!["Hartford", "Tolland"]
        );
        state.toggle_unit("Tolland");
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
    }

    #[test]
    fn save_output_records_report() {
        let out = tempfile::tempdir().expect("failed to create temp dir");
        let mut state = state_with_data(out.path());
        state.toggle_unit("Canton");
        assert!(state.save_output_and_report().is_some());

        let report = state.last_export.as_ref().unwrap();
        assert_eq!(report.mode, ExportMode::PerUnit);
        assert_eq!(report.files, vec![out.path().join("Canton").join("Canton.csv")]);
        assert!(state.status_message.is_none());
    }

    #[test]
    fn repeated_save_reports_the_same_heatmap() {
        let out = tempfile::tempdir().expect("failed to create temp dir");
        let mut state = state_with_data(out.path());
        state.toggle_unit("Andover");

        let first: Vec<PathBuf> = state
            .save_output_and_report()
            .unwrap()
            .heatmaps()
            .map(Path::to_path_buf)
            .collect();
        let expected = out.path().join("Andover").join("Andover_correlation_matrix_heatmap.png");
        assert_eq!(first, vec![expected.clone()]);

        let second = state.save_output_and_report().unwrap();
        assert_eq!(second.heatmaps().collect::<Vec<_>>(), vec![expected.as_path()]);
    }

    #[test]
    fn save_without_selection_sets_status() {
        let out = tempfile::tempdir().expect("failed to create temp dir");
        let mut state = state_with_data(out.path());
        assert!(state.save_output_and_report().is_none());
        assert!(state.last_export.is_none());
        assert!(state.status_message.unwrap().contains("nothing selected"));
    }

    #[test]
    fn open_reports_missing_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut state = AppState::new(dir.path().to_path_buf());
        state.open(&dir.path().join("output.csv"));
        assert!(state.dataset.is_none());
        assert!(state.status_message.unwrap().starts_with("Error:"));
    }
}
