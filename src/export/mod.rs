/// Export layer: writes the selection to disk.
///
/// ```text
///  per-unit mode                         combined mode
///  <out>/<stem>/<stem>.csv               <out>/<stem1>_<stem2>_….csv
///               <stem>_statistics.csv      (statistics of the whole view)
///               <stem>_correlation_matrix_heatmap.png
///               <stem>_<column>_boxplot.png  × 24
/// ```
pub mod charts;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::filter::unit_indices;
use crate::data::model::{Dataset, INDICATOR_COLUMNS, Level};
use crate::stats::{correlation, describe, write_stats_csv};
use charts::{ChartError, render_boxplot, render_heatmap};

/// Combined file names longer than this fall back to a summary stem.
const MAX_COMBINED_STEM: usize = 200;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("nothing selected to export")]
    EmptySelection,

    #[error("creating {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Chart(#[from] ChartError),
}

type Result<T> = core::result::Result<T, ExportError>;

/// File and folder stem of a unit: spaces become underscores.
pub fn stem(unit: &str) -> String {
    unit.replace(' ', "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// One folder per unit with rows, statistics and charts.
    PerUnit,
    /// A single statistics CSV for the whole filtered view.
    Combined,
}

impl ExportMode {
    /// Per-unit when asked for, or when there is only one unit anyway.
    pub fn choose(separate_files: bool, unit_count: usize) -> Self {
        if separate_files || unit_count == 1 {
            ExportMode::PerUnit
        } else {
            ExportMode::Combined
        }
    }
}

/// Everything an export needs, borrowed from the application state.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub dataset: &'a Dataset,
    pub level: Level,
    /// Expanded unit names, `Select All` already resolved.
    pub units: &'a [String],
    /// Filtered row indices of `units`.
    pub rows: &'a [usize],
    pub separate_files: bool,
    pub output_dir: &'a Path,
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub mode: ExportMode,
    pub files: Vec<PathBuf>,
}

const HEATMAP_SUFFIX: &str = "_correlation_matrix_heatmap.png";

impl ExportReport {
    /// Heatmaps written by this export, in unit order.
    pub fn heatmaps(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|p| p.to_string_lossy().ends_with(HEATMAP_SUFFIX))
            .map(PathBuf::as_path)
    }
}

/// Write the requested output, returning every file created.
pub fn save_output(request: &ExportRequest<'_>) -> Result<ExportReport> {
    if request.units.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let mode = ExportMode::choose(request.separate_files, request.units.len());
    let mut files = Vec::new();
    match mode {
        ExportMode::PerUnit => {
            for unit in request.units {
                export_unit(request.dataset, request.level, unit, request.output_dir, &mut files)?;
            }
        }
        ExportMode::Combined => {
            create_dir(request.output_dir)?;
            let path = request
                .output_dir
                .join(combined_file_name(request.level, request.units));
            write_stats_file(request.dataset, request.rows, &path)?;
            files.push(path);
        }
    }

    log::info!("Exported {} file(s) to {}", files.len(), request.output_dir.display());
    Ok(ExportReport { mode, files })
}

/// `<stem1>_<stem2>_….csv`, or `<level>_<n>_units.csv` when that would be
/// too long for a file name.
pub fn combined_file_name(level: Level, units: &[String]) -> String {
    let joined = units.iter().map(|u| stem(u)).collect::<Vec<_>>().join("_");
    if joined.len() > MAX_COMBINED_STEM {
        format!("{}_{}_units.csv", level.column(), units.len())
    } else {
        format!("{joined}.csv")
    }
}

fn export_unit(
    dataset: &Dataset,
    level: Level,
    unit: &str,
    output_dir: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let stem = stem(unit);
    let dir = output_dir.join(&stem);
    create_dir(&dir)?;

    let rows = unit_indices(dataset, level, unit);

    let rows_path = dir.join(format!("{stem}.csv"));
    write_rows_file(dataset, &rows, &rows_path)?;
    files.push(rows_path);

    if rows.len() < 2 {
        log::info!("{unit}: {} row(s), skipping statistics and charts", rows.len());
        return Ok(());
    }

    let stats_path = dir.join(format!("{stem}_statistics.csv"));
    write_stats_file(dataset, &rows, &stats_path)?;
    files.push(stats_path);

    let heatmap_path = dir.join(format!("{stem}{HEATMAP_SUFFIX}"));
    render_heatmap(
        &correlation(dataset, &rows),
        &format!("Correlation Matrix Heatmap ({unit})"),
        &heatmap_path,
    )?;
    files.push(heatmap_path);

    for column in INDICATOR_COLUMNS {
        let values: Vec<f64> = dataset
            .numeric_column(column, &rows)
            .into_iter()
            .flatten()
            .collect();
        let path = dir.join(format!("{stem}_{column}_boxplot.png"));
        render_boxplot(
            &values,
            column,
            &format!("Box Plot of {column} ({unit})"),
            &path,
        )?;
        files.push(path);
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// All columns of `rows`, header first, no index column.
fn write_rows_file(dataset: &Dataset, rows: &[usize], path: &Path) -> Result<()> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(&dataset.columns).map_err(csv_err)?;
    for &row in rows {
        wtr.write_record(dataset.rows[row].iter().map(|c| c.to_field()))
            .map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_stats_file(dataset: &Dataset, rows: &[usize], path: &Path) -> Result<()> {
    let file = fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_stats_csv(&describe(dataset, rows), io::BufWriter::new(file)).map_err(|source| {
        ExportError::Csv {
            path: path.to_path_buf(),
            source,
        }
    })
}
