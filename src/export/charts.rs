//! PNG charts for exported units.
//!
//! Both charts are drawn with the [`plotters`] bitmap backend. Text needs a
//! system font; when none can be loaded the chart is drawn again without
//! captions and axis labels so the image set of an export stays complete.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use plotters::prelude::*;
use plotters::style::FontTransform;
use thiserror::Error;

use crate::color::DivergingMap;
use crate::stats::{CorrelationMatrix, quantile};

/// Errors that can occur while rendering a chart
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to draw {path}: {message}")]
    Drawing { path: PathBuf, message: String },
}

type Result<T> = core::result::Result<T, ChartError>;
type DrawResult = core::result::Result<(), Box<dyn StdError>>;

pub const HEATMAP_SIZE: (u32, u32) = (1000, 800);
pub const BOXPLOT_SIZE: (u32, u32) = (800, 600);
const COLORBAR_WIDTH: i32 = 120;
const COLORBAR_STEPS: usize = 100;

const BOX_LOW: f64 = 0.3;
const BOX_MID: f64 = 0.5;
const BOX_HIGH: f64 = 0.7;
const BOX_FILL: RGBColor = RGBColor(76, 114, 176);

/// Set after the first unlabelled fallback so the warning is logged once.
static FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

fn draw_with_fallback(path: &Path, draw: impl Fn(bool) -> DrawResult) -> Result<()> {
    match draw(true) {
        Ok(()) => Ok(()),
        Err(e) => {
            if !FALLBACK_WARNED.swap(true, Ordering::Relaxed) {
                log::warn!(
                    "Drawing {} with labels failed ({e}); retrying without text",
                    path.display()
                );
            }
            draw(false).map_err(|e| ChartError::Drawing {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Correlation heatmap
// ---------------------------------------------------------------------------

/// Render `matrix` as a heatmap with a colour bar, first column in the top
/// left corner.
pub fn render_heatmap(matrix: &CorrelationMatrix, title: &str, path: &Path) -> Result<()> {
    draw_with_fallback(path, |labels| draw_heatmap(matrix, title, path, labels))
}

fn segment_label(columns: &[String], value: &SegmentValue<usize>, flipped: bool) -> String {
    match value {
        SegmentValue::CenterOf(i) if *i < columns.len() => {
            let idx = if flipped { columns.len() - 1 - i } else { *i };
            columns[idx].clone()
        }
        _ => String::new(),
    }
}

fn draw_heatmap(matrix: &CorrelationMatrix, title: &str, path: &Path, labels: bool) -> DrawResult {
    let n = matrix.columns.len();
    let map = DivergingMap::correlation();

    let root = BitMapBackend::new(path, HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, bar) = root.split_horizontally(HEATMAP_SIZE.0 as i32 - COLORBAR_WIDTH);

    let mut builder = ChartBuilder::on(&main);
    builder.margin(10);
    if labels {
        builder
            .caption(title, ("sans-serif", 22))
            .x_label_area_size(110)
            .y_label_area_size(110);
    }
    // Integer ranges include their end, so `0..last` gives one segment per column.
    let last = n.saturating_sub(1);
    let mut chart =
        builder.build_cartesian_2d((0..last).into_segmented(), (0..last).into_segmented())?;

    if labels {
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_style(
                ("sans-serif", 11)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_label_style(("sans-serif", 11))
            .x_label_formatter(&|v: &SegmentValue<usize>| segment_label(&matrix.columns, v, false))
            .y_label_formatter(&|v: &SegmentValue<usize>| segment_label(&matrix.columns, v, true))
            .draw()?;
    }

    chart.draw_series(
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| {
                // Row 0 is drawn at the top.
                let y = n - 1 - i;
                Rectangle::new(
                    [
                        (SegmentValue::Exact(j), SegmentValue::Exact(y)),
                        (SegmentValue::Exact(j + 1), SegmentValue::Exact(y + 1)),
                    ],
                    map.color_for(matrix.get(i, j)).filled(),
                )
            }),
    )?;

    let mut bar_builder = ChartBuilder::on(&bar);
    bar_builder
        .margin_top(if labels { 50 } else { 10 })
        .margin_bottom(if labels { 120 } else { 10 })
        .margin_right(20);
    if labels {
        bar_builder.y_label_area_size(45);
    }
    let mut bar_chart = bar_builder.build_cartesian_2d(0.0..1.0, map.min..map.max)?;
    if labels {
        bar_chart
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(5)
            .label_style(("sans-serif", 12))
            .draw()?;
    }
    let step = (map.max - map.min) / COLORBAR_STEPS as f64;
    bar_chart.draw_series((0..COLORBAR_STEPS).map(|k| {
        let lo = map.min + step * k as f64;
        Rectangle::new(
            [(0.0, lo), (1.0, lo + step)],
            map.color_for(lo + step / 2.0).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Box plot
// ---------------------------------------------------------------------------

/// Five-number summary with Tukey whiskers (1.5 × IQR).
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Furthest values still inside the whisker fences.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let in_fence = |v: &f64| (lo_fence..=hi_fence).contains(v);
        let lower_whisker = sorted.iter().copied().find(|v| in_fence(v)).unwrap_or(q1);
        let upper_whisker = sorted.iter().copied().rev().find(|v| in_fence(v)).unwrap_or(q3);
        let outliers = sorted.iter().copied().filter(|v| !in_fence(v)).collect();

        Some(BoxStats {
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Value-axis range covering `values` with a little padding.
fn axis_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= f64::EPSILON * max.abs().max(1.0) {
        let pad = (min.abs() * 0.1).max(0.5);
        return (min - pad, max + pad);
    }
    (min - span * 0.05, max + span * 0.05)
}

/// Render a horizontal box plot of `values`. An empty slice yields an empty
/// frame.
pub fn render_boxplot(values: &[f64], column: &str, title: &str, path: &Path) -> Result<()> {
    draw_with_fallback(path, |labels| draw_boxplot(values, column, title, path, labels))
}

fn draw_boxplot(values: &[f64], column: &str, title: &str, path: &Path, labels: bool) -> DrawResult {
    let root = BitMapBackend::new(path, BOXPLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (lo, hi) = axis_range(values);
    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if labels {
        builder
            .caption(title, ("sans-serif", 22))
            .x_label_area_size(50)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(lo..hi, 0.0..1.0)?;

    if labels {
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(0)
            .x_desc(column)
            .y_desc("Value")
            .label_style(("sans-serif", 14))
            .draw()?;
    }

    if let Some(b) = BoxStats::from_values(values) {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(b.q1, BOX_LOW), (b.q3, BOX_HIGH)],
            BOX_FILL.mix(0.85).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(b.q1, BOX_LOW), (b.q3, BOX_HIGH)],
            BLACK.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(b.median, BOX_LOW), (b.median, BOX_HIGH)],
            BLACK.stroke_width(2),
        )))?;

        let cap = (BOX_HIGH - BOX_LOW) / 4.0;
        let whiskers = [
            vec![(b.lower_whisker, BOX_MID), (b.q1, BOX_MID)],
            vec![(b.q3, BOX_MID), (b.upper_whisker, BOX_MID)],
            vec![(b.lower_whisker, BOX_MID - cap), (b.lower_whisker, BOX_MID + cap)],
            vec![(b.upper_whisker, BOX_MID - cap), (b.upper_whisker, BOX_MID + cap)],
        ];
        chart.draw_series(
            whiskers
                .into_iter()
                .map(|points| PathElement::new(points, BLACK.stroke_width(1))),
        )?;
        chart.draw_series(
            b.outliers
                .iter()
                .map(|&v| Circle::new((v, BOX_MID), 4, BLACK.stroke_width(1))),
        )?;
    }

    root.present()?;
    Ok(())
}
