use std::io::Write;

use crate::data::model::{Dataset, INDICATOR_COLUMNS, format_float};

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Row labels of a statistics table, in output order.
pub const STAT_LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Summary of one column. `None` marks an undefined statistic.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    /// Summarize the non-missing values of a column.
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Summary::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = count as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = (count > 1).then(|| {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        });

        Summary {
            count,
            mean: Some(mean),
            std,
            min: sorted.first().copied(),
            q25: Some(quantile(&sorted, 0.25)),
            q50: Some(quantile(&sorted, 0.50)),
            q75: Some(quantile(&sorted, 0.75)),
            max: sorted.last().copied(),
        }
    }

    /// Values in [`STAT_LABELS`] order.
    pub fn values(&self) -> [Option<f64>; 8] {
        [
            Some(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
        ]
    }

    /// On-screen text in [`STAT_LABELS`] order: `count` as an integer, the
    /// rest to four decimals, undefined values as `NaN`.
    pub fn display_values(&self) -> [String; 8] {
        let mut out = self
            .values()
            .map(|v| v.map_or_else(|| "NaN".to_string(), |v| format!("{v:.4}")));
        out[0] = self.count.to_string();
        out
    }
}

/// Quantile of sorted data with linear interpolation between the two
/// closest ranks. `sorted` must be non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Per-column summaries over a set of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsTable {
    pub columns: Vec<String>,
    pub summaries: Vec<Summary>,
    /// Number of rows the table was computed from.
    pub rows: usize,
}

impl StatsTable {
    /// Fewer than two rows: std is undefined everywhere and the quartiles
    /// collapse onto the single value.
    pub fn is_degenerate(&self) -> bool {
        self.rows < 2
    }
}

#[cfg(test)]
impl StatsTable {
    pub fn summary(&self, column: &str) -> Option<&Summary> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.summaries[i])
    }
}

/// Summarize every indicator column over `rows`.
pub fn describe(dataset: &Dataset, rows: &[usize]) -> StatsTable {
    let summaries = INDICATOR_COLUMNS
        .iter()
        .map(|column| {
            let values: Vec<f64> = dataset
                .numeric_column(column, rows)
                .into_iter()
                .flatten()
                .collect();
            Summary::from_values(&values)
        })
        .collect();

    StatsTable {
        columns: INDICATOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
        summaries,
        rows: rows.len(),
    }
}

/// Write a statistics table as CSV: one header row of column names and
/// one row per statistic, labelled in the first field. Undefined values
/// are written as empty fields.
pub fn write_stats_csv<W: Write>(table: &StatsTable, writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![String::new()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;

    for (i, label) in STAT_LABELS.iter().enumerate() {
        let mut record = vec![label.to_string()];
        record.extend(
            table
                .summaries
                .iter()
                .map(|s| s.values()[i].map(format_float).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Square matrix of Pearson coefficients between indicator columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `columns.len()` × `columns.len()`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }
}

/// Pearson correlation of every indicator pair over `rows`, using the rows
/// where both values are present. Undefined coefficients are 0.
pub fn correlation(dataset: &Dataset, rows: &[usize]) -> CorrelationMatrix {
    let data: Vec<Vec<Option<f64>>> = INDICATOR_COLUMNS
        .iter()
        .map(|c| dataset.numeric_column(c, rows))
        .collect();

    let n = data.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&data[i], &data[j]).unwrap_or(0.0);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: INDICATOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
        values,
    }
}

/// Pearson coefficient over pairwise-complete observations.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
