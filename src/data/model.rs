use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Column constants
// ---------------------------------------------------------------------------

/// Column holding the town name of a row.
pub const TOWN_COLUMN: &str = "TOWN_NAME";

/// Column holding the county name of a row.
pub const COUNTY_COLUMN: &str = "County";

/// The numeric indicator columns that are sanitized and summarized, in
/// report order.
pub const INDICATOR_COLUMNS: [&str; 24] = [
    "Area_SqMil",
    "Area_Sqft",
    "Area_SqM",
    "HealthSens",
    "SocioEcoFa",
    "SensitiveP",
    "PollExposu",
    "PollSource",
    "PollutionB",
    "Score",
    "Percentile",
    "Rank",
    "TotalPopul",
    "PercentBla",
    "PercentAme",
    "PercentAsi",
    "PercentNat",
    "PercentOth",
    "PercentHis",
    "PercentWhi",
    "TotalPerce",
    "Unemployed",
    "PovertyPer",
    "Median_Inc",
];

// ---------------------------------------------------------------------------
// Level – the grouping granularity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    #[default]
    Town,
    County,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::Town, Level::County];

    /// Name of the dataset column this level groups by.
    pub fn column(self) -> &'static str {
        match self {
            Level::Town => TOWN_COLUMN,
            Level::County => COUNTY_COLUMN,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the common Pandas dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Missing,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Missing => write!(f, "NaN"),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell, `None` for text, booleans and missing cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Text written to CSV output. Missing cells become empty fields and
    /// whole floats keep a trailing `.0`, the way pandas writes them.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(v) => format_float(*v),
            CellValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            CellValue::Missing => String::new(),
        }
    }
}

/// Format a float the way it appears in exported CSVs: shortest
/// round-trip digits, switching to `1e+20` style outside `[1e-4, 1e16)`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if !v.is_finite() {
        format!("{v}")
    } else if v != 0.0 && !(1e-4..1e16).contains(&v.abs()) {
        scientific(v)
    } else if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn scientific(v: f64) -> String {
    let s = format!("{v:e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table. Rows keep the column order of the source file.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Column names in source order.
    pub columns: Vec<String>,
    /// Row-major cells; every row has `columns.len()` entries.
    pub rows: Vec<Vec<CellValue>>,
    index: BTreeMap<String, usize>,
}

impl Dataset {
    /// Build the column index. Short rows are padded with missing cells.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, CellValue::Missing);
        }
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Dataset {
            columns,
            rows,
            index,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Cell at `row` / `column`, `None` when the column does not exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Numeric values of `column` over `rows`, one entry per row.
    pub fn numeric_column(&self, column: &str, rows: &[usize]) -> Vec<Option<f64>> {
        match self.column_index(column) {
            Some(col) => rows.iter().map(|&r| self.rows[r][col].as_f64()).collect(),
            None => vec![None; rows.len()],
        }
    }

    /// Sorted, de-duplicated, non-missing values of `column` as text.
    pub fn unique_values(&self, column: &str) -> BTreeSet<String> {
        let Some(col) = self.column_index(column) else {
            return BTreeSet::new();
        };
        self.rows
            .iter()
            .map(|r| &r[col])
            .filter(|v| !v.is_missing())
            .map(CellValue::to_field)
            .collect()
    }
}
