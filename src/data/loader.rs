use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Float16Type, Float32Type, Float64Type, Int8Type, Int16Type,
    Int32Type, Int64Type, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Dataset, INDICATOR_COLUMNS, Level};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an indicator table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row followed by one row per census unit (default)
/// * `.json`    – `[{ "TOWN_NAME": "...", "County": "...", ... }, ...]`
/// * `.parquet` – one column per field, as written by `df.to_parquet()`
///
/// The result is validated: the level columns and every indicator column
/// must be present, and indicator cells must be numeric or missing.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    validate(&dataset)?;
    Ok(dataset)
}

/// Check that `dataset` has the columns the report needs.
pub fn validate(dataset: &Dataset) -> Result<()> {
    for level in Level::ALL {
        if dataset.column_index(level.column()).is_none() {
            bail!("Dataset missing '{}' column", level.column());
        }
    }

    let missing: Vec<&str> = INDICATOR_COLUMNS
        .iter()
        .copied()
        .filter(|c| dataset.column_index(c).is_none())
        .collect();
    if !missing.is_empty() {
        bail!("Dataset missing indicator columns: {}", missing.join(", "));
    }

    for column in INDICATOR_COLUMNS {
        let Some(col) = dataset.column_index(column) else {
            continue;
        };
        for (row_no, row) in dataset.rows.iter().enumerate() {
            let cell = &row[col];
            if !cell.is_missing() && cell.as_f64().is_none() {
                bail!("Row {row_no}, {column}: '{cell}' is not a number");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one record per unit.
/// Cell types are guessed per value, the way `pd.read_csv` infers dtypes.
fn load_csv(path: &Path) -> Result<Dataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: Vec<CellValue> = record.iter().map(guess_cell_type).collect();
        rows.push(row);
    }

    Ok(Dataset::new(headers, rows))
}

pub fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return CellValue::Missing;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "True" => CellValue::Bool(true),
        "false" | "False" => CellValue::Bool(false),
        _ => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "TOWN_NAME": "Andover", "County": "Tolland", "Score": 12.5, ... },
///   ...
/// ]
/// ```
///
/// Columns are ordered by first appearance.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .into_iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(json_to_cell).unwrap_or(CellValue::Missing))
                .collect()
        })
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding the indicator table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Pandas index columns
/// (`__index_level_0__`) are dropped.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Option<Vec<(usize, String)>> = None;
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let cols = columns.get_or_insert_with(|| {
            schema
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| !f.name().starts_with("__index_level_"))
                .map(|(i, f)| (i, f.name().clone()))
                .collect()
        });

        let converted = cols
            .iter()
            .map(|(col_idx, name)| {
                column_cells(batch.column(*col_idx))
                    .with_context(|| format!("reading parquet column '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(converted.iter().map(|cells| cells[row].clone()).collect());
        }
    }

    let names = columns
        .unwrap_or_default()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    Ok(Dataset::new(names, rows))
}

/// Convert one Arrow column into cells.
///
/// Numeric types map onto `Integer`/`Float` so indicator columns stay
/// numeric whatever width they were stored with. Dictionary columns
/// (pandas categoricals) are decoded first; any other type keeps its Arrow
/// display form, e.g. `2022-01-08` for a `Date32`.
fn column_cells(col: &ArrayRef) -> Result<Vec<CellValue>> {
    let cells = match col.data_type() {
        DataType::Utf8 => {
            let a = col.as_string::<i32>();
            non_null(col, |r| CellValue::Text(a.value(r).to_string()))
        }
        DataType::LargeUtf8 => {
            let a = col.as_string::<i64>();
            non_null(col, |r| CellValue::Text(a.value(r).to_string()))
        }
        DataType::Int8 => integers::<Int8Type>(col),
        DataType::Int16 => integers::<Int16Type>(col),
        DataType::Int32 => integers::<Int32Type>(col),
        DataType::Int64 => integers::<Int64Type>(col),
        DataType::UInt8 => integers::<UInt8Type>(col),
        DataType::UInt16 => integers::<UInt16Type>(col),
        DataType::UInt32 => integers::<UInt32Type>(col),
        DataType::UInt64 => {
            let a = col.as_primitive::<UInt64Type>();
            non_null(col, |r| {
                let v = a.value(r);
                i64::try_from(v).map_or(CellValue::Float(v as f64), CellValue::Integer)
            })
        }
        DataType::Float16 => floats::<Float16Type>(col),
        DataType::Float32 => floats::<Float32Type>(col),
        DataType::Float64 => floats::<Float64Type>(col),
        DataType::Boolean => {
            let a = col.as_boolean();
            non_null(col, |r| CellValue::Bool(a.value(r)))
        }
        DataType::Dictionary(_, value_type) => {
            let decoded = cast(col.as_ref(), value_type).context("decoding dictionary column")?;
            return column_cells(&decoded);
        }
        other => {
            let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())
                .with_context(|| format!("unsupported column type {other}"))?;
            let mut cells = Vec::with_capacity(col.len());
            for r in 0..col.len() {
                cells.push(if col.is_null(r) {
                    CellValue::Missing
                } else {
                    CellValue::Text(formatter.value(r).try_to_string()?)
                });
            }
            cells
        }
    };
    Ok(cells)
}

fn non_null(col: &ArrayRef, cell: impl Fn(usize) -> CellValue) -> Vec<CellValue> {
    (0..col.len())
        .map(|r| if col.is_null(r) { CellValue::Missing } else { cell(r) })
        .collect()
}

fn integers<T>(col: &ArrayRef) -> Vec<CellValue>
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    let a = col.as_primitive::<T>();
    non_null(col, |r| CellValue::Integer(a.value(r).into()))
}

fn floats<T>(col: &ArrayRef) -> Vec<CellValue>
where
    T: ArrowPrimitiveType,
    T::Native: Into<f64>,
{
    let a = col.as_primitive::<T>();
    non_null(col, |r| CellValue::Float(a.value(r).into()))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fmt::Write as _;
    use std::sync::Arc;

    use arrow::array::{
        Date32Array, DictionaryArray, Float64Array, Int16Array, Int64Array, StringArray,
        UInt32Array,
    };
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    /// Build a CSV with the full column set. Each entry is
    /// `(town, county, value)`; every indicator gets `value`.
    pub(crate) fn sample_csv(rows: &[(&str, &str, f64)]) -> String {
        let mut out = String::from("OBJECTID,TOWN_NAME,County");
        for c in INDICATOR_COLUMNS {
            out.push(',');
            out.push_str(c);
        }
        out.push('\n');
        for (i, (town, county, value)) in rows.iter().enumerate() {
            write!(out, "{i},{town},{county}").unwrap();
            for _ in INDICATOR_COLUMNS {
                write!(out, ",{value}").unwrap();
            }
            out.push('\n');
        }
        out
    }

    pub(crate) fn sample_dataset(rows: &[(&str, &str, f64)]) -> Dataset {
        let csv = sample_csv(rows);
        let ds = read_csv(csv::Reader::from_reader(csv.as_bytes())).unwrap();
        validate(&ds).unwrap();
        ds
    }

    #[test]
    fn guesses_cell_types() {
        assert_eq!(guess_cell_type(""), CellValue::Missing);
        assert_eq!(guess_cell_type("NaN"), CellValue::Missing);
        assert_eq!(guess_cell_type("12"), CellValue::Integer(12));
        assert_eq!(guess_cell_type("-3.5"), CellValue::Float(-3.5));
        assert_eq!(guess_cell_type("True"), CellValue::Bool(true));
        assert_eq!(
            guess_cell_type(" New Haven "),
            CellValue::Text("New Haven".to_string())
        );
    }

    #[test]
    fn loads_csv_file_from_disk() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("output.csv");
        std::fs::write(
            &path,
            sample_csv(&[("Andover", "Tolland", 1.5), ("Ashford", "Windham", 2.0)]),
        )
        .unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.columns[0], "OBJECTID");
        assert_eq!(ds.columns.len(), 3 + INDICATOR_COLUMNS.len());
        assert_eq!(
            ds.value(1, "TOWN_NAME"),
            Some(&CellValue::Text("Ashford".to_string()))
        );
        assert_eq!(ds.value(0, "Score").and_then(CellValue::as_f64), Some(1.5));
    }

    #[test]
    fn rejects_missing_indicator_columns() {
        let ds = read_csv(csv::Reader::from_reader(
            "TOWN_NAME,County,Score\nAndover,Tolland,1\n".as_bytes(),
        ))
        .unwrap();
        let err = validate(&ds).unwrap_err().to_string();
        assert!(err.contains("Area_SqMil"), "{err}");
        assert!(!err.contains("Score"), "{err}");
    }

    #[test]
    fn rejects_missing_level_column() {
        let ds = read_csv(csv::Reader::from_reader("TOWN_NAME\nAndover\n".as_bytes())).unwrap();
        let err = validate(&ds).unwrap_err().to_string();
        assert!(err.contains("County"), "{err}");
    }

    #[test]
    fn rejects_text_in_indicator_column() {
        let mut ds = sample_dataset(&[("Andover", "Tolland", 1.0)]);
        let col = ds.column_index("Rank").unwrap();
        ds.rows[0][col] = CellValue::Text("n/a".to_string());
        let err = validate(&ds).unwrap_err().to_string();
        assert!(err.contains("Rank"), "{err}");
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_file(Path::new("data.xlsx")).unwrap_err().to_string();
        assert!(err.contains(".xlsx"), "{err}");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        assert!(load_file(&dir.path().join("output.csv")).is_err());
    }

    #[test]
    fn parses_records_json() {
        let ds = parse_json(
            r#"[
                {"TOWN_NAME": "Andover", "County": "Tolland", "Score": 3},
                {"TOWN_NAME": "Bolton", "Score": null, "Rank": 2.5}
            ]"#,
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, "Score"), Some(&CellValue::Integer(3)));
        assert_eq!(ds.value(1, "Score"), Some(&CellValue::Missing));
        assert_eq!(ds.value(1, "County"), Some(&CellValue::Missing));
        assert_eq!(ds.value(0, "Rank"), Some(&CellValue::Missing));
        assert_eq!(ds.value(1, "Rank"), Some(&CellValue::Float(2.5)));
    }

    fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn reads_parquet_columns_and_nulls() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("output.parquet");
        write_parquet(
            &path,
            vec![
                ("TOWN_NAME", Arc::new(StringArray::from(vec!["Andover", "Bolton"])) as ArrayRef),
                ("Score", Arc::new(Float64Array::from(vec![Some(1.5), None])) as ArrayRef),
                ("Rank", Arc::new(Int64Array::from(vec![3, 4])) as ArrayRef),
                ("__index_level_0__", Arc::new(Int64Array::from(vec![0, 1])) as ArrayRef),
            ],
        );

        let ds = load_parquet(&path).unwrap();
        assert_eq!(ds.columns, vec!["TOWN_NAME", "Score", "Rank"]);
        assert_eq!(ds.value(0, "Score"), Some(&CellValue::Float(1.5)));
        assert_eq!(ds.value(1, "Score"), Some(&CellValue::Missing));
        assert_eq!(ds.value(1, "Rank"), Some(&CellValue::Integer(4)));
    }

    #[test]
    fn reads_narrow_ints_dates_and_categories_from_parquet() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("output.parquet");
        let county: DictionaryArray<Int32Type> = vec!["Tolland", "Windham"].into_iter().collect();
        write_parquet(
            &path,
            vec![
                ("Rank", Arc::new(UInt32Array::from(vec![7, 8])) as ArrayRef),
                ("Score", Arc::new(Int16Array::from(vec![Some(3), None])) as ArrayRef),
                ("Surveyed", Arc::new(Date32Array::from(vec![Some(19000), None])) as ArrayRef),
                ("County", Arc::new(county) as ArrayRef),
            ],
        );

        let ds = load_parquet(&path).unwrap();
        assert_eq!(ds.value(0, "Rank"), Some(&CellValue::Integer(7)));
        assert_eq!(ds.value(0, "Score"), Some(&CellValue::Integer(3)));
        assert_eq!(ds.value(1, "Score"), Some(&CellValue::Missing));
        assert_eq!(
            ds.value(0, "Surveyed"),
            Some(&CellValue::Text("2022-01-08".to_string()))
        );
        assert_eq!(ds.value(1, "Surveyed"), Some(&CellValue::Missing));
        assert_eq!(
            ds.value(1, "County"),
            Some(&CellValue::Text("Windham".to_string()))
        );
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(parse_json(r#"{"TOWN_NAME": "Andover"}"#).is_err());
        assert!(parse_json("[1, 2]").is_err());
    }
}
