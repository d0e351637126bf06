use super::model::{CellValue, Dataset, INDICATOR_COLUMNS};

/// Replace negative values in the indicator columns with missing cells.
///
/// The source data encodes "not available" as negative sentinels, which
/// would otherwise drag every summary statistic down. Returns the number of
/// cells that were cleared.
pub fn sanitize_indicators(dataset: &mut Dataset) -> usize {
    let cols: Vec<usize> = INDICATOR_COLUMNS
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect();

    let mut cleared = 0;
    for row in &mut dataset.rows {
        for &col in &cols {
            if row[col].as_f64().is_some_and(|v| v < 0.0) {
                row[col] = CellValue::Missing;
                cleared += 1;
            }
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::sample_dataset;

    #[test]
    fn negatives_are_cleared_in_every_indicator() {
        let mut ds = sample_dataset(&[
            ("Andover", "Tolland", -999.0),
            ("Bolton", "Tolland", 4.0),
        ]);
        let cleared = sanitize_indicators(&mut ds);
        assert_eq!(cleared, INDICATOR_COLUMNS.len());

        for column in INDICATOR_COLUMNS {
            assert_eq!(ds.value(0, column), Some(&CellValue::Missing));
            assert_eq!(ds.value(1, column).and_then(CellValue::as_f64), Some(4.0));
        }
    }

    #[test]
    fn zero_and_other_columns_are_kept() {
        let mut ds = sample_dataset(&[("Andover", "Tolland", 0.0)]);
        let id = ds.column_index("OBJECTID").unwrap();
        ds.rows[0][id] = CellValue::Integer(-1);

        assert_eq!(sanitize_indicators(&mut ds), 0);
        assert_eq!(ds.value(0, "Score").and_then(CellValue::as_f64), Some(0.0));
        assert_eq!(ds.value(0, "OBJECTID"), Some(&CellValue::Integer(-1)));
    }

    #[test]
    fn no_negative_indicator_survives() {
        let mut ds = sample_dataset(&[
            ("Andover", "Tolland", -1.0),
            ("Bolton", "Tolland", -0.5),
            ("Canton", "Hartford", 2.0),
        ]);
        sanitize_indicators(&mut ds);
        for column in INDICATOR_COLUMNS {
            let all: Vec<usize> = (0..ds.len()).collect();
            assert!(ds
                .numeric_column(column, &all)
                .into_iter()
                .flatten()
                .all(|v| v >= 0.0));
        }
    }
}
