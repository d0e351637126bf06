use std::collections::BTreeSet;

use super::model::{Dataset, Level};

// ---------------------------------------------------------------------------
// Selection: which units of the chosen level are selected
// ---------------------------------------------------------------------------

/// Label of the synthetic option that stands for every unit.
pub const SELECT_ALL: &str = "Select All";

/// The user's choice of level and units.
///
/// `select_all` is the `Select All` sentinel; while it is set, `units` is
/// ignored and every option counts as selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub level: Level,
    pub units: BTreeSet<String>,
    pub select_all: bool,
}

impl Selection {
    pub fn new(level: Level) -> Self {
        Selection {
            level,
            ..Default::default()
        }
    }

    /// Switch level. Unit names do not carry over between levels.
    pub fn set_level(&mut self, level: Level) {
        if self.level != level {
            *self = Selection::new(level);
        }
    }

    /// Toggle a single unit in the selection.
    pub fn toggle(&mut self, unit: &str) {
        if !self.units.remove(unit) {
            self.units.insert(unit.to_string());
        }
    }

    /// Expand the sentinel against the available options.
    /// Units that are not options are dropped.
    pub fn expand(&self, options: &BTreeSet<String>) -> Vec<String> {
        if self.select_all {
            options.iter().cloned().collect()
        } else {
            self.units.intersection(options).cloned().collect()
        }
    }
}

/// Sorted unit names available at `level`.
pub fn unit_options(dataset: &Dataset, level: Level) -> BTreeSet<String> {
    dataset.unique_values(level.column())
}

/// Return indices of rows whose `level` value is one of `units`, in dataset
/// order. An empty `units` slice selects nothing.
pub fn filtered_indices(dataset: &Dataset, level: Level, units: &[String]) -> Vec<usize> {
    let Some(col) = dataset.column_index(level.column()) else {
        return Vec::new();
    };
    let wanted: BTreeSet<&str> = units.iter().map(String::as_str).collect();

    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let cell = &row[col];
            !cell.is_missing() && wanted.contains(cell.to_field().as_str())
        })
        .map(|(i, _)| i)
        .collect()
}

/// Indices of the rows of a single unit.
pub fn unit_indices(dataset: &Dataset, level: Level, unit: &str) -> Vec<usize> {
    filtered_indices(dataset, level, &[unit.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::sample_dataset;

    fn dataset() -> Dataset {
        sample_dataset(&[
            ("Andover", "Tolland", 1.0),
            ("Bolton", "Tolland", 2.0),
            ("Andover", "Tolland", 3.0),
            ("Canton", "Hartford", 4.0),
            ("New Hartford", "Litchfield", 5.0),
        ])
    }

    #[test]
    fn options_are_sorted_and_unique() {
        let ds = dataset();
        let towns: Vec<_> = unit_options(&ds, Level::Town).into_iter().collect();
        assert_eq!(towns, vec!["Andover", "Bolton", "Canton", "New Hartford"]);
        let counties: Vec<_> = unit_options(&ds, Level::County).into_iter().collect();
        assert_eq!(counties, vec!["Hartford", "Litchfield", "Tolland"]);
    }

    #[test]
    fn select_all_matches_manual_full_selection() {
        let ds = dataset();
        for level in Level::ALL {
            let options = unit_options(&ds, level);

            let mut all = Selection::new(level);
            all.select_all = true;

            let mut manual = Selection::new(level);
            for unit in &options {
                manual.toggle(unit);
            }

            let via_sentinel = filtered_indices(&ds, level, &all.expand(&options));
            let via_manual = filtered_indices(&ds, level, &manual.expand(&options));
            assert_eq!(via_sentinel, via_manual);
            assert_eq!(via_sentinel, (0..ds.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn filters_by_membership_in_dataset_order() {
        let ds = dataset();
        let units = vec!["Andover".to_string(), "Canton".to_string()];
        assert_eq!(filtered_indices(&ds, Level::Town, &units), vec![0, 2, 3]);
        assert_eq!(unit_indices(&ds, Level::County, "Tolland"), vec![0, 1, 2]);
        assert_eq!(unit_indices(&ds, Level::Town, "New Hartford"), vec![4]);
    }

    #[test]
    fn empty_selection_selects_nothing() {
        let ds = dataset();
        let sel = Selection::new(Level::Town);
        let units = sel.expand(&unit_options(&ds, Level::Town));
        assert!(units.is_empty());
        assert!(filtered_indices(&ds, Level::Town, &units).is_empty());
    }

    #[test]
    fn toggle_and_level_change() {
        let mut sel = Selection::new(Level::Town);
        sel.toggle("Andover");
        sel.toggle("Bolton");
        sel.toggle("Andover");
        assert_eq!(sel.units.iter().collect::<Vec<_>>(), vec!["Bolton"]);

        sel.set_level(Level::Town);
        assert_eq!(sel.units.len(), 1);

        sel.select_all = true;
        sel.set_level(Level::County);
        assert_eq!(sel, Selection::new(Level::County));
    }

    #[test]
    fn unknown_units_are_dropped_on_expand() {
        let ds = dataset();
        let mut sel = Selection::new(Level::Town);
        sel.toggle("Atlantis");
        sel.toggle("Bolton");
        assert_eq!(sel.expand(&unit_options(&ds, Level::Town)), vec!["Bolton"]);
    }
}
