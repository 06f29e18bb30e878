use std::collections::BTreeSet;

use super::model::{Categorical, EmissionTable};

// ---------------------------------------------------------------------------
// Filter selection: what the user picked in the side panel
// ---------------------------------------------------------------------------

/// One filter dimension: either unrestricted or limited to a value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue<T> {
    #[default]
    All,
    Only(T),
}

impl<T> FilterValue<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, FilterValue::All)
    }

    pub fn as_only(&self) -> Option<&T> {
        match self {
            FilterValue::All => None,
            FilterValue::Only(value) => Some(value),
        }
    }
}

/// Inclusive year interval. `min > max` selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i16,
    pub max: i16,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min: i16::MIN,
            max: i16::MAX,
        }
    }
}

impl YearRange {
    pub fn contains(&self, year: i16) -> bool {
        self.min <= year && year <= self.max
    }
}

/// Conjunction of all active predicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    pub years: YearRange,
    /// `Only` with an empty set selects nothing.
    pub regions: FilterValue<BTreeSet<String>>,
    pub source_type: FilterValue<String>,
    pub pollutant: FilterValue<String>,
}

impl FilterSelection {
    /// Full year range of the table and every dimension unrestricted.
    pub fn unrestricted(table: &EmissionTable) -> Self {
        let years = table
            .year_bounds()
            .map(|(min, max)| YearRange { min, max })
            .unwrap_or_default();
        Self {
            years,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates resolved against the column dictionaries
// ---------------------------------------------------------------------------

/// Label predicate translated to dictionary codes, so rows are tested by
/// indexing instead of comparing strings.
enum CodePredicate {
    Any,
    Mask(Vec<bool>),
}

impl CodePredicate {
    fn resolve<'a>(
        column: &Categorical,
        wanted: FilterValue<impl IntoIterator<Item = &'a str>>,
    ) -> Self {
        match wanted {
            FilterValue::All => CodePredicate::Any,
            FilterValue::Only(labels) => {
                let mut mask = vec![false; column.cardinality()];
                // Labels absent from the table simply match no row.
                for code in labels.into_iter().filter_map(|l| column.code_of(l)) {
                    mask[code as usize] = true;
                }
                CodePredicate::Mask(mask)
            }
        }
    }

    fn matches(&self, code: u32) -> bool {
        match self {
            CodePredicate::Any => true,
            CodePredicate::Mask(mask) => mask[code as usize],
        }
    }
}

// ---------------------------------------------------------------------------
// FilteredView – rows of the shared table that pass the selection
// ---------------------------------------------------------------------------

/// A borrowed subset of the table, identified by row indices in ascending
/// order. The table itself is never modified.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a EmissionTable,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Every row of the table.
    pub fn all(table: &'a EmissionTable) -> Self {
        Self {
            table,
            rows: (0..table.len()).collect(),
        }
    }

    pub fn table(&self) -> &'a EmissionTable {
        self.table
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Return the rows that pass every active predicate.
///
/// A row passes when:
/// * its year lies inside `selection.years` (both ends inclusive)
/// * `regions` is `All`, or the row's region is in the selected set
/// * `source_type` / `pollutant` are `All`, or equal the row's value
pub fn apply<'a>(table: &'a EmissionTable, selection: &FilterSelection) -> FilteredView<'a> {
    let regions = CodePredicate::resolve(
        &table.region,
        match &selection.regions {
            FilterValue::All => FilterValue::All,
            FilterValue::Only(set) => FilterValue::Only(set.iter().map(String::as_str)),
        },
    );
    let source_type = CodePredicate::resolve(
        &table.source_type,
        match &selection.source_type {
            FilterValue::All => FilterValue::All,
            FilterValue::Only(label) => FilterValue::Only([label.as_str()]),
        },
    );
    let pollutant = CodePredicate::resolve(
        &table.pollutant,
        match &selection.pollutant {
            FilterValue::All => FilterValue::All,
            FilterValue::Only(label) => FilterValue::Only([label.as_str()]),
        },
    );

    let rows = (0..table.len())
        .filter(|&row| {
            selection.years.contains(table.year[row])
                && regions.matches(table.region.code(row))
                && source_type.matches(table.source_type.code(row))
                && pollutant.matches(table.pollutant.code(row))
        })
        .collect();

    FilteredView { table, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{record, sample_table};

    fn regions(names: &[&str]) -> FilterValue<BTreeSet<String>> {
        FilterValue::Only(names.iter().map(|s| s.to_string()).collect())
    }

    fn wider_table() -> EmissionTable {
        EmissionTable::from_records(&[
            record(2019, "A", "X", 1, "wood", "PM", 1.0),
            record(2020, "A", "X", 1, "wood", "NOx", 2.0),
            record(2021, "B", "Y", 2, "fire", "PM", 3.0),
            record(2022, "C", "Z", 3, "fire", "CO", 4.0),
            record(2023, "C", "Z", 3, "wood", "PM", 5.0),
            record(2023, "ALL", "W", 4, "wood", "PM", 6.0),
        ])
    }

    fn selections(table: &EmissionTable) -> Vec<FilterSelection> {
        let base = FilterSelection::unrestricted(table);
        vec![
            base.clone(),
            FilterSelection {
                years: YearRange {
                    min: 2020,
                    max: 2022,
                },
                ..base.clone()
            },
            FilterSelection {
                regions: regions(&["A", "C"]),
                ..base.clone()
            },
            FilterSelection {
                source_type: FilterValue::Only("wood".into()),
                pollutant: FilterValue::Only("PM".into()),
                ..base.clone()
            },
            FilterSelection {
                years: YearRange {
                    min: 2023,
                    max: 2023,
                },
                regions: regions(&["C"]),
                source_type: FilterValue::Only("wood".into()),
                pollutant: FilterValue::All,
            },
        ]
    }

    #[test]
    fn year_range_is_inclusive() {
        let table = sample_table();
        let selection = FilterSelection {
            years: YearRange {
                min: 2020,
                max: 2020,
            },
            ..FilterSelection::default()
        };
        let view = apply(&table, &selection);
        let tonnage: Vec<f32> = view.rows().iter().map(|&r| table.tonnage[r]).collect();
        assert_eq!(tonnage, vec![10.0, 3.0]);
    }

    #[test]
    fn every_result_row_satisfies_the_selection() {
        let table = wider_table();
        for selection in selections(&table) {
            let view = apply(&table, &selection);
            assert!(view.len() <= table.len());
            for &row in view.rows() {
                let rec = table.record(row);
                assert!(selection.years.contains(rec.year));
                if let Some(set) = selection.regions.as_only() {
                    assert!(set.contains(&rec.region));
                }
                if let Some(source) = selection.source_type.as_only() {
                    assert_eq!(&rec.source_type, source);
                }
                if let Some(pollutant) = selection.pollutant.as_only() {
                    assert_eq!(&rec.pollutant, pollutant);
                }
            }
        }
    }

    #[test]
    fn filtering_is_idempotent() {
        let table = wider_table();
        for selection in selections(&table) {
            let once = apply(&table, &selection);
            let subset = EmissionTable::from_records(
                &once.rows().iter().map(|&r| table.record(r)).collect::<Vec<_>>(),
            );
            let twice = apply(&subset, &selection);
            assert_eq!(twice.len(), once.len());
            assert_eq!(twice.rows(), FilteredView::all(&subset).rows());
        }
    }

    #[test]
    fn all_is_the_same_as_no_predicate() {
        let table = wider_table();
        let unrestricted = apply(&table, &FilterSelection::unrestricted(&table));
        assert_eq!(unrestricted.rows(), FilteredView::all(&table).rows());

        let wood = FilterSelection {
            source_type: FilterValue::Only("wood".into()),
            ..FilterSelection::unrestricted(&table)
        };
        let with_all_regions = FilterSelection {
            regions: FilterValue::All,
            ..wood.clone()
        };
        assert_eq!(
            apply(&table, &wood).rows(),
            apply(&table, &with_all_regions).rows()
        );
    }

    #[test]
    fn region_literally_named_all_is_not_the_sentinel() {
        let table = wider_table();
        let selection = FilterSelection {
            regions: regions(&["ALL"]),
            ..FilterSelection::unrestricted(&table)
        };
        assert_eq!(apply(&table, &selection).rows(), &[5]);
    }

    #[test]
    fn empty_region_selection_yields_nothing() {
        let table = wider_table();
        let selection = FilterSelection {
            regions: FilterValue::Only(BTreeSet::new()),
            ..FilterSelection::unrestricted(&table)
        };
        assert!(apply(&table, &selection).is_empty());
    }

    #[test]
    fn unknown_label_or_inverted_range_yields_nothing() {
        let table = wider_table();
        let unknown = FilterSelection {
            pollutant: FilterValue::Only("SO2".into()),
            ..FilterSelection::unrestricted(&table)
        };
        assert!(apply(&table, &unknown).is_empty());

        let inverted = FilterSelection {
            years: YearRange {
                min: 2022,
                max: 2020,
            },
            ..FilterSelection::unrestricted(&table)
        };
        assert!(apply(&table, &inverted).is_empty());
    }

    #[test]
    fn filtering_leaves_the_table_untouched() {
        let table = wider_table();
        let before = table.clone();
        let _ = apply(&table, &selections(&table)[4]);
        assert_eq!(table, before);
    }
}
