use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::boundary::BoundarySet;
use super::filter::FilteredView;
use super::model::Categorical;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Grouping key paired with summed tonnage.
pub type Series<K> = Vec<(K, f64)>;

/// Total for one commune, joined with its boundary name when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTotal {
    pub commune_id: i32,
    /// `commune_id` as text, the key into the boundary features.
    pub code: String,
    pub name: Option<String>,
    pub tonnage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearSourceTotal {
    pub year: i16,
    pub source_type: String,
    pub tonnage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub total_tonnage: f64,
    pub record_count: usize,
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------
//
// Cells are f32; every sum accumulates in f64. NaN cells are not skipped and
// make their group's sum NaN.

pub fn summarize(view: &FilteredView<'_>) -> Summary {
    let tonnage = &view.table().tonnage;
    Summary {
        total_tonnage: view.rows().iter().map(|&r| f64::from(tonnage[r])).sum(),
        record_count: view.len(),
    }
}

/// Sum per `commune_id`, ascending by id, left-joined to the boundary names.
pub fn by_unit(view: &FilteredView<'_>, boundaries: &BoundarySet) -> Vec<UnitTotal> {
    let table = view.table();
    let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
    for &row in view.rows() {
        *sums.entry(table.commune_id[row]).or_insert(0.0) += f64::from(table.tonnage[row]);
    }

    sums.into_iter()
        .map(|(commune_id, tonnage)| {
            let code = commune_id.to_string();
            let name = boundaries.name_for(&code).map(str::to_owned);
            UnitTotal {
                commune_id,
                code,
                name,
                tonnage,
            }
        })
        .collect()
}

/// Sum per region, largest first.
pub fn by_region(view: &FilteredView<'_>) -> Series<String> {
    let mut series = sum_by_label(view, &view.table().region);
    series.sort_by(descending);
    series
}

/// Sum per commune name, keeping the `n` largest, largest first.
pub fn top_communes(view: &FilteredView<'_>, n: usize) -> Series<String> {
    let mut series = sum_by_label(view, &view.table().commune);
    series.sort_by(descending);
    series.truncate(n);
    series
}

/// Sum per (year, source type) pair that occurs in the view, ordered by year
/// then source. Pairs with no rows are absent rather than zero.
pub fn by_year_source(view: &FilteredView<'_>) -> Vec<YearSourceTotal> {
    let table = view.table();
    let mut sums: BTreeMap<(i16, &str), f64> = BTreeMap::new();
    for &row in view.rows() {
        let key = (table.year[row], table.source_type.value(row));
        *sums.entry(key).or_insert(0.0) += f64::from(table.tonnage[row]);
    }

    sums.into_iter()
        .map(|((year, source_type), tonnage)| YearSourceTotal {
            year,
            source_type: source_type.to_owned(),
            tonnage,
        })
        .collect()
}

/// Pivot year/source totals into one year-ordered line per source type.
pub fn trend_lines(totals: &[YearSourceTotal]) -> BTreeMap<String, Vec<(i16, f64)>> {
    let mut lines: BTreeMap<String, Vec<(i16, f64)>> = BTreeMap::new();
    for total in totals {
        lines
            .entry(total.source_type.clone())
            .or_default()
            .push((total.year, total.tonnage));
    }
    for points in lines.values_mut() {
        points.sort_by_key(|&(year, _)| year);
    }
    lines
}

// -- helpers --

/// Single pass over the view, one slot per dictionary code. Only labels that
/// occur in the view are returned.
fn sum_by_label(view: &FilteredView<'_>, column: &Categorical) -> Series<String> {
    let tonnage = &view.table().tonnage;
    let mut sums: Vec<Option<f64>> = vec![None; column.cardinality()];
    for &row in view.rows() {
        *sums[column.code(row) as usize].get_or_insert(0.0) += f64::from(tonnage[row]);
    }

    sums.into_iter()
        .enumerate()
        .filter_map(|(code, sum)| Some((column.label(code as u32).to_owned(), sum?)))
        .collect()
}

/// Larger sums first, NaN sums last, equal sums by label.
fn descending(a: &(String, f64), b: &(String, f64)) -> Ordering {
    let by_value = match (a.1.is_nan(), b.1.is_nan()) {
        (false, false) => b.1.total_cmp(&a.1),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    };
    by_value.then_with(|| a.0.cmp(&b.0))
}
