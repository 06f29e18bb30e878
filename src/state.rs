use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::DataSource;
use crate::data::aggregate::{
    by_region, by_unit, by_year_source, summarize, top_communes, trend_lines, Series, Summary,
    UnitTotal,
};
use crate::data::boundary::BoundarySet;
use crate::data::context::AtlasContext;
use crate::data::filter::{apply, FilterSelection, FilterValue};
use crate::data::model::EmissionTable;

// ---------------------------------------------------------------------------
// Dashboard – everything the three tabs draw, for one selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub summary: Summary,
    pub units: Vec<UnitTotal>,
    pub regions: Series<String>,
    pub top_communes: Series<String>,
    /// Source type → (year, tonnage) points in year order.
    pub trends: BTreeMap<String, Vec<(i16, f64)>>,
}

impl Dashboard {
    pub fn compute(
        table: &EmissionTable,
        boundaries: &BoundarySet,
        selection: &FilterSelection,
        top_n: usize,
    ) -> Self {
        let view = apply(table, selection);
        Self {
            summary: summarize(&view),
            units: by_unit(&view, boundaries),
            regions: by_region(&view),
            top_communes: top_communes(&view, top_n),
            trends: trend_lines(&by_year_source(&view)),
        }
    }

    /// No rows passed the filters.
    pub fn is_empty(&self) -> bool {
        self.summary.record_count == 0
    }
}

// ---------------------------------------------------------------------------
// Control domains – the choices offered by the side panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Choices {
    pub years: (i16, i16),
    pub regions: Vec<String>,
    pub source_types: Vec<String>,
    pub pollutants: Vec<String>,
}

impl Choices {
    fn from_table(table: &EmissionTable) -> Self {
        Self {
            years: table.year_bounds().unwrap_or((0, 0)),
            regions: table.region.sorted_labels(),
            source_types: table.source_type.sorted_labels(),
            pollutants: table.pollutant.sorted_labels(),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Map,
    Zones,
    Trends,
}

/// Inputs that loaded successfully.
pub struct Loaded {
    pub table: Arc<EmissionTable>,
    pub boundaries: Arc<BoundarySet>,
    pub choices: Choices,
    /// Stable colours for the trend lines.
    pub source_colors: ColorMap,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// `None` when a load failed; `fatal` then holds the message.
    pub loaded: Option<Loaded>,
    pub fatal: Option<String>,

    pub selection: FilterSelection,
    pub dashboard: Dashboard,
    pub tab: Tab,
    pub top_n: usize,
    pub source: DataSource,

    /// Bumped every time `dashboard` is recomputed.
    pub generation: u64,
    dirty: bool,
}

impl AppState {
    /// Fetch both inputs from the context. Any failure halts the dashboard;
    /// both loads are always attempted so every problem is reported at once.
    pub fn load(context: &AtlasContext) -> Self {
        let top_n = context.config().top_communes;

        let mut state = match (context.table(), context.boundaries()) {
            (Ok(table), Ok(boundaries)) => Self::ready(table, boundaries, top_n),
            (table, boundaries) => {
                let message = [table.err(), boundaries.err()]
                    .into_iter()
                    .flatten()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                log::error!("Dashboard halted: {message}");
                Self {
                    loaded: None,
                    fatal: Some(message),
                    selection: FilterSelection::default(),
                    dashboard: Dashboard::default(),
                    tab: Tab::default(),
                    top_n,
                    source: DataSource::default(),
                    generation: 0,
                    dirty: false,
                }
            }
        };
        state.source = context.config().source.clone();
        state
    }

    pub fn ready(table: Arc<EmissionTable>, boundaries: Arc<BoundarySet>, top_n: usize) -> Self {
        let choices = Choices::from_table(&table);
        let source_colors = ColorMap::new(&choices.source_types);
        let selection = FilterSelection::unrestricted(&table);
        let mut state = Self {
            loaded: Some(Loaded {
                table,
                boundaries,
                choices,
                source_colors,
            }),
            fatal: None,
            selection,
            dashboard: Dashboard::default(),
            tab: Tab::default(),
            top_n,
            source: DataSource::default(),
            generation: 0,
            dirty: true,
        };
        state.refresh();
        state
    }

    /// Recompute the dashboard if the selection changed since the last call.
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if let Some(loaded) = &self.loaded {
            self.dashboard = Dashboard::compute(
                &loaded.table,
                &loaded.boundaries,
                &self.selection,
                self.top_n,
            );
            self.generation += 1;
            log::debug!(
                "Selection {:?} → {} records",
                self.selection,
                self.dashboard.summary.record_count
            );
        }
    }

    pub fn set_years(&mut self, min: i16, max: i16) {
        if (min, max) != (self.selection.years.min, self.selection.years.max) {
            self.selection.years.min = min;
            self.selection.years.max = max;
            self.dirty = true;
        }
    }

    /// Toggle one region. Leaving `All` keeps every other region selected.
    pub fn toggle_region(&mut self, region: &str) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        let mut selected: BTreeSet<String> = match &self.selection.regions {
            FilterValue::All => loaded.choices.regions.iter().cloned().collect(),
            FilterValue::Only(set) => set.clone(),
        };
        if !selected.remove(region) {
            selected.insert(region.to_owned());
        }
        self.selection.regions = FilterValue::Only(selected);
        self.dirty = true;
    }

    pub fn select_all_regions(&mut self) {
        self.selection.regions = FilterValue::All;
        self.dirty = true;
    }

    pub fn select_no_regions(&mut self) {
        self.selection.regions = FilterValue::Only(BTreeSet::new());
        self.dirty = true;
    }

    pub fn region_selected(&self, region: &str) -> bool {
        match &self.selection.regions {
            FilterValue::All => true,
            FilterValue::Only(set) => set.contains(region),
        }
    }

    pub fn set_source_type(&mut self, value: FilterValue<String>) {
        if self.selection.source_type != value {
            self.selection.source_type = value;
            self.dirty = true;
        }
    }

    pub fn set_pollutant(&mut self, value: FilterValue<String>) {
        if self.selection.pollutant != value {
            self.selection.pollutant = value;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_table;

    fn state() -> AppState {
        AppState::ready(
            Arc::new(sample_table()),
            Arc::new(BoundarySet::default()),
            15,
        )
    }

    #[test]
    fn starts_unrestricted() {
        let state = state();
        assert_eq!(state.generation, 1);
        assert_eq!(state.dashboard.summary.record_count, 3);
        assert_eq!(state.dashboard.summary.total_tonnage, 18.0);
        assert_eq!(state.loaded.as_ref().unwrap().choices.years, (2020, 2021));
    }

    #[test]
    fn recomputes_only_after_a_change() {
        let mut state = state();
        state.refresh();
        assert_eq!(state.generation, 1);

        state.set_years(2020, 2020);
        state.refresh();
        assert_eq!(state.generation, 2);
        assert_eq!(state.dashboard.summary.record_count, 2);

        state.set_years(2020, 2020);
        state.refresh();
        assert_eq!(state.generation, 2);
    }

    #[test]
    fn toggling_out_of_all_keeps_the_rest() {
        let mut state = state();
        state.toggle_region("A");
        state.refresh();
        assert!(!state.region_selected("A"));
        assert!(state.region_selected("B"));
        assert_eq!(state.dashboard.regions, vec![("B".to_string(), 3.0)]);
    }

    #[test]
    fn no_regions_means_no_data() {
        let mut state = state();
        state.select_no_regions();
        state.refresh();
        assert!(state.dashboard.is_empty());

        state.select_all_regions();
        state.refresh();
        assert_eq!(state.dashboard.summary.record_count, 3);
    }

    #[test]
    fn source_filter_narrows_trends() {
        let mut state = state();
        state.set_source_type(FilterValue::Only("fire".into()));
        state.refresh();
        assert_eq!(state.dashboard.trends.len(), 1);
        assert_eq!(state.dashboard.trends["fire"], vec![(2021, 5.0)]);
    }

    #[test]
    fn failed_load_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let context = AtlasContext::new(crate::config::AtlasConfig {
            data_path: dir.path().join("absent.parquet"),
            ..Default::default()
        });
        let state = AppState::load(&context);
        assert!(state.loaded.is_none());
        assert!(state.fatal.unwrap().contains("absent.parquet"));
    }

    #[test]
    fn every_failed_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let context = AtlasContext::new(crate::config::AtlasConfig {
            data_path: dir.path().join("absent.parquet"),
            boundary_path: dir.path().join("absent.geojson"),
            ..Default::default()
        });
        let fatal = AppState::load(&context).fatal.unwrap();
        assert_eq!(fatal.lines().count(), 2);
        assert!(fatal.lines().next().unwrap().contains("absent.parquet"));
        assert!(fatal.lines().nth(1).unwrap().contains("absent.geojson"));
    }

    #[test]
    fn load_keeps_the_configured_credit() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource {
            label: "Local extract".into(),
            url: "https://example.org/extract".into(),
        };
        let context = AtlasContext::new(crate::config::AtlasConfig {
            data_path: dir.path().join("absent.parquet"),
            source: source.clone(),
            ..Default::default()
        });
        assert_eq!(AppState::load(&context).source, source);
        assert!(DataSource::default().label.contains("RETC"));
    }
}
