use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::FilterValue;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let choices = match &state.loaded {
        Some(loaded) => loaded.choices.clone(),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Year range ----
            ui.strong("Years");
            let (lo, hi) = choices.years;
            let years = state.selection.years;
            let mut from = years.min.clamp(lo, hi);
            let mut to = years.max.clamp(lo, hi);
            ui.add(egui::Slider::new(&mut from, lo..=hi).text("from"));
            ui.add(egui::Slider::new(&mut to, lo..=hi).text("to"));
            // Whichever handle moved drags the other one along.
            if from > to {
                if from != years.min {
                    to = from;
                } else {
                    from = to;
                }
            }
            state.set_years(from, to);
            ui.separator();

            // ---- Regions (multi-select) ----
            let n_total = choices.regions.len();
            let n_selected = match state.selection.regions.as_only() {
                None => n_total,
                Some(set) => set.len(),
            };
            egui::CollapsingHeader::new(
                RichText::new(format!("Regions  ({n_selected}/{n_total})")).strong(),
            )
            .id_salt("regions")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    let mut all = state.selection.regions.is_all();
                    if ui.checkbox(&mut all, "All").changed() {
                        if all {
                            state.select_all_regions();
                        } else {
                            state.select_no_regions();
                        }
                    }
                    if ui.small_button("None").clicked() {
                        state.select_no_regions();
                    }
                });

                for region in &choices.regions {
                    let mut checked = state.region_selected(region);
                    if ui.checkbox(&mut checked, region).changed() {
                        state.toggle_region(region);
                    }
                }
            });
            ui.separator();

            // ---- Source type / pollutant (single choice) ----
            ui.strong("Source type");
            if let Some(value) = single_choice(
                ui,
                "source_type",
                &state.selection.source_type,
                &choices.source_types,
            ) {
                state.set_source_type(value);
            }
            ui.add_space(6.0);

            ui.strong("Pollutant");
            if let Some(value) = single_choice(
                ui,
                "pollutant",
                &state.selection.pollutant,
                &choices.pollutants,
            ) {
                state.set_pollutant(value);
            }
        });
}

/// Combo box with an "All" entry ahead of the options. Returns the new
/// value when the user picked one.
fn single_choice(
    ui: &mut Ui,
    id: &str,
    current: &FilterValue<String>,
    options: &[String],
) -> Option<FilterValue<String>> {
    let mut picked = None;
    let selected_text = match current {
        FilterValue::All => "All",
        FilterValue::Only(value) => value.as_str(),
    };
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected_text)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            if ui.selectable_label(current.is_all(), "All").clicked() {
                picked = Some(FilterValue::All);
            }
            for option in options {
                let is_current = current.as_only() == Some(option);
                if ui.selectable_label(is_current, option).clicked() {
                    picked = Some(FilterValue::Only(option.clone()));
                }
            }
        });
    picked
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Title, record counts and the tab switcher.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading(RichText::new("Emissions Atlas").color(Color32::from_rgb(26, 82, 118)));
        ui.separator();

        ui.selectable_value(&mut state.tab, Tab::Map, "Emissions map");
        ui.selectable_value(&mut state.tab, Tab::Zones, "Zone breakdown");
        ui.selectable_value(&mut state.tab, Tab::Trends, "Annual trends");

        ui.separator();

        if let Some(loaded) = &state.loaded {
            ui.label(format!(
                "{} records loaded, {} match the filters",
                loaded.table.len(),
                state.dashboard.summary.record_count
            ));
        }

        ui.with_layout(
            egui::Layout::right_to_left(egui::Align::Center),
            |ui: &mut Ui| {
                ui.hyperlink_to(format!("Source: {}", state.source.label), &state.source.url);
            },
        );
    });
}

// ---------------------------------------------------------------------------
// Halt screen
// ---------------------------------------------------------------------------

/// Shown instead of the dashboard when an input could not be loaded.
pub fn error_screen(ui: &mut Ui, message: &str) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(ui.available_height() / 3.0);
        ui.heading("The data needed for the dashboard could not be loaded.");
        ui.add_space(8.0);
        ui.label(RichText::new(message).color(Color32::RED));
    });
}
