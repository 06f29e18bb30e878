use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, Points};

use crate::state::{AppState, Dashboard};

const BAR_COLOR: Color32 = Color32::from_rgb(31, 97, 141);

// ---------------------------------------------------------------------------
// Zones tab: metrics and ranking bars
// ---------------------------------------------------------------------------

pub fn zone_breakdown(ui: &mut Ui, state: &AppState) {
    let dashboard = &state.dashboard;
    if dashboard.is_empty() {
        no_data(ui);
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        metric(
            ui,
            "Total emissions (t)",
            &format_thousands(dashboard.summary.total_tonnage),
        );
        ui.add_space(40.0);
        metric(
            ui,
            "Records",
            &format_thousands(dashboard.summary.record_count as f64),
        );
    });
    ui.separator();

    let chart_height = ((ui.available_height() - 80.0) / 2.0).max(160.0);

    ui.strong("Emissions by region");
    ranking_bars(ui, "region_bars", &dashboard.regions, chart_height);

    ui.strong(format!("Top {} communes", state.top_n));
    ranking_bars(ui, "commune_bars", &dashboard.top_communes, chart_height);
}

fn metric(ui: &mut Ui, label: &str, value: &str) {
    ui.vertical(|ui: &mut Ui| {
        ui.label(label);
        ui.label(RichText::new(value).size(26.0).strong());
    });
}

/// Horizontal bars for a descending series, largest on top, labelled on
/// the y axis.
fn ranking_bars(ui: &mut Ui, id: &str, series: &[(String, f64)], height: f32) {
    // Indexed by axis position, i.e. smallest first.
    let labels: Vec<String> = series.iter().rev().map(|(label, _)| label.clone()).collect();

    let bars: Vec<Bar> = bar_layout(series)
        .into_iter()
        .map(|(position, label, value)| Bar::new(position, value).name(label).width(0.7))
        .collect();

    Plot::new(id)
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .x_axis_label("Tonnes")
        .y_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            axis_label(&labels, mark.value)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().color(BAR_COLOR));
        });
}

/// (y position, label, value) per bar; the first series entry gets the
/// highest position.
fn bar_layout(series: &[(String, f64)]) -> Vec<(f64, String, f64)> {
    let n = series.len();
    series
        .iter()
        .enumerate()
        .map(|(i, (label, value))| ((n - 1 - i) as f64, label.clone(), *value))
        .collect()
}

/// Category name for an integer axis position; blank between bars.
fn axis_label(labels: &[String], value: f64) -> String {
    if value.fract() != 0.0 || value < 0.0 {
        return String::new();
    }
    let n = labels.len();
    let position = value as usize;
    if position >= n {
        return String::new();
    }
    labels[position].clone()
}

// ---------------------------------------------------------------------------
// Trends tab: one line per source type
// ---------------------------------------------------------------------------

pub fn trend_chart(ui: &mut Ui, state: &AppState) {
    let dashboard: &Dashboard = &state.dashboard;
    if dashboard.is_empty() {
        no_data(ui);
        return;
    }
    let Some(loaded) = &state.loaded else {
        return;
    };

    ui.strong("Emissions by source");
    Plot::new("trend_chart")
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label("Tonnes")
        .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| {
            // One tick per year, no fractional years.
            if mark.value.fract() == 0.0 {
                format!("{}", mark.value as i64)
            } else {
                String::new()
            }
        })
        .show(ui, |plot_ui| {
            for (source, points) in &dashboard.trends {
                let color = loaded.source_colors.color_for(source);
                let coords: Vec<[f64; 2]> = points
                    .iter()
                    .map(|&(year, tonnage)| [f64::from(year), tonnage])
                    .collect();

                plot_ui.line(
                    Line::new(PlotPoints::from(coords.clone()))
                        .name(source)
                        .color(color)
                        .width(2.0),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(coords))
                        .name(source)
                        .color(color)
                        .radius(3.5),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Shared bits
// ---------------------------------------------------------------------------

pub fn no_data(ui: &mut Ui) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.label(
            RichText::new("No data for the current selection.")
                .color(Color32::from_rgb(200, 120, 0))
                .size(18.0),
        );
    });
}

/// `1234567.8` → `"1,234,568"`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0.0 && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}
