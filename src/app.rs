use eframe::egui;

use crate::data::context::AtlasContext;
use crate::state::{AppState, Tab};
use crate::ui::map::MapCanvas;
use crate::ui::{charts, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct EmissionsAtlasApp {
    pub state: AppState,
    map: MapCanvas,
}

impl EmissionsAtlasApp {
    pub fn new(context: &AtlasContext) -> Self {
        Self {
            state: AppState::load(context),
            map: MapCanvas::default(),
        }
    }
}

impl eframe::App for EmissionsAtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Halted: nothing but the error ----
        if let Some(message) = &self.state.fatal {
            egui::CentralPanel::default().show(ctx, |ui| {
                panels::error_screen(ui, message);
            });
            return;
        }

        // ---- Top panel: title, counts, tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        self.state.refresh();

        // ---- Central panel: active tab ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.tab {
            Tab::Map => {
                if self.state.dashboard.is_empty() {
                    charts::no_data(ui);
                } else {
                    self.map.show(ui, &self.state);
                }
            }
            Tab::Zones => charts::zone_breakdown(ui, &self.state),
            Tab::Trends => charts::trend_chart(ui, &self.state),
        });
    }
}
