mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::EmissionsAtlasApp;
use config::AtlasConfig;
use data::context::AtlasContext;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Both inputs are read here, once, before the window opens.
    let context = AtlasContext::new(AtlasConfig::default());
    let app = EmissionsAtlasApp::new(&context);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Emissions Atlas",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
