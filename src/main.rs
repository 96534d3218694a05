// src/main.rs
mod app;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use tree_lights::Config;

#[derive(Parser, Debug)]
#[command(name = "tree_lights", about = "Gesture controlled particle tree")]
struct Args {
    /// Settings file; defaults to config.json in the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => Config::load(),
    };

    #[cfg(feature = "camera")]
    match tree_lights::camera::list_cameras() {
        Ok(cameras) => {
            for (i, name) in cameras.iter().enumerate() {
                tracing::info!(index = i, %name, "camera found");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to query cameras"),
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([800.0, 600.0]),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        "Tree Lights",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(app::TreeLightsApp::new(cc, config))
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to run application: {}", e))
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.panel_fill = egui::Color32::from_rgb(14, 18, 26);
    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(24, 30, 40);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(36, 44, 58);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(48, 58, 76);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(200, 150, 60);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}
