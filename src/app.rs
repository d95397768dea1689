use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct AtlasApp {
    pub state: AppState,
}

impl Default for AtlasApp {
    fn default() -> Self {
        Self {
            state: AppState::default(),
        }
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
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

        // ---- Bottom panel: rubric totals and exports ----
        egui::TopBottomPanel::bottom("summary_panel")
            .resizable(false)
            .show(ctx, |ui| {
                panels::summary_panel(ui, &mut self.state);
            });

        // ---- Central panel: cluster map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::cluster_map(ui, &self.state);
        });
    }
}
