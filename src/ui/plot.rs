use eframe::egui::{Color32, Ui};
use egui_plot::{MarkerShape, Plot, PlotPoints, Points};

use crate::data::model::UNSPECIFIED;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Cluster map (central panel)
// ---------------------------------------------------------------------------

/// Render the spatial clusters as a coordinate scatter. One point per
/// cluster, radius scaled by member count, coloured by the dominant value
/// of the active colour category.
pub fn cluster_map(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view institutions  (File → Open…)");
        });
        return;
    }

    Plot::new("cluster_map")
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for cluster in &state.clusters {
                let dominant = cluster
                    .frequencies
                    .get(&state.color_category)
                    .and_then(|table| {
                        table
                            .iter()
                            .filter(|(value, _)| value.as_str() != UNSPECIFIED)
                            .max_by_key(|(_, count)| *count)
                            .map(|(value, _)| value.as_str())
                    });

                let color = match &state.colors {
                    Some(colors) => colors.color_for(dominant),
                    None => Color32::LIGHT_BLUE,
                };

                // Grow slowly with membership so dense sites stay readable.
                let radius = 3.0 + (cluster.members as f32).sqrt().min(9.0);

                let label = cluster
                    .names
                    .first()
                    .cloned()
                    .unwrap_or_else(|| {
                        format!("{:.4}, {:.4}", cluster.latitude, cluster.longitude)
                    });

                let points = Points::new(PlotPoints::from(vec![[
                    cluster.longitude,
                    cluster.latitude,
                ]]))
                .shape(MarkerShape::Circle)
                .filled(true)
                .radius(radius)
                .color(color)
                .name(format!("{label} ({})", cluster.members));

                plot_ui.points(points);
            }
        });
}
