use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Plot, PlotPoints, Points};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Scatter plot over the shaded mesh (central panel)
// ---------------------------------------------------------------------------

/// Render samples over their nearest-neighbour decision regions.
pub fn scatter_plot(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Fetch a dataset by name or open a file  (File → Open…)");
        });
        return;
    }

    let color_map = &state.color_map;
    let scene = &state.scene;

    // Mesh dots grow with the panel so they roughly tile it.
    let region_radius = (ui.available_width() / 200.0).clamp(1.0, 4.0);

    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label(state.x_column.clone().unwrap_or_default())
        .y_axis_label(state.y_column.clone().unwrap_or_default())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (label, coords) in &scene.regions {
                let color = color_map
                    .as_ref()
                    .map_or(Color32::from_gray(60), |cm| cm.region_color_for(label));
                let points = Points::new(PlotPoints::from(coords.clone()))
                    .color(color)
                    .radius(region_radius)
                    .filled(true);
                plot_ui.points(points);
            }

            for (label, coords) in &scene.samples {
                let color = color_map
                    .as_ref()
                    .map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(label));
                let points = Points::new(PlotPoints::from(coords.clone()))
                    .name(label.to_string())
                    .color(color)
                    .radius(3.0)
                    .filled(true);
                plot_ui.points(points);
            }
        });
}
