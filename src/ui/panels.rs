use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – feature selection and mesh controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Features");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => ds,
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    // Clone what we need so we can mutate state inside the closures.
    let numeric: Vec<String> = dataset
        .numeric_column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let all_columns: Vec<String> = dataset
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("X axis");
            let current = state.x_column.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("x_column")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &numeric {
                        if ui.selectable_label(current == *col, col).clicked() {
                            state.set_x_column(col.clone());
                        }
                    }
                });

            ui.strong("Y axis");
            let current = state.y_column.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("y_column")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &numeric {
                        if ui.selectable_label(current == *col, col).clicked() {
                            state.set_y_column(col.clone());
                        }
                    }
                });

            ui.strong("Class");
            let current = state.class_column.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("class_column")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &all_columns {
                        if ui.selectable_label(current == *col, col).clicked() {
                            state.set_class_column(col.clone());
                        }
                    }
                });
            ui.separator();

            // ---- Mesh controls ----
            ui.strong("Mesh");
            let mut changed = ui
                .checkbox(&mut state.shade_regions, "Shade nearest-neighbour regions")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut state.step_size, 1e-3..=100.0)
                        .logarithmic(true)
                        .text("step"),
                )
                .changed();
            if state.scene.mesh_points > 0 {
                ui.label(format!("{} mesh points", state.scene.mesh_points));
            }
            if changed {
                state.rebuild_scene();
            }
            ui.separator();

            // ---- Legend ----
            if let Some(cm) = &state.color_map {
                ui.strong(format!("{}: {} classes", cm.column, cm.len()));
                for label in state.scene.samples.keys() {
                    ui.label(RichText::new(label.to_string()).color(cm.color_for(label)));
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label("Dataset");
        ui.add(egui::TextEdit::singleline(&mut state.dataset_name).desired_width(160.0));
        if ui.button("Fetch").clicked() {
            state.fetch_dataset(false);
        }
        if ui
            .button("Reload")
            .on_hover_text("Download again even if cached")
            .clicked()
        {
            state.fetch_dataset(true);
        }

        ui.separator();

        if let Some(ds) = &state.dataset {
            let (rows, cols) = ds.shape();
            ui.label(format!("{rows} rows × {cols} columns"));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match isl_toolkit::data::loader::load_file(&path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows with columns {:?}",
                    dataset.n_rows(),
                    dataset.column_names()
                );
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    state.dataset_name = name.to_string();
                }
                state.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
