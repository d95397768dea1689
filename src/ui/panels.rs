use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::export;
use crate::data::filter::{cantons_for_province, category_options};
use crate::data::geo::UtmGrid;
use crate::data::model::{Category, Rubric};
use crate::state::AppState;

/// Categories offered as filter combos, in panel order.
const FILTER_CATEGORIES: [Category; 5] = [
    Category::Province,
    Category::Canton,
    Category::Zone,
    Category::EducationLevel,
    Category::ProvisionYear,
];

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    // Snapshot the option lists so widgets below can mutate state. The
    // canton list cascades from the active province.
    let active_province = state
        .criteria
        .categories
        .get(&Category::Province)
        .cloned();
    let option_lists: Vec<(Category, Vec<String>)> = FILTER_CATEGORIES
        .iter()
        .map(|&category| {
            let options = if category == Category::Canton {
                cantons_for_province(dataset, active_province.as_deref())
                    .into_iter()
                    .collect()
            } else {
                category_options(dataset, category)
            };
            (category, options)
        })
        .collect();

    let mut pending_filter: Option<(Category, Option<String>)> = None;
    let mut pending_color: Option<Category> = None;
    let mut identifier_changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Colour-by selector ----
            ui.strong("Color by");
            egui::ComboBox::from_id_salt("color_by")
                .selected_text(state.color_category.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for category in Category::ALL {
                        if ui
                            .selectable_label(state.color_category == category, category.label())
                            .clicked()
                        {
                            pending_color = Some(category);
                        }
                    }
                });
            ui.separator();

            // ---- Identifier substring ----
            ui.strong("AMIE contains");
            if ui
                .text_edit_singleline(&mut state.criteria.identifier)
                .changed()
            {
                identifier_changed = true;
            }
            ui.add_space(4.0);

            // ---- One combo per category ----
            for (category, options) in &option_lists {
                let selected = state.criteria.categories.get(category).cloned();
                ui.strong(category.label());
                egui::ComboBox::from_id_salt(category.label())
                    .selected_text(selected.clone().unwrap_or_else(|| "All".to_string()))
                    .show_ui(ui, |ui: &mut Ui| {
                        if ui.selectable_label(selected.is_none(), "All").clicked() {
                            pending_filter = Some((*category, None));
                        }
                        for option in options {
                            let is_selected = selected.as_deref() == Some(option.as_str());
                            if ui.selectable_label(is_selected, option).clicked() {
                                pending_filter = Some((*category, Some(option.clone())));
                            }
                        }
                    });
                ui.add_space(4.0);
            }

            ui.separator();
            if ui.button("Clear filters").clicked() {
                state.clear_filters();
            }
            ui.add_space(4.0);
            ui.label(format!("Active filters: {}", state.criteria.describe()));
        });

    if let Some(category) = pending_color {
        state.set_color_category(category);
    }
    if let Some((category, value)) = pending_filter {
        state.set_category_filter(category, value);
    } else if identifier_changed {
        state.refilter();
    }
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

        if let Some(dataset) = &state.dataset {
            ui.label(format!(
                "{} institutions loaded, {} visible, {} clusters",
                dataset.len(),
                state.visible_indices.len(),
                state.clusters.len()
            ));
            let report = &dataset.report;
            if report.missing_coordinate > 0 || report.projected > 0 {
                ui.separator();
                ui.label(format!(
                    "{} without coordinate, {} projected",
                    report.missing_coordinate, report.projected
                ));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Bottom panel – rubric totals and exports
// ---------------------------------------------------------------------------

/// Render the rubric totals table and the export buttons.
pub fn summary_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Rubric totals");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
            if ui.button("Export filtered records…").clicked() {
                export_filtered_records(state);
            }
            if ui.button("Export rubric summary…").clicked() {
                export_rubric_summary(state);
            }
            ui.label(format!("Institutions: {}", state.visible_indices.len()));
        });
    });

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::remainder())
        .column(Column::auto().at_least(120.0))
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Rubric");
            });
            header.col(|ui| {
                ui.strong("Total (USD)");
            });
        })
        .body(|mut body| {
            for rubric in Rubric::ALL {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(rubric.label());
                    });
                    row.col(|ui| {
                        ui.label(format_usd(state.summary.rubric_sum(rubric)));
                    });
                });
            }
            body.row(18.0, |mut row| {
                row.col(|ui| {
                    ui.strong("TOTAL");
                });
                row.col(|ui| {
                    ui.strong(format_usd(state.summary.total()));
                });
            });
        });
}

/// `1234567.5` → `$1,234,567.50`.
pub fn format_usd(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();
    format!("{sign}${grouped}.{:02}", cents % 100)
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open institution data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.loading = true;
        match crate::data::loader::load_file(&path, &state.geo_options, &UtmGrid) {
            Ok(dataset) => {
                let report = dataset.report;
                log::info!(
                    "Loaded {} institutions ({} without coordinate, {} projected, {} bad amounts)",
                    dataset.len(),
                    report.missing_coordinate,
                    report.projected,
                    report.bad_amounts
                );
                state.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
                state.loading = false;
            }
        }
    }
}

fn export_rubric_summary(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export rubric summary")
        .set_file_name("rubros_c2_filtrado.csv")
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    let rows = export::summary_rows(&state.summary);
    let text = export::rubric_summary_csv(&rows);
    match std::fs::write(&path, text) {
        Ok(()) => {
            log::info!("Wrote rubric summary to {}", path.display());
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to write rubric summary: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}

fn export_filtered_records(state: &mut AppState) {
    let Some(dataset) = &state.dataset else {
        return;
    };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export filtered records")
        .set_file_name("export_filtrado.csv")
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    let result = std::fs::File::create(&path)
        .map_err(anyhow::Error::from)
        .and_then(|file| export::write_filtered_csv(file, dataset, &state.visible_indices));
    match result {
        Ok(()) => {
            log::info!(
                "Wrote {} filtered records to {}",
                state.visible_indices.len(),
                path.display()
            );
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to write filtered records: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

// ---------------------------------------------------------------------------
