use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::{cluster_options, driver_options, race_options};
use crate::data::snapshot::Snapshot;
use crate::state::{AppState, Dimension};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(snapshot) = state.snapshot() else {
        ui.label("No data loaded.");
        return;
    };

    let cluster_labels: Vec<String> = cluster_options()
        .into_iter()
        .enumerate()
        .map(|(code, name)| format!("{name} ({code})"))
        .collect();
    let dimensions = [
        (Dimension::Driver, "Drivers", "drivers", driver_options(&snapshot)),
        (Dimension::Race, "Races", "races", race_options(&snapshot)),
        (Dimension::Cluster, "Clusters", "clusters", cluster_options()),
    ];

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (dim, title, noun, options) in &dimensions {
                filter_group(ui, state, *dim, title, options, &cluster_labels);
                if state.selected(*dim).is_empty() {
                    ui.label(
                        RichText::new(format!("No {noun} selected. Using all available {noun}."))
                            .color(Color32::YELLOW),
                    );
                }
            }

            ui.separator();
            diagnostics_list(ui, &snapshot);
        });
}

fn filter_group(
    ui: &mut Ui,
    state: &mut AppState,
    dim: Dimension,
    title: &str,
    options: &[String],
    cluster_labels: &[String],
) {
    let header_text = format!("{title}  ({}/{})", state.selected(dim).len(), options.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(title)
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(dim, options);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(dim);
                }
            });

            for (i, value) in options.iter().enumerate() {
                let (label, color) = match dim {
                    Dimension::Cluster => (
                        cluster_labels.get(i).cloned().unwrap_or_else(|| value.clone()),
                        Some(state.cluster_colors.color_for(value)),
                    ),
                    Dimension::Driver => (value.clone(), Some(state.driver_colors.color_for(value))),
                    Dimension::Race => (value.clone(), None),
                };
                let mut text = RichText::new(label);
                if let Some(c) = color {
                    text = text.color(c);
                }

                let mut checked = state.selected(dim).contains(value);
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle(dim, value);
                }
            }
        });
}

fn diagnostics_list(ui: &mut Ui, snapshot: &Snapshot) {
    let header = format!("Diagnostics ({})", snapshot.diagnostics.len());
    egui::CollapsingHeader::new(header)
        .id_salt("diagnostics")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if snapshot.diagnostics.is_empty() {
                ui.label("No issues found while loading.");
            }
            for d in &snapshot.diagnostics {
                ui.label(RichText::new(d.to_string()).small());
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
            if ui.button("Open data directory…").clicked() {
                open_dir_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(snapshot) = state.snapshot() {
            ui.label(format!(
                "{} driver-race rows, {} telemetry samples",
                snapshot.merged.len(),
                snapshot.telemetry.len()
            ));
        }

        ui.separator();

        if ui
            .selectable_label(state.show_scaled, "Standardized values")
            .clicked()
        {
            state.show_scaled = !state.show_scaled;
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Directory dialog
// ---------------------------------------------------------------------------

pub fn open_dir_dialog(state: &mut AppState) {
    let dir = rfd::FileDialog::new()
        .set_title("Open driver data directory")
        .set_directory(&state.config.data_dir)
        .pick_folder();

    if let Some(path) = dir {
        log::info!("Switching data directory to {}", path.display());
        state.open_data_dir(path);
    }
}
