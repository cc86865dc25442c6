use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::DashboardConfig;
use crate::data::filter::{apply, FilteredView};
use crate::data::summary::{cluster_presence, recommendations};
use crate::data::telemetry::{drs_usage, traces};
use crate::state::AppState;
use crate::ui::{panels, plot, tables};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DriverLensApp {
    pub state: AppState,
}

impl DriverLensApp {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for DriverLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_sources();
        ctx.request_repaint_after(self.state.config.refresh_interval());

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

        // ---- Central panel: dashboard ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = &self.state.fatal_error {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading(RichText::new(err).color(Color32::RED));
                });
                return;
            }
            let Some(snapshot) = self.state.snapshot() else {
                return;
            };
            let view = apply(&snapshot, &self.state.selection);

            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| dashboard(ui, &self.state, &view));
        });
    }
}

fn section(ui: &mut Ui, title: &str) {
    ui.add_space(8.0);
    ui.heading(title);
    ui.separator();
}

fn dashboard(ui: &mut Ui, state: &AppState, view: &FilteredView<'_>) {
    ui.heading("F1 Driver Performance Dashboard (2023 Season)");
    for d in &view.diagnostics {
        ui.label(RichText::new(d.to_string()).color(Color32::YELLOW));
    }
    if view.is_empty() {
        ui.label("No data available for the selected filters.");
    } else {
        section(ui, "Driving Style Clusters (PCA)");
        plot::pca_scatter(ui, state, view);

        section(ui, "Driver Profiles");
        plot::radar(ui, state, view);

        section(ui, "Key Features by Race");
        plot::key_features(ui, state, view);

        section(ui, "Lap Time by Cluster");
        plot::lap_times(ui, state, view);

        section(ui, "Recommendations");
        for (cluster, present) in cluster_presence(view) {
            if !present {
                continue;
            }
            ui.label(
                RichText::new(cluster.to_string())
                    .strong()
                    .color(state.cluster_colors.color_for(cluster.label())),
            );
            for tip in recommendations(cluster) {
                ui.label(format!("• {tip}"));
            }
        }

        section(ui, "Cluster by Driver and Race");
        tables::pivot_table(ui, view);

        section(ui, "Feature Data");
        tables::feature_table(ui, view, state.show_scaled);
    }

    telemetry_section(ui, state, view);
}

fn telemetry_section(ui: &mut Ui, state: &AppState, view: &FilteredView<'_>) {
    if view.snapshot.telemetry.is_empty() {
        ui.add_space(8.0);
        ui.label(RichText::new("Telemetry not available.").italics());
        return;
    }

    egui::CollapsingHeader::new(RichText::new("Telemetry").heading())
        .id_salt("telemetry")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if view.telemetry.is_empty() {
                ui.label("No telemetry for the selected filters.");
                return;
            }
            let selected: Vec<_> = view.telemetry_samples().collect();
            plot::telemetry_traces(ui, state, &traces(selected.iter().copied()));

            ui.label(RichText::new("DRS usage").strong());
            tables::drs_table(ui, &drs_usage(selected.iter().copied()));

            ui.label(RichText::new("Samples").strong());
            tables::telemetry_table(ui, view);
        });
}
