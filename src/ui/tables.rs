use eframe::egui::{Id, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::filter::FilteredView;
use crate::data::model::MergedRow;
use crate::data::summary::{cluster_pivot, ClusterPivot};
use crate::data::telemetry::DrsUsage;

const ROW_HEIGHT: f32 = 18.0;
const HEADER_HEIGHT: f32 = 20.0;
const MAX_TABLE_HEIGHT: f32 = 260.0;

/// Shared table scaffold: striped, resizable, with a bold header row.
fn table(ui: &mut Ui, headers: &[String], body: impl FnOnce(egui_extras::TableBody<'_>)) {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(MAX_TABLE_HEIGHT)
        .columns(Column::auto().at_least(60.0), headers.len())
        .header(HEADER_HEIGHT, |mut header| {
            for h in headers {
                header.col(|ui: &mut Ui| {
                    ui.strong(h);
                });
            }
        })
        .body(body);
}

/// Driver × Race grid of cluster labels.
pub fn pivot_table(ui: &mut Ui, view: &FilteredView<'_>) {
    let pivot = cluster_pivot(view);
    if pivot.drivers.is_empty() {
        ui.label("No data available for the selected filters.");
        return;
    }

    let headers: Vec<String> = std::iter::once("Driver".to_string())
        .chain(pivot.races.iter().cloned())
        .collect();
    ui.push_id(Id::new("pivot_table"), |ui: &mut Ui| {
        table(ui, &headers, |body| {
            body.rows(ROW_HEIGHT, pivot.drivers.len(), |mut row| {
                let d = row.index();
                row.col(|ui: &mut Ui| {
                    ui.label(&pivot.drivers[d]);
                });
                for r in 0..pivot.races.len() {
                    row.col(|ui: &mut Ui| {
                        let label = pivot.label(d, r);
                        if label == ClusterPivot::MISSING {
                            ui.weak(label);
                        } else {
                            ui.label(label);
                        }
                    });
                }
            });
        });
    });
}

/// Selected rows of the merged dataset with raw or standardized features.
pub fn feature_table(ui: &mut Ui, view: &FilteredView<'_>, scaled: bool) {
    let features = view.snapshot.merged.features.names();
    let headers: Vec<String> = ["Driver", "Race", "Cluster", "LapTime"]
        .iter()
        .map(|h| h.to_string())
        .chain(features.iter().cloned())
        .collect();
    let rows: Vec<(&MergedRow, Vec<f64>)> = if scaled {
        view.scaled_rows().collect()
    } else {
        view.merged_rows().map(|r| (r, r.features.clone())).collect()
    };

    ui.push_id(Id::new("feature_table"), |ui: &mut Ui| {
        table(ui, &headers, |body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let (r, values) = &rows[row.index()];
                row.col(|ui: &mut Ui| {
                    ui.label(&r.id.key.driver);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&r.id.key.race);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(r.id.cluster_name());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(format!("{:.2}", r.id.lap_time.seconds()));
                });
                for value in values {
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{value:.3}"));
                    });
                }
            });
        });
    });
}

/// Raw telemetry samples of the selection.
pub fn telemetry_table(ui: &mut Ui, view: &FilteredView<'_>) {
    let headers: Vec<String> = [
        "Driver", "Race", "LapNumber", "Distance", "Speed", "Throttle", "Brake", "RPM", "DRS",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    let samples: Vec<_> = view.telemetry_samples().collect();
    let optional = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));

    ui.push_id(Id::new("telemetry_table"), |ui: &mut Ui| {
        table(ui, &headers, |body| {
            body.rows(ROW_HEIGHT, samples.len(), |mut row| {
                let s = samples[row.index()];
                let cells = [
                    s.key.driver.clone(),
                    s.key.race.clone(),
                    optional(s.lap_number),
                    format!("{:.1}", s.distance),
                    format!("{:.1}", s.speed),
                    format!("{:.1}", s.throttle),
                    format!("{:.0}", s.brake),
                    optional(s.rpm),
                    optional(s.drs),
                ];
                for cell in cells {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell);
                    });
                }
            });
        });
    });
}

/// DRS readings and activity share per (Driver, Race).
pub fn drs_table(ui: &mut Ui, usage: &[DrsUsage]) {
    if usage.iter().all(|u| u.distinct_values.is_empty()) {
        ui.label(RichText::new("No DRS readings in the selected telemetry.").italics());
        return;
    }
    let headers: Vec<String> = ["Driver", "Race", "Distinct values", "Active", "Usage"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    ui.push_id(Id::new("drs_table"), |ui: &mut Ui| {
        table(ui, &headers, |body| {
            body.rows(ROW_HEIGHT, usage.len(), |mut row| {
                let u = &usage[row.index()];
                let distinct = u
                    .distinct_values
                    .iter()
                    .map(|v| format!("{v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let cells = [
                    u.key.driver.clone(),
                    u.key.race.clone(),
                    distinct,
                    format!("{}/{}", u.active_samples, u.total_samples),
                    u.usage_pct
                        .map_or_else(|| "-".to_string(), |p| format!("{p:.1}%")),
                ];
                for cell in cells {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell);
                    });
                }
            });
        });
    });
}
