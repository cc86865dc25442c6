use std::f64::consts::TAU;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};

use crate::data::filter::FilteredView;
use crate::data::model::CLUSTER_LABELS;
use crate::data::summary::{
    key_feature_distributions, lap_time_by_cluster, radar_chart, FiveNumber, RADAR_RANGE,
};
use crate::data::telemetry::TelemetryTrace;
use crate::state::AppState;

const PLOT_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// PCA scatter
// ---------------------------------------------------------------------------

/// Driver-race pairs in the global PC1/PC2 space, coloured by cluster.
pub fn pca_scatter(ui: &mut Ui, state: &AppState, view: &FilteredView<'_>) {
    let projection = match &view.snapshot.projection {
        Ok(p) => p,
        Err(e) => {
            ui.label(RichText::new(format!("PCA unavailable: {e}")).color(Color32::RED));
            return;
        }
    };
    let [r1, r2] = projection.axes.explained_variance_ratio;

    Plot::new("pca_scatter")
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label(format!("PC1 ({:.1}%)", r1 * 100.0))
        .y_axis_label(format!("PC2 ({:.1}%)", r2 * 100.0))
        .show(ui, |plot_ui| {
            for (code, name) in CLUSTER_LABELS {
                let points: PlotPoints = view
                    .projected_points()
                    .filter(|p| p.id.cluster == code)
                    .map(|p| [p.pc1, p.pc2])
                    .collect();
                plot_ui.points(
                    Points::new(points)
                        .radius(5.0)
                        .color(state.cluster_colors.color_for(name))
                        .name(name),
                );
            }
        });

    // Hover text is limited in egui_plot; list the points underneath instead.
    ui.collapsing("Points", |ui: &mut Ui| {
        for p in view.projected_points() {
            ui.label(format!(
                "{} | {} | lap {:.2}s | ({:.2}, {:.2})",
                p.id.key,
                p.id.cluster_name(),
                p.id.lap_time.seconds(),
                p.pc1,
                p.pc2
            ));
        }
    });
}

// ---------------------------------------------------------------------------
// Radar chart
// ---------------------------------------------------------------------------

/// Position of feature `i` of `n` at `radius` on a polar grid, first axis up.
fn polar(i: usize, n: usize, radius: f64) -> [f64; 2] {
    let angle = TAU * i as f64 / n as f64;
    [radius * angle.sin(), radius * angle.cos()]
}

fn closed_ring(n: usize, radius_of: impl Fn(usize) -> f64) -> Vec<[f64; 2]> {
    (0..=n).map(|i| polar(i % n, n, radius_of(i % n))).collect()
}

pub fn radar(ui: &mut Ui, state: &AppState, view: &FilteredView<'_>) {
    let chart = radar_chart(view);
    let n = chart.features.len();
    if n < 3 {
        ui.label("Radar chart needs at least three of its features in the data.");
        return;
    }

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (i, feature) in chart.features.iter().enumerate() {
            ui.label(RichText::new(format!("axis {}: {feature}", i + 1)).small());
        }
    });

    Plot::new("radar")
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            for step in 1..=2 {
                let r = RADAR_RANGE * step as f64 / 2.0;
                plot_ui.line(Line::new(closed_ring(n, |_| r)).color(Color32::DARK_GRAY).width(0.5));
            }
            for i in 0..n {
                let spoke = vec![[0.0, 0.0], polar(i, n, RADAR_RANGE)];
                plot_ui.line(Line::new(spoke).color(Color32::DARK_GRAY).width(0.5));
            }

            for profile in &chart.profiles {
                let ring = closed_ring(n, |i| profile.values[i]);
                plot_ui.line(
                    Line::new(ring)
                        .color(state.driver_colors.color_for(&profile.key.driver))
                        .width(1.5)
                        .name(profile.key.to_string()),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Key features and lap times
// ---------------------------------------------------------------------------

fn spread(s: &FiveNumber) -> BoxSpread {
    BoxSpread::new(s.min, s.q1, s.median, s.q3, s.max)
}

/// One box per (race, driver) for each key feature.
pub fn key_features(ui: &mut Ui, state: &AppState, view: &FilteredView<'_>) {
    for dist in key_feature_distributions(view) {
        ui.label(RichText::new(dist.feature).strong());
        Plot::new(("key_feature", dist.feature))
            .legend(Legend::default())
            .height(PLOT_HEIGHT * 0.6)
            .x_axis_label("race / driver")
            .show(ui, |plot_ui| {
                for (i, ((race, driver), values)) in dist.groups.iter().enumerate() {
                    let Some(summary) = FiveNumber::of(values.clone()) else {
                        continue;
                    };
                    let color = state.driver_colors.color_for(driver);
                    let elem = BoxElem::new(i as f64, spread(&summary))
                        .name(format!("{driver}, {race}"))
                        .fill(color.linear_multiply(0.3))
                        .stroke((1.0, color))
                        .box_width(0.6);
                    plot_ui.box_plot(BoxPlot::new(vec![elem]).name(driver));
                }
            });
    }
}

/// Synthetic lap time distribution per cluster.
pub fn lap_times(ui: &mut Ui, state: &AppState, view: &FilteredView<'_>) {
    ui.label(
        RichText::new("Lap times are synthetic (seeded normal draw), not measured.")
            .italics()
            .small(),
    );
    Plot::new("lap_times")
        .legend(Legend::default())
        .height(PLOT_HEIGHT * 0.6)
        .y_axis_label("lap time (s)")
        .show(ui, |plot_ui| {
            for (code, summary) in lap_time_by_cluster(view) {
                let color = state.cluster_colors.color_for(code.label());
                let elem = BoxElem::new(code.code() as f64, spread(&summary))
                    .fill(color.linear_multiply(0.3))
                    .stroke((1.0, color))
                    .box_width(0.5);
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(code.label()));
            }
        });
}

// ---------------------------------------------------------------------------
// Telemetry traces
// ---------------------------------------------------------------------------

/// Speed, throttle and brake over distance, one plot per channel.
pub fn telemetry_traces(ui: &mut Ui, state: &AppState, traces: &[TelemetryTrace]) {
    for channel in ["Speed", "Throttle", "Brake"] {
        ui.label(RichText::new(channel).strong());
        Plot::new(("telemetry", channel))
            .legend(Legend::default())
            .height(PLOT_HEIGHT * 0.5)
            .x_axis_label("Distance")
            .show(ui, |plot_ui| {
                for trace in traces {
                    let points: PlotPoints = trace
                        .distance
                        .iter()
                        .zip(channel_values(trace, channel))
                        .map(|(&d, &v)| [d, v])
                        .collect();
                    plot_ui.line(
                        Line::new(points)
                            .color(state.driver_colors.color_for(&trace.key.driver))
                            .width(1.2)
                            .name(trace.key.to_string()),
                    );
                }
            });
    }
}

fn channel_values<'a>(trace: &'a TelemetryTrace, channel: &str) -> &'a [f64] {
    match channel {
        "Speed" => &trace.speed,
        "Throttle" => &trace.throttle,
        _ => &trace.brake,
    }
}
