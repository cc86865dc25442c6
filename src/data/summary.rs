//! Small derived views the dashboard renders from a filtered selection.
//! All of them read the snapshot; none refit anything.

use std::collections::{BTreeMap, BTreeSet};

use super::filter::FilteredView;
use super::model::{ClusterCode, DriverRace, CLUSTER_LABELS};

pub const RADAR_FEATURES: [&str; 5] = [
    "Throttle_Rate",
    "Brake_Freq_Per_Km",
    "DRS_Efficiency",
    "High_Throttle_Pct",
    "Avg_Speed_Std",
];

pub const KEY_FEATURES: [&str; 3] = ["Throttle_Rate", "Brake_Freq_Per_Km", "DRS_Efficiency"];

/// Outer radius of the radar chart.
pub const RADAR_RANGE: f64 = 70.0;

// ---------------------------------------------------------------------------
// Radar profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RadarProfile {
    pub key: DriverRace,
    /// One value per `RadarChart::features`, in [0, RADAR_RANGE] for
    /// non-negative inputs.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarChart {
    pub features: Vec<&'static str>,
    pub profiles: Vec<RadarProfile>,
}

/// Radar values: raw / (maximum over the full dataset) × RADAR_RANGE.
/// Profiles are ordered by race, then driver.
pub fn radar_chart(view: &FilteredView<'_>) -> RadarChart {
    let merged = &view.snapshot.merged;
    let features = merged.features.restrict(&RADAR_FEATURES);
    let columns: Vec<usize> = features
        .iter()
        .filter_map(|f| merged.features.position(f))
        .collect();
    let maxima: Vec<f64> = columns
        .iter()
        .map(|&c| {
            merged
                .rows
                .iter()
                .map(|r| r.features[c])
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();

    let mut profiles: Vec<RadarProfile> = view
        .merged_rows()
        .map(|row| RadarProfile {
            key: row.id.key.clone(),
            values: columns
                .iter()
                .zip(&maxima)
                .map(|(&c, &max)| {
                    if max == 0.0 {
                        0.0
                    } else {
                        row.features[c] / max * RADAR_RANGE
                    }
                })
                .collect(),
        })
        .collect();
    profiles.sort_by(|a, b| (&a.key.race, &a.key.driver).cmp(&(&b.key.race, &b.key.driver)));

    RadarChart { features, profiles }
}

// ---------------------------------------------------------------------------
// Key-feature values by race and driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDistribution {
    pub feature: &'static str,
    /// (race, driver) → values of the selected rows.
    pub groups: BTreeMap<(String, String), Vec<f64>>,
}

pub fn key_feature_distributions(view: &FilteredView<'_>) -> Vec<FeatureDistribution> {
    let merged = &view.snapshot.merged;
    merged
        .features
        .restrict(&KEY_FEATURES)
        .into_iter()
        .filter_map(|feature| {
            let c = merged.features.position(feature)?;
            let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
            for row in view.merged_rows() {
                groups
                    .entry((row.id.key.race.clone(), row.id.key.driver.clone()))
                    .or_default()
                    .push(row.features[c]);
            }
            Some(FeatureDistribution { feature, groups })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Synthetic lap time distribution by cluster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumber {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumber {
    /// `None` for an empty sample. Quantiles interpolate linearly between
    /// order statistics.
    pub fn of(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let quantile = |q: f64| {
            let pos = q * (values.len() - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
        };
        Some(Self {
            min: values[0],
            q1: quantile(0.25),
            median: quantile(0.5),
            q3: quantile(0.75),
            max: values[values.len() - 1],
        })
    }
}

/// Five-number summary of the synthetic lap time per cluster present in
/// the selection, in cluster code order.
pub fn lap_time_by_cluster(view: &FilteredView<'_>) -> Vec<(ClusterCode, FiveNumber)> {
    let mut grouped: BTreeMap<ClusterCode, Vec<f64>> = BTreeMap::new();
    for row in view.merged_rows() {
        grouped
            .entry(row.id.cluster)
            .or_default()
            .push(row.id.lap_time.seconds());
    }
    grouped
        .into_iter()
        .filter_map(|(code, values)| Some((code, FiveNumber::of(values)?)))
        .collect()
}

// ---------------------------------------------------------------------------
// Driver × Race cluster grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPivot {
    pub drivers: Vec<String>,
    pub races: Vec<String>,
    /// `cells[d][r]`
    pub cells: Vec<Vec<Option<ClusterCode>>>,
}

impl ClusterPivot {
    pub const MISSING: &'static str = "N/A";

    pub fn label(&self, driver: usize, race: usize) -> &'static str {
        self.cells[driver][race]
            .map(ClusterCode::label)
            .unwrap_or(Self::MISSING)
    }
}

pub fn cluster_pivot(view: &FilteredView<'_>) -> ClusterPivot {
    let drivers: Vec<String> = view
        .merged_rows()
        .map(|r| r.id.key.driver.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let races: Vec<String> = view
        .merged_rows()
        .map(|r| r.id.key.race.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells = vec![vec![None; races.len()]; drivers.len()];
    for row in view.merged_rows() {
        let d = drivers.binary_search(&row.id.key.driver);
        let r = races.binary_search(&row.id.key.race);
        if let (Ok(d), Ok(r)) = (d, r) {
            cells[d][r].get_or_insert(row.id.cluster);
        }
    }

    ClusterPivot {
        drivers,
        races,
        cells,
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

pub fn recommendations(cluster: ClusterCode) -> &'static [&'static str] {
    match cluster {
        ClusterCode::Smooth => &[
            "Maintain smooth throttle application in tight corners (e.g., Monaco's hairpins).",
            "Optimize DRS usage in high-speed straights (e.g., Silverstone's Hangar Straight).",
        ],
        ClusterCode::Aggressive => &[
            "Reduce throttle aggression in S1 to improve tire wear.",
            "Minimize late braking in high-speed corners (e.g., Monza's Parabolica).",
        ],
    }
}

/// Every cluster with whether it occurs in the selection.
pub fn cluster_presence(view: &FilteredView<'_>) -> Vec<(ClusterCode, bool)> {
    let present: BTreeSet<ClusterCode> = view.merged_rows().map(|r| r.id.cluster).collect();
    CLUSTER_LABELS
        .iter()
        .map(|(code, _)| (*code, present.contains(code)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LapTimeConfig;
    use crate::data::filter::{apply, Selection};
    use crate::data::fixtures::{table, CLUSTERS_CSV, FEATURES_CSV};
    use crate::data::snapshot::{Snapshot, TableNames};
    use crate::data::telemetry::TelemetryTable;
    use crate::data::diagnostics::Checked;

    fn snapshot(features: &str) -> Snapshot {
        Snapshot::from_tables(
            &table(features),
            &table(CLUSTERS_CSV),
            Checked::clean(TelemetryTable::default()),
            TableNames {
                features: "features",
                clusters: "clusters",
            },
            &LapTimeConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn radar_scales_by_full_dataset_maximum() {
        let snap = snapshot(FEATURES_CSV);
        let monaco = Selection::new(Vec::<String>::new(), ["Monaco"], Vec::<String>::new());
        let chart = radar_chart(&apply(&snap, &monaco));
        assert_eq!(chart.features, RADAR_FEATURES.to_vec());
        assert_eq!(chart.profiles.len(), 3);
        // Sorted by driver within the single race.
        assert_eq!(chart.profiles[0].key.driver, "Charles Leclerc");
        // Verstappen's Monza throttle (0.91) is the global max, filtered out here.
        let verstappen = &chart.profiles[2];
        assert!((verstappen.values[0] - 0.62 / 0.91 * RADAR_RANGE).abs() < 1e-9);
        assert!(chart.profiles.iter().all(|p| p.values.iter().all(|v| *v <= RADAR_RANGE)));
    }

    #[test]
    fn radar_uses_only_active_features() {
        let features = "Driver,Race,Throttle_Rate,Coasting_Pct\nMax Verstappen,Monaco,0.5,12\nCharles Leclerc,Monaco,0.6,15\n";
        let snap = snapshot(features);
        let chart = radar_chart(&apply(&snap, &Selection::default()));
        assert_eq!(chart.features, vec!["Throttle_Rate"]);
        assert_eq!(chart.profiles[0].values.len(), 1);
    }

    #[test]
    fn five_number_summary_interpolates() {
        let s = FiveNumber::of(vec![4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!((s.min, s.q1, s.median, s.q3, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        let even = FiveNumber::of(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((even.median - 2.5).abs() < 1e-12);
        assert!((even.q1 - 1.75).abs() < 1e-12);
        assert_eq!(FiveNumber::of(Vec::new()), None);
    }

    #[test]
    fn lap_times_grouped_per_present_cluster() {
        let snap = snapshot(FEATURES_CSV);
        let smooth = Selection::new(Vec::<String>::new(), Vec::<String>::new(), ["Smooth Drivers"]);
        let summary = lap_time_by_cluster(&apply(&snap, &smooth));
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].0, ClusterCode::Smooth);
    }

    #[test]
    fn pivot_marks_missing_cells() {
        let snap = snapshot(FEATURES_CSV);
        let pivot = cluster_pivot(&apply(&snap, &Selection::default()));
        assert_eq!(pivot.drivers, vec!["Charles Leclerc", "Fernando Alonso", "Max Verstappen"]);
        assert_eq!(pivot.races, vec!["Monaco", "Monza"]);
        assert_eq!(pivot.label(0, 0), "Aggressive Brakers");
        assert_eq!(pivot.label(1, 1), ClusterPivot::MISSING);
        assert_eq!(pivot.label(2, 0), "Smooth Drivers");
    }

    #[test]
    fn key_features_group_by_race_and_driver() {
        let snap = snapshot(FEATURES_CSV);
        let dists = key_feature_distributions(&apply(&snap, &Selection::default()));
        assert_eq!(dists.len(), 3);
        let throttle = &dists[0];
        assert_eq!(throttle.feature, "Throttle_Rate");
        assert_eq!(
            throttle.groups[&("Monza".to_string(), "Max Verstappen".to_string())],
            vec![0.91]
        );
    }

    #[test]
    fn presence_follows_the_selection() {
        let snap = snapshot(FEATURES_CSV);
        let aggressive = Selection::new(Vec::<String>::new(), Vec::<String>::new(), ["Aggressive Brakers"]);
        let presence = cluster_presence(&apply(&snap, &aggressive));
        assert_eq!(
            presence,
            vec![(ClusterCode::Smooth, false), (ClusterCode::Aggressive, true)]
        );
        assert_eq!(recommendations(ClusterCode::Aggressive).len(), 2);
    }
}
