use std::collections::BTreeSet;

use super::diagnostics::Diagnostic;
use super::model::{ClusterCode, DriverRace, MergedRow, TelemetrySample, CLUSTER_LABELS};
use super::pca::ProjectedPoint;
use super::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Selection: which drivers / races / clusters are selected
// ---------------------------------------------------------------------------

/// Per-dimension selection. An empty set means "no filter" (select all) for
/// that dimension; dimensions combine with AND, values within one with OR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub drivers: BTreeSet<String>,
    pub races: BTreeSet<String>,
    /// Cluster label names, e.g. "Smooth Drivers".
    pub clusters: BTreeSet<String>,
}

impl Selection {
    pub fn new<D, R, C>(drivers: D, races: R, clusters: C) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            drivers: drivers.into_iter().map(Into::into).collect(),
            races: races.into_iter().map(Into::into).collect(),
            clusters: clusters.into_iter().map(Into::into).collect(),
        }
    }

    /// Selected cluster codes, or `None` when every cluster is selected.
    /// Labels may carry a " (code)" suffix as shown in option lists; labels
    /// that name no cluster match nothing.
    pub fn cluster_codes(&self) -> Option<BTreeSet<ClusterCode>> {
        if self.clusters.is_empty() {
            return None;
        }
        Some(
            self.clusters
                .iter()
                .filter_map(|label| {
                    let name = label.split(" (").next().unwrap_or(label);
                    ClusterCode::from_label(name)
                })
                .collect(),
        )
    }

    /// Resolve the selection once for matching many rows.
    pub fn matcher(&self) -> SelectionMatcher<'_> {
        SelectionMatcher {
            drivers: &self.drivers,
            races: &self.races,
            clusters: self.cluster_codes(),
        }
    }

    /// Every driver, race and cluster of the snapshot explicitly selected.
    pub fn everything(snapshot: &Snapshot) -> Self {
        Self::new(
            driver_options(snapshot),
            race_options(snapshot),
            cluster_options(),
        )
    }

    pub fn toggle_driver(&mut self, driver: &str) {
        toggle(&mut self.drivers, driver);
    }

    pub fn toggle_race(&mut self, race: &str) {
        toggle(&mut self.races, race);
    }

    pub fn toggle_cluster(&mut self, label: &str) {
        toggle(&mut self.clusters, label);
    }
}

/// A selection with its cluster labels already parsed into codes.
#[derive(Debug, Clone)]
pub struct SelectionMatcher<'s> {
    drivers: &'s BTreeSet<String>,
    races: &'s BTreeSet<String>,
    clusters: Option<BTreeSet<ClusterCode>>,
}

impl SelectionMatcher<'_> {
    /// A row without a cluster never matches: every driver, race and cluster
    /// offered as an option comes from the merged dataset, so "all" can only
    /// mean rows that resolve into it.
    pub fn matches(&self, key: &DriverRace, cluster: Option<ClusterCode>) -> bool {
        let Some(cluster) = cluster else {
            return false;
        };
        let dimension = |set: &BTreeSet<String>, value: &str| set.is_empty() || set.contains(value);
        dimension(self.drivers, &key.driver)
            && dimension(self.races, &key.race)
            && self.clusters.as_ref().map_or(true, |codes| codes.contains(&cluster))
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

// ---------------------------------------------------------------------------
// Options offered to the presentation layer
// ---------------------------------------------------------------------------

pub fn driver_options(snapshot: &Snapshot) -> Vec<String> {
    unique(snapshot.merged.rows.iter().map(|r| r.id.key.driver.as_str()))
}

pub fn race_options(snapshot: &Snapshot) -> Vec<String> {
    unique(snapshot.merged.rows.iter().map(|r| r.id.key.race.as_str()))
}

/// Cluster label names in code order.
pub fn cluster_options() -> Vec<String> {
    CLUSTER_LABELS.iter().map(|(_, name)| name.to_string()).collect()
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Filtered view over a snapshot
// ---------------------------------------------------------------------------

/// Row selections over the four exposed tables. Holds only indices; the
/// snapshot's global artifacts are never recomputed here.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub snapshot: &'a Snapshot,
    /// Indices into `merged.rows`, which are also rows of the scaled matrix.
    pub rows: Vec<usize>,
    /// Indices into `projection.points`; empty when PCA is unavailable.
    pub points: Vec<usize>,
    pub telemetry: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> FilteredView<'a> {
    pub fn merged_rows(&self) -> impl Iterator<Item = &'a MergedRow> + '_ {
        let snapshot = self.snapshot;
        self.rows.iter().map(move |&i| &snapshot.merged.rows[i])
    }

    /// Standardized feature values of the selected rows.
    pub fn scaled_rows(&self) -> impl Iterator<Item = (&'a MergedRow, Vec<f64>)> + '_ {
        let snapshot = self.snapshot;
        self.rows
            .iter()
            .map(move |&i| (&snapshot.merged.rows[i], snapshot.scaled.row_values(i)))
    }

    pub fn projected_points(&self) -> impl Iterator<Item = &'a ProjectedPoint> + '_ {
        let points: &'a [ProjectedPoint] = self
            .snapshot
            .projection
            .as_ref()
            .map(|p| p.points.as_slice())
            .unwrap_or_default();
        self.points.iter().map(move |&i| &points[i])
    }

    pub fn telemetry_samples(&self) -> impl Iterator<Item = &'a TelemetrySample> + '_ {
        let snapshot = self.snapshot;
        self.telemetry
            .iter()
            .map(move |&i| &snapshot.telemetry.samples[i])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Apply a selection to every table of the snapshot.
///
/// Telemetry carries no cluster of its own; it is matched through the
/// merged dataset's (Driver, Race) → Cluster assignment, and samples whose
/// pair is not in the merged dataset are never shown.
pub fn apply<'a>(snapshot: &'a Snapshot, selection: &Selection) -> FilteredView<'a> {
    let matcher = selection.matcher();
    let rows = filtered_indices(&snapshot.merged.rows, |r| {
        matcher.matches(&r.id.key, Some(r.id.cluster))
    });
    let points = snapshot
        .projection
        .as_ref()
        .map(|p| filtered_indices(&p.points, |pt| matcher.matches(&pt.id.key, Some(pt.id.cluster))))
        .unwrap_or_default();
    let telemetry = filtered_indices(&snapshot.telemetry.samples, |s| {
        matcher.matches(&s.key, snapshot.cluster_of(&s.key))
    });

    let mut diagnostics = Vec::new();
    if rows.is_empty() {
        diagnostics.push(Diagnostic::EmptyFilterResult {
            table: "feature".to_string(),
        });
    }
    if telemetry.is_empty() && !snapshot.telemetry.is_empty() {
        diagnostics.push(Diagnostic::EmptyFilterResult {
            table: "telemetry".to_string(),
        });
    }

    FilteredView {
        snapshot,
        rows,
        points,
        telemetry,
        diagnostics,
    }
}

/// Return indices of rows passing `keep`.
pub fn filtered_indices<T>(rows: &[T], keep: impl Fn(&T) -> bool) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| keep(*row))
        .map(|(i, _)| i)
        .collect()
}
