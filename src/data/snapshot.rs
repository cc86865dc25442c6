use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::{DashboardConfig, LapTimeConfig};
use crate::error::{PipelineError, Result};

use super::diagnostics::{Checked, Diagnostic};
use super::loader::load_table;
use super::merge::{merge, JoinSources};
use super::model::{ClusterCode, DriverRace, MergedDataset, Table};
use super::pca::{project, PcaProjection};
use super::scale::{standardize, ScaledFeatureMatrix};
use super::schema::{extract_assignments, extract_features, validate_clusters, validate_features};
use super::telemetry::{load_telemetry, TelemetryTable};

// ---------------------------------------------------------------------------
// Snapshot – every derived artifact, built once and then read-only
// ---------------------------------------------------------------------------

/// Immutable result of one pipeline run. Shared by reference (`Arc`) with
/// every consumer; filtering only ever selects rows from it.
#[derive(Debug)]
pub struct Snapshot {
    pub merged: MergedDataset,
    pub scaled: ScaledFeatureMatrix,
    /// A failed projection does not invalidate the rest of the snapshot.
    pub projection: Result<PcaProjection>,
    pub telemetry: TelemetryTable,
    pub diagnostics: Vec<Diagnostic>,
    pub fingerprint: SourceFingerprint,
    clusters_by_key: HashMap<DriverRace, ClusterCode>,
}

/// Diagnostic names of the three inputs.
#[derive(Debug, Clone, Copy)]
pub struct TableNames<'a> {
    pub features: &'a str,
    pub clusters: &'a str,
}

impl Snapshot {
    /// Run the whole pipeline against the files named in `config`.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let fingerprint = SourceFingerprint::capture(config);
        let features_path = config.features_path();
        let clusters_path = config.clusters_path();

        let features = read_required(&features_path)?;
        let clusters = read_required(&clusters_path)?;
        let telemetry = load_telemetry(&config.telemetry_path());

        let names = TableNames {
            features: &config.features_file,
            clusters: &config.clusters_file,
        };
        let mut snapshot = Self::from_tables(&features, &clusters, telemetry, names, &config.lap_time)?;
        snapshot.fingerprint = fingerprint;
        Ok(snapshot)
    }

    /// Build from already-loaded tables.
    pub fn from_tables(
        features: &Table,
        clusters: &Table,
        telemetry: Checked<TelemetryTable>,
        names: TableNames<'_>,
        lap_time: &LapTimeConfig,
    ) -> Result<Self> {
        let mut diagnostics = Vec::new();

        let active = validate_features(features, names.features)?.drain_into(&mut diagnostics);
        validate_clusters(clusters, names.clusters)?;
        let records = extract_features(features, names.features, &active)?.drain_into(&mut diagnostics);
        let assignments = extract_assignments(clusters, names.clusters)?.drain_into(&mut diagnostics);

        let merged = merge(
            &active,
            records,
            assignments,
            JoinSources {
                features: names.features,
                clusters: names.clusters,
            },
            lap_time,
        )?
        .drain_into(&mut diagnostics);

        let scaled = standardize(&merged);
        let projection = project(&scaled);
        if let Err(e) = &projection {
            log::warn!("PCA unavailable: {e}");
        }

        let telemetry = telemetry.drain_into(&mut diagnostics);
        let clusters_by_key = merged
            .rows
            .iter()
            .map(|r| (r.id.key.clone(), r.id.cluster))
            .collect();

        Ok(Self {
            merged,
            scaled,
            projection,
            telemetry,
            diagnostics,
            fingerprint: SourceFingerprint::default(),
            clusters_by_key,
        })
    }

    pub fn cluster_of(&self, key: &DriverRace) -> Option<ClusterCode> {
        self.clusters_by_key.get(key).copied()
    }
}

fn read_required(path: &Path) -> Result<Table> {
    load_table(path).map_err(|e| PipelineError::Load {
        path: path.display().to_string(),
        reason: format!("{e:#}"),
    })
}

// ---------------------------------------------------------------------------
// Source change detection
// ---------------------------------------------------------------------------

/// Size and modification time of one source file; `None` when absent.
type FileStamp = Option<(u64, Option<SystemTime>)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFingerprint {
    files: Vec<(PathBuf, FileStamp)>,
}

impl SourceFingerprint {
    pub fn capture(config: &DashboardConfig) -> Self {
        let files = [
            config.features_path(),
            config.clusters_path(),
            config.telemetry_path(),
        ]
        .into_iter()
        .map(|path| {
            let stamp = std::fs::metadata(&path)
                .ok()
                .map(|m| (m.len(), m.modified().ok()));
            (path, stamp)
        })
        .collect();
        Self { files }
    }
}

/// Holds the current snapshot and rebuilds it only when the source files
/// change.
pub struct SnapshotCache {
    config: DashboardConfig,
    current: Arc<Snapshot>,
    /// Sources whose last rebuild failed; not retried until they change again.
    failed: Option<SourceFingerprint>,
}

impl SnapshotCache {
    pub fn open(config: DashboardConfig) -> Result<Self> {
        let current = Arc::new(Snapshot::load(&config)?);
        Ok(Self {
            config,
            current,
            failed: None,
        })
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn is_stale(&self) -> bool {
        let now = SourceFingerprint::capture(&self.config);
        now != self.current.fingerprint && Some(&now) != self.failed.as_ref()
    }

    /// Rebuild when stale. Returns whether a new snapshot was installed; on a
    /// fatal error the previous snapshot stays in place.
    pub fn refresh(&mut self) -> Result<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        log::info!("Source files changed, rebuilding dataset");
        match Snapshot::load(&self.config) {
            Ok(snapshot) => {
                self.current = Arc::new(snapshot);
                self.failed = None;
                Ok(true)
            }
            Err(e) => {
                log::error!("Rebuild failed, keeping previous dataset: {e}");
                self.failed = Some(SourceFingerprint::capture(&self.config));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{table, CLUSTERS_CSV, FEATURES_CSV, TELEMETRY_CSV};
    use crate::data::telemetry::from_table;

    const NAMES: TableNames<'static> = TableNames {
        features: "features_2023.csv",
        clusters: "clustering_results_2023.csv",
    };

    fn build(features: &str, clusters: &str) -> Result<Snapshot> {
        Snapshot::from_tables(
            &table(features),
            &table(clusters),
            from_table(&table(TELEMETRY_CSV), "combined_telemetry_2023.csv"),
            NAMES,
            &LapTimeConfig::default(),
        )
    }

    #[test]
    fn builds_all_artifacts_with_aligned_rows() {
        let snapshot = build(FEATURES_CSV, CLUSTERS_CSV).unwrap();
        assert_eq!(snapshot.merged.len(), 5);
        assert_eq!(snapshot.scaled.len(), 5);
        let projection = snapshot.projection.as_ref().unwrap();
        for ((row, scaled), point) in snapshot
            .merged
            .rows
            .iter()
            .zip(&snapshot.scaled.ids)
            .zip(&projection.points)
        {
            assert_eq!(&row.id, scaled);
            assert_eq!(row.id, point.id);
        }
        assert_eq!(snapshot.telemetry.len(), 6);
        assert_eq!(
            snapshot.cluster_of(&DriverRace::new("Max Verstappen", "Monza")),
            Some(ClusterCode::Aggressive)
        );
    }

    #[test]
    fn reports_unmatched_rows_on_both_sides() {
        let snapshot = build(FEATURES_CSV, CLUSTERS_CSV).unwrap();
        let mismatches: Vec<&str> = snapshot
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::JoinMismatch { table, .. } => Some(table.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(mismatches, vec![NAMES.features, NAMES.clusters]);
    }

    #[test]
    fn single_feature_keeps_snapshot_but_not_projection() {
        let features = "Driver,Race,Throttle_Rate\nA,Monaco,0.5\nB,Monza,0.7\n";
        let clusters = "Driver,Race,Cluster\nA,Monaco,0\nB,Monza,1\n";
        let snapshot = build(features, clusters).unwrap();
        assert_eq!(snapshot.merged.len(), 2);
        assert_eq!(
            snapshot.projection.unwrap_err(),
            PipelineError::InsufficientDimensionality { available: 1 }
        );
    }

    #[test]
    fn missing_cluster_key_column_is_fatal() {
        let err = build(FEATURES_CSV, "Driver,Cluster\nA,0\n").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumns { .. }));
    }

    #[test]
    fn telemetry_absence_does_not_block_the_dataset() {
        let snapshot = Snapshot::from_tables(
            &table(FEATURES_CSV),
            &table(CLUSTERS_CSV),
            load_telemetry(Path::new("/nonexistent/telemetry.csv")),
            NAMES,
            &LapTimeConfig::default(),
        )
        .unwrap();
        assert_eq!(snapshot.merged.len(), 5);
        assert!(snapshot.telemetry.is_empty());
        assert!(snapshot
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::TelemetryUnavailable { .. })));
    }

    #[test]
    fn telemetry_without_brake_column_loads_the_dataset_from_disk() {
        let dir = std::env::temp_dir().join(format!("driver_lens_nobrake_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = DashboardConfig {
            data_dir: dir.clone(),
            ..DashboardConfig::default()
        };
        std::fs::write(config.features_path(), FEATURES_CSV).unwrap();
        std::fs::write(config.clusters_path(), CLUSTERS_CSV).unwrap();
        let no_brake: String = TELEMETRY_CSV
            .lines()
            .map(|line| {
                let mut cells: Vec<&str> = line.split(',').collect();
                cells.remove(3);
                cells.join(",") + "\n"
            })
            .collect();
        assert!(!no_brake.contains("Brake"));
        std::fs::write(config.telemetry_path(), no_brake).unwrap();

        let snapshot = Snapshot::load(&config).unwrap();
        assert_eq!(snapshot.merged.len(), 5);
        assert!(snapshot.telemetry.is_empty());
        assert!(snapshot
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::TelemetryUnavailable { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn cache_rebuilds_only_when_sources_change() {
        let dir = std::env::temp_dir().join(format!("driver_lens_cache_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = DashboardConfig {
            data_dir: dir.clone(),
            ..DashboardConfig::default()
        };
        std::fs::write(config.features_path(), FEATURES_CSV).unwrap();
        std::fs::write(config.clusters_path(), CLUSTERS_CSV).unwrap();

        let mut cache = SnapshotCache::open(config.clone()).unwrap();
        let before = cache.snapshot();
        assert!(!cache.refresh().unwrap());
        assert!(Arc::ptr_eq(&before, &cache.snapshot()));

        // Append a matching pair; the length change marks the sources stale.
        let extended = format!("{CLUSTERS_CSV}Fernando Alonso,Silverstone,1\n");
        std::fs::write(config.clusters_path(), extended).unwrap();
        assert!(cache.refresh().unwrap());
        assert_eq!(cache.snapshot().merged.len(), 6);

        // A broken rewrite keeps the last good snapshot.
        std::fs::write(config.clusters_path(), "Driver,Race\n").unwrap();
        assert!(cache.refresh().is_err());
        assert_eq!(cache.snapshot().merged.len(), 6);
        assert!(!cache.refresh().unwrap());

        std::fs::remove_dir_all(&dir).ok();
    }
}
