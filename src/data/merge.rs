use std::collections::{BTreeMap, HashMap, HashSet};

use rand::SeedableRng;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use statrs::distribution::Normal;

use crate::config::LapTimeConfig;
use crate::error::{PipelineError, Result};

use super::diagnostics::{Checked, Diagnostic};
use super::model::{
    ActiveFeatureSet, ClusterCode, DriverRace, FeatureRecord, MergedDataset, MergedRow, RowKey,
    SyntheticLapTime,
};

/// How many unmatched keys are quoted in a `JoinMismatch` message.
const QUOTED_KEYS: usize = 5;

/// Names used in diagnostics for the two joined tables.
#[derive(Debug, Clone, Copy)]
pub struct JoinSources<'a> {
    pub features: &'a str,
    pub clusters: &'a str,
}

/// Join feature rows with cluster assignments on (Driver, Race), then
/// attach a synthetic lap time per surviving row.
///
/// Feature rows without an assignment are dropped, never given a default
/// cluster. Assignments without a feature row are reported too.
pub fn merge(
    active: &ActiveFeatureSet,
    features: Vec<FeatureRecord>,
    assignments: Vec<(DriverRace, ClusterCode)>,
    sources: JoinSources<'_>,
    lap_times: &LapTimeConfig,
) -> Result<Checked<MergedDataset>> {
    let mut diagnostics = Vec::new();

    let features = dedup_by_key(features, |r| &r.key, sources.features, &mut diagnostics);
    let assignments = dedup_by_key(assignments, |(k, _)| k, sources.clusters, &mut diagnostics);
    let clusters: HashMap<DriverRace, ClusterCode> = assignments.into_iter().collect();

    let mut matched = Vec::with_capacity(features.len());
    let mut unmatched = Vec::new();
    for record in features {
        match clusters.get(&record.key) {
            Some(&cluster) => matched.push((record, cluster)),
            None => unmatched.push(record.key),
        }
    }

    let matched_keys: HashSet<&DriverRace> = matched.iter().map(|(r, _)| &r.key).collect();
    let mut orphaned: Vec<DriverRace> = clusters
        .keys()
        .filter(|k| !matched_keys.contains(k))
        .cloned()
        .collect();
    orphaned.sort();

    if !unmatched.is_empty() {
        diagnostics.push(mismatch(sources.features, &unmatched));
    }
    if !orphaned.is_empty() {
        diagnostics.push(mismatch(sources.clusters, &orphaned));
    }

    if matched.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let keys: Vec<DriverRace> = matched.iter().map(|(r, _)| r.key.clone()).collect();
    let laps = synthetic_lap_times(&keys, lap_times)?;

    let rows = matched
        .into_iter()
        .map(|(record, cluster)| MergedRow {
            id: RowKey {
                lap_time: laps[&record.key],
                key: record.key,
                cluster,
            },
            features: record.values,
        })
        .collect::<Vec<_>>();

    log::info!("Merged dataset: {} row(s)", rows.len());
    Ok(Checked::with(
        MergedDataset {
            features: active.clone(),
            rows,
        },
        diagnostics,
    ))
}

/// Draw one lap time per key from N(mean, std_dev) with a fixed seed, in
/// key order, so identical inputs always produce identical outputs.
pub fn synthetic_lap_times(
    keys: &[DriverRace],
    config: &LapTimeConfig,
) -> Result<BTreeMap<DriverRace, SyntheticLapTime>> {
    let normal = Normal::new(config.mean, config.std_dev).map_err(|e| {
        PipelineError::InvalidConfig(format!(
            "lap time distribution N({}, {}): {e}",
            config.mean, config.std_dev
        ))
    })?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    Ok(keys
        .iter()
        .map(|key| (key.clone(), SyntheticLapTime(normal.sample(&mut rng))))
        .collect())
}

/// Keep the first row per key; later duplicates are reported and dropped.
fn dedup_by_key<T>(
    rows: Vec<T>,
    key: impl Fn(&T) -> &DriverRace,
    table: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = 0;
    for row in rows {
        if seen.insert(key(&row).clone()) {
            kept.push(row);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        diagnostics.push(
            Diagnostic::DuplicateKey {
                table: table.to_string(),
                dropped,
            }
            .logged(),
        );
    }
    kept
}

fn mismatch(table: &str, keys: &[DriverRace]) -> Diagnostic {
    Diagnostic::JoinMismatch {
        table: table.to_string(),
        dropped: keys.len(),
        keys: keys.iter().take(QUOTED_KEYS).map(|k| k.to_string()).collect(),
    }
    .logged()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: JoinSources<'static> = JoinSources {
        features: "features",
        clusters: "clusters",
    };

    fn active() -> ActiveFeatureSet {
        ActiveFeatureSet::new(vec!["Throttle_Rate".into()])
    }

    fn record(driver: &str, race: &str, v: f64) -> FeatureRecord {
        FeatureRecord {
            key: DriverRace::new(driver, race),
            values: vec![v],
        }
    }

    #[test]
    fn only_pairs_present_in_both_tables_survive() {
        let merged = merge(
            &active(),
            vec![record("A", "Monaco", 0.6), record("B", "Monza", 0.8)],
            vec![
                (DriverRace::new("A", "Monaco"), ClusterCode::Smooth),
                (DriverRace::new("C", "Silverstone"), ClusterCode::Aggressive),
            ],
            SOURCES,
            &LapTimeConfig::default(),
        )
        .unwrap();

        assert_eq!(merged.value.len(), 1);
        let row = &merged.value.rows[0];
        assert_eq!(row.id.key, DriverRace::new("A", "Monaco"));
        assert_eq!(row.id.cluster, ClusterCode::Smooth);

        let dropped: Vec<(&str, usize)> = merged
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::JoinMismatch { table, dropped, .. } => Some((table.as_str(), *dropped)),
                _ => None,
            })
            .collect();
        assert_eq!(dropped, vec![("features", 1), ("clusters", 1)]);
    }

    #[test]
    fn duplicate_keys_keep_the_first_row() {
        let merged = merge(
            &active(),
            vec![record("A", "Monaco", 0.6), record("A", "Monaco", 0.9)],
            vec![
                (DriverRace::new("A", "Monaco"), ClusterCode::Aggressive),
                (DriverRace::new("A", "Monaco"), ClusterCode::Smooth),
            ],
            SOURCES,
            &LapTimeConfig::default(),
        )
        .unwrap();

        assert_eq!(merged.value.len(), 1);
        assert_eq!(merged.value.rows[0].features, vec![0.6]);
        assert_eq!(merged.value.rows[0].id.cluster, ClusterCode::Aggressive);
        assert_eq!(merged.diagnostics.len(), 2);
    }

    #[test]
    fn nothing_matched_is_fatal() {
        let err = merge(
            &active(),
            vec![record("B", "Monza", 0.8)],
            vec![(DriverRace::new("A", "Monaco"), ClusterCode::Smooth)],
            SOURCES,
            &LapTimeConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, PipelineError::EmptyDataset);
    }

    #[test]
    fn lap_times_are_deterministic_for_a_seed() {
        let keys: Vec<DriverRace> = ["Monaco", "Monza", "Silverstone"]
            .iter()
            .map(|r| DriverRace::new("A", *r))
            .collect();
        let config = LapTimeConfig::default();
        let first = synthetic_lap_times(&keys, &config).unwrap();
        let second = synthetic_lap_times(&keys, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert!(first.values().all(|t| (40.0..140.0).contains(&t.seconds())));

        let reseeded = synthetic_lap_times(&keys, &LapTimeConfig { seed: 7, ..config }).unwrap();
        assert_ne!(first, reseeded);
    }

    #[test]
    fn zero_spread_lap_time_is_a_config_error() {
        let config = LapTimeConfig {
            std_dev: 0.0,
            ..LapTimeConfig::default()
        };
        let err = synthetic_lap_times(&[DriverRace::new("A", "Monaco")], &config).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }
}
