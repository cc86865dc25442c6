use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::filter::{cluster_options, driver_options, Selection};
use crate::data::snapshot::{Snapshot, SnapshotCache, SourceFingerprint};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Which filter dimension a widget edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Driver,
    Race,
    Cluster,
}

/// The full UI state, independent of rendering. One per viewer session;
/// the snapshot itself is shared and never mutated.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loader/cache for the current data directory (None if the last load failed).
    cache: Option<SnapshotCache>,

    /// Sources seen by the last failed load; polled until they change.
    failed_sources: Option<SourceFingerprint>,

    /// Current selection per dimension.
    pub selection: Selection,

    /// Show standardized instead of raw values in the feature table.
    pub show_scaled: bool,

    /// Colour per cluster label and per driver.
    pub cluster_colors: ColorMap,
    pub driver_colors: ColorMap,

    /// Fatal error shown in place of the dashboard.
    pub fatal_error: Option<String>,

    /// Last non-fatal status line (e.g. a failed rebuild).
    pub status_message: Option<String>,

    last_poll: Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let mut state = Self {
            config,
            cache: None,
            failed_sources: None,
            selection: Selection::default(),
            show_scaled: false,
            cluster_colors: ColorMap::new(cluster_options()),
            driver_colors: ColorMap::default(),
            fatal_error: None,
            status_message: None,
            last_poll: Instant::now(),
        };
        state.reload();
        state
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.cache.as_ref().map(SnapshotCache::snapshot)
    }

    /// (Re)build the snapshot from `config` from scratch.
    pub fn reload(&mut self) {
        match SnapshotCache::open(self.config.clone()) {
            Ok(cache) => {
                let snapshot = cache.snapshot();
                log::info!(
                    "Loaded {} merged rows and {} telemetry samples from {}",
                    snapshot.merged.len(),
                    snapshot.telemetry.len(),
                    self.config.data_dir.display()
                );
                self.install(&snapshot);
                self.cache = Some(cache);
                self.failed_sources = None;
                self.fatal_error = None;
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load data: {e}");
                self.cache = None;
                self.failed_sources = Some(SourceFingerprint::capture(&self.config));
                self.fatal_error = Some(format!(
                    "{e}. Ensure {} and {} are in {}.",
                    self.config.features_file,
                    self.config.clusters_file,
                    self.config.data_dir.display()
                ));
            }
        }
    }

    /// Switch to another data directory.
    pub fn open_data_dir(&mut self, dir: std::path::PathBuf) {
        self.config.data_dir = dir;
        self.reload();
    }

    /// Check the source files for changes at most once per refresh interval.
    pub fn poll_sources(&mut self) {
        if self.last_poll.elapsed() < self.config.refresh_interval() {
            return;
        }
        self.last_poll = Instant::now();

        let Some(cache) = self.cache.as_mut() else {
            let now = SourceFingerprint::capture(&self.config);
            if self.failed_sources.as_ref() != Some(&now) {
                log::info!("Source files changed, retrying load");
                self.reload();
            }
            return;
        };
        match cache.refresh() {
            Ok(true) => {
                let snapshot = cache.snapshot();
                self.install(&snapshot);
                self.status_message = None;
            }
            Ok(false) => {}
            Err(e) => self.status_message = Some(format!("Reload failed, showing previous data: {e}")),
        }
    }

    /// Reset filters and colours for a freshly built snapshot.
    fn install(&mut self, snapshot: &Snapshot) {
        self.selection = Selection::everything(snapshot);
        self.driver_colors = ColorMap::new(driver_options(snapshot));
    }

    fn set_mut(&mut self, dim: Dimension) -> &mut BTreeSet<String> {
        match dim {
            Dimension::Driver => &mut self.selection.drivers,
            Dimension::Race => &mut self.selection.races,
            Dimension::Cluster => &mut self.selection.clusters,
        }
    }

    pub fn selected(&self, dim: Dimension) -> &BTreeSet<String> {
        match dim {
            Dimension::Driver => &self.selection.drivers,
            Dimension::Race => &self.selection.races,
            Dimension::Cluster => &self.selection.clusters,
        }
    }

    /// Toggle a single value in a dimension's selection.
    pub fn toggle(&mut self, dim: Dimension, value: &str) {
        match dim {
            Dimension::Driver => self.selection.toggle_driver(value),
            Dimension::Race => self.selection.toggle_race(value),
            Dimension::Cluster => self.selection.toggle_cluster(value),
        }
    }

    /// Select every value of a dimension.
    pub fn select_all(&mut self, dim: Dimension, options: &[String]) {
        *self.set_mut(dim) = options.iter().cloned().collect();
    }

    pub fn select_none(&mut self, dim: Dimension) {
        self.set_mut(dim).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{CLUSTERS_CSV, FEATURES_CSV};

    fn expire_poll_interval(state: &mut AppState) {
        let interval = state.config.refresh_interval() + std::time::Duration::from_secs(1);
        state.last_poll = Instant::now().checked_sub(interval).unwrap();
    }

    #[test]
    fn missing_data_dir_is_a_fatal_error_not_a_panic() {
        let config = DashboardConfig {
            data_dir: std::env::temp_dir().join("driver_lens_no_such_dir"),
            ..DashboardConfig::default()
        };
        let mut state = AppState::new(config);
        assert!(state.snapshot().is_none());
        assert!(state.fatal_error.as_deref().is_some_and(|e| e.contains("features_2023.csv")));

        state.select_all(Dimension::Race, &["Monaco".to_string()]);
        state.toggle(Dimension::Race, "Monza");
        assert_eq!(state.selected(Dimension::Race).len(), 2);
        state.select_none(Dimension::Race);
        assert!(state.selected(Dimension::Race).is_empty());
    }

    #[test]
    fn data_appearing_after_a_failed_load_is_picked_up_by_polling() {
        let dir = std::env::temp_dir().join(format!("driver_lens_late_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = DashboardConfig {
            data_dir: dir.clone(),
            ..DashboardConfig::default()
        };
        let mut state = AppState::new(config.clone());
        assert!(state.fatal_error.is_some());

        // Nothing changed on disk: no retry, the error stays.
        expire_poll_interval(&mut state);
        state.poll_sources();
        assert!(state.snapshot().is_none());
        assert!(state.fatal_error.is_some());

        std::fs::write(config.features_path(), FEATURES_CSV).unwrap();
        std::fs::write(config.clusters_path(), CLUSTERS_CSV).unwrap();
        expire_poll_interval(&mut state);
        state.poll_sources();
        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.merged.len(), 5);
        assert!(state.fatal_error.is_none());
        assert!(!state.selected(Dimension::Cluster).is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
