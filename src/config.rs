//! Dashboard configuration: where the source tables live and how the
//! synthetic lap time is drawn.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the presentation-only lap time distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapTimeConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_mean")]
    pub mean: f64,
    #[serde(default = "default_std_dev")]
    pub std_dev: f64,
}

fn default_seed() -> u64 {
    42
}

fn default_mean() -> f64 {
    90.0
}

fn default_std_dev() -> f64 {
    5.0
}

impl Default for LapTimeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            mean: default_mean(),
            std_dev: default_std_dev(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Directory holding the three source tables.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_features_file")]
    pub features_file: String,

    #[serde(default = "default_clusters_file")]
    pub clusters_file: String,

    /// Optional; the dashboard works without it.
    #[serde(default = "default_telemetry_file")]
    pub telemetry_file: String,

    #[serde(default)]
    pub lap_time: LapTimeConfig,

    /// How often the dashboard checks the source files for changes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_features_file() -> String {
    "features_2023.csv".to_string()
}

fn default_clusters_file() -> String {
    "clustering_results_2023.csv".to_string()
}

fn default_telemetry_file() -> String {
    "combined_telemetry_2023.csv".to_string()
}

fn default_refresh_interval() -> u64 {
    2
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            features_file: default_features_file(),
            clusters_file: default_clusters_file(),
            telemetry_file: default_telemetry_file(),
            lap_time: LapTimeConfig::default(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl DashboardConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join(&self.features_file)
    }

    pub fn clusters_path(&self) -> PathBuf {
        self.data_dir.join(&self.clusters_file)
    }

    pub fn telemetry_path(&self) -> PathBuf {
        self.data_dir.join(&self.telemetry_file)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{ "data_dir": "/srv/f1", "lap_time": { "seed": 7 } }"#).unwrap();
        assert_eq!(config.features_path(), PathBuf::from("/srv/f1/features_2023.csv"));
        assert_eq!(config.lap_time.seed, 7);
        assert_eq!(config.lap_time.mean, 90.0);
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(DashboardConfig::from_file(Path::new("/nonexistent/driver-lens.json")).is_err());
    }
}
