use nalgebra::DMatrix;

use super::model::{ActiveFeatureSet, MergedDataset, RowKey};

/// Per-feature mean and population standard deviation, fit once on the
/// full merged dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

impl FeatureScaler {
    /// Relative spread below which a column counts as constant.
    const MIN_RELATIVE_STD: f64 = 1e-12;

    pub fn fit(dataset: &MergedDataset) -> Self {
        let n_features = dataset.features.len();
        let n = dataset.len().max(1) as f64;

        let mut means = vec![0.0; n_features];
        for row in &dataset.rows {
            for (m, v) in means.iter_mut().zip(&row.features) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut std_devs = vec![0.0; n_features];
        for row in &dataset.rows {
            for ((s, v), m) in std_devs.iter_mut().zip(&row.features).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        std_devs.iter_mut().for_each(|s| *s = (*s / n).sqrt());

        Self { means, std_devs }
    }

    /// Whether feature `idx` has (numerically) zero variance.
    pub fn is_constant(&self, idx: usize) -> bool {
        let scale = self.means[idx].abs().max(1.0);
        self.std_devs[idx] <= Self::MIN_RELATIVE_STD * scale
    }

    /// `(v - mean) / std`; constant features map to 0.
    pub fn transform(&self, idx: usize, value: f64) -> f64 {
        if self.is_constant(idx) {
            0.0
        } else {
            (value - self.means[idx]) / self.std_devs[idx]
        }
    }

    pub fn constant_features<'a>(&self, features: &'a ActiveFeatureSet) -> Vec<&'a str> {
        features
            .names()
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_constant(*i))
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

/// Standardized view of the merged dataset's active features. Rows align
/// with `MergedDataset::rows`; Driver/Race/Cluster/LapTime pass through.
#[derive(Debug, Clone)]
pub struct ScaledFeatureMatrix {
    pub features: ActiveFeatureSet,
    pub ids: Vec<RowKey>,
    /// rows × features
    pub values: DMatrix<f64>,
    pub scaler: FeatureScaler,
}

impl ScaledFeatureMatrix {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn row_values(&self, row: usize) -> Vec<f64> {
        self.values.row(row).iter().copied().collect()
    }
}

/// Fit the scaler on every row and rewrite each feature column.
pub fn standardize(dataset: &MergedDataset) -> ScaledFeatureMatrix {
    let scaler = FeatureScaler::fit(dataset);
    let values = DMatrix::from_fn(dataset.len(), dataset.features.len(), |r, c| {
        scaler.transform(c, dataset.rows[r].features[c])
    });

    let constant = scaler.constant_features(&dataset.features);
    if !constant.is_empty() {
        log::debug!("Zero-variance features scaled to 0: {constant:?}");
    }

    ScaledFeatureMatrix {
        features: dataset.features.clone(),
        ids: dataset.rows.iter().map(|r| r.id.clone()).collect(),
        values,
        scaler,
    }
}
