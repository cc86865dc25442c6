use nalgebra::{DMatrix, DVector};

use crate::error::{PipelineError, Result};

use super::model::{ActiveFeatureSet, RowKey};
use super::scale::ScaledFeatureMatrix;

/// The two principal axes of the full standardized dataset.
///
/// Fit once per feature set and reused for every filtered view, so points
/// from different selections are comparable on the same axes.
#[derive(Debug, Clone)]
pub struct PcaAxes {
    pub features: ActiveFeatureSet,
    /// Column means of the fitted matrix.
    pub center: DVector<f64>,
    /// features × 2, unit-length orthogonal columns (PC1, PC2).
    pub components: DMatrix<f64>,
    pub explained_variance: [f64; 2],
    pub explained_variance_ratio: [f64; 2],
}

impl PcaAxes {
    pub fn fit(scaled: &ScaledFeatureMatrix) -> Result<Self> {
        let x = &scaled.values;
        let (n, p) = x.shape();
        if p < 2 {
            return Err(PipelineError::InsufficientDimensionality { available: p });
        }

        let center = DVector::from_fn(p, |c, _| {
            if n == 0 {
                0.0
            } else {
                x.column(c).sum() / n as f64
            }
        });
        let centered = DMatrix::from_fn(n, p, |r, c| x[(r, c)] - center[c]);

        let dof = n.saturating_sub(1).max(1) as f64;
        let covariance = (centered.transpose() * &centered) / dof;
        let eigen = covariance.symmetric_eigen();

        let mut order: Vec<usize> = (0..p).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut components = DMatrix::zeros(p, 2);
        let mut explained_variance = [0.0; 2];
        for (k, &idx) in order.iter().take(2).enumerate() {
            let mut axis = eigen.eigenvectors.column(idx).clone_owned();
            orient(&mut axis);
            components.set_column(k, &axis);
            explained_variance[k] = eigen.eigenvalues[idx].max(0.0);
        }

        let total: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let explained_variance_ratio = if total > 0.0 {
            explained_variance.map(|v| v / total)
        } else {
            [0.0; 2]
        };

        Ok(Self {
            features: scaled.features.clone(),
            center,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// Project one standardized row onto (PC1, PC2).
    pub fn project_row(&self, values: &[f64]) -> [f64; 2] {
        let mut pc = [0.0; 2];
        for (k, out) in pc.iter_mut().enumerate() {
            *out = values
                .iter()
                .enumerate()
                .map(|(j, v)| (v - self.center[j]) * self.components[(j, k)])
                .sum();
        }
        pc
    }
}

/// Flip the axis so its largest-magnitude loading is positive.
fn orient(axis: &mut DVector<f64>) {
    let pivot = axis
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        axis.neg_mut();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPoint {
    pub id: RowKey,
    pub pc1: f64,
    pub pc2: f64,
}

/// PC1/PC2 per merged row, row order preserved.
#[derive(Debug, Clone)]
pub struct PcaProjection {
    pub axes: PcaAxes,
    pub points: Vec<ProjectedPoint>,
}

impl PcaProjection {
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Fit the axes on the full standardized matrix and project every row.
pub fn project(scaled: &ScaledFeatureMatrix) -> Result<PcaProjection> {
    let axes = PcaAxes::fit(scaled)?;
    let points = scaled
        .ids
        .iter()
        .enumerate()
        .map(|(r, id)| {
            let [pc1, pc2] = axes.project_row(&scaled.row_values(r));
            ProjectedPoint {
                id: id.clone(),
                pc1,
                pc2,
            }
        })
        .collect();

    log::info!(
        "PCA over {} feature(s): explained variance ratio {:.3} / {:.3}",
        axes.features.len(),
        axes.explained_variance_ratio[0],
        axes.explained_variance_ratio[1]
    );
    Ok(PcaProjection { axes, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::dataset;
    use crate::data::scale::standardize;

    fn sample() -> ScaledFeatureMatrix {
        standardize(&dataset(
            &["Throttle_Rate", "Coasting_Pct", "Speed_Variance"],
            &[
                ("A", "Monaco", 0, &[0.5, 10.0, 60.0]),
                ("B", "Monaco", 1, &[0.7, 25.0, 80.0]),
                ("C", "Monza", 0, &[0.9, 12.0, 55.0]),
                ("A", "Monza", 1, &[0.6, 30.0, 95.0]),
                ("B", "Silverstone", 0, &[0.8, 18.0, 70.0]),
            ],
        ))
    }

    #[test]
    fn single_feature_is_insufficient() {
        let scaled = standardize(&dataset(
            &["Throttle_Rate"],
            &[("A", "Monaco", 0, &[1.0]), ("B", "Monza", 1, &[2.0])],
        ));
        let err = project(&scaled).unwrap_err();
        assert_eq!(err, PipelineError::InsufficientDimensionality { available: 1 });
    }

    #[test]
    fn axes_are_orthonormal_and_ordered() {
        let projection = project(&sample()).unwrap();
        let w = &projection.axes.components;
        let gram = w.transpose() * w;
        assert!((gram[(0, 0)] - 1.0).abs() < 1e-9);
        assert!((gram[(1, 1)] - 1.0).abs() < 1e-9);
        assert!(gram[(0, 1)].abs() < 1e-9);

        let [v1, v2] = projection.axes.explained_variance;
        assert!(v1 >= v2);
        let ratio: f64 = projection.axes.explained_variance_ratio.iter().sum();
        assert!(ratio <= 1.0 + 1e-9);
    }

    #[test]
    fn first_axis_follows_the_dominant_direction() {
        let scaled = standardize(&dataset(
            &["Throttle_Rate", "Coasting_Pct"],
            &[
                ("A", "Monaco", 0, &[1.0, 1.1]),
                ("B", "Monaco", 1, &[2.0, 1.9]),
                ("C", "Monza", 0, &[3.0, 3.1]),
                ("D", "Monza", 1, &[4.0, 3.9]),
            ],
        ));
        let axes = PcaAxes::fit(&scaled).unwrap();
        let pc1 = axes.components.column(0);
        let diag = std::f64::consts::FRAC_1_SQRT_2;
        assert!((pc1[0] - diag).abs() < 1e-2, "{pc1:?}");
        assert!((pc1[1] - diag).abs() < 1e-2, "{pc1:?}");
    }

    #[test]
    fn projection_preserves_row_order_and_is_reproducible() {
        let scaled = sample();
        let first = project(&scaled).unwrap();
        let second = project(&scaled).unwrap();
        assert_eq!(first.points, second.points);
        let ids: Vec<_> = first.points.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, scaled.ids);
    }

    #[test]
    fn reprojecting_a_row_with_cached_axes_is_identical() {
        let scaled = sample();
        let projection = project(&scaled).unwrap();
        for (r, point) in projection.points.iter().enumerate() {
            let [pc1, pc2] = projection.axes.project_row(&scaled.row_values(r));
            assert_eq!((pc1, pc2), (point.pc1, point.pc2));
        }
    }
}
