//! Gaussian mixture posterior shared by the rigid and deformable solvers.

// Point counts never approach 2^52
#![allow(clippy::cast_precision_loss)]

use nalgebra::{DMatrix, DVector, Point3};
use shape_types::PointGroup;
use std::f64::consts::PI;

/// Spatial dimension of every point set.
pub(crate) const DIM: f64 = 3.0;

/// Packs a group into an N×3 row matrix.
pub(crate) fn to_matrix(group: &PointGroup) -> DMatrix<f64> {
    DMatrix::from_fn(group.len(), 3, |r, c| group.points()[r][c])
}

/// Unpacks an N×3 row matrix into a group.
pub(crate) fn to_group(matrix: &DMatrix<f64>) -> PointGroup {
    matrix
        .row_iter()
        .map(|row| Point3::new(row[0], row[1], row[2]))
        .collect()
}

/// Initial mixture variance, `Σ‖x − y‖² / (D·M·N)` over all pairs.
pub(crate) fn initial_variance(x: &DMatrix<f64>, y: &DMatrix<f64>) -> f64 {
    let (n, m) = (x.nrows(), y.nrows());
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..m {
            sum += (x.row(i) - y.row(j)).norm_squared();
        }
    }
    sum / (DIM * (m * n) as f64)
}

/// Posterior correspondence probabilities between the moving centroids
/// (rows) and the reference points (columns).
pub(crate) struct Posterior {
    /// M×N posterior matrix.
    pub p: DMatrix<f64>,
    /// Row sums, one per moving point.
    pub p1: DVector<f64>,
    /// Column sums, one per reference point.
    pub pt1: DVector<f64>,
    /// `P · X`, M×3.
    pub px: DMatrix<f64>,
    /// Total posterior mass.
    pub np: f64,
}

impl Posterior {
    /// E-step: evaluates the posterior for the current moving positions `ty`
    /// against the reference `x`, with uniform outlier weight `w`.
    pub(crate) fn compute(
        x: &DMatrix<f64>,
        ty: &DMatrix<f64>,
        variance: f64,
        outlier_weight: f64,
    ) -> Self {
        let (n, m) = (x.nrows(), ty.nrows());
        let mut p = DMatrix::from_fn(m, n, |i, j| {
            (-(x.row(j) - ty.row(i)).norm_squared() / (2.0 * variance)).exp()
        });

        let c = (2.0 * PI * variance).powf(DIM / 2.0) * outlier_weight / (1.0 - outlier_weight)
            * m as f64
            / n as f64;

        for j in 0..n {
            let mut den = p.column(j).sum() + c;
            if den == 0.0 {
                den = f64::EPSILON;
            }
            p.column_mut(j).unscale_mut(den);
        }

        let p1 = p.column_sum();
        let pt1 = p.row_sum().transpose();
        let np = p1.sum();
        let px = &p * x;
        Self {
            p,
            p1,
            pt1,
            px,
            np,
        }
    }
}
