//! Principal Component Analysis of aligned shape populations.
//!
//! Each shape of M points is flattened to a 3M vector. The covariance
//! eigenpairs are obtained from the S×S Gram matrix of the centred data
//! (S samples), which has the same non-zero spectrum as the 3M×3M
//! covariance but is far cheaper when S ≪ 3M.

// Counts never approach 2^52
#![allow(clippy::cast_precision_loss)]

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use shape_types::PointGroup;
use tracing::debug;

use crate::error::{ModelError, ModelResult};

/// Relative eigenvalue threshold below which a direction carries no variance.
const RANK_EPSILON: f64 = 1e-12;

/// Residual norm below which a candidate axis already lies in the basis span.
const SPAN_EPSILON: f64 = 1e-6;

/// A PCA shape model: mean shape plus principal modes of variation.
///
/// Eigenvalues are sorted descending and nonnegative; eigenvector columns
/// are orthonormal and follow the same order.
///
/// Only the [`components`](Self::components) directions with non-zero
/// variance are stored. [`basis`](Self::basis) accepts any `k ≤ 3M` and
/// completes the stored modes with zero-variance directions, so training
/// shapes have zero features there while other shapes keep their residual.
///
/// # Example
///
/// ```
/// use shape_model::ShapeModel;
/// use shape_types::PointGroup;
///
/// let shapes = vec![
///     PointGroup::from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]),
///     PointGroup::from_rows(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]]),
///     PointGroup::from_rows(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]]),
/// ];
/// let model = ShapeModel::build(&shapes).unwrap();
/// assert_eq!(model.components(), 1);
/// assert!((model.explained_variance_ratio(1) - 1.0).abs() < 1e-12);
/// assert!((model.mean_shape().points()[1].x - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct ShapeModel {
    point_count: usize,
    mean: DVector<f64>,
    centered: DMatrix<f64>,
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<f64>,
}

impl ShapeModel {
    /// Builds the model from equally sized, correspondence-aligned shapes.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyPopulation`] for an empty slice and
    /// [`ModelError::ShapeMismatch`] if any shape differs in point count from
    /// the first.
    pub fn build(shapes: &[PointGroup]) -> ModelResult<Self> {
        let first = shapes.first().ok_or(ModelError::EmptyPopulation)?;
        let point_count = first.len();
        if point_count == 0 {
            return Err(ModelError::EmptyPopulation);
        }
        for (index, shape) in shapes.iter().enumerate() {
            if shape.len() != point_count {
                return Err(ModelError::ShapeMismatch {
                    index,
                    expected: point_count,
                    actual: shape.len(),
                });
            }
        }

        let samples = shapes.len();
        let dim = 3 * point_count;
        let mut data = DMatrix::zeros(samples, dim);
        for (r, shape) in shapes.iter().enumerate() {
            data.row_mut(r).copy_from(&shape.flatten().transpose());
        }
        let mean = data.row_mean().transpose();
        let centered = DMatrix::from_fn(samples, dim, |r, c| data[(r, c)] - mean[c]);

        let divisor = samples.saturating_sub(1).max(1) as f64;
        let gram = &centered * centered.transpose() / divisor;
        let eigen = SymmetricEigen::new(gram);

        let mut order: Vec<usize> = (0..samples).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let largest = order
            .first()
            .map_or(0.0, |&i| eigen.eigenvalues[i].max(0.0));
        let kept: Vec<usize> = order
            .into_iter()
            .filter(|&i| eigen.eigenvalues[i] > RANK_EPSILON * largest.max(f64::MIN_POSITIVE))
            .collect();

        let mut eigenvalues = DVector::zeros(kept.len());
        let mut eigenvectors = DMatrix::zeros(dim, kept.len());
        for (c, &i) in kept.iter().enumerate() {
            // covariance eigenvector from the Gram eigenvector: Aᵀu, normalised
            let v = centered.transpose() * eigen.eigenvectors.column(i);
            let norm = v.norm();
            if norm > 0.0 {
                eigenvectors.set_column(c, &(v / norm));
                eigenvalues[c] = eigen.eigenvalues[i].max(0.0);
            }
        }

        debug!(
            samples,
            points = point_count,
            components = kept.len(),
            "Shape model built"
        );

        Ok(Self {
            point_count,
            mean,
            centered,
            eigenvalues,
            eigenvectors,
        })
    }

    /// Points per shape.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        self.point_count
    }

    /// Number of training shapes.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.centered.nrows()
    }

    /// Number of principal components with non-zero variance.
    #[must_use]
    pub fn components(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Size of the full eigenbasis, `3M`.
    #[must_use]
    pub const fn max_components(&self) -> usize {
        3 * self.point_count
    }

    /// Flattened mean shape, length 3M.
    #[must_use]
    pub const fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Mean shape as a point group.
    #[must_use]
    pub fn mean_shape(&self) -> PointGroup {
        // mean length is 3·point_count by construction
        PointGroup::from_flat(&self.mean).unwrap_or_default()
    }

    /// Eigenvalues, descending.
    #[must_use]
    pub const fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    /// Eigenvectors as columns, in eigenvalue order.
    #[must_use]
    pub const fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    /// Centred data matrix, one flattened shape per row.
    #[must_use]
    pub const fn centered(&self) -> &DMatrix<f64> {
        &self.centered
    }

    /// Sum of all eigenvalues.
    #[must_use]
    pub fn total_variance(&self) -> f64 {
        self.eigenvalues.sum()
    }

    /// Fraction of the total variance captured by the first `k` components.
    ///
    /// Non-decreasing in `k`; `0` for `k = 0` and `1` once `k` covers every
    /// component (in particular at `k = 3M`). A population without variance
    /// reports `1` for every `k > 0`.
    #[must_use]
    pub fn explained_variance_ratio(&self, k: usize) -> f64 {
        if k == 0 {
            return 0.0;
        }
        let total = self.total_variance();
        if total <= 0.0 || k >= self.components() {
            return 1.0;
        }
        self.eigenvalues.rows(0, k).sum() / total
    }

    /// The first `k` eigenvectors, 3M×k.
    ///
    /// Past [`Self::components`] the columns are zero-variance directions,
    /// orthogonal to every stored mode and to each other. They are taken
    /// from the coordinate axes in order, so the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TooManyComponents`] if `k` exceeds
    /// [`Self::max_components`].
    pub fn basis(&self, k: usize) -> ModelResult<DMatrix<f64>> {
        if k > self.max_components() {
            return Err(ModelError::TooManyComponents {
                requested: k,
                available: self.max_components(),
            });
        }
        if k <= self.components() {
            return Ok(self.eigenvectors.columns(0, k).into_owned());
        }
        Ok(complete_basis(&self.eigenvectors, k))
    }

    /// Training feature vectors `A · V[:, :k]`, one row per training shape.
    ///
    /// Columns past [`Self::components`] are zero.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TooManyComponents`] if `k` exceeds
    /// [`Self::max_components`].
    pub fn feature_vectors(&self, k: usize) -> ModelResult<DMatrix<f64>> {
        Ok(&self.centered * self.basis(k)?)
    }

    /// Projects an aligned shape onto the first `k` components.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] for a shape of the wrong size
    /// and [`ModelError::TooManyComponents`] for an oversized `k`.
    pub fn project(&self, shape: &PointGroup, k: usize) -> ModelResult<DVector<f64>> {
        if shape.len() != self.point_count {
            return Err(ModelError::ShapeMismatch {
                index: 0,
                expected: self.point_count,
                actual: shape.len(),
            });
        }
        let basis = self.basis(k)?;
        Ok(basis.transpose() * (shape.flatten() - &self.mean))
    }

    /// Rebuilds a shape from a feature vector: `V[:, :k] · f + mean`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TooManyComponents`] if the feature vector is
    /// longer than [`Self::max_components`].
    pub fn reconstruct(&self, features: &DVector<f64>) -> ModelResult<PointGroup> {
        let basis = self.basis(features.len())?;
        let flat = basis * features + &self.mean;
        Ok(PointGroup::from_flat(&flat)?)
    }
}

/// Extends orthonormal `modes` to `k` orthonormal columns by Gram-Schmidt
/// over the coordinate axes.
fn complete_basis(modes: &DMatrix<f64>, k: usize) -> DMatrix<f64> {
    let dim = modes.nrows();
    let mut columns: Vec<DVector<f64>> = modes.column_iter().map(|c| c.into_owned()).collect();

    for axis in 0..dim {
        if columns.len() >= k {
            break;
        }
        let mut v = DVector::zeros(dim);
        v[axis] = 1.0;
        // second sweep restores orthogonality lost to rounding
        for _ in 0..2 {
            for c in &columns {
                let d = c.dot(&v);
                v.axpy(-d, c, 1.0);
            }
        }
        let norm = v.norm();
        if norm > SPAN_EPSILON {
            columns.push(v / norm);
        }
    }

    if columns.is_empty() {
        DMatrix::zeros(dim, 0)
    } else {
        DMatrix::from_columns(&columns)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noisy_population(count: usize, seed: u64) -> Vec<PointGroup> {
        let mut rng = StdRng::seed_from_u64(seed);
        let template = PointGroup::from_rows(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let mut shapes = Vec::with_capacity(count);
        for _ in 0..count {
            let stretch: f64 = rng.gen_range(-0.5..0.5);
            let shape: PointGroup = template
                .points()
                .iter()
                .map(|p| {
                    Point3::new(
                        p.x * (1.0 + stretch) + rng.gen_range(-0.01..0.01),
                        p.y + rng.gen_range(-0.01..0.01),
                        p.z + rng.gen_range(-0.01..0.01),
                    )
                })
                .collect();
            shapes.push(shape);
        }
        shapes
    }

    #[test]
    fn test_rejects_empty_and_mismatched() {
        assert!(matches!(
            ShapeModel::build(&[]),
            Err(ModelError::EmptyPopulation)
        ));
        let a = PointGroup::from_rows(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let b = PointGroup::from_rows(&[[0.0, 0.0, 0.0]]);
        assert!(matches!(
            ShapeModel::build(&[a, b]),
            Err(ModelError::ShapeMismatch {
                index: 1,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_basis_is_orthonormal_and_sorted() {
        let model = ShapeModel::build(&noisy_population(15, 11)).unwrap();
        let v = model.eigenvectors();
        let gram = v.transpose() * v;
        assert_relative_eq!(
            gram,
            DMatrix::identity(model.components(), model.components()),
            epsilon = 1e-8
        );
        let ev = model.eigenvalues();
        assert!(ev.iter().all(|&l| l >= 0.0));
        assert!(ev.as_slice().windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_explained_variance_is_monotone() {
        let model = ShapeModel::build(&noisy_population(15, 12)).unwrap();
        let full = 3 * model.point_count();
        let ratios: Vec<f64> = (0..=full).map(|k| model.explained_variance_ratio(k)).collect();
        assert!(ratios.windows(2).all(|w| w[0] <= w[1] + 1e-15));
        assert_relative_eq!(ratios[full], 1.0);
        // the stretch dominates
        assert!(model.explained_variance_ratio(1) > 0.9);
    }

    #[test]
    fn test_training_shape_round_trip() {
        let shapes = noisy_population(8, 13);
        let model = ShapeModel::build(&shapes).unwrap();
        let k = model.components();
        let features = model.project(&shapes[3], k).unwrap();
        let back = model.reconstruct(&features).unwrap();
        assert!(back.frobenius_distance(&shapes[3]).unwrap() < 1e-9);
    }

    #[test]
    fn test_feature_vectors_match_projection() {
        let shapes = noisy_population(6, 14);
        let model = ShapeModel::build(&shapes).unwrap();
        let fv = model.feature_vectors(2).unwrap();
        assert_eq!(fv.shape(), (6, 2));
        let projected = model.project(&shapes[2], 2).unwrap();
        assert_relative_eq!(fv.row(2).transpose(), projected, epsilon = 1e-10);
    }

    #[test]
    fn test_too_many_components() {
        let model = ShapeModel::build(&noisy_population(3, 15)).unwrap();
        assert!(matches!(
            model.basis(model.max_components() + 1),
            Err(ModelError::TooManyComponents {
                requested: 13,
                available: 12
            })
        ));
    }

    #[test]
    fn test_basis_extends_past_rank_to_full_dimension() {
        let shapes: Vec<PointGroup> = noisy_population(4, 16)
            .into_iter()
            .map(|g| g.select(&[0, 1, 2]).unwrap())
            .collect();
        let model = ShapeModel::build(&shapes).unwrap();
        assert_eq!(model.max_components(), 9);
        assert!(model.components() <= 3);

        let full = model.basis(9).unwrap();
        assert_relative_eq!(full.transpose() * &full, DMatrix::identity(9, 9), epsilon = 1e-10);
        // stored modes come first, unchanged
        let r = model.components();
        assert_relative_eq!(
            full.columns(0, r).into_owned(),
            model.eigenvectors().columns(0, r).into_owned()
        );

        for k in [5, 9] {
            let fv = model.feature_vectors(k).unwrap();
            assert_eq!(fv.shape(), (4, k));
            assert!(fv.columns(r, k - r).amax() < 1e-10);
        }
    }

    #[test]
    fn test_full_basis_reconstructs_any_shape() {
        let shapes = noisy_population(5, 17);
        let model = ShapeModel::build(&shapes).unwrap();
        let outsider = PointGroup::from_rows(&[
            [0.3, -0.2, 0.1],
            [2.0, 0.5, 0.0],
            [0.1, 1.4, -0.3],
            [-0.4, 0.2, 0.9],
        ]);

        let full = model.max_components();
        let back = model
            .reconstruct(&model.project(&outsider, full).unwrap())
            .unwrap();
        assert!(back.frobenius_distance(&outsider).unwrap() < 1e-9);

        // truncating to the stored modes loses the off-model residual
        let truncated = model
            .reconstruct(&model.project(&outsider, model.components()).unwrap())
            .unwrap();
        assert!(truncated.frobenius_distance(&outsider).unwrap() > 1e-3);
    }

    #[test]
    fn test_identical_shapes_have_no_components() {
        let shape = PointGroup::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let model = ShapeModel::build(&[shape.clone(), shape.clone()]).unwrap();
        assert_eq!(model.components(), 0);
        assert_relative_eq!(model.explained_variance_ratio(1), 1.0);
        assert_eq!(model.mean_shape(), shape);
    }
}
