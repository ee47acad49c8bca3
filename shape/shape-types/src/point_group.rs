//! Ordered 3D point sets.

// Point counts never approach 2^52
#![allow(clippy::cast_precision_loss)]

use nalgebra::{DVector, Point3, Rotation3, Vector3};

use crate::error::{ShapeError, ShapeResult};

/// An ordered, immutable sequence of 3D points (an N×3 matrix).
///
/// Operations never mutate a group in place; they return new groups. The
/// order of points is significant once correspondence has been established:
/// point `i` of every aligned group refers to the same anatomical location.
///
/// # Example
///
/// ```
/// use shape_types::PointGroup;
///
/// let group = PointGroup::from_rows(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
/// assert_eq!(group.len(), 2);
/// assert!((group.centroid().x - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointGroup {
    points: Vec<Point3<f64>>,
}

impl PointGroup {
    /// Wraps a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Builds a group from `[x, y, z]` rows.
    #[must_use]
    pub fn from_rows(rows: &[[f64; 3]]) -> Self {
        Self {
            points: rows.iter().map(|r| Point3::new(r[0], r[1], r[2])).collect(),
        }
    }

    /// Rebuilds a group from a flattened `[x0, y0, z0, x1, ...]` vector.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::FlatLengthNotMultipleOfThree`] if the vector
    /// length is not a multiple of 3.
    pub fn from_flat(flat: &DVector<f64>) -> ShapeResult<Self> {
        if flat.len() % 3 != 0 {
            return Err(ShapeError::FlatLengthNotMultipleOfThree { len: flat.len() });
        }
        let points = flat
            .as_slice()
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { points })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the group has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Borrow the points.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Consumes the group, returning its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    /// Rows as `[x, y, z]` arrays, in point order.
    #[must_use]
    pub fn to_rows(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Arithmetic mean of the points. The origin for an empty group.
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        if self.points.is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.coords).sum();
        Point3::from(sum / self.points.len() as f64)
    }

    /// Flattens to a length-3N vector `[x0, y0, z0, x1, ...]`.
    #[must_use]
    pub fn flatten(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.points.len() * 3,
            self.points.iter().flat_map(|p| [p.x, p.y, p.z]),
        )
    }

    /// Returns the group translated so its centroid sits at the origin.
    #[must_use]
    pub fn centered(&self) -> Self {
        let c = self.centroid().coords;
        self.map(|p| Point3::from(p.coords - c))
    }

    /// Applies `f` to every point, returning a new group.
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        Self {
            points: self.points.iter().map(f).collect(),
        }
    }

    /// Gathers the points at `indices`, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::IndexOutOfBounds`] if any index is out of range.
    pub fn select(&self, indices: &[usize]) -> ShapeResult<Self> {
        let points = indices
            .iter()
            .map(|&i| {
                self.points.get(i).copied().ok_or(ShapeError::IndexOutOfBounds {
                    index: i,
                    len: self.points.len(),
                })
            })
            .collect::<ShapeResult<Vec<_>>>()?;
        Ok(Self { points })
    }

    /// Recenters, scales and rotates the group about its own centroid, then
    /// places it at `target_centroid`.
    ///
    /// Each point becomes `scale · rotation · (p − centroid) + target_centroid`.
    #[must_use]
    pub fn normalized(
        &self,
        scale: f64,
        rotation: &Rotation3<f64>,
        target_centroid: &Point3<f64>,
    ) -> Self {
        let c = self.centroid().coords;
        self.map(|p| Point3::from(rotation * ((p.coords - c) * scale) + target_centroid.coords))
    }

    /// Frobenius norm of the point-wise difference to `other`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::CardinalityMismatch`] if the groups differ in
    /// length.
    pub fn frobenius_distance(&self, other: &Self) -> ShapeResult<f64> {
        if self.len() != other.len() {
            return Err(ShapeError::CardinalityMismatch {
                index: 1,
                expected: self.len(),
                actual: other.len(),
            });
        }
        let sum_sq: f64 = self
            .points
            .iter()
            .zip(&other.points)
            .map(|(a, b)| (a - b).norm_squared())
            .sum();
        Ok(sum_sq.sqrt())
    }

    /// Frobenius norm of the centered group, `‖X − mean(X)‖_F`.
    #[must_use]
    pub fn centered_norm(&self) -> f64 {
        let c = self.centroid();
        self.points
            .iter()
            .map(|p| (p - c).norm_squared())
            .sum::<f64>()
            .sqrt()
    }

    /// Euclidean distance of every point to the group centroid.
    #[must_use]
    pub fn distances_to_centroid(&self) -> Vec<f64> {
        let c = self.centroid();
        self.points.iter().map(|p| (p - c).norm()).collect()
    }

    /// Point-wise arithmetic mean of equally sized groups.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::EmptyCollection`] for an empty slice and
    /// [`ShapeError::CardinalityMismatch`] if any group differs in length
    /// from the first.
    pub fn mean_of(groups: &[Self]) -> ShapeResult<Self> {
        let first = groups.first().ok_or(ShapeError::EmptyCollection)?;
        let n = first.len();
        let mut sums = vec![Vector3::zeros(); n];
        for (index, group) in groups.iter().enumerate() {
            if group.len() != n {
                return Err(ShapeError::CardinalityMismatch {
                    index,
                    expected: n,
                    actual: group.len(),
                });
            }
            for (acc, p) in sums.iter_mut().zip(&group.points) {
                *acc += p.coords;
            }
        }
        let count = groups.len() as f64;
        Ok(Self {
            points: sums.into_iter().map(|s| Point3::from(s / count)).collect(),
        })
    }
}

impl From<Vec<Point3<f64>>> for PointGroup {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point3<f64>> for PointGroup {
    fn from_iter<T: IntoIterator<Item = Point3<f64>>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn triangle() -> PointGroup {
        PointGroup::from_rows(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 3.0, 0.0]])
    }

    #[test]
    fn test_centroid() {
        let c = triangle().centroid();
        assert_relative_eq!(c.coords, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_empty_is_origin() {
        assert_eq!(PointGroup::default().centroid(), Point3::origin());
    }

    #[test]
    fn test_flatten_and_back() {
        let group = triangle();
        let flat = group.flatten();
        assert_eq!(flat.len(), 9);
        assert_eq!(flat[3], 3.0);
        assert_eq!(PointGroup::from_flat(&flat).unwrap(), group);
    }

    #[test]
    fn test_from_flat_rejects_partial_points() {
        let flat = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            PointGroup::from_flat(&flat),
            Err(ShapeError::FlatLengthNotMultipleOfThree { len: 4 })
        ));
    }

    #[test]
    fn test_select_reorders() {
        let picked = triangle().select(&[2, 0]).unwrap();
        assert_eq!(picked.points()[0], Point3::new(0.0, 3.0, 0.0));
        assert_eq!(picked.points()[1], Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_select_out_of_bounds() {
        assert!(matches!(
            triangle().select(&[5]),
            Err(ShapeError::IndexOutOfBounds { index: 5, len: 3 })
        ));
    }

    #[test]
    fn test_normalized_moves_centroid_and_scales() {
        let target = Point3::new(10.0, -2.0, 4.0);
        let out = triangle().normalized(2.0, &Rotation3::identity(), &target);
        assert_relative_eq!(out.centroid().coords, target.coords, epsilon = 1e-12);
        assert_relative_eq!(
            out.centered_norm(),
            2.0 * triangle().centered_norm(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_normalized_rotates_about_centroid() {
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let group = PointGroup::from_rows(&[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]);
        let out = group.normalized(1.0, &rot, &Point3::origin());
        assert_relative_eq!(out.points()[0].y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.points()[1].y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_of() {
        let a = PointGroup::from_rows(&[[0.0, 0.0, 0.0], [2.0, 2.0, 2.0]]);
        let b = PointGroup::from_rows(&[[2.0, 0.0, 0.0], [4.0, 2.0, 0.0]]);
        let mean = PointGroup::mean_of(&[a, b]).unwrap();
        assert_eq!(mean.points()[0], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mean.points()[1], Point3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn test_mean_of_rejects_mismatch() {
        let a = triangle();
        let b = PointGroup::from_rows(&[[0.0, 0.0, 0.0]]);
        assert!(matches!(
            PointGroup::mean_of(&[a, b]),
            Err(ShapeError::CardinalityMismatch {
                index: 1,
                expected: 3,
                actual: 1
            })
        ));
        assert!(matches!(
            PointGroup::mean_of(&[]),
            Err(ShapeError::EmptyCollection)
        ));
    }

    #[test]
    fn test_frobenius_distance() {
        let a = triangle();
        let b = a.map(|p| Point3::new(p.x + 1.0, p.y, p.z));
        assert_relative_eq!(a.frobenius_distance(&b).unwrap(), 3.0_f64.sqrt());
    }

    #[test]
    fn test_distances_to_centroid() {
        let group = PointGroup::from_rows(&[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]);
        assert_eq!(group.distances_to_centroid(), vec![1.0, 1.0]);
    }
}
