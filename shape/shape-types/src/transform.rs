//! Similarity transforms produced by rigid registration.

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

use crate::error::{ShapeError, ShapeResult};
use crate::point_group::PointGroup;

/// Tolerance used when checking a rotation matrix for orthonormality.
const ORTHONORMAL_EPSILON: f64 = 1e-6;

/// A similarity transform: uniform scale, rotation and translation.
///
/// The transformation is applied in the order: scale -> rotate -> translate,
/// i.e. `p' = scale · rotation · p + translation`. The inverse undoes these
/// in reverse: subtract the translation, apply the inverse rotation, divide
/// by the scale.
///
/// # Example
///
/// ```
/// use shape_types::SimilarityTransform;
/// use nalgebra::{Point3, Rotation3, Vector3};
/// use std::f64::consts::PI;
///
/// let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
/// let transform =
///     SimilarityTransform::new(2.0, rotation, Vector3::new(1.0, 0.0, 0.0)).unwrap();
///
/// let p = transform.transform_point(&Point3::new(1.0, 0.0, 0.0));
/// assert!((p - Point3::new(1.0, 2.0, 0.0)).norm() < 1e-12);
///
/// let back = transform.inverse_transform_point(&p);
/// assert!((back - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    scale: f64,
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SimilarityTransform {
    /// Creates a transform from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidScale`] unless `scale` is positive and
    /// finite.
    pub fn new(
        scale: f64,
        rotation: Rotation3<f64>,
        translation: Vector3<f64>,
    ) -> ShapeResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ShapeError::InvalidScale(scale));
        }
        Ok(Self {
            scale,
            rotation,
            translation,
        })
    }

    /// Creates a transform from a raw 3×3 matrix, checking it is a proper
    /// rotation (orthonormal, determinant +1).
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::ImproperRotation`] for a matrix that is not a
    /// rotation and [`ShapeError::InvalidScale`] for a bad scale.
    pub fn from_matrix(
        scale: f64,
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
    ) -> ShapeResult<Self> {
        let determinant = rotation.determinant();
        let orthonormal =
            (rotation.transpose() * rotation - Matrix3::identity()).amax() <= ORTHONORMAL_EPSILON;
        if !orthonormal || (determinant - 1.0).abs() > ORTHONORMAL_EPSILON {
            return Err(ShapeError::ImproperRotation { determinant });
        }
        // SVD output drifts off orthonormal by a few ulps
        let mut rotation = Rotation3::from_matrix_unchecked(rotation);
        rotation.renormalize();
        Self::new(scale, rotation, translation)
    }

    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Uniform scale factor.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotation.
    #[must_use]
    pub const fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    /// Translation.
    #[must_use]
    pub const fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Transforms a point: scale, then rotate, then translate.
    #[must_use]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * (point.coords * self.scale) + self.translation)
    }

    /// Maps a transformed point back: untranslate, unrotate, unscale.
    #[must_use]
    pub fn inverse_transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let untranslated = point.coords - self.translation;
        let unrotated = self.rotation.inverse() * untranslated;
        Point3::from(unrotated / self.scale)
    }

    /// Transforms every point of a group.
    #[must_use]
    pub fn transform_group(&self, group: &PointGroup) -> PointGroup {
        group.map(|p| self.transform_point(p))
    }

    /// Maps every point of a transformed group back to its original frame.
    #[must_use]
    pub fn inverse_transform_group(&self, group: &PointGroup) -> PointGroup {
        group.map(|p| self.inverse_transform_point(p))
    }

    /// Composes this transform with another (self * other).
    ///
    /// The result applies `other` first, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            scale: self.scale * other.scale,
            rotation: self.rotation * other.rotation,
            translation: self.translation + self.rotation * (other.translation * self.scale),
        }
    }

    /// Computes the inverse of this transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_scale = 1.0 / self.scale;
        let inv_rotation = self.rotation.inverse();
        Self {
            scale: inv_scale,
            rotation: inv_rotation,
            translation: inv_rotation * (-self.translation * inv_scale),
        }
    }

    /// Rotation angle in radians, in `[0, π]`.
    ///
    /// The cosine is clamped, so rotations a rounding error away from the
    /// identity report `0` rather than NaN.
    #[must_use]
    pub fn rotation_angle(&self) -> f64 {
        ((self.rotation.matrix().trace() - 1.0) / 2.0)
            .clamp(-1.0, 1.0)
            .acos()
    }

    /// Rotation angle between this transform's rotation and `other`'s.
    #[must_use]
    pub fn rotation_angle_to(&self, other: &Self) -> f64 {
        let relative = self.rotation.inverse() * other.rotation;
        ((relative.matrix().trace() - 1.0) / 2.0)
            .clamp(-1.0, 1.0)
            .acos()
    }

    /// Returns true if this transform is approximately the identity.
    #[must_use]
    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.rotation_angle() < epsilon
            && self.translation.norm() < epsilon
            && (self.scale - 1.0).abs() < epsilon
    }
}

/// Averages rotations by averaging their `(roll, pitch, yaw)` Euler angles.
///
/// Only meaningful for rotations clustered well away from the ±π wrap of
/// the angles. Returns the identity for an empty slice.
///
/// # Example
///
/// ```
/// use shape_types::mean_rotation;
/// use nalgebra::Rotation3;
///
/// let a = Rotation3::from_euler_angles(0.1, 0.0, 0.0);
/// let b = Rotation3::from_euler_angles(0.3, 0.0, 0.0);
/// let mean = mean_rotation(&[a, b]);
/// assert!((mean.euler_angles().0 - 0.2).abs() < 1e-12);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_rotation(rotations: &[Rotation3<f64>]) -> Rotation3<f64> {
    if rotations.is_empty() {
        return Rotation3::identity();
    }
    let (roll, pitch, yaw) = rotations.iter().fold((0.0, 0.0, 0.0), |acc, r| {
        let (x, y, z) = r.euler_angles();
        (acc.0 + x, acc.1 + y, acc.2 + z)
    });
    let n = rotations.len() as f64;
    Rotation3::from_euler_angles(roll / n, pitch / n, yaw / n)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn sample_transform() -> SimilarityTransform {
        let rotation = Rotation3::from_euler_angles(0.3, -0.2, 1.1);
        SimilarityTransform::new(1.7, rotation, Vector3::new(4.0, -1.0, 2.5)).unwrap()
    }

    #[test]
    fn test_identity_transform() {
        let point = Point3::new(1.0, 2.0, 3.0);
        let result = SimilarityTransform::identity().transform_point(&point);
        assert_relative_eq!(result.coords, point.coords, epsilon = 1e-12);
    }

    #[test]
    fn test_order_is_scale_rotate_translate() {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let t = SimilarityTransform::new(3.0, rotation, Vector3::new(0.0, 0.0, 1.0)).unwrap();
        let p = t.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.coords, Vector3::new(0.0, 3.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_point_round_trip() {
        let t = sample_transform();
        let point = Point3::new(-2.0, 0.5, 7.0);
        let back = t.inverse_transform_point(&t.transform_point(&point));
        assert_relative_eq!(back.coords, point.coords, epsilon = 1e-10);
    }

    #[test]
    fn test_inverse_matches_inverse_transform_point() {
        let t = sample_transform();
        let point = Point3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(
            t.inverse().transform_point(&point).coords,
            t.inverse_transform_point(&point).coords,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_from_matrix_near_identity_has_finite_angle() {
        // trace slightly above 3, as an SVD of identical clouds produces
        let mut m = Matrix3::identity();
        m[(0, 0)] += 4e-16;
        m[(1, 1)] += 4e-16;
        m[(2, 2)] += 4e-16;
        let t = SimilarityTransform::from_matrix(1.0, m, Vector3::zeros()).unwrap();

        let r = t.rotation().matrix();
        assert!((r.transpose() * r - Matrix3::identity()).amax() < 1e-14);
        assert!(t.rotation_angle().is_finite());
        assert!(t.is_identity(1e-6));
    }

    #[test]
    fn test_rotation_angle_to() {
        let a = SimilarityTransform::new(
            1.0,
            Rotation3::from_euler_angles(0.0, 0.0, 0.2),
            Vector3::zeros(),
        )
        .unwrap();
        let b = SimilarityTransform::new(
            2.0,
            Rotation3::from_euler_angles(0.0, 0.0, 0.5),
            Vector3::zeros(),
        )
        .unwrap();
        assert_relative_eq!(a.rotation_angle_to(&b), 0.3, epsilon = 1e-12);
        assert_relative_eq!(a.rotation_angle_to(&a), 0.0);
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let t = sample_transform();
        assert!(t.compose(&t.inverse()).is_identity(1e-10));
    }

    #[test]
    fn test_compose_order() {
        let scale = SimilarityTransform::new(2.0, Rotation3::identity(), Vector3::zeros()).unwrap();
        let shift =
            SimilarityTransform::new(1.0, Rotation3::identity(), Vector3::new(1.0, 0.0, 0.0))
                .unwrap();
        // shift first, then scale
        let p = scale.compose(&shift).transform_point(&Point3::origin());
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_scale() {
        for s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(SimilarityTransform::new(s, Rotation3::identity(), Vector3::zeros()).is_err());
        }
    }

    #[test]
    fn test_from_matrix_rejects_reflection() {
        let reflection = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0);
        assert!(matches!(
            SimilarityTransform::from_matrix(1.0, reflection, Vector3::zeros()),
            Err(ShapeError::ImproperRotation { .. })
        ));
    }

    #[test]
    fn test_from_matrix_accepts_rotation() {
        let r = Rotation3::from_euler_angles(0.1, 0.2, 0.3);
        let t = SimilarityTransform::from_matrix(1.0, *r.matrix(), Vector3::zeros()).unwrap();
        assert_relative_eq!(t.rotation().matrix(), r.matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_group_round_trip() {
        let t = sample_transform();
        let group = PointGroup::from_rows(&[[0.0, 1.0, 2.0], [3.0, -4.0, 5.0]]);
        let back = t.inverse_transform_group(&t.transform_group(&group));
        assert!(back.frobenius_distance(&group).unwrap() < 1e-10);
    }

    #[test]
    fn test_mean_rotation_empty_is_identity() {
        assert_eq!(mean_rotation(&[]), Rotation3::identity());
    }

    #[test]
    fn test_mean_rotation_of_identical_rotations() {
        let r = Rotation3::from_euler_angles(0.2, -0.1, 0.4);
        let mean = mean_rotation(&[r, r, r]);
        assert_relative_eq!(mean.matrix(), r.matrix(), epsilon = 1e-12);
    }
}
