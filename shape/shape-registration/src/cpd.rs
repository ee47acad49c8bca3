//! Coherent Point Drift registration.

use shape_types::PointGroup;

use crate::{
    deformable, rigid, DeformableRegistration, RegistrationError, RegistrationParams,
    RegistrationPrimitive, RegistrationResult, RigidRegistration,
};

/// Coherent Point Drift: registration as Gaussian mixture fitting.
///
/// The moving points are treated as mixture centroids and the reference
/// points as data. Rigid mode estimates a similarity transform; deformable
/// mode estimates a smooth displacement field regularized by a Gaussian
/// kernel. Both are deterministic.
///
/// # Example
///
/// ```
/// use shape_registration::{CoherentPointDrift, RegistrationParams, RegistrationPrimitive};
/// use shape_types::PointGroup;
///
/// let reference = PointGroup::from_rows(&[
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ]);
/// let moving = reference.map(|p| p + nalgebra::Vector3::new(0.2, 0.0, 0.0));
///
/// let cpd = CoherentPointDrift::new();
/// let result = cpd
///     .rigid_register(&reference, &moving, &RegistrationParams::rigid())
///     .unwrap();
/// assert!(result.transformed.frobenius_distance(&reference).unwrap() < 1e-2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoherentPointDrift {
    /// Weight of the uniform outlier component, in `[0, 1)` (default: 0).
    pub outlier_weight: f64,
    /// Deformation regularization strength (default: 2).
    pub alpha: f64,
    /// Width of the Gaussian deformation kernel (default: 2).
    pub beta: f64,
}

impl Default for CoherentPointDrift {
    fn default() -> Self {
        Self {
            outlier_weight: 0.0,
            alpha: 2.0,
            beta: 2.0,
        }
    }
}

impl CoherentPointDrift {
    /// Creates a solver with default mixture parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outlier weight.
    #[must_use]
    pub const fn with_outlier_weight(mut self, weight: f64) -> Self {
        self.outlier_weight = weight;
        self
    }

    /// Sets the deformation regularization strength.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the deformation kernel width.
    #[must_use]
    pub const fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    fn check(
        &self,
        reference: &PointGroup,
        moving: &PointGroup,
        params: &RegistrationParams,
    ) -> RegistrationResult<()> {
        if reference.is_empty() {
            return Err(RegistrationError::EmptyReference);
        }
        if moving.is_empty() {
            return Err(RegistrationError::EmptyMoving);
        }
        params.validate()?;
        if !(0.0..1.0).contains(&self.outlier_weight) {
            return Err(RegistrationError::InvalidParameter(format!(
                "outlier_weight must be in [0, 1), got {}",
                self.outlier_weight
            )));
        }
        Ok(())
    }
}

impl RegistrationPrimitive for CoherentPointDrift {
    fn rigid_register(
        &self,
        reference: &PointGroup,
        moving: &PointGroup,
        params: &RegistrationParams,
    ) -> RegistrationResult<RigidRegistration> {
        self.check(reference, moving, params)?;
        rigid::register(reference, moving, params, self.outlier_weight)
    }

    fn deformable_register(
        &self,
        reference: &PointGroup,
        moving: &PointGroup,
        params: &RegistrationParams,
    ) -> RegistrationResult<DeformableRegistration> {
        self.check(reference, moving, params)?;
        if !(self.alpha > 0.0 && self.beta > 0.0) {
            return Err(RegistrationError::InvalidParameter(format!(
                "alpha and beta must be positive, got {} and {}",
                self.alpha, self.beta
            )));
        }
        deformable::register(
            reference,
            moving,
            params,
            self.outlier_weight,
            self.alpha,
            self.beta,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Registration, RegistrationMode};

    fn tetra() -> PointGroup {
        PointGroup::from_rows(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    #[test]
    fn test_rejects_empty_inputs() {
        let cpd = CoherentPointDrift::new();
        let params = RegistrationParams::rigid();
        assert!(matches!(
            cpd.rigid_register(&PointGroup::default(), &tetra(), &params),
            Err(RegistrationError::EmptyReference)
        ));
        assert!(matches!(
            cpd.deformable_register(&tetra(), &PointGroup::default(), &params),
            Err(RegistrationError::EmptyMoving)
        ));
    }

    #[test]
    fn test_rejects_bad_outlier_weight() {
        let cpd = CoherentPointDrift::new().with_outlier_weight(1.0);
        assert!(matches!(
            cpd.rigid_register(&tetra(), &tetra(), &RegistrationParams::rigid()),
            Err(RegistrationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_register_dispatches_on_mode() {
        let cpd = CoherentPointDrift::new();
        let rigid = cpd
            .register(&tetra(), &tetra(), &RegistrationParams::rigid())
            .unwrap();
        assert!(matches!(rigid, Registration::Rigid(_)));

        let params = RegistrationParams::default();
        assert_eq!(params.mode, RegistrationMode::Rigid);
        let deformable = cpd
            .register(&tetra(), &tetra(), &RegistrationParams::deformable())
            .unwrap();
        assert!(matches!(deformable, Registration::Deformable(_)));
        assert_eq!(deformable.transformed().len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let cpd = CoherentPointDrift::new();
        let moving = tetra().map(|p| p * 1.1);
        let a = cpd
            .rigid_register(&tetra(), &moving, &RegistrationParams::rigid())
            .unwrap();
        let b = cpd
            .rigid_register(&tetra(), &moving, &RegistrationParams::rigid())
            .unwrap();
        assert_eq!(a.transformed, b.transformed);
        assert_eq!(a.transform, b.transform);
    }
}
