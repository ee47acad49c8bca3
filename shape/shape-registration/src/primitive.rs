//! The registration capability consumed by alignment pipelines.

use nalgebra::DMatrix;
use shape_types::{PointGroup, SimilarityTransform};

use crate::{RegistrationMode, RegistrationParams, RegistrationResult};

/// Convergence information shared by every registration result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrationStats {
    /// Number of EM iterations performed.
    pub iterations: u32,
    /// Whether the convergence criterion was met within the budget.
    pub converged: bool,
    /// Final Gaussian mixture variance.
    pub variance: f64,
}

/// Result of a rigid (similarity) registration.
#[derive(Debug, Clone)]
pub struct RigidRegistration {
    /// The moving set after applying [`Self::transform`].
    pub transformed: PointGroup,
    /// Similarity parameters mapping the moving set onto the reference.
    pub transform: SimilarityTransform,
    /// Convergence information.
    pub stats: RegistrationStats,
}

/// Control parameters of a Gaussian-kernel displacement field.
///
/// The displaced moving set is `Y + G · W`.
#[derive(Debug, Clone)]
pub struct DeformationField {
    /// Gaussian affinity matrix between moving points (M×M).
    pub kernel: DMatrix<f64>,
    /// Displacement coefficients (M×3).
    pub coefficients: DMatrix<f64>,
}

/// Result of a deformable registration.
#[derive(Debug, Clone)]
pub struct DeformableRegistration {
    /// The moving set after deformation.
    pub transformed: PointGroup,
    /// The fitted displacement field.
    pub field: DeformationField,
    /// Convergence information.
    pub stats: RegistrationStats,
}

/// Output of [`RegistrationPrimitive::register`], tagged by motion model.
#[derive(Debug, Clone)]
pub enum Registration {
    /// Rigid result.
    Rigid(RigidRegistration),
    /// Deformable result.
    Deformable(DeformableRegistration),
}

impl Registration {
    /// The transformed moving set.
    #[must_use]
    pub const fn transformed(&self) -> &PointGroup {
        match self {
            Self::Rigid(r) => &r.transformed,
            Self::Deformable(d) => &d.transformed,
        }
    }

    /// Convergence information.
    #[must_use]
    pub const fn stats(&self) -> &RegistrationStats {
        match self {
            Self::Rigid(r) => &r.stats,
            Self::Deformable(d) => &d.stats,
        }
    }
}

/// A point-set registration capability.
///
/// Given a fixed `reference` set and a `moving` set, estimates the motion
/// that brings `moving` onto `reference`. Implementations must be
/// deterministic: identical inputs yield identical outputs, so alignment
/// results are reproducible.
///
/// Implementations must be `Send + Sync`; one instance is shared by all
/// workers of a parallel alignment phase.
pub trait RegistrationPrimitive: Send + Sync {
    /// Estimates a similarity transform from `moving` onto `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error for empty inputs, invalid parameters, or a
    /// degenerate optimization.
    fn rigid_register(
        &self,
        reference: &PointGroup,
        moving: &PointGroup,
        params: &RegistrationParams,
    ) -> RegistrationResult<RigidRegistration>;

    /// Estimates a smooth displacement of `moving` onto `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error for empty inputs, invalid parameters, a singular
    /// system, or a degenerate optimization.
    fn deformable_register(
        &self,
        reference: &PointGroup,
        moving: &PointGroup,
        params: &RegistrationParams,
    ) -> RegistrationResult<DeformableRegistration>;

    /// Dispatches on [`RegistrationParams::mode`].
    ///
    /// # Errors
    ///
    /// Propagates the error of the selected registration.
    fn register(
        &self,
        reference: &PointGroup,
        moving: &PointGroup,
        params: &RegistrationParams,
    ) -> RegistrationResult<Registration> {
        match params.mode {
            RegistrationMode::Rigid => self
                .rigid_register(reference, moving, params)
                .map(Registration::Rigid),
            RegistrationMode::Deformable => self
                .deformable_register(reference, moving, params)
                .map(Registration::Deformable),
        }
    }
}
