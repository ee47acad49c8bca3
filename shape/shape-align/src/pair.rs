//! Reduction of one (reference, moving) pair to a matched, equal-length pair.

use shape_registration::{RegistrationParams, RegistrationPrimitive};
use shape_types::{PointGroup, SimilarityTransform};
use tracing::trace;

use crate::correspondence::{extract_correspondence, Correspondence};
use crate::AlignResult;

/// Registration parameters for the two passes of a pair alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct PairParams {
    /// Parameters of the rigid pass.
    pub rigid: RegistrationParams,
    /// Parameters of the deformable pass.
    pub deformable: RegistrationParams,
}

impl Default for PairParams {
    fn default() -> Self {
        Self::new(100, 1e-4)
    }
}

impl PairParams {
    /// Rigid pass with `max_iterations`; deformable pass with half of it
    /// (at least one), both at `tolerance`.
    #[must_use]
    pub fn new(max_iterations: u32, tolerance: f64) -> Self {
        Self {
            rigid: RegistrationParams::rigid()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance),
            deformable: RegistrationParams::deformable()
                .with_max_iterations((max_iterations / 2).max(1))
                .with_tolerance(tolerance),
        }
    }

    /// Enables verbose iteration events on both passes.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.rigid.verbose = verbose;
        self.deformable.verbose = verbose;
        self
    }
}

/// Output of aligning one moving set to a reference.
#[derive(Debug, Clone)]
pub struct PairAlignment {
    /// Matched subset of the original moving points, in reference order.
    pub corresponding_moving: PointGroup,
    /// Matched subset of the rigidly transformed moving points.
    pub corresponding_transformed: PointGroup,
    /// All moving points after the rigid transform.
    pub transformed: PointGroup,
    /// Similarity mapping the moving set onto the reference.
    pub transform: SimilarityTransform,
    /// The index mapping used to build the matched subsets.
    pub correspondence: Correspondence,
}

/// Aligns one moving set to a reference: rigid registration, a deformable
/// pass to sharpen correspondence, then greedy correspondence.
///
/// The deformed points only guide correspondence. The returned shapes are
/// subsets of the original and the rigidly transformed moving points, so
/// the final motion stays a pure similarity.
#[derive(Debug, Clone)]
pub struct PairAligner<R> {
    registration: R,
    params: PairParams,
}

impl<R: RegistrationPrimitive> PairAligner<R> {
    /// Creates an aligner around a registration primitive.
    pub const fn new(registration: R, params: PairParams) -> Self {
        Self {
            registration,
            params,
        }
    }

    /// The pass parameters.
    pub const fn params(&self) -> &PairParams {
        &self.params
    }

    /// The wrapped registration primitive.
    pub const fn registration(&self) -> &R {
        &self.registration
    }

    /// Aligns `moving` to `reference`.
    ///
    /// # Errors
    ///
    /// Propagates registration failures, and returns
    /// [`crate::AlignError::Cardinality`] if `reference` has more points than
    /// `moving`.
    pub fn align(&self, reference: &PointGroup, moving: &PointGroup) -> AlignResult<PairAlignment> {
        let rigid = self
            .registration
            .rigid_register(reference, moving, &self.params.rigid)?;
        let deformed = self.registration.deformable_register(
            reference,
            &rigid.transformed,
            &self.params.deformable,
        )?;
        trace!(
            rigid_iterations = rigid.stats.iterations,
            deformable_iterations = deformed.stats.iterations,
            "Pair registered"
        );

        let correspondence = extract_correspondence(reference, &deformed.transformed)?;
        Ok(PairAlignment {
            corresponding_moving: correspondence.apply(moving)?,
            corresponding_transformed: correspondence.apply(&rigid.transformed)?,
            transformed: rigid.transformed,
            transform: rigid.transform,
            correspondence,
        })
    }
}
