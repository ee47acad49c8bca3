//! Iterative alignment of a whole training population.
//!
//! Every training sample is aligned to an evolving reference shape. After
//! each pass the reference becomes the point-wise mean of the aligned
//! shapes, corrected for the population's average rotation and scale and
//! recentred on the global mean centroid. Once the reference stops moving
//! (or the budget runs out) a final pass re-aligns the previous pass's
//! correspondence shapes, so every output has the reference cardinality.

// Sample counts never approach 2^52
#![allow(clippy::cast_precision_loss)]

use nalgebra::{Point3, Rotation3, Vector3};
use shape_registration::RegistrationPrimitive;
use shape_types::{mean_rotation, PointGroup, Sample, ShapeError, SimilarityTransform, Tag};
use tracing::{info, warn};

use crate::error::{Phase, SampleFailure};
use crate::pair::{PairAligner, PairAlignment};
use crate::parallel::ParallelMap;
use crate::{AlignError, AlignResult};

/// Parameters of the population loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationParams {
    /// Total pass budget including the final pass; must exceed 1 (default: 4).
    pub max_global_iterations: u32,
    /// Threshold on the relative reference change (default: 1e-2).
    pub eps: f64,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            max_global_iterations: 4,
            eps: 1e-2,
        }
    }
}

impl PopulationParams {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pass budget.
    #[must_use]
    pub const fn with_max_global_iterations(mut self, iterations: u32) -> Self {
        self.max_global_iterations = iterations;
        self
    }

    /// Sets the convergence threshold.
    #[must_use]
    pub const fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Checks the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::InvalidParameter`] for a budget of 1 or less or
    /// a non-positive threshold.
    pub fn validate(&self) -> AlignResult<()> {
        if self.max_global_iterations <= 1 {
            return Err(AlignError::InvalidParameter(format!(
                "max_global_iterations must be greater than 1, got {}",
                self.max_global_iterations
            )));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(AlignError::InvalidParameter(format!(
                "eps must be positive, got {}",
                self.eps
            )));
        }
        Ok(())
    }
}

/// One training sample after population alignment.
#[derive(Debug, Clone)]
pub struct AlignedSample {
    /// Provenance.
    pub tag: Tag,
    /// Correspondence-matched points in the reference frame.
    pub aligned: PointGroup,
    /// The same matched points in the sample's original frame.
    pub original: PointGroup,
    /// Similarity taking `original` to `aligned`.
    pub transform: SimilarityTransform,
}

/// Output of [`PopulationAligner::align`].
#[derive(Debug, Clone)]
pub struct PopulationAlignment {
    /// The converged reference shape.
    pub reference: PointGroup,
    /// Aligned samples, in input order.
    pub samples: Vec<AlignedSample>,
    /// Refinement passes run (excluding the final pass).
    pub iterations: u32,
    /// Whether the relative change dropped below `eps`.
    pub converged: bool,
    /// Relative reference change recorded after each refinement pass.
    pub relative_diffs: Vec<f64>,
}

impl PopulationAlignment {
    /// Aligned shapes, in input order.
    #[must_use]
    pub fn aligned_groups(&self) -> Vec<PointGroup> {
        self.samples.iter().map(|s| s.aligned.clone()).collect()
    }

    /// Per-sample transforms, in input order.
    #[must_use]
    pub fn transforms(&self) -> Vec<(Tag, SimilarityTransform)> {
        self.samples.iter().map(|s| (s.tag, s.transform)).collect()
    }
}

/// Aligns every sample to `reference` on `pool`, as one barrier-synchronised
/// phase.
///
/// # Errors
///
/// Returns [`AlignError::PhaseFailed`] listing every failing tag if any
/// sample fails. No partial result is returned.
pub fn align_batch<R, P>(
    aligner: &PairAligner<R>,
    pool: &P,
    phase: Phase,
    reference: &PointGroup,
    samples: &[Sample],
) -> AlignResult<Vec<PairAlignment>>
where
    R: RegistrationPrimitive,
    P: ParallelMap,
{
    let results = pool.map(samples, |sample| aligner.align(reference, &sample.group));

    let mut alignments = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (sample, result) in samples.iter().zip(results) {
        match result {
            Ok(alignment) => alignments.push(alignment),
            Err(reason) => failures.push(SampleFailure {
                tag: sample.tag,
                reason,
            }),
        }
    }

    if failures.is_empty() {
        Ok(alignments)
    } else {
        warn!(%phase, failed = failures.len(), "Alignment phase failed");
        Err(AlignError::PhaseFailed { phase, failures })
    }
}

/// Drives the iterative population alignment.
#[derive(Debug, Clone)]
pub struct PopulationAligner<R> {
    pair: PairAligner<R>,
    params: PopulationParams,
}

impl<R: RegistrationPrimitive> PopulationAligner<R> {
    /// Creates an aligner.
    pub const fn new(pair: PairAligner<R>, params: PopulationParams) -> Self {
        Self { pair, params }
    }

    /// The pair aligner used for every sample.
    pub const fn pair(&self) -> &PairAligner<R> {
        &self.pair
    }

    /// Aligns `samples` starting from `initial_reference`.
    ///
    /// `initial_reference` must have no more points than the smallest
    /// sample.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid parameters, an empty population, an
    /// oversized initial reference, or any failed phase.
    pub fn align<P: ParallelMap>(
        &self,
        pool: &P,
        initial_reference: &PointGroup,
        samples: &[Sample],
    ) -> AlignResult<PopulationAlignment> {
        self.params.validate()?;
        if samples.is_empty() {
            return Err(AlignError::EmptyPopulation);
        }
        if initial_reference.is_empty() {
            return Err(ShapeError::EmptyGroup.into());
        }
        let smallest = samples.iter().map(Sample::len).min().unwrap_or(0);
        if initial_reference.len() > smallest {
            return Err(AlignError::Cardinality {
                reference: initial_reference.len(),
                moving: smallest,
            });
        }

        let mean_centroid = mean_centroid(samples);
        let mut reference = initial_reference.normalized(1.0, &Rotation3::identity(), &mean_centroid);
        let mut previous = reference.clone();
        let mut correspondence_shapes: Vec<Sample> = Vec::new();
        let mut relative_diffs = Vec::new();
        let mut converged = false;

        for iteration in 1..self.params.max_global_iterations {
            let phase = Phase::Refine { iteration };
            let alignments = align_batch(&self.pair, pool, phase, &reference, samples)?;

            reference = next_reference(&alignments, &mean_centroid)?;
            correspondence_shapes = samples
                .iter()
                .zip(&alignments)
                .map(|(s, a)| Sample::new(s.tag, a.corresponding_moving.clone()))
                .collect();

            let frobenius_diff = reference.frobenius_distance(&previous)?;
            let relative_diff = frobenius_diff / reference.centered_norm();
            relative_diffs.push(relative_diff);
            info!(
                %phase,
                iteration,
                frobenius_diff,
                relative_diff,
                "Reference updated"
            );

            if relative_diff < self.params.eps {
                converged = true;
                break;
            }
            previous = reference.clone();
        }

        let iterations = relative_diffs.len() as u32;
        if converged {
            info!(iterations, "Population alignment converged");
        } else {
            warn!(
                iterations,
                eps = self.params.eps,
                "Population alignment budget exhausted before convergence"
            );
        }

        let finals = align_batch(
            &self.pair,
            pool,
            Phase::Finalize,
            &reference,
            &correspondence_shapes,
        )?;
        let samples = correspondence_shapes
            .iter()
            .zip(finals)
            .map(|(s, a)| AlignedSample {
                tag: s.tag,
                aligned: a.corresponding_transformed,
                original: a.corresponding_moving,
                transform: a.transform,
            })
            .collect();

        Ok(PopulationAlignment {
            reference,
            samples,
            iterations,
            converged,
            relative_diffs,
        })
    }
}

/// Mean of the per-sample centroids.
fn mean_centroid(samples: &[Sample]) -> Point3<f64> {
    let sum: Vector3<f64> = samples.iter().map(|s| s.group.centroid().coords).sum();
    Point3::from(sum / samples.len() as f64)
}

/// Point-wise mean of the aligned shapes, with the average rotation undone,
/// the average scale normalised to 1 and the centroid fixed.
fn next_reference(
    alignments: &[PairAlignment],
    mean_centroid: &Point3<f64>,
) -> AlignResult<PointGroup> {
    let aligned: Vec<PointGroup> = alignments
        .iter()
        .map(|a| a.corresponding_transformed.clone())
        .collect();
    let mean_shape = PointGroup::mean_of(&aligned)?;

    let mean_scale =
        alignments.iter().map(|a| a.transform.scale()).sum::<f64>() / alignments.len() as f64;
    // Euler mean of the inverse rotations, i.e. the transposed average
    let inverses: Vec<Rotation3<f64>> = alignments
        .iter()
        .map(|a| a.transform.rotation().inverse())
        .collect();
    let correction = mean_rotation(&inverses);

    Ok(mean_shape.normalized(1.0 / mean_scale, &correction, mean_centroid))
}
