//! Reconstruction of held-out shapes through a truncated PCA basis.

// Counts never approach 2^52
#![allow(clippy::cast_precision_loss)]

use nalgebra::DVector;
use shape_align::{align_batch, PairAligner, ParallelMap, Phase};
use shape_registration::RegistrationPrimitive;
use shape_types::{PointGroup, Sample, SimilarityTransform, Tag};
use tracing::info;

use crate::error::{ModelError, ModelResult};
use crate::pca::ShapeModel;

/// Mean, maximum and minimum of a set of distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Largest value.
    pub max: f64,
    /// Smallest value.
    pub min: f64,
}

impl ErrorStats {
    /// Summarises `values`; `None` if there are none.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (sum, max, min) = values.iter().fold(
            (0.0, f64::NEG_INFINITY, f64::INFINITY),
            |(s, hi, lo), &v| (s + v, hi.max(v), lo.min(v)),
        );
        Some(Self {
            mean: sum / values.len() as f64,
            max,
            min,
        })
    }
}

/// Reconstruction of one held-out shape.
#[derive(Debug, Clone)]
pub struct SampleReconstruction {
    /// Provenance.
    pub tag: Tag,
    /// Correspondence-matched original points, in the sample's own frame.
    pub original: PointGroup,
    /// Reconstruction mapped back into the sample's own frame.
    pub reconstructed: PointGroup,
    /// Similarity used to align the sample to the mean shape.
    pub transform: SimilarityTransform,
    /// Coordinates in the truncated PCA basis.
    pub features: DVector<f64>,
    /// Euclidean error of every point.
    pub point_errors: Vec<f64>,
    /// Point errors divided by each original point's distance to its centroid.
    pub relative_point_errors: Vec<f64>,
    /// `‖e‖₂` of the flattened error.
    pub error_norm: f64,
    /// `error_norm` divided by the norm of the centred original.
    pub relative_error_norm: f64,
}

/// Aggregate result of a validation pass.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Per-sample results, in input order.
    pub samples: Vec<SampleReconstruction>,
    /// Statistics over every absolute point error.
    pub absolute: ErrorStats,
    /// Statistics over every relative point error.
    pub relative: ErrorStats,
}

/// Aligns held-out shapes to a model's mean shape, reconstructs them from
/// `components` principal modes and measures the error in their own frame.
#[derive(Debug, Clone)]
pub struct ReconstructionValidator<R> {
    pair: PairAligner<R>,
    components: usize,
}

impl<R: RegistrationPrimitive> ReconstructionValidator<R> {
    /// Creates a validator using `components` principal modes.
    pub const fn new(pair: PairAligner<R>, components: usize) -> Self {
        Self { pair, components }
    }

    /// Number of principal modes used.
    pub const fn components(&self) -> usize {
        self.components
    }

    /// Runs the validation pass.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyPopulation`] for an empty held-out set,
    /// [`ModelError::TooManyComponents`] if `components` exceeds the 3M
    /// size of the model's eigenbasis, and [`ModelError::Align`] if any
    /// sample fails to align.
    pub fn validate<P: ParallelMap>(
        &self,
        pool: &P,
        model: &ShapeModel,
        samples: &[Sample],
    ) -> ModelResult<ValidationReport> {
        if samples.is_empty() {
            return Err(ModelError::EmptyPopulation);
        }
        // fail before any registration work
        model.basis(self.components)?;

        let reference = model.mean_shape();
        let alignments = align_batch(&self.pair, pool, Phase::Validate, &reference, samples)?;

        let mut results = Vec::with_capacity(samples.len());
        for (sample, alignment) in samples.iter().zip(alignments) {
            let features = model.project(&alignment.corresponding_transformed, self.components)?;
            let aligned_reconstruction = model.reconstruct(&features)?;
            let reconstructed = alignment
                .transform
                .inverse_transform_group(&aligned_reconstruction);
            results.push(measure(
                sample.tag,
                alignment.corresponding_moving,
                reconstructed,
                alignment.transform,
                features,
            )?);
        }

        let absolute: Vec<f64> = results.iter().flat_map(|r| r.point_errors.clone()).collect();
        let relative: Vec<f64> = results
            .iter()
            .flat_map(|r| r.relative_point_errors.clone())
            .collect();
        let absolute = ErrorStats::from_values(&absolute).ok_or(ModelError::EmptyPopulation)?;
        let relative = ErrorStats::from_values(&relative).ok_or(ModelError::EmptyPopulation)?;

        info!(
            samples = results.len(),
            components = self.components,
            mean_distance = absolute.mean,
            max_distance = absolute.max,
            min_distance = absolute.min,
            mean_relative = relative.mean,
            max_relative = relative.max,
            min_relative = relative.min,
            "Validation finished"
        );

        Ok(ValidationReport {
            samples: results,
            absolute,
            relative,
        })
    }
}

fn measure(
    tag: Tag,
    original: PointGroup,
    reconstructed: PointGroup,
    transform: SimilarityTransform,
    features: DVector<f64>,
) -> ModelResult<SampleReconstruction> {
    let error_norm = original.frobenius_distance(&reconstructed)?;
    let point_errors: Vec<f64> = original
        .points()
        .iter()
        .zip(reconstructed.points())
        .map(|(a, b)| (a - b).norm())
        .collect();
    let relative_point_errors = point_errors
        .iter()
        .zip(original.distances_to_centroid())
        .map(|(e, d)| e / d.max(f64::EPSILON))
        .collect();
    let relative_error_norm = error_norm / original.centered_norm().max(f64::EPSILON);

    Ok(SampleReconstruction {
        tag,
        original,
        reconstructed,
        transform,
        features,
        point_errors,
        relative_point_errors,
        error_norm,
        relative_error_norm,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_error_stats() {
        let stats = ErrorStats::from_values(&[1.0, 4.0, 2.5]).unwrap();
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.min, 1.0);
        assert!(ErrorStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_measure_relative_to_centroid_distance() {
        let original = PointGroup::from_rows(&[[-2.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        let reconstructed = PointGroup::from_rows(&[[-2.0, 1.0, 0.0], [2.0, 0.0, 0.0]]);
        let m = measure(
            Tag::new(1, shape_types::Arch::Upper),
            original,
            reconstructed,
            SimilarityTransform::identity(),
            DVector::zeros(0),
        )
        .unwrap();
        assert_eq!(m.point_errors, vec![1.0, 0.0]);
        assert_eq!(m.relative_point_errors, vec![0.5, 0.0]);
        assert_relative_eq!(m.error_norm, 1.0);
        assert_relative_eq!(m.relative_error_norm, 1.0 / 8.0_f64.sqrt());
    }
}
