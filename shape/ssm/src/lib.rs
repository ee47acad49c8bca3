//! Statistical shape models from irregularly sampled point clouds.
//!
//! This umbrella crate re-exports the shape-* crates, which together turn a
//! population of point clouds of the same structure (one tooth across many
//! patients) into a correspondence-consistent PCA shape model.
//!
//! # Quick Start
//!
//! ```no_run
//! use ssm::prelude::*;
//!
//! let dataset = ToothDataset::load_dir("data/11").unwrap();
//! let training = training_tags(0, 129, &[Arch::Upper, Arch::Lower]);
//! let (train, _test) = dataset.partition(&training);
//!
//! let reference = FarthestPointSampler.downsample(&train[0].group, 1500);
//! let aligner = PopulationAligner::new(
//!     PairAligner::new(CoherentPointDrift::new(), PairParams::default()),
//!     PopulationParams::default(),
//! );
//! let pool = WorkerPool::new(0).unwrap();
//! let aligned = aligner.align(&pool, &reference, &train).unwrap();
//! pool.shutdown();
//!
//! let model = ShapeModel::build(&aligned.aligned_groups()).unwrap();
//! println!("{:.2}% explained", 100.0 * model.explained_variance_ratio(60));
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - `PointGroup`, `Tag`, `Sample`, `SimilarityTransform`
//! - [`registration`] - `RegistrationPrimitive` and Coherent Point Drift
//! - [`align`] - Correspondence, pair and population alignment, worker pool
//! - [`model`] - PCA shape model and reconstruction validation
//! - [`io`] - Point files, tooth datasets, downsampling, stores

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

// =============================================================================
// Re-exports
// =============================================================================

/// Point groups, tags and similarity transforms.
pub use shape_types as types;

/// Registration primitive and Coherent Point Drift.
pub use shape_registration as registration;

/// Correspondence extraction and population alignment.
pub use shape_align as align;

/// PCA shape model and reconstruction validation.
pub use shape_model as model;

/// Point files, datasets, downsampling and persistence.
pub use shape_io as io;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for building shape models.
///
/// # Usage
///
/// ```
/// use ssm::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use shape_types::{Arch, PointGroup, Sample, SimilarityTransform, Tag};

    // Registration
    pub use shape_registration::{CoherentPointDrift, RegistrationParams, RegistrationPrimitive};

    // Alignment
    pub use shape_align::{
        extract_correspondence, PairAligner, PairParams, ParallelMap, PopulationAligner,
        PopulationParams, Sequential, WorkerPool,
    };

    // Model
    pub use shape_model::{ReconstructionValidator, ShapeModel, ValidationReport};

    // I/O
    pub use shape_io::{
        training_tags, AlignedShapeStore, Downsampler, FarthestPointSampler, ToothDataset,
        TransformFile, TransformStore,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use prelude::*;

        let group = PointGroup::default();
        assert!(group.is_empty());
        assert_eq!(Tag::new(3, Arch::Lower).to_string(), "3L");
    }

    #[test]
    fn test_module_reexports() {
        let _ = types::SimilarityTransform::identity();
        let _ = registration::RegistrationParams::default();
        let _ = align::PopulationParams::default();
        let _ = io::FarthestPointSampler;
    }
}
