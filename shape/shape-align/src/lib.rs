//! Correspondence extraction and iterative population alignment.
//!
//! This crate turns a population of irregularly sampled point clouds into
//! equal-length, correspondence-consistent shapes in a common frame:
//! - **[`extract_correspondence`]** - Greedy injective nearest-neighbour
//!   matching
//! - **[`PairAligner`]** - Rigid then deformable registration, then
//!   correspondence
//! - **[`ParallelMap`]** - Position-preserving map over a [`WorkerPool`] or
//!   [`Sequential`]ly
//! - **[`PopulationAligner`]** - Reference refinement loop with a final
//!   correspondence pass
//!
//! Per-sample failures inside a parallel phase are gathered at the barrier
//! and reported together as [`AlignError::PhaseFailed`].
//!
//! # Example
//!
//! ```
//! use shape_align::{PairAligner, PairParams, PopulationAligner, PopulationParams, Sequential};
//! use shape_registration::CoherentPointDrift;
//! use shape_types::{Arch, PointGroup, Sample, Tag};
//!
//! let base = PointGroup::from_rows(&[
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.0],
//!     [1.0, 1.0, 0.5],
//! ]);
//! let samples: Vec<Sample> = (0..3)
//!     .map(|i| Sample::new(Tag::new(i, Arch::Upper), base.clone()))
//!     .collect();
//!
//! let aligner = PopulationAligner::new(
//!     PairAligner::new(CoherentPointDrift::new(), PairParams::default()),
//!     PopulationParams::default(),
//! );
//! let result = aligner.align(&Sequential, &base, &samples).unwrap();
//! assert_eq!(result.samples.len(), 3);
//! assert!(result.samples.iter().all(|s| s.aligned.len() == base.len()));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

mod correspondence;
mod error;
mod pair;
mod parallel;
mod population;

pub use correspondence::{distance_matrix, extract_correspondence, Correspondence};
pub use error::{AlignError, AlignResult, Phase, SampleFailure};
pub use pair::{PairAligner, PairAlignment, PairParams};
pub use parallel::{ParallelMap, Sequential, WorkerPool};
pub use population::{
    align_batch, AlignedSample, PopulationAligner, PopulationAlignment, PopulationParams,
};
