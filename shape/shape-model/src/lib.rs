//! Statistical shape models from correspondence-aligned populations.
//!
//! - **[`ShapeModel`]** - PCA of flattened aligned shapes: mean shape,
//!   sorted eigenpairs, explained variance and feature vectors
//! - **[`ReconstructionValidator`]** - Reconstructs held-out shapes through a
//!   truncated basis and reports the error in each sample's own frame
//!
//! # Example
//!
//! ```
//! use shape_model::ShapeModel;
//! use shape_types::PointGroup;
//!
//! let shapes: Vec<PointGroup> = (1..=4)
//!     .map(|i| {
//!         let s = f64::from(i);
//!         PointGroup::from_rows(&[[0.0, 0.0, 0.0], [s, 0.0, 0.0], [0.0, 1.0, s * 0.1]])
//!     })
//!     .collect();
//!
//! let model = ShapeModel::build(&shapes).unwrap();
//! let features = model.feature_vectors(1).unwrap();
//! assert_eq!(features.shape(), (4, 1));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

mod error;
mod pca;
mod validate;

pub use error::{ModelError, ModelResult};
pub use pca::ShapeModel;
pub use validate::{ErrorStats, ReconstructionValidator, SampleReconstruction, ValidationReport};
