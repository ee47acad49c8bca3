//! Core data types for statistical shape modelling of point clouds.
//!
//! This crate provides the leaf types shared by every stage of the
//! shape-model pipeline:
//! - **[`PointGroup`]** - An ordered, immutable N×3 point set
//! - **[`Tag`] / [`Arch`]** - Sample identifiers of the form `"{index}{U|L}"`
//! - **[`Sample`]** - A point group carrying its tag for provenance
//! - **[`SimilarityTransform`]** - Scale, rotation and translation with an
//!   exact inverse
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with no I/O and no threading.
//!
//! # Example
//!
//! ```
//! use shape_types::{PointGroup, SimilarityTransform};
//! use nalgebra::{Rotation3, Vector3};
//!
//! let group = PointGroup::from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
//! let transform = SimilarityTransform::new(
//!     1.5,
//!     Rotation3::from_euler_angles(0.1, 0.2, 0.3),
//!     Vector3::new(1.0, 2.0, 3.0),
//! )
//! .unwrap();
//!
//! let moved = transform.transform_group(&group);
//! let back = transform.inverse_transform_group(&moved);
//! assert!(back.frobenius_distance(&group).unwrap() < 1e-10);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

mod error;
mod point_group;
mod tag;
mod transform;

pub use error::{ShapeError, ShapeResult};
pub use point_group::PointGroup;
pub use tag::{Arch, Sample, Tag};
pub use transform::{mean_rotation, SimilarityTransform};
