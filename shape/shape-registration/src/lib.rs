//! Point-set registration for shape alignment.
//!
//! This crate defines the [`RegistrationPrimitive`] capability consumed by
//! the alignment pipeline and ships a deterministic Coherent Point Drift
//! implementation of it:
//! - **Rigid** - scale, rotation and translation via weighted Procrustes
//! - **Deformable** - smooth Gaussian-kernel displacement field
//!
//! Registration is configured through an explicit [`RegistrationParams`]
//! structure rather than loose keyword options.
//!
//! # Example
//!
//! ```
//! use shape_registration::{CoherentPointDrift, RegistrationParams, RegistrationPrimitive};
//! use shape_types::{PointGroup, SimilarityTransform};
//! use nalgebra::{Rotation3, Vector3};
//!
//! let reference = PointGroup::from_rows(&[
//!     [0.0, 0.0, 0.0],
//!     [2.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.5],
//!     [1.0, 1.0, 1.0],
//! ]);
//! let truth = SimilarityTransform::new(
//!     1.0,
//!     Rotation3::from_euler_angles(0.0, 0.0, 0.2),
//!     Vector3::new(0.1, 0.0, 0.0),
//! )
//! .unwrap();
//! let moving = truth.inverse_transform_group(&reference);
//!
//! let result = CoherentPointDrift::new()
//!     .rigid_register(&reference, &moving, &RegistrationParams::rigid())
//!     .unwrap();
//! assert!(result.transformed.frobenius_distance(&reference).unwrap() < 1e-2);
//! ```
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with no I/O and no threading.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

mod cpd;
mod deformable;
mod error;
mod params;
mod posterior;
mod primitive;
mod rigid;

pub use cpd::CoherentPointDrift;
pub use error::{RegistrationError, RegistrationResult};
pub use params::{RegistrationMode, RegistrationParams};
pub use primitive::{
    DeformableRegistration, DeformationField, Registration, RegistrationPrimitive,
    RegistrationStats, RigidRegistration,
};
