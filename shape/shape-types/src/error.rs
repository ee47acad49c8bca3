//! Error types for shape primitives.

use thiserror::Error;

/// Errors raised while constructing or combining shape primitives.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShapeError {
    /// A point group with no points was supplied where points are required.
    #[error("point group has no points")]
    EmptyGroup,

    /// An operation over a collection of point groups received none.
    #[error("no point groups supplied")]
    EmptyCollection,

    /// A flattened coordinate vector does not describe whole 3D points.
    #[error("flat coordinate vector of length {len} is not a multiple of 3")]
    FlatLengthNotMultipleOfThree {
        /// Length of the rejected vector.
        len: usize,
    },

    /// Point groups that must share a cardinality do not.
    #[error("point group {index} has {actual} points, expected {expected}")]
    CardinalityMismatch {
        /// Position of the offending group in its collection.
        index: usize,
        /// Expected point count.
        expected: usize,
        /// Actual point count.
        actual: usize,
    },

    /// A correspondence or selection index is out of range.
    #[error("index {index} out of bounds for point group with {len} points")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Point count of the group.
        len: usize,
    },

    /// A tag string does not follow the `{index}{U|L}` pattern.
    #[error("invalid sample tag {0:?}: expected an integer index followed by U or L")]
    InvalidTag(String),

    /// A similarity scale that is not a positive finite number.
    #[error("similarity scale must be positive and finite, got {0}")]
    InvalidScale(f64),

    /// A rotation matrix that is not orthonormal with determinant +1.
    #[error("rotation matrix is not a proper rotation (det = {determinant:.6})")]
    ImproperRotation {
        /// Determinant of the rejected matrix.
        determinant: f64,
    },
}

/// Result type for shape primitive operations.
pub type ShapeResult<T> = Result<T, ShapeError>;
