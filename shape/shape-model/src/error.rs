//! Error types for shape model construction and validation.

use shape_align::AlignError;
use shape_types::ShapeError;
use thiserror::Error;

/// Errors that can occur while building or evaluating a shape model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// No shapes were supplied.
    #[error("shape population is empty")]
    EmptyPopulation,

    /// Shapes in the population differ in point count.
    #[error("shape {index} has {actual} points, expected {expected}")]
    ShapeMismatch {
        /// Position of the offending shape.
        index: usize,
        /// Point count of the first shape.
        expected: usize,
        /// Point count of the offending shape.
        actual: usize,
    },

    /// More principal components were requested than the shape dimension (3M).
    #[error("requested {requested} components but the eigenbasis has {available}")]
    TooManyComponents {
        /// Requested component count.
        requested: usize,
        /// Available component count.
        available: usize,
    },

    /// Aligning held-out shapes failed.
    #[error(transparent)]
    Align(#[from] AlignError),

    /// A point-group operation failed.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = ModelError::ShapeMismatch {
            index: 4,
            expected: 100,
            actual: 98,
        };
        assert_eq!(err.to_string(), "shape 4 has 98 points, expected 100");
    }

    #[test]
    fn test_from_align_error() {
        let err: ModelError = AlignError::EmptyPopulation.into();
        assert!(matches!(err, ModelError::Align(AlignError::EmptyPopulation)));
    }
}
