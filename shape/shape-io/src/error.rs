//! Error types for dataset and store operations.

use std::path::PathBuf;

use shape_types::{ShapeError, Tag};
use thiserror::Error;

/// Result type for dataset and store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing shape data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A requested tag is absent.
    #[error("sample {0} does not exist")]
    TagNotFound(Tag),

    /// A directory holds no point files.
    #[error("no point files found in {path}")]
    EmptyDirectory {
        /// Directory that was scanned.
        path: PathBuf,
    },

    /// A file name could not be read as a tag.
    #[error("file name of {path} is not a sample tag")]
    InvalidFileName {
        /// Offending file.
        path: PathBuf,
    },

    /// A point file line could not be parsed.
    #[error("{path}:{line}: {message}")]
    InvalidContent {
        /// File being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The transform store holds records for another tooth.
    #[error("transform file {path} holds tooth {found}, expected {expected}")]
    ToothMismatch {
        /// File being read.
        path: PathBuf,
        /// Requested tooth index.
        expected: u32,
        /// Tooth index found in the file.
        found: u32,
    },

    /// A stored transform is not a valid similarity.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use shape_types::Arch;

    #[test]
    fn test_tag_not_found_message() {
        let err = StoreError::TagNotFound(Tag::new(37, Arch::Upper));
        assert_eq!(err.to_string(), "sample 37U does not exist");
    }

    #[test]
    fn test_invalid_content_message() {
        let err = StoreError::InvalidContent {
            path: PathBuf::from("a.txt"),
            line: 3,
            message: "expected 3 values, found 2".to_string(),
        };
        assert_eq!(err.to_string(), "a.txt:3: expected 3 values, found 2");
    }
}
