//! Error types for correspondence extraction and population alignment.

use std::fmt;

use shape_registration::RegistrationError;
use shape_types::{ShapeError, Tag};
use thiserror::Error;

/// Alignment phase in which a batch of per-sample work ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reference refinement pass, numbered from 1.
    Refine {
        /// Refinement iteration.
        iteration: u32,
    },
    /// Final correspondence pass against the converged reference.
    Finalize,
    /// Alignment of held-out samples to the mean shape.
    Validate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refine { iteration } => write!(f, "refine #{iteration}"),
            Self::Finalize => f.write_str("finalize"),
            Self::Validate => f.write_str("validate"),
        }
    }
}

/// One failed unit of work inside a parallel phase.
#[derive(Debug)]
pub struct SampleFailure {
    /// Tag of the sample whose alignment failed.
    pub tag: Tag,
    /// Why it failed.
    pub reason: AlignError,
}

impl fmt::Display for SampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag, self.reason)
    }
}

/// Errors that can occur while aligning shapes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AlignError {
    /// Correspondence requested with a reference larger than the moving set.
    #[error("reference has {reference} points but moving set only has {moving}")]
    Cardinality {
        /// Reference point count.
        reference: usize,
        /// Moving point count.
        moving: usize,
    },

    /// The registration primitive failed.
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// A point-group operation failed.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// No samples were supplied.
    #[error("no samples to align")]
    EmptyPopulation,

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    /// One or more samples failed during a parallel phase.
    #[error("{phase} phase failed for {} sample(s): {}", .failures.len(), format_failures(.failures))]
    PhaseFailed {
        /// Phase that failed.
        phase: Phase,
        /// Every failing sample, in input order.
        failures: Vec<SampleFailure>,
    },
}

impl AlignError {
    /// Tags of the samples that failed, if this is a phase failure.
    #[must_use]
    pub fn failed_tags(&self) -> Vec<Tag> {
        match self {
            Self::PhaseFailed { failures, .. } => failures.iter().map(|f| f.tag).collect(),
            _ => Vec::new(),
        }
    }
}

fn format_failures(failures: &[SampleFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for alignment operations.
pub type AlignResult<T> = Result<T, AlignError>;
