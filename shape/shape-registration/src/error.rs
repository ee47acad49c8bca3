//! Error types for point-set registration.

use thiserror::Error;

/// Errors that can occur during point-set registration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    /// Reference (fixed) point set has no points.
    #[error("reference point set has no points")]
    EmptyReference,

    /// Moving point set has no points.
    #[error("moving point set has no points")]
    EmptyMoving,

    /// SVD computation failed during the rotation update.
    #[error("SVD computation failed during transform estimation")]
    SvdFailed,

    /// The deformable linear system could not be solved.
    #[error("deformable registration system is singular")]
    SingularSystem,

    /// The optimization produced a degenerate (non-finite or zero-mass) state.
    #[error("registration degenerated at iteration {iteration}: {reason}")]
    Degenerate {
        /// Iteration at which the degeneracy was detected.
        iteration: u32,
        /// What went wrong.
        reason: String,
    },

    /// Registration did not converge within the maximum iterations.
    ///
    /// Only raised when convergence is explicitly required.
    #[error("registration did not converge after {iterations} iterations (variance: {variance:.6e})")]
    DidNotConverge {
        /// Number of iterations performed.
        iterations: u32,
        /// Final mixture variance.
        variance: f64,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
