//! Registration parameters.

use crate::{RegistrationError, RegistrationResult};

/// Which kind of motion a registration call estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationMode {
    /// Similarity motion: uniform scale, rotation and translation.
    #[default]
    Rigid,
    /// Smooth non-rigid displacement field.
    Deformable,
}

/// Parameters for one registration call.
///
/// # Example
///
/// ```
/// use shape_registration::{RegistrationMode, RegistrationParams};
///
/// let params = RegistrationParams::deformable()
///     .with_max_iterations(50)
///     .with_tolerance(1e-5);
/// assert_eq!(params.mode, RegistrationMode::Deformable);
/// assert_eq!(params.max_iterations, 50);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationParams {
    /// Motion model to estimate (default: rigid).
    pub mode: RegistrationMode,
    /// Maximum number of EM iterations (default: 100).
    pub max_iterations: u32,
    /// Convergence threshold on the change of the objective (default: 1e-4).
    pub tolerance: f64,
    /// Emit per-iteration events at `debug` instead of `trace` level.
    pub verbose: bool,
    /// Treat an exhausted iteration budget as an error (default: false).
    pub require_convergence: bool,
}

impl Default for RegistrationParams {
    fn default() -> Self {
        Self {
            mode: RegistrationMode::Rigid,
            max_iterations: 100,
            tolerance: 1e-4,
            verbose: false,
            require_convergence: false,
        }
    }
}

impl RegistrationParams {
    /// Creates rigid registration parameters with defaults.
    #[must_use]
    pub fn rigid() -> Self {
        Self::default()
    }

    /// Creates deformable registration parameters with defaults.
    #[must_use]
    pub fn deformable() -> Self {
        Self {
            mode: RegistrationMode::Deformable,
            ..Self::default()
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Enables or disables verbose iteration events.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Requires convergence within the iteration budget.
    #[must_use]
    pub const fn with_require_convergence(mut self, require: bool) -> Self {
        self.require_convergence = require;
        self
    }

    /// Checks the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidParameter`] for a zero iteration
    /// budget or a non-positive tolerance.
    pub fn validate(&self) -> RegistrationResult<()> {
        if self.max_iterations == 0 {
            return Err(RegistrationError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(RegistrationError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = RegistrationParams::default();
        assert_eq!(params.mode, RegistrationMode::Rigid);
        assert_eq!(params.max_iterations, 100);
        assert!((params.tolerance - 1e-4).abs() < 1e-15);
        assert!(!params.verbose);
        assert!(!params.require_convergence);
    }

    #[test]
    fn test_builder() {
        let params = RegistrationParams::rigid()
            .with_max_iterations(7)
            .with_verbose(true)
            .with_require_convergence(true);
        assert_eq!(params.max_iterations, 7);
        assert!(params.verbose);
        assert!(params.require_convergence);
    }

    #[test]
    fn test_validate() {
        assert!(RegistrationParams::default().validate().is_ok());
        assert!(RegistrationParams::default()
            .with_max_iterations(0)
            .validate()
            .is_err());
        assert!(RegistrationParams::default()
            .with_tolerance(0.0)
            .validate()
            .is_err());
    }
}
