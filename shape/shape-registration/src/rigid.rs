//! Rigid (similarity) Coherent Point Drift.
//!
//! Each iteration evaluates the mixture posterior, then solves a weighted
//! Procrustes problem for scale, rotation and translation in closed form.
//! Iteration stops once the negative log-likelihood changes by less than
//! the tolerance.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use shape_types::{PointGroup, SimilarityTransform};
use tracing::{debug, trace};

use crate::posterior::{initial_variance, to_group, to_matrix, Posterior, DIM};
use crate::{
    RegistrationError, RegistrationParams, RegistrationResult, RegistrationStats,
    RigidRegistration,
};

/// Current similarity estimate, in column-vector convention.
struct Estimate {
    scale: f64,
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Estimate {
    fn apply(&self, y: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = y.clone();
        for mut row in out.row_iter_mut() {
            let p = Vector3::new(row[0], row[1], row[2]);
            let q = self.rotation * p * self.scale + self.translation;
            for c in 0..3 {
                row[c] = q[c];
            }
        }
        out
    }
}

/// Weighted mean of the rows of `m`.
fn weighted_mean(m: &DMatrix<f64>, weights: &DVector<f64>, total: f64) -> Vector3<f64> {
    let mean = m.transpose() * weights / total;
    Vector3::new(mean[0], mean[1], mean[2])
}

fn subtract_row(m: &DMatrix<f64>, mean: &Vector3<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for mut row in out.row_iter_mut() {
        for c in 0..3 {
            row[c] -= mean[c];
        }
    }
    out
}

fn degenerate(iteration: u32, reason: &str) -> RegistrationError {
    RegistrationError::Degenerate {
        iteration,
        reason: reason.to_string(),
    }
}

pub(crate) fn register(
    reference: &PointGroup,
    moving: &PointGroup,
    params: &RegistrationParams,
    outlier_weight: f64,
) -> RegistrationResult<RigidRegistration> {
    let x = to_matrix(reference);
    let y = to_matrix(moving);

    let mut estimate = Estimate {
        scale: 1.0,
        rotation: Matrix3::identity(),
        translation: Vector3::zeros(),
    };
    let mut ty = y.clone();
    let mut variance = initial_variance(&x, &y);
    let mut q = f64::INFINITY;
    let mut diff = f64::INFINITY;
    let mut iteration = 0;

    while iteration < params.max_iterations && diff > params.tolerance {
        let post = Posterior::compute(&x, &ty, variance, outlier_weight);
        if !(post.np.is_finite() && post.np > 0.0) {
            return Err(degenerate(iteration, "posterior has no mass"));
        }

        let mu_x = weighted_mean(&x, &post.pt1, post.np);
        let mu_y = weighted_mean(&y, &post.p1, post.np);
        let x_hat = subtract_row(&x, &mu_x);
        let y_hat = subtract_row(&y, &mu_y);

        // A = X̂ᵀ Pᵀ Ŷ
        let a_dyn = x_hat.transpose() * post.p.transpose() * &y_hat;
        let a = Matrix3::from_fn(|r, c| a_dyn[(r, c)]);

        let svd = a.svd(true, true);
        let u = svd.u.ok_or(RegistrationError::SvdFailed)?;
        let v_t = svd.v_t.ok_or(RegistrationError::SvdFailed)?;
        let reflection = (u * v_t).determinant();
        let rotation = u * Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, reflection)) * v_t;

        let ypy: f64 = y_hat
            .row_iter()
            .zip(post.p1.iter())
            .map(|(row, w)| w * row.norm_squared())
            .sum();
        let xpx: f64 = x_hat
            .row_iter()
            .zip(post.pt1.iter())
            .map(|(row, w)| w * row.norm_squared())
            .sum();
        let tr_ar = (a.transpose() * rotation).trace();
        let scale = tr_ar / ypy;
        let translation = mu_x - rotation * mu_y * scale;

        if !(scale.is_finite() && scale > 0.0) {
            return Err(degenerate(iteration, "scale is not positive and finite"));
        }

        estimate = Estimate {
            scale,
            rotation,
            translation,
        };
        ty = estimate.apply(&y);

        let q_prev = q;
        q = (xpx - 2.0 * scale * tr_ar + scale * scale * ypy) / (2.0 * variance)
            + DIM * post.np / 2.0 * variance.ln();
        diff = (q - q_prev).abs();

        variance = (xpx - scale * tr_ar) / (post.np * DIM);
        if variance <= 0.0 {
            variance = params.tolerance / 10.0;
        }
        if !variance.is_finite() {
            return Err(degenerate(iteration, "variance is not finite"));
        }

        iteration += 1;
        if params.verbose {
            debug!(iteration, variance, objective = q, diff, "Rigid CPD iteration");
        } else {
            trace!(iteration, variance, objective = q, diff, "Rigid CPD iteration");
        }
    }

    let converged = diff <= params.tolerance;
    if !converged && params.require_convergence {
        return Err(RegistrationError::DidNotConverge {
            iterations: iteration,
            variance,
        });
    }

    let transform =
        SimilarityTransform::from_matrix(estimate.scale, estimate.rotation, estimate.translation)
            .map_err(|e| degenerate(iteration, &e.to_string()))?;

    Ok(RigidRegistration {
        transformed: to_group(&ty),
        transform,
        stats: RegistrationStats {
            iterations: iteration,
            converged,
            variance,
        },
    })
}
