//! Deformable Coherent Point Drift with a Gaussian displacement kernel.

use nalgebra::{DMatrix, DVector};
use shape_types::PointGroup;
use tracing::{debug, trace};

use crate::posterior::{initial_variance, to_group, to_matrix, Posterior, DIM};
use crate::{
    DeformableRegistration, DeformationField, RegistrationError, RegistrationParams,
    RegistrationResult, RegistrationStats,
};

/// Gaussian affinity `exp(−‖yᵢ − yⱼ‖² / 2β²)` between the rows of `y`.
pub(crate) fn gaussian_kernel(y: &DMatrix<f64>, beta: f64) -> DMatrix<f64> {
    let m = y.nrows();
    let denom = 2.0 * beta * beta;
    DMatrix::from_fn(m, m, |i, j| {
        (-(y.row(i) - y.row(j)).norm_squared() / denom).exp()
    })
}

/// Scales row `i` of `m` by `d[i]`, i.e. `diag(d) · m`.
fn scale_rows(d: &DVector<f64>, m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for (i, mut row) in out.row_iter_mut().enumerate() {
        row *= d[i];
    }
    out
}

pub(crate) fn register(
    reference: &PointGroup,
    moving: &PointGroup,
    params: &RegistrationParams,
    outlier_weight: f64,
    alpha: f64,
    beta: f64,
) -> RegistrationResult<DeformableRegistration> {
    let x = to_matrix(reference);
    let y = to_matrix(moving);
    let m = y.nrows();

    let kernel = gaussian_kernel(&y, beta);
    let mut coefficients = DMatrix::zeros(m, 3);
    let mut ty = y.clone();
    let mut variance = initial_variance(&x, &y);
    let mut diff = f64::INFINITY;
    let mut iteration = 0;

    let x_sq: DVector<f64> = DVector::from_iterator(x.nrows(), x.row_iter().map(|r| r.norm_squared()));

    while iteration < params.max_iterations && diff > params.tolerance {
        let post = Posterior::compute(&x, &ty, variance, outlier_weight);
        if !(post.np.is_finite() && post.np > 0.0) {
            return Err(RegistrationError::Degenerate {
                iteration,
                reason: "posterior has no mass".to_string(),
            });
        }

        // (diag(P1)·G + α·σ²·I)·W = P·X − diag(P1)·Y
        let mut system = scale_rows(&post.p1, &kernel);
        for i in 0..m {
            system[(i, i)] += alpha * variance;
        }
        let rhs = &post.px - scale_rows(&post.p1, &y);
        coefficients = system
            .lu()
            .solve(&rhs)
            .ok_or(RegistrationError::SingularSystem)?;
        ty = &y + &kernel * &coefficients;

        let previous = variance;
        let xpx = post.pt1.dot(&x_sq);
        let ypy: f64 = ty
            .row_iter()
            .zip(post.p1.iter())
            .map(|(row, w)| w * row.norm_squared())
            .sum();
        let tr_pxy = ty.component_mul(&post.px).sum();
        variance = (xpx - 2.0 * tr_pxy + ypy) / (post.np * DIM);
        if variance <= 0.0 {
            variance = params.tolerance / 10.0;
        }
        if !variance.is_finite() {
            return Err(RegistrationError::Degenerate {
                iteration,
                reason: "variance is not finite".to_string(),
            });
        }
        diff = (variance - previous).abs();

        iteration += 1;
        if params.verbose {
            debug!(iteration, variance, diff, "Deformable CPD iteration");
        } else {
            trace!(iteration, variance, diff, "Deformable CPD iteration");
        }
    }

    let converged = diff <= params.tolerance;
    if !converged && params.require_convergence {
        return Err(RegistrationError::DidNotConverge {
            iterations: iteration,
            variance,
        });
    }

    Ok(DeformableRegistration {
        transformed: to_group(&ty),
        field: DeformationField {
            kernel,
            coefficients,
        },
        stats: RegistrationStats {
            iterations: iteration,
            converged,
            variance,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn grid() -> PointGroup {
        let mut points = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                points.push(Point3::new(f64::from(i), f64::from(j), 0.0));
            }
        }
        PointGroup::new(points)
    }

    #[test]
    fn test_kernel_is_symmetric_with_unit_diagonal() {
        let y = to_matrix(&grid());
        let g = gaussian_kernel(&y, 2.0);
        for i in 0..g.nrows() {
            assert_relative_eq!(g[(i, i)], 1.0);
            for j in 0..g.ncols() {
                assert_relative_eq!(g[(i, j)], g[(j, i)]);
            }
        }
    }

    #[test]
    fn test_pulls_moving_set_toward_reference() {
        let reference = grid();
        // smooth bulge along z
        let moving = reference.map(|p| Point3::new(p.x, p.y, 0.3 * (p.x * 0.5).sin()));
        let before = moving.frobenius_distance(&reference).unwrap();

        let result =
            register(&reference, &moving, &RegistrationParams::deformable(), 0.0, 2.0, 2.0)
                .unwrap();
        let after = result.transformed.frobenius_distance(&reference).unwrap();

        assert!(after < before, "{after} !< {before}");
        assert_eq!(result.field.coefficients.shape(), (16, 3));
        assert_eq!(result.field.kernel.shape(), (16, 16));
    }

    #[test]
    fn test_field_reproduces_output() {
        let reference = grid();
        let moving = reference.map(|p| Point3::new(p.x + 0.1, p.y, p.z));
        let result =
            register(&reference, &moving, &RegistrationParams::deformable(), 0.0, 2.0, 2.0)
                .unwrap();
        let rebuilt = &to_matrix(&moving) + &result.field.kernel * &result.field.coefficients;
        assert!(
            to_group(&rebuilt)
                .frobenius_distance(&result.transformed)
                .unwrap()
                < 1e-9
        );
    }
}
