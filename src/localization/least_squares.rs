//! # Damped least squares in the plane
//!
//! A small Levenberg–Marquardt minimizer for problems with two unknowns (a planar
//! position) and any number of residuals. The residual model supplies both the residual
//! vector and its analytic Jacobian through [`ResidualModel`].
//!
//! ## Algorithm
//!
//! At each iterate `p` with residuals `r` and Jacobian `J` (m × 2):
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr
//! ```
//!
//! The step is accepted when it does not raise `‖r‖²`, in which case `λ` shrinks by
//! `lambda_down`; otherwise `λ` grows by `lambda_up`. The loop stops on:
//!
//! * `‖r‖² <= cost_tolerance` (exact fit),
//! * a step shorter than `step_tolerance · (1 + ‖p‖)`, or an accepted step whose cost
//!   reduction is below machine precision,
//! * a vanishing gradient (stationary point),
//! * `λ > max_lambda` or `max_iterations` reached (not converged).
//!
//! Every exit path is bounded, so degenerate input can only cost `max_iterations` steps.
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use tracing::debug;

use crate::localization::LocatorParams;
use crate::projection::PlanarPoint;

/// Floor of the Marquardt scaling, keeps a flat Jacobian column damped.
const DIAG_FLOOR: f64 = 1e-9;

/// Residual vector and Jacobian of a planar least-squares problem.
pub trait ResidualModel {
    /// Number of residuals `m`.
    fn residual_count(&self) -> usize;

    /// Residuals at `p`.
    fn residuals(&self, p: &PlanarPoint) -> DVector<f64>;

    /// Jacobian of the residuals at `p`, an `m × 2` matrix.
    fn jacobian(&self, p: &PlanarPoint) -> DMatrix<f64>;

    /// Sum of squared residuals at `p`.
    fn cost(&self, p: &PlanarPoint) -> f64 {
        self.residuals(p).norm_squared()
    }
}

/// Final state of a [`levenberg_marquardt`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOutcome {
    pub position: PlanarPoint,
    /// Sum of squared residuals at `position` (m²).
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimize `‖r(p)‖²` starting from `initial`.
///
/// Arguments
/// -----------------
/// * `model`: residuals and Jacobian of the problem.
/// * `initial`: starting point (the subset centroid in the TDOA solver).
/// * `params`: iteration cap, damping schedule and tolerances.
///
/// Return
/// ----------
/// * The last accepted iterate with its cost; `converged` tells whether one of the
///   convergence criteria fired before the budget ran out. A non-finite starting cost
///   returns the starting point unconverged.
pub fn levenberg_marquardt<M: ResidualModel + ?Sized>(
    model: &M,
    initial: PlanarPoint,
    params: &LocatorParams,
) -> LmOutcome {
    let mut p = initial;
    let mut r = model.residuals(&p);
    let mut cost = r.norm_squared();
    let mut lambda = params.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;

    if !cost.is_finite() {
        return LmOutcome {
            position: p,
            cost,
            iterations,
            converged,
        };
    }

    for iter in 0..params.max_iterations {
        iterations = iter + 1;

        if cost <= params.cost_tolerance {
            converged = true;
            break;
        }

        let j = model.jacobian(&p);
        let jtj = j.tr_mul(&j);
        let jtr = j.tr_mul(&r);
        let normal = Matrix2::new(jtj[(0, 0)], jtj[(0, 1)], jtj[(1, 0)], jtj[(1, 1)]);
        let gradient = Vector2::new(jtr[0], jtr[1]);

        if gradient.norm() <= f64::EPSILON * (1.0 + cost) {
            // stationary point: no descent direction left
            converged = true;
            break;
        }

        let mut damped = normal;
        for k in 0..2 {
            damped[(k, k)] += lambda * normal[(k, k)].max(DIAG_FLOOR);
        }

        let Some(inverse) = damped.try_inverse() else {
            lambda *= params.lambda_up;
            if lambda > params.max_lambda {
                break;
            }
            continue;
        };
        let delta = -(inverse * gradient);

        let candidate = p + delta;
        let r_candidate = model.residuals(&candidate);
        let cost_candidate = r_candidate.norm_squared();
        let step_is_negligible = delta.norm() <= params.step_tolerance * (1.0 + p.norm());

        if cost_candidate.is_finite() && cost_candidate <= cost {
            let reduction = cost - cost_candidate;
            p = candidate;
            r = r_candidate;
            cost = cost_candidate;
            lambda = (lambda * params.lambda_down).max(f64::MIN_POSITIVE);

            if step_is_negligible || reduction <= f64::EPSILON * cost {
                converged = true;
                break;
            }
        } else {
            // a rejected step that small means the cost is flat to machine precision
            if step_is_negligible {
                converged = true;
                break;
            }
            lambda *= params.lambda_up;
            if lambda > params.max_lambda {
                break;
            }
        }
    }

    debug!(
        iterations,
        cost,
        converged,
        x = p.x,
        y = p.y,
        "levenberg-marquardt finished"
    );

    LmOutcome {
        position: p,
        cost,
        iterations,
        converged,
    }
}
