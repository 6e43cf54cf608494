//! # TDOA position solver
//!
//! This module estimates the planar position of an acoustic source from the arrival
//! delays observed at a set of stations, by **nonlinear least squares** on range
//! differences.
//!
//! ## Residual models
//!
//! Every constraint is a range difference between two stations `(i, j)`:
//!
//! ```text
//! r(P) = (|P - S_i| - |P - S_j|) - v · (d_i - d_j)
//! ```
//!
//! * **Global** ([`TdoaSolver::solve_global`]) – one constraint per unordered pair of the
//!   subset (6 for four stations).
//! * **Reduced** ([`TdoaSolver::solve_reduced`]) – one constraint per non-reference station
//!   against the first station of the subset (2 for three stations).
//!
//! Delays are first made relative to the first station of the subset in use.
//!
//! ## Leave-one-out
//!
//! [`TdoaSolver::solve_leave_one_out`] runs the reduced solve once per excluded station.
//! Each run re-derives its own reference and offsets from its retained stations and is
//! independent of the others, so the runs are fanned out on the rayon pool when enabled.
//! Results come back in ascending order of the omitted station.
//!
//! ## Degenerate subsets
//!
//! A subset is not iterated when its delays have (almost) no spread or its stations are
//! collinear or coincident. A run that ends unconverged with a cost above
//! `fallback_cost`, or with a non-finite position, is also rejected. In every case the
//! [`Solution`] falls back to the subset centroid and carries the reason; this is logged
//! with `tracing::warn!` and is never fatal.
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::constants::{Meter, MetersPerSecond, MIN_SOLVE_STATIONS};
use crate::execution::map_ordered;
use crate::localization::least_squares::{levenberg_marquardt, ResidualModel};
use crate::localization::solution::{SolveMethod, Solution};
use crate::localization::LocatorParams;
use crate::projection::PlanarPoint;
use crate::request::PlanarStation;
use crate::tdoa_errors::TdoaError;

/// A single range-difference constraint `|P - S_i| - |P - S_j| = target`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RangeDifference {
    i: usize,
    j: usize,
    target: Meter,
}

/// Range-difference residuals over a station subset.
#[derive(Debug, Clone)]
struct RangeDifferenceModel {
    positions: SmallVec<[PlanarPoint; 4]>,
    constraints: SmallVec<[RangeDifference; 6]>,
}

impl RangeDifferenceModel {
    /// Unit vector from `S_k` towards `p`, zero when `p` sits on the station.
    fn unit_from(&self, k: usize, p: &PlanarPoint) -> PlanarPoint {
        let diff = p - self.positions[k];
        let n = diff.norm();
        if n > 0.0 {
            diff / n
        } else {
            PlanarPoint::zeros()
        }
    }
}

impl ResidualModel for RangeDifferenceModel {
    fn residual_count(&self) -> usize {
        self.constraints.len()
    }

    fn residuals(&self, p: &PlanarPoint) -> DVector<f64> {
        DVector::from_iterator(
            self.constraints.len(),
            self.constraints.iter().map(|c| {
                (p - self.positions[c.i]).norm() - (p - self.positions[c.j]).norm() - c.target
            }),
        )
    }

    fn jacobian(&self, p: &PlanarPoint) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(self.constraints.len(), 2);
        for (row, c) in self.constraints.iter().enumerate() {
            let g = self.unit_from(c.i, p) - self.unit_from(c.j, p);
            jac[(row, 0)] = g.x;
            jac[(row, 1)] = g.y;
        }
        jac
    }
}

/// Nonlinear least-squares TDOA solver for one request.
///
/// Holds the propagation speed fixed for the request and borrows the locator
/// parameters; it has no other state, so one solver serves every subset of a request.
#[derive(Debug, Clone, Copy)]
pub struct TdoaSolver<'a> {
    params: &'a LocatorParams,
    speed: MetersPerSecond,
}

impl<'a> TdoaSolver<'a> {
    pub fn new(params: &'a LocatorParams, speed: MetersPerSecond) -> Self {
        TdoaSolver { params, speed }
    }

    pub fn speed(&self) -> MetersPerSecond {
        self.speed
    }

    /// Solve with every station of `stations`, one residual per unordered pair.
    ///
    /// Arguments
    /// -----------------
    /// * `stations`: the subset to use, at least 3 stations; the first is the reference.
    ///
    /// Return
    /// ----------
    /// * A [`Solution`] tagged [`SolveMethod::Global`].
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::NotEnoughStations`] with fewer than 3 stations.
    /// * [`TdoaError::InvalidStationSubset`] if a station id appears twice.
    pub fn solve_global(&self, stations: &[PlanarStation]) -> Result<Solution, TdoaError> {
        check_subset(stations)?;
        let delays = relative_delays(stations);

        let constraints = (0..stations.len())
            .tuple_combinations()
            .map(|(i, j)| RangeDifference {
                i,
                j,
                target: self.speed * (delays[i] - delays[j]),
            })
            .collect();

        Ok(self.run(stations, &delays, constraints, SolveMethod::Global))
    }

    /// Solve against the first station of `stations`, one residual per other station.
    ///
    /// Arguments
    /// -----------------
    /// * `stations`: the subset to use, at least 3 stations; the first is the reference.
    /// * `method`: tag recorded on the returned solution.
    ///
    /// Return
    /// ----------
    /// * A [`Solution`] tagged `method`.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::NotEnoughStations`] with fewer than 3 stations.
    /// * [`TdoaError::InvalidStationSubset`] if a station id appears twice.
    pub fn solve_reduced(
        &self,
        stations: &[PlanarStation],
        method: SolveMethod,
    ) -> Result<Solution, TdoaError> {
        check_subset(stations)?;
        let delays = relative_delays(stations);

        let constraints = (1..stations.len())
            .map(|i| RangeDifference {
                i,
                j: 0,
                target: self.speed * delays[i],
            })
            .collect();

        Ok(self.run(stations, &delays, constraints, method))
    }

    /// Run the reduced solve once per excluded station.
    ///
    /// Arguments
    /// -----------------
    /// * `stations`: the full station set, at least 4 stations so that every subset keeps 3.
    ///
    /// Return
    /// ----------
    /// * One [`Solution`] per station, in ascending order of the omitted station id,
    ///   tagged [`SolveMethod::Omit`].
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::NotEnoughStations`] if a subset would keep fewer than 3 stations.
    pub fn solve_leave_one_out(
        &self,
        stations: &[PlanarStation],
    ) -> Result<Vec<Solution>, TdoaError> {
        if stations.len() <= MIN_SOLVE_STATIONS {
            return Err(TdoaError::NotEnoughStations {
                required: MIN_SOLVE_STATIONS,
                got: stations.len().saturating_sub(1),
            });
        }

        let subsets: Vec<(usize, SmallVec<[PlanarStation; 4]>)> = stations
            .iter()
            .map(|omitted| {
                let kept = stations
                    .iter()
                    .filter(|s| s.id != omitted.id)
                    .copied()
                    .collect();
                (omitted.id, kept)
            })
            .collect();

        map_ordered(subsets, self.params.parallel, |(omitted, kept)| {
            self.solve_reduced(&kept, SolveMethod::Omit(omitted))
        })
        .into_iter()
        .collect()
    }

    fn run(
        &self,
        stations: &[PlanarStation],
        delays: &[f64],
        constraints: SmallVec<[RangeDifference; 6]>,
        method: SolveMethod,
    ) -> Solution {
        let model = RangeDifferenceModel {
            positions: stations.iter().map(|s| s.position).collect(),
            constraints,
        };
        let centroid = centroid(&model.positions);

        if let Some(reason) = self.degeneracy(&model.positions, delays) {
            return self.fallback(&model, centroid, 0, method, reason);
        }

        let outcome = levenberg_marquardt(&model, centroid, self.params);
        let finite = outcome.position.iter().all(|v| v.is_finite()) && outcome.cost.is_finite();

        if !finite {
            return self.fallback(
                &model,
                centroid,
                outcome.iterations,
                method,
                "least squares produced a non-finite position".into(),
            );
        }
        if !outcome.converged && outcome.cost > self.params.fallback_cost {
            return self.fallback(
                &model,
                centroid,
                outcome.iterations,
                method,
                format!(
                    "least squares did not converge after {} iterations (cost {:.3e} m²)",
                    outcome.iterations, outcome.cost
                ),
            );
        }

        let solution = Solution::solved(
            method,
            outcome.position,
            outcome.cost.sqrt(),
            outcome.iterations,
        );
        debug!(%solution, "subset solved");
        solution
    }

    fn fallback(
        &self,
        model: &RangeDifferenceModel,
        centroid: PlanarPoint,
        iterations: usize,
        method: SolveMethod,
        reason: String,
    ) -> Solution {
        warn!(%method, %reason, "degenerate subset, falling back to the centroid");
        let residual = model.cost(&centroid).sqrt();
        Solution::fallback(method, centroid, residual, iterations, reason)
    }

    /// Why the subset cannot be solved meaningfully, if it cannot.
    fn degeneracy(&self, positions: &[PlanarPoint], delays: &[f64]) -> Option<String> {
        let (lo, hi) = delays
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &d| {
                (lo.min(d), hi.max(d))
            });
        if hi - lo <= self.params.degenerate_delay_spread {
            return Some(format!("delay spread {:.3e} s is below tolerance", hi - lo));
        }

        let max_sep = max_separation(positions);
        if max_sep <= 0.0 {
            return Some("stations are coincident".into());
        }

        let max_area2 = positions
            .iter()
            .tuple_combinations()
            .map(|(a, b, c)| {
                let ab = b - a;
                let ac = c - a;
                (ab.x * ac.y - ab.y * ac.x).abs()
            })
            .fold(0.0_f64, f64::max);
        if max_area2 <= self.params.collinearity_tolerance * max_sep * max_sep {
            return Some("stations are collinear".into());
        }

        None
    }
}

/// Delays of `stations` made relative to the first one.
fn relative_delays(stations: &[PlanarStation]) -> SmallVec<[f64; 4]> {
    let d0 = stations[0].delay;
    stations.iter().map(|s| s.delay - d0).collect()
}

fn check_subset(stations: &[PlanarStation]) -> Result<(), TdoaError> {
    if stations.len() < MIN_SOLVE_STATIONS {
        return Err(TdoaError::NotEnoughStations {
            required: MIN_SOLVE_STATIONS,
            got: stations.len(),
        });
    }
    if !stations.iter().map(|s| s.id).all_unique() {
        return Err(TdoaError::InvalidStationSubset(format!(
            "duplicate station id in {:?}",
            stations.iter().map(|s| s.id).collect::<Vec<_>>()
        )));
    }
    Ok(())
}

/// Mean of `points`; the initial guess of every solve.
pub fn centroid(points: &[PlanarPoint]) -> PlanarPoint {
    let sum = points.iter().fold(PlanarPoint::zeros(), |acc, p| acc + p);
    sum / points.len().max(1) as f64
}

/// Largest pairwise distance among `points`, 0 for fewer than two points.
pub fn max_separation(points: &[PlanarPoint]) -> Meter {
    points
        .iter()
        .tuple_combinations()
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max)
}
