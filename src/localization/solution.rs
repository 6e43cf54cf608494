//! # TDOA solution
//!
//! This module defines [`Solution`], the outcome of one least-squares solve, and
//! [`SolveMethod`], the tag telling which station subset produced it.
//!
//! ## Methods
//!
//! - **`Global`** – all four stations, one residual per unordered pair.
//! - **`Omit(k)`** – leave-one-out solve on the three stations other than `k`, one residual
//!   per non-reference station of the subset.
//!
//! A solution is immutable once built. A *degenerate* solution carries the subset centroid
//! as a best-effort position; its residual is evaluated at that centroid.
//!
//! ## Usage
//!
//! ```rust
//! use tdoa_locator::localization::solution::SolveMethod;
//!
//! assert_eq!(SolveMethod::Global.to_string(), "global");
//! assert_eq!(SolveMethod::Omit(2).to_string(), "omit:2");
//! ```
use std::fmt;

use crate::constants::Meter;
use crate::projection::PlanarPoint;

/// Which station subset a [`Solution`] was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SolveMethod {
    Global,
    /// Leave-one-out solve excluding the given station index.
    Omit(usize),
}

impl fmt::Display for SolveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveMethod::Global => write!(f, "global"),
            SolveMethod::Omit(k) => write!(f, "omit:{k}"),
        }
    }
}

/// A planar position estimate with its provenance and fit quality.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    method: SolveMethod,
    position: PlanarPoint,
    residual: Meter,
    iterations: usize,
    degenerate: Option<String>,
}

impl Solution {
    /// Solution produced by a completed least-squares run.
    pub(crate) fn solved(
        method: SolveMethod,
        position: PlanarPoint,
        residual: Meter,
        iterations: usize,
    ) -> Self {
        Solution {
            method,
            position,
            residual,
            iterations,
            degenerate: None,
        }
    }

    /// Best-effort centroid solution for a degenerate subset.
    pub(crate) fn fallback(
        method: SolveMethod,
        centroid: PlanarPoint,
        residual: Meter,
        iterations: usize,
        reason: String,
    ) -> Self {
        Solution {
            method,
            position: centroid,
            residual,
            iterations,
            degenerate: Some(reason),
        }
    }

    pub fn method(&self) -> SolveMethod {
        self.method
    }

    /// Planar position estimate in the request frame (m).
    pub fn position(&self) -> PlanarPoint {
        self.position
    }

    /// Euclidean norm of the residual vector at [`Solution::position`] (m).
    pub fn residual(&self) -> Meter {
        self.residual
    }

    /// Levenberg–Marquardt iterations spent; 0 when the subset was rejected up front.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `true` when the position is the centroid fallback of a degenerate subset.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate.is_some()
    }

    /// Why the subset was considered degenerate, if it was.
    pub fn degeneracy_reason(&self) -> Option<&str> {
        self.degenerate.as_deref()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: x = {:.3} m, y = {:.3} m, residual = {:.3e} m, iterations = {}",
            self.method, self.position.x, self.position.y, self.residual, self.iterations
        )?;
        if let Some(reason) = &self.degenerate {
            write!(f, " [degenerate: {reason}]")?;
        }
        Ok(())
    }
}
