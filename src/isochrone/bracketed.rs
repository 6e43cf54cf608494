//! Bracketed column search, the default [`TracingStrategy`].
//!
//! A vertical line meets one hyperbola branch at most twice, and between two crossings
//! `f` turns around. So a half-column either brackets a root at its ends, or its ends agree
//! in sign and the half is split at the zero of `∂f/∂y` before trying again on the lower
//! piece. Every search is a Brent iteration; nothing is sampled.
//!
//! The split relies on `∂f/∂y` changing sign at most once along a column. With
//! `r_k = |P - S_k|`, a zero needs `(y - y_i) / r_i = (y - y_j) / r_j`; both sides share a
//! sign, and squaring leaves `(y - y_i) |x - x_j| = (y - y_j) |x - x_i|`, linear in `y`.
//! So `f` is unimodal on every column: ends of equal sign with no slope change in between
//! mean no root in that half.
use crate::isochrone::{brackets, brent_root, PairColumn, TracingStrategy};
use crate::localization::LocatorParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracketed {
    tolerance: f64,
    max_iter: usize,
}

impl Bracketed {
    pub fn new(tolerance: f64, max_iter: usize) -> Self {
        Bracketed {
            tolerance,
            max_iter,
        }
    }

    pub fn from_params(params: &LocatorParams) -> Self {
        Bracketed::new(params.root_tolerance, params.root_max_iter)
    }

    fn refine(&self, column: &PairColumn<'_>, a: f64, b: f64) -> Option<f64> {
        let root = brent_root(|y| column.value(y), a, b, self.tolerance, self.max_iter).ok()?;
        column.accept(root)
    }
}

impl TracingStrategy for Bracketed {
    fn column_root(&self, column: &PairColumn<'_>, y_lo: f64, y_hi: f64) -> Option<f64> {
        let f_lo = column.value(y_lo);
        let f_hi = column.value(y_hi);

        if f_lo == 0.0 {
            return Some(y_lo);
        }
        if brackets(f_lo, f_hi) {
            return self.refine(column, y_lo, y_hi);
        }
        if !f_lo.is_finite() || !f_hi.is_finite() {
            return None;
        }

        // same sign at both ends: a pair of crossings needs a turning point in between
        if !brackets(column.slope(y_lo), column.slope(y_hi)) {
            return None;
        }
        let turn = brent_root(
            |y| column.slope(y),
            y_lo,
            y_hi,
            self.tolerance,
            self.max_iter,
        )
        .ok()?;

        let f_turn = column.value(turn);
        if brackets(f_lo, f_turn) {
            self.refine(column, y_lo, turn)
        } else {
            None
        }
    }
}
