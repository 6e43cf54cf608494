//! Grid-scan column search.
//!
//! The half-column is cut into `grid_rows` equal cells and `f` is evaluated at every cell
//! edge. Each sign change marks a crossing; the lowest crossing is refined with Brent.
//! Crossings closer together than one cell can be missed, so the row count bounds the
//! resolution of this strategy.
use smallvec::SmallVec;
use tracing::trace;

use crate::isochrone::{brackets, brent_root, PairColumn, TracingStrategy};
use crate::localization::LocatorParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridScan {
    rows: usize,
    tolerance: f64,
    max_iter: usize,
}

impl GridScan {
    pub fn new(rows: usize, tolerance: f64, max_iter: usize) -> Self {
        GridScan {
            rows: rows.max(1),
            tolerance,
            max_iter,
        }
    }

    pub fn from_params(params: &LocatorParams) -> Self {
        GridScan::new(params.grid_rows, params.root_tolerance, params.root_max_iter)
    }

    /// Cells `[a, b]` of the half-column whose end values enclose a zero, bottom first.
    fn crossings(&self, column: &PairColumn<'_>, y_lo: f64, y_hi: f64) -> SmallVec<[(f64, f64); 4]> {
        let step = (y_hi - y_lo) / self.rows as f64;
        let mut cells = SmallVec::new();

        let mut a = y_lo;
        let mut f_a = column.value(a);
        for k in 1..=self.rows {
            let b = if k == self.rows {
                y_hi
            } else {
                y_lo + step * k as f64
            };
            let f_b = column.value(b);
            if brackets(f_a, f_b) {
                cells.push((a, b));
            }
            a = b;
            f_a = f_b;
        }
        cells
    }
}

impl TracingStrategy for GridScan {
    fn column_root(&self, column: &PairColumn<'_>, y_lo: f64, y_hi: f64) -> Option<f64> {
        let cells = self.crossings(column, y_lo, y_hi);
        if cells.len() > 1 {
            trace!(x = column.x(), crossings = cells.len(), "keeping the lowest crossing");
        }

        cells.into_iter().find_map(|(a, b)| {
            let root = brent_root(|y| column.value(y), a, b, self.tolerance, self.max_iter).ok()?;
            column.accept(root)
        })
    }
}
