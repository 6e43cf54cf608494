//! # Isochrone tracing
//!
//! For a station pair `(i, j)` with delays `d_i`, `d_j` and propagation speed `v`, the
//! **isochrone** is the locus of planar points `P` such that
//!
//! ```text
//! f(P) = |P - S_i| - |P - S_j| - v · (d_i - d_j) = 0
//! ```
//!
//! i.e. one branch of a hyperbola with foci `S_i`, `S_j`. This module samples that locus
//! column by column over a bounded [`TracingDomain`].
//!
//! ## Column search
//!
//! The domain is cut at its mid ordinate into an upper and a lower half. For every sampled
//! abscissa `x`, each half `[y_lo, y_hi]` is handed to a [`TracingStrategy`] which returns
//! at most one root of `y ↦ f(x, y)`, or nothing when the half holds no crossing (this is
//! silent, the column simply contributes no point).
//!
//! Two strategies are available through [`StrategyKind`]:
//!
//! * [`StrategyKind::Bracketed`] (default) – Brent on the half when its end values bracket a
//!   root, otherwise Brent on `∂f/∂y` to split the half at its turning point first.
//! * [`StrategyKind::GridScan`] – scan a regular grid of `grid_rows` cells and refine the
//!   first sign change with Brent.
//!
//! Both keep the **lowest** root of a half, and both refine with Brent, so every returned
//! point satisfies `|f| < 1e-6` m.
//!
//! ## Branches
//!
//! * [`Branch::Upper`] – roots found in the upper half, first in the output.
//! * [`Branch::Lower`] – roots found in the lower half.
//!
//! Points of a branch come ordered by increasing `x`. A branch is produced lazily by
//! [`IsochroneTracer::branch_points`]; [`IsochroneTracer::trace_pair`] collects both halves and
//! applies the optional spline resampling of [`smoothing`].
//!
//! ## Example
//!
//! ```rust
//! use tdoa_locator::isochrone::{Branch, IsochroneTracer, StationPair, TracingDomain};
//! use tdoa_locator::localization::LocatorParams;
//! use tdoa_locator::projection::PlanarPoint;
//! use tdoa_locator::request::PlanarStation;
//!
//! let stations: Vec<PlanarStation> = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]
//!     .iter()
//!     .enumerate()
//!     .map(|(id, &(x, y))| PlanarStation { id, position: PlanarPoint::new(x, y), delay: 0.01 * id as f64 })
//!     .collect();
//!
//! let params = LocatorParams::default();
//! let positions: Vec<PlanarPoint> = stations.iter().map(|s| s.position).collect();
//! let domain = TracingDomain::from_geometry(&positions, &[], &params).unwrap();
//! let tracer = IsochroneTracer::new(&params, &stations, 343.0, domain);
//!
//! let pair = StationPair::new(0, 1).unwrap();
//! let upper: Vec<PlanarPoint> = tracer.branch_points(pair, Branch::Upper).unwrap().collect();
//! assert!(upper.windows(2).all(|w| w[0].x < w[1].x));
//! ```
use std::fmt;

use roots::{find_root_brent, SimpleConvergency};

use crate::constants::Meter;
use crate::localization::LocatorParams;
use crate::projection::PlanarPoint;
use crate::tdoa_errors::TdoaError;

pub mod bracketed;
pub mod domain;
pub mod grid_scan;
pub mod smoothing;
pub mod tracer;

pub use domain::TracingDomain;
pub use tracer::{BranchPoints, IsochroneCurve, IsochroneTracer};

/// Largest `|f|` (m) accepted at a refined root.
pub const ROOT_RESIDUAL_LIMIT: Meter = 1e-6;

/// Column root search over one half of the tracing domain.
pub trait TracingStrategy {
    /// Return at most one root of `column` in `[y_lo, y_hi]`, the lowest one found.
    fn column_root(&self, column: &PairColumn<'_>, y_lo: f64, y_hi: f64) -> Option<f64>;
}

/// Selects the [`TracingStrategy`] used by the tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    #[default]
    Bracketed,
    GridScan,
}

impl StrategyKind {
    /// Build the strategy with the tolerances of `params`.
    pub fn instantiate(&self, params: &LocatorParams) -> Box<dyn TracingStrategy + Send + Sync> {
        match self {
            StrategyKind::Bracketed => Box::new(bracketed::Bracketed::from_params(params)),
            StrategyKind::GridScan => Box::new(grid_scan::GridScan::from_params(params)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Bracketed => write!(f, "bracketed"),
            StrategyKind::GridScan => write!(f, "grid"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = TdoaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bracketed" => Ok(StrategyKind::Bracketed),
            "grid" => Ok(StrategyKind::GridScan),
            other => Err(TdoaError::InvalidLocatorParameter(format!(
                "unknown tracing strategy '{other}' (expected 'bracketed' or 'grid')"
            ))),
        }
    }
}

/// An unordered station pair, kept in the order it was given.
///
/// The order only fixes the sign of the distance difference; `(i, j)` and `(j, i)` trace the
/// same locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationPair {
    i: usize,
    j: usize,
}

impl StationPair {
    pub fn new(i: usize, j: usize) -> Result<Self, TdoaError> {
        if i == j {
            return Err(TdoaError::InvalidStationSubset(format!(
                "a station pair needs two distinct stations, got ({i}, {j})"
            )));
        }
        Ok(StationPair { i, j })
    }

    pub fn i(&self) -> usize {
        self.i
    }

    pub fn j(&self) -> usize {
        self.j
    }

    pub fn swapped(&self) -> Self {
        StationPair {
            i: self.j,
            j: self.i,
        }
    }

    pub fn as_array(&self) -> [usize; 2] {
        [self.i, self.j]
    }
}

impl fmt::Display for StationPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Half of the tracing domain a branch is searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Upper,
    Lower,
}

impl Branch {
    pub const ALL: [Branch; 2] = [Branch::Upper, Branch::Lower];

    /// Position of the branch in [`IsochroneCurve::branches`].
    pub fn index(&self) -> usize {
        match self {
            Branch::Upper => 0,
            Branch::Lower => 1,
        }
    }

    /// `[y_lo, y_hi]` of this half of `domain`.
    pub fn half(&self, domain: &TracingDomain) -> (f64, f64) {
        let mid = domain.y_mid();
        match self {
            Branch::Upper => (mid, domain.y_max()),
            Branch::Lower => (domain.y_min(), mid),
        }
    }
}

/// Foci and target distance difference of one isochrone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairGeometry {
    pub si: PlanarPoint,
    pub sj: PlanarPoint,
    /// `v · (d_i - d_j)` (m).
    pub dd: Meter,
}

impl PairGeometry {
    /// `|p - S_i| - |p - S_j| - dd`.
    pub fn residual(&self, p: &PlanarPoint) -> Meter {
        (p - self.si).norm() - (p - self.sj).norm() - self.dd
    }

    /// `∂f/∂y` at `p`, with a zero contribution from a focus `p` sits on.
    pub fn slope_y(&self, p: &PlanarPoint) -> f64 {
        let along_y = |s: &PlanarPoint| {
            let n = (p - s).norm();
            if n > 0.0 {
                (p.y - s.y) / n
            } else {
                0.0
            }
        };
        along_y(&self.si) - along_y(&self.sj)
    }

    pub fn column(&self, x: f64) -> PairColumn<'_> {
        PairColumn { geometry: self, x }
    }
}

/// The residual of a [`PairGeometry`] restricted to a vertical line `x = const`.
#[derive(Debug, Clone, Copy)]
pub struct PairColumn<'a> {
    geometry: &'a PairGeometry,
    x: f64,
}

impl PairColumn<'_> {
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn value(&self, y: f64) -> f64 {
        self.geometry.residual(&PlanarPoint::new(self.x, y))
    }

    pub fn slope(&self, y: f64) -> f64 {
        self.geometry.slope_y(&PlanarPoint::new(self.x, y))
    }

    /// `Some(y)` when `y` is an acceptable root of the column.
    pub(crate) fn accept(&self, y: f64) -> Option<f64> {
        (y.is_finite() && self.value(y).abs() <= ROOT_RESIDUAL_LIMIT).then_some(y)
    }
}

/// `true` when `a` and `b` are finite and enclose a zero.
pub(crate) fn brackets(a: f64, b: f64) -> bool {
    a.is_finite() && b.is_finite() && (a == 0.0 || b == 0.0 || (a < 0.0) != (b < 0.0))
}

/// Brent search for a zero of `f` on `[a, b]`.
///
/// Arguments
/// -----------------
/// * `f`: the function, whose end values must bracket a zero.
/// * `a`, `b`: interval ends.
/// * `tolerance`: convergence tolerance on both the abscissa and `|f|`.
/// * `max_iter`: iteration cap.
///
/// Return
/// ----------
/// * The zero, or a [`TdoaError::RootFindingError`] if Brent gave up.
pub(crate) fn brent_root<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    tolerance: f64,
    max_iter: usize,
) -> Result<f64, TdoaError> {
    let mut convergency = SimpleConvergency {
        eps: tolerance,
        max_iter,
    };
    Ok(find_root_brent(a, b, &f, &mut convergency)?)
}

#[cfg(test)]
mod isochrone_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn geometry() -> PairGeometry {
        PairGeometry {
            si: PlanarPoint::new(-50.0, 0.0),
            sj: PlanarPoint::new(50.0, 0.0),
            dd: 30.0,
        }
    }

    #[test]
    fn test_strategy_kind_parse_and_display() {
        assert_eq!("grid".parse::<StrategyKind>().unwrap(), StrategyKind::GridScan);
        assert_eq!("bracketed".parse::<StrategyKind>().unwrap(), StrategyKind::Bracketed);
        assert!("newton".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::GridScan.to_string(), "grid");
        assert_eq!(StrategyKind::default(), StrategyKind::Bracketed);
    }

    #[test]
    fn test_station_pair() {
        assert!(StationPair::new(2, 2).is_err());
        let pair = StationPair::new(1, 3).unwrap();
        assert_eq!(pair.swapped().as_array(), [3, 1]);
        assert_eq!(pair.to_string(), "(1, 3)");
    }

    #[test]
    fn test_residual_and_slope() {
        let g = geometry();
        // on the baseline at x = 15: 65 - 35 = 30
        assert_abs_diff_eq!(g.residual(&PlanarPoint::new(15.0, 0.0)), 0.0, epsilon = 1e-12);

        let p = PlanarPoint::new(10.0, 20.0);
        let h = 1e-6;
        let numeric = (g.residual(&PlanarPoint::new(p.x, p.y + h))
            - g.residual(&PlanarPoint::new(p.x, p.y - h)))
            / (2.0 * h);
        assert_abs_diff_eq!(g.slope_y(&p), numeric, epsilon = 1e-6);
        assert!(g.slope_y(&g.si).is_finite());
    }

    #[test]
    fn test_brent_root() {
        let root = brent_root(|y| y * y - 2.0, 0.0, 2.0, 1e-12, 100).unwrap();
        assert_abs_diff_eq!(root, 2f64.sqrt(), epsilon = 1e-10);

        let err = brent_root(|y| y * y + 1.0, -1.0, 1.0, 1e-12, 100).unwrap_err();
        assert!(matches!(err, TdoaError::RootFindingError(_)));
    }

    #[test]
    fn test_brackets() {
        assert!(brackets(-1.0, 2.0));
        assert!(brackets(0.0, 2.0));
        assert!(!brackets(1.0, 2.0));
        assert!(!brackets(f64::NAN, -2.0));
    }
}
