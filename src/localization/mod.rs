//! # Locator parameters
//!
//! This module defines the [`LocatorParams`] configuration struct and its builder, which
//! control how the **least-squares solver** iterates and gives up, how **degenerate
//! geometry** is detected, and how the **isochrone tracer** samples its working domain.
//!
//! ## Purpose
//!
//! The [`LocatorParams`](crate::localization::LocatorParams) object centralizes every tunable
//! used by [`TdoaLocator::locate`](crate::locator::TdoaLocator::locate). It lets you:
//!
//! - Bound the Levenberg–Marquardt iterations and its damping schedule,
//! - Set the tolerances that decide convergence and the centroid fallback,
//! - Choose the curve-tracing strategy and its point density,
//! - Size the tracing rectangle (expansion multiple, absolute clamp),
//! - Optionally resample each branch with a natural cubic spline,
//! - Enable or disable parallel execution of the independent solves and traces.
//!
//! ## Pipeline overview
//!
//! 1. **Solve**
//!    The global 4-station solve and the four leave-one-out 3-station solves start from the
//!    centroid of their subset and run at most `max_iterations` damped Gauss–Newton steps.
//!    Subsets with a delay spread below `degenerate_delay_spread` or with collinear stations
//!    (`collinearity_tolerance`) skip the iteration and return the centroid.
//!
//! 2. **Trace**
//!    The rectangle around stations and solutions is padded by `domain_expansion` × the largest
//!    baseline (at least `min_half_width_m`) and clamped to `±max_extent_m`. It is sampled at
//!    `sample_count` abscissae, each column searched with the selected `strategy`.
//!
//! ## Example
//!
//! ```rust
//! use tdoa_locator::isochrone::StrategyKind;
//! use tdoa_locator::localization::LocatorParams;
//!
//! let params = LocatorParams::builder()
//!     .sample_count(400)
//!     .strategy(StrategyKind::GridScan)
//!     .grid_rows(300)
//!     .max_iterations(100)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.sample_count, 400);
//! ```
//!
//! ## See also
//!
//! * [`TdoaSolver`](crate::localization::solver::TdoaSolver) – consumes the solver tolerances.
//! * [`IsochroneTracer`](crate::isochrone::IsochroneTracer) – consumes the tracing settings.
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use crate::isochrone::StrategyKind;
use crate::tdoa_errors::TdoaError;

pub mod least_squares;
pub mod solution;
pub mod solver;

/// Configuration parameters controlling
/// [`TdoaLocator::locate`](crate::locator::TdoaLocator::locate).
///
/// Fields
/// -----------------
/// **Isochrone tracing**
/// * `sample_count` – number of x abscissae sampled across the tracing rectangle.
/// * `strategy` – column root-search strategy ([`StrategyKind::Bracketed`] by default).
/// * `grid_rows` – number of y cells per half-column scanned by [`StrategyKind::GridScan`].
/// * `domain_expansion` – padding of the rectangle, as a multiple of the largest baseline.
/// * `max_extent_m` – absolute clamp of the rectangle around the frame origin (m).
/// * `min_half_width_m` – minimum padding (m), keeps the domain open for coincident stations.
/// * `root_tolerance` – Brent convergence tolerance on y (m).
/// * `root_max_iter` – Brent iteration cap per column root.
/// * `smoothing_points` – if set, resample every non-trivial branch to this many points.
///
/// **Least squares**
/// * `max_iterations` – Levenberg–Marquardt iteration cap.
/// * `initial_lambda`, `lambda_up`, `lambda_down`, `max_lambda` – damping schedule.
/// * `step_tolerance` – relative step length under which the solve has converged.
/// * `cost_tolerance` – sum of squared residuals (m²) under which the solve has converged.
/// * `fallback_cost` – a non-converged solve above this cost (m²) falls back to the centroid.
///
/// **Degeneracy**
/// * `degenerate_delay_spread` – delay spread (s) under which a subset is degenerate.
/// * `collinearity_tolerance` – relative triangle area under which stations are collinear.
///
/// **Execution**
/// * `parallel` – run independent solves and traces on the rayon pool
///   (only effective with the `parallel` feature).
///
/// Defaults
/// -----------------
/// * `sample_count`: 200
/// * `strategy`: Bracketed
/// * `grid_rows`: 200
/// * `domain_expansion`: 3.0
/// * `max_extent_m`: 20 000 m
/// * `min_half_width_m`: 50 m
/// * `root_tolerance`: 1e-9 m
/// * `root_max_iter`: 100
/// * `smoothing_points`: None
/// * `max_iterations`: 200
/// * `initial_lambda`: 1e-3, `lambda_up`: 10, `lambda_down`: 0.1, `max_lambda`: 1e12
/// * `step_tolerance`: 1e-10
/// * `cost_tolerance`: 1e-20 m²
/// * `fallback_cost`: 1.0 m²
/// * `degenerate_delay_spread`: 1e-12 s
/// * `collinearity_tolerance`: 1e-9
/// * `parallel`: true
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorParams {
    // --- Isochrone tracing ---
    pub sample_count: usize,
    pub strategy: StrategyKind,
    pub grid_rows: usize,
    pub domain_expansion: f64,
    pub max_extent_m: f64,
    pub min_half_width_m: f64,
    pub root_tolerance: f64,
    pub root_max_iter: usize,
    pub smoothing_points: Option<usize>,

    // --- Least squares ---
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    pub max_lambda: f64,
    pub step_tolerance: f64,
    pub cost_tolerance: f64,
    pub fallback_cost: f64,

    // --- Degeneracy ---
    pub degenerate_delay_spread: f64,
    pub collinearity_tolerance: f64,

    // --- Execution ---
    pub parallel: bool,
}

impl LocatorParams {
    /// Create a new [`LocatorParamsBuilder`] initialized with the defaults.
    pub fn builder() -> LocatorParamsBuilder {
        LocatorParamsBuilder::new()
    }
}

impl Default for LocatorParams {
    fn default() -> Self {
        LocatorParams {
            sample_count: 200,
            strategy: StrategyKind::Bracketed,
            grid_rows: 200,
            domain_expansion: 3.0,
            max_extent_m: 20_000.0,
            min_half_width_m: 50.0,
            root_tolerance: 1e-9,
            root_max_iter: 100,
            smoothing_points: None,

            max_iterations: 200,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e12,
            step_tolerance: 1e-10,
            cost_tolerance: 1e-20,
            fallback_cost: 1.0,

            degenerate_delay_spread: 1e-12,
            collinearity_tolerance: 1e-9,

            parallel: true,
        }
    }
}

/// Builder for [`LocatorParams`], with validation.
#[derive(Debug, Clone)]
pub struct LocatorParamsBuilder {
    params: LocatorParams,
}

impl Default for LocatorParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: LocatorParams::default(),
        }
    }

    // --- Isochrone tracing ---
    pub fn sample_count(mut self, v: usize) -> Self {
        self.params.sample_count = v;
        self
    }
    pub fn strategy(mut self, v: StrategyKind) -> Self {
        self.params.strategy = v;
        self
    }
    pub fn grid_rows(mut self, v: usize) -> Self {
        self.params.grid_rows = v;
        self
    }
    pub fn domain_expansion(mut self, v: f64) -> Self {
        self.params.domain_expansion = v;
        self
    }
    pub fn max_extent_m(mut self, v: f64) -> Self {
        self.params.max_extent_m = v;
        self
    }
    pub fn min_half_width_m(mut self, v: f64) -> Self {
        self.params.min_half_width_m = v;
        self
    }
    pub fn root_tolerance(mut self, v: f64) -> Self {
        self.params.root_tolerance = v;
        self
    }
    pub fn root_max_iter(mut self, v: usize) -> Self {
        self.params.root_max_iter = v;
        self
    }
    pub fn smoothing_points(mut self, v: Option<usize>) -> Self {
        self.params.smoothing_points = v;
        self
    }

    // --- Least squares ---
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn initial_lambda(mut self, v: f64) -> Self {
        self.params.initial_lambda = v;
        self
    }
    pub fn lambda_up(mut self, v: f64) -> Self {
        self.params.lambda_up = v;
        self
    }
    pub fn lambda_down(mut self, v: f64) -> Self {
        self.params.lambda_down = v;
        self
    }
    pub fn max_lambda(mut self, v: f64) -> Self {
        self.params.max_lambda = v;
        self
    }
    pub fn step_tolerance(mut self, v: f64) -> Self {
        self.params.step_tolerance = v;
        self
    }
    pub fn cost_tolerance(mut self, v: f64) -> Self {
        self.params.cost_tolerance = v;
        self
    }
    pub fn fallback_cost(mut self, v: f64) -> Self {
        self.params.fallback_cost = v;
        self
    }

    // --- Degeneracy ---
    pub fn degenerate_delay_spread(mut self, v: f64) -> Self {
        self.params.degenerate_delay_spread = v;
        self
    }
    pub fn collinearity_tolerance(mut self, v: f64) -> Self {
        self.params.collinearity_tolerance = v;
        self
    }

    // --- Execution ---
    pub fn parallel(mut self, v: bool) -> Self {
        self.params.parallel = v;
        self
    }

    // ---- Numeric helpers for PartialOrd (handle NaN as invalid) ----

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Return true iff a < b and comparable (i.e., not NaN).
    #[inline]
    fn lt(a: f64, b: f64) -> bool {
        a.partial_cmp(&b) == Some(Less)
    }

    /// Finalize the builder and produce a [`LocatorParams`] instance.
    ///
    /// Validation rules
    /// -----------------
    /// * `sample_count >= 2`, `grid_rows >= 2`, `root_max_iter >= 1`, `max_iterations >= 1`.
    /// * `smoothing_points`, when set, must be `>= 2`.
    /// * `domain_expansion >= 0`, `max_extent_m > 0`, `min_half_width_m > 0`,
    ///   `min_half_width_m < max_extent_m`, all finite.
    /// * `root_tolerance > 0`, `step_tolerance > 0`, `cost_tolerance >= 0`, `fallback_cost > 0`.
    /// * `0 < initial_lambda < max_lambda`, `lambda_up > 1`, `0 < lambda_down < 1`.
    /// * `degenerate_delay_spread >= 0`, `collinearity_tolerance >= 0`.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(LocatorParams)` if every rule holds.
    /// * `Err(TdoaError::InvalidLocatorParameter)` naming the first rule that failed.
    pub fn build(self) -> Result<LocatorParams, TdoaError> {
        let p = &self.params;
        let invalid = |msg: &str| Err(TdoaError::InvalidLocatorParameter(msg.into()));

        // --- Counts ---
        if p.sample_count < 2 {
            return invalid("sample_count must be >= 2");
        }
        if p.grid_rows < 2 {
            return invalid("grid_rows must be >= 2");
        }
        if p.root_max_iter == 0 {
            return invalid("root_max_iter must be >= 1");
        }
        if p.max_iterations == 0 {
            return invalid("max_iterations must be >= 1");
        }
        if matches!(p.smoothing_points, Some(n) if n < 2) {
            return invalid("smoothing_points must be >= 2 when set");
        }

        // --- Domain sizing ---
        if !Self::ge0(p.domain_expansion) || !p.domain_expansion.is_finite() {
            return invalid("domain_expansion must be finite and >= 0");
        }
        if !Self::gt0(p.max_extent_m) || !p.max_extent_m.is_finite() {
            return invalid("max_extent_m must be finite and > 0");
        }
        if !Self::gt0(p.min_half_width_m) || !Self::lt(p.min_half_width_m, p.max_extent_m) {
            return invalid("require 0 < min_half_width_m < max_extent_m");
        }

        // --- Tolerances ---
        if !Self::gt0(p.root_tolerance) {
            return invalid("root_tolerance must be > 0");
        }
        if !Self::gt0(p.step_tolerance) {
            return invalid("step_tolerance must be > 0");
        }
        if !Self::ge0(p.cost_tolerance) {
            return invalid("cost_tolerance must be >= 0");
        }
        if !Self::gt0(p.fallback_cost) {
            return invalid("fallback_cost must be > 0");
        }

        // --- Damping schedule ---
        if !Self::gt0(p.initial_lambda) || !Self::lt(p.initial_lambda, p.max_lambda) {
            return invalid("require 0 < initial_lambda < max_lambda");
        }
        if !Self::lt(1.0, p.lambda_up) {
            return invalid("lambda_up must be > 1");
        }
        if !Self::gt0(p.lambda_down) || !Self::lt(p.lambda_down, 1.0) {
            return invalid("require 0 < lambda_down < 1");
        }

        // --- Degeneracy ---
        if !Self::ge0(p.degenerate_delay_spread) {
            return invalid("degenerate_delay_spread must be >= 0");
        }
        if !Self::ge0(p.collinearity_tolerance) {
            return invalid("collinearity_tolerance must be >= 0");
        }

        Ok(self.params)
    }
}

impl fmt::Display for LocatorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "TDOA Locator Parameters")?;
            writeln!(f, "-----------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Isochrone tracing]")?;
            line!("sample_count       = {}", self.sample_count, "Abscissae per curve")?;
            line!("strategy           = {}", self.strategy, "Column root search")?;
            line!("grid_rows          = {}", self.grid_rows, "Cells per half-column (grid)")?;
            line!(
                "domain_expansion   = {:.2}",
                self.domain_expansion,
                "Padding / largest baseline"
            )?;
            line!("max_extent_m       = {:.1} m", self.max_extent_m, "Absolute domain clamp")?;
            line!("min_half_width_m   = {:.1} m", self.min_half_width_m, "Minimum padding")?;
            line!("root_tolerance     = {:.1e} m", self.root_tolerance, "Brent tolerance")?;
            line!("root_max_iter      = {}", self.root_max_iter, "Brent iteration cap")?;
            match self.smoothing_points {
                Some(n) => line!("smoothing_points   = {}", n, "Spline resampling")?,
                None => line!("smoothing_points   = {}", "off", "Spline resampling")?,
            }

            writeln!(f, "\n[Least squares]")?;
            line!("max_iterations     = {}", self.max_iterations, "LM iteration cap")?;
            line!("initial_lambda     = {:.1e}", self.initial_lambda, "Initial damping")?;
            line!("lambda_up          = {:.2}", self.lambda_up, "Damping increase")?;
            line!("lambda_down        = {:.2}", self.lambda_down, "Damping decrease")?;
            line!("max_lambda         = {:.1e}", self.max_lambda, "Damping give-up bound")?;
            line!("step_tolerance     = {:.1e}", self.step_tolerance, "Relative step")?;
            line!("cost_tolerance     = {:.1e} m²", self.cost_tolerance, "Residual cost")?;
            line!("fallback_cost      = {:.2} m²", self.fallback_cost, "Centroid fallback")?;

            writeln!(f, "\n[Degeneracy]")?;
            line!(
                "delay_spread       = {:.1e} s",
                self.degenerate_delay_spread,
                "Minimum delay spread"
            )?;
            line!(
                "collinearity_tol   = {:.1e}",
                self.collinearity_tolerance,
                "Relative triangle area"
            )?;

            writeln!(f, "\n[Execution]")?;
            line!("parallel           = {}", self.parallel, "Rayon pool")?;

            Ok(())
        } else {
            write!(
                f,
                "LocatorParams(samples={}, strategy={}, expansion={:.2}, extent≤{:.0}m, lm_iter≤{}, smoothing={:?}, parallel={})",
                self.sample_count,
                self.strategy,
                self.domain_expansion,
                self.max_extent_m,
                self.max_iterations,
                self.smoothing_points,
                self.parallel,
            )
        }
    }
}
