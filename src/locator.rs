//! # TDOA locator
//!
//! [`TdoaLocator`] runs the whole pipeline for one request:
//!
//! 1. anchor a [`ReferenceFrame`](crate::projection::ReferenceFrame) at station 0 and project
//!    the stations,
//! 2. derive the propagation speed from the optional temperature,
//! 3. solve globally and leave-one-out (concurrently when enabled),
//! 4. size the [`TracingDomain`] around stations and solutions and trace the six isochrones,
//! 5. assemble the geodetic [`LocationReport`].
//!
//! A locator holds only its [`LocatorParams`]; every call is independent and nothing is
//! cached between requests.
//!
//! ## Example
//!
//! ```rust
//! use tdoa_locator::locator::TdoaLocator;
//!
//! let args = [
//!     "45.0", "5.0", "45.0", "5.00127", "45.0009", "5.00127", "45.0009", "5.0",
//!     "0.20", "0.25", "0.31", "0.27",
//! ];
//! let json = TdoaLocator::default().run_to_json(&args, false);
//! assert!(json.starts_with(r#"{"stations":"#));
//! ```
use std::any::Any;
use std::iter::once;
use std::panic::{self, AssertUnwindSafe};

use smallvec::SmallVec;
use tracing::{debug, info};

use crate::execution::join;
use crate::isochrone::{IsochroneTracer, TracingDomain};
use crate::localization::solver::TdoaSolver;
use crate::localization::LocatorParams;
use crate::projection::PlanarPoint;
use crate::propagation::speed_of_sound;
use crate::report::{render, LocationReport};
use crate::request::LocateRequest;
use crate::tdoa_errors::TdoaError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TdoaLocator {
    params: LocatorParams,
}

impl TdoaLocator {
    pub fn new(params: LocatorParams) -> Self {
        TdoaLocator { params }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    /// Locate the source of one validated request.
    ///
    /// Arguments
    /// -----------------
    /// * `request`: four stations with delays and an optional temperature.
    ///
    /// Return
    /// ----------
    /// * The report with the global solution, the four leave-one-out solutions (ascending
    ///   omitted station) and the six isochrones (ascending pair). Degenerate subsets are
    ///   reported with their centroid fallback, they do not fail the call.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::InvalidStationCoordinate`] if station 0 cannot anchor a frame.
    /// * [`TdoaError::DegenerateGeometry`] if a non-finite value reaches the output.
    pub fn locate(&self, request: &LocateRequest) -> Result<LocationReport, TdoaError> {
        let frame = request.reference_frame()?;
        let speed = speed_of_sound(request.temperature_c());
        let stations = request.planar_stations(&frame);
        debug!(speed, params = %self.params, "locating");

        let solver = TdoaSolver::new(&self.params, speed);
        let (global, omit) = join(
            self.params.parallel,
            || solver.solve_global(&stations),
            || solver.solve_leave_one_out(&stations),
        );
        let (global, omit) = (global?, omit?);

        let station_positions: SmallVec<[PlanarPoint; 4]> =
            stations.iter().map(|s| s.position).collect();
        let solved_positions: SmallVec<[PlanarPoint; 5]> =
            once(&global).chain(&omit).map(|s| s.position()).collect();

        let domain =
            TracingDomain::from_geometry(&station_positions, &solved_positions, &self.params)?;
        let tracer = IsochroneTracer::new(&self.params, &stations, speed, domain);
        let curves = tracer.trace_all()?;

        let report = LocationReport::assemble(&frame, request.stations(), global, omit, &curves)?;
        info!(
            global = %report.global_diagnostics(),
            degenerate = report.degenerate_count(),
            curve_points = curves.iter().map(|c| c.point_count()).sum::<usize>(),
            "source located"
        );
        Ok(report)
    }

    /// Parse the flat argument list, then [`TdoaLocator::locate`].
    pub fn locate_args<S: AsRef<str>>(&self, args: &[S]) -> Result<LocationReport, TdoaError> {
        let request = LocateRequest::from_args(args)?;
        self.locate(&request)
    }

    /// Run one request from its argument list and encode the outcome.
    ///
    /// Return
    /// ----------
    /// * Exactly one JSON document: the success document, or `{"error": ...}` for any
    ///   failure, including a panic inside the pipeline.
    pub fn run_to_json<S: AsRef<str>>(&self, args: &[S], pretty: bool) -> String {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.locate_args(args)))
            .unwrap_or_else(|payload| Err(TdoaError::InternalFailure(panic_message(&*payload))));
        render(outcome, pretty)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
