//! # Location report
//!
//! Packages the outcome of one locate call into the JSON document consumed by the map
//! front end, and renders the error document used for every failure.
//!
//! ## Success document
//!
//! ```text
//! {
//!   "stations":        [{"lat", "lon"} × 4],
//!   "global_solution": {"lat", "lon"},
//!   "omit_solutions":  [{"lat", "lon"} × 4],         // omitted station 0, 1, 2, 3
//!   "hyperbolas":      [{"pair": [i, j], "branches": [[{"lat", "lon"}, …], […]]} × 6]
//! }
//! ```
//!
//! Keys appear in this order. All coordinates are decimal degrees; every value is finite,
//! which [`LocationReport::assemble`] checks before anything is encoded.
//!
//! ## Error document
//!
//! `{"error": "<message>"}` and nothing else, see [`error_json`].
use serde::Serialize;

use crate::constants::STATION_COUNT;
use crate::isochrone::IsochroneCurve;
use crate::localization::solution::Solution;
use crate::projection::{GeoPoint, PlanarPoint, ReferenceFrame};
use crate::request::Station;
use crate::tdoa_errors::TdoaError;

/// One traced isochrone in geodetic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HyperbolaEntry {
    pub pair: [usize; 2],
    /// Upper branch, then lower branch; each ordered by increasing easting.
    pub branches: [Vec<GeoPoint>; 2],
}

/// The success document of one locate call.
///
/// The planar [`Solution`]s it was built from stay available through
/// [`LocationReport::global_diagnostics`] and [`LocationReport::omit_diagnostics`]; they are
/// not part of the encoded document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub stations: [GeoPoint; STATION_COUNT],
    pub global_solution: GeoPoint,
    pub omit_solutions: Vec<GeoPoint>,
    pub hyperbolas: Vec<HyperbolaEntry>,

    #[serde(skip)]
    global: Solution,
    #[serde(skip)]
    omit: Vec<Solution>,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    error: &'a str,
}

/// Encoded when even the error document cannot be produced.
const ENCODING_FAILURE_JSON: &str = r#"{"error":"failed to encode the error message"}"#;

impl LocationReport {
    /// Convert the planar results to geodetic coordinates and package them.
    ///
    /// Arguments
    /// -----------------
    /// * `frame`: the request frame the planar results are expressed in.
    /// * `stations`: the request stations, in input order.
    /// * `global`: the all-station solution.
    /// * `omit`: leave-one-out solutions, ascending omitted station.
    /// * `curves`: traced isochrones, ascending pair.
    ///
    /// Return
    /// ----------
    /// * The report.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::DegenerateGeometry`] if any output coordinate is not finite.
    pub fn assemble(
        frame: &ReferenceFrame,
        stations: &[Station; STATION_COUNT],
        global: Solution,
        omit: Vec<Solution>,
        curves: &[IsochroneCurve],
    ) -> Result<Self, TdoaError> {
        let to_geo = |p: &PlanarPoint| frame.point_to_geodetic(p);

        let report = LocationReport {
            stations: stations.map(|s| s.position),
            global_solution: to_geo(&global.position()),
            omit_solutions: omit.iter().map(|s| to_geo(&s.position())).collect(),
            hyperbolas: curves
                .iter()
                .map(|c| HyperbolaEntry {
                    pair: c.pair().as_array(),
                    branches: c.branches().clone().map(|b| b.iter().map(to_geo).collect()),
                })
                .collect(),
            global,
            omit,
        };

        report.check_finite()?;
        Ok(report)
    }

    fn check_finite(&self) -> Result<(), TdoaError> {
        let finite = |p: &GeoPoint| p.lat.is_finite() && p.lon.is_finite();

        let named = [
            ("station", self.stations.iter().all(finite)),
            ("global solution", finite(&self.global_solution)),
            ("leave-one-out solution", self.omit_solutions.iter().all(finite)),
            (
                "isochrone point",
                self.hyperbolas
                    .iter()
                    .flat_map(|h| h.branches.iter().flatten())
                    .all(finite),
            ),
        ];

        match named.iter().find(|(_, ok)| !ok) {
            Some((what, _)) => Err(TdoaError::DegenerateGeometry(format!(
                "non-finite {what} coordinate in the output"
            ))),
            None => Ok(()),
        }
    }

    pub fn global_diagnostics(&self) -> &Solution {
        &self.global
    }

    pub fn omit_diagnostics(&self) -> &[Solution] {
        &self.omit
    }

    /// Number of solutions that fell back to their subset centroid.
    pub fn degenerate_count(&self) -> usize {
        std::iter::once(&self.global)
            .chain(&self.omit)
            .filter(|s| s.is_degenerate())
            .count()
    }

    /// Encode the success document, compact or indented.
    pub fn to_json(&self, pretty: bool) -> Result<String, TdoaError> {
        let encoded = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(encoded)
    }
}

/// Encode `{"error": message}`.
pub fn error_json(err: &TdoaError, pretty: bool) -> String {
    let message = err.to_string();
    let report = ErrorReport { error: &message };
    let encoded = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    encoded.unwrap_or_else(|_| ENCODING_FAILURE_JSON.to_string())
}

/// Encode the outcome of a locate call as exactly one JSON document.
pub fn render(outcome: Result<LocationReport, TdoaError>, pretty: bool) -> String {
    match outcome.and_then(|report| report.to_json(pretty)) {
        Ok(json) => json,
        Err(err) => error_json(&err, pretty),
    }
}
