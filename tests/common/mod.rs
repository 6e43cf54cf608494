#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use serde_json::Value;
use tdoa_locator::constants::STATION_COUNT;
use tdoa_locator::projection::{GeoPoint, PlanarPoint, ReferenceFrame};

/// Arrival epoch added to every delay, the solver only sees differences.
pub const EPOCH: f64 = 1_700.25;

/// A square of stations with a known source, expressed in the frame of station 0.
pub struct Scenario {
    pub frame: ReferenceFrame,
    pub corners: [PlanarPoint; STATION_COUNT],
    pub source: PlanarPoint,
    pub speed: f64,
}

impl Scenario {
    /// Stations on the corners of a `side` meter square, counter-clockwise from the anchor.
    pub fn square(anchor: GeoPoint, side: f64, source: PlanarPoint, speed: f64) -> Self {
        Scenario {
            frame: ReferenceFrame::new(anchor).unwrap(),
            corners: [
                PlanarPoint::new(0.0, 0.0),
                PlanarPoint::new(side, 0.0),
                PlanarPoint::new(side, side),
                PlanarPoint::new(0.0, side),
            ],
            source,
            speed,
        }
    }

    /// The 100 m square with the source 30 m north of its centre.
    pub fn reference() -> Self {
        Scenario::square(
            GeoPoint::new(43.6045, 1.4442),
            100.0,
            PlanarPoint::new(50.0, 80.0),
            343.0,
        )
    }

    pub fn stations(&self) -> [GeoPoint; STATION_COUNT] {
        self.corners.map(|c| self.frame.point_to_geodetic(&c))
    }

    /// Noiseless arrival times of the source at every station.
    pub fn delays(&self) -> [f64; STATION_COUNT] {
        self.corners
            .map(|c| EPOCH + (self.source - c).norm() / self.speed)
    }

    /// The 12 positional values `lat1 lon1 … lat4 lon4 t1 … t4`.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .stations()
            .iter()
            .flat_map(|p| [p.lat.to_string(), p.lon.to_string()])
            .collect();
        args.extend(self.delays().iter().map(|d| d.to_string()));
        args
    }

    pub fn to_planar(&self, json_point: &Value) -> PlanarPoint {
        let geo = GeoPoint::new(
            json_point["lat"].as_f64().unwrap(),
            json_point["lon"].as_f64().unwrap(),
        );
        self.frame.geodetic_to_planar(&geo)
    }

    /// `|P - S_i| - |P - S_j| - v (d_i - d_j)` for the scenario delays.
    pub fn isochrone_residual(&self, i: usize, j: usize, p: &PlanarPoint) -> f64 {
        let d = self.delays();
        (p - self.corners[i]).norm() - (p - self.corners[j]).norm() - self.speed * (d[i] - d[j])
    }
}

pub fn assert_planar_close(actual: &PlanarPoint, expected: &PlanarPoint, epsilon: f64) {
    assert_abs_diff_eq!(actual.x, expected.x, epsilon = epsilon);
    assert_abs_diff_eq!(actual.y, expected.y, epsilon = epsilon);
}

pub fn parse(json: &str) -> Value {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("invalid JSON ({e}): {json}"))
}
