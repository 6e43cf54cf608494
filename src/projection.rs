//! # Local planar projection
//!
//! Conversion between **geodetic coordinates** (latitude/longitude in degrees) and a
//! **local planar frame** (x east, y north, in meters) anchored at a reference point.
//!
//! ## Model
//!
//! The projection is the equirectangular (plate carrée) approximation around the anchor:
//!
//! ```text
//! x = (lon - lon_ref) · k_lon        k_lon = 111320 · cos(lat_ref)   [m/deg]
//! y = (lat - lat_ref) · k_lat        k_lat = 111320                  [m/deg]
//! ```
//!
//! Given a fixed anchor the map is linear, so the inverse is exact and needs no iteration.
//!
//! ## Validity
//!
//! Earth curvature and ellipsoid flattening are ignored. The planar distances are good to
//! the centimeter level within a few kilometers of the anchor and degrade quadratically
//! beyond that; callers must keep station baselines short. The projection is undefined at
//! the poles, where `cos(lat_ref)` vanishes.
//!
//! ## See also
//! ------------
//! * [`ReferenceFrame::geodetic_to_planar`] – Forward map.
//! * [`ReferenceFrame::planar_to_geodetic`] – Inverse map.
use nalgebra::Vector2;
use serde::Serialize;

use crate::constants::{Degree, Meter, METERS_PER_DEG_LAT};
use crate::tdoa_errors::TdoaError;

/// A planar position (x east, y north) in meters.
pub type PlanarPoint = Vector2<f64>;

/// A geodetic position in decimal degrees.
///
/// Serializes as `{"lat": .., "lon": ..}`, the shape expected by the mapping front end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    /// Latitude in degrees, north positive.
    pub lat: Degree,
    /// Longitude in degrees, east positive.
    pub lon: Degree,
}

impl GeoPoint {
    pub fn new(lat: Degree, lon: Degree) -> Self {
        GeoPoint { lat, lon }
    }

    /// Check that both components are finite and within their geodetic ranges.
    ///
    /// Latitude must lie strictly inside `(-90, 90)`: the longitude scale factor of a
    /// frame anchored at a pole is zero.
    pub fn validate(&self) -> Result<(), String> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(format!("non-finite coordinate ({}, {})", self.lat, self.lon));
        }
        if self.lat <= -90.0 || self.lat >= 90.0 {
            return Err(format!("latitude {} outside (-90, 90)", self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("longitude {} outside [-180, 180]", self.lon));
        }
        Ok(())
    }
}

/// Local flat-Earth frame anchored at a geodetic point.
///
/// Built once per request from the reference station and never mutated. Holds the two
/// scale factors of the equirectangular approximation so that both directions of the
/// map are a single multiply-add per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    anchor: GeoPoint,
    meters_per_deg_lat: f64,
    meters_per_deg_lon: f64,
}

impl ReferenceFrame {
    /// Build the frame anchored at `anchor`.
    ///
    /// Arguments
    /// -----------------
    /// * `anchor`: the geodetic origin of the frame (station 0 of a request).
    ///
    /// Return
    /// ----------
    /// * The frame, or [`TdoaError::InvalidStationCoordinate`] if the anchor is not a valid
    ///   geodetic point (non-finite, or at a pole).
    pub fn new(anchor: GeoPoint) -> Result<Self, TdoaError> {
        anchor
            .validate()
            .map_err(|reason| TdoaError::InvalidStationCoordinate { station: 0, reason })?;

        Ok(ReferenceFrame {
            anchor,
            meters_per_deg_lat: METERS_PER_DEG_LAT,
            meters_per_deg_lon: METERS_PER_DEG_LAT * anchor.lat.to_radians().cos(),
        })
    }

    pub fn anchor(&self) -> GeoPoint {
        self.anchor
    }

    pub fn meters_per_deg_lat(&self) -> f64 {
        self.meters_per_deg_lat
    }

    pub fn meters_per_deg_lon(&self) -> f64 {
        self.meters_per_deg_lon
    }

    /// Project a geodetic point into the planar frame.
    ///
    /// Arguments
    /// -----------------
    /// * `point`: geodetic position in degrees.
    ///
    /// Return
    /// ----------
    /// * `(x, y)` in meters, x east and y north of the anchor.
    pub fn geodetic_to_planar(&self, point: &GeoPoint) -> PlanarPoint {
        PlanarPoint::new(
            (point.lon - self.anchor.lon) * self.meters_per_deg_lon,
            (point.lat - self.anchor.lat) * self.meters_per_deg_lat,
        )
    }

    /// Map a planar position back to geodetic coordinates.
    ///
    /// Exact inverse of [`ReferenceFrame::geodetic_to_planar`].
    ///
    /// Arguments
    /// -----------------
    /// * `x`: easting in meters.
    /// * `y`: northing in meters.
    ///
    /// Return
    /// ----------
    /// * The geodetic point in degrees.
    pub fn planar_to_geodetic(&self, x: Meter, y: Meter) -> GeoPoint {
        GeoPoint {
            lat: self.anchor.lat + y / self.meters_per_deg_lat,
            lon: self.anchor.lon + x / self.meters_per_deg_lon,
        }
    }

    /// Convenience wrapper of [`ReferenceFrame::planar_to_geodetic`] for a [`PlanarPoint`].
    pub fn point_to_geodetic(&self, p: &PlanarPoint) -> GeoPoint {
        self.planar_to_geodetic(p.x, p.y)
    }
}
