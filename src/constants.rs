//! # Constants and type definitions
//!
//! This module centralizes the **physical constants**, **projection factors**, and
//! **unit aliases** shared by the projector, the propagation model, the solver and
//! the isochrone tracer.
//!
//! ## Overview
//!
//! - Equirectangular projection scale (meters per degree of latitude)
//! - Acoustic propagation constants (default speed, temperature law)
//! - Request geometry (number of stations, minimum stations per solve)
//! - Unit aliases used in signatures across the crate

// -------------------------------------------------------------------------------------------------
// Projection
// -------------------------------------------------------------------------------------------------

/// Meters per degree of latitude used by the local flat-Earth projection.
///
/// The same constant, scaled by `cos(latitude)`, gives meters per degree of longitude.
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

// -------------------------------------------------------------------------------------------------
// Acoustic propagation
// -------------------------------------------------------------------------------------------------

/// Speed of sound in dry air used when no ambient temperature is supplied (m/s)
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Speed of sound at 0 °C (m/s), intercept of the linear temperature law
pub const SPEED_OF_SOUND_AT_ZERO_C: f64 = 331.3;

/// Slope of the linear temperature law (m/s per °C)
pub const SPEED_OF_SOUND_SLOPE: f64 = 0.606;

// -------------------------------------------------------------------------------------------------
// Request geometry
// -------------------------------------------------------------------------------------------------

/// Number of stations in every locate request
pub const STATION_COUNT: usize = 4;

/// Smallest station subset the least-squares solver accepts
pub const MIN_SOLVE_STATIONS: usize = 3;

/// Number of unordered station pairs, `C(4, 2)`
pub const PAIR_COUNT: usize = STATION_COUNT * (STATION_COUNT - 1) / 2;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Distance in meters
pub type Meter = f64;
/// Duration in seconds
pub type Second = f64;
/// Temperature in degrees Celsius
pub type Celsius = f64;
/// Speed in meters per second
pub type MetersPerSecond = f64;
