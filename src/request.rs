//! # Locate requests and stations
//!
//! A [`LocateRequest`] is the complete input of one solve: the four [`Station`]s in their
//! fixed order and an optional ambient temperature. It is validated on construction, so
//! every downstream component can assume finite coordinates and delays.
//!
//! ## Argument layout
//!
//! The batch entry point ([`LocateRequest::from_args`]) accepts the flat argument list
//! produced by the scheduling collaborator:
//!
//! ```text
//! lat1 lon1 lat2 lon2 lat3 lon3 lat4 lon4 t1 t2 t3 t4 [temperature_c]
//! ```
//!
//! Positions in error messages are **1-based**, matching the argument list.
use crate::constants::{Celsius, Second, STATION_COUNT};
use crate::projection::{GeoPoint, PlanarPoint, ReferenceFrame};
use crate::propagation::speed_of_sound;
use crate::tdoa_errors::TdoaError;

/// Number of mandatory positional values: 4 × (lat, lon) + 4 delays.
const REQUIRED_ARGS: usize = 3 * STATION_COUNT;

/// One sensor station of a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    /// Index of the station in the request, `0..4`.
    pub id: usize,
    pub position: GeoPoint,
    /// Arrival time of the event at this station (s), on an arbitrary common epoch.
    pub delay: Second,
}

/// A [`Station`] expressed in the request's [`ReferenceFrame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarStation {
    pub id: usize,
    pub position: PlanarPoint,
    pub delay: Second,
}

/// Validated input of one locate call.
#[derive(Debug, Clone, PartialEq)]
pub struct LocateRequest {
    stations: [Station; STATION_COUNT],
    temperature_c: Option<Celsius>,
}

impl LocateRequest {
    /// Build a request from station positions and delays given in station order.
    ///
    /// Arguments
    /// -----------------
    /// * `positions`: geodetic position of each station; index 0 is the reference.
    /// * `delays`: arrival time at each station (s), same order as `positions`.
    /// * `temperature_c`: optional ambient temperature.
    ///
    /// Return
    /// ----------
    /// * The validated request.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::InvalidStationCoordinate`] for a non-finite or out-of-range position.
    /// * [`TdoaError::NonFiniteArgument`] for a non-finite delay or temperature, or a
    ///   temperature giving a non-positive speed of sound.
    pub fn new(
        positions: [GeoPoint; STATION_COUNT],
        delays: [Second; STATION_COUNT],
        temperature_c: Option<Celsius>,
    ) -> Result<Self, TdoaError> {
        for (id, p) in positions.iter().enumerate() {
            p.validate()
                .map_err(|reason| TdoaError::InvalidStationCoordinate { station: id, reason })?;
        }
        for (id, d) in delays.iter().enumerate() {
            if !d.is_finite() {
                return Err(TdoaError::NonFiniteArgument {
                    position: 2 * STATION_COUNT + id + 1,
                    value: *d,
                });
            }
        }
        if let Some(t) = temperature_c {
            if !t.is_finite() || speed_of_sound(Some(t)) <= 0.0 {
                return Err(TdoaError::NonFiniteArgument {
                    position: REQUIRED_ARGS + 1,
                    value: t,
                });
            }
        }

        let stations = std::array::from_fn(|id| Station {
            id,
            position: positions[id],
            delay: delays[id],
        });

        Ok(LocateRequest {
            stations,
            temperature_c,
        })
    }

    /// Parse the flat batch argument list.
    ///
    /// Arguments
    /// -----------------
    /// * `args`: 12 values (`lat1 lon1 … lat4 lon4 t1 … t4`) or 13 with a trailing
    ///   temperature in °C. The program name must not be included.
    ///
    /// Return
    /// ----------
    /// * The validated request; nothing is computed before every value has parsed.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::InvalidArgumentCount`] when the list has neither 12 nor 13 entries.
    /// * [`TdoaError::NonNumericArgument`] / [`TdoaError::NonFiniteArgument`] for a bad value.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, TdoaError> {
        if args.len() != REQUIRED_ARGS && args.len() != REQUIRED_ARGS + 1 {
            return Err(TdoaError::InvalidArgumentCount {
                expected: format!("{} or {}", REQUIRED_ARGS, REQUIRED_ARGS + 1),
                got: args.len(),
            });
        }

        let values = args
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_finite(i + 1, raw.as_ref()))
            .collect::<Result<Vec<f64>, TdoaError>>()?;

        let positions = std::array::from_fn(|i| GeoPoint::new(values[2 * i], values[2 * i + 1]));
        let delays = std::array::from_fn(|i| values[2 * STATION_COUNT + i]);
        let temperature_c = values.get(REQUIRED_ARGS).copied();

        Self::new(positions, delays, temperature_c)
    }

    pub fn stations(&self) -> &[Station; STATION_COUNT] {
        &self.stations
    }

    pub fn temperature_c(&self) -> Option<Celsius> {
        self.temperature_c
    }

    /// The frame anchored at station 0.
    pub fn reference_frame(&self) -> Result<ReferenceFrame, TdoaError> {
        ReferenceFrame::new(self.stations[0].position)
    }

    /// Project every station into `frame`, keeping ids and delays.
    pub fn planar_stations(&self, frame: &ReferenceFrame) -> [PlanarStation; STATION_COUNT] {
        self.stations.map(|s| PlanarStation {
            id: s.id,
            position: frame.geodetic_to_planar(&s.position),
            delay: s.delay,
        })
    }
}

fn parse_finite(position: usize, raw: &str) -> Result<f64, TdoaError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| TdoaError::NonNumericArgument {
            position,
            value: raw.to_string(),
        })?;
    if !value.is_finite() {
        return Err(TdoaError::NonFiniteArgument { position, value });
    }
    Ok(value)
}

#[cfg(test)]
mod request_test {
    use super::*;

    fn args(extra: &[&str]) -> Vec<String> {
        let mut base: Vec<String> = [
            "45.0", "3.0", "45.001", "3.0", "45.0", "3.001", "45.001", "3.001", "0.0", "0.1",
            "0.2", "0.3",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        base.extend(extra.iter().map(|s| s.to_string()));
        base
    }

    #[test]
    fn test_parse_twelve_args() {
        let req = LocateRequest::from_args(&args(&[])).unwrap();
        assert_eq!(req.temperature_c(), None);
        assert_eq!(req.stations()[2].position, GeoPoint::new(45.0, 3.001));
        assert_eq!(req.stations()[3].delay, 0.3);
        assert_eq!(req.stations()[3].id, 3);
    }

    #[test]
    fn test_parse_with_temperature() {
        let req = LocateRequest::from_args(&args(&["21.5"])).unwrap();
        assert_eq!(req.temperature_c(), Some(21.5));
    }

    #[test]
    fn test_wrong_count() {
        let err = LocateRequest::from_args(&args(&["1", "2"])).unwrap_err();
        assert_eq!(
            err,
            TdoaError::InvalidArgumentCount {
                expected: "12 or 13".into(),
                got: 14
            }
        );
        let err = LocateRequest::from_args::<&str>(&[]).unwrap_err();
        assert!(matches!(err, TdoaError::InvalidArgumentCount { got: 0, .. }));
    }

    #[test]
    fn test_non_numeric() {
        let mut a = args(&[]);
        a[9] = "soon".into();
        let err = LocateRequest::from_args(&a).unwrap_err();
        assert_eq!(
            err,
            TdoaError::NonNumericArgument {
                position: 10,
                value: "soon".into()
            }
        );
    }

    #[test]
    fn test_non_finite() {
        let mut a = args(&[]);
        a[0] = "NaN".into();
        let err = LocateRequest::from_args(&a).unwrap_err();
        assert!(matches!(
            err,
            TdoaError::NonFiniteArgument { position: 1, .. }
        ));

        let err = LocateRequest::from_args(&args(&["-600"])).unwrap_err();
        assert!(matches!(
            err,
            TdoaError::NonFiniteArgument { position: 13, .. }
        ));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut a = args(&[]);
        a[2] = "95.0".into();
        let err = LocateRequest::from_args(&a).unwrap_err();
        assert!(matches!(
            err,
            TdoaError::InvalidStationCoordinate { station: 1, .. }
        ));
    }

    #[test]
    fn test_planar_stations_reference_is_origin() {
        let req = LocateRequest::from_args(&args(&[])).unwrap();
        let frame = req.reference_frame().unwrap();
        let planar = req.planar_stations(&frame);
        assert_eq!(planar[0].position, PlanarPoint::zeros());
        assert!(planar[1].position.y > 111.0 && planar[1].position.y < 112.0);
        assert!(planar[2].position.x > 78.0 && planar[2].position.x < 79.0);
    }
}
