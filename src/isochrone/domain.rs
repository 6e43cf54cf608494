//! Working rectangle of the isochrone tracer.
//!
//! The rectangle starts as the bounding box of every station and every solved position,
//! is padded on each side by `max(domain_expansion · max_separation, min_half_width_m)`, and
//! is finally clamped to `[-max_extent_m, max_extent_m]²` around the frame origin. The
//! clamp keeps far-away solutions from stretching the sampling until the equirectangular
//! projection stops being meaningful.
use crate::constants::Meter;
use crate::localization::solver::max_separation;
use crate::localization::LocatorParams;
use crate::projection::PlanarPoint;
use crate::tdoa_errors::TdoaError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracingDomain {
    x_min: Meter,
    x_max: Meter,
    y_min: Meter,
    y_max: Meter,
}

impl TracingDomain {
    /// Build the rectangle from the request geometry.
    ///
    /// Arguments
    /// -----------------
    /// * `stations`: planar station positions, at least one.
    /// * `solutions`: solved positions to keep inside the rectangle, may be empty.
    /// * `params`: expansion factor, minimum padding and absolute clamp.
    ///
    /// Return
    /// ----------
    /// * The clamped rectangle.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::NotEnoughStations`] without stations.
    /// * [`TdoaError::DegenerateGeometry`] for a non-finite point, or when the clamp leaves an
    ///   empty rectangle (every point lies beyond `max_extent_m` on the same side).
    pub fn from_geometry(
        stations: &[PlanarPoint],
        solutions: &[PlanarPoint],
        params: &LocatorParams,
    ) -> Result<Self, TdoaError> {
        if stations.is_empty() {
            return Err(TdoaError::NotEnoughStations {
                required: 1,
                got: 0,
            });
        }

        let points = stations.iter().chain(solutions);
        if points.clone().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(TdoaError::DegenerateGeometry(
                "non-finite position in the tracing domain".into(),
            ));
        }

        let init = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        let (x_lo, x_hi, y_lo, y_hi) = points.fold(init, |(a, b, c, d), p| {
            (a.min(p.x), b.max(p.x), c.min(p.y), d.max(p.y))
        });

        let pad = (params.domain_expansion * max_separation(stations)).max(params.min_half_width_m);
        let extent = params.max_extent_m;

        let domain = TracingDomain {
            x_min: (x_lo - pad).max(-extent),
            x_max: (x_hi + pad).min(extent),
            y_min: (y_lo - pad).max(-extent),
            y_max: (y_hi + pad).min(extent),
        };

        if domain.x_min >= domain.x_max || domain.y_min >= domain.y_max {
            return Err(TdoaError::DegenerateGeometry(format!(
                "tracing domain is empty after clamping to ±{extent} m"
            )));
        }
        Ok(domain)
    }

    pub fn x_min(&self) -> Meter {
        self.x_min
    }

    pub fn x_max(&self) -> Meter {
        self.x_max
    }

    pub fn y_min(&self) -> Meter {
        self.y_min
    }

    pub fn y_max(&self) -> Meter {
        self.y_max
    }

    /// Ordinate splitting the rectangle into its upper and lower half.
    pub fn y_mid(&self) -> Meter {
        0.5 * (self.y_min + self.y_max)
    }

    /// `k`-th of `count` evenly spaced abscissae, both edges included.
    pub fn abscissa(&self, k: usize, count: usize) -> Meter {
        if count < 2 {
            return 0.5 * (self.x_min + self.x_max);
        }
        if k + 1 >= count {
            return self.x_max;
        }
        self.x_min + (self.x_max - self.x_min) * k as f64 / (count - 1) as f64
    }

    pub fn contains(&self, p: &PlanarPoint) -> bool {
        (self.x_min..=self.x_max).contains(&p.x) && (self.y_min..=self.y_max).contains(&p.y)
    }
}
