//! # Isochrone tracer
//!
//! [`IsochroneTracer`] owns everything one request needs to trace its six station-pair
//! isochrones: the planar stations, the propagation speed, the [`TracingDomain`] and the
//! [`TracingStrategy`] picked by [`LocatorParams::strategy`].
//!
//! ## Laziness
//!
//! [`IsochroneTracer::branch_points`] returns a [`BranchPoints`] iterator that searches one
//! column per step and yields only the columns that hold a root. It is finite (at most
//! `sample_count` items), fused, and cannot be restarted: tracing again means calling
//! `branch_points` again.
//!
//! ## Ordering
//!
//! * Points of a branch: increasing `x`.
//! * Curves of [`IsochroneTracer::trace_all`]: pairs `(0,1), (0,2), (0,3), (1,2), (1,3), (2,3)`,
//!   whatever order the parallel traces complete in.
use std::iter::FusedIterator;

use itertools::Itertools;
use smallvec::SmallVec;
use tracing::debug;

use crate::constants::MetersPerSecond;
use crate::execution::{join, map_ordered};
use crate::isochrone::smoothing::resample_natural_cubic;
use crate::isochrone::{Branch, PairGeometry, StationPair, TracingDomain, TracingStrategy};
use crate::localization::LocatorParams;
use crate::projection::PlanarPoint;
use crate::request::PlanarStation;
use crate::tdoa_errors::TdoaError;

/// The traced isochrone of one station pair.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneCurve {
    pair: StationPair,
    branches: [Vec<PlanarPoint>; 2],
}

impl IsochroneCurve {
    pub fn new(pair: StationPair, branches: [Vec<PlanarPoint>; 2]) -> Self {
        IsochroneCurve { pair, branches }
    }

    pub fn pair(&self) -> StationPair {
        self.pair
    }

    /// Upper and lower branch, in that order.
    pub fn branches(&self) -> &[Vec<PlanarPoint>; 2] {
        &self.branches
    }

    pub fn branch(&self, branch: Branch) -> &[PlanarPoint] {
        &self.branches[branch.index()]
    }

    pub fn point_count(&self) -> usize {
        self.branches.iter().map(Vec::len).sum()
    }
}

/// Per-request isochrone tracer.
pub struct IsochroneTracer<'a> {
    params: &'a LocatorParams,
    stations: SmallVec<[PlanarStation; 4]>,
    speed: MetersPerSecond,
    domain: TracingDomain,
    strategy: Box<dyn TracingStrategy + Send + Sync>,
}

impl<'a> IsochroneTracer<'a> {
    /// Arguments
    /// -----------------
    /// * `params`: sample count, strategy, root tolerances, smoothing and parallelism.
    /// * `stations`: planar stations; pair indices refer to positions in this slice.
    /// * `speed`: propagation speed (m/s).
    /// * `domain`: rectangle to sample.
    pub fn new(
        params: &'a LocatorParams,
        stations: &[PlanarStation],
        speed: MetersPerSecond,
        domain: TracingDomain,
    ) -> Self {
        IsochroneTracer {
            params,
            stations: stations.iter().copied().collect(),
            speed,
            domain,
            strategy: params.strategy.instantiate(params),
        }
    }

    pub fn domain(&self) -> &TracingDomain {
        &self.domain
    }

    /// Every unordered pair `(i, j)` with `i < j`, lexicographic.
    pub fn pairs(&self) -> Vec<StationPair> {
        (0..self.stations.len())
            .tuple_combinations()
            .filter_map(|(i, j)| StationPair::new(i, j).ok())
            .collect()
    }

    /// Foci and distance difference `v · (d_i - d_j)` of `pair`.
    pub fn geometry(&self, pair: StationPair) -> Result<PairGeometry, TdoaError> {
        let station = |k: usize| {
            self.stations.get(k).ok_or_else(|| {
                TdoaError::InvalidStationSubset(format!(
                    "pair {pair} refers to station {k}, only {} stations available",
                    self.stations.len()
                ))
            })
        };
        let (si, sj) = (station(pair.i())?, station(pair.j())?);

        Ok(PairGeometry {
            si: si.position,
            sj: sj.position,
            dd: self.speed * (si.delay - sj.delay),
        })
    }

    /// Lazily trace one branch of `pair`.
    ///
    /// Arguments
    /// -----------------
    /// * `pair`: the station pair.
    /// * `branch`: which half of the domain to search.
    ///
    /// Return
    /// ----------
    /// * A [`BranchPoints`] iterator over the unsmoothed branch, in increasing `x`.
    ///
    /// Errors
    /// ----------
    /// * [`TdoaError::InvalidStationSubset`] if `pair` refers to a missing station.
    pub fn branch_points(
        &self,
        pair: StationPair,
        branch: Branch,
    ) -> Result<BranchPoints<'_>, TdoaError> {
        let geometry = self.geometry(pair)?;
        let (y_lo, y_hi) = branch.half(&self.domain);

        Ok(BranchPoints {
            strategy: self.strategy.as_ref(),
            geometry,
            domain: self.domain,
            y_lo,
            y_hi,
            next_column: 0,
            columns: self.params.sample_count,
        })
    }

    /// Trace both branches of `pair`, resampled when `smoothing_points` is set.
    pub fn trace_pair(&self, pair: StationPair) -> Result<IsochroneCurve, TdoaError> {
        let (upper, lower) = join(
            self.params.parallel,
            || self.collect_branch(pair, Branch::Upper),
            || self.collect_branch(pair, Branch::Lower),
        );
        let curve = IsochroneCurve::new(pair, [upper?, lower?]);

        debug!(
            %pair,
            upper = curve.branches[0].len(),
            lower = curve.branches[1].len(),
            "isochrone traced"
        );
        Ok(curve)
    }

    /// Trace every pair of [`IsochroneTracer::pairs`], in that order.
    pub fn trace_all(&self) -> Result<Vec<IsochroneCurve>, TdoaError> {
        map_ordered(self.pairs(), self.params.parallel, |pair| {
            self.trace_pair(pair)
        })
        .into_iter()
        .collect()
    }

    fn collect_branch(&self, pair: StationPair, branch: Branch) -> Result<Vec<PlanarPoint>, TdoaError> {
        let points: Vec<PlanarPoint> = self.branch_points(pair, branch)?.collect();
        let Some(count) = self.params.smoothing_points else {
            return Ok(points);
        };

        // neighbouring columns are one step apart, anything wider skipped a column
        let n = self.params.sample_count;
        let step = self.domain.abscissa(1, n) - self.domain.abscissa(0, n);
        let (y_lo, y_hi) = branch.half(&self.domain);

        Ok(resample_natural_cubic(&points, count, 1.5 * step)
            .into_iter()
            .map(|p| PlanarPoint::new(p.x, p.y.clamp(y_lo, y_hi)))
            .collect())
    }
}

/// Lazy walk over the sampled columns of one branch.
pub struct BranchPoints<'t> {
    strategy: &'t (dyn TracingStrategy + Send + Sync),
    geometry: PairGeometry,
    domain: TracingDomain,
    y_lo: f64,
    y_hi: f64,
    next_column: usize,
    columns: usize,
}

impl Iterator for BranchPoints<'_> {
    type Item = PlanarPoint;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_column < self.columns {
            let x = self.domain.abscissa(self.next_column, self.columns);
            self.next_column += 1;

            let column = self.geometry.column(x);
            if let Some(y) = self.strategy.column_root(&column, self.y_lo, self.y_hi) {
                return Some(PlanarPoint::new(x, y));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.columns - self.next_column))
    }
}

impl FusedIterator for BranchPoints<'_> {}

#[cfg(test)]
mod tracer_test {
    use super::*;
    use crate::isochrone::StrategyKind;
    use approx::assert_abs_diff_eq;

    const SPEED: f64 = 343.0;

    fn stations(source: PlanarPoint) -> Vec<PlanarStation> {
        [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| {
                let position = PlanarPoint::new(x, y);
                PlanarStation {
                    id,
                    position,
                    delay: (source - position).norm() / SPEED,
                }
            })
            .collect()
    }

    fn tracer<'a>(params: &'a LocatorParams, stations: &[PlanarStation]) -> IsochroneTracer<'a> {
        let positions: Vec<PlanarPoint> = stations.iter().map(|s| s.position).collect();
        let domain = TracingDomain::from_geometry(&positions, &[], params).unwrap();
        IsochroneTracer::new(params, stations, SPEED, domain)
    }

    #[test]
    fn test_six_pairs_in_order() {
        let params = LocatorParams::default();
        let st = stations(PlanarPoint::new(50.0, 80.0));
        let curves = tracer(&params, &st).trace_all().unwrap();

        let pairs: Vec<[usize; 2]> = curves.iter().map(|c| c.pair().as_array()).collect();
        assert_eq!(pairs, vec![[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]]);
    }

    #[test]
    fn test_points_lie_on_the_isochrone() {
        for strategy in [StrategyKind::Bracketed, StrategyKind::GridScan] {
            let params = LocatorParams::builder().strategy(strategy).build().unwrap();
            let st = stations(PlanarPoint::new(37.0, 81.0));
            let t = tracer(&params, &st);

            for curve in t.trace_all().unwrap() {
                let g = t.geometry(curve.pair()).unwrap();
                assert!(curve.point_count() > 0, "{strategy}: empty curve {}", curve.pair());
                for p in curve.branches().iter().flatten() {
                    assert!(g.residual(p).abs() < 1e-2);
                    assert!(t.domain().contains(p));
                }
            }
        }
    }

    #[test]
    fn test_branches_sorted_and_in_their_half() {
        let params = LocatorParams::default();
        let st = stations(PlanarPoint::new(20.0, 60.0));
        let t = tracer(&params, &st);
        let mid = t.domain().y_mid();

        for curve in t.trace_all().unwrap() {
            for branch in Branch::ALL {
                let pts = curve.branch(branch);
                assert!(pts.windows(2).all(|w| w[0].x < w[1].x));
                match branch {
                    Branch::Upper => assert!(pts.iter().all(|p| p.y >= mid)),
                    Branch::Lower => assert!(pts.iter().all(|p| p.y <= mid)),
                }
            }
        }
    }

    #[test]
    fn test_swapping_the_pair_gives_the_same_locus() {
        let params = LocatorParams::default();
        let st = stations(PlanarPoint::new(70.0, 35.0));
        let t = tracer(&params, &st);

        for pair in t.pairs() {
            let a = t.trace_pair(pair).unwrap();
            let b = t.trace_pair(pair.swapped()).unwrap();
            for branch in Branch::ALL {
                let (pa, pb) = (a.branch(branch), b.branch(branch));
                assert_eq!(pa.len(), pb.len());
                for (p, q) in pa.iter().zip(pb) {
                    assert_eq!(p.x, q.x);
                    assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_branch_iterator_is_lazy_and_fused() {
        let params = LocatorParams::builder().sample_count(50).build().unwrap();
        let st = stations(PlanarPoint::new(50.0, 30.0));
        let t = tracer(&params, &st);
        let pair = StationPair::new(0, 2).unwrap();

        let mut it = t.branch_points(pair, Branch::Upper).unwrap();
        assert_eq!(it.size_hint(), (0, Some(50)));
        let first = it.next();
        assert!(first.is_some());
        assert!(it.size_hint().1.unwrap() < 50);

        let rest: Vec<PlanarPoint> = it.by_ref().collect();
        assert!(rest.len() < 50);
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_unknown_station_in_pair() {
        let params = LocatorParams::default();
        let st = stations(PlanarPoint::new(50.0, 30.0));
        let t = tracer(&params, &st);
        let pair = StationPair::new(1, 7).unwrap();
        assert!(matches!(
            t.branch_points(pair, Branch::Lower),
            Err(TdoaError::InvalidStationSubset(_))
        ));
    }

    #[test]
    fn test_smoothing_resamples_each_branch() {
        let params = LocatorParams::builder()
            .smoothing_points(Some(500))
            .build()
            .unwrap();
        let raw_params = LocatorParams::default();
        let st = stations(PlanarPoint::new(37.0, 81.0));
        let t = tracer(&params, &st);
        let raw = tracer(&raw_params, &st);
        let step = t.domain().abscissa(1, 200) - t.domain().abscissa(0, 200);
        let mid = t.domain().y_mid();

        for (curve, raw_curve) in t.trace_all().unwrap().iter().zip(raw.trace_all().unwrap()) {
            for branch in Branch::ALL {
                let (pts, raw_pts) = (curve.branch(branch), raw_curve.branch(branch));
                assert!(pts.windows(2).all(|w| w[0].x <= w[1].x), "{} {branch:?}", curve.pair());
                match branch {
                    Branch::Upper => assert!(pts.iter().all(|p| p.y >= mid)),
                    Branch::Lower => assert!(pts.iter().all(|p| p.y <= mid)),
                }

                let contiguous = raw_pts.windows(2).all(|w| w[1].x - w[0].x < 1.5 * step);
                if raw_pts.len() >= 3 && contiguous {
                    assert_eq!(pts.len(), 500);
                    assert_eq!(pts.first().map(|p| p.x), raw_pts.first().map(|p| p.x));
                    assert_eq!(pts.last().map(|p| p.x), raw_pts.last().map(|p| p.x));
                } else if raw_pts.len() < 3 {
                    assert_eq!(pts, raw_pts);
                }
            }
        }
    }

    #[test]
    fn test_smoothing_keeps_unevenly_sampled_branches_ordered() {
        // off-centre sources give branches that crowd into few columns near the asymptotes
        for source in [(5.0, 95.0), (93.0, 12.0), (50.0, 2.0), (98.0, 60.0)] {
            let params = LocatorParams::builder()
                .smoothing_points(Some(500))
                .build()
                .unwrap();
            let st = stations(PlanarPoint::new(source.0, source.1));
            let t = tracer(&params, &st);

            for curve in t.trace_all().unwrap() {
                for pts in curve.branches() {
                    assert!(
                        pts.windows(2).all(|w| w[0].x <= w[1].x),
                        "source {source:?}, pair {}",
                        curve.pair()
                    );
                }
            }
        }
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let par = LocatorParams::default();
        let seq = LocatorParams::builder().parallel(false).build().unwrap();
        let st = stations(PlanarPoint::new(12.0, 45.0));
        assert_eq!(
            tracer(&par, &st).trace_all().unwrap(),
            tracer(&seq, &st).trace_all().unwrap()
        );
    }
}
