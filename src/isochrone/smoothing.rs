//! Natural cubic spline resampling of traced branches.
//!
//! Every sampled column contributes at most one point to a branch, so a branch is a graph
//! `y(x)` with strictly increasing `x`. It is cut into runs wherever two neighbours are more
//! than `max_gap` apart in `x` (columns where the locus left the half). Each run of at least
//! 3 points gets a natural cubic spline `y(x)` (zero second derivative at both ends) on its
//! own knots and is evaluated at evenly spaced abscissae between its first and last point;
//! shorter runs are kept as they are. Nothing is drawn across a gap, and the output stays
//! ordered by increasing `x`.
//!
//! With knot spacings `h_k = x_{k+1} - x_k` the second derivatives solve
//!
//! ```text
//! h_{k-1} M_{k-1} + 2 (h_{k-1} + h_k) M_k + h_k M_{k+1}
//!     = 6 ((y_{k+1} - y_k) / h_k - (y_k - y_{k-1}) / h_{k-1}),   M_0 = M_{n-1} = 0
//! ```
//!
//! with the Thomas algorithm.
use crate::projection::PlanarPoint;

/// Resample a branch along natural cubic splines `y(x)`, one per contiguous run.
///
/// Arguments
/// -----------------
/// * `points`: the branch, ordered by strictly increasing `x`.
/// * `count`: number of output points for the whole branch, at least 2.
/// * `max_gap`: largest `x` step still considered contiguous.
///
/// Return
/// ----------
/// * The resampled branch. Runs share `count` in proportion to their `x` extent (at least 2
///   points each), so a single contiguous branch comes back with exactly `count` points.
/// * `points` unchanged when it has fewer than 3 points, `count < 2`, or its `x` is not
///   strictly increasing.
pub fn resample_natural_cubic(
    points: &[PlanarPoint],
    count: usize,
    max_gap: f64,
) -> Vec<PlanarPoint> {
    if points.len() < 3 || count < 2 || !points.windows(2).all(|w| w[0].x < w[1].x) {
        return points.to_vec();
    }

    let runs = split_runs(points, max_gap);
    let smooth_span: f64 = runs
        .iter()
        .filter(|run| run.len() >= 3)
        .map(|run| span(run))
        .sum();

    let mut out = Vec::with_capacity(count.max(points.len()));
    for run in runs {
        if run.len() < 3 {
            out.extend_from_slice(run);
            continue;
        }
        let share = (count as f64 * span(run) / smooth_span).round() as usize;
        resample_run(run, share.max(2), &mut out);
    }
    out
}

fn span(run: &[PlanarPoint]) -> f64 {
    run[run.len() - 1].x - run[0].x
}

fn split_runs(points: &[PlanarPoint], max_gap: f64) -> Vec<&[PlanarPoint]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for k in 1..points.len() {
        if points[k].x - points[k - 1].x > max_gap {
            runs.push(&points[start..k]);
            start = k;
        }
    }
    runs.push(&points[start..]);
    runs
}

/// Append `count` points of the spline through `run`, evenly spaced in `x`, ends included.
fn resample_run(run: &[PlanarPoint], count: usize, out: &mut Vec<PlanarPoint>) {
    let xs: Vec<f64> = run.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = run.iter().map(|p| p.y).collect();
    let m = natural_second_derivatives(&xs, &ys);

    let (x0, x1) = (xs[0], xs[xs.len() - 1]);
    let mut seg = 0;
    for k in 0..count {
        let x = if k + 1 == count {
            x1
        } else {
            x0 + (x1 - x0) * k as f64 / (count - 1) as f64
        };
        while seg + 2 < xs.len() && x > xs[seg + 1] {
            seg += 1;
        }
        out.push(PlanarPoint::new(x, evaluate(&xs, &ys, &m, seg, x)));
    }
}

/// Second derivatives of the natural spline through `(xs, ys)`.
fn natural_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let inner = n - 2;
    let mut c_prime = vec![0.0; inner];
    let mut d_prime = vec![0.0; inner];

    for r in 0..inner {
        let k = r + 1;
        let h_prev = xs[k] - xs[k - 1];
        let h_next = xs[k + 1] - xs[k];
        let rhs = 6.0 * ((ys[k + 1] - ys[k]) / h_next - (ys[k] - ys[k - 1]) / h_prev);
        let diag = 2.0 * (h_prev + h_next);

        if r == 0 {
            c_prime[0] = h_next / diag;
            d_prime[0] = rhs / diag;
        } else {
            let denom = diag - h_prev * c_prime[r - 1];
            c_prime[r] = h_next / denom;
            d_prime[r] = (rhs - h_prev * d_prime[r - 1]) / denom;
        }
    }

    m[inner] = d_prime[inner - 1];
    for r in (0..inner - 1).rev() {
        m[r + 1] = d_prime[r] - c_prime[r] * m[r + 2];
    }
    m
}

fn evaluate(xs: &[f64], ys: &[f64], m: &[f64], seg: usize, x: f64) -> f64 {
    let h = xs[seg + 1] - xs[seg];
    let u = (x - xs[seg]) / h;
    let v = 1.0 - u;

    v * ys[seg]
        + u * ys[seg + 1]
        + ((v * v * v - v) * m[seg] + (u * u * u - u) * m[seg + 1]) * h * h / 6.0
}

#[cfg(test)]
mod smoothing_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn increasing_x(pts: &[PlanarPoint]) -> bool {
        pts.windows(2).all(|w| w[0].x <= w[1].x)
    }

    #[test]
    fn test_short_branches_untouched() {
        let pts = vec![PlanarPoint::new(0.0, 0.0), PlanarPoint::new(1.0, 2.0)];
        assert_eq!(resample_natural_cubic(&pts, 50, 10.0), pts);
        assert!(resample_natural_cubic(&[], 50, 10.0).is_empty());
    }

    #[test]
    fn test_unordered_input_untouched() {
        let pts = vec![
            PlanarPoint::new(0.0, 0.0),
            PlanarPoint::new(2.0, 1.0),
            PlanarPoint::new(1.0, 2.0),
        ];
        assert_eq!(resample_natural_cubic(&pts, 50, 10.0), pts);
    }

    #[test]
    fn test_straight_line_is_reproduced() {
        let pts: Vec<PlanarPoint> = [0.0, 0.5, 2.0, 2.5, 4.0]
            .iter()
            .map(|&x| PlanarPoint::new(x, 2.0 * x + 1.0))
            .collect();
        let out = resample_natural_cubic(&pts, 17, 5.0);
        assert_eq!(out.len(), 17);
        for (k, p) in out.iter().enumerate() {
            let x = 4.0 * k as f64 / 16.0;
            assert_abs_diff_eq!(p.x, x, epsilon = 1e-12);
            assert_abs_diff_eq!(p.y, 2.0 * x + 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_knots_and_ends_are_interpolated() {
        let pts: Vec<PlanarPoint> = (0..6)
            .map(|k| {
                let x = k as f64 * 10.0;
                PlanarPoint::new(x, (x * 0.1).sin() * 7.0)
            })
            .collect();
        // 11 samples over x in [0, 50]: even samples land on the knots
        let out = resample_natural_cubic(&pts, 11, 10.0);
        for (k, knot) in pts.iter().enumerate() {
            assert_abs_diff_eq!(out[2 * k].x, knot.x, epsilon = 1e-9);
            assert_abs_diff_eq!(out[2 * k].y, knot.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_uneven_spacing_stays_ordered() {
        // dense cluster then sparse tail, the index spline used to fold back here
        let xs = [0.0, 0.1, 0.2, 0.3, 10.0, 20.0, 30.0];
        let pts: Vec<PlanarPoint> = xs.iter().map(|&x| PlanarPoint::new(x, x.sqrt())).collect();
        let out = resample_natural_cubic(&pts, 200, 15.0);
        assert_eq!(out.len(), 200);
        assert!(increasing_x(&out));
        assert_abs_diff_eq!(out[0].x, 0.0);
        assert_abs_diff_eq!(out[199].x, 30.0);
    }

    #[test]
    fn test_gaps_are_not_bridged() {
        let left: Vec<PlanarPoint> = (0..5).map(|k| PlanarPoint::new(k as f64, 1.0)).collect();
        let right: Vec<PlanarPoint> =
            (0..5).map(|k| PlanarPoint::new(20.0 + k as f64, 3.0)).collect();
        let pts: Vec<PlanarPoint> = left.iter().chain(&right).copied().collect();

        let out = resample_natural_cubic(&pts, 40, 1.5);
        assert_eq!(out.len(), 40);
        assert!(increasing_x(&out));
        assert!(out.iter().all(|p| p.x <= 4.0 || p.x >= 20.0));
        for p in &out {
            let expected = if p.x <= 4.0 { 1.0 } else { 3.0 };
            assert_abs_diff_eq!(p.y, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_isolated_points_are_kept() {
        let mut pts: Vec<PlanarPoint> = (0..4).map(|k| PlanarPoint::new(k as f64, 0.0)).collect();
        pts.push(PlanarPoint::new(50.0, 9.0));

        let out = resample_natural_cubic(&pts, 10, 1.5);
        assert_eq!(out.len(), 11);
        assert_eq!(out[10], PlanarPoint::new(50.0, 9.0));
        assert!(increasing_x(&out));
    }

    #[test]
    fn test_second_derivatives_of_symmetric_bump() {
        // [4 1; 1 4] M = [-6, -6] gives M = -1.2 on both inner knots
        let m = natural_second_derivatives(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 1.0, 0.0]);
        assert_abs_diff_eq!(m[0], 0.0);
        assert_abs_diff_eq!(m[1], -1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(m[2], -1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(m[3], 0.0);
    }
}
