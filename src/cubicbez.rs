//! Cubic Bézier segments.

use std::ops::Range;

use arrayvec::ArrayVec;

use crate::common::solve_quadratic;
use crate::{
    ParamCurve, ParamCurveArclen, ParamCurveArea, ParamCurveCurvature, ParamCurveDeriv,
    ParamCurveExtrema, ParamCurveNearest, Point, QuadBez, Rect, Vec2, MAX_EXTREMA,
};

/// Below this squared magnitude a handle or derivative is treated as
/// degenerate and the tangent fallback ladder engages.
const DEGEN_HYPOT2: f64 = 1e-24;

/// A single cubic Bézier segment.
///
/// `p1` is the absolute position of the handle going out of `p0`, and `p2`
/// the absolute position of the handle coming into `p3`; this is the same
/// data as the "superpath" vertex-triplet form used by SVG editors, with the
/// shared vertices unshared.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicBez {
    /// The start point.
    pub p0: Point,
    /// The first control point (outgoing handle of `p0`).
    pub p1: Point,
    /// The second control point (incoming handle of `p3`).
    pub p2: Point,
    /// The end point.
    pub p3: Point,
}

impl CubicBez {
    /// Create a new cubic Bézier segment.
    #[inline]
    pub fn new(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> CubicBez {
        CubicBez {
            p0: p0.into(),
            p1: p1.into(),
            p2: p2.into(),
            p3: p3.into(),
        }
    }

    /// A segment covering the straight line from `p0` to `p1`, with the
    /// handles placed at the third points.
    #[inline]
    pub fn from_line(p0: impl Into<Point>, p1: impl Into<Point>) -> CubicBez {
        let p0 = p0.into();
        let p1 = p1.into();
        CubicBez::new(p0, p0.lerp(p1, 1.0 / 3.0), p0.lerp(p1, 2.0 / 3.0), p1)
    }

    /// The polynomial coefficients of the curve.
    ///
    /// Returns `(a, b, c, d)` such that `B(t) = a·t³ + b·t² + c·t + d`,
    /// componentwise.
    #[inline]
    pub fn parameters(&self) -> (Vec2, Vec2, Vec2, Vec2) {
        let c = 3.0 * (self.p1 - self.p0);
        let b = 3.0 * (self.p2 - self.p1) - c;
        let a = (self.p3 - self.p0) - c - b;
        let d = self.p0.to_vec2();
        (a, b, c, d)
    }

    /// Split the segment at `t`, using De Casteljau's algorithm.
    ///
    /// This is exact: the two halves traverse exactly the same points as the
    /// original curve, with the parameter rescaled.
    pub fn split(&self, t: f64) -> (CubicBez, CubicBez) {
        let p01 = self.p0.lerp(self.p1, t);
        let p12 = self.p1.lerp(self.p2, t);
        let p23 = self.p2.lerp(self.p3, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        let pm = p012.lerp(p123, t);
        (
            CubicBez::new(self.p0, p01, p012, pm),
            CubicBez::new(pm, p123, p23, self.p3),
        )
    }

    /// The chord vector from start to end.
    #[inline]
    pub fn chord(&self) -> Vec2 {
        self.p3 - self.p0
    }

    /// The unit tangent at parameter `t`.
    ///
    /// When the derivative is degenerate (a handle coincides with its
    /// endpoint), this falls back through the remaining control points and
    /// finally the chord before giving up and returning `(1, 0)`. It never
    /// returns a zero or non-finite vector; downstream consumers (offset
    /// normals, arc tangents) rely on that.
    pub fn tangent(&self, t: f64) -> Vec2 {
        let d = self.deriv().eval(t).to_vec2();
        if d.hypot2() > DEGEN_HYPOT2 {
            return d.normalize();
        }
        let ladder = if t < 0.5 {
            [
                self.p1 - self.p0,
                self.p2 - self.p0,
                self.p3 - self.p0,
            ]
        } else {
            [
                self.p3 - self.p2,
                self.p3 - self.p1,
                self.p3 - self.p0,
            ]
        };
        for v in ladder {
            if v.hypot2() > DEGEN_HYPOT2 {
                return v.normalize();
            }
        }
        Vec2::new(1.0, 0.0)
    }

    /// The unit normal at parameter `t`: the tangent rotated 90°
    /// counter-clockwise.
    #[inline]
    pub fn normal(&self, t: f64) -> Vec2 {
        self.tangent(t).turn_90()
    }

    /// The constant third derivative of the curve.
    #[inline]
    fn deriv3(&self) -> Vec2 {
        6.0 * ((self.p3 - self.p0) + 3.0 * (self.p1 - self.p2))
    }

    /// The bounding box of the control polygon.
    ///
    /// This contains the curve, but is not tight; it is cheap enough for
    /// intersection pruning where [`bounding_box`] would be overkill.
    ///
    /// [`bounding_box`]: ParamCurveExtrema::bounding_box
    pub fn control_box(&self) -> Rect {
        Rect::from_points(self.p0, self.p3)
            .union_pt(self.p1)
            .union_pt(self.p2)
    }
}

impl ParamCurve for CubicBez {
    #[inline]
    fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let v = self.p0.to_vec2() * (mt * mt * mt)
            + (self.p1.to_vec2() * (mt * mt * 3.0)
                + (self.p2.to_vec2() * (mt * 3.0) + self.p3.to_vec2() * t) * t)
                * t;
        v.to_point()
    }

    fn subsegment(&self, range: Range<f64>) -> CubicBez {
        let (t0, t1) = (range.start, range.end);
        let p0 = self.eval(t0);
        let p3 = self.eval(t1);
        let d = self.deriv();
        let scale = (t1 - t0) * (1.0 / 3.0);
        let p1 = p0 + scale * d.eval(t0).to_vec2();
        let p2 = p3 - scale * d.eval(t1).to_vec2();
        CubicBez { p0, p1, p2, p3 }
    }

    #[inline]
    fn subdivide(&self) -> (CubicBez, CubicBez) {
        self.split(0.5)
    }

    #[inline]
    fn start(&self) -> Point {
        self.p0
    }

    #[inline]
    fn end(&self) -> Point {
        self.p3
    }
}

impl ParamCurveDeriv for CubicBez {
    type DerivResult = QuadBez;

    #[inline]
    fn deriv(&self) -> QuadBez {
        QuadBez::new(
            (3.0 * (self.p1 - self.p0)).to_point(),
            (3.0 * (self.p2 - self.p1)).to_point(),
            (3.0 * (self.p3 - self.p2)).to_point(),
        )
    }
}

impl ParamCurveArclen for CubicBez {
    /// Arclength of a cubic Bézier segment.
    ///
    /// This algorithm is based on "Adaptive subdivision and the length and
    /// energy of Bézier curves" by Jens Gravesen.
    fn arclen(&self, accuracy: f64) -> f64 {
        // Estimate for a single segment.
        fn calc_l0(c: &CubicBez) -> f64 {
            let lc = (c.p3 - c.p0).hypot();
            let lp = (c.p1 - c.p0).hypot() + (c.p2 - c.p1).hypot() + (c.p3 - c.p2).hypot();
            (lc + lp) * 0.5
        }
        const MAX_DEPTH: usize = 16;
        fn rec(c: &CubicBez, l0: f64, accuracy: f64, depth: usize) -> f64 {
            let (c0, c1) = c.subdivide();
            let l0_c0 = calc_l0(&c0);
            let l0_c1 = calc_l0(&c1);
            let l1 = l0_c0 + l0_c1;
            let error = (l0 - l1) * (1.0 / 15.0);
            if error.abs() < accuracy || depth == MAX_DEPTH {
                l1 - error
            } else {
                rec(&c0, l0_c0, accuracy * 0.5, depth + 1)
                    + rec(&c1, l0_c1, accuracy * 0.5, depth + 1)
            }
        }
        rec(self, calc_l0(self), accuracy, 0)
    }
}

impl ParamCurveArea for CubicBez {
    #[inline]
    fn signed_area(&self) -> f64 {
        (self.p0.x * (6.0 * self.p1.y + 3.0 * self.p2.y + self.p3.y)
            + 3.0
                * (self.p1.x * (-2.0 * self.p0.y + self.p2.y + self.p3.y)
                    - self.p2.x * (self.p0.y + self.p1.y - 2.0 * self.p3.y))
            - self.p3.x * (self.p0.y + 3.0 * self.p1.y + 6.0 * self.p2.y))
            * (1.0 / 20.0)
    }
}

impl ParamCurveCurvature for CubicBez {
    /// Compute the signed curvature, `(x'y'' − y'x'') / (x'² + y'²)^1.5`.
    ///
    /// When the first derivative vanishes (a cusp, or degenerate handles)
    /// the quotient is taken at the next derivative order before the
    /// curvature is declared infinite with the sign of the last usable
    /// turn. The offset pipeline uses this value to detect
    /// self-intersection hazards near cusps, so the limiting branches are
    /// load-bearing.
    fn curvature(&self, t: f64) -> f64 {
        let q = self.deriv();
        let d1 = q.eval(t).to_vec2();
        let d2 = q.deriv().eval(t).to_vec2();
        let denom = d1.hypot2().powf(1.5);
        if denom > DEGEN_HYPOT2 {
            return d1.cross(d2) / denom;
        }
        let d3 = self.deriv3();
        let denom2 = d2.hypot2().powf(1.5);
        if denom2 > DEGEN_HYPOT2 {
            return d2.cross(d3) / denom2;
        }
        let turn = if d1.cross(d2) != 0.0 {
            d1.cross(d2)
        } else {
            d2.cross(d3)
        };
        if turn == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(turn)
        }
    }
}

impl ParamCurveExtrema for CubicBez {
    fn extrema(&self) -> ArrayVec<f64, MAX_EXTREMA> {
        fn one_coord(result: &mut ArrayVec<f64, MAX_EXTREMA>, d0: f64, d1: f64, d2: f64) {
            let a = d0 - 2.0 * d1 + d2;
            let b = 2.0 * (d1 - d0);
            let c = d0;
            let roots = solve_quadratic(c, b, a);
            for &t in &roots {
                if t > 0.0 && t < 1.0 {
                    result.push(t);
                }
            }
        }
        let mut result = ArrayVec::new();
        let d0 = self.p1 - self.p0;
        let d1 = self.p2 - self.p1;
        let d2 = self.p3 - self.p2;
        one_coord(&mut result, d0.x, d1.x, d2.x);
        one_coord(&mut result, d0.y, d1.y, d2.y);
        result.sort_by(|a, b| a.partial_cmp(b).unwrap());
        result
    }
}

impl ParamCurveNearest for CubicBez {
    /// Find the nearest point, by approximating with quadratics.
    ///
    /// The number of quadratics is chosen so the approximation error stays
    /// below `accuracy`; each quadratic is then solved analytically.
    fn nearest(&self, p: Point, accuracy: f64) -> (f64, f64) {
        // Error vector of the single midpoint-quadratic approximation; the
        // error shrinks by 8× per halving of the parameter interval.
        let err_v = 3.0 * (self.p2 - self.p1) + (self.p0 - self.p3);
        let max_hypot2 = 432.0 * accuracy * accuracy;
        let mut n = 1;
        if err_v.hypot2() > max_hypot2 {
            n = ((err_v.hypot2() / max_hypot2).powf(1.0 / 6.0)).ceil() as usize;
        }
        let mut best_r = None;
        let mut best_t = 0.0;
        let n_recip = (n as f64).recip();
        for i in 0..n {
            let t0 = i as f64 * n_recip;
            let t1 = (i + 1) as f64 * n_recip;
            let seg = self.subsegment(t0..t1);
            let q1 = ((3.0 * seg.p1.to_vec2() - seg.p0.to_vec2())
                + (3.0 * seg.p2.to_vec2() - seg.p3.to_vec2()))
                * 0.25;
            let q = QuadBez::new(seg.p0, q1.to_point(), seg.p3);
            let (t, r) = q.nearest(p, accuracy);
            if best_r.map(|best_r| r < best_r).unwrap_or(true) {
                best_t = t0 + t * (t1 - t0);
                best_r = Some(r);
            }
        }
        (best_t, best_r.unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(p0: Point, p1: Point, epsilon: f64) {
        assert!((p1 - p0).hypot() < epsilon, "{:?} != {:?}", p0, p1);
    }

    #[test]
    fn cubicbez_deriv() {
        // y = x^2
        let c = CubicBez::new(
            (0.0, 0.0),
            (1.0 / 3.0, 0.0),
            (2.0 / 3.0, 1.0 / 3.0),
            (1.0, 1.0),
        );
        let deriv = c.deriv();

        let n = 10;
        for i in 0..=n {
            let t = (i as f64) * (n as f64).recip();
            let delta = 1e-6;
            let p = c.eval(t);
            let p1 = c.eval(t + delta);
            let d_approx = (p1 - p) * delta.recip();
            let d = deriv.eval(t).to_vec2();
            assert!((d - d_approx).hypot() < delta * 2.0);
        }
    }

    #[test]
    fn cubicbez_parameters() {
        let c = CubicBez::new((3.1, 4.1), (5.9, 2.6), (5.3, 5.8), (9.7, 9.3));
        let (a, b, coef_c, d) = c.parameters();
        let n = 10;
        for i in 0..=n {
            let t = (i as f64) * (n as f64).recip();
            let poly = ((a * t + b) * t + coef_c) * t + d;
            assert_near(poly.to_point(), c.eval(t), 1e-12);
        }
    }

    #[test]
    fn cubicbez_arclen() {
        // y = x^2
        let c = CubicBez::new(
            (0.0, 0.0),
            (1.0 / 3.0, 0.0),
            (2.0 / 3.0, 1.0 / 3.0),
            (1.0, 1.0),
        );
        let true_arclen = 0.5 * 5.0f64.sqrt() + 0.25 * (2.0 + 5.0f64.sqrt()).ln();
        for i in 0..12 {
            let accuracy = 0.1f64.powi(i);
            let error = c.arclen(accuracy) - true_arclen;
            assert!(error.abs() < accuracy);
        }
    }

    // De Casteljau splitting is exact: re-parametrizing either half must
    // reproduce the original curve to near machine precision.
    #[test]
    fn cubicbez_split_round_trip() {
        let c = CubicBez::new((0.0, 0.0), (10.0, 20.0), (30.0, -10.0), (40.0, 5.0));
        for split_t in [0.25, 0.375, 0.5, 0.8] {
            let (left, right) = c.split(split_t);
            let n = 16;
            for i in 0..=n {
                let u = (i as f64) * (n as f64).recip();
                let expected = c.eval(u);
                let actual = if u <= split_t {
                    left.eval(u / split_t)
                } else {
                    right.eval((u - split_t) / (1.0 - split_t))
                };
                assert_near(expected, actual, 1e-9);
            }
        }
    }

    #[test]
    fn cubicbez_tangent_fallback_ladder() {
        // Degenerate start handle: falls back to the second handle.
        let c = CubicBez::new((0.0, 0.0), (0.0, 0.0), (1.0, 1.0), (2.0, 0.0));
        let t = c.tangent(0.0);
        assert!(t.is_finite());
        assert_near(t.to_point(), Vec2::new(1.0, 1.0).normalize().to_point(), 1e-12);

        // Both handles on the start point: chord direction.
        let c = CubicBez::new((0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (3.0, 4.0));
        let t = c.tangent(0.0);
        assert_near(t.to_point(), Vec2::new(0.6, 0.8).to_point(), 1e-12);

        // Fully degenerate segment: the stable last-resort direction.
        let c = CubicBez::new((1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0));
        assert_eq!(c.tangent(0.0), Vec2::new(1.0, 0.0));
        assert_eq!(c.tangent(1.0), Vec2::new(1.0, 0.0));

        // Degenerate end handle, mirrored ladder.
        let c = CubicBez::new((0.0, 0.0), (1.0, 0.0), (2.0, 3.0), (2.0, 3.0));
        let t = c.tangent(1.0);
        assert!(t.is_finite());
        assert_near(
            t.to_point(),
            Vec2::new(1.0, 3.0).normalize().to_point(),
            1e-12,
        );
    }

    #[test]
    fn cubicbez_normal_is_ccw_of_tangent() {
        let c = CubicBez::new((0.0, 0.0), (1.0, 0.5), (2.0, 0.5), (3.0, 0.0));
        for i in 0..=4 {
            let t = i as f64 / 4.0;
            let tangent = c.tangent(t);
            let normal = c.normal(t);
            assert!((tangent.cross(normal) - 1.0).abs() < 1e-12);
            assert!(tangent.dot(normal).abs() < 1e-12);
        }
    }

    #[test]
    fn cubicbez_curvature_circle() {
        // Quarter of a unit circle, CCW; curvature should be close to +1.
        let k = 0.5519150244935105707435627;
        let c = CubicBez::new((1.0, 0.0), (1.0, k), (k, 1.0), (0.0, 1.0));
        for i in 0..=4 {
            let t = i as f64 / 4.0;
            assert!((c.curvature(t) - 1.0).abs() < 2e-2, "t = {}", t);
        }
        // Reversed (CW) traversal flips the sign.
        let c = CubicBez::new((0.0, 1.0), (k, 1.0), (1.0, k), (1.0, 0.0));
        assert!((c.curvature(0.5) + 1.0).abs() < 2e-2);
    }

    #[test]
    fn cubicbez_curvature_limit() {
        // Degenerate start handle: the first derivative vanishes at t = 0,
        // so the higher-order quotient must kick in and stay finite.
        let c = CubicBez::new((0.0, 0.0), (0.0, 0.0), (1.0, 1.0), (2.0, 0.0));
        let k = c.curvature(0.0);
        assert!(k.is_finite());
        // All control points coincident except a turn hidden in the third
        // derivative: never NaN.
        let c = CubicBez::new((0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0));
        let k = c.curvature(0.0);
        assert!(!k.is_nan());
    }

    #[test]
    fn cubicbez_extrema() {
        // y = x^2
        let q = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let extrema = q.extrema();
        assert_eq!(extrema.len(), 1);
        assert!((extrema[0] - 0.5).abs() < 1e-6);

        let q = CubicBez::new((0.4, 0.5), (0.0, 1.0), (1.0, 0.0), (0.5, 0.4));
        let extrema = q.extrema();
        assert_eq!(extrema.len(), 4);
    }

    #[test]
    fn cubicbez_bounding_box() {
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let bb = c.bounding_box();
        assert!((bb.y1 - 0.75).abs() < 1e-12);
        assert_eq!(bb.y0, 0.0);
        // The control box is looser but still contains the curve.
        let cb = c.control_box();
        assert!(cb.y1 >= bb.y1 && cb.y0 <= bb.y0);
    }

    #[test]
    fn cubicbez_nearest() {
        fn verify(result: (f64, f64), expected: f64) {
            assert!(
                (result.0 - expected).abs() < 1e-6,
                "got {:?} expected {}",
                result,
                expected
            );
        }
        // y = x^3
        let c = CubicBez::new((0.0, 0.0), (1.0 / 3.0, 0.0), (2.0 / 3.0, 0.0), (1.0, 1.0));
        verify(c.nearest((0.1, 0.001).into(), 1e-6), 0.1);
        verify(c.nearest((0.5, 0.125).into(), 1e-6), 0.5);
        verify(c.nearest((0.9, 0.729).into(), 1e-6), 0.9);
        verify(c.nearest((1.1, 1.1).into(), 1e-6), 1.0);
        verify(c.nearest((-0.1, 0.0).into(), 1e-6), 0.0);
    }

    #[test]
    fn cubicbez_random_split_continuity() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let mut coord = || rng.random_range(-100.0..100.0);
            let c = CubicBez::new(
                (coord(), coord()),
                (coord(), coord()),
                (coord(), coord()),
                (coord(), coord()),
            );
            let (left, right) = c.subdivide();
            assert_near(left.end(), right.start(), 1e-9);
            for i in 0..=8 {
                let u = i as f64 / 8.0;
                assert_near(left.eval(u), c.eval(u * 0.5), 1e-9);
                assert_near(right.eval(u), c.eval(0.5 + u * 0.5), 1e-9);
            }
        }
    }
}
