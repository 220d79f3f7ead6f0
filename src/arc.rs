//! Circular arc segments.

use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::Range;

use crate::{CubicBez, ParamCurve, ParamCurveArclen, Point, Vec2};

/// A single circular arc segment.
///
/// The arc is stored by its endpoints, its center, and the signed sweep
/// angle from `start` to `end` around `center`. A positive sweep is
/// counter-clockwise, negative clockwise; the convention is fixed when the
/// arc is created and never reinterpreted.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arc {
    /// The start point of the arc.
    pub start: Point,
    /// The end point of the arc.
    pub end: Point,
    /// The center of the circle the arc lies on.
    pub center: Point,
    /// The signed sweep angle in radians (CCW positive).
    pub signed_angle: f64,
}

impl Arc {
    /// Create a new arc.
    #[inline]
    pub fn new(
        start: impl Into<Point>,
        end: impl Into<Point>,
        center: impl Into<Point>,
        signed_angle: f64,
    ) -> Arc {
        Arc {
            start: start.into(),
            end: end.into(),
            center: center.into(),
            signed_angle,
        }
    }

    /// The radius of the arc.
    #[inline]
    pub fn radius(&self) -> f64 {
        (self.start - self.center).hypot()
    }

    /// The angle of the start point, measured at the center.
    #[inline]
    pub fn start_angle(&self) -> f64 {
        (self.start - self.center).atan2()
    }

    /// The unit tangent in the direction of travel at parameter `t`.
    pub fn tangent(&self, t: f64) -> Vec2 {
        let radial = (self.start - self.center).rotate(t * self.signed_angle);
        let tangent = radial.turn_90() * self.signed_angle.signum();
        if tangent.hypot2() > 0.0 {
            tangent.normalize()
        } else {
            Vec2::new(1.0, 0.0)
        }
    }

    /// The distance from `p` to the nearest point of the arc.
    pub fn distance_to(&self, p: Point) -> f64 {
        let v = p - self.center;
        let rel = (v.atan2() - self.start_angle()) * self.signed_angle.signum();
        let rel = rel.rem_euclid(2.0 * PI);
        if rel <= self.signed_angle.abs() {
            (v.hypot() - self.radius()).abs()
        } else {
            p.distance(self.start).min(p.distance(self.end))
        }
    }

    /// Convert the arc into a sequence of cubic Bézier segments.
    ///
    /// The maximum deviation of the result from the true arc is bounded by
    /// `tolerance`.
    pub fn to_cubics(&self, tolerance: f64) -> Vec<CubicBez> {
        let sweep = self.signed_angle;
        if sweep == 0.0 || self.radius() == 0.0 {
            return vec![CubicBez::from_line(self.start, self.end)];
        }
        // Subdivision count per full circle from the error tolerance; may
        // slightly underestimate the error for exact quadrants.
        let scaled_err = self.radius() / tolerance;
        let n_err = (1.1163 * scaled_err).powf(1.0 / 6.0).max(3.999_999);
        let n = (n_err * sweep.abs() * (1.0 / (2.0 * PI))).ceil().max(1.0);
        let angle_step = sweep / n;
        let n = n as usize;
        let arm_len = (4.0 / 3.0) * (0.25 * angle_step).tan() * self.radius();
        let start_angle = self.start_angle();
        let mut result = Vec::with_capacity(n);
        let mut p0 = self.start;
        let mut angle0 = start_angle;
        for i in 0..n {
            let angle1 = angle0 + angle_step;
            let p3 = if i == n - 1 {
                self.end
            } else {
                self.center + self.radius() * Vec2::from_angle(angle1)
            };
            let p1 = p0 + arm_len * Vec2::from_angle(angle0 + FRAC_PI_2);
            let p2 = p3 - arm_len * Vec2::from_angle(angle1 + FRAC_PI_2);
            result.push(CubicBez::new(p0, p1, p2, p3));
            p0 = p3;
            angle0 = angle1;
        }
        result
    }
}

impl ParamCurve for Arc {
    #[inline]
    fn eval(&self, t: f64) -> Point {
        self.center + (self.start - self.center).rotate(t * self.signed_angle)
    }

    fn subsegment(&self, range: Range<f64>) -> Arc {
        Arc {
            start: self.eval(range.start),
            end: self.eval(range.end),
            center: self.center,
            signed_angle: (range.end - range.start) * self.signed_angle,
        }
    }

    #[inline]
    fn start(&self) -> Point {
        self.start
    }

    #[inline]
    fn end(&self) -> Point {
        self.end
    }
}

impl ParamCurveArclen for Arc {
    #[inline]
    fn arclen(&self, _accuracy: f64) -> f64 {
        self.radius() * self.signed_angle.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarter_ccw() -> Arc {
        Arc::new((1.0, 0.0), (0.0, 1.0), (0.0, 0.0), FRAC_PI_2)
    }

    #[test]
    fn arc_eval() {
        let a = quarter_ccw();
        assert!((a.eval(0.0) - a.start).hypot() < 1e-12);
        assert!((a.eval(1.0) - a.end).hypot() < 1e-12);
        let mid = a.eval(0.5);
        let inv_sqrt2 = 0.5f64.sqrt();
        assert!((mid - Point::new(inv_sqrt2, inv_sqrt2)).hypot() < 1e-12);
        assert!((a.arclen(1e-9) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn arc_tangent() {
        let a = quarter_ccw();
        assert!((a.tangent(0.0) - Vec2::new(0.0, 1.0)).hypot() < 1e-12);
        // A CW arc over the same points travels the other way.
        let b = Arc::new((0.0, 1.0), (1.0, 0.0), (0.0, 0.0), -FRAC_PI_2);
        assert!((b.tangent(0.0) - Vec2::new(1.0, 0.0)).hypot() < 1e-12);
    }

    #[test]
    fn arc_distance() {
        let a = quarter_ccw();
        // Radially inside the swept wedge.
        assert!((a.distance_to(Point::new(0.5, 0.5)) - (1.0 - 0.5f64.hypot(0.5))).abs() < 1e-12);
        // Outside the wedge, distance to an endpoint wins.
        let d = a.distance_to(Point::new(0.0, -1.0));
        assert!((d - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn arc_to_cubics_fidelity() {
        for sweep in [FRAC_PI_2, -FRAC_PI_2, 2.0, -2.8] {
            let start = Point::new(3.0, 0.0);
            let center = Point::new(0.0, 0.0);
            let end = center + (start - center).rotate(sweep);
            let arc = Arc::new(start, end, center, sweep);
            for tolerance in [1e-2, 1e-4] {
                let cubics = arc.to_cubics(tolerance);
                assert!((cubics[0].p0 - arc.start).hypot() < 1e-12);
                assert!((cubics.last().unwrap().p3 - arc.end).hypot() < 1e-12);
                for c in &cubics {
                    for i in 0..=8 {
                        let p = c.eval(i as f64 / 8.0);
                        let err = ((p - center).hypot() - 3.0).abs();
                        assert!(err <= tolerance * 1.05, "sweep {sweep}, err {err}");
                    }
                }
            }
        }
    }
}
