//! Lines.

use std::ops::Range;

use arrayvec::ArrayVec;

use crate::{
    ParamCurve, ParamCurveArclen, ParamCurveExtrema, ParamCurveNearest, Point, Vec2, MAX_EXTREMA,
};

/// A single straight line.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line {
    /// The line's start point.
    pub p0: Point,
    /// The line's end point.
    pub p1: Point,
}

impl Line {
    /// Create a new line.
    #[inline]
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Line {
        Line {
            p0: p0.into(),
            p1: p1.into(),
        }
    }

    /// The length of the line.
    #[inline]
    pub fn length(self) -> f64 {
        (self.p1 - self.p0).hypot()
    }

    /// The midpoint of the line.
    #[inline]
    pub fn midpoint(self) -> Point {
        self.p0.midpoint(self.p1)
    }

    /// The direction of the line, not normalized.
    #[inline]
    pub fn direction(self) -> Vec2 {
        self.p1 - self.p0
    }
}

impl ParamCurve for Line {
    #[inline]
    fn eval(&self, t: f64) -> Point {
        self.p0.lerp(self.p1, t)
    }

    #[inline]
    fn subsegment(&self, range: Range<f64>) -> Line {
        Line {
            p0: self.eval(range.start),
            p1: self.eval(range.end),
        }
    }

    #[inline]
    fn start(&self) -> Point {
        self.p0
    }

    #[inline]
    fn end(&self) -> Point {
        self.p1
    }
}

impl ParamCurveArclen for Line {
    #[inline]
    fn arclen(&self, _accuracy: f64) -> f64 {
        self.length()
    }
}

impl ParamCurveNearest for Line {
    fn nearest(&self, p: Point, _accuracy: f64) -> (f64, f64) {
        let d = self.p1 - self.p0;
        let dotp = d.dot(p - self.p0);
        let d_squared = d.dot(d);
        if dotp <= 0.0 || d_squared == 0.0 {
            (0.0, (p - self.p0).hypot2())
        } else if dotp >= d_squared {
            (1.0, (p - self.p1).hypot2())
        } else {
            let t = dotp / d_squared;
            let dist = (p - self.eval(t)).hypot2();
            (t, dist)
        }
    }
}

impl ParamCurveExtrema for Line {
    #[inline]
    fn extrema(&self) -> ArrayVec<f64, MAX_EXTREMA> {
        ArrayVec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_eval() {
        let l = Line::new((1., 2.), (3., 6.));
        assert_eq!(l.eval(0.5), Point::new(2., 4.));
        assert_eq!(l.start(), l.p0);
        assert_eq!(l.end(), l.p1);
        assert_eq!(l.length(), 20f64.sqrt());
    }

    #[test]
    fn line_nearest() {
        let l = Line::new((0., 0.), (10., 0.));
        let (t, d2) = l.nearest(Point::new(5., 3.), 1e-9);
        assert_eq!(t, 0.5);
        assert_eq!(d2, 9.);
        // beyond the endpoints, the nearest point clamps
        let (t, d2) = l.nearest(Point::new(-3., 4.), 1e-9);
        assert_eq!(t, 0.0);
        assert_eq!(d2, 25.);
    }

    #[test]
    fn degenerate_line_nearest() {
        let l = Line::new((2., 2.), (2., 2.));
        let (t, d2) = l.nearest(Point::new(2., 5.), 1e-9);
        assert_eq!(t, 0.0);
        assert_eq!(d2, 9.);
    }
}
