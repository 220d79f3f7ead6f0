//! Subpaths: connected chains of cubic Bézier segments.

use crate::{
    CubicBez, ParamCurveArclen, ParamCurveArea, ParamCurveExtrema, ParamCurveNearest, Point, Rect,
};

/// An ordered collection of subpaths.
///
/// Order is significant for rendering/cutting order, but not for geometry.
pub type CurvePath = Vec<Subpath>;

/// A connected chain of cubic Bézier segments.
///
/// Invariant: consecutive segments share an endpoint
/// (`segments[i].p3 == segments[i + 1].p0`), and for a closed subpath the
/// last segment ends where the first begins, i.e. the closing segment is
/// materialized.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subpath {
    /// The segments of the subpath, in order.
    pub segments: Vec<CubicBez>,
    /// Whether the subpath is closed.
    pub closed: bool,
}

impl Subpath {
    /// Create a new subpath from segments.
    #[inline]
    pub fn new(segments: Vec<CubicBez>, closed: bool) -> Subpath {
        Subpath { segments, closed }
    }

    /// Create a polyline subpath through the given points.
    ///
    /// Each edge becomes a cubic segment with its handles on the chord. For
    /// a closed subpath the closing edge is appended as a segment.
    pub fn from_points(points: &[Point], closed: bool) -> Subpath {
        let mut segments: Vec<CubicBez> = points
            .windows(2)
            .map(|w| CubicBez::from_line(w[0], w[1]))
            .collect();
        if closed {
            if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                if first != last {
                    segments.push(CubicBez::from_line(last, first));
                }
            }
        }
        Subpath { segments, closed }
    }

    /// Whether the subpath has no segments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first point of the subpath.
    ///
    /// Panics if the subpath is empty.
    #[inline]
    pub fn start_point(&self) -> Point {
        self.segments.first().expect("empty subpath").p0
    }

    /// The last point of the subpath.
    ///
    /// Panics if the subpath is empty.
    #[inline]
    pub fn end_point(&self) -> Point {
        self.segments.last().expect("empty subpath").p3
    }

    /// Close the subpath.
    ///
    /// If the endpoints already coincide only the flag is set; otherwise a
    /// straight closing segment is appended. Closing an already-closed
    /// subpath is a no-op.
    pub fn close(&mut self) {
        if self.closed || self.is_empty() {
            self.closed = true;
            return;
        }
        let start = self.start_point();
        let end = self.end_point();
        if start != end {
            self.segments.push(CubicBez::from_line(end, start));
        }
        self.closed = true;
    }

    /// The signed area enclosed by the subpath.
    ///
    /// Positive for counter-clockwise winding. Only meaningful for closed
    /// subpaths.
    pub fn signed_area(&self) -> f64 {
        self.segments.iter().map(|seg| seg.signed_area()).sum()
    }

    /// The total arc length of the subpath.
    pub fn arclen(&self, accuracy: f64) -> f64 {
        self.segments.iter().map(|seg| seg.arclen(accuracy)).sum()
    }

    /// The bounding box of the subpath.
    pub fn bounding_box(&self) -> Rect {
        let mut bbox: Option<Rect> = None;
        for seg in &self.segments {
            let seg_bb = seg.bounding_box();
            bbox = Some(match bbox {
                Some(bb) => bb.union(seg_bb),
                None => seg_bb,
            });
        }
        bbox.unwrap_or_default()
    }

    /// Find the nearest point on the subpath.
    ///
    /// Returns the segment index, the parameter within that segment, and
    /// the square of the distance.
    ///
    /// Panics if the subpath is empty.
    pub fn nearest(&self, p: Point, accuracy: f64) -> (usize, f64, f64) {
        let mut best = None;
        for (ix, seg) in self.segments.iter().enumerate() {
            let (t, r) = seg.nearest(p, accuracy);
            if best.map(|(_, _, r_best)| r < r_best).unwrap_or(true) {
                best = Some((ix, t, r));
            }
        }
        best.expect("empty subpath")
    }

    /// The distance from `p` to the nearest point of the subpath.
    #[inline]
    pub fn distance_to(&self, p: Point, accuracy: f64) -> f64 {
        self.nearest(p, accuracy).2.sqrt()
    }

    /// Split the subpath into fragments at the given `(segment, t)`
    /// parameter points.
    ///
    /// Parameters within an epsilon of a segment boundary are ignored (the
    /// boundary is already a fragment candidate). For a closed subpath the
    /// trailing piece wraps around and is merged into the leading one, so
    /// every returned fragment spans between two split points. The returned
    /// fragments are open.
    pub fn split_at_params(&self, splits: &[(usize, f64)]) -> Vec<Subpath> {
        const T_EPS: f64 = 1e-9;
        let mut splits: Vec<(usize, f64)> = splits
            .iter()
            .copied()
            .filter(|&(i, t)| i < self.segments.len() && t > T_EPS && t < 1.0 - T_EPS)
            .collect();
        splits.sort_by(|a, b| a.partial_cmp(b).unwrap());
        splits.dedup_by(|a, b| a.0 == b.0 && (a.1 - b.1).abs() < 1e-7);
        if splits.is_empty() {
            return vec![self.clone()];
        }
        let mut fragments = Vec::new();
        let mut current: Vec<CubicBez> = Vec::new();
        let mut iter = splits.iter().peekable();
        for (i, seg) in self.segments.iter().enumerate() {
            let mut t0 = 0.0;
            let mut rest = *seg;
            while let Some(&&(j, t)) = iter.peek() {
                if j != i {
                    break;
                }
                iter.next();
                let local = (t - t0) / (1.0 - t0);
                let (left, right) = rest.split(local);
                current.push(left);
                fragments.push(Subpath::new(std::mem::take(&mut current), false));
                rest = right;
                t0 = t;
            }
            current.push(rest);
        }
        fragments.push(Subpath::new(current, false));
        if self.closed && fragments.len() > 1 {
            // The piece after the last split continues through the seam into
            // the piece before the first split.
            let last = fragments.pop().unwrap();
            let mut segments = last.segments;
            segments.append(&mut fragments[0].segments);
            fragments[0] = Subpath::new(segments, false);
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParamCurve, ParamCurveCurvature};
    use approx::assert_abs_diff_eq;

    fn unit_square() -> Subpath {
        Subpath::from_points(
            &[
                Point::new(0., 0.),
                Point::new(10., 0.),
                Point::new(10., 10.),
                Point::new(0., 10.),
            ],
            true,
        )
    }

    #[test]
    fn square_area_and_winding() {
        let sq = unit_square();
        assert_eq!(sq.segments.len(), 4);
        assert_abs_diff_eq!(sq.signed_area(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sq.arclen(1e-9), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn close_is_idempotent() {
        let mut sq = unit_square();
        let before = sq.clone();
        sq.close();
        // Already closed: no segment added, evaluation unchanged.
        assert_eq!(sq.segments.len(), before.segments.len());
        for (a, b) in sq.segments.iter().zip(before.segments.iter()) {
            for i in 0..=4 {
                let t = i as f64 / 4.0;
                assert_eq!(a.eval(t), b.eval(t));
                assert_eq!(a.curvature(t), b.curvature(t));
            }
        }
        sq.close();
        assert_eq!(sq.segments.len(), before.segments.len());
    }

    #[test]
    fn close_open_subpath() {
        let mut sp = Subpath::from_points(
            &[Point::new(0., 0.), Point::new(4., 0.), Point::new(4., 3.)],
            false,
        );
        assert_eq!(sp.segments.len(), 2);
        sp.close();
        assert!(sp.closed);
        assert_eq!(sp.segments.len(), 3);
        assert_eq!(sp.end_point(), sp.start_point());
    }

    #[test]
    fn nearest_and_distance() {
        let sq = unit_square();
        let d = sq.distance_to(Point::new(5.0, 3.0), 1e-9);
        assert!((d - 3.0).abs() < 1e-9);
        let d = sq.distance_to(Point::new(12.0, 5.0), 1e-9);
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn split_at_params_open() {
        let sp = Subpath::from_points(&[Point::new(0., 0.), Point::new(10., 0.)], false);
        let frags = sp.split_at_params(&[(0, 0.5)]);
        assert_eq!(frags.len(), 2);
        assert!(frags[0].end_point().distance(Point::new(5., 0.)) < 1e-9);
        assert!(frags[1].start_point().distance(Point::new(5., 0.)) < 1e-9);
    }

    #[test]
    fn split_at_params_closed_wraps() {
        let sq = unit_square();
        let frags = sq.split_at_params(&[(0, 0.5), (2, 0.5)]);
        assert_eq!(frags.len(), 2);
        // Each fragment spans half the perimeter.
        for f in &frags {
            assert!((f.arclen(1e-9) - 20.0).abs() < 1e-9);
        }
        // The first fragment starts at the second split point (wrapped).
        assert!(frags[0].start_point().distance(Point::new(5., 10.)) < 1e-9);
        assert!(frags[0].end_point().distance(Point::new(5., 0.)) < 1e-9);
    }

    #[test]
    fn split_ignores_boundary_params() {
        let sq = unit_square();
        let frags = sq.split_at_params(&[(1, 1e-12), (2, 1.0 - 1e-12)]);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].segments.len(), 4);
    }
}
