//! Biarc approximation of cubic Bézier segments.
//!
//! A segment is approximated by at most two circular arcs joined
//! tangentially (G1) at an interior junction point, recursively subdividing
//! the segment when the approximation is not within tolerance. The output
//! feeds G-code emission, where lines map to `G01` and arcs to `G02`/`G03`.

use arrayvec::ArrayVec;
use tracing::{debug, warn};

use crate::{
    Arc, CubicBez, Error, GeometryConfig, Line, ParamCurve, ParamCurveArclen, ParamCurveNearest,
    Point, Result, Subpath,
};

/// Arcs with a radius beyond this are numerically indistinguishable from
/// lines and are emitted as such.
const MAX_ARC_RADIUS: f64 = 1e6;

/// Number of interior samples used to measure deviation from the source
/// curve.
const N_DEVIATION_SAMPLES: usize = 9;

/// The auxiliary scalar carried along a primitive, interpolated linearly by
/// arc length.
///
/// Downstream this drives the Z axis of 3-axis engraving moves; for the
/// geometry kernel it is just a ramp that must stay proportional to
/// cumulative arc length across splits.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Depth {
    /// The value at the start of the primitive.
    pub start: f64,
    /// The value at the end of the primitive.
    pub end: f64,
}

impl Depth {
    /// A constant zero depth.
    pub const ZERO: Depth = Depth {
        start: 0.0,
        end: 0.0,
    };

    /// Create a new depth ramp.
    #[inline]
    pub const fn new(start: f64, end: f64) -> Depth {
        Depth { start, end }
    }

    /// Split the ramp at the given fraction.
    #[inline]
    fn split(self, frac: f64) -> (Depth, Depth) {
        let mid = self.start + (self.end - self.start) * frac;
        (Depth::new(self.start, mid), Depth::new(mid, self.end))
    }
}

/// One drawable/toolpath-able primitive produced by biarc fitting.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Primitive {
    /// A straight cut.
    Line(Line, Depth),
    /// A circular arc cut.
    Arc(Arc, Depth),
}

impl Primitive {
    /// The start point of the primitive.
    pub fn start(&self) -> Point {
        match self {
            Primitive::Line(line, _) => line.p0,
            Primitive::Arc(arc, _) => arc.start,
        }
    }

    /// The end point of the primitive.
    pub fn end(&self) -> Point {
        match self {
            Primitive::Line(line, _) => line.p1,
            Primitive::Arc(arc, _) => arc.end,
        }
    }

    /// The depth ramp carried by the primitive.
    pub fn depth(&self) -> Depth {
        match self {
            Primitive::Line(_, depth) | Primitive::Arc(_, depth) => *depth,
        }
    }

    /// The arc length of the primitive.
    pub fn arclen(&self) -> f64 {
        match self {
            Primitive::Line(line, _) => line.length(),
            Primitive::Arc(arc, _) => arc.arclen(0.0),
        }
    }

    /// The distance from `p` to the nearest point of the primitive.
    pub fn distance_to(&self, p: Point) -> f64 {
        match self {
            Primitive::Line(line, _) => line.nearest(p, 1e-12).1.sqrt(),
            Primitive::Arc(arc, _) => arc.distance_to(p),
        }
    }
}

/// Geometry of one biarc half, before a depth ramp is attached.
#[derive(Clone, Copy)]
enum Piece {
    Line(Line),
    Arc(Arc),
}

impl Piece {
    fn arclen(self) -> f64 {
        match self {
            Piece::Line(line) => line.length(),
            Piece::Arc(arc) => arc.arclen(0.0),
        }
    }

    fn distance_to(self, p: Point) -> f64 {
        match self {
            Piece::Line(line) => line.nearest(p, 1e-12).1.sqrt(),
            Piece::Arc(arc) => arc.distance_to(p),
        }
    }

    fn into_primitive(self, depth: Depth) -> Primitive {
        match self {
            Piece::Line(line) => Primitive::Line(line, depth),
            Piece::Arc(arc) => Primitive::Arc(arc, depth),
        }
    }
}

/// Approximate a segment with lines and arcs within
/// `cfg.biarc_tolerance`.
///
/// The segment is recursively subdivided (up to `cfg.biarc_max_depth`)
/// until the sampled deviation of the biarc from the true curve is inside
/// tolerance. When the budget runs out the coarsest acceptable
/// approximation is kept and the condition is logged, not raised.
/// Degenerate constructions fall back to a line for the affected segment
/// without disturbing its siblings.
pub fn fit(seg: &CubicBez, depth: Depth, cfg: &GeometryConfig) -> Vec<Primitive> {
    let mut out = Vec::new();
    if let Err(err) = fit_rec(seg, depth, cfg.biarc_max_depth, cfg, &mut out) {
        warn!("biarc fit kept coarse result: {err}");
    }
    out
}

/// Fit a whole subpath, distributing the depth ramp across segments
/// proportionally to their arc length.
pub fn fit_subpath(subpath: &Subpath, depth: Depth, cfg: &GeometryConfig) -> Vec<Primitive> {
    let lens: Vec<f64> = subpath
        .segments
        .iter()
        .map(|seg| seg.arclen(1e-6))
        .collect();
    let total: f64 = lens.iter().sum();
    let mut out = Vec::new();
    let mut z0 = depth.start;
    let mut cum = 0.0;
    for (seg, len) in subpath.segments.iter().zip(&lens) {
        cum += len;
        let z1 = if total > 0.0 {
            depth.start + (depth.end - depth.start) * (cum / total)
        } else {
            depth.end
        };
        out.extend(fit(seg, Depth::new(z0, z1), cfg));
        z0 = z1;
    }
    out
}

fn fit_rec(
    seg: &CubicBez,
    depth: Depth,
    budget: u32,
    cfg: &GeometryConfig,
    out: &mut Vec<Primitive>,
) -> Result<()> {
    let pieces = match construct_biarc(seg, cfg) {
        Ok(pieces) => pieces,
        Err(err) => {
            debug!("substituting line for degenerate biarc: {err}");
            let mut line = ArrayVec::new();
            line.push(Piece::Line(Line::new(seg.p0, seg.p3)));
            line
        }
    };
    if pieces.len() == 1 {
        // A straightness or degeneracy decision; accept as-is.
        out.push(pieces[0].into_primitive(depth));
        return Ok(());
    }
    let deviation = max_deviation(seg, &pieces);
    if deviation <= cfg.biarc_tolerance {
        push_with_depth(&pieces, depth, out);
        return Ok(());
    }
    if budget == 0 {
        push_with_depth(&pieces, depth, out);
        return Err(Error::ToleranceExceeded {
            tolerance: cfg.biarc_tolerance,
            depth: cfg.biarc_max_depth,
            deviation,
        });
    }
    let (left, right) = seg.subdivide();
    let len_left = left.arclen(1e-6);
    let len_right = right.arclen(1e-6);
    let frac = if len_left + len_right > 0.0 {
        len_left / (len_left + len_right)
    } else {
        0.5
    };
    let (depth_left, depth_right) = depth.split(frac);
    // Both halves are processed even if one exhausts its budget.
    let r_left = fit_rec(&left, depth_left, budget - 1, cfg, out);
    let r_right = fit_rec(&right, depth_right, budget - 1, cfg, out);
    r_left.and(r_right)
}

fn push_with_depth(pieces: &ArrayVec<Piece, 2>, depth: Depth, out: &mut Vec<Primitive>) {
    let len0 = pieces[0].arclen();
    let len1 = pieces[1].arclen();
    let frac = if len0 + len1 > 0.0 {
        len0 / (len0 + len1)
    } else {
        0.5
    };
    let (d0, d1) = depth.split(frac);
    out.push(pieces[0].into_primitive(d0));
    out.push(pieces[1].into_primitive(d1));
}

/// Sampled maximum distance from the source curve to the biarc.
fn max_deviation(seg: &CubicBez, pieces: &ArrayVec<Piece, 2>) -> f64 {
    let mut worst = 0.0f64;
    for i in 1..=N_DEVIATION_SAMPLES {
        let t = i as f64 / (N_DEVIATION_SAMPLES + 1) as f64;
        let p = seg.eval(t);
        let d = pieces
            .iter()
            .map(|piece| piece.distance_to(p))
            .fold(f64::INFINITY, f64::min);
        worst = worst.max(d);
    }
    worst
}

/// The G1 biarc construction.
///
/// Returns one `Line` piece when the segment is straight (or degenerate),
/// otherwise the two tangent arcs, each possibly degraded to a line when
/// its radius is out of range. A negative discriminant in the join
/// quadratic is a [`Error::DegenerateGeometry`].
fn construct_biarc(seg: &CubicBez, cfg: &GeometryConfig) -> Result<ArrayVec<Piece, 2>> {
    let p0 = seg.p0;
    let p4 = seg.p3;
    let mut ts = seg.p1 - seg.p0;
    let mut te = seg.p3 - seg.p2;
    let v = p0 - p4;
    let vmag = v.hypot();
    let sdt = cfg.straight_distance_tolerance;
    let single_line = || {
        let mut pieces = ArrayVec::new();
        pieces.push(Piece::Line(Line::new(p0, p4)));
        pieces
    };

    if ts.hypot() < sdt && te.hypot() < sdt {
        // Both tangents are degenerate; nothing to bend.
        return Ok(single_line());
    }
    if vmag < sdt && (ts.hypot() < sdt || te.hypot() < sdt) {
        return Ok(single_line());
    }
    let r = if te.hypot() < sdt {
        te = -(ts + v).normalize();
        ts.hypot() / vmag * 2.0
    } else if ts.hypot() < sdt {
        ts = -(te + v).normalize();
        (te.hypot() / vmag * 2.0).recip()
    } else {
        ts.hypot() / te.hypot()
    };
    let ts = ts.normalize();
    let te = te.normalize();

    let st = cfg.straight_tolerance;
    let angle_diff = (ts.atan2() - te.atan2()).rem_euclid(std::f64::consts::PI);
    let tangents_parallel = angle_diff < st || std::f64::consts::PI - angle_diff < st;
    if tangents_parallel && (vmag < sdt || 1.0 - (ts.dot(v) / vmag).abs() < st) {
        // Tangents and chord all parallel: straight.
        return Ok(single_line());
    }
    if vmag == 0.0 {
        return Ok(single_line());
    }

    let c = v.dot(v);
    let b = 2.0 * v.dot(r * ts + te);
    let a = 2.0 * r * (ts.dot(te) - 1.0);
    let a_small = a.abs() < 1e-10;
    let b_small = b.abs() < 1e-10;
    let c_small = c.abs() < 1e-10;
    let beta = if a_small && !b_small {
        -c / b
    } else if c_small && !a_small {
        -b / a
    } else if !a_small {
        let discr = b * b - 4.0 * a * c;
        if discr < 0.0 {
            return Err(Error::DegenerateGeometry(format!(
                "negative biarc discriminant {discr} for a={a} b={b} c={c}"
            )));
        }
        let disq = discr.sqrt();
        let beta1 = (-b - disq) / (2.0 * a);
        let beta2 = (-b + disq) / (2.0 * a);
        beta1.max(beta2)
    } else {
        return Ok(single_line());
    };
    if !(beta.is_finite() && beta > 0.0) {
        return Ok(single_line());
    }
    let alpha = beta * r;
    let ab = alpha + beta;
    let p1 = p0 + alpha * ts;
    let p3 = p4 - beta * te;
    let p2 = ((beta / ab) * p1.to_vec2() + (alpha / ab) * p3.to_vec2()).to_point();

    let mut pieces = ArrayVec::new();
    pieces.push(arc_or_line(p0, p1, p2, cfg));
    pieces.push(arc_or_line(p2, p3, p4, cfg));
    Ok(pieces)
}

/// The "radius from three points" construction, with the degenerate cases
/// degraded to a line from `p0` to `p2`.
fn arc_or_line(p0: Point, p1: Point, p2: Point, cfg: &GeometryConfig) -> Piece {
    let line = Piece::Line(Line::new(p0, p2));
    let d = p0.midpoint(p2);
    let dp1 = p1 - d;
    if dp1.hypot() == 0.0 {
        return line;
    }
    let center = d - ((d - p0).hypot2() / dp1.hypot()) * dp1.normalize();
    let radius = (p0 - center).hypot();
    if !center.is_finite() || radius < cfg.min_arc_radius || radius > MAX_ARC_RADIUS {
        return line;
    }
    let a0 = (p0 - center).atan2();
    let a1 = (p1 - center).atan2();
    let a2 = (p2 - center).atan2();
    let full = 2.0 * std::f64::consts::PI;
    let rel1 = (a1 - a0).rem_euclid(full);
    let rel2 = (a2 - a0).rem_euclid(full);
    // Sweep in the direction that passes through p1.
    let sweep = if rel1 <= rel2 { rel2 } else { rel2 - full };
    Piece::Arc(Arc::new(p0, p2, center, sweep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarter_circle() -> CubicBez {
        let k = 0.5519150244935105707435627;
        CubicBez::new((1.0, 0.0), (1.0, k), (k, 1.0), (0.0, 1.0))
    }

    fn global_deviation(seg: &CubicBez, prims: &[Primitive]) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..=100 {
            let p = seg.eval(i as f64 / 100.0);
            let d = prims
                .iter()
                .map(|prim| prim.distance_to(p))
                .fold(f64::INFINITY, f64::min);
            worst = worst.max(d);
        }
        worst
    }

    #[test]
    fn zero_length_segment_is_zero_length_line() {
        let p = Point::new(3.0, 4.0);
        let seg = CubicBez::new(p, p, p, p);
        let prims = fit(&seg, Depth::ZERO, &GeometryConfig::default());
        assert_eq!(prims.len(), 1);
        match prims[0] {
            Primitive::Line(line, _) => {
                assert_eq!(line.p0, p);
                assert_eq!(line.p1, p);
                assert!(line.length() == 0.0);
            }
            Primitive::Arc(..) => panic!("expected a line"),
        }
        assert!(prims[0].arclen().is_finite());
    }

    #[test]
    fn straight_segment_is_line() {
        let seg = CubicBez::from_line((0.0, 0.0), (10.0, 5.0));
        let prims = fit(&seg, Depth::ZERO, &GeometryConfig::default());
        assert_eq!(prims.len(), 1);
        assert!(matches!(prims[0], Primitive::Line(..)));
    }

    #[test]
    fn quarter_circle_two_arcs() {
        let seg = quarter_circle();
        let cfg = GeometryConfig::default();
        let prims = fit(&seg, Depth::ZERO, &cfg);
        assert_eq!(prims.len(), 2);
        assert!(prims.iter().all(|p| matches!(p, Primitive::Arc(..))));
        assert!(global_deviation(&seg, &prims) <= cfg.biarc_tolerance);
        // The halves chain: junction endpoints coincide.
        assert!((prims[0].end() - prims[1].start()).hypot() < 1e-9);
        assert!((prims[0].start() - seg.p0).hypot() < 1e-9);
        assert!((prims[1].end() - seg.p3).hypot() < 1e-9);
    }

    #[test]
    fn fidelity_improves_with_depth() {
        // An S-curve: a single biarc cannot represent the inflection, so
        // recursion must engage and the budget controls the fidelity.
        let seg = CubicBez::new((0.0, 0.0), (3.0, 4.0), (7.0, -4.0), (10.0, 0.0));
        let tolerance = 0.01;
        let strict = GeometryConfig::default().with_biarc_tolerance(tolerance);
        let prims = fit(&seg, Depth::ZERO, &strict);
        assert!(prims.len() > 2);
        // The acceptance test samples the deviation, so allow a little slack
        // between its sample points.
        let fine_deviation = global_deviation(&seg, &prims);
        assert!(fine_deviation <= tolerance * 2.0, "deviation {fine_deviation}");

        // With the recursion budget removed the same curve must come out
        // strictly coarser.
        let exhausted = strict.with_biarc_max_depth(0);
        let coarse = fit(&seg, Depth::ZERO, &exhausted);
        let coarse_deviation = global_deviation(&seg, &coarse);
        assert!(coarse_deviation > tolerance, "deviation {coarse_deviation}");
        assert!(coarse_deviation > fine_deviation);
    }

    #[test]
    fn depth_ramp_tracks_arc_length() {
        let seg = quarter_circle();
        let cfg = GeometryConfig::default().with_biarc_tolerance(0.001);
        let prims = fit(&seg, Depth::new(0.0, 1.0), &cfg);
        let total: f64 = prims.iter().map(|p| p.arclen()).sum();
        let mut cum = 0.0;
        let mut prev_end = 0.0;
        for prim in &prims {
            let depth = prim.depth();
            // Contiguous ramp...
            assert!((depth.start - prev_end).abs() < 1e-9);
            // ...proportional to cumulative arc length.
            assert!((depth.start - cum / total).abs() < 0.05);
            cum += prim.arclen();
            prev_end = depth.end;
        }
        assert!((prev_end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fit_subpath_distributes_depth() {
        let sp = Subpath::from_points(
            &[Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 10.0)],
            false,
        );
        let prims = fit_subpath(&sp, Depth::new(0.0, 4.0), &GeometryConfig::default());
        assert_eq!(prims.len(), 2);
        // The first edge is 3/4 of the total length.
        assert!((prims[0].depth().end - 3.0).abs() < 1e-6);
        assert!((prims[1].depth().start - 3.0).abs() < 1e-6);
        assert!((prims[1].depth().end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn never_panics_on_cusped_input() {
        // Handles crossed over: the curve has a cusp-like kink.
        let seg = CubicBez::new((0.0, 0.0), (10.0, 0.0), (-5.0, 1.0), (5.0, 1.0));
        let prims = fit(&seg, Depth::ZERO, &GeometryConfig::default());
        assert!(!prims.is_empty());
        for p in &prims {
            assert!(p.start().is_finite() && p.end().is_finite());
            assert!(p.arclen().is_finite());
        }
    }
}
