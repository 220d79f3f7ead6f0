//! Intersections between cubic Bézier segments.
//!
//! The algorithm is recursive bounding-box bisection: prune when the
//! control boxes are disjoint, split both curves in half while depth budget
//! remains, and treat the leaves as straight chords. Every raw hit is then
//! polished with 2-D Newton iteration on `B_a(ta) − B_b(tb) = 0`.

use std::ops::Range;

use crate::{CubicBez, GeometryConfig, ParamCurve, ParamCurveDeriv, ParamCurveNearest};

/// Maximum number of Newton polishing iterations per hit.
const MAX_NEWTON_ITER: usize = 10;

/// Parameters this close to 0 or 1 are clamped onto the endpoint.
const CLAMP_EPS: f64 = 1e-9;

/// How far beyond a leaf cell a chord-line solution may fall and still be
/// reported. Hits from this extension land outside `[0, 1]` and are left
/// for the caller to filter.
const LEAF_EXTENSION: f64 = 0.5;

/// Hits closer than this in parameter space collapse into one.
const DEDUPE_EPS: f64 = 1e-7;

/// A single intersection between two curves.
///
/// When two curves are geometrically identical over a span, the span is
/// reported as a *pair* of entries with `overlap` set, bracketing the
/// coincident parameter ranges on both curves; no point hits are produced
/// for the span.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Parameter on the first curve.
    pub ta: f64,
    /// Parameter on the second curve.
    pub tb: f64,
    /// Whether this entry is an endpoint of a coincident span rather than a
    /// transversal crossing.
    pub overlap: bool,
}

enum RawHit {
    Point { ta: f64, tb: f64 },
    Overlap { ta: f64, tb: f64 },
}

/// Find the intersections between two cubic Bézier segments.
///
/// Returns raw, unfiltered hits: parameters within a small epsilon outside
/// `[0, 1]` are clamped onto the endpoint, but hits from the chord
/// extension beyond that are returned as-is and are the caller's job to
/// filter.
pub fn curve_intersections(
    a: &CubicBez,
    b: &CubicBez,
    cfg: &GeometryConfig,
) -> Vec<Intersection> {
    if let Some(span) = coincident_span(a, b, cfg) {
        return span;
    }
    let mut raw = Vec::new();
    bisect(
        a,
        0.0..1.0,
        cfg.max_intersect_depth,
        b,
        0.0..1.0,
        cfg.max_intersect_depth,
        cfg,
        &mut raw,
    );
    let mut hits: Vec<Intersection> = Vec::new();
    for hit in raw {
        let candidate = match hit {
            RawHit::Point { ta, tb } => {
                let (ta, tb) = newton_polish(a, b, ta, tb);
                Intersection {
                    ta: clamp_param(ta),
                    tb: clamp_param(tb),
                    overlap: false,
                }
            }
            RawHit::Overlap { ta, tb } => Intersection {
                ta: clamp_param(ta),
                tb: clamp_param(tb),
                overlap: true,
            },
        };
        let duplicate = hits.iter().any(|h| {
            h.overlap == candidate.overlap
                && (h.ta - candidate.ta).abs() < DEDUPE_EPS
                && (h.tb - candidate.tb).abs() < DEDUPE_EPS
        });
        if !duplicate {
            hits.push(candidate);
        }
    }
    hits
}

fn clamp_param(t: f64) -> f64 {
    if (-CLAMP_EPS..0.0).contains(&t) {
        0.0
    } else if t > 1.0 && t <= 1.0 + CLAMP_EPS {
        1.0
    } else {
        t
    }
}

#[allow(clippy::too_many_arguments)]
fn bisect(
    a: &CubicBez,
    ra: Range<f64>,
    depth_a: u32,
    b: &CubicBez,
    rb: Range<f64>,
    depth_b: u32,
    cfg: &GeometryConfig,
    out: &mut Vec<RawHit>,
) {
    let pad = cfg.intersection_tolerance;
    if !a
        .control_box()
        .inflate(pad)
        .intersects(b.control_box().inflate(pad))
    {
        return;
    }
    let mid = |r: &Range<f64>| 0.5 * (r.start + r.end);
    match (depth_a > 0, depth_b > 0) {
        (true, true) => {
            let (a0, a1) = a.subdivide();
            let (b0, b1) = b.subdivide();
            let (am, bm) = (mid(&ra), mid(&rb));
            bisect(&a0, ra.start..am, depth_a - 1, &b0, rb.start..bm, depth_b - 1, cfg, out);
            bisect(&a0, ra.start..am, depth_a - 1, &b1, bm..rb.end, depth_b - 1, cfg, out);
            bisect(&a1, am..ra.end, depth_a - 1, &b0, rb.start..bm, depth_b - 1, cfg, out);
            bisect(&a1, am..ra.end, depth_a - 1, &b1, bm..rb.end, depth_b - 1, cfg, out);
        }
        (true, false) => {
            let (a0, a1) = a.subdivide();
            let am = mid(&ra);
            bisect(&a0, ra.start..am, depth_a - 1, b, rb.clone(), 0, cfg, out);
            bisect(&a1, am..ra.end, depth_a - 1, b, rb, 0, cfg, out);
        }
        (false, true) => {
            let (b0, b1) = b.subdivide();
            let bm = mid(&rb);
            bisect(a, ra.clone(), 0, &b0, rb.start..bm, depth_b - 1, cfg, out);
            bisect(a, ra, 0, &b1, bm..rb.end, depth_b - 1, cfg, out);
        }
        (false, false) => leaf_hits(a, &ra, b, &rb, cfg, out),
    }
}

/// At exhausted depth the cells are short enough to treat as their chords.
fn leaf_hits(
    a: &CubicBez,
    ra: &Range<f64>,
    b: &CubicBez,
    rb: &Range<f64>,
    cfg: &GeometryConfig,
    out: &mut Vec<RawHit>,
) {
    let da = a.p3 - a.p0;
    let db = b.p3 - b.p0;
    let w = b.p0 - a.p0;
    let denom = da.cross(db);
    let scale = (da.hypot() * db.hypot()).max(f64::MIN_POSITIVE);
    let global_a = |t: f64| ra.start + t * (ra.end - ra.start);
    let global_b = |t: f64| rb.start + t * (rb.end - rb.start);
    if denom.abs() > 1e-12 * scale {
        let ta = w.cross(db) / denom;
        let tb = w.cross(da) / denom;
        let window = -LEAF_EXTENSION..(1.0 + LEAF_EXTENSION);
        if window.contains(&ta) && window.contains(&tb) {
            out.push(RawHit::Point {
                ta: global_a(ta),
                tb: global_b(tb),
            });
        }
        return;
    }
    // Parallel chords. Degenerate or coincident ones yield an overlap range.
    let len2 = da.hypot2();
    if len2 <= f64::MIN_POSITIVE {
        // Both cells have collapsed to (nearly) points.
        if w.hypot() <= cfg.intersection_tolerance {
            out.push(RawHit::Point {
                ta: global_a(0.0),
                tb: global_b(0.0),
            });
        }
        return;
    }
    if w.cross(da).abs() > cfg.intersection_tolerance * len2.sqrt() {
        return;
    }
    // Project b's endpoints onto a's chord and clip the common span.
    let t0 = w.dot(da) / len2;
    let t1 = (b.p3 - a.p0).dot(da) / len2;
    let lo = t0.min(t1).max(0.0);
    let hi = t0.max(t1).min(1.0);
    if hi <= lo {
        return;
    }
    let b_of = |t: f64| (t - t0) / (t1 - t0);
    out.push(RawHit::Overlap {
        ta: global_a(lo),
        tb: global_b(b_of(lo)),
    });
    out.push(RawHit::Overlap {
        ta: global_a(hi),
        tb: global_b(b_of(hi)),
    });
}

/// Polish a hit with Newton iteration on the 2×2 system.
///
/// A singular Jacobian keeps the bisection estimate unpolished rather than
/// discarding the hit.
fn newton_polish(a: &CubicBez, b: &CubicBez, ta0: f64, tb0: f64) -> (f64, f64) {
    let qa = a.deriv();
    let qb = b.deriv();
    let (mut ta, mut tb) = (ta0, tb0);
    for _ in 0..MAX_NEWTON_ITER {
        let f = a.eval(ta) - b.eval(tb);
        if f.hypot2() < 1e-30 {
            break;
        }
        let ja = qa.eval(ta).to_vec2();
        let jb = qb.eval(tb).to_vec2();
        let det = -ja.cross(jb);
        if det.abs() < 1e-12 {
            return (ta0, tb0);
        }
        ta += f.cross(jb) / det;
        tb += f.cross(ja) / det;
        if !(-1.0..=2.0).contains(&ta) || !(-1.0..=2.0).contains(&tb) {
            // Diverging away from the bracketing cell.
            return (ta0, tb0);
        }
    }
    (ta, tb)
}

/// Detect two curves lying on each other over a span.
///
/// Returns the span as a pair of `overlap` hits, or `None` when the curves
/// only touch at isolated points (or not at all).
fn coincident_span(
    a: &CubicBez,
    b: &CubicBez,
    cfg: &GeometryConfig,
) -> Option<Vec<Intersection>> {
    let tol = cfg.intersection_tolerance.max(1e-9);
    let mut pairs: Vec<(f64, f64)> = Vec::new();
    for (ta, p) in [(0.0, a.p0), (1.0, a.p3)] {
        let (tb, d2) = b.nearest(p, tol);
        if d2.sqrt() <= tol {
            pairs.push((ta, tb));
        }
    }
    for (tb, p) in [(0.0, b.p0), (1.0, b.p3)] {
        let (ta, d2) = a.nearest(p, tol);
        if d2.sqrt() <= tol {
            pairs.push((ta, tb));
        }
    }
    if pairs.len() < 2 {
        return None;
    }
    pairs.sort_by(|x, y| x.partial_cmp(y).unwrap());
    let lo = pairs[0];
    let hi = pairs[pairs.len() - 1];
    if hi.0 - lo.0 < 1e-6 {
        return None;
    }
    // Endpoints alone can lie on the other curve without the curves being
    // coincident; confirm at interior samples of the candidate span.
    for i in 1..4 {
        let ta = lo.0 + (hi.0 - lo.0) * (i as f64 / 4.0);
        let (_, d2) = b.nearest(a.eval(ta), tol);
        if d2.sqrt() > tol {
            return None;
        }
    }
    Some(vec![
        Intersection {
            ta: lo.0,
            tb: lo.1,
            overlap: true,
        },
        Intersection {
            ta: hi.0,
            tb: hi.1,
            overlap: true,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn cfg() -> GeometryConfig {
        GeometryConfig::default()
    }

    #[test]
    fn crossing_lines() {
        let a = CubicBez::from_line((0.0, 0.0), (10.0, 10.0));
        let b = CubicBez::from_line((0.0, 10.0), (10.0, 0.0));
        let hits: Vec<_> = curve_intersections(&a, &b, &cfg())
            .into_iter()
            .filter(|h| (0.0..=1.0).contains(&h.ta) && (0.0..=1.0).contains(&h.tb))
            .collect();
        assert_eq!(hits.len(), 1);
        let h = hits[0];
        assert!(!h.overlap);
        assert!((h.ta - 0.5).abs() < 1e-6);
        assert!((h.tb - 0.5).abs() < 1e-6);
        assert!((a.eval(h.ta) - Point::new(5.0, 5.0)).hypot() < 1e-6);
    }

    #[test]
    fn curve_line_crossing() {
        // y = x^2 against the horizontal y = 0.25: crossing at x = 0.5.
        let a = CubicBez::new((0.0, 0.0), (1.0 / 3.0, 0.0), (2.0 / 3.0, 1.0 / 3.0), (1.0, 1.0));
        let b = CubicBez::from_line((0.0, 0.25), (1.0, 0.25));
        let hits: Vec<_> = curve_intersections(&a, &b, &cfg())
            .into_iter()
            .filter(|h| (0.0..=1.0).contains(&h.ta) && (0.0..=1.0).contains(&h.tb))
            .collect();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].ta - 0.5).abs() < 1e-6);
        assert!((hits[0].tb - 0.5).abs() < 1e-6);
    }

    #[test]
    fn double_crossing() {
        let a = CubicBez::new((0.0, 0.0), (0.0, 2.0), (10.0, 2.0), (10.0, 0.0));
        let b = CubicBez::from_line((-1.0, 1.0), (11.0, 1.0));
        let hits: Vec<_> = curve_intersections(&a, &b, &cfg())
            .into_iter()
            .filter(|h| (0.0..=1.0).contains(&h.ta) && (0.0..=1.0).contains(&h.tb))
            .collect();
        assert_eq!(hits.len(), 2);
        for h in &hits {
            assert!((a.eval(h.ta) - b.eval(h.tb)).hypot() < 1e-6);
        }
        // Symmetric arch: the crossings mirror about t = 0.5.
        assert!((hits[0].ta + hits[1].ta - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_curves() {
        let a = CubicBez::from_line((0.0, 0.0), (1.0, 0.0));
        let b = CubicBez::from_line((0.0, 5.0), (1.0, 5.0));
        assert!(curve_intersections(&a, &b, &cfg()).is_empty());
    }

    #[test]
    fn identical_curves_overlap() {
        let a = CubicBez::new((0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0));
        let hits = curve_intersections(&a, &a, &cfg());
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.overlap));
        assert!((hits[0].ta - 0.0).abs() < 1e-9);
        assert!((hits[1].ta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_overlap_reports_range() {
        let a = CubicBez::new((0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0));
        let b = a.subsegment(0.25..0.75);
        let hits = curve_intersections(&a, &b, &cfg());
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.overlap));
        assert!((hits[0].ta - 0.25).abs() < 1e-3);
        assert!((hits[1].ta - 0.75).abs() < 1e-3);
        assert!((hits[0].tb - 0.0).abs() < 1e-3);
        assert!((hits[1].tb - 1.0).abs() < 1e-3);
    }

    #[test]
    fn shared_endpoint_is_point_hit() {
        let a = CubicBez::from_line((0.0, 0.0), (1.0, 0.0));
        let b = CubicBez::from_line((1.0, 0.0), (2.0, 1.0));
        let hits: Vec<_> = curve_intersections(&a, &b, &cfg())
            .into_iter()
            .filter(|h| (0.0..=1.0).contains(&h.ta) && (0.0..=1.0).contains(&h.tb))
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].overlap);
        assert!((hits[0].ta - 1.0).abs() < 1e-9);
        assert!(hits[0].tb.abs() < 1e-9);
    }
}
