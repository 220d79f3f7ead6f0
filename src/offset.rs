//! Offset paths at a signed radius.
//!
//! The offset of a subpath is built in stages, each a pure function:
//! pre-clean, per-segment offset construction, corner joining,
//! self-intersection splitting, clipping, and final loop validation. No
//! stage is skipped.
//!
//! Sign convention: positive `r` offsets to the *right* of the direction of
//! travel. A counter-clockwise (positive-area) subpath therefore grows for
//! positive `r` and shrinks for negative `r`.

use std::f64::consts::PI;

use smallvec::SmallVec;
use tracing::debug;

use crate::common::solve_itp;
use crate::intersect::curve_intersections;
use crate::{
    Arc, CubicBez, Error, GeometryConfig, ParamCurve, ParamCurveCurvature, Point, Result, Subpath,
    Vec2,
};

/// Segments smaller than this are folded into a neighbor before offsetting.
const MICRO_TOLERANCE: f64 = 1e-3;

/// Offset piece endpoints closer than this are spliced directly.
const JOIN_TOLERANCE: f64 = 1e-4;

/// Above this curvature magnitude an endpoint counts as a sharp corner and
/// no curvature correction is applied to its handle.
const CURVATURE_CLAMP: f64 = 100.0;

/// Loops with a bounding-box diagonal below this are degenerate slivers.
const MIN_LOOP_DIAGONAL: f64 = 1e-2;

/// Accepted band around `|r|`, relative, for the fragment-to-source
/// distance validation.
const DISTANCE_BAND: (f64, f64) = (0.99, 1.01);

/// Intersection parameters this close to a segment boundary do not split.
const T_EPS: f64 = 1e-6;

/// Window around a shared vertex within which a hit between adjacent
/// segments counts as the vertex itself. Tangential touches polish poorly
/// (singular Jacobian), so this is sized to the bisection leaf cells.
const NEAR_VERTEX_EPS: f64 = 2e-3;

/// The outcome of an offset pass.
#[derive(Clone, Debug, Default)]
pub struct OffsetResult {
    /// The surviving offset subpaths.
    pub subpaths: Vec<Subpath>,
    /// Fragments clipped or rejected during validation, for diagnostics.
    pub rejected: Vec<Subpath>,
}

/// Offset every subpath of `path` by the signed radius `r`.
///
/// Returns [`Error::EmptyOffset`] when the offset eliminated all material
/// (for example `|r|` exceeds every local feature size of a closed
/// subpath).
pub fn offset(path: &[Subpath], r: f64, cfg: &GeometryConfig) -> Result<OffsetResult> {
    if r == 0.0 {
        return Ok(OffsetResult {
            subpaths: path.to_vec(),
            rejected: Vec::new(),
        });
    }
    let mut result = OffsetResult::default();
    for subpath in path {
        let Some(clean) = preclean(subpath) else {
            continue;
        };
        let (kept, dropped) = offset_subpath(&clean, r, cfg);
        result.subpaths.extend(kept);
        result.rejected.extend(dropped);
    }
    if result.subpaths.is_empty() {
        debug!("offset at radius {r} eliminated all material");
        return Err(Error::EmptyOffset { radius: r });
    }
    Ok(result)
}

/// Repeatedly offset by `step`, feeding each pass's output into the next,
/// until the offset comes back empty or `max_passes` is reached.
///
/// This is the multi-pass "area clearing" sweep; the passes are returned
/// outermost first.
pub fn offset_sweep(
    path: &[Subpath],
    step: f64,
    max_passes: usize,
    cfg: &GeometryConfig,
) -> Vec<Vec<Subpath>> {
    let mut passes = Vec::new();
    let mut current = path.to_vec();
    for _ in 0..max_passes {
        match offset(&current, step, cfg) {
            Ok(result) => {
                current = result.subpaths;
                passes.push(current.clone());
            }
            Err(err) => {
                debug!("offset sweep stopped: {err}");
                break;
            }
        }
    }
    passes
}

fn offset_subpath(source: &Subpath, r: f64, cfg: &GeometryConfig) -> (Vec<Subpath>, Vec<Subpath>) {
    let pieces = offset_pieces(source, r, cfg);
    if pieces.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let joined = join_pieces(pieces, source.closed, r, cfg);
    if joined.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let splits = self_intersection_splits(&joined, cfg);
    let fragments = joined.split_at_params(&splits);
    assemble_loops(fragments, source, r, cfg)
}

/// Merge away micro segments and make coincident-but-open subpaths
/// explicitly closed.
fn preclean(subpath: &Subpath) -> Option<Subpath> {
    let mut segments: Vec<CubicBez> = Vec::with_capacity(subpath.segments.len());
    for seg in &subpath.segments {
        let size = (seg.p3 - seg.p0)
            .hypot()
            .max((seg.p1 - seg.p0).hypot())
            .max((seg.p3 - seg.p2).hypot());
        if size < MICRO_TOLERANCE {
            if let Some(prev) = segments.last_mut() {
                prev.p3 = seg.p3;
            }
            continue;
        }
        let mut seg = *seg;
        if let Some(prev) = segments.last() {
            if (seg.p0 - prev.p3).hypot() < MICRO_TOLERANCE {
                seg.p0 = prev.p3;
            }
        }
        segments.push(seg);
    }
    if segments.is_empty() {
        return None;
    }
    let mut clean = Subpath::new(segments, subpath.closed);
    let start = clean.start_point();
    let end = clean.end_point();
    if clean.closed || start.distance(end) < MICRO_TOLERANCE {
        clean.segments.last_mut().unwrap().p3 = start;
        clean.closed = true;
    }
    Some(clean)
}

/// One per-segment offset, with the source geometry needed for joining.
struct Piece {
    off: CubicBez,
    /// End vertex of the source (sub)segment, the fillet center at corners.
    orig_end: Point,
    /// Source tangent going into `orig_end`.
    tan_end: Vec2,
    /// Source tangent leaving the piece's start vertex.
    tan_start: Vec2,
}

fn offset_pieces(source: &Subpath, r: f64, cfg: &GeometryConfig) -> Vec<Piece> {
    let mut pieces = Vec::new();
    for seg in &source.segments {
        for sub in split_at_curvature_hazards(seg, r, cfg) {
            pieces.push(offset_piece(&sub, r));
        }
    }
    pieces
}

/// Split a segment wherever its curvature magnitude crosses `1/|r|`.
///
/// A curve bending tighter than the offset radius is a self-intersection
/// hazard; each returned sub-piece has its curvature magnitude bounded on
/// one side of the limit. Crossings are located by a sign scan over the
/// five standard sample parameters, refined with ITP.
fn split_at_curvature_hazards(
    seg: &CubicBez,
    r: f64,
    _cfg: &GeometryConfig,
) -> SmallVec<[CubicBez; 4]> {
    let limit = r.abs().recip();
    let samples = [0.0, 0.25, 0.5, 0.75, 1.0];
    let excess = |t: f64| {
        let k = seg.curvature(t);
        if k.is_finite() {
            k.abs() - limit
        } else {
            f64::MAX
        }
    };
    let mut roots: SmallVec<[f64; 4]> = SmallVec::new();
    for w in 0..samples.len() - 1 {
        let (t0, t1) = (samples[w], samples[w + 1]);
        let (y0, y1) = (excess(t0), excess(t1));
        if (y0 < 0.0) == (y1 < 0.0) {
            continue;
        }
        let k1 = 0.2 / (t1 - t0);
        let root = if y0 < 0.0 {
            solve_itp(excess, t0, t1, 1e-6, 1, k1, y0, y1)
        } else {
            solve_itp(|t| -excess(t), t0, t1, 1e-6, 1, k1, -y0, -y1)
        };
        if root > T_EPS && root < 1.0 - T_EPS {
            roots.push(root);
        }
    }
    let mut out = SmallVec::new();
    if roots.is_empty() {
        out.push(*seg);
        return out;
    }
    let mut rest = *seg;
    let mut t0 = 0.0;
    for &t in &roots {
        let local = (t - t0) / (1.0 - t0);
        let (left, right) = rest.split(local);
        out.push(left);
        rest = right;
        t0 = t;
    }
    out.push(rest);
    out
}

/// Offset one (sub)segment analytically.
///
/// Endpoints move along the boundary normal by `r`; interior handles are
/// scaled by the curvature correction `1 + r·κ` (under this crate's
/// right-hand offset convention), clamped to no correction at sharp
/// corners.
fn offset_piece(seg: &CubicBez, r: f64) -> Piece {
    let scale = |k: f64| {
        if !k.is_finite() || k.abs() > CURVATURE_CLAMP {
            1.0
        } else {
            (1.0 + r * k).max(0.0)
        }
    };
    let disp0 = seg.normal(0.0) * -r;
    let disp1 = seg.normal(1.0) * -r;
    let p0 = seg.p0 + disp0;
    let p3 = seg.p3 + disp1;
    let p1 = p0 + (seg.p1 - seg.p0) * scale(seg.curvature(0.0));
    let p2 = p3 + (seg.p2 - seg.p3) * scale(seg.curvature(1.0));
    Piece {
        off: CubicBez::new(p0, p1, p2, p3),
        orig_end: seg.p3,
        tan_end: seg.tangent(1.0),
        tan_start: seg.tangent(0.0),
    }
}

/// Concatenate the per-segment offsets, resolving each corner.
fn join_pieces(pieces: Vec<Piece>, closed: bool, r: f64, cfg: &GeometryConfig) -> Subpath {
    let mut segments: Vec<CubicBez> = vec![pieces[0].off];
    for i in 1..pieces.len() {
        let prev = segments.pop().unwrap();
        let vertex = pieces[i - 1].orig_end;
        let tan_in = pieces[i - 1].tan_end;
        let tan_out = pieces[i].tan_start;
        let (prev, connector, next) =
            join_corner(prev, pieces[i].off, vertex, tan_in, tan_out, r, cfg);
        segments.push(prev);
        segments.extend(connector);
        segments.push(next);
    }
    if closed && segments.len() > 1 {
        let last = segments.pop().unwrap();
        let first = segments[0];
        let vertex = pieces.last().unwrap().orig_end;
        let tan_in = pieces.last().unwrap().tan_end;
        let tan_out = pieces[0].tan_start;
        let (last, connector, first) = join_corner(last, first, vertex, tan_in, tan_out, r, cfg);
        segments.push(last);
        segments.extend(connector);
        segments[0] = first;
    }
    // Trimming can leave zero-length stubs behind; drop them and keep the
    // chain connected.
    let mut cleaned: Vec<CubicBez> = Vec::with_capacity(segments.len());
    for seg in segments {
        if (seg.p3 - seg.p0).hypot() < 1e-7
            && (seg.p1 - seg.p0).hypot() < 1e-7
            && (seg.p3 - seg.p2).hypot() < 1e-7
        {
            continue;
        }
        cleaned.push(seg);
    }
    Subpath::new(cleaned, closed)
}

/// Resolve one corner between consecutive offset pieces.
///
/// Coinciding endpoints splice directly. Diverged endpoints are trimmed at
/// the mutual intersection when one exists on the kept portions; otherwise
/// a fillet arc of radius `|r|` centered on the source vertex is spliced in
/// when the corner turns away from the offset side, and a straight
/// connector when the corner has collapsed. Near-tangent corners (turn
/// below `straight_tolerance`) never get a fillet; their seam is connected
/// straight. That epsilon rule is this implementation's tie-break for
/// ~180° corners.
fn join_corner(
    prev: CubicBez,
    next: CubicBez,
    vertex: Point,
    tan_in: Vec2,
    tan_out: Vec2,
    r: f64,
    cfg: &GeometryConfig,
) -> (CubicBez, Vec<CubicBez>, CubicBez) {
    let gap = (next.p0 - prev.p3).hypot();
    if gap <= JOIN_TOLERANCE {
        let mut next = next;
        next.p0 = prev.p3;
        return (prev, Vec::new(), next);
    }
    let mut best: Option<(f64, f64)> = None;
    for hit in curve_intersections(&prev, &next, cfg) {
        if hit.overlap {
            continue;
        }
        if (0.0..=1.0).contains(&hit.ta) && (0.0..=1.0).contains(&hit.tb) {
            if best.map(|(ta, _)| hit.ta > ta).unwrap_or(true) {
                best = Some((hit.ta, hit.tb));
            }
        }
    }
    if let Some((ta, tb)) = best {
        let mut prev = prev.subsegment(0.0..ta);
        let mut next = next.subsegment(tb..1.0);
        let mid = prev.p3.midpoint(next.p0);
        prev.p3 = mid;
        next.p0 = mid;
        return (prev, Vec::new(), next);
    }
    let turn = tan_in.cross(tan_out);
    if turn * r > 0.0 && turn.abs() >= cfg.straight_tolerance {
        let a0 = (prev.p3 - vertex).atan2();
        let a1 = (next.p0 - vertex).atan2();
        let full = 2.0 * PI;
        let sweep = if turn > 0.0 {
            (a1 - a0).rem_euclid(full)
        } else {
            (a1 - a0).rem_euclid(full) - full
        };
        let arc = Arc::new(prev.p3, next.p0, vertex, sweep);
        let tolerance = (1e-3 * r.abs()).min(cfg.offset_tolerance);
        return (prev, arc.to_cubics(tolerance), next);
    }
    let connector = vec![CubicBez::from_line(prev.p3, next.p0)];
    (prev, connector, next)
}

/// Collect split parameters at every self-intersection of the joined
/// offset subpath, including segments crossing themselves.
fn self_intersection_splits(subpath: &Subpath, cfg: &GeometryConfig) -> Vec<(usize, f64)> {
    let segments = &subpath.segments;
    let n = segments.len();
    let mut splits = Vec::new();
    let in_range = |t: f64| (0.0..=1.0).contains(&t);
    for i in 0..n {
        // A segment crossing itself shows up between its two halves.
        let (left, right) = segments[i].subdivide();
        for hit in curve_intersections(&left, &right, cfg) {
            if hit.overlap || !in_range(hit.ta) || !in_range(hit.tb) {
                continue;
            }
            if hit.ta > 1.0 - NEAR_VERTEX_EPS && hit.tb < NEAR_VERTEX_EPS {
                continue;
            }
            splits.push((i, 0.5 * hit.ta));
            splits.push((i, 0.5 + 0.5 * hit.tb));
        }
        for j in (i + 1)..n {
            for hit in curve_intersections(&segments[i], &segments[j], cfg) {
                if hit.overlap || !in_range(hit.ta) || !in_range(hit.tb) {
                    continue;
                }
                // Adjacent segments meet at their shared vertex by
                // construction; that is not a crossing.
                if j == i + 1 && hit.ta > 1.0 - NEAR_VERTEX_EPS && hit.tb < NEAR_VERTEX_EPS {
                    continue;
                }
                if subpath.closed
                    && i == 0
                    && j == n - 1
                    && hit.tb > 1.0 - NEAR_VERTEX_EPS
                    && hit.ta < NEAR_VERTEX_EPS
                {
                    continue;
                }
                splits.push((i, hit.ta));
                splits.push((j, hit.tb));
            }
        }
    }
    splits
}

/// Chain fragments into loops through valid junctions and validate them.
fn assemble_loops(
    fragments: Vec<Subpath>,
    source: &Subpath,
    r: f64,
    cfg: &GeometryConfig,
) -> (Vec<Subpath>, Vec<Subpath>) {
    let accuracy = cfg.offset_tolerance.min(1e-3);
    let band = (DISTANCE_BAND.0 * r.abs(), DISTANCE_BAND.1 * r.abs());
    let mut kept = Vec::new();
    let mut rejected = Vec::new();

    // Distance validation per fragment: its midpoint must sit in the
    // annulus around the source.
    let mut valid: Vec<Subpath> = Vec::new();
    for fragment in fragments {
        if fragment.is_empty() {
            continue;
        }
        let mid_seg = &fragment.segments[fragment.segments.len() / 2];
        let d = source.distance_to(mid_seg.eval(0.5), accuracy);
        if d < band.0 || d > band.1 {
            debug!("rejecting offset fragment at distance {d} (want ~{})", r.abs());
            rejected.push(fragment);
        } else {
            valid.push(fragment);
        }
    }

    if !source.closed {
        // Open sources produce open offsets; chain what remains in order.
        if !valid.is_empty() {
            let mut segments = Vec::new();
            for fragment in valid {
                segments.extend(fragment.segments);
            }
            kept.push(Subpath::new(segments, false));
        }
        return (kept, rejected);
    }

    let want_ccw = source.signed_area() >= 0.0;
    let n = valid.len();
    let mut used = vec![false; n];
    for start in 0..n {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut segments = valid[start].segments.clone();
        let loop_start = segments[0].p0;
        loop {
            let end = segments.last().unwrap().p3;
            if end.distance(loop_start) <= JOIN_TOLERANCE {
                let mut candidate = Subpath::new(segments, true);
                candidate.segments.last_mut().unwrap().p3 = loop_start;
                let area = candidate.signed_area();
                let sliver = candidate.bounding_box().diagonal() < MIN_LOOP_DIAGONAL;
                if sliver || ((area >= 0.0) != want_ccw) {
                    debug!("rejecting offset loop (sliver: {sliver}, area: {area})");
                    rejected.push(candidate);
                } else {
                    kept.push(candidate);
                }
                break;
            }
            // Pick the unused fragment continuing from `end` with the turn
            // that matches the offset side.
            let tan_end = segments.last().unwrap().tangent(1.0);
            let mut best: Option<(usize, f64)> = None;
            for (j, fragment) in valid.iter().enumerate() {
                if used[j] || fragment.start_point().distance(end) > JOIN_TOLERANCE {
                    continue;
                }
                let tan_in = fragment.segments[0].tangent(0.0);
                let score = tan_end.cross(tan_in) * r.signum();
                if best.map(|(_, s)| score > s).unwrap_or(true) {
                    best = Some((j, score));
                }
            }
            match best {
                Some((j, _)) => {
                    used[j] = true;
                    segments.extend(valid[j].segments.iter().copied());
                }
                None => {
                    rejected.push(Subpath::new(segments, false));
                    break;
                }
            }
        }
    }
    (kept, rejected)
}
