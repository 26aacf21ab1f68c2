//! Floor boundary synthesis.
//!
//! Two modes produce the closed room polygon: merging random
//! axis-aligned rectangles (union traced on a coordinate-compressed
//! occupancy grid, so the result is exact), or taking the outer
//! boundary of a Delaunay triangulation of random points. Degenerate
//! draws are retried a bounded number of times before failing with
//! `Error::Geometry`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{bounds, signed_area, Point2};
use crate::grid::OccupancyGrid;
use crate::prng::Pcg32;

const MAX_SYNTH_RETRIES: u32 = 10;
const MAX_RECT_REDRAWS: u32 = 10;
const MIN_RECT_DELTA: f64 = 1e-6;
const POINT_EPS: f64 = 1e-9;

/// Which boundary synthesis mode runs; exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySpec {
    Rectangles { count: u32 },
    Triangulation { points: u32 },
}

impl BoundarySpec {
    pub fn rectangles(count: u32) -> Result<Self> {
        if count < 1 {
            return Err(Error::config(format!(
                "rectangle count must be at least 1, got {count}"
            )));
        }
        Ok(BoundarySpec::Rectangles { count })
    }

    pub fn triangulation(points: u32) -> Result<Self> {
        if points < 3 {
            return Err(Error::config(format!(
                "triangulation needs at least 3 points, got {points}"
            )));
        }
        Ok(BoundarySpec::Triangulation { points })
    }
}

/// Random ranges for rectangle centers/extents and triangulation
/// points, all in meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SynthesisRanges {
    pub x_center: (f64, f64),
    pub y_center: (f64, f64),
    pub delta_x: (f64, f64),
    pub delta_y: (f64, f64),
}

/// Axis-aligned rectangle as (x0, y0, x1, y1).
type Rect = (f64, f64, f64, f64);

fn random_extent(rng: &mut Pcg32, range: (f64, f64)) -> Result<f64> {
    for _ in 0..MAX_RECT_REDRAWS {
        let d = rng.next_range(range.0, range.1);
        if d > MIN_RECT_DELTA {
            return Ok(d);
        }
    }
    Err(Error::geometry(format!(
        "degenerate rectangle: zero extent after {MAX_RECT_REDRAWS} redraws"
    )))
}

fn random_rect(
    rng: &mut Pcg32,
    ranges: &SynthesisRanges,
    centered: bool,
) -> Result<Rect> {
    let w = random_extent(rng, ranges.delta_x)?;
    let h = random_extent(rng, ranges.delta_y)?;
    let (cx, cy) = if centered {
        (0.0, 0.0)
    } else {
        (
            rng.next_range(ranges.x_center.0, ranges.x_center.1),
            rng.next_range(ranges.y_center.0, ranges.y_center.1),
        )
    };
    Ok((cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0))
}

fn rect_polygon(rect: Rect) -> Vec<Point2> {
    let (x0, y0, x1, y1) = rect;
    vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

fn has_repeated_vertex(polygon: &[Point2]) -> bool {
    let mut seen = HashSet::new();
    for p in polygon {
        if !seen.insert((p.x.to_bits(), p.y.to_bits())) {
            return true;
        }
    }
    false
}

fn merge_rectangles(rects: &[Rect]) -> Option<Vec<Point2>> {
    let mut xs = Vec::with_capacity(rects.len() * 2);
    let mut ys = Vec::with_capacity(rects.len() * 2);
    for &(x0, y0, x1, y1) in rects {
        xs.push(x0);
        xs.push(x1);
        ys.push(y0);
        ys.push(y1);
    }
    let grid = OccupancyGrid::from_edges(xs, ys, |p| {
        rects.iter().any(|&(x0, y0, x1, y1)| {
            p.x > x0 && p.x < x1 && p.y > y0 && p.y < y1
        })
    });
    if grid.covered_components() != 1 {
        return None;
    }
    let loops = grid.trace_boundaries();
    // A hole or a pinched outline is not a usable room footprint.
    if loops.len() != 1 {
        return None;
    }
    let outline = loops.into_iter().next()?;
    if signed_area(&outline) <= 0.0 || has_repeated_vertex(&outline) {
        return None;
    }
    Some(outline)
}

/// Produce the room boundary polygon for the given spec.
///
/// The result is a simple counter-clockwise polygon with at least
/// three distinct vertices and no zero-length edges.
pub fn synthesize(
    spec: &BoundarySpec,
    ranges: &SynthesisRanges,
    rng: &mut Pcg32,
) -> Result<Vec<Point2>> {
    match *spec {
        BoundarySpec::Rectangles { count: 1 } => {
            // Single rectangle: returned directly, no union step.
            Ok(rect_polygon(random_rect(rng, ranges, true)?))
        }
        BoundarySpec::Rectangles { count } => {
            for attempt in 0..MAX_SYNTH_RETRIES {
                let mut rects = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    rects.push(random_rect(rng, ranges, false)?);
                }
                if let Some(outline) = merge_rectangles(&rects) {
                    tracing::debug!(
                        vertices = outline.len(),
                        attempt,
                        "merged {count} rectangles into boundary"
                    );
                    return Ok(outline);
                }
            }
            Err(Error::geometry(format!(
                "disjoint union: {count} rectangles did not merge into a \
                 single simple polygon after {MAX_SYNTH_RETRIES} attempts"
            )))
        }
        BoundarySpec::Triangulation { points } => {
            let pts: Vec<Point2> = (0..points)
                .map(|_| {
                    Point2::new(
                        rng.next_range(ranges.x_center.0, ranges.x_center.1),
                        rng.next_range(ranges.y_center.0, ranges.y_center.1),
                    )
                })
                .collect();
            triangulate_boundary(&pts)
        }
    }
}

/// Outer boundary of the Delaunay triangulation of a point set: the
/// loop formed by edges that belong to exactly one triangle.
pub fn triangulate_boundary(points: &[Point2]) -> Result<Vec<Point2>> {
    let triangles = delaunay(points)?;
    if triangles.is_empty() {
        return Err(Error::geometry(
            "degenerate triangulation: no non-degenerate triangles",
        ));
    }
    // Count undirected edge usage; boundary edges are used once.
    let mut edge_use: HashMap<(usize, usize), u32> = HashMap::new();
    for tri in &triangles {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let key = (a.min(b), a.max(b));
            *edge_use.entry(key).or_insert(0) += 1;
        }
    }
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for (&(a, b), &count) in &edge_use {
        if count == 1 {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }
    }
    if adjacency.is_empty() || adjacency.values().any(|n| n.len() != 2) {
        return Err(Error::geometry(
            "degenerate triangulation: boundary is not a closed loop",
        ));
    }
    let start = *adjacency.keys().min().ok_or_else(|| {
        Error::geometry("degenerate triangulation: empty boundary")
    })?;
    let mut loop_idx = vec![start];
    let mut prev = start;
    let mut current = adjacency[&start][0];
    while current != start {
        loop_idx.push(current);
        let next = adjacency[&current]
            .iter()
            .copied()
            .find(|&n| n != prev)
            .ok_or_else(|| {
                Error::geometry(
                    "degenerate triangulation: open boundary chain",
                )
            })?;
        prev = current;
        current = next;
        if loop_idx.len() > adjacency.len() {
            return Err(Error::geometry(
                "degenerate triangulation: boundary loop does not close",
            ));
        }
    }
    let mut polygon: Vec<Point2> =
        loop_idx.into_iter().map(|i| points[i]).collect();
    if signed_area(&polygon) < 0.0 {
        polygon.reverse();
    }
    if polygon.len() < 3 || signed_area(&polygon) <= 0.0 {
        return Err(Error::geometry(
            "degenerate triangulation: boundary has no area",
        ));
    }
    Ok(polygon)
}

fn orient2d(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True if `p` lies strictly inside the circumcircle of CCW triangle
/// (a, b, c).
fn in_circumcircle(a: Point2, b: Point2, c: Point2, p: Point2) -> bool {
    let ax = a.x - p.x;
    let ay = a.y - p.y;
    let bx = b.x - p.x;
    let by = b.y - p.y;
    let cx = c.x - p.x;
    let cy = c.y - p.y;
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det > 0.0
}

/// Bowyer-Watson incremental Delaunay triangulation.
///
/// Returns index triangles into `points`, all counter-clockwise.
/// Duplicate points (within tolerance) are inserted once; collinear
/// input yields an empty triangle list.
fn delaunay(points: &[Point2]) -> Result<Vec<[usize; 3]>> {
    if points.len() < 3 {
        return Err(Error::geometry(format!(
            "degenerate triangulation: need at least 3 points, got {}",
            points.len()
        )));
    }
    let (lo, hi) = bounds(points);
    let span = (hi.x - lo.x).max(hi.y - lo.y).max(1.0);
    let mid = Point2::new((lo.x + hi.x) / 2.0, (lo.y + hi.y) / 2.0);
    // Super-triangle far enough out to enclose every circumcircle of
    // interest.
    let n = points.len();
    let mut all: Vec<Point2> = points.to_vec();
    all.push(Point2::new(mid.x - 20.0 * span, mid.y - 10.0 * span));
    all.push(Point2::new(mid.x + 20.0 * span, mid.y - 10.0 * span));
    all.push(Point2::new(mid.x, mid.y + 20.0 * span));

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];
    let mut inserted: Vec<usize> = Vec::new();
    for pi in 0..n {
        let p = all[pi];
        if inserted.iter().any(|&q| {
            (all[q].x - p.x).abs() < POINT_EPS
                && (all[q].y - p.y).abs() < POINT_EPS
        }) {
            continue;
        }
        inserted.push(pi);

        let mut bad = Vec::new();
        for (ti, tri) in triangles.iter().enumerate() {
            if in_circumcircle(all[tri[0]], all[tri[1]], all[tri[2]], p) {
                bad.push(ti);
            }
        }
        // Boundary of the cavity: edges used by exactly one bad
        // triangle.
        let mut cavity_edges: HashMap<(usize, usize), (usize, usize)> =
            HashMap::new();
        for &ti in &bad {
            let tri = triangles[ti];
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let key = (a.min(b), a.max(b));
                if cavity_edges.remove(&key).is_none() {
                    cavity_edges.insert(key, (a, b));
                }
            }
        }
        for &ti in bad.iter().rev() {
            triangles.swap_remove(ti);
        }
        for &(a, b) in cavity_edges.values() {
            if orient2d(all[a], all[b], p).abs() < POINT_EPS {
                continue;
            }
            let tri = if orient2d(all[a], all[b], p) > 0.0 {
                [a, b, pi]
            } else {
                [b, a, pi]
            };
            triangles.push(tri);
        }
    }
    triangles.retain(|t| t.iter().all(|&i| i < n));
    Ok(triangles)
}
