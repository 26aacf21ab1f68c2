//! 2D geometric primitives and predicates.
//!
//! Everything operates on simple polygons given as vertex lists in
//! meters; closing edge (last vertex back to first) is implicit.
//! Overlap tests use the Separating Axis Theorem and are restricted to
//! convex footprints; touching (shared edge or corner) is NOT counted
//! as overlap.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Point2 { x, y }
    }
}

/// A 2D polygon tagged with the scene object that owns it, used for
/// collision and free-space queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub owner: String,
    pub points: Vec<Point2>,
}

impl Footprint {
    pub fn new(owner: impl Into<String>, points: Vec<Point2>) -> Self {
        Footprint {
            owner: owner.into(),
            points,
        }
    }
}

/// Signed polygon area via the shoelace formula.
/// Positive for counter-clockwise winding.
pub fn signed_area(vertices: &[Point2]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area / 2.0
}

pub fn polygon_area(vertices: &[Point2]) -> f64 {
    signed_area(vertices).abs()
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(p: Point2, vertices: &[Point2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (vertices[i].x, vertices[i].y);
        let (xj, yj) = (vertices[j].x, vertices[j].y);
        if (yi > p.y) != (yj > p.y) {
            let intersect_x = (xj - xi) * (p.y - yi) / (yj - yi) + xi;
            if p.x < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Axis-aligned bounding box of a vertex list.
pub fn bounds(vertices: &[Point2]) -> (Point2, Point2) {
    let mut lo = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut hi = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for v in vertices {
        lo.x = lo.x.min(v.x);
        lo.y = lo.y.min(v.y);
        hi.x = hi.x.max(v.x);
        hi.y = hi.y.max(v.y);
    }
    (lo, hi)
}

/// Corners of an oriented rectangle, counter-clockwise.
pub fn rect_corners(
    cx: f64,
    cy: f64,
    half_w: f64,
    half_h: f64,
    rot_rad: f64,
) -> [Point2; 4] {
    let cos_r = rot_rad.cos();
    let sin_r = rot_rad.sin();
    const SIGNS: [(f64, f64); 4] =
        [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let mut corners = [Point2::default(); 4];
    for (i, &(sx, sy)) in SIGNS.iter().enumerate() {
        let lx = sx * half_w;
        let ly = sy * half_h;
        corners[i] = Point2::new(
            cx + lx * cos_r - ly * sin_r,
            cy + lx * sin_r + ly * cos_r,
        );
    }
    corners
}

/// Regular n-gon approximation of a disc, counter-clockwise.
pub fn disc(cx: f64, cy: f64, radius: f64, sides: usize) -> Vec<Point2> {
    let mut pts = Vec::with_capacity(sides);
    for i in 0..sides {
        let a = 2.0 * std::f64::consts::PI * i as f64 / sides as f64;
        pts.push(Point2::new(cx + radius * a.cos(), cy + radius * a.sin()));
    }
    pts
}

fn project(vertices: &[Point2], ax: f64, ay: f64) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in vertices {
        let dot = v.x * ax + v.y * ay;
        if dot < lo {
            lo = dot;
        }
        if dot > hi {
            hi = dot;
        }
    }
    (lo, hi)
}

/// True if the interiors of two convex polygons overlap.
/// Touching (shared edge or corner) is NOT counted as overlap.
pub fn convex_overlap(a: &[Point2], b: &[Point2]) -> bool {
    for vertices in [a, b] {
        let n = vertices.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let ex = vertices[j].x - vertices[i].x;
            let ey = vertices[j].y - vertices[i].y;
            let (ax, ay) = (-ey, ex);
            let (min_a, max_a) = project(a, ax, ay);
            let (min_b, max_b) = project(b, ax, ay);
            if max_a <= min_b || max_b <= min_a {
                return false;
            }
        }
    }
    true
}

pub fn point_segment_distance_sq(p: Point2, a: Point2, b: Point2) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let px = a.x + t * dx - p.x;
    let py = a.y + t * dy - p.y;
    px * px + py * py
}

fn orient(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_intersect(a1: Point2, a2: Point2, b1: Point2, b2: Point2) -> bool {
    let d1 = orient(b1, b2, a1);
    let d2 = orient(b1, b2, a2);
    let d3 = orient(a1, a2, b1);
    let d4 = orient(a1, a2, b2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn segment_distance(a1: Point2, a2: Point2, b1: Point2, b2: Point2) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    let d = point_segment_distance_sq(a1, b1, b2)
        .min(point_segment_distance_sq(a2, b1, b2))
        .min(point_segment_distance_sq(b1, a1, a2))
        .min(point_segment_distance_sq(b2, a1, a2));
    d.sqrt()
}

/// Minimum distance between the boundaries/interiors of two convex
/// polygons. Zero when they overlap or touch.
pub fn polygon_distance(a: &[Point2], b: &[Point2]) -> f64 {
    if convex_overlap(a, b) {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    let na = a.len();
    let nb = b.len();
    for i in 0..na {
        let a1 = a[i];
        let a2 = a[(i + 1) % na];
        for j in 0..nb {
            let b1 = b[j];
            let b2 = b[(j + 1) % nb];
            let d = segment_distance(a1, a2, b1, b2);
            if d < best {
                best = d;
            }
        }
    }
    best
}

/// Planar heading angle of the edge from `a` to `b`, in radians.
pub fn heading(a: Point2, b: Point2) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated_no_overlap() {
        let a = rect_corners(0.0, 0.0, 2.5, 1.25, 0.0);
        let b = rect_corners(10.0, 0.0, 2.5, 1.25, 0.0);
        assert!(!convex_overlap(&a, &b));
    }

    #[test]
    fn overlapping() {
        let a = rect_corners(0.0, 0.0, 2.5, 1.25, 0.0);
        let b = rect_corners(3.0, 0.0, 2.5, 1.25, 0.0);
        assert!(convex_overlap(&a, &b));
    }

    #[test]
    fn touching_no_overlap() {
        let a = rect_corners(0.0, 0.0, 2.5, 1.25, 0.0);
        let b = rect_corners(5.0, 0.0, 2.5, 1.25, 0.0);
        assert!(!convex_overlap(&a, &b));
    }

    #[test]
    fn rotated_same_center_overlap() {
        let a = rect_corners(0.0, 0.0, 2.5, 1.25, 0.0);
        let b = rect_corners(
            0.0,
            0.0,
            2.5,
            1.25,
            std::f64::consts::FRAC_PI_4,
        );
        assert!(convex_overlap(&a, &b));
    }

    #[test]
    fn disc_overlaps_rect() {
        let a = rect_corners(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = disc(1.5, 0.0, 1.0, 16);
        assert!(convex_overlap(&a, &b));
    }

    #[test]
    fn distance_between_separated_rects() {
        let a = rect_corners(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = rect_corners(5.0, 0.0, 1.0, 1.0, 0.0);
        let d = polygon_distance(&a, &b);
        assert!((d - 3.0).abs() < 1e-9);
    }

    #[test]
    fn distance_zero_when_overlapping() {
        let a = rect_corners(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = rect_corners(1.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(polygon_distance(&a, &b), 0.0);
    }

    #[test]
    fn shoelace_square() {
        let sq = rect_corners(0.0, 0.0, 2.0, 2.0, 0.0);
        assert!((signed_area(&sq) - 16.0).abs() < 1e-12);
        let mut cw = sq.to_vec();
        cw.reverse();
        assert!((signed_area(&cw) + 16.0).abs() < 1e-12);
    }

    #[test]
    fn point_in_square() {
        let sq = rect_corners(0.0, 0.0, 2.0, 2.0, 0.0);
        assert!(point_in_polygon(Point2::new(0.5, -0.5), &sq));
        assert!(!point_in_polygon(Point2::new(2.5, 0.0), &sq));
    }

    #[test]
    fn heading_of_axis_edges() {
        let h = heading(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        assert!(h.abs() < 1e-12);
        let v = heading(Point2::new(0.0, 0.0), Point2::new(0.0, 3.0));
        assert!((v - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
