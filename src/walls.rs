//! Wall extrusion along the boundary polygon.
//!
//! Each boundary edge becomes one rectangular prism: long axis along
//! the edge, width = thickness, yaw = edge heading. The prism is
//! shifted half a thickness toward the interior (the boundary polygon
//! is counter-clockwise, so the interior is on the left of each edge)
//! and extended by one thickness so adjacent walls seal the corners.

use serde::{Deserialize, Serialize};

use crate::geometry::{heading, rect_corners, Footprint, Point2};
use crate::types::Pose;

/// One wall prism derived from a boundary edge. Regenerated whenever
/// the boundary changes; owns nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSegment {
    pub start: Point2,
    pub end: Point2,
    pub thickness: f64,
    pub height: f64,
}

impl WallSegment {
    pub fn length(&self) -> f64 {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading angle of the edge, start to end, in radians.
    pub fn yaw(&self) -> f64 {
        heading(self.start, self.end)
    }

    fn center(&self) -> Point2 {
        let yaw = self.yaw();
        // Interior-side normal of a CCW edge is its left normal.
        let (nx, ny) = (-yaw.sin(), yaw.cos());
        Point2::new(
            (self.start.x + self.end.x) / 2.0 + nx * self.thickness / 2.0,
            (self.start.y + self.end.y) / 2.0 + ny * self.thickness / 2.0,
        )
    }

    /// Pose of the prism center relative to the walls model frame.
    pub fn pose(&self) -> Pose {
        let c = self.center();
        Pose {
            x: c.x,
            y: c.y,
            z: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: self.yaw(),
        }
    }

    /// Projected 2D footprint of the prism, owned by `owner`.
    pub fn footprint(&self, owner: &str) -> Footprint {
        let c = self.center();
        let corners = rect_corners(
            c.x,
            c.y,
            (self.length() + self.thickness) / 2.0,
            self.thickness / 2.0,
            self.yaw(),
        );
        Footprint::new(owner, corners.to_vec())
    }
}

/// Build one wall segment per edge of the (outer-loop only) boundary
/// polygon. Walls are always raised along the boundary and nowhere
/// else; interior partitions are out of scope by convention.
/// Zero-length edges were eliminated by boundary synthesis.
pub fn extrude(
    polygon: &[Point2],
    thickness: f64,
    height: f64,
) -> Vec<WallSegment> {
    let n = polygon.len();
    let mut walls = Vec::with_capacity(n);
    for i in 0..n {
        walls.push(WallSegment {
            start: polygon[i],
            end: polygon[(i + 1) % n],
            thickness,
            height,
        });
    }
    walls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point_in_polygon;

    fn unit_square(half: f64) -> Vec<Point2> {
        vec![
            Point2::new(-half, -half),
            Point2::new(half, -half),
            Point2::new(half, half),
            Point2::new(-half, half),
        ]
    }

    #[test]
    fn one_wall_per_edge() {
        let walls = extrude(&unit_square(5.0), 0.1, 2.0);
        assert_eq!(walls.len(), 4);
        for w in &walls {
            assert!((w.length() - 10.0).abs() < 1e-12);
            assert_eq!(w.height, 2.0);
        }
    }

    #[test]
    fn walls_sit_inside_ccw_boundary() {
        let square = unit_square(5.0);
        let walls = extrude(&square, 0.2, 2.0);
        for w in &walls {
            for corner in &w.footprint("walls").points {
                // Wall footprints hug the boundary from the inside;
                // corner extensions may poke past adjacent edges but
                // never outward beyond the boundary box.
                assert!(corner.x >= -5.2 - 1e-9 && corner.x <= 5.2 + 1e-9);
                assert!(corner.y >= -5.2 - 1e-9 && corner.y <= 5.2 + 1e-9);
            }
            let c = Point2::new(
                (w.footprint("walls").points[0].x
                    + w.footprint("walls").points[2].x)
                    / 2.0,
                (w.footprint("walls").points[0].y
                    + w.footprint("walls").points[2].y)
                    / 2.0,
            );
            assert!(point_in_polygon(c, &square), "wall center outside room");
        }
    }

    #[test]
    fn heading_follows_edge() {
        let walls = extrude(&unit_square(1.0), 0.1, 1.0);
        let expected = [
            0.0,
            std::f64::consts::FRAC_PI_2,
            std::f64::consts::PI,
            -std::f64::consts::FRAC_PI_2,
        ];
        for (w, exp) in walls.iter().zip(expected) {
            let diff = (w.yaw() - exp).abs();
            assert!(diff < 1e-12 || (diff - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        }
    }
}
