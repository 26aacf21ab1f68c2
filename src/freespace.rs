//! Free-space computation: boundary minus obstacles.
//!
//! Evaluates `union(boundary) - union(obstacles not ignored)` on a
//! uniform occupancy grid and traces the result into zero or more
//! disjoint polygons. The evaluation is conservative: a cell counts as
//! free only when its corners and center are inside the boundary and
//! its rectangle clears every active obstacle footprint (obstacle
//! footprints are convex). Accuracy is bounded by the cell size; the
//! computation is deterministic, so identical inputs yield identical
//! output.

use std::collections::HashSet;

use crate::geometry::{
    bounds, convex_overlap, point_in_polygon, Footprint, Point2,
};
use crate::grid::OccupancyGrid;

/// Default grid cell size in meters.
pub const DEFAULT_RESOLUTION: f64 = 0.1;

/// Polygons of unobstructed floor area, largest first. Obstacles whose
/// owner is in `ignore` are skipped. Free space is static for one
/// placement session: obstacles placed afterwards are not subtracted
/// unless this is called again.
pub fn free_space(
    boundary: &[Footprint],
    obstacles: &[Footprint],
    ignore: &HashSet<String>,
    resolution: f64,
) -> Vec<Vec<Point2>> {
    let all_points: Vec<Point2> = boundary
        .iter()
        .flat_map(|f| f.points.iter().copied())
        .collect();
    if all_points.len() < 3 {
        return Vec::new();
    }
    let (lo, hi) = bounds(&all_points);
    let active: Vec<&Footprint> = obstacles
        .iter()
        .filter(|f| !ignore.contains(&f.owner))
        .collect();
    tracing::debug!(
        obstacles = active.len(),
        ignored = obstacles.len() - active.len(),
        "computing free space"
    );

    let grid = OccupancyGrid::uniform(lo, hi, resolution, |cell_lo, cell_hi| {
        let samples = [
            cell_lo,
            Point2::new(cell_hi.x, cell_lo.y),
            cell_hi,
            Point2::new(cell_lo.x, cell_hi.y),
            Point2::new(
                (cell_lo.x + cell_hi.x) / 2.0,
                (cell_lo.y + cell_hi.y) / 2.0,
            ),
        ];
        let inside_boundary = samples.iter().all(|&p| {
            boundary.iter().any(|b| point_in_polygon(p, &b.points))
        });
        if !inside_boundary {
            return false;
        }
        let cell = [
            cell_lo,
            Point2::new(cell_hi.x, cell_lo.y),
            cell_hi,
            Point2::new(cell_lo.x, cell_hi.y),
        ];
        !active.iter().any(|o| convex_overlap(&cell, &o.points))
    });
    grid.outer_boundaries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{polygon_area, rect_corners};

    fn square_boundary(half: f64) -> Vec<Footprint> {
        vec![Footprint::new(
            "room",
            rect_corners(0.0, 0.0, half, half, 0.0).to_vec(),
        )]
    }

    #[test]
    fn empty_obstacles_keeps_interior() {
        let free = free_space(
            &square_boundary(5.0),
            &[],
            &HashSet::new(),
            DEFAULT_RESOLUTION,
        );
        assert_eq!(free.len(), 1);
        let area = polygon_area(&free[0]);
        assert!(area > 95.0 && area <= 100.0 + 1e-9, "area {area}");
    }

    #[test]
    fn obstacle_splits_floor() {
        // Full-width vertical bar through the middle of the room.
        let bar = Footprint::new(
            "divider",
            rect_corners(0.0, 0.0, 0.5, 6.0, 0.0).to_vec(),
        );
        let free = free_space(
            &square_boundary(5.0),
            &[bar],
            &HashSet::new(),
            DEFAULT_RESOLUTION,
        );
        assert_eq!(free.len(), 2);
        for poly in &free {
            let area = polygon_area(poly);
            assert!(area > 40.0 && area < 46.0, "area {area}");
        }
    }

    #[test]
    fn ignored_obstacle_not_subtracted() {
        let bar = Footprint::new(
            "divider",
            rect_corners(0.0, 0.0, 0.5, 6.0, 0.0).to_vec(),
        );
        let ignore: HashSet<String> =
            ["divider".to_string()].into_iter().collect();
        let free = free_space(
            &square_boundary(5.0),
            &[bar],
            &ignore,
            DEFAULT_RESOLUTION,
        );
        assert_eq!(free.len(), 1);
        assert!(polygon_area(&free[0]) > 95.0);
    }

    #[test]
    fn identical_inputs_identical_output() {
        let bar = Footprint::new(
            "divider",
            rect_corners(2.0, 0.0, 0.4, 2.0, 0.3).to_vec(),
        );
        let a = free_space(
            &square_boundary(5.0),
            std::slice::from_ref(&bar),
            &HashSet::new(),
            DEFAULT_RESOLUTION,
        );
        let b = free_space(
            &square_boundary(5.0),
            std::slice::from_ref(&bar),
            &HashSet::new(),
            DEFAULT_RESOLUTION,
        );
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.len(), pb.len());
            for (va, vb) in pa.iter().zip(pb) {
                assert_eq!(va.x, vb.x);
                assert_eq!(va.y, vb.y);
            }
        }
    }

    #[test]
    fn no_boundary_no_free_space() {
        let free =
            free_space(&[], &[], &HashSet::new(), DEFAULT_RESOLUTION);
        assert!(free.is_empty());
    }
}
