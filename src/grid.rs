//! Occupancy grid with boundary contour tracing.
//!
//! Shared substrate for the two polygon boolean operations the
//! pipeline needs: the rectangle-merge union (exact, on a
//! coordinate-compressed lattice) and the free-space difference
//! (conservative, on a uniform lattice). Covered cells form the
//! region; `trace_boundaries` walks the covered/uncovered interface
//! into closed loops with the region on the left, so outer loops come
//! out counter-clockwise and holes clockwise.

use std::collections::HashMap;

use crate::geometry::{signed_area, Point2};

const COORD_EPS: f64 = 1e-9;

pub struct OccupancyGrid {
    /// Ascending x coordinates of cell edges (nx + 1 entries).
    xs: Vec<f64>,
    /// Ascending y coordinates of cell edges (ny + 1 entries).
    ys: Vec<f64>,
    /// Row-major cell coverage, index = j * nx + i.
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// Build a grid from explicit cell-edge coordinates, marking each
    /// cell covered when `fill` holds at its center.
    pub fn from_edges(
        mut xs: Vec<f64>,
        mut ys: Vec<f64>,
        fill: impl Fn(Point2) -> bool,
    ) -> Self {
        dedup_sorted(&mut xs);
        dedup_sorted(&mut ys);
        let nx = xs.len().saturating_sub(1);
        let ny = ys.len().saturating_sub(1);
        let mut cells = vec![false; nx * ny];
        for j in 0..ny {
            for i in 0..nx {
                let center = Point2::new(
                    (xs[i] + xs[i + 1]) / 2.0,
                    (ys[j] + ys[j + 1]) / 2.0,
                );
                cells[j * nx + i] = fill(center);
            }
        }
        OccupancyGrid { xs, ys, cells }
    }

    /// Build a uniform grid over [lo, hi] with the given cell size,
    /// marking each cell covered when `fill` holds for the whole cell
    /// (caller decides how conservative `fill` is).
    pub fn uniform(
        lo: Point2,
        hi: Point2,
        resolution: f64,
        fill: impl Fn(Point2, Point2) -> bool,
    ) -> Self {
        let nx = (((hi.x - lo.x) / resolution).ceil() as usize).max(1);
        let ny = (((hi.y - lo.y) / resolution).ceil() as usize).max(1);
        let xs: Vec<f64> =
            (0..=nx).map(|i| lo.x + i as f64 * resolution).collect();
        let ys: Vec<f64> =
            (0..=ny).map(|j| lo.y + j as f64 * resolution).collect();
        let mut cells = vec![false; nx * ny];
        for j in 0..ny {
            for i in 0..nx {
                let cell_lo = Point2::new(xs[i], ys[j]);
                let cell_hi = Point2::new(xs[i + 1], ys[j + 1]);
                cells[j * nx + i] = fill(cell_lo, cell_hi);
            }
        }
        OccupancyGrid { xs, ys, cells }
    }

    fn nx(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }

    fn ny(&self) -> usize {
        self.ys.len().saturating_sub(1)
    }

    fn covered(&self, i: isize, j: isize) -> bool {
        if i < 0 || j < 0 || i >= self.nx() as isize || j >= self.ny() as isize
        {
            return false;
        }
        self.cells[j as usize * self.nx() + i as usize]
    }

    /// Number of 4-connected covered components.
    pub fn covered_components(&self) -> usize {
        let nx = self.nx();
        let ny = self.ny();
        let mut seen = vec![false; nx * ny];
        let mut components = 0;
        let mut stack = Vec::new();
        for start in 0..nx * ny {
            if !self.cells[start] || seen[start] {
                continue;
            }
            components += 1;
            seen[start] = true;
            stack.push(start);
            while let Some(idx) = stack.pop() {
                let (i, j) = ((idx % nx) as isize, (idx / nx) as isize);
                for (di, dj) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (ni, nj) = (i + di, j + dj);
                    if self.covered(ni, nj) {
                        let nidx = nj as usize * nx + ni as usize;
                        if !seen[nidx] {
                            seen[nidx] = true;
                            stack.push(nidx);
                        }
                    }
                }
            }
        }
        components
    }

    /// Trace every covered/uncovered interface into closed loops with
    /// the covered region on the left. Collinear runs are collapsed.
    /// Outer loops wind counter-clockwise, holes clockwise.
    pub fn trace_boundaries(&self) -> Vec<Vec<Point2>> {
        // Directed lattice edges keyed by start node (i, j). Direction
        // encoding: 0 = +x, 1 = +y, 2 = -x, 3 = -y.
        let mut by_start: HashMap<(usize, usize), Vec<(usize, usize, u8)>> =
            HashMap::new();
        let mut edge_count = 0usize;
        for j in 0..self.ny() as isize {
            for i in 0..self.nx() as isize {
                if !self.covered(i, j) {
                    continue;
                }
                let (iu, ju) = (i as usize, j as usize);
                if !self.covered(i, j - 1) {
                    by_start.entry((iu, ju)).or_default().push((
                        iu + 1,
                        ju,
                        0,
                    ));
                    edge_count += 1;
                }
                if !self.covered(i + 1, j) {
                    by_start.entry((iu + 1, ju)).or_default().push((
                        iu + 1,
                        ju + 1,
                        1,
                    ));
                    edge_count += 1;
                }
                if !self.covered(i, j + 1) {
                    by_start.entry((iu + 1, ju + 1)).or_default().push((
                        iu,
                        ju + 1,
                        2,
                    ));
                    edge_count += 1;
                }
                if !self.covered(i - 1, j) {
                    by_start.entry((iu, ju + 1)).or_default().push((
                        iu,
                        ju,
                        3,
                    ));
                    edge_count += 1;
                }
            }
        }

        let mut loops = Vec::new();
        while edge_count > 0 {
            // Take an arbitrary remaining edge, deterministically: the
            // lexicographically smallest start node.
            let start = match by_start
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, _)| *k)
                .min()
            {
                Some(k) => k,
                None => break,
            };
            let mut path: Vec<((usize, usize), u8)> = Vec::new();
            let mut node = start;
            let mut dir: Option<u8> = None;
            loop {
                let candidates = match by_start.get_mut(&node) {
                    Some(v) if !v.is_empty() => v,
                    _ => break,
                };
                // At a pinch vertex two edges leave the node; take the
                // sharpest left turn so the covered region stays on
                // the left.
                let pick = match dir {
                    None => 0,
                    Some(d) => {
                        let mut best = 0;
                        let mut best_rank = u8::MAX;
                        for (idx, &(_, _, cand_dir)) in
                            candidates.iter().enumerate()
                        {
                            // rank 0 = left turn, 1 = straight,
                            // 2 = right turn, 3 = reverse.
                            let rank = (d + 5 - cand_dir) % 4;
                            if rank < best_rank {
                                best_rank = rank;
                                best = idx;
                            }
                        }
                        best
                    }
                };
                let (ni, nj, d) = candidates.swap_remove(pick);
                edge_count -= 1;
                path.push((node, d));
                node = (ni, nj);
                dir = Some(d);
                if node == start {
                    break;
                }
            }
            if path.len() < 4 {
                continue;
            }
            // Keep only vertices where the direction changes.
            let k = path.len();
            let mut vertices = Vec::new();
            for t in 0..k {
                let prev_dir = path[(t + k - 1) % k].1;
                let ((i, j), cur_dir) = path[t];
                if prev_dir != cur_dir {
                    vertices.push(Point2::new(self.xs[i], self.ys[j]));
                }
            }
            if vertices.len() >= 3 {
                loops.push(vertices);
            }
        }
        loops
    }

    /// Counter-clockwise loops only (outer boundaries; holes dropped),
    /// largest area first.
    pub fn outer_boundaries(&self) -> Vec<Vec<Point2>> {
        let mut outer: Vec<Vec<Point2>> = self
            .trace_boundaries()
            .into_iter()
            .filter(|v| signed_area(v) > 0.0)
            .collect();
        outer.sort_by(|a, b| {
            signed_area(b)
                .partial_cmp(&signed_area(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        outer
    }
}

fn dedup_sorted(coords: &mut Vec<f64>) {
    coords.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    coords.dedup_by(|a, b| (*a - *b).abs() < COORD_EPS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon_area;

    fn rect_fill(
        rects: Vec<(f64, f64, f64, f64)>,
    ) -> impl Fn(Point2) -> bool {
        move |p| {
            rects.iter().any(|&(x0, y0, x1, y1)| {
                p.x > x0 && p.x < x1 && p.y > y0 && p.y < y1
            })
        }
    }

    fn compressed(rects: &[(f64, f64, f64, f64)]) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for &(x0, y0, x1, y1) in rects {
            xs.push(x0);
            xs.push(x1);
            ys.push(y0);
            ys.push(y1);
        }
        (xs, ys)
    }

    #[test]
    fn single_rect_traces_to_square() {
        let rects = vec![(0.0, 0.0, 2.0, 1.0)];
        let (xs, ys) = compressed(&rects);
        let grid = OccupancyGrid::from_edges(xs, ys, rect_fill(rects));
        assert_eq!(grid.covered_components(), 1);
        let loops = grid.outer_boundaries();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert!((polygon_area(&loops[0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn overlapping_rects_union_area() {
        let rects = vec![(0.0, 0.0, 2.0, 2.0), (1.0, 1.0, 3.0, 3.0)];
        let (xs, ys) = compressed(&rects);
        let grid = OccupancyGrid::from_edges(xs, ys, rect_fill(rects));
        assert_eq!(grid.covered_components(), 1);
        let loops = grid.outer_boundaries();
        assert_eq!(loops.len(), 1);
        // 4 + 4 - 1 overlap
        assert!((polygon_area(&loops[0]) - 7.0).abs() < 1e-12);
        assert_eq!(loops[0].len(), 8);
    }

    #[test]
    fn disjoint_rects_two_components() {
        let rects = vec![(0.0, 0.0, 1.0, 1.0), (5.0, 5.0, 6.0, 6.0)];
        let (xs, ys) = compressed(&rects);
        let grid = OccupancyGrid::from_edges(xs, ys, rect_fill(rects));
        assert_eq!(grid.covered_components(), 2);
        assert_eq!(grid.outer_boundaries().len(), 2);
    }

    #[test]
    fn ring_produces_hole_loop() {
        // 3x3 of unit cells with the center empty.
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let ys = vec![0.0, 1.0, 2.0, 3.0];
        let grid = OccupancyGrid::from_edges(xs, ys, |p| {
            !(p.x > 1.0 && p.x < 2.0 && p.y > 1.0 && p.y < 2.0)
        });
        assert_eq!(grid.covered_components(), 1);
        let loops = grid.trace_boundaries();
        assert_eq!(loops.len(), 2);
        let outer = grid.outer_boundaries();
        assert_eq!(outer.len(), 1);
        assert!((polygon_area(&outer[0]) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn uniform_grid_covers_region() {
        let grid = OccupancyGrid::uniform(
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 4.0),
            0.5,
            |lo, hi| lo.x >= 1.0 && hi.x <= 3.0 && lo.y >= 1.0 && hi.y <= 3.0,
        );
        let loops = grid.outer_boundaries();
        assert_eq!(loops.len(), 1);
        assert!((polygon_area(&loops[0]) - 4.0).abs() < 1e-9);
    }
}
