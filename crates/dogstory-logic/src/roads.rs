//! Road network and movement clamping.
//!
//! Algorithm: "clamp then hop"
//! 1. Round the current position to its road-grid cell
//! 2. Look up every road rectangle registered at that cell
//! 3. If the target lies inside one of them, the move is free, return target
//! 4. Otherwise hop to the nearest boundary point (of those rectangles) in
//!    the direction of the target and repeat from the new cell
//! 5. Stop when the position no longer changes (dead end)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{GridPoint, Point2D};

/// Half-width of every road: the drivable area extends this far on each side
/// of the centre line and past both ends.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Upper bound on boundary hops for a single move. Exceeding it means the road
/// graph is malformed.
pub const MAX_CLAMP_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoadError {
    #[error("movement clamp exceeded {iterations} iterations, road graph is malformed")]
    ClampIterationLimit { iterations: usize },
}

/// Axis-aligned road segment between two grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    start: GridPoint,
    end: GridPoint,
}

impl Road {
    pub fn horizontal(start: GridPoint, end_x: i32) -> Self {
        Self {
            start,
            end: GridPoint::new(end_x, start.y),
        }
    }

    pub fn vertical(start: GridPoint, end_y: i32) -> Self {
        Self {
            start,
            end: GridPoint::new(start.x, end_y),
        }
    }

    pub fn start(&self) -> GridPoint {
        self.start
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    /// Point on the centre line, `t = 0` at start and `t = 1` at end.
    pub fn point_at(&self, t: f64) -> Point2D {
        let start = Point2D::from(self.start);
        let end = Point2D::from(self.end);
        start + (end - start) * t.clamp(0.0, 1.0)
    }

    /// Bounding rectangle of the road inflated by `offset` on every side.
    pub fn rect(&self, offset: f64) -> RoadRect {
        RoadRect {
            x0: f64::from(self.start.x.min(self.end.x)) - offset,
            x1: f64::from(self.start.x.max(self.end.x)) + offset,
            y0: f64::from(self.start.y.min(self.end.y)) - offset,
            y1: f64::from(self.start.y.max(self.end.y)) + offset,
        }
    }

    /// Every integer grid cell along the centre line, ends included.
    fn cells(&self) -> Vec<GridPoint> {
        let (x_lo, x_hi) = (self.start.x.min(self.end.x), self.start.x.max(self.end.x));
        let (y_lo, y_hi) = (self.start.y.min(self.end.y), self.start.y.max(self.end.y));
        if self.is_horizontal() {
            (x_lo..=x_hi).map(|x| GridPoint::new(x, self.start.y)).collect()
        } else {
            (y_lo..=y_hi).map(|y| GridPoint::new(self.start.x, y)).collect()
        }
    }
}

/// Drivable rectangle of a single road.
///
/// ```text
///    |  ______________
/// y1 | |              |
///    | |              |
/// y0 | |______________|
///    |____________________
///     x0             x1
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadRect {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl RoadRect {
    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Nearest point on this rectangle's boundary toward `target`, when the
    /// target lies beyond one side within the opposite axis' span.
    ///
    /// Returns the candidate and its distance to the target.
    fn boundary_toward(&self, target: &Point2D) -> Option<(Point2D, f64)> {
        let mut best: Option<(Point2D, f64)> = None;
        let mut offer = |p: Point2D, d: f64| {
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((p, d));
            }
        };

        if target.x >= self.x0 && target.x <= self.x1 {
            if target.y <= self.y0 {
                offer(Point2D::new(target.x, self.y0), self.y0 - target.y);
            }
            if target.y >= self.y1 {
                offer(Point2D::new(target.x, self.y1), target.y - self.y1);
            }
        }
        if target.y >= self.y0 && target.y <= self.y1 {
            if target.x <= self.x0 {
                offer(Point2D::new(self.x0, target.y), self.x0 - target.x);
            }
            if target.x >= self.x1 {
                offer(Point2D::new(self.x1, target.y), target.x - self.x1);
            }
        }
        best
    }
}

/// Static per-map index of road rectangles by grid cell.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    roads: Vec<Road>,
    rects: Vec<RoadRect>,
    /// cell → indices into `roads`/`rects` of every road passing through it
    cells: HashMap<GridPoint, Vec<usize>>,
}

impl RoadNetwork {
    pub fn new(roads: Vec<Road>, offset: f64) -> Self {
        let rects = roads.iter().map(|r| r.rect(offset)).collect();
        let mut cells: HashMap<GridPoint, Vec<usize>> = HashMap::new();
        for (idx, road) in roads.iter().enumerate() {
            for cell in road.cells() {
                cells.entry(cell).or_default().push(idx);
            }
        }
        Self {
            roads,
            rects,
            cells,
        }
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    /// Indices of roads registered at `cell`.
    pub fn roads_at(&self, cell: GridPoint) -> &[usize] {
        self.cells.get(&cell).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether `p` lies on the drivable surface.
    pub fn contains(&self, p: &Point2D) -> bool {
        self.cell_contains(p.to_grid(), p)
    }

    fn cell_contains(&self, cell: GridPoint, p: &Point2D) -> bool {
        self.roads_at(cell).iter().any(|&i| self.rects[i].contains(p))
    }

    fn nearest_boundary(&self, cell: GridPoint, target: &Point2D) -> Option<Point2D> {
        self.roads_at(cell)
            .iter()
            .filter_map(|&i| self.rects[i].boundary_toward(target))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }

    /// Slide from `start` (on a road) toward `end` without leaving the union
    /// of road rectangles. Returns `end` when reachable, otherwise the farthest
    /// reachable boundary point.
    pub fn clamp_move(&self, start: Point2D, end: Point2D) -> Result<Point2D, RoadError> {
        if start == end {
            return Ok(end);
        }
        let mut current = start;
        for _ in 0..MAX_CLAMP_ITERATIONS {
            let cell = current.to_grid();
            if self.cell_contains(cell, &end) {
                return Ok(end);
            }
            let next = self.nearest_boundary(cell, &end).unwrap_or(current);
            if next == current {
                return Ok(current);
            }
            current = next;
        }
        Err(RoadError::ClampIterationLimit {
            iterations: MAX_CLAMP_ITERATIONS,
        })
    }
}
