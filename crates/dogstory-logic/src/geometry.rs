//! 2-D geometry primitives shared by the road network, collision detector and
//! the simulation state.

use serde::{Deserialize, Serialize};

/// Continuous position on the map.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Self) -> f64 {
        (*other - *self).length_squared()
    }

    /// Integer road-grid cell containing this point (nearest integer on each axis).
    pub fn to_grid(&self) -> GridPoint {
        GridPoint {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }
}

/// Displacement between two points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2D {
    pub x: f64,
    pub y: f64,
}

impl Vec2D {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Velocity in map units per second.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Speed2D {
    pub x: f64,
    pub y: f64,
}

impl Speed2D {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Displacement covered in `seconds` at this speed.
    pub fn displacement(&self, seconds: f64) -> Vec2D {
        Vec2D::new(self.x * seconds, self.y * seconds)
    }
}

/// Integer cell of the road grid. Roads start and end on grid points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<GridPoint> for Point2D {
    fn from(p: GridPoint) -> Self {
        Point2D::new(f64::from(p.x), f64::from(p.y))
    }
}

impl std::ops::Add<Vec2D> for Point2D {
    type Output = Point2D;
    fn add(self, v: Vec2D) -> Point2D {
        Point2D::new(self.x + v.x, self.y + v.y)
    }
}

impl std::ops::Sub for Point2D {
    type Output = Vec2D;
    fn sub(self, other: Point2D) -> Vec2D {
        Vec2D::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Mul<f64> for Vec2D {
    type Output = Vec2D;
    fn mul(self, scalar: f64) -> Vec2D {
        Vec2D::new(self.x * scalar, self.y * scalar)
    }
}
