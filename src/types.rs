use serde::{Deserialize, Serialize};

use crate::landmarks::MIRROR_PAIRS;

/// A 2D point with floating-point coordinates.
///
/// Deserializes from `{"x": .., "y": ..}`, `[x, y]` or `[x, y, z]`; depth is
/// dropped because every measurement here is planar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointRepr")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Xyz([f32; 3]),
    Xy([f32; 2]),
    Object { x: f32, y: f32 },
}

impl From<PointRepr> for Point {
    fn from(repr: PointRepr) -> Self {
        match repr {
            PointRepr::Xyz([x, y, _]) | PointRepr::Xy([x, y]) | PointRepr::Object { x, y } => {
                Point::new(x, y)
            }
        }
    }
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Distance after stretching normalized coordinates to a `width` x `height`
    /// frame, for measurements in display pixels.
    pub fn scaled_distance(&self, other: &Point, width: f32, height: f32) -> f32 {
        let dx = (self.x - other.x) * width;
        let dy = (self.y - other.y) * height;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// One frame of face-mesh landmarks in normalized image space.
///
/// Index meaning follows the MediaPipe 468/478-point topology (see
/// [`crate::landmarks`]). Classification never mutates a set; the
/// transforming helpers return new sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build from detector output carrying a depth channel.
    pub fn from_xyz(points: &[[f32; 3]]) -> Self {
        Self {
            points: points.iter().map(|p| Point::new(p[0], p[1])).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get(&self, idx: usize) -> Option<&Point> {
        self.points.get(idx)
    }

    /// Uniformly scale every point about `origin`.
    pub fn scaled(&self, origin: Point, factor: f32) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| origin + (*p - origin) * factor)
                .collect(),
        }
    }

    /// Horizontal mirror image: x becomes 1 - x and every left/right landmark
    /// pair read by this crate swaps roles, so index meaning is preserved.
    pub fn mirrored(&self) -> Self {
        let mut points: Vec<Point> = self
            .points
            .iter()
            .map(|p| Point::new(1.0 - p.x, p.y))
            .collect();
        for &(a, b) in MIRROR_PAIRS {
            if a < points.len() && b < points.len() {
                points.swap(a, b);
            }
        }
        Self { points }
    }
}

impl std::ops::Index<usize> for LandmarkSet {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl From<Vec<Point>> for LandmarkSet {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}
