//! Geometry primitives exchanged with model collaborators.

use serde::{Deserialize, Serialize};

/// 3D vector (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 2D point, altitude dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance
    #[inline]
    pub fn squared_distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Manhattan (L1) distance
    #[inline]
    pub fn manhattan_distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<Vector3> for Point2 {
    fn from(v: Vector3) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Rotation in degrees (simulator convention)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z), meters
    pub location: Vector3,

    /// Rotation (pitch, yaw, roll), degrees
    pub rotation: Rotation,
}

impl Transform {
    /// Pure translation
    pub const fn from_location(location: Vector3) -> Self {
        Self {
            location,
            rotation: Rotation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
        }
    }
}

/// Ego-vehicle pose at one timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World transform of the ego vehicle
    pub transform: Transform,

    /// Forward speed (m/s)
    pub forward_speed: f64,
}

/// Axis-aligned 2D bounding box (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox2D {
    pub const fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Box area; degenerate boxes have zero area
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min).max(0.0) * (self.y_max - self.y_min).max(0.0)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox2D) -> f64 {
        let width = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let height = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Overlap fraction between two entities, in `[0, 1]`
pub trait Overlap {
    fn overlap(&self, other: &Self) -> f64;
}

impl Overlap for BoundingBox2D {
    fn overlap(&self, other: &Self) -> f64 {
        self.iou(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_is_one() {
        let bbox = BoundingBox2D::new(10.0, 10.0, 30.0, 50.0);
        assert_eq!(bbox.iou(&bbox), 1.0);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = BoundingBox2D::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox2D::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox2D::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox2D::new(5.0, 0.0, 15.0, 10.0);
        // 50 / 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_distances() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(4.0, -2.0);
        assert_eq!(a.squared_distance(&b), 25.0);
        assert_eq!(a.manhattan_distance(&b), 7.0);
    }

    #[test]
    fn test_point_drops_altitude() {
        let p = Point2::from(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point2::new(1.0, 2.0));
    }
}
