//! Ego-relative to world coordinates
//!
//! Rotation follows the simulator convention: angles in degrees, yaw about
//! z, pitch about y, roll about x.

use contracts::{Rotation, Transform, Vector3};
use nalgebra::{Matrix4, Vector4};

/// Homogeneous matrix of a transform
pub fn transform_matrix(transform: &Transform) -> Matrix4<f64> {
    let Rotation { pitch, yaw, roll } = transform.rotation;
    let (sp, cp) = pitch.to_radians().sin_cos();
    let (sy, cy) = yaw.to_radians().sin_cos();
    let (sr, cr) = roll.to_radians().sin_cos();
    let Vector3 { x, y, z } = transform.location;

    Matrix4::new(
        cp * cy,
        cy * sp * sr - sy * cr,
        -(cy * sp * cr + sy * sr),
        x,
        sy * cp,
        sy * sp * sr + cy * cr,
        cy * sr - sy * sp * cr,
        y,
        sp,
        -(cp * sr),
        cp * cr,
        z,
        0.0,
        0.0,
        0.0,
        1.0,
    )
}

/// Transform decoded from a homogeneous matrix
pub fn from_matrix(matrix: &Matrix4<f64>) -> Transform {
    let pitch = matrix[(2, 0)].clamp(-1.0, 1.0).asin();
    let yaw = matrix[(1, 0)].atan2(matrix[(0, 0)]);
    let roll = (-matrix[(2, 1)]).atan2(matrix[(2, 2)]);

    Transform {
        location: Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]),
        rotation: Rotation {
            pitch: pitch.to_degrees(),
            yaw: yaw.to_degrees(),
            roll: roll.to_degrees(),
        },
    }
}

/// Express `local` (relative to `ego`) in world coordinates
pub fn to_world(ego: &Transform, local: &Transform) -> Transform {
    from_matrix(&(transform_matrix(ego) * transform_matrix(local)))
}

/// World coordinates of a local point
pub fn point_to_world(ego: &Transform, point: &Vector3) -> Vector3 {
    let world = transform_matrix(ego) * Vector4::new(point.x, point.y, point.z, 1.0);
    Vector3::new(world.x, world.y, world.z)
}
