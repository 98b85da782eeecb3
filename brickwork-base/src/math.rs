//! Mathematical utilities and decisions.

use euclid::{Angle, Point3D, Size3D, Transform3D, Vector3D, vec3};

mod aab;
pub use aab::*;
mod axis;
pub use axis::*;
mod color;
pub use color::*;
mod grid_aab;
pub use grid_aab::*;
mod transform;
pub use transform::*;
mod voxel;
pub use voxel::*;

// ------------------------------------------------------------------------------------------------

/// Coordinates that are locked to the voxel or brick grid.
pub type GridCoordinate = i32;

/// Positions that are locked to the voxel or brick grid.
pub type GridPoint = Point3D<GridCoordinate, euclid::UnknownUnit>;

/// Vectors that are locked to the voxel or brick grid.
pub type GridVector = Vector3D<GridCoordinate, euclid::UnknownUnit>;

/// Sizes of grid-aligned objects, such as the brick dimensions of a world.
pub type GridSize = Size3D<GridCoordinate, euclid::UnknownUnit>;

/// Coordinates that are not locked to the grid.
///
/// Single precision is enough for worlds that fit in a few thousand voxels per axis,
/// and it halves the size of the accumulation buffers.
pub type FreeCoordinate = f32;

/// Positions that are not locked to the grid.
pub type FreePoint = Point3D<FreeCoordinate, euclid::UnknownUnit>;

/// Vectors that are not locked to the grid.
pub type FreeVector = Vector3D<FreeCoordinate, euclid::UnknownUnit>;

/// Affine 4×4 transformation matrix, applied to row vectors as `euclid` does.
pub type Matrix = Transform3D<FreeCoordinate, euclid::UnknownUnit, euclid::UnknownUnit>;

/// Voxels per axis of one brick.
pub const BRICK_SIZE: GridCoordinate = 8;

/// Voxels in one brick.
pub const BRICK_VOLUME: usize = (BRICK_SIZE * BRICK_SIZE * BRICK_SIZE) as usize;

/// The default resolution of a world, in voxels per axis.
pub const WORLD_SIZE: GridCoordinate = 128;

/// Offset used to move secondary ray origins off the surface they start on.
pub const EPSILON: FreeCoordinate = 1e-4;

/// Ray distance meaning “nothing was hit”.
pub const MISS_DISTANCE: FreeCoordinate = 1e34;

// ------------------------------------------------------------------------------------------------

/// Linear interpolation; `t = 0` returns `a` and `t = 1` returns `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite interpolation between 0 and 1 as `x` goes from `edge0` to `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Mirrors `incident` about the plane with normal `normal`.
///
/// `normal` must be of unit length.
#[inline]
pub fn reflect(incident: FreeVector, normal: FreeVector) -> FreeVector {
    incident - normal * (2.0 * incident.dot(normal))
}

/// Bends `incident` through a surface with normal `normal`, where `eta` is the ratio of
/// the refractive index on the incident side to that on the far side.
///
/// If the ray undergoes total internal reflection, the reflected direction is returned.
/// Both vectors must be of unit length.
#[inline]
pub fn refract(incident: FreeVector, normal: FreeVector, eta: f32) -> FreeVector {
    let cos_i = -incident.dot(normal);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t > 1.0 {
        return reflect(incident, normal);
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    incident * eta + normal * (eta * cos_i - cos_t)
}

/// Rotation by Euler angles in radians, applied to a point about Z first, then Y, then X.
#[inline]
pub fn rotation_matrix(angles: FreeVector) -> Matrix {
    Matrix::rotation(0.0, 0.0, 1.0, Angle::radians(angles.z))
        .then_rotate(0.0, 1.0, 0.0, Angle::radians(angles.y))
        .then_rotate(1.0, 0.0, 0.0, Angle::radians(angles.x))
}

/// Applies an affine matrix to a point.
///
/// Unlike [`Transform3D::transform_point3d`], this ignores the projective column and
/// therefore cannot fail.
#[inline]
pub fn transform_point(matrix: &Matrix, point: FreePoint) -> FreePoint {
    (matrix.transform_vector3d(point.to_vector()) + vec3(matrix.m41, matrix.m42, matrix.m43))
        .to_point()
}

/// Applies the linear part of a matrix to a direction, without translation or
/// renormalization.
#[inline]
pub fn transform_vector(matrix: &Matrix, vector: FreeVector) -> FreeVector {
    matrix.transform_vector3d(vector)
}
