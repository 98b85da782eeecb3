//! Placement of a voxel world's unit cube in the scene.

use euclid::vec3;

use crate::math::{
    FreeCoordinate, FreePoint, FreeVector, Matrix, rotation_matrix, transform_point,
    transform_vector,
};
use crate::raycast::Ray;

/// Position, orientation, and size of a voxel world, from which its transformation
/// matrices are derived.
///
/// The world's local space is the unit cube `[0, 1]³`. The forward transform scales
/// the cube about its center, rotates it about its center (Z first, then Y, then X),
/// and then moves it so that, before rotation, its most negative corner would be at
/// `position`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_structs)]
pub struct TransformParameters {
    /// Translation in world units.
    pub position: FreeVector,
    /// Euler angles in radians.
    pub rotation: FreeVector,
    /// Size of the world along each local axis, in world units.
    pub scale: FreeVector,
}

impl Default for TransformParameters {
    #[inline]
    fn default() -> Self {
        Self {
            position: FreeVector::zero(),
            rotation: FreeVector::zero(),
            scale: FreeVector::splat(1.0),
        }
    }
}

impl TransformParameters {
    /// Computes the local-to-world matrix. This is always computed from scratch, never
    /// by accumulating changes, so that repeated edits cannot drift.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn forward_matrix(&self) -> Matrix {
        let center = vec3(0.5, 0.5, 0.5);
        let scaled_center = center.component_mul(self.scale);
        Matrix::translation(-center.x, -center.y, -center.z)
            .then_scale(self.scale.x, self.scale.y, self.scale.z)
            .then(&rotation_matrix(self.rotation))
            .then_translate(scaled_center + self.position)
    }
}

/// A world's forward and inverse transformation matrices, which are always derived
/// together from the same [`TransformParameters`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    parameters: TransformParameters,
    forward: Matrix,
    inverse: Matrix,
}

impl WorldTransform {
    /// Computes the matrices for the given parameters.
    ///
    /// Returns an error if the transform is not invertible, as happens when any scale
    /// component is zero.
    ///
    /// ```
    /// use brickwork_base::euclid::vec3;
    /// use brickwork_base::math::{TransformParameters, WorldTransform};
    ///
    /// let ok = WorldTransform::new(TransformParameters::default());
    /// assert!(ok.is_ok());
    ///
    /// let flat = WorldTransform::new(TransformParameters {
    ///     scale: vec3(1.0, 0.0, 1.0),
    ///     ..TransformParameters::default()
    /// });
    /// assert!(flat.is_err());
    /// ```
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(parameters: TransformParameters) -> Result<Self, TransformError> {
        let forward = parameters.forward_matrix();
        let inverse = forward
            .inverse()
            .filter(|m| m.to_array().iter().all(|c| c.is_finite()))
            .ok_or(TransformError { parameters })?;
        Ok(Self {
            parameters,
            forward,
            inverse,
        })
    }

    /// Returns the parameters these matrices were computed from.
    #[inline]
    pub fn parameters(&self) -> TransformParameters {
        self.parameters
    }

    /// Local-to-world matrix.
    #[inline]
    pub fn forward(&self) -> &Matrix {
        &self.forward
    }

    /// World-to-local matrix.
    #[inline]
    pub fn inverse(&self) -> &Matrix {
        &self.inverse
    }

    /// Maps a point in the unit cube's space to world space.
    #[inline]
    pub fn local_to_world(&self, point: FreePoint) -> FreePoint {
        transform_point(&self.forward, point)
    }

    /// Maps a world-space point to the unit cube's space.
    #[inline]
    pub fn world_to_local(&self, point: FreePoint) -> FreePoint {
        transform_point(&self.inverse, point)
    }

    /// Maps a local direction to world space, without renormalizing it.
    #[inline]
    pub fn local_to_world_vector(&self, vector: FreeVector) -> FreeVector {
        transform_vector(&self.forward, vector)
    }

    /// Maps a world-space ray into local space.
    ///
    /// The direction is not renormalized, so distances along the local ray are the same
    /// multiples of the direction as along the world ray.
    #[inline]
    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        Ray {
            origin: self.world_to_local(ray.origin),
            direction: transform_vector(&self.inverse, ray.direction),
        }
    }

    /// Returns the eight world-space corners of the unit cube, in the order
    /// `(0,0,0), (1,0,0), (0,1,0), (1,1,0), (0,0,1), (1,0,1), (0,1,1), (1,1,1)`.
    #[inline]
    pub fn corners(&self) -> [FreePoint; 8] {
        crate::math::Aab::UNIT
            .corner_points()
            .map(|p| self.local_to_world(p))
    }
}

impl Default for WorldTransform {
    #[inline]
    fn default() -> Self {
        let parameters = TransformParameters::default();
        let forward = parameters.forward_matrix();
        Self {
            parameters,
            forward,
            inverse: forward.inverse().unwrap_or(Matrix::identity()),
        }
    }
}

/// Error returned when a world's transform parameters do not produce an invertible matrix.
#[derive(Clone, Copy, Debug, displaydoc::Display, PartialEq)]
#[displaydoc("world transform is not invertible: {parameters:?}")]
pub struct TransformError {
    parameters: TransformParameters,
}

impl core::error::Error for TransformError {}

/// Returns whether two points are within `tolerance` of each other.
#[doc(hidden)]
#[inline]
pub fn points_approx_eq(a: FreePoint, b: FreePoint, tolerance: FreeCoordinate) -> bool {
    (a - b).length() <= tolerance
}
