use crate::math::{FreeCoordinate, FreePoint, FreeVector};

use super::Raycaster;

/// A ray; a half-infinite line segment.
///
/// The direction is not required to be of unit length. Distances along a ray, `t`, are
/// measured in multiples of the direction vector, so transforming a ray into another
/// coordinate system without renormalizing keeps `t` values comparable between systems.
#[allow(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// The sole endpoint of the ray.
    pub origin: FreePoint,

    /// The direction in which the ray extends infinitely.
    pub direction: FreeVector,
}

impl Ray {
    /// Constructs a [`Ray`] from convertible types (e.g. tuples or 3-element arrays).
    /// Other than the use of [`Into`], this is equivalent to a struct literal.
    ///
    /// ```
    /// use brickwork_base::euclid::{point3, vec3};
    /// use brickwork_base::raycast::Ray;
    ///
    /// assert_eq!(
    ///     Ray::new([1., 2., 3.], [4., 5., 6.]),
    ///     Ray {
    ///         origin: point3(1., 2., 3.),
    ///         direction: vec3(4., 5., 6.),
    ///     }
    /// );
    /// ```
    #[allow(clippy::missing_inline_in_public_items)] // is generic already
    pub fn new(origin: impl Into<FreePoint>, direction: impl Into<FreeVector>) -> Self {
        Self {
            origin: origin.into(),
            direction: direction.into(),
        }
    }

    /// Prepares a [`Raycaster`] that will iterate over unit cells intersected by this ray.
    #[must_use]
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn cast(&self) -> Raycaster {
        Raycaster::new(self.origin, self.direction)
    }

    /// Returns the point at distance `t` along the ray, `origin + direction * t`.
    #[inline]
    pub fn at(&self, t: FreeCoordinate) -> FreePoint {
        self.origin + self.direction * t
    }

    /// Returns the ray starting at [`Self::at(t)`](Self::at) with the same direction.
    #[must_use]
    #[inline]
    pub fn advance(self, t: FreeCoordinate) -> Self {
        Self {
            origin: self.at(t),
            direction: self.direction,
        }
    }

    /// Multiplies both origin and direction componentwise by `scale`.
    ///
    /// Points along the scaled ray have the same `t` as the corresponding points along
    /// the original ray.
    #[must_use]
    #[inline]
    pub fn scale_components(self, scale: FreeVector) -> Self {
        Self {
            origin: self.origin.to_vector().component_mul(scale).to_point(),
            direction: self.direction.component_mul(scale),
        }
    }

    /// Moves the origin by `offset`.
    #[must_use]
    #[inline]
    pub fn translate(self, offset: FreeVector) -> Self {
        Self {
            origin: self.origin + offset,
            ..self
        }
    }

    /// Returns the componentwise reciprocal of the direction, with infinities on axes
    /// to which the ray is perpendicular.
    #[inline]
    pub fn reciprocal_direction(&self) -> FreeVector {
        self.direction.map(FreeCoordinate::recip)
    }
}
