use core::fmt;

use euclid::point3;

use crate::math::{Axis, FreeCoordinate, FreePoint, FreeVector};
use crate::raycast::Ray;

/// Axis-Aligned Box data type, with continuous coordinates.
#[derive(Copy, Clone, PartialEq)]
pub struct Aab {
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// The unit cube `[0, 1]³`, which is the local space of every voxel world.
    pub const UNIT: Aab = Aab {
        lower_bounds: point3(0., 0., 0.),
        upper_bounds: point3(1., 1., 1.),
    };

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<FreePoint>,
        upper_bounds: impl Into<FreePoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        assert!(
            lower_bounds.x <= upper_bounds.x
                && lower_bounds.y <= upper_bounds.y
                && lower_bounds.z <= upper_bounds.z,
            "invalid AAB points that are misordered or NaN: \
            lower {lower_bounds:?} upper {upper_bounds:?}"
        );
        Self {
            lower_bounds,
            upper_bounds,
        }
    }

    /// Constructs the cube with the given center and edge length.
    #[inline]
    #[track_caller]
    pub fn from_center_size(center: FreePoint, size: FreeCoordinate) -> Self {
        let half = FreeVector::splat(size * 0.5);
        Self::from_lower_upper(center - half, center + half)
    }

    /// The most negative corner of the box.
    #[inline]
    pub const fn lower_bounds(&self) -> FreePoint {
        self.lower_bounds
    }

    /// The most positive corner of the box.
    #[inline]
    pub const fn upper_bounds(&self) -> FreePoint {
        self.upper_bounds
    }

    /// The center of the enclosed volume.
    #[inline]
    pub fn center(&self) -> FreePoint {
        self.lower_bounds.lerp(self.upper_bounds, 0.5)
    }

    /// Iterates over the eight corner points of the box.
    ///
    /// The order is X fastest, then Y, then Z:
    /// `(0,0,0), (1,0,0), (0,1,0), (1,1,0), (0,0,1), (1,0,1), (0,1,1), (1,1,1)`.
    #[inline]
    pub fn corner_points(self) -> [FreePoint; 8] {
        let l = self.lower_bounds;
        let u = self.upper_bounds;
        core::array::from_fn(|i| {
            point3(
                if i & 1 == 0 { l.x } else { u.x },
                if i & 2 == 0 { l.y } else { u.y },
                if i & 4 == 0 { l.z } else { u.z },
            )
        })
    }

    /// Returns whether this AAB, including the boundary, contains the point.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        for axis in Axis::ALL {
            if !(self.lower_bounds[axis] <= point[axis] && point[axis] <= self.upper_bounds[axis]) {
                return false;
            }
        }
        true
    }

    /// Slab test: returns the distance along `ray` (in multiples of its direction vector)
    /// at which it enters this box, or [`None`] if it never does.
    ///
    /// If the ray's origin is inside the box, the result is `Some(0.0)`.
    ///
    /// ```
    /// # use brickwork_base::math::Aab;
    /// # use brickwork_base::raycast::Ray;
    /// let ray = Ray::new([-1.0, 0.5, 0.5], [1.0, 0.0, 0.0]);
    /// assert_eq!(Aab::UNIT.intersect_ray(&ray), Some(1.0));
    /// let away = Ray::new([-1.0, 0.5, 0.5], [-1.0, 0.0, 0.0]);
    /// assert_eq!(Aab::UNIT.intersect_ray(&away), None);
    /// ```
    #[inline]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<FreeCoordinate> {
        let (t_enter, t_exit) = self.ray_span(ray)?;
        Some(t_enter.max(0.0)).filter(|_| t_exit >= 0.0)
    }

    /// Returns the entry and exit distances of the infinite line through `ray`,
    /// if it intersects the box at all.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn ray_span(&self, ray: &Ray) -> Option<(FreeCoordinate, FreeCoordinate)> {
        let mut t_enter = FreeCoordinate::NEG_INFINITY;
        let mut t_exit = FreeCoordinate::INFINITY;
        let reciprocal = ray.reciprocal_direction();
        for axis in Axis::ALL {
            let origin = ray.origin[axis];
            if ray.direction[axis] == 0.0 {
                if origin < self.lower_bounds[axis] || origin > self.upper_bounds[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.lower_bounds[axis] - origin) * reciprocal[axis];
            let t2 = (self.upper_bounds[axis] - origin) * reciprocal[axis];
            t_enter = t_enter.max(t1.min(t2));
            t_exit = t_exit.min(t1.max(t2));
        }
        (t_enter <= t_exit).then_some((t_enter, t_exit))
    }
}

impl fmt::Debug for Aab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = self.lower_bounds;
        let u = self.upper_bounds;
        write!(
            f,
            "Aab({:?}..={:?}, {:?}..={:?}, {:?}..={:?})",
            l.x, u.x, l.y, u.y, l.z, u.z
        )
    }
}
