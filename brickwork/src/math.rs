//! Mathematical utilities and decisions.

pub use brickwork_base::math::*;

use rand::Rng;
use rand_distr::{Distribution as _, UnitSphere};

/// Returns a uniformly distributed unit vector in the hemisphere around `normal`.
#[inline]
pub fn random_hemisphere_direction(normal: FreeVector, rng: &mut impl Rng) -> FreeVector {
    let [x, y, z]: [FreeCoordinate; 3] = UnitSphere.sample(rng);
    let direction = FreeVector::new(x, y, z);
    if direction.dot(normal) < 0.0 {
        -direction
    } else {
        direction
    }
}

/// Returns an arbitrary pair of unit vectors which are perpendicular to each other and to
/// `normal`, which must itself be a unit vector.
pub fn orthonormal_basis(normal: FreeVector) -> (FreeVector, FreeVector) {
    let helper = if normal.x.abs() > 0.9 {
        FreeVector::new(0.0, 1.0, 0.0)
    } else {
        FreeVector::new(1.0, 0.0, 0.0)
    };
    let tangent = normal.cross(helper).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}
