//! [`Hit`], the result of a ray query, and the surface properties derived from it.

use crate::material::{Material, MaterialTable};
use crate::math::{
    Axis, FreeCoordinate, FreePoint, FreeVector, MISS_DISTANCE, PackedVoxel, Rgb, WorldTransform,
};
use crate::raycast::Ray;

/// What a ray struck, as found by [`Scene::find_nearest()`](crate::scene::Scene::find_nearest)
/// and the other ray queries.
///
/// Besides the voxel and distance, a hit remembers the local-space ray and the transform
/// of the world it was found in, so that normals and texture coordinates can be
/// computed on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    /// The world-space ray that was cast.
    pub(crate) ray: Ray,
    /// Distance along `ray`, in multiples of its direction.
    pub(crate) t: FreeCoordinate,
    pub(crate) voxel: PackedVoxel,
    /// Number of grid cells examined; a cost measure for debug views.
    pub(crate) steps: u32,
    /// Index of the voxel within its brick.
    pub(crate) index: usize,
    pub(crate) world_index: usize,
    pub(crate) local_ray: Ray,
    pub(crate) transform: WorldTransform,
    /// Voxels per axis of the world that was hit.
    pub(crate) resolution: FreeVector,
}

impl Hit {
    /// Constructs the “nothing hit yet” state for a query along `ray`.
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            t: MISS_DISTANCE,
            voxel: PackedVoxel::EMPTY,
            steps: 0,
            index: 0,
            world_index: 0,
            local_ray: ray,
            transform: WorldTransform::default(),
            resolution: FreeVector::splat(1.0),
        }
    }

    /// The world-space ray this hit lies on.
    #[inline]
    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    /// Distance to the hit, or [`MISS_DISTANCE`] if nothing was hit.
    #[inline]
    pub fn t(&self) -> FreeCoordinate {
        self.t
    }

    /// The voxel that was hit, or [`PackedVoxel::EMPTY`].
    ///
    /// [`Scene::find_nearest_empty()`](crate::scene::Scene::find_nearest_empty) may report
    /// an empty voxel at a finite distance.
    #[inline]
    pub fn voxel(&self) -> PackedVoxel {
        self.voxel
    }

    /// Returns whether anything was found.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t < MISS_DISTANCE
    }

    /// Number of grid cells the query examined.
    #[inline]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Index of the hit voxel within its brick, in `x + y * 8 + z * 64` order.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index in the scene of the world that was hit.
    #[inline]
    pub fn world_index(&self) -> usize {
        self.world_index
    }

    /// The ray in the hit world's local space.
    #[inline]
    pub fn local_ray(&self) -> &Ray {
        &self.local_ray
    }

    /// Transform of the world that was hit.
    #[inline]
    pub fn transform(&self) -> &WorldTransform {
        &self.transform
    }

    // --------------------------------------------------------------------------------------------

    /// World-space position of the hit.
    #[inline]
    pub fn point(&self) -> FreePoint {
        self.ray.at(self.t)
    }

    /// Position of the hit in the world's local `[0, 1]³` space.
    #[inline]
    pub fn local_point(&self) -> FreePoint {
        self.local_ray.at(self.t)
    }

    /// Position of the hit in voxel units of the world that was hit.
    fn voxel_point(&self) -> FreeVector {
        self.local_point().to_vector().component_mul(self.resolution)
    }

    /// The local axis of the voxel face that the hit lies on: the one whose grid plane
    /// the hit point is closest to.
    fn face_axis(&self) -> Axis {
        let p = self.voxel_point();
        let distance = |axis: Axis| {
            let f = p[axis] - p[axis].floor();
            f.min(1.0 - f)
        };
        let mut best = Axis::X;
        for axis in [Axis::Y, Axis::Z] {
            if distance(axis) < distance(best) {
                best = axis;
            }
        }
        best
    }

    /// Unit normal of the struck face in the world's local space.
    pub fn local_normal(&self) -> FreeVector {
        let axis = self.face_axis();
        let mut normal = FreeVector::zero();
        normal[axis] = if self.local_ray.direction[axis] > 0.0 {
            -1.0
        } else {
            1.0
        };
        normal
    }

    /// Unit normal of the struck face in world space, facing against the ray.
    pub fn normal(&self) -> FreeVector {
        self.transform
            .local_to_world_vector(self.local_normal())
            .normalize()
    }

    /// Texture coordinates of the hit within the struck voxel face, each in 0 to 1.
    ///
    /// Coordinates are chosen so that a texture has the same orientation on all six faces
    /// of a voxel when viewed from outside.
    pub fn uv(&self) -> [FreeCoordinate; 2] {
        let p = self.voxel_point();
        let f = p.map(|c| c - c.floor());
        let axis = self.face_axis();
        let positive = self.local_normal()[axis] > 0.0;
        let (u, v) = match axis {
            Axis::X => (if positive { 1.0 - f.z } else { f.z }, f.y),
            Axis::Y => (f.x, if positive { f.z } else { 1.0 - f.z }),
            Axis::Z => (if positive { 1.0 - f.x } else { f.x }, f.y),
        };
        [u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)]
    }

    /// Index into the [`MaterialTable`] of the voxel's material.
    #[inline]
    pub fn material_index(&self) -> u8 {
        self.voxel.material_index()
    }

    /// The voxel's material.
    ///
    /// The material index must exist in `materials`; if it does not, debug builds panic
    /// and release builds use [`Material::DEFAULT`].
    pub fn material<'m>(&self, materials: &'m MaterialTable) -> &'m Material {
        let index = self.material_index();
        debug_assert!(
            materials.get(index).is_some(),
            "voxel {:?} refers to material {index} but there are only {}",
            self.voxel,
            materials.len()
        );
        materials.get_or_default(index)
    }

    /// Surface color at the hit, taking the material's texture into account.
    pub fn albedo(&self, materials: &MaterialTable) -> Rgb {
        let base = self.voxel.albedo();
        match &self.material(materials).texture {
            Some(texture) => {
                let texel = texture.sample(self.uv());
                if texture.combine {
                    base * texel
                } else {
                    texel
                }
            }
            None => base,
        }
    }
}
