//! [`Brick`], the dense 8×8×8 block of voxels that sparse worlds are made of.

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::hit::Hit;
use crate::material::MaterialTable;
use crate::math::{
    BRICK_SIZE, BRICK_VOLUME, FreeCoordinate, FreePoint, GridAab, GridPoint, PackedVoxel,
};
use crate::raycast::{Ray, RaycastStep, Raycaster};

/// A dense cube of [`BRICK_SIZE`]³ voxels.
///
/// Voxels are stored as atomic words so that a brick may be written from several
/// threads at once through a shared reference; see [`Brick::set()`].
/// The brick also keeps a count of its non-empty voxels, so that traversals can skip
/// empty bricks without looking inside them.
pub struct Brick {
    /// Packed voxels in `x + y * 8 + z * 64` order.
    voxels: [AtomicU32; BRICK_VOLUME],
    /// Number of non-empty entries in `voxels`.
    occupancy: AtomicUsize,
}

impl Brick {
    /// Constructs a brick with every voxel empty.
    pub fn new() -> Self {
        Self {
            voxels: [const { AtomicU32::new(0) }; BRICK_VOLUME],
            occupancy: AtomicUsize::new(0),
        }
    }

    /// The cells of a brick, in its own voxel coordinates.
    pub fn bounds() -> GridAab {
        GridAab::from_lower_size([0, 0, 0], [BRICK_SIZE, BRICK_SIZE, BRICK_SIZE])
    }

    /// Converts voxel coordinates within the brick to the index used by
    /// [`Hit::index()`], or [`None`] if they are out of range.
    #[inline]
    pub fn index(cube: GridPoint) -> Option<usize> {
        let range = 0..BRICK_SIZE;
        if range.contains(&cube.x) && range.contains(&cube.y) && range.contains(&cube.z) {
            Some((cube.x + cube.y * BRICK_SIZE + cube.z * BRICK_SIZE * BRICK_SIZE) as usize)
        } else {
            None
        }
    }

    /// Stores `voxel` at the given position. Positions outside the brick are ignored.
    ///
    /// This takes `&self` so that disjoint regions may be written in parallel.
    /// The occupancy count stays exact as long as no two threads write the same voxel
    /// concurrently.
    pub fn set(&self, cube: impl Into<GridPoint>, voxel: PackedVoxel) {
        let Some(index) = Self::index(cube.into()) else {
            return;
        };
        let previous = self.voxels[index].swap(voxel.to_bits(), Ordering::Relaxed);
        match (previous == 0, voxel.is_empty()) {
            (true, false) => {
                self.occupancy.fetch_add(1, Ordering::Relaxed);
            }
            (false, true) => {
                self.occupancy.fetch_sub(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Returns the voxel at the given position, or [`PackedVoxel::EMPTY`] if it is outside
    /// the brick.
    #[inline]
    pub fn get(&self, cube: impl Into<GridPoint>) -> PackedVoxel {
        match Self::index(cube.into()) {
            Some(index) => self.get_index(index),
            None => PackedVoxel::EMPTY,
        }
    }

    /// Returns the voxel at the given linear index.
    ///
    /// Panics if `index >= BRICK_VOLUME`.
    #[inline]
    pub fn get_index(&self, index: usize) -> PackedVoxel {
        PackedVoxel::from_bits(self.voxels[index].load(Ordering::Relaxed))
    }

    /// Sets every voxel of the brick to `voxel`.
    pub fn clear(&self, voxel: PackedVoxel) {
        for word in &self.voxels {
            word.store(voxel.to_bits(), Ordering::Relaxed);
        }
        self.occupancy.store(
            if voxel.is_empty() { 0 } else { BRICK_VOLUME },
            Ordering::Relaxed,
        );
    }

    /// Returns the number of non-empty voxels.
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    /// Returns whether every voxel is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    // --------------------------------------------------------------------------------------------

    /// Walks the voxels of this brick along `ray`, starting at distance `t_entry`.
    ///
    /// `ray` is expressed in this brick's voxel coordinates, so that one voxel is one unit,
    /// while its `t` values are those of the caller's ray. Each yielded voxel is counted
    /// in `steps`.
    fn cells<'a>(
        &'a self,
        ray: &Ray,
        t_entry: FreeCoordinate,
        steps: &'a mut u32,
    ) -> impl Iterator<Item = (RaycastStep, FreeCoordinate, usize)> + 'a {
        // Rounding can leave the entry point slightly outside the brick.
        const INSIDE: FreeCoordinate = BRICK_SIZE as FreeCoordinate - 1e-4;
        let entry: FreePoint = ray.at(t_entry).map(|c| c.clamp(0.0, INSIDE));
        Raycaster::new(entry, ray.direction)
            .within(Self::bounds(), false)
            .filter_map(move |step| {
                *steps += 1;
                let index = Self::index(step.cube_ahead())?;
                Some((step, t_entry + step.t_distance(), index))
            })
    }

    /// Finds the first non-empty voxel along `ray` and records it in `hit`.
    ///
    /// Returns whether a voxel was found. `hit.t` is not consulted; the caller decides
    /// whether the result is nearer than what it already has.
    pub fn find_nearest(&self, ray: &Ray, t_entry: FreeCoordinate, hit: &mut Hit) -> bool {
        let mut steps = 0;
        let found = self
            .cells(ray, t_entry, &mut steps)
            .map(|(_, t, index)| (t, index, self.get_index(index)))
            .find(|&(_, _, voxel)| !voxel.is_empty());
        hit.steps += steps;
        match found {
            Some((t, index, voxel)) => {
                hit.t = t;
                hit.index = index;
                hit.voxel = voxel;
                true
            }
            None => false,
        }
    }

    /// Finds the first voxel along `ray` which is either empty or made of an opaque
    /// material, i.e. the point where a ray travelling through transparent voxels
    /// leaves them.
    ///
    /// Returns whether such a voxel was found; if not, `hit` is not modified except for
    /// its step count.
    pub fn find_nearest_empty(
        &self,
        ray: &Ray,
        t_entry: FreeCoordinate,
        materials: &MaterialTable,
        hit: &mut Hit,
    ) -> bool {
        let mut steps = 0;
        let found = self
            .cells(ray, t_entry, &mut steps)
            .map(|(_, t, index)| (t, index, self.get_index(index)))
            .find(|&(_, _, voxel)| {
                voxel.is_empty() || materials.get_or_default(voxel.material_index()).transparency <= 0.0
            });
        hit.steps += steps;
        match found {
            Some((t, index, voxel)) => {
                hit.t = t;
                hit.index = index;
                hit.voxel = voxel;
                true
            }
            None => false,
        }
    }

    /// Returns whether any non-empty voxel lies along `ray` nearer than `max_t`.
    pub fn is_occluded(
        &self,
        ray: &Ray,
        t_entry: FreeCoordinate,
        max_t: FreeCoordinate,
        steps: &mut u32,
    ) -> bool {
        self.cells(ray, t_entry, steps)
            .take_while(|&(_, t, _)| t < max_t)
            .any(|(_, _, index)| !self.get_index(index).is_empty())
    }
}

impl Default for Brick {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Brick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Brick")
            .field("occupancy", &self.occupancy())
            .finish_non_exhaustive()
    }
}
