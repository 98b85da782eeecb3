//! [`Scene`]: the collection of worlds and materials that rays are cast into.

use crate::hit::Hit;
use crate::material::MaterialTable;
use crate::math::{FreeCoordinate, GridPoint, PackedVoxel};
use crate::raycast::Ray;
use crate::world::VoxelWorld;

/// A set of [`VoxelWorld`]s sharing one [`MaterialTable`].
///
/// Worlds are identified by their index. Slots may be empty, so that taking a world out
/// with [`Scene::take_world()`] does not renumber the others.
#[derive(Debug, Default)]
pub struct Scene {
    worlds: Vec<Option<VoxelWorld>>,
    materials: MaterialTable,
}

impl Scene {
    /// Constructs a scene with no worlds and the default material table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a world at the end and returns its index.
    pub fn add_world(&mut self, world: VoxelWorld) -> usize {
        self.worlds.push(Some(world));
        self.worlds.len() - 1
    }

    /// Inserts a world at `index`, shifting later worlds up. An index past the end
    /// appends instead.
    pub fn insert_world(&mut self, index: usize, world: VoxelWorld) -> usize {
        let index = index.min(self.worlds.len());
        self.worlds.insert(index, Some(world));
        index
    }

    /// Removes the world at `index`, shifting later worlds down, and returns it.
    pub fn remove_world(&mut self, index: usize) -> Option<VoxelWorld> {
        if index < self.worlds.len() {
            self.worlds.remove(index)
        } else {
            None
        }
    }

    /// Removes the world at `index`, leaving its slot empty.
    pub fn take_world(&mut self, index: usize) -> Option<VoxelWorld> {
        self.worlds.get_mut(index).and_then(Option::take)
    }

    /// Number of world slots, including empty ones.
    pub fn world_slots(&self) -> usize {
        self.worlds.len()
    }

    #[allow(missing_docs)]
    pub fn world(&self, index: usize) -> Option<&VoxelWorld> {
        self.worlds.get(index)?.as_ref()
    }

    #[allow(missing_docs)]
    pub fn world_mut(&mut self, index: usize) -> Option<&mut VoxelWorld> {
        self.worlds.get_mut(index)?.as_mut()
    }

    /// Iterates over the worlds that exist, with their indices.
    pub fn worlds(&self) -> impl Iterator<Item = (usize, &VoxelWorld)> + '_ {
        self.worlds
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| Some((index, slot.as_ref()?)))
    }

    /// Iterates mutably over the worlds that exist, with their indices.
    pub fn worlds_mut(&mut self) -> impl Iterator<Item = (usize, &mut VoxelWorld)> + '_ {
        self.worlds
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| Some((index, slot.as_mut()?)))
    }

    /// The materials that voxels' material indices refer to.
    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    #[allow(missing_docs)]
    pub fn materials_mut(&mut self) -> &mut MaterialTable {
        &mut self.materials
    }

    /// Fills every world with `voxel`, as [`VoxelWorld::clear()`] does.
    pub fn clear(&mut self, voxel: PackedVoxel) {
        for (_, world) in self.worlds_mut() {
            world.clear(voxel);
        }
    }

    /// Stores a voxel in the given world.
    ///
    /// If the scene has no worlds yet, a default world is created first, so that drawing
    /// into an empty scene works. Nonexistent worlds and out-of-bounds positions are
    /// otherwise ignored.
    pub fn set(&mut self, world_index: usize, cube: impl Into<GridPoint>, voxel: PackedVoxel) {
        if self.worlds.is_empty() {
            log::info!("creating a default world to hold voxels");
            self.add_world(VoxelWorld::default());
        }
        if let Some(world) = self.world_mut(world_index) {
            world.set(cube, voxel);
        }
    }

    /// Adds the models of a MagicaVoxel `.vox` file as new worlds.
    ///
    /// On error, the scene is unchanged. See [`import_vox()`](crate::import::import_vox).
    #[cfg(feature = "vox")]
    pub fn import_vox(
        &mut self,
        bytes: &[u8],
    ) -> Result<crate::import::ImportSummary, crate::import::ImportError> {
        crate::import::import_vox(self, bytes)
    }

    /// Draws the models of a MagicaVoxel `.vox` file into an existing world, with the
    /// file's origin at voxel `position`.
    ///
    /// On error, the scene is unchanged. See [`stamp_vox()`](crate::import::stamp_vox).
    #[cfg(feature = "vox")]
    pub fn stamp_vox(
        &mut self,
        world_index: usize,
        bytes: &[u8],
        position: crate::math::GridVector,
    ) -> Result<usize, crate::import::ImportError> {
        crate::import::stamp_vox(self, world_index, bytes, position)
    }

    // --------------------------------------------------------------------------------------------

    /// Finds the nearest voxel along `ray` in any active world.
    ///
    /// When two worlds report hits at the same distance, the one with the higher index
    /// wins. The step count of the result is the largest of any single world's.
    pub fn find_nearest(&self, ray: &Ray) -> Hit {
        let mut best = Hit::new(*ray);
        let mut most_steps = 0;
        for (index, world) in self.worlds() {
            let mut candidate = Hit::new(*ray);
            world.find_nearest(ray, index, &mut candidate);
            most_steps = most_steps.max(candidate.steps);
            if candidate.t <= best.t {
                best = candidate;
            }
        }
        best.steps = most_steps;
        best
    }

    /// Finds where `ray` leaves the transparent voxels its origin is inside of; see
    /// [`VoxelWorld::find_nearest_empty()`].
    pub fn find_nearest_empty(&self, ray: &Ray) -> Hit {
        let mut best = Hit::new(*ray);
        let mut most_steps = 0;
        for (index, world) in self.worlds() {
            let mut candidate = Hit::new(*ray);
            world.find_nearest_empty(ray, index, &self.materials, &mut candidate);
            most_steps = most_steps.max(candidate.steps);
            if candidate.t <= best.t {
                best = candidate;
            }
        }
        best.steps = most_steps;
        best
    }

    /// Returns whether any voxel of any active world lies along `ray` nearer than `max_t`.
    pub fn is_occluded(&self, ray: &Ray, max_t: FreeCoordinate) -> bool {
        self.worlds()
            .any(|(_, world)| world.is_occluded(ray, max_t, &mut 0))
    }

    /// Returns whether any voxel of the given world lies along `ray` nearer than `max_t`.
    pub fn is_occluded_in(&self, world_index: usize, ray: &Ray, max_t: FreeCoordinate) -> bool {
        self.world(world_index)
            .is_some_and(|world| world.is_occluded(ray, max_t, &mut 0))
    }
}
