//! [`VoxelWorld`]: a sparse grid of bricks occupying a transformed unit cube.

use core::fmt;

use noise::{NoiseFn as _, Perlin};
use rand::Rng;
use rayon::prelude::*;

use crate::brick::Brick;
use crate::hit::Hit;
use crate::material::MaterialTable;
use crate::math::{
    Aab, BRICK_SIZE, BRICK_VOLUME, FreeCoordinate, FreePoint, FreeVector, GridAab,
    GridCoordinate, GridPoint, GridSize, Matrix, PackedVoxel, TransformError, TransformParameters,
    WORLD_SIZE, WorldTransform,
};
use crate::raycast::{Ray, Raycaster};

#[cfg(test)]
mod tests;

/// A sparse voxel volume.
///
/// In its local coordinate system, a world is the unit cube `[0, 1]³`, divided into
/// a grid of `grid_size` bricks of [`BRICK_SIZE`]³ voxels each. A
/// [`WorldTransform`] places the cube in the scene.
///
/// Bricks are allocated when something is first stored in them. Voxel contents may be
/// modified through `&self` with [`VoxelWorld::set_in_allocated()`], which is how
/// parallel algorithms write to a world.
pub struct VoxelWorld {
    grid_size: GridSize,
    /// Bricks in [`GridAab::linear_index()`] order of [`Self::brick_bounds()`].
    bricks: Vec<Option<Box<Brick>>>,
    transform: WorldTransform,
    active: bool,
}

impl VoxelWorld {
    /// Constructs an empty world with the given number of bricks along each axis and
    /// the identity placement.
    pub fn new(grid_size: impl Into<GridSize>) -> Result<Self, WorldSizeError> {
        let grid_size = grid_size.into();
        let brick_count = checked_volume(grid_size)?;
        let mut bricks = Vec::new();
        bricks.resize_with(brick_count, || None);
        log::debug!(
            "created world of {}×{}×{} bricks",
            grid_size.width,
            grid_size.height,
            grid_size.depth
        );
        Ok(Self {
            grid_size,
            bricks,
            transform: WorldTransform::default(),
            active: true,
        })
    }

    /// Number of bricks along each axis.
    #[inline]
    pub fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    /// Number of voxels along each axis.
    #[inline]
    pub fn resolution(&self) -> GridSize {
        self.grid_size * BRICK_SIZE
    }

    /// The bricks of the grid, in brick coordinates.
    pub fn brick_bounds(&self) -> GridAab {
        GridAab::from_lower_size([0, 0, 0], self.grid_size)
    }

    /// The voxels of the grid, in voxel coordinates.
    pub fn bounds(&self) -> GridAab {
        GridAab::from_lower_size([0, 0, 0], self.resolution())
    }

    /// Number of allocated bricks.
    pub fn brick_count(&self) -> usize {
        self.bricks.iter().filter(|b| b.is_some()).count()
    }

    /// Returns the brick at the given brick coordinates, if it is allocated.
    pub fn brick(&self, brick_cube: GridPoint) -> Option<&Brick> {
        let index = self.brick_bounds().linear_index(brick_cube)?;
        self.bricks[index].as_deref()
    }

    /// Whether queries see this world.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Sets whether queries see this world. Inactive worlds keep their contents.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    // --------------------------------------------------------------------------------------------
    // Contents

    /// Splits a voxel position into the brick's index and the position within the brick.
    fn locate(&self, cube: GridPoint) -> Option<(usize, GridPoint)> {
        if !self.bounds().contains_cube(cube) {
            return None;
        }
        let brick_cube = cube.map(|c| c / BRICK_SIZE);
        let index = self.brick_bounds().linear_index(brick_cube)?;
        Some((index, cube.map(|c| c % BRICK_SIZE)))
    }

    /// Stores a voxel, allocating its brick if needed.
    ///
    /// Positions outside [`Self::bounds()`] are ignored. Storing an empty voxel never
    /// allocates.
    pub fn set(&mut self, cube: impl Into<GridPoint>, voxel: PackedVoxel) {
        let Some((index, within)) = self.locate(cube.into()) else {
            return;
        };
        match &mut self.bricks[index] {
            Some(brick) => brick.set(within, voxel),
            slot @ None => {
                if !voxel.is_empty() {
                    let brick = Box::new(Brick::new());
                    brick.set(within, voxel);
                    *slot = Some(brick);
                }
            }
        }
    }

    /// Stores a voxel if its brick is already allocated, and otherwise does nothing.
    ///
    /// This is the form of [`Self::set()`] that can be used from many threads at once.
    pub fn set_in_allocated(&self, cube: impl Into<GridPoint>, voxel: PackedVoxel) {
        if let Some((index, within)) = self.locate(cube.into()) {
            if let Some(brick) = &self.bricks[index] {
                brick.set(within, voxel);
            }
        }
    }

    /// Returns the voxel at the given position, which is empty if it is out of bounds or
    /// its brick is unallocated.
    pub fn get(&self, cube: impl Into<GridPoint>) -> PackedVoxel {
        match self.locate(cube.into()) {
            Some((index, within)) => self.bricks[index]
                .as_deref()
                .map_or(PackedVoxel::EMPTY, |brick| brick.get(within)),
            None => PackedVoxel::EMPTY,
        }
    }

    /// Fills every allocated brick with `voxel`; clearing to empty also frees all bricks.
    pub fn clear(&mut self, voxel: PackedVoxel) {
        if voxel.is_empty() {
            self.bricks.iter_mut().for_each(|slot| *slot = None);
        } else {
            for brick in self.bricks.iter().flatten() {
                brick.clear(voxel);
            }
        }
    }

    /// Allocates every brick of the grid.
    pub fn allocate_all(&mut self) {
        for slot in &mut self.bricks {
            slot.get_or_insert_with(|| Box::new(Brick::new()));
        }
    }

    /// Frees bricks that contain no voxels.
    pub fn free_empty_bricks(&mut self) {
        for slot in &mut self.bricks {
            if slot.as_deref().is_some_and(Brick::is_empty) {
                *slot = None;
            }
        }
    }

    /// Changes the number of bricks along each axis.
    ///
    /// Bricks at grid positions that exist in both the old and new sizes are kept at the
    /// same position; the others are dropped. The local cube stays `[0, 1]³`, so the
    /// voxels that remain change size.
    pub fn resize(&mut self, new_grid_size: impl Into<GridSize>) -> Result<(), WorldSizeError> {
        let new_grid_size = new_grid_size.into();
        let new_count = checked_volume(new_grid_size)?;
        let new_bounds = GridAab::from_lower_size([0, 0, 0], new_grid_size);
        let mut new_bricks = Vec::new();
        new_bricks.resize_with(new_count, || None);

        let old_bounds = self.brick_bounds();
        for (old_index, slot) in self.bricks.iter_mut().enumerate() {
            let Some(cube) = old_bounds.cube_at_index(old_index) else {
                continue;
            };
            if let Some(new_index) = new_bounds.linear_index(cube) {
                new_bricks[new_index] = slot.take();
            }
        }

        self.bricks = new_bricks;
        self.grid_size = new_grid_size;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Placement

    /// The world's placement in the scene.
    #[inline]
    pub fn transform(&self) -> &WorldTransform {
        &self.transform
    }

    /// The local-to-world matrix.
    #[inline]
    pub fn forward_matrix(&self) -> &Matrix {
        self.transform.forward()
    }

    /// The world-to-local matrix.
    #[inline]
    pub fn inverse_matrix(&self) -> &Matrix {
        self.transform.inverse()
    }

    /// Replaces the placement, recomputing both matrices.
    ///
    /// If the new placement is not invertible, returns an error and keeps the previous one.
    pub fn set_transform_parameters(
        &mut self,
        parameters: TransformParameters,
    ) -> Result<(), TransformError> {
        self.transform = WorldTransform::new(parameters)?;
        Ok(())
    }

    /// Moves the world so that the lower corner of its unrotated cube is at `position`.
    pub fn set_position(&mut self, position: FreeVector) -> Result<(), TransformError> {
        self.set_transform_parameters(TransformParameters {
            position,
            ..self.transform.parameters()
        })
    }

    /// Sets the Euler angles, in radians, of the world's rotation about its center.
    pub fn set_rotation(&mut self, rotation: FreeVector) -> Result<(), TransformError> {
        self.set_transform_parameters(TransformParameters {
            rotation,
            ..self.transform.parameters()
        })
    }

    /// Sets the world's size along each of its local axes.
    pub fn set_scale(&mut self, scale: FreeVector) -> Result<(), TransformError> {
        self.set_transform_parameters(TransformParameters {
            scale,
            ..self.transform.parameters()
        })
    }

    /// Maps a world-space point into this world's `[0, 1]³` space.
    #[inline]
    pub fn world_to_local(&self, point: FreePoint) -> FreePoint {
        self.transform.world_to_local(point)
    }

    /// Maps a point in this world's `[0, 1]³` space into world space.
    #[inline]
    pub fn local_to_world(&self, point: FreePoint) -> FreePoint {
        self.transform.local_to_world(point)
    }

    /// The eight corners of the world's cube in world space, ordered with X varying
    /// fastest.
    pub fn corners(&self) -> [FreePoint; 8] {
        self.transform.corners()
    }

    /// Gives the world a random placement near the origin: position within ±1, any
    /// rotation, and a uniform size from 0.1 to 2.
    pub fn randomize_transform<R: Rng>(&mut self, rng: &mut R) {
        use core::f32::consts::PI;
        let mut symmetric = |limit: f32| -> FreeVector {
            let mut component = || rng.random_range(-limit..limit);
            FreeVector::new(component(), component(), component())
        };
        let position = symmetric(1.0);
        let rotation = symmetric(PI);
        let size = rng.random_range(0.1..2.0);
        if let Err(error) = self.set_transform_parameters(TransformParameters {
            position,
            rotation,
            scale: FreeVector::splat(size),
        }) {
            log::warn!("{error}");
        }
    }

    // --------------------------------------------------------------------------------------------
    // Procedural contents

    /// Fills the world with 3D Perlin noise, replacing its previous contents.
    ///
    /// Bricks are filled in parallel; bricks that end up empty are freed afterward.
    pub fn generate_noise(&mut self, parameters: &NoiseParameters) {
        let NoiseParameters {
            frequency,
            amplitude,
            threshold,
            color,
            seed,
        } = *parameters;
        let perlin = Perlin::new(seed);
        let resolution = self.resolution();
        let scale = resolution.to_vector().to_f64();
        let brick_bounds = self.brick_bounds();

        self.clear(PackedVoxel::EMPTY);
        self.allocate_all();
        self.bricks
            .par_iter()
            .enumerate()
            .for_each(|(index, slot)| {
                let (Some(brick), Some(brick_cube)) = (slot, brick_bounds.cube_at_index(index))
                else {
                    return;
                };
                let origin = brick_cube.to_vector() * BRICK_SIZE;
                for within in Brick::bounds().interior_iter() {
                    let cube = within + origin;
                    let f = cube.to_vector().to_f64().component_div(scale);
                    let n = perlin.get([f.x * frequency, f.y * frequency, f.z * frequency])
                        * amplitude;
                    if n > threshold {
                        let voxel = match color {
                            NoiseColor::Gradient => gradient_color(cube, resolution),
                            NoiseColor::Fixed(voxel) => voxel,
                        };
                        brick.set(within, voxel);
                    }
                }
            });
        self.free_empty_bricks();
        log::debug!(
            "generated noise world: {} of {} bricks occupied",
            self.brick_count(),
            self.bricks.len()
        );
    }

    // --------------------------------------------------------------------------------------------
    // Ray queries

    /// Iterates over the brick cells that `local_ray` passes through, front to back,
    /// yielding each cell's brick (if allocated), the ray in that brick's voxel
    /// coordinates, and the distance at which the ray enters the cell.
    fn cells_along<'a>(
        &'a self,
        local_ray: &Ray,
        steps: &'a mut u32,
    ) -> impl Iterator<Item = (Option<&'a Brick>, Ray, FreeCoordinate)> + 'a {
        let bounds = self.brick_bounds();
        let brick_ray = local_ray.scale_components(self.grid_size.to_vector().to_f32());
        let voxel_ray = brick_ray.scale_components(FreeVector::splat(BRICK_SIZE as FreeCoordinate));
        Raycaster::new(brick_ray.origin, brick_ray.direction)
            .within(bounds, false)
            .filter_map(move |step| {
                *steps += 1;
                let brick_cube = step.cube_ahead();
                let index = bounds.linear_index(brick_cube)?;
                let offset = (brick_cube.to_vector() * BRICK_SIZE).to_f32();
                Some((
                    self.bricks[index].as_deref(),
                    voxel_ray.translate(-offset),
                    step.t_distance(),
                ))
            })
    }

    /// Copies a result found in this world into `hit`.
    fn record(&self, ray: &Ray, local_ray: Ray, world_index: usize, found: &Hit, hit: &mut Hit) {
        hit.ray = *ray;
        hit.t = found.t;
        hit.voxel = found.voxel;
        hit.index = found.index;
        hit.world_index = world_index;
        hit.local_ray = local_ray;
        hit.transform = self.transform;
        hit.resolution = self.resolution().to_vector().to_f32();
    }

    /// Finds the nearest non-empty voxel along `ray` (in world space), and records it in
    /// `hit` if it is no farther than what `hit` already holds.
    ///
    /// `world_index` is recorded in the hit to identify this world.
    pub fn find_nearest(&self, ray: &Ray, world_index: usize, hit: &mut Hit) {
        if !self.active {
            return;
        }
        let local_ray = self.transform.ray_to_local(ray);
        if Aab::UNIT.intersect_ray(&local_ray).is_none() {
            return;
        }

        let mut found = Hit::new(*ray);
        let mut steps = 0;
        let mut any = false;
        for (brick, brick_ray, t_entry) in self.cells_along(&local_ray, &mut steps) {
            let Some(brick) = brick.filter(|b| !b.is_empty()) else {
                continue;
            };
            if brick.find_nearest(&brick_ray, t_entry, &mut found) {
                any = true;
                break;
            }
        }
        hit.steps += steps + found.steps;
        if any && found.t <= hit.t {
            self.record(ray, local_ray, world_index, &found, hit);
        }
    }

    /// Finds where `ray` leaves the run of transparent voxels that its origin is in:
    /// the first voxel that is empty or opaque. The result is recorded in `hit` if it is
    /// no farther than what `hit` already holds.
    ///
    /// Worlds that do not contain the ray's origin report nothing, since the ray is not
    /// inside any of their voxels.
    pub fn find_nearest_empty(
        &self,
        ray: &Ray,
        world_index: usize,
        materials: &MaterialTable,
        hit: &mut Hit,
    ) {
        if !self.active {
            return;
        }
        let local_ray = self.transform.ray_to_local(ray);
        if !Aab::UNIT.contains(local_ray.origin) {
            return;
        }

        let mut found = Hit::new(*ray);
        let mut steps = 0;
        let mut any = false;
        for (brick, brick_ray, t_entry) in self.cells_along(&local_ray, &mut steps) {
            match brick.filter(|b| !b.is_empty()) {
                None => {
                    // Nothing allocated here, so the first voxel of the cell is empty.
                    found.t = t_entry;
                    found.voxel = PackedVoxel::EMPTY;
                    any = true;
                    break;
                }
                Some(brick) => {
                    if brick.find_nearest_empty(&brick_ray, t_entry, materials, &mut found) {
                        any = true;
                        break;
                    }
                }
            }
        }
        hit.steps += steps + found.steps;
        if any && found.t <= hit.t {
            self.record(ray, local_ray, world_index, &found, hit);
        }
    }

    /// Returns whether any voxel of this world lies along `ray` nearer than `max_t`.
    pub fn is_occluded(&self, ray: &Ray, max_t: FreeCoordinate, steps: &mut u32) -> bool {
        if !self.active {
            return false;
        }
        let local_ray = self.transform.ray_to_local(ray);
        if Aab::UNIT
            .intersect_ray(&local_ray)
            .is_none_or(|t| t >= max_t)
        {
            return false;
        }

        let mut brick_steps = 0;
        let mut cell_steps = 0;
        let occluded = self
            .cells_along(&local_ray, &mut cell_steps)
            .take_while(|&(_, _, t_entry)| t_entry < max_t)
            .filter_map(|(brick, brick_ray, t_entry)| Some((brick?, brick_ray, t_entry)))
            .filter(|(brick, _, _)| !brick.is_empty())
            .any(|(brick, brick_ray, t_entry)| {
                brick.is_occluded(&brick_ray, t_entry, max_t, &mut brick_steps)
            });
        *steps += cell_steps + brick_steps;
        occluded
    }
}

impl Default for VoxelWorld {
    /// A world of [`WORLD_SIZE`] voxels along each axis.
    fn default() -> Self {
        const BRICKS: GridCoordinate = WORLD_SIZE / BRICK_SIZE;
        let grid_size = GridSize::new(BRICKS, BRICKS, BRICKS);
        let mut bricks = Vec::new();
        bricks.resize_with((BRICKS * BRICKS * BRICKS) as usize, || None);
        Self {
            grid_size,
            bricks,
            transform: WorldTransform::default(),
            active: true,
        }
    }
}

impl fmt::Debug for VoxelWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoxelWorld")
            .field("grid_size", &self.grid_size.to_array())
            .field("brick_count", &self.brick_count())
            .field("transform", &self.transform.parameters())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// Parameters for [`VoxelWorld::generate_noise()`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct NoiseParameters {
    /// Noise cycles across the width of the world.
    pub frequency: f64,
    /// Multiplier applied to the noise value before comparing it with `threshold`.
    pub amplitude: f64,
    /// Voxels whose scaled noise value exceeds this are filled.
    pub threshold: f64,
    /// Color of the filled voxels.
    pub color: NoiseColor,
    /// Seed of the noise function.
    pub seed: u32,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            frequency: 5.0,
            amplitude: 0.5,
            threshold: 0.09,
            color: NoiseColor::Gradient,
            seed: 0,
        }
    }
}

/// How [`VoxelWorld::generate_noise()`] colors the voxels it fills.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum NoiseColor {
    /// Red, green, and blue increase with X, Y, and Z respectively.
    Gradient,
    /// Every voxel is the same.
    Fixed(PackedVoxel),
}

/// Color that varies across the world, with material 0.
pub fn gradient_color(cube: GridPoint, resolution: GridSize) -> PackedVoxel {
    let channel = |c: GridCoordinate, size: GridCoordinate| {
        ((c as f32 / size as f32 * 255.0).clamp(0.0, 255.0)) as u32
    };
    PackedVoxel::new(
        (channel(cube.x, resolution.width) << 16)
            | (channel(cube.y, resolution.height) << 8)
            | channel(cube.z, resolution.depth),
        0,
    )
}

// -------------------------------------------------------------------------------------------------

/// Error returned when a world of the requested size cannot be represented.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("cannot make a world of {}×{}×{} bricks", size.width, size.height, size.depth)]
#[non_exhaustive]
pub struct WorldSizeError {
    /// The requested grid size.
    pub size: GridSize,
}

/// Returns the number of bricks in a grid of the given size, checking that both the
/// brick grid and the voxel grid are representable.
fn checked_volume(size: GridSize) -> Result<usize, WorldSizeError> {
    let error = WorldSizeError { size };
    if size.width <= 0 || size.height <= 0 || size.depth <= 0 {
        return Err(error);
    }
    let voxel_size = GridSize::new(
        size.width.checked_mul(BRICK_SIZE).ok_or(error)?,
        size.height.checked_mul(BRICK_SIZE).ok_or(error)?,
        size.depth.checked_mul(BRICK_SIZE).ok_or(error)?,
    );
    let bricks = GridAab::checked_from_lower_size([0, 0, 0], size).map_err(|_| error)?;
    GridAab::checked_from_lower_size([0, 0, 0], voxel_size).map_err(|_| error)?;
    let volume = bricks.volume();
    volume.checked_mul(BRICK_VOLUME).ok_or(error)?;
    Ok(volume)
}
