//! Drawing solid and hollow primitives into a [`VoxelWorld`].
//!
//! Positions and sizes are measured in voxels of the world being drawn into. Each
//! function visits only the cubes inside both the shape's bounding box and
//! [`VoxelWorld::bounds()`], so shapes that extend past the edge of the world are clipped
//! and shapes entirely outside it cost nothing.

use rand::Rng;

use crate::math::{
    FreeCoordinate, FreePoint, FreeVector, GridAab, GridCoordinate, GridPoint, GridSize,
    GridVector, PackedVoxel,
};
use crate::raycast::Raycaster;
use crate::world::VoxelWorld;

/// Fills a ball.
///
/// Each cube whose center is closer than `radius` to `center` is set to `voxel` with
/// probability `probability`, and emptied otherwise. Drawing [`PackedVoxel::EMPTY`] with
/// probability 1 carves a spherical hole.
pub fn draw_sphere(
    world: &mut VoxelWorld,
    center: FreePoint,
    radius: FreeCoordinate,
    voxel: PackedVoxel,
    probability: f32,
    rng: &mut impl Rng,
) {
    let Some(bounds) = bounds_around(world, center, radius) else {
        return;
    };
    for cube in bounds.interior_iter() {
        if distance_to_cube(center, cube) < radius {
            let drawn = if rng.random::<f32>() < probability {
                voxel
            } else {
                PackedVoxel::EMPTY
            };
            world.set(cube, drawn);
        }
    }
}

/// Draws a spherical shell of the given `thickness`, centered on the sphere of `radius`.
/// Cubes inside and outside the shell are left alone.
pub fn draw_hollow_sphere(
    world: &mut VoxelWorld,
    center: FreePoint,
    radius: FreeCoordinate,
    thickness: FreeCoordinate,
    voxel: PackedVoxel,
) {
    let half_thickness = thickness / 2.0;
    let Some(bounds) = bounds_around(world, center, radius + half_thickness) else {
        return;
    };
    for cube in bounds.interior_iter() {
        if (distance_to_cube(center, cube) - radius).abs() < half_thickness {
            world.set(cube, voxel);
        }
    }
}

/// Sets every cube in `bounds` to `voxel`.
pub fn draw_box(world: &mut VoxelWorld, bounds: GridAab, voxel: PackedVoxel) {
    let Some(clipped) = bounds.intersection(world.bounds()) else {
        return;
    };
    for cube in clipped.interior_iter() {
        world.set(cube, voxel);
    }
}

/// Sets the one-voxel-thick outer layer of `bounds` to `voxel`.
///
/// Boxes less than three voxels wide along some axis have no interior and are filled.
pub fn draw_hollow_box(world: &mut VoxelWorld, bounds: GridAab, voxel: PackedVoxel) {
    let Some(clipped) = bounds.intersection(world.bounds()) else {
        return;
    };
    let size = bounds.size();
    let interior = GridAab::checked_from_lower_size(
        bounds.lower_bounds() + GridVector::new(1, 1, 1),
        GridSize::new(size.width - 2, size.height - 2, size.depth - 2),
    )
    .ok()
    .filter(|interior| !interior.is_empty());
    for cube in clipped.interior_iter() {
        if !interior.is_some_and(|interior| interior.contains_cube(cube)) {
            world.set(cube, voxel);
        }
    }
}

/// Fills the cube of side `2 * half_size` centered on the corner point `center`.
pub fn draw_cube(
    world: &mut VoxelWorld,
    center: GridPoint,
    half_size: GridCoordinate,
    voxel: PackedVoxel,
) {
    if let Some(bounds) = cube_bounds(center, half_size) {
        draw_box(world, bounds, voxel);
    }
}

/// Draws the surface of the cube of side `2 * half_size` centered on the corner point
/// `center`.
pub fn draw_hollow_cube(
    world: &mut VoxelWorld,
    center: GridPoint,
    half_size: GridCoordinate,
    voxel: PackedVoxel,
) {
    if let Some(bounds) = cube_bounds(center, half_size) {
        draw_hollow_box(world, bounds, voxel);
    }
}

/// Sets every cube that the segment from `start` to `end` passes through.
///
/// The line is traced with the same grid traversal as rays, so consecutive cubes always
/// share a face.
pub fn draw_line(world: &mut VoxelWorld, start: FreePoint, end: FreePoint, voxel: PackedVoxel) {
    let steps = Raycaster::new(start, end - start)
        .within(world.bounds(), false)
        .take_while(|step| step.t_distance() <= 1.0);
    let cubes: Vec<GridPoint> = steps.map(|step| step.cube_ahead()).collect();
    for cube in cubes {
        world.set(cube, voxel);
    }
}

// -------------------------------------------------------------------------------------------------

fn distance_to_cube(center: FreePoint, cube: GridPoint) -> FreeCoordinate {
    (cube.to_f32() + FreeVector::splat(0.5) - center).length()
}

/// Returns the cubes within `radius` of `center` along every axis, clipped to the world.
fn bounds_around(
    world: &VoxelWorld,
    center: FreePoint,
    radius: FreeCoordinate,
) -> Option<GridAab> {
    let finite = center.x.is_finite() && center.y.is_finite() && center.z.is_finite();
    if !finite || !radius.is_finite() || radius <= 0.0 {
        return None;
    }
    let world_bounds = world.bounds();
    let limit_lower = world_bounds.lower_bounds().to_f32();
    let limit_upper = world_bounds.upper_bounds().to_f32();
    let extent = FreeVector::splat(radius);
    let lower = (center - extent)
        .floor()
        .clamp(limit_lower, limit_upper)
        .to_i32();
    let upper = (center + extent)
        .ceil()
        .clamp(limit_lower, limit_upper)
        .to_i32();
    let size = upper - lower;
    GridAab::checked_from_lower_size(lower, GridSize::new(size.x, size.y, size.z))
        .ok()
        .filter(|bounds| !bounds.is_empty())
}

fn cube_bounds(center: GridPoint, half_size: GridCoordinate) -> Option<GridAab> {
    let lower = center.map(|c| c.checked_sub(half_size));
    let side = half_size.checked_mul(2)?;
    GridAab::checked_from_lower_size([lower.x?, lower.y?, lower.z?], [side; 3]).ok()
}
