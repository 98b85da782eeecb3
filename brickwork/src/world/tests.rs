use euclid::{point3, vec3};
use pretty_assertions::assert_eq;
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;
use rstest::rstest;

use super::*;
use crate::material::Material;
use crate::math::{Rgb, points_approx_eq};

fn red(material: u8) -> PackedVoxel {
    PackedVoxel::new(0xff0000, material)
}

/// Ray along +X through the center of voxel row `(y, z)` of a 128³ world placed at the
/// identity, starting one unit before the world.
fn ray_along_row(y: i32, z: i32) -> Ray {
    let center = |c: i32| (c as f32 + 0.5) / 128.0;
    Ray::new([-1.0, center(y), center(z)], [1.0, 0.0, 0.0])
}

fn noise_world() -> VoxelWorld {
    let mut world = VoxelWorld::new([2, 2, 2]).unwrap();
    world.generate_noise(&NoiseParameters {
        seed: 1234,
        ..NoiseParameters::default()
    });
    world
}

#[test]
fn default_size() {
    let world = VoxelWorld::default();
    assert_eq!(world.grid_size(), GridSize::new(16, 16, 16));
    assert_eq!(world.resolution(), GridSize::new(128, 128, 128));
    assert_eq!(world.brick_count(), 0);
    assert!(world.is_active());
}

#[rstest]
#[case([0, 1, 1])]
#[case([1, -1, 1])]
#[case([i32::MAX, 1, 1])]
#[case([1 << 20, 1 << 20, 1 << 20])]
fn bad_sizes(#[case] size: [i32; 3]) {
    let size = GridSize::from(size);
    assert_eq!(VoxelWorld::new(size).unwrap_err(), WorldSizeError { size });
}

#[test]
fn set_and_get() {
    let mut world = VoxelWorld::default();
    world.set([2, 3, 4], red(1));
    assert_eq!(world.get([2, 3, 4]), red(1));
    assert_eq!(world.get([2, 3, 5]), PackedVoxel::EMPTY);
    assert_eq!(world.brick_count(), 1);
    assert_eq!(world.brick(point3(0, 0, 0)).map(Brick::occupancy), Some(1));

    world.set([127, 127, 127], red(0));
    assert_eq!(world.brick_count(), 2);
    assert_eq!(world.brick(point3(15, 15, 15)).map(Brick::occupancy), Some(1));
}

#[test]
fn set_out_of_bounds_is_ignored() {
    let mut world = VoxelWorld::default();
    world.set([128, 0, 0], red(0));
    world.set([0, -1, 0], red(0));
    assert_eq!(world.brick_count(), 0);
    assert_eq!(world.get([128, 0, 0]), PackedVoxel::EMPTY);
}

#[test]
fn set_empty_does_not_allocate() {
    let mut world = VoxelWorld::default();
    world.set([1, 1, 1], PackedVoxel::EMPTY);
    world.set([1, 1, 1], PackedVoxel::new(0, 5));
    assert_eq!(world.brick_count(), 0);
}

#[test]
fn set_in_allocated_only_writes_existing_bricks() {
    let mut world = VoxelWorld::default();
    world.set([0, 0, 0], red(0));
    world.set_in_allocated([1, 0, 0], red(1));
    world.set_in_allocated([20, 0, 0], red(1));
    assert_eq!(world.get([1, 0, 0]), red(1));
    assert_eq!(world.get([20, 0, 0]), PackedVoxel::EMPTY);
    assert_eq!(world.brick_count(), 1);
}

#[test]
fn clear() {
    let mut world = VoxelWorld::default();
    world.set([0, 0, 0], red(0));
    world.set([100, 0, 0], red(0));
    world.clear(red(2));
    assert_eq!(world.get([7, 7, 7]), red(2));
    assert_eq!(world.get([50, 50, 50]), PackedVoxel::EMPTY);
    world.clear(PackedVoxel::EMPTY);
    assert_eq!(world.brick_count(), 0);
}

#[test]
fn resize_keeps_common_bricks() {
    let mut world = VoxelWorld::new([4, 4, 4]).unwrap();
    world.set([9, 9, 9], red(0)); // brick (1, 1, 1)
    world.set([30, 0, 0], red(1)); // brick (3, 0, 0)
    world.resize([2, 3, 2]).unwrap();
    assert_eq!(world.grid_size(), GridSize::new(2, 3, 2));
    assert_eq!(world.brick_count(), 1);
    assert_eq!(world.get([9, 9, 9]), red(0));

    world.resize([5, 5, 5]).unwrap();
    assert_eq!(world.get([9, 9, 9]), red(0));
    assert_eq!(world.brick_count(), 1);

    assert!(world.resize([0, 5, 5]).is_err());
    assert_eq!(world.grid_size(), GridSize::new(5, 5, 5));
}

#[test]
fn singular_transform_is_rejected() {
    let mut world = VoxelWorld::default();
    world.set_position(vec3(1.0, 2.0, 3.0)).unwrap();
    let before = *world.transform();
    assert!(world.set_scale(vec3(1.0, 0.0, 1.0)).is_err());
    assert_eq!(*world.transform(), before);
}

#[test]
fn corners_of_translated_world() {
    let mut world = VoxelWorld::default();
    world.set_position(vec3(10.0, 0.0, 0.0)).unwrap();
    let corners = world.corners();
    assert!(points_approx_eq(corners[0], point3(10.0, 0.0, 0.0), 1e-6));
    assert!(points_approx_eq(corners[1], point3(11.0, 0.0, 0.0), 1e-6));
    assert!(points_approx_eq(corners[6], point3(10.0, 1.0, 1.0), 1e-6));
    assert!(points_approx_eq(corners[7], point3(11.0, 1.0, 1.0), 1e-6));
}

#[test]
fn local_world_round_trip() {
    let mut world = VoxelWorld::default();
    world
        .set_transform_parameters(TransformParameters {
            position: vec3(1.0, -2.0, 0.5),
            rotation: vec3(0.3, 1.2, -0.7),
            scale: vec3(2.0, 0.5, 1.5),
        })
        .unwrap();
    let p = point3(0.25, 0.5, 0.75);
    let round_trip = world.world_to_local(world.local_to_world(p));
    assert!(points_approx_eq(p, round_trip, 1e-5), "{round_trip:?}");
}

// -------------------------------------------------------------------------------------------------

#[test]
fn find_nearest_identity() {
    let mut world = VoxelWorld::default();
    world.set([2, 3, 4], red(1));
    world.set([9, 3, 4], red(0));
    let ray = ray_along_row(3, 4);
    let mut hit = Hit::new(ray);
    world.find_nearest(&ray, 5, &mut hit);

    assert!(hit.is_hit());
    assert!((hit.t() - (1.0 + 2.0 / 128.0)).abs() < 1e-6, "{}", hit.t());
    assert_eq!(hit.voxel(), red(1));
    assert_eq!(hit.world_index(), 5);
    assert_eq!(hit.index(), 2 + 3 * 8 + 4 * 64);
    assert_eq!(hit.normal(), vec3(-1.0, 0.0, 0.0));
    assert!(hit.steps() > 0);
}

#[test]
fn find_nearest_miss_leaves_sentinel() {
    let mut world = VoxelWorld::default();
    world.set([2, 3, 4], red(1));
    let ray = ray_along_row(3, 5);
    let mut hit = Hit::new(ray);
    world.find_nearest(&ray, 0, &mut hit);
    assert!(!hit.is_hit());
    assert_eq!(hit.voxel(), PackedVoxel::EMPTY);

    // A ray pointing away from the world examines nothing.
    let away = Ray::new([-1.0, 0.5, 0.5], [-1.0, 0.0, 0.0]);
    let mut hit = Hit::new(away);
    world.find_nearest(&away, 0, &mut hit);
    assert!(!hit.is_hit());
    assert_eq!(hit.steps(), 0);
}

#[test]
fn find_nearest_from_inside() {
    let mut world = VoxelWorld::default();
    world.set([64, 64, 100], red(0));
    let origin: FreePoint = point3(64.5f32, 64.5, 64.5) / 128.0;
    let ray = Ray::new(origin, [0.0, 0.0, 1.0]);
    let mut hit = Hit::new(ray);
    world.find_nearest(&ray, 0, &mut hit);
    assert!((hit.t() - 35.5 / 128.0).abs() < 1e-6, "{}", hit.t());
    assert_eq!(hit.normal(), vec3(0.0, 0.0, -1.0));
}

#[test]
fn find_nearest_in_transformed_world() {
    let mut world = VoxelWorld::default();
    for x in 0..128 {
        for y in 0..128 {
            world.set([x, y, 0], red(0));
        }
    }
    world
        .set_transform_parameters(TransformParameters {
            position: vec3(3.0, -1.0, 2.0),
            rotation: vec3(0.0, -core::f32::consts::FRAC_PI_2, 0.3),
            scale: vec3(2.0, 2.0, 2.0),
        })
        .unwrap();
    // Aim at the outside of the z = 0 face.
    let face_point = world.local_to_world(point3(0.3, 0.7, 0.0));
    let outward = (world.local_to_world(point3(0.3, 0.7, -1.0)) - face_point).normalize();
    let ray = Ray::new(face_point + outward * 5.0, -outward);
    let mut hit = Hit::new(ray);
    world.find_nearest(&ray, 0, &mut hit);
    assert!(hit.is_hit());
    assert!((hit.t() - 5.0).abs() < 1e-3, "{}", hit.t());
    assert!((hit.normal() - outward).length() < 1e-4, "{:?}", hit.normal());
    assert!(points_approx_eq(hit.point(), face_point, 1e-3));
}

#[test]
fn find_nearest_keeps_nearer_hit() {
    let mut world = VoxelWorld::default();
    world.set([2, 3, 4], red(1));
    let ray = ray_along_row(3, 4);

    let mut hit = Hit::new(ray);
    hit.t = 0.5;
    world.find_nearest(&ray, 1, &mut hit);
    assert_eq!(hit.t(), 0.5);
    assert_eq!(hit.voxel(), PackedVoxel::EMPTY);

    // Equal distances are accepted.
    let mut first = Hit::new(ray);
    world.find_nearest(&ray, 1, &mut first);
    let mut again = first.clone();
    world.find_nearest(&ray, 2, &mut again);
    assert_eq!(again.world_index(), 2);
    assert_eq!(again.t(), first.t());
}

#[test]
fn inactive_world_is_invisible() {
    let mut world = VoxelWorld::default();
    world.set([2, 3, 4], red(1));
    world.set_active(false);
    let ray = ray_along_row(3, 4);
    let mut hit = Hit::new(ray);
    world.find_nearest(&ray, 0, &mut hit);
    assert!(!hit.is_hit());
    assert!(!world.is_occluded(&ray, MISS, &mut 0));
}

const MISS: FreeCoordinate = crate::math::MISS_DISTANCE;

#[test]
fn is_occluded_bound() {
    let mut world = VoxelWorld::default();
    world.set([64, 3, 4], red(1));
    let ray = ray_along_row(3, 4);
    let t_voxel = 1.0 + 64.0 / 128.0;
    let mut steps = 0;
    assert!(world.is_occluded(&ray, t_voxel + 0.01, &mut steps));
    assert!(!world.is_occluded(&ray, t_voxel - 0.01, &mut steps));
    assert!(!world.is_occluded(&ray, 0.5, &mut steps));
    assert!(steps > 0);
}

#[test]
fn find_nearest_empty_through_glass() {
    let mut materials = MaterialTable::new();
    let glass = materials
        .find_or_insert(Material {
            transparency: 1.0,
            ior: 1.5,
            ..Material::DEFAULT
        })
        .unwrap();
    let mut world = VoxelWorld::default();
    // A glass slab 4 voxels thick, crossing a brick boundary.
    for x in 6..10 {
        world.set([x, 3, 4], red(glass));
    }
    let start: FreePoint = point3(6.5f32, 3.5, 4.5) / 128.0;
    let ray = Ray::new(start, [1.0, 0.0, 0.0]);
    let mut hit = Hit::new(ray);
    world.find_nearest_empty(&ray, 0, &materials, &mut hit);
    assert!((hit.t() - 3.5 / 128.0).abs() < 1e-6, "{}", hit.t());
    assert_eq!(hit.voxel(), PackedVoxel::EMPTY);

    // Ending at an opaque voxel reports that voxel.
    world.set([10, 3, 4], red(0));
    let mut hit = Hit::new(ray);
    world.find_nearest_empty(&ray, 0, &materials, &mut hit);
    assert!((hit.t() - 3.5 / 128.0).abs() < 1e-6, "{}", hit.t());
    assert_eq!(hit.voxel(), red(0));
}

#[test]
fn find_nearest_empty_ignores_worlds_not_containing_origin() {
    let materials = MaterialTable::new();
    let mut world = VoxelWorld::default();
    world.set([2, 3, 4], red(0));
    let ray = ray_along_row(3, 4);
    let mut hit = Hit::new(ray);
    world.find_nearest_empty(&ray, 0, &materials, &mut hit);
    assert!(!hit.is_hit());
}

// -------------------------------------------------------------------------------------------------

#[test]
fn generate_noise_is_deterministic_and_sparse() {
    let a = noise_world();
    let b = noise_world();
    assert!(a.brick_count() > 0);
    for cube in a.bounds().interior_iter() {
        assert_eq!(a.get(cube), b.get(cube), "{cube:?}");
    }
    // Every remaining brick holds something.
    for brick_cube in a.brick_bounds().interior_iter() {
        if let Some(brick) = a.brick(brick_cube) {
            assert!(!brick.is_empty());
        }
    }
}

#[test]
fn generate_noise_fixed_color() {
    let mut world = VoxelWorld::new([2, 2, 2]).unwrap();
    let color = PackedVoxel::new(0x336699, 3);
    world.generate_noise(&NoiseParameters {
        color: NoiseColor::Fixed(color),
        seed: 1234,
        ..NoiseParameters::default()
    });
    let filled: Vec<PackedVoxel> = world
        .bounds()
        .interior_iter()
        .map(|cube| world.get(cube))
        .filter(|v| !v.is_empty())
        .collect();
    assert!(!filled.is_empty());
    assert!(filled.iter().all(|&v| v == color));
}

#[test]
fn gradient_color_channels() {
    let size = GridSize::new(128, 128, 128);
    assert_eq!(
        gradient_color(point3(64, 0, 127), size).albedo(),
        Rgb::from_packed((127 << 16) | 253)
    );
    assert_eq!(gradient_color(point3(0, 0, 0), size), PackedVoxel::EMPTY);
}

#[test]
fn randomize_transform_ranges() {
    let mut rng = Xoshiro256Plus::seed_from_u64(7);
    let mut world = VoxelWorld::default();
    for _ in 0..50 {
        world.randomize_transform(&mut rng);
        let p = world.transform().parameters();
        assert!(p.position.to_array().iter().all(|c| c.abs() <= 1.0));
        assert!(p.scale.x >= 0.1 && p.scale.x < 2.0);
        assert_eq!(p.scale.x, p.scale.y);
        assert_eq!(p.scale.x, p.scale.z);
    }
}

/// If the world occludes a ray within some distance, then the nearest hit along that
/// ray is within that distance, and conversely.
#[test]
fn occlusion_agrees_with_nearest_hit() {
    let mut world = noise_world();
    let mut rng = Xoshiro256Plus::seed_from_u64(0);
    world.randomize_transform(&mut rng);
    let center = world.local_to_world(point3(0.5, 0.5, 0.5));
    for _ in 0..300 {
        let origin = center
            + vec3(
                rng.random_range(-4.0..4.0),
                rng.random_range(-4.0..4.0),
                rng.random_range(-4.0..4.0),
            );
        let target = center
            + vec3(
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            );
        let ray = Ray::new(origin, (target - origin).normalize());
        let mut hit = Hit::new(ray);
        world.find_nearest(&ray, 0, &mut hit);
        let bound: FreeCoordinate = rng.random_range(0.0..8.0);
        let occluded = world.is_occluded(&ray, bound, &mut 0);
        if occluded {
            assert!(hit.t() < bound + 1e-4, "{ray:?} {} {bound}", hit.t());
        } else if hit.is_hit() {
            assert!(hit.t() >= bound - 1e-4, "{ray:?} {} {bound}", hit.t());
        }
    }
}
