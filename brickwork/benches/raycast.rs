#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use brickwork::hit::Hit;
use brickwork::raycast::{Ray, Raycaster};
use brickwork::scene::Scene;
use brickwork::world::{NoiseParameters, VoxelWorld};

fn noise_scene() -> Scene {
    let mut world = VoxelWorld::default();
    world.generate_noise(&NoiseParameters::default());
    let mut scene = Scene::new();
    scene.add_world(world);
    scene
}

pub fn raycast_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("raycast");

    group.bench_function("single step diagonal", |b| {
        let mut raycaster = Raycaster::new(black_box([0.0, -0.25, -0.5]), black_box([1.0, 1.0, 1.0]));
        b.iter(|| raycaster.next());
    });

    let scene = noise_scene();
    let ray = Ray::new([-1.0, 0.45, 0.55], [1.0, 0.1, -0.05]);

    group.bench_function("scene find_nearest", |b| {
        b.iter(|| scene.find_nearest(black_box(&ray)));
    });

    group.bench_function("scene is_occluded", |b| {
        b.iter(|| scene.is_occluded(black_box(&ray), 3.0));
    });

    group.bench_function("world find_nearest fresh hit", |b| {
        let world = scene.world(0).unwrap();
        b.iter_batched(
            || Hit::new(ray),
            |mut hit| {
                world.find_nearest(&ray, 0, &mut hit);
                hit
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, raycast_bench);
criterion_main!(benches);
