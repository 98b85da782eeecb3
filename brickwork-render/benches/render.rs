#![allow(missing_docs)]

use criterion::measurement::WallTime;
use criterion::{Bencher, Criterion, criterion_group, criterion_main};
use euclid::point3;

use brickwork::environment::Environment;
use brickwork::scene::Scene;
use brickwork::settings::Settings;
use brickwork::world::{NoiseParameters, VoxelWorld};
use brickwork_render::Renderer;
use brickwork_render::camera::{Camera, Viewport};

/// Non-mutated test data shared between benches
struct TestData {
    scene: Scene,
}

impl TestData {
    fn new() -> Self {
        let mut world = VoxelWorld::default();
        world.generate_noise(&NoiseParameters::default());
        let mut scene = Scene::new();
        scene.add_world(world);
        Self { scene }
    }

    fn bench(&self, b: &mut Bencher<'_, WallTime>, settings_fn: impl FnOnce(&mut Settings)) {
        let mut settings = Settings::default();
        settings_fn(&mut settings);
        let mut renderer = Renderer::new(settings, Environment::new());
        let mut camera = Camera::new(
            point3(1.6, 1.3, 1.9),
            point3(0.5, 0.5, 0.5),
            Viewport::new(64, 48),
        );
        b.iter_with_large_drop(|| renderer.render_frame(&self.scene, &mut camera).unwrap());
    }
}

pub fn render_bench(c: &mut Criterion) {
    let t = TestData::new();

    let mut group = c.benchmark_group(if cfg!(feature = "auto-threads") {
        "threaded"
    } else {
        "serial"
    });

    group.bench_function("direct", |b| {
        t.bench(b, |s| s.path_tracing = false);
    });

    group.bench_function("path-traced", |b| {
        t.bench(b, |_| {});
    });

    group.bench_function("step-through", |b| {
        t.bench(b, |s| s.step_through = true);
    });

    group.bench_function("accumulate-antialiased", |b| {
        t.bench(b, |s| {
            s.reprojection = false;
            s.accumulate = true;
            s.anti_aliasing = true;
        });
    });

    group.finish();
}

criterion_group!(benches, render_bench);
criterion_main!(benches);
