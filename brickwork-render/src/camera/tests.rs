use super::*;
use brickwork::math::PackedVoxel;
use brickwork::world::VoxelWorld;
use pretty_assertions::assert_eq;
use rand::SeedableRng as _;
use rand_xoshiro::Xoshiro256Plus;
use rstest::rstest;

fn rng() -> Xoshiro256Plus {
    Xoshiro256Plus::seed_from_u64(0)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn test_camera() -> Camera {
    Camera::new(
        point3(0.5, 0.5, 3.0),
        point3(0.5, 0.5, 0.0),
        Viewport::new(9, 5),
    )
}

#[test]
fn center_pixel_looks_at_target() {
    let camera = test_camera();
    let ray = camera.ray_for_pixel(4, 2, [0.0, 0.0], &mut rng());
    assert_eq!(ray.origin, camera.position);
    assert!(close(ray.direction.z, -1.0), "{:?}", ray.direction);
}

#[test]
fn basis_is_right_handed_with_y_up() {
    let basis = test_camera().basis();
    assert_eq!(basis.right, vec3(1.0, 0.0, 0.0));
    assert_eq!(basis.up, vec3(0.0, 1.0, 0.0));
    assert_eq!(basis.ahead, vec3(0.0, 0.0, -1.0));
}

#[test]
fn basis_looking_straight_down() {
    let basis = Basis::look_at(point3(0.0, 5.0, 0.0), point3(0.0, 0.0, 0.0));
    assert_eq!(basis.ahead, vec3(0.0, -1.0, 0.0));
    assert_eq!(basis.right, vec3(1.0, 0.0, 0.0));
    assert!(close(basis.up.length(), 1.0));
    assert!(close(basis.up.dot(basis.ahead), 0.0));
}

#[rstest]
#[case(0, 0)]
#[case(8, 0)]
#[case(3, 4)]
#[case(8, 4)]
fn world_to_screen_inverts_pixel_rays(#[case] x: u32, #[case] y: u32) {
    let camera = test_camera();
    let ray = camera.ray_for_pixel(x, y, [0.0, 0.0], &mut rng());
    let screen = camera.world_to_screen(ray.at(2.5)).unwrap();
    assert!(close(screen.x, (x as f32 + 0.5) / 9.0), "{screen:?}");
    assert!(close(screen.y, (y as f32 + 0.5) / 5.0), "{screen:?}");
}

#[test]
fn world_to_screen_rejects_points_behind() {
    let camera = test_camera();
    assert_eq!(camera.world_to_screen(point3(0.5, 0.5, 4.0)), None);
    assert_eq!(
        camera.world_to_screen(camera.target),
        Some(point2(0.5, 0.5))
    );
}

#[test]
fn reproject_without_motion_returns_same_pixel() {
    let camera = test_camera();
    let ray = camera.ray_for_pixel(6, 1, [0.0, 0.0], &mut rng());
    let [x, y] = camera.reproject(ray.at(2.0)).unwrap();
    assert!(close(x, 6.5), "{x}");
    assert!(close(y, 1.5), "{y}");
}

#[test]
fn reproject_after_motion_uses_previous_view() {
    let before = test_camera();
    let mut camera = before.clone();
    camera.move_by(0.2, -0.1, 0.3);
    camera.rotate(0.1, 0.05);

    let point = point3(0.7, 0.4, 0.2);
    let [x, y] = camera.reproject(point).unwrap();
    let expected = before.world_to_screen(point).unwrap();
    assert!(close(x, expected.x * 9.0), "{x} vs {expected:?}");
    assert!(close(y, expected.y * 5.0), "{y} vs {expected:?}");

    // Once the state is updated, reprojection agrees with the current view.
    camera.update_previous_state();
    let [x, y] = camera.reproject(point).unwrap();
    let expected = camera.world_to_screen(point).unwrap();
    assert!(close(x, expected.x * 9.0));
    assert!(close(y, expected.y * 5.0));
}

#[test]
fn reproject_rejects_points_behind_previous_camera() {
    let camera = test_camera();
    assert_eq!(camera.reproject(point3(0.5, 0.5, 5.0)), None);
}

#[test]
fn motion_tracking() {
    let mut camera = test_camera();
    assert!(!camera.has_moved());
    assert_eq!(camera.camera_delta(), 0.0);

    camera.move_by(0.0, 0.0, 1.0);
    assert!(camera.has_moved());
    assert!(close(camera.camera_delta(), 1.0));
    assert_eq!(camera.position, point3(0.5, 0.5, 2.0));
    assert_eq!(camera.target, point3(0.5, 0.5, -1.0));

    camera.update_previous_state();
    assert!(!camera.has_moved());
    assert_eq!(camera.previous_state().position, point3(0.5, 0.5, 2.0));
}

#[test]
fn panini_without_distortion_is_pinhole() {
    let pinhole = test_camera();
    let panini = Camera {
        projection: Projection::Panini,
        panini_distance: 1.0,
        panini_squeeze: 0.0,
        ..pinhole.clone()
    };
    for (x, y) in [(0, 0), (2, 3), (8, 4)] {
        let a = pinhole.ray_for_pixel(x, y, [0.25, -0.25], &mut rng());
        let b = panini.ray_for_pixel(x, y, [0.25, -0.25], &mut rng());
        assert!((a.direction - b.direction).length() < 1e-5);
    }
}

#[test]
fn panini_squeeze_changes_edges_only() {
    let panini = Camera {
        projection: Projection::Panini,
        panini_squeeze: 2.0,
        ..test_camera()
    };
    let pinhole = test_camera();
    let center = panini.ray_for_pixel(4, 2, [0.0, 0.0], &mut rng());
    assert!(close(center.direction.z, -1.0));
    let edge = panini.ray_for_pixel(0, 0, [0.0, 0.0], &mut rng());
    let pinhole_edge = pinhole.ray_for_pixel(0, 0, [0.0, 0.0], &mut rng());
    assert!((edge.direction - pinhole_edge.direction).length() > 1e-3);
}

#[test]
fn depth_of_field_rays_converge_on_focal_plane() {
    let camera = Camera {
        projection: Projection::DepthOfField,
        lens_radius: 0.2,
        focal_distance: 2.0,
        ..test_camera()
    };
    let mut rng = rng();
    let ahead = camera.basis().ahead;
    let focus_points: Vec<FreePoint> = (0..20)
        .map(|_| {
            let ray = camera.ray_for_pixel(2, 1, [0.0, 0.0], &mut rng);
            assert!((ray.origin - camera.position).length() <= 0.2 + 1e-5);
            // Advance to the focal plane.
            let t = (2.0 - (ray.origin - camera.position).dot(ahead)) / ray.direction.dot(ahead);
            ray.at(t)
        })
        .collect();
    for p in &focus_points {
        assert!((*p - focus_points[0]).length() < 1e-4, "{p:?}");
    }
}

#[test]
fn hexagon_samples_stay_inside() {
    let mut rng = rng();
    for _ in 0..1000 {
        let [x, y] = sample_hexagon(&mut rng);
        assert!(x.hypot(y) <= 1.0 + 1e-5);
        // The flat top and bottom edges are at ±sin(60°).
        assert!(y.abs() <= 0.866_03);
    }
}

#[test]
fn rotate_clamps_pitch() {
    let mut camera = test_camera();
    camera.rotate(0.0, 10.0);
    let ahead = camera.basis().ahead;
    // Still facing slightly forward rather than flipping over.
    assert!(ahead.y > 0.99 && ahead.z < 0.0, "{ahead:?}");
    assert!(close((camera.target - camera.position).length(), 3.0));

    let mut camera = test_camera();
    camera.rotate(core::f32::consts::FRAC_PI_2, 0.0);
    let ahead = camera.basis().ahead;
    assert!(close(ahead.x, -1.0), "{ahead:?}");
}

#[test]
fn orbit_keeps_distance() {
    let mut camera = test_camera();
    let center = point3(0.5, 0.5, 0.5);
    camera.orbit(center, 1.0);
    assert!(close((camera.position - center).length(), 2.5));
    assert!(close(camera.position.y, 0.5));
    assert_eq!(camera.target, center);
}

#[test]
fn focus_on_hit_or_far_away() {
    let mut camera = test_camera();
    camera.focus_at(&Scene::new(), [4, 2]);
    assert_eq!(camera.focal_distance, MISS_FOCAL_DISTANCE);

    let mut scene = Scene::new();
    let mut world = VoxelWorld::default();
    for x in 0..128 {
        for y in 0..128 {
            world.set([x, y, 64], PackedVoxel::new(0xffffff, 0));
        }
    }
    scene.add_world(world);
    camera.focus_at(&scene, [4, 2]);
    // The front face of the wall is at z = 0.5 + 1/128.
    assert!(close(camera.focal_distance, 3.0 - 65.0 / 128.0), "{}", camera.focal_distance);
}

#[test]
fn projection_matrix_maps_near_and_far() {
    let camera = test_camera();
    let projection = camera.projection_matrix();
    let near = projection.transform_point3d_homogeneous(point3(0.0, 0.0, -camera.near));
    let far = projection.transform_point3d_homogeneous(point3(0.0, 0.0, -camera.far));
    assert!(close(near.z / near.w, -1.0));
    assert!((far.z / far.w - 1.0).abs() < 1e-3);
}

#[test]
fn viewport_properties() {
    assert_eq!(Viewport::new(4, 2).aspect_ratio(), 2.0);
    assert_eq!(Viewport::new(4, 0).aspect_ratio(), 1.0);
    assert_eq!(Viewport::new(4, 3).pixel_count(), Some(12));
    assert!(Viewport::new(0, 3).is_empty());
}
