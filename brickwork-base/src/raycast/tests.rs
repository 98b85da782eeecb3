use super::*;
use euclid::{point3, vec3};
use rand::{Rng as _, SeedableRng as _};

/// Alternative to [`RaycastStep`] for writing expectations, whose `t_distance` comparison
/// tolerates single-precision rounding.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TestStep {
    cube: GridPoint,
    face_axis: Option<Axis>,
    t_distance: FreeCoordinate,
}

impl TestStep {
    fn matches(self, step: &RaycastStep) -> bool {
        self.cube == step.cube_ahead()
            && self.face_axis == step.face_axis()
            && (step.t_distance() - self.t_distance).abs() < 1e-5
    }
}

#[track_caller]
fn assert_steps_option<T: IntoIterator<Item = Option<TestStep>>>(r: &mut Raycaster, steps: T) {
    for (i, expected_step) in steps.into_iter().enumerate() {
        let r_backup = r.clone(); // save for diagnostics
        let actual_step = r.next();
        let matches = match (expected_step, actual_step) {
            (Some(e), Some(a)) => e.matches(&a),
            (None, None) => true,
            _ => false,
        };
        if !matches {
            panic!(
                "step {i}\n\
                    expected: {expected_step:?}\n\
                    actual:   {actual_step:?}\n\
                    before: {r_backup:?}\n\
                    after:  {r:?}\n",
            );
        }
    }
}
#[track_caller]
fn assert_steps<T: IntoIterator<Item = TestStep>>(r: &mut Raycaster, steps: T) {
    assert_steps_option(r, steps.into_iter().map(Some))
}
#[track_caller]
fn assert_only_one_step(r: &mut Raycaster, step: TestStep) {
    assert_steps_option(r, vec![Some(step), None, None]);
}

#[track_caller]
fn assert_no_steps(mut raycaster: Raycaster) {
    assert_steps_option(&mut raycaster, vec![None]);
}

/// Helper to construct steps
fn step(
    x: GridCoordinate,
    y: GridCoordinate,
    z: GridCoordinate,
    face_axis: Option<Axis>,
    t_distance: FreeCoordinate,
) -> TestStep {
    TestStep {
        cube: GridPoint::new(x, y, z),
        face_axis,
        t_distance,
    }
}

const X: Option<Axis> = Some(Axis::X);
const Y: Option<Axis> = Some(Axis::Y);
const Z: Option<Axis> = Some(Axis::Z);

#[test]
fn simple_almost_1d() {
    // Testing all six directions to ensure the axis selection logic picks the correct one
    let small = 1.0 / 128.0;
    let origin = point3(10.5, 20.5, 30.5);
    assert_steps(
        &mut Raycaster::new(origin, vec3(0.5, small, small)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(11, 20, 30, X, 1.0),
            step(12, 20, 30, X, 3.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(origin, vec3(-0.5, small, small)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(9, 20, 30, X, 1.0),
            step(8, 20, 30, X, 3.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(origin, vec3(small, 0.5, small)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(10, 21, 30, Y, 1.0),
            step(10, 22, 30, Y, 3.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(origin, vec3(small, -0.5, small)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(10, 19, 30, Y, 1.0),
            step(10, 18, 30, Y, 3.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(origin, vec3(small, small, 0.5)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(10, 20, 31, Z, 1.0),
            step(10, 20, 32, Z, 3.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(origin, vec3(small, small, -0.5)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(10, 20, 29, Z, 1.0),
            step(10, 20, 28, Z, 3.0),
        ],
    );
}

#[test]
fn simple_exactly_1d() {
    assert_steps(
        &mut Raycaster::new(point3(10.5, 20.5, 30.5), vec3(0.5, 0.0, 0.0)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(11, 20, 30, X, 1.0),
            step(12, 20, 30, X, 3.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(point3(10.5, 20.5, 30.5), vec3(-0.5, 0.0, 0.0)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(9, 20, 30, X, 1.0),
            step(8, 20, 30, X, 3.0),
        ],
    );
}

/// Exact ties between axes step Z first, then Y, then X.
#[test]
fn ties_prefer_z_then_y() {
    assert_steps(
        &mut Raycaster::new(point3(0.5, 0.5, 0.5), vec3(1.0, 1.0, 1.0)),
        vec![
            step(0, 0, 0, None, 0.0),
            step(0, 0, 1, Z, 0.5),
            step(0, 1, 1, Y, 0.5),
            step(1, 1, 1, X, 0.5),
            step(1, 1, 2, Z, 1.5),
        ],
    );
}

#[test]
fn direction_zero_produces_origin_cube_only() {
    assert_only_one_step(
        &mut Raycaster::new(point3(10.5, 20.5, 30.5), FreeVector::zero()),
        step(10, 20, 30, None, 0.0),
    );
}

#[test]
fn direction_nan_produces_origin_cube_only() {
    assert_only_one_step(
        &mut Raycaster::new(
            point3(10.5, 20.5, 30.5),
            vec3(1.0, 2.0, FreeCoordinate::NAN),
        ),
        step(10, 20, 30, None, 0.0),
    );
}

/// Test the case where the starting point is exactly on a cell border
/// and the ray is mostly aligned with that axis.
#[test]
fn start_on_cube_edge_parallel() {
    assert_steps(
        &mut Raycaster::new(point3(10.0, 20.5, 30.5), vec3(2.0, 0.125, 0.125)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(11, 20, 30, X, 0.5),
            step(12, 20, 30, X, 1.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(point3(10.0, 20.5, 30.5), vec3(-2.0, 0.125, 0.125)),
        vec![
            step(10, 20, 30, None, 0.0),
            step(9, 20, 30, X, 0.5),
            step(8, 20, 30, X, 1.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(point3(-10.0, 20.5, 30.5), vec3(2.0, 0.125, 0.125)),
        vec![
            step(-10, 20, 30, None, 0.0),
            step(-9, 20, 30, X, 0.5),
            step(-8, 20, 30, X, 1.0),
        ],
    );
    assert_steps(
        &mut Raycaster::new(point3(-10.0, 20.5, 30.5), vec3(-2.0, 0.125, 0.125)),
        vec![
            step(-10, 20, 30, None, 0.0),
            step(-11, 20, 30, X, 0.5),
            step(-12, 20, 30, X, 1.0),
        ],
    );
}

#[test]
fn start_outside_of_integer_range() {
    assert_no_steps(Raycaster::new([0.5, 0.5, 1e10], [0.0, 0.0, -1.0]));
    assert_no_steps(Raycaster::new([0.5, 0.5, -1e10], [0.0, 0.0, -1.0]));
}

#[test]
fn start_outside_of_integer_range_with_bounds() {
    let bounds = GridAab::from_lower_size([0, 0, 0], [10, 10, 10]);
    assert_no_steps(
        Raycaster::new(point3(0., 1e20, 0.), vec3(0., -1e20, 0.)).within(bounds, false),
    );
}

#[test]
fn within_bounds() {
    // Ray oriented diagonally on the -X side of bounds that are short on the X axis.
    let mut r = Raycaster::new(point3(0.0, -0.25, -0.5), vec3(1.0, 1.0, 1.0))
        .within(GridAab::from_lower_size([2, -10, -10], [2, 20, 20]), false);
    assert_steps_option(
        &mut r,
        vec![
            Some(step(2, 1, 1, X, 2.0)),
            Some(step(2, 2, 1, Y, 2.25)),
            Some(step(2, 2, 2, Z, 2.5)),
            Some(step(3, 2, 2, X, 3.0)),
            Some(step(3, 3, 2, Y, 3.25)),
            Some(step(3, 3, 3, Z, 3.5)),
            None,
        ],
    );

    // Verify that extra next()s don't modify the state.
    let mut r2 = r.clone();
    r2.next();
    assert_eq!(format!("{r:?}"), format!("{r2:?}"));
}

#[test]
fn within_bounds_include_exit() {
    let mut r = Raycaster::new(point3(0.5, 0.5, 0.5), vec3(1.0, 0.0, 0.0))
        .within(GridAab::from_lower_size([0, 0, 0], [2, 1, 1]), true);
    assert_steps_option(
        &mut r,
        vec![
            Some(step(0, 0, 0, None, 0.0)),
            Some(step(1, 0, 0, X, 0.5)),
            Some(step(2, 0, 0, X, 1.5)),
            None,
        ],
    );
}

/// `within()` for axis-aligned rays that don't intersect the bounds
/// should produce zero steps.
#[test]
fn axis_aligned_miss_within() {
    let bounds = GridAab::from_lower_size([0, 0, 0], [10, 10, 10]);
    assert_no_steps(
        Raycaster::new(point3(18.25, 4.75, -3.0), vec3(0.0, 0.0, 16.0)).within(bounds, false),
    );
}

/// Traversal of a brick-sized grid never produces more steps than the sum of its
/// dimensions, every step lies inside it, and distances never decrease.
#[test]
fn bounded_traversal_terminates() {
    let bounds = GridAab::from_lower_size([0, 0, 0], [8, 8, 8]);
    let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0);
    for _ in 0..2000 {
        let origin: FreePoint = point3(
            rng.random_range(-4.0..12.0),
            rng.random_range(-4.0..12.0),
            rng.random_range(-4.0..12.0),
        );
        let direction: FreeVector = vec3(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let steps: Vec<RaycastStep> = Raycaster::new(origin, direction)
            .within(bounds, false)
            .take(100)
            .collect();
        assert!(steps.len() <= 24, "{origin:?} {direction:?} {steps:#?}");
        let mut previous_t = 0.0;
        for s in &steps {
            assert!(bounds.contains_cube(s.cube_ahead()), "{s:?}");
            assert!(s.t_distance() >= previous_t, "{s:?}");
            previous_t = s.t_distance();
        }
    }
}

#[test]
fn scale_to_integer_step_basics() {
    assert_eq!(scale_to_integer_step(1.5, 0.5), 1.0);
    assert_eq!(scale_to_integer_step(1.5, -0.5), 1.0);
    assert_eq!(scale_to_integer_step(1.0, 2.0), 0.5);
    assert_eq!(scale_to_integer_step(1.0, 0.0), FreeCoordinate::INFINITY);
}

#[test]
fn cube_containing_range() {
    assert_eq!(
        cube_containing(point3(1.5, -2.0, -3.5)),
        Some(GridPoint::new(1, -2, -4))
    );
    assert_eq!(
        cube_containing(point3(FreeCoordinate::INFINITY, 0., 0.)),
        None
    );
    assert_eq!(cube_containing(point3(0., 0., FreeCoordinate::NAN)), None);
}
