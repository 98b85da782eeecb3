use euclid::Vector3D;

use crate::math::{
    Axis, FreeCoordinate, FreePoint, FreeVector, GridAab, GridCoordinate, GridPoint, GridVector,
};

// -------------------------------------------------------------------------------------------------

mod ray;
pub use ray::Ray;

#[cfg(test)]
mod tests;

// -------------------------------------------------------------------------------------------------

/// Vector unit type for units of "t" (ray-length).
enum Tc {}

/// Iterator over grid positions that intersect a given ray.
///
/// The grid is of unit cells which are identified by the integer coordinates of
/// their most negative corners. Both the brick grid of a world and the voxel grid of a
/// brick are traversed with this type, after scaling the ray so that one cell is one unit.
//
//---
//
// Implementation notes:
//
// From "A Fast Voxel Traversal Algorithm for Ray Tracing"
// by John Amanatides and Andrew Woo, 1987
// <http://www.cse.yorku.ca/~amana/research/grid.pdf>
//
// The foundation of this algorithm is a parameterized representation of
// the provided ray,
//                    origin + t * direction,
// except that t is not actually stored; rather, at any given point in the
// traversal, we keep track of the *greater* t values which we would have
// if we took a step sufficient to cross a cell boundary along that axis
// (i.e. change the integer part of the coordinate) in the components of
// t_max.
#[derive(Clone, Debug, PartialEq)]
pub struct Raycaster {
    /// State of the raycast algorithm itself, without the extra parts needed from
    /// implementing [`Iterator`].
    state: State,

    /// Tracks special cases for the beginning and end of the raycast.
    first_last: FirstLast,

    /// If true, produce the step which crosses out of the bounds (iff any steps precede it).
    /// If false, only produce steps whose [`RaycastStep::cube_ahead()`]s lie within the bounds.
    include_exit: bool,
}

/// State of the algorithm that is independent of [`Raycaster`]’s public API as an iterator.
///
/// This state always describes the ray being in and crossing some particular cell,
/// and a step of the algorithm determines which face of that cell is *exited* by the ray.
#[derive(Clone, Debug, PartialEq)]
struct State {
    param: Parameters,

    /// Bounds to filter our outputs to within, if any.
    bounds: Option<GridAab>,

    /// `t_max` stores the t-value at which we would next cross a cell boundary,
    /// for each axis in which we could move. Thus, the least element of `t_max`
    /// is the next intersection between the grid and the ray.
    t_max: Vector3D<FreeCoordinate, Tc>,

    /// Cell we're in; always the next cell to return from the iterator.
    cube: GridPoint,

    /// Axis of the last face we passed through, or [`None`] if the ray started in this cell.
    last_face_axis: Option<Axis>,

    /// The `t_max` value used in the previous step; thus, the position along the
    /// ray where we passed through the last face.
    last_t_distance: FreeCoordinate,
}

/// Parameters derived from the input ray direction, which do not change over the duration
/// of the raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Parameters {
    /// The ray being cast. [`State::fast_forward()`] replaces it with a ray moved forward.
    ray: Ray,

    /// Which way to increment `cube` when stepping; signum of the ray’s direction’s components.
    step: GridVector,

    /// Each component of this is the change in t when taking a full grid step along a given axis.
    /// Each is always positive, and infinite if the ray direction is perpendicular to that axis.
    t_delta: Vector3D<FreeCoordinate, Tc>,
}

/// Additional state controlling [`Raycaster`]’s production of first and last items.
#[derive(Clone, Copy, Debug, PartialEq)]
enum FirstLast {
    /// The next [`RaycastStep`] to be produced is either the ray's origin point,
    /// or the first intersection of the ray with the bounds if the origin point
    /// is not within the bounds.
    Beginning,

    /// We have produced at least one step already, and therefore know we are in-bounds.
    InBounds,

    /// We have exited the bounds, or were never valid in the first place,
    /// and should not produce any more items.
    Ended,
}

// -------------------------------------------------------------------------------------------------

impl Raycaster {
    /// Construct a [`Raycaster`] for a ray with the given `origin` and `direction` vector.
    ///
    /// The magnitude of `direction` has no effect on the sequence of cells traversed
    /// but it is the scale of the output field [`RaycastStep::t_distance`].
    ///
    /// Note that this is an infinite iterator by default. Use [`.within()`](Self::within)
    /// to restrict it.
    ///
    /// ```
    /// use brickwork_base::math::GridPoint;
    /// use brickwork_base::raycast::Raycaster;
    ///
    /// let mut r = Raycaster::new([0.5, 0.5, 0.5], [1.0, 0.5, 0.0]);
    /// let mut next = || r.next().unwrap();
    ///
    /// // The cell containing the origin point is always the first cell reported.
    /// assert_eq!(next().cube_ahead(), GridPoint::new(0, 0, 0));
    /// assert_eq!(next().cube_ahead(), GridPoint::new(1, 0, 0));
    /// assert_eq!(next().cube_ahead(), GridPoint::new(1, 1, 0));
    /// assert_eq!(next().cube_ahead(), GridPoint::new(2, 1, 0));
    /// ```
    #[must_use]
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn new(origin: impl Into<FreePoint>, direction: impl Into<FreeVector>) -> Self {
        Self {
            state: State::from_parameters(Parameters::new(origin.into(), direction.into())),
            first_last: FirstLast::Beginning,
            include_exit: true,
        }
    }

    /// Restrict the cells iterated over to those which lie within the given [`GridAab`].
    ///
    /// This makes the iterator finite: [`next()`](Self::next) will return [`None`]
    /// forevermore once there are no more cells intersecting the bounds to report.
    /// The number of steps produced is then at most the sum of the bounds' sizes.
    ///
    /// Calling this multiple times takes the intersection of all bounds.
    ///
    /// If `include_exit` is true, then the last step will be the step from inside the
    /// bounds to outside, meaning that its [`RaycastStep::cube_ahead()`] will be outside
    /// the bounds.
    #[must_use]
    #[mutants::skip] // mutation testing will hang; thoroughly tested otherwise
    #[inline]
    pub fn within(mut self, bounds: GridAab, include_exit: bool) -> Self {
        self.state.bounds = Some(match self.state.bounds {
            Some(existing) => existing
                .intersection(bounds)
                .unwrap_or(GridAab::ORIGIN_EMPTY),
            None => bounds,
        });
        self.first_last = FirstLast::Beginning;
        self.include_exit = include_exit;
        self.state.fast_forward();
        self
    }
}

impl Iterator for Raycaster {
    type Item = RaycastStep;

    /// Returns a [`RaycastStep`] describing the next cell face intersected by the ray.
    #[inline]
    #[mutants::skip] // thoroughly tested otherwise
    fn next(&mut self) -> Option<RaycastStep> {
        loop {
            let (oob_enter, oob_exit) = self.state.is_out_of_bounds_ahead();
            match (self.first_last, oob_enter, oob_exit) {
                (FirstLast::InBounds | FirstLast::Beginning, false, false) => {
                    let item = self.state.current();
                    if !self.state.valid_for_stepping() {
                        // Can't make progress, so stop rather than looping forever.
                        self.first_last = FirstLast::Ended;
                        return self.state.last_face_axis.is_none().then_some(item);
                    }
                    if self.state.step().is_err() {
                        self.first_last = FirstLast::Ended;
                    } else {
                        self.first_last = FirstLast::InBounds;
                    }
                    return Some(item);
                }
                (FirstLast::Beginning, true, false) => {
                    // Not yet in bounds; step and then loop to reconsider.
                    if !self.state.valid_for_stepping() {
                        self.first_last = FirstLast::Ended;
                        return None;
                    }
                    if self.state.step().is_err() {
                        self.first_last = FirstLast::Ended;
                        return None;
                    }
                }
                (FirstLast::InBounds, false, true) => {
                    // We are just past the bounds.
                    // Report the exit now, then nothing afterward.
                    self.first_last = FirstLast::Ended;
                    return self.include_exit.then(|| self.state.current());
                }
                (FirstLast::Ended, _, _) | (_, _, true) => {
                    return None;
                }
                (FirstLast::InBounds, true, false) => {
                    unreachable!("should not be in state InBounds while out of bounds")
                }
            }
        }
    }
}

impl core::iter::FusedIterator for Raycaster {}

// -------------------------------------------------------------------------------------------------

/// Describes a ray crossing into a cell as defined by [`Raycaster`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::module_name_repetitions)]
pub struct RaycastStep {
    cube: GridPoint,
    face_axis: Option<Axis>,
    t_distance: FreeCoordinate,
}

impl RaycastStep {
    /// Returns the cell which the raycaster has just found the ray to intersect.
    #[inline]
    pub fn cube_ahead(&self) -> GridPoint {
        self.cube
    }

    /// Returns the axis perpendicular to the face of [`Self::cube_ahead()`] which is being
    /// crossed, or [`None`] if the ray started within this cell.
    ///
    /// ```
    /// use brickwork_base::math::Axis;
    /// use brickwork_base::raycast::Raycaster;
    ///
    /// let mut r = Raycaster::new((0.5, 0.5, 0.5), (1.0, 0.0, 0.0));
    /// let mut next = || r.next().unwrap();
    ///
    /// assert_eq!(next().face_axis(), None);  // started at (0, 0, 0)
    /// assert_eq!(next().face_axis(), Some(Axis::X));  // moved to (1, 0, 0)
    /// ```
    #[inline]
    pub fn face_axis(&self) -> Option<Axis> {
        self.face_axis
    }

    /// The distance traversed so far, as measured in multiples of the ray's direction vector.
    ///
    /// This is the distance at which the ray enters [`Self::cube_ahead()`], or zero for the
    /// cell containing the ray's origin.
    #[inline]
    #[mutants::skip] // trivial, but modifying it can cause test hangs
    pub fn t_distance(&self) -> FreeCoordinate {
        self.t_distance
    }
}

// -------------------------------------------------------------------------------------------------

impl State {
    const EMPTY: Self = Self {
        param: Parameters::ZERO,
        cube: GridPoint::new(0, 0, 0),
        t_max: Vector3D::new(0., 0., 0.),
        last_face_axis: None,
        last_t_distance: 0.0,
        bounds: Some(GridAab::ORIGIN_EMPTY),
    };

    /// Constructor from [`Parameters`], and non-generic to discourage excess codegen.
    #[inline(always)]
    fn from_parameters(param: Parameters) -> Self {
        let Some(cube) = cube_containing(param.ray.origin) else {
            // Return a raycaster which emits no cells.
            return Self::EMPTY;
        };

        Self {
            param,
            cube,
            t_max: initial_t_max(param.ray, 0.0),
            last_face_axis: None,
            last_t_distance: 0.0,
            bounds: None,
        }
    }

    /// Returns the [`RaycastStep`] describing the step that most recently occurred.
    fn current(&self) -> RaycastStep {
        RaycastStep {
            cube: self.cube,
            face_axis: self.last_face_axis,
            t_distance: self.last_t_distance,
        }
    }

    /// Returns whether a [`Self::step()`] will be able to make forward progress.
    #[inline(always)]
    fn valid_for_stepping(&self) -> bool {
        // If all stepping directions are 0, then we cannot make progress.
        self.param.step != Vector3D::zero()
        // Also check if we had some kind of arithmetic problem in the state.
        // But permit some positive infinity, because that's just an axis-aligned ray.
        && !self.t_max.to_array().iter().any(|t| t.is_nan())
        && self.t_max.to_array().iter().any(|t| t.is_finite())
    }

    /// Determine the axis to step on and move in the appropriate direction along that axis.
    ///
    /// Ties are broken in favor of Z, then Y, matching the rule
    /// `if tx < ty { if tx < tz X else Z } else { if ty < tz Y else Z }`.
    ///
    /// If this step would overflow the [`GridCoordinate`] range, returns [`Err`].
    #[inline(always)]
    #[mutants::skip] // mutation testing will hang; thoroughly tested otherwise
    fn step(&mut self) -> Result<(), ()> {
        let axis: Axis = if self.t_max.x < self.t_max.y {
            if self.t_max.x < self.t_max.z {
                Axis::X
            } else {
                Axis::Z
            }
        } else {
            if self.t_max.y < self.t_max.z {
                Axis::Y
            } else {
                Axis::Z
            }
        };

        debug_assert!(
            self.param.step[axis] != 0,
            "step on axis {axis:X} which is zero; state = {self:#?}"
        );

        // Save t position before we update it.
        self.last_t_distance = self.t_max[axis];

        self.cube[axis] = self.cube[axis]
            .checked_add(self.param.step[axis])
            .ok_or(())?;

        self.t_max[axis] += self.param.t_delta[axis];
        self.last_face_axis = Some(axis);

        Ok(())
    }

    /// In the case where the current position is outside the bounds but might intersect
    /// the bounds later, attempt to move the position to intersect sooner.
    #[mutants::skip] // an optimization not a behavior change
    #[inline(always)]
    fn fast_forward(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };

        // The corner of the bounds whose three planes face the incoming ray.
        let mut plane_origin = GridPoint::new(0, 0, 0);
        for axis in Axis::ALL {
            plane_origin[axis] = if self.param.step[axis] < 0 {
                bounds.upper_bounds()[axis]
            } else {
                bounds.lower_bounds()[axis]
            };
        }

        let mut max_t: FreeCoordinate = 0.0;
        for axis in Axis::ALL {
            let direction = self.param.step[axis];
            if direction == 0 {
                // Parallel ray; no intersection.
                continue;
            }
            let mut plane_normal = GridVector::zero();
            plane_normal[axis] = direction;
            let intersection_t = ray_plane_intersection(self.param.ray, plane_origin, plane_normal);
            max_t = max_t.max(intersection_t);
        }

        if max_t > self.last_t_distance {
            // Go forward to half a cell behind where we think we found the intersection point.
            let t_start = max_t - 0.5 / self.param.ray.direction.length();
            let t_start = if t_start.is_finite() { t_start } else { max_t };
            let ff_ray = self.param.ray.advance(t_start);

            let Some(cube) = cube_containing(ff_ray.origin) else {
                *self = Self::EMPTY;
                return;
            };

            *self = Self {
                param: Parameters {
                    ray: ff_ray,
                    ..self.param
                },
                last_face_axis: self.last_face_axis,
                cube,
                t_max: initial_t_max(ff_ray, t_start),
                last_t_distance: t_start,
                bounds: self.bounds,
            };
        }
    }

    /// Returns whether `self.cube` is outside of `self.bounds`, with additional distinctions.
    ///
    /// The first boolean is if the ray has _not yet entered_ the bounds,
    /// and the second boolean is if it the ray has _left_ the bounds. If the ray does
    /// not intersect the bounds, one or both might be true.
    fn is_out_of_bounds_ahead(&self) -> (bool, bool) {
        let Some(bounds) = self.bounds else {
            return (false, false);
        };
        let mut oob_enter = false;
        let mut oob_exit = false;
        for axis in Axis::ALL {
            let range = bounds.axis_range(axis);
            let oob_low = self.cube[axis] < range.start;
            let oob_high = self.cube[axis] >= range.end;
            if self.param.step[axis] == 0 {
                // The ray has no motion on that axis.
                oob_enter |= oob_low | oob_high;
                oob_exit |= oob_low | oob_high;
            } else if self.param.step[axis] > 0 {
                oob_enter |= oob_low;
                oob_exit |= oob_high;
            } else {
                oob_enter |= oob_high;
                oob_exit |= oob_low;
            }
        }
        (oob_enter, oob_exit)
    }
}

// -------------------------------------------------------------------------------------------------

impl Parameters {
    /// Constant equal to `new([0, 0, 0], [0, 0, 0])`.
    const ZERO: Self = Self {
        ray: Ray {
            origin: FreePoint::new(0., 0., 0.),
            direction: FreeVector::new(0., 0., 0.),
        },
        step: Vector3D::new(0, 0, 0),
        t_delta: Vector3D::new(
            FreeCoordinate::INFINITY,
            FreeCoordinate::INFINITY,
            FreeCoordinate::INFINITY,
        ),
    };

    #[inline]
    fn new(origin: FreePoint, mut direction: FreeVector) -> Self {
        // A very large direction vector would make fast_forward() misestimate its target,
        // and we cannot rescale it without changing the reported t values.
        if !direction.to_array().iter().all(|d| d.abs() < 1e30) {
            direction = Vector3D::zero();
        }

        Self {
            ray: Ray::new(origin, direction),
            step: direction.map(signum_101),
            t_delta: direction.map(|x| x.abs().recip()).cast_unit(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

fn initial_t_max(ray: Ray, t_offset: FreeCoordinate) -> Vector3D<FreeCoordinate, Tc> {
    let o = ray.origin;
    let d = ray.direction;
    Vector3D::new(
        scale_to_integer_step(o.x, d.x),
        scale_to_integer_step(o.y, d.y),
        scale_to_integer_step(o.z, d.z),
    )
    .map(|t| t + t_offset)
}

/// Returns the cell containing `point`, or [`None`] if it is outside the range of
/// [`GridCoordinate`] or NaN.
#[inline]
pub fn cube_containing(point: FreePoint) -> Option<GridPoint> {
    const MIN_INCLUSIVE: FreeCoordinate = GridCoordinate::MIN as FreeCoordinate;
    const MAX_EXCLUSIVE: FreeCoordinate = GridCoordinate::MAX as FreeCoordinate;

    let FreePoint { x, y, z, .. } = point;
    if (MIN_INCLUSIVE <= x)
        & (MIN_INCLUSIVE <= y)
        & (MIN_INCLUSIVE <= z)
        & (x < MAX_EXCLUSIVE)
        & (y < MAX_EXCLUSIVE)
        & (z < MAX_EXCLUSIVE)
    {
        Some(GridPoint::new(
            x.floor() as GridCoordinate,
            y.floor() as GridCoordinate,
            z.floor() as GridCoordinate,
        ))
    } else {
        None
    }
}

/// 3-valued signum (zero produces zero) rather than the 2-valued one Rust gives,
/// and with an integer result.
fn signum_101(x: FreeCoordinate) -> GridCoordinate {
    if x == 0.0 {
        0
    } else {
        x.signum() as GridCoordinate
    }
}

/// Find the smallest positive `t` such that `s + t * ds` is an integer.
///
/// If `ds` is zero, returns positive infinity; this is a useful answer because
/// it means that the less-than comparisons in the raycast algorithm will never pick
/// the corresponding axis. If any input is NaN, returns NaN.
#[doc(hidden)]
#[inline]
pub fn scale_to_integer_step(mut s: FreeCoordinate, mut ds: FreeCoordinate) -> FreeCoordinate {
    if ds == 0.0 && !s.is_nan() {
        // Explicitly handle zero case; the division below could produce NaN
        // when (1.0 - s) rounds down to zero.
        return FreeCoordinate::INFINITY;
    } else if ds < 0.0 {
        // Simplify to positive case only.
        s = -s;
        ds = -ds;
    }

    let s = s.rem_euclid(1.0);
    // problem is now s + t * ds = 1
    let result = (1.0 - s) / ds;

    debug_assert!(
        result.signum() > 0.0 || ds.is_nan() || s.is_nan(),
        "scale_to_integer_step failed ({s}, {ds}) => {result}"
    );
    result
}

fn ray_plane_intersection(
    ray: Ray,
    plane_origin: GridPoint,
    plane_normal: GridVector,
) -> FreeCoordinate {
    let plane_origin: FreePoint = plane_origin.map(|c| c as FreeCoordinate);
    let plane_normal: FreeVector = plane_normal.map(|c| c as FreeCoordinate);
    let relative_position = plane_origin - ray.origin;

    relative_position.dot(plane_normal) / ray.direction.dot(plane_normal)
}
