//! [`Camera`]: viewpoint, projection, and the previous frame's viewpoint for reprojection.

use core::f32::consts::{FRAC_PI_2, FRAC_PI_3};

use brickwork::math::{EPSILON, FreeCoordinate, FreePoint, FreeVector, Matrix};
use brickwork::raycast::Ray;
use brickwork::scene::Scene;
use euclid::{point2, point3, vec3};
use rand::Rng;

#[cfg(test)]
mod tests;

/// Normalized image coordinates: `[0, 1]²` covers the image, with y pointing down.
pub type ScreenPoint = euclid::default::Point2D<f32>;

/// Focal distance chosen by [`Camera::focus_at()`] when nothing is under the pixel.
pub const MISS_FOCAL_DISTANCE: f32 = 100.0;

/// Cameras keep this direction pointing up the image.
const WORLD_UP: FreeVector = vec3(0.0, 1.0, 0.0);

// -------------------------------------------------------------------------------------------------

/// Dimensions of the image a [`Camera`] produces, in pixels.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct Viewport {
    #[allow(missing_docs)]
    pub width: u32,
    #[allow(missing_docs)]
    pub height: u32,
}

impl Viewport {
    #[allow(missing_docs)]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height; 1 for a viewport with no height.
    pub fn aspect_ratio(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Number of pixels, or [`None`] if that does not fit in a [`usize`].
    pub fn pixel_count(self) -> Option<usize> {
        usize::try_from(self.width)
            .ok()?
            .checked_mul(usize::try_from(self.height).ok()?)
    }

    /// Whether the viewport has no pixels at all.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// How a [`Camera`] maps pixels to rays.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Projection {
    /// Every ray starts at the camera position.
    #[default]
    Pinhole,
    /// Rays start on a hexagonal lens of radius [`Camera::lens_radius`] and converge at
    /// [`Camera::focal_distance`], blurring everything nearer or farther.
    DepthOfField,
    /// The general Panini projection, which keeps vertical lines straight at wide
    /// angles. Controlled by [`Camera::panini_distance`] and [`Camera::panini_squeeze`].
    Panini,
}

/// Orthonormal axes of a camera's view.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct Basis {
    /// Toward the right edge of the image.
    pub right: FreeVector,
    /// Toward the top edge of the image.
    pub up: FreeVector,
    /// Into the image.
    pub ahead: FreeVector,
}

impl Basis {
    /// Axes for looking from `position` toward `target`, keeping [`WORLD_UP`] upward.
    ///
    /// If the two points coincide, the view looks along −Z. If the view is straight up
    /// or down, +X is chosen as the right direction.
    pub fn look_at(position: FreePoint, target: FreePoint) -> Self {
        let to_target = target - position;
        let ahead = if to_target.square_length() > EPSILON * EPSILON {
            to_target.normalize()
        } else {
            vec3(0.0, 0.0, -1.0)
        };
        let right = ahead.cross(WORLD_UP);
        let right = if right.square_length() > EPSILON * EPSILON {
            right.normalize()
        } else {
            vec3(1.0, 0.0, 0.0)
        };
        Self {
            right,
            up: right.cross(ahead),
            ahead,
        }
    }
}

/// The parts of a [`Camera`] that determine where each world point appears in the image.
///
/// A camera keeps a copy of this from the previous frame, so that points can be
/// located in the previous frame's image.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct CameraState {
    #[allow(missing_docs)]
    pub position: FreePoint,
    #[allow(missing_docs)]
    pub target: FreePoint,
    /// Vertical field of view, in radians.
    pub fov_y: f32,
    #[allow(missing_docs)]
    pub viewport: Viewport,
}

impl CameraState {
    #[allow(missing_docs)]
    pub fn basis(&self) -> Basis {
        Basis::look_at(self.position, self.target)
    }

    /// Half the width and height of the image plane at distance 1 from the camera.
    fn half_extent(&self) -> (f32, f32) {
        let half_height = (self.fov_y * 0.5).tan();
        (half_height * self.viewport.aspect_ratio(), half_height)
    }

    /// Directions from the camera through the corners of the image, in the order
    /// top left, top right, bottom left, bottom right.
    fn corner_directions(&self) -> [FreeVector; 4] {
        let Basis { right, up, ahead } = self.basis();
        let (half_width, half_height) = self.half_extent();
        [
            ahead - right * half_width + up * half_height,
            ahead + right * half_width + up * half_height,
            ahead - right * half_width - up * half_height,
            ahead + right * half_width - up * half_height,
        ]
    }
}

// -------------------------------------------------------------------------------------------------

/// Defines a perspective view of a [`Scene`].
///
/// A camera looks from [`position`](Self::position) toward [`target`](Self::target) with
/// +Y kept upward, and produces rays for each pixel of its [`Viewport`] according to its
/// [`Projection`]. It also remembers where it was when the previous frame was rendered
/// (see [`Camera::update_previous_state()`]), which is what frame reprojection needs.
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct Camera {
    /// Eye position.
    pub position: FreePoint,
    /// Point looked at.
    pub target: FreePoint,
    /// Vertical field of view, in radians.
    pub fov_y: f32,
    /// Distance of the near clipping plane used by [`Camera::projection_matrix()`].
    pub near: f32,
    /// Distance of the far clipping plane used by [`Camera::projection_matrix()`].
    pub far: f32,
    #[allow(missing_docs)]
    pub projection: Projection,
    /// Radius of the lens used by [`Projection::DepthOfField`].
    pub lens_radius: f32,
    /// Distance, along the view direction, of the plane in focus.
    pub focal_distance: f32,
    /// Distance from the viewer to the Panini projection plane; usually 1.
    pub panini_distance: f32,
    /// Vertical compression of the Panini projection; 0 is cylindrical.
    pub panini_squeeze: f32,
    viewport: Viewport,
    previous: CameraState,
}

impl Camera {
    /// Constructs a pinhole camera with the given viewpoint and image size.
    ///
    /// The previous-frame state starts out equal to the current state.
    pub fn new(position: FreePoint, target: FreePoint, viewport: Viewport) -> Self {
        let fov_y = 1.0;
        Self {
            position,
            target,
            fov_y,
            near: 0.1,
            far: 1000.0,
            projection: Projection::Pinhole,
            lens_radius: 0.1,
            focal_distance: 1.0,
            panini_distance: 1.0,
            panini_squeeze: 0.0,
            viewport,
            previous: CameraState {
                position,
                target,
                fov_y,
                viewport,
            },
        }
    }

    #[allow(missing_docs)]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[allow(missing_docs)]
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// The current viewpoint and image size.
    pub fn state(&self) -> CameraState {
        CameraState {
            position: self.position,
            target: self.target,
            fov_y: self.fov_y,
            viewport: self.viewport,
        }
    }

    /// The state saved by the last [`Camera::update_previous_state()`].
    pub fn previous_state(&self) -> &CameraState {
        &self.previous
    }

    #[allow(missing_docs)]
    pub fn basis(&self) -> Basis {
        Basis::look_at(self.position, self.target)
    }

    // --------------------------------------------------------------------------------------------

    /// Returns the ray for pixel `(x, y)`, where `(0, 0)` is the top left pixel.
    ///
    /// `offset` moves the sample within the pixel; `[0, 0]` is the pixel center and each
    /// component should be in `-0.5..=0.5`. `rng` is used only by
    /// [`Projection::DepthOfField`].
    pub fn ray_for_pixel(&self, x: u32, y: u32, offset: [f32; 2], rng: &mut impl Rng) -> Ray {
        let ndc = self.pixel_to_ndc(x, y, offset);
        match self.projection {
            Projection::Pinhole => Ray::new(self.position, self.ndc_direction(ndc)),
            Projection::DepthOfField => {
                let Basis { right, up, ahead } = self.basis();
                let direction = self.ndc_direction(ndc);
                let focal_point =
                    self.position + direction * (self.focal_distance / direction.dot(ahead));
                let [a, b] = sample_hexagon(rng);
                let lens_point = self.position + (right * a + up * b) * self.lens_radius;
                Ray::new(lens_point, (focal_point - lens_point).normalize())
            }
            Projection::Panini => {
                let d = self.panini_distance;
                let s = self.panini_squeeze;
                let radial = (ndc[0] * ndc[0] + ndc[1] * ndc[1]).sqrt();
                let factor = d + s * ((1.0 + radial * radial).sqrt() - 1.0) / (d + 1.0);
                Ray::new(
                    self.position,
                    self.ndc_direction([ndc[0] * factor, ndc[1] * factor]),
                )
            }
        }
    }

    /// Converts a pixel position to normalized device coordinates, which are −1 to 1
    /// across the image, with +Y up.
    fn pixel_to_ndc(&self, x: u32, y: u32, [dx, dy]: [f32; 2]) -> [f32; 2] {
        let width = self.viewport.width.max(1) as f32;
        let height = self.viewport.height.max(1) as f32;
        [
            (x as f32 + 0.5 + dx) / width * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5 + dy) / height * 2.0,
        ]
    }

    /// Unit direction of the pinhole ray through the given normalized device coordinates.
    fn ndc_direction(&self, [ndc_x, ndc_y]: [f32; 2]) -> FreeVector {
        let Basis { right, up, ahead } = self.basis();
        let (half_width, half_height) = self.state().half_extent();
        (ahead + right * (ndc_x * half_width) + up * (ndc_y * half_height)).normalize()
    }

    // --------------------------------------------------------------------------------------------

    /// World-to-eye matrix: the eye looks along −Z with +Y up.
    pub fn view_matrix(&self) -> Matrix {
        let Basis { right, up, ahead } = self.basis();
        let back = -ahead;
        let eye = self.position.to_vector();
        Matrix::new(
            right.x,
            up.x,
            back.x,
            0.0,
            right.y,
            up.y,
            back.y,
            0.0,
            right.z,
            up.z,
            back.z,
            0.0,
            -right.dot(eye),
            -up.dot(eye),
            -back.dot(eye),
            1.0,
        )
    }

    /// Eye-to-clip matrix of an OpenGL-style perspective projection, mapping the view
    /// frustum between [`near`](Self::near) and [`far`](Self::far) to `[-1, 1]³`.
    pub fn projection_matrix(&self) -> Matrix {
        let y_scale = 1.0 / (self.fov_y * 0.5).tan();
        let x_scale = y_scale / self.viewport.aspect_ratio();
        let depth = self.far - self.near;
        Matrix::new(
            x_scale,
            0.0,
            0.0,
            0.0,
            0.0,
            y_scale,
            0.0,
            0.0,
            0.0,
            0.0,
            -(self.far + self.near) / depth,
            -1.0,
            0.0,
            0.0,
            -(2.0 * self.near * self.far) / depth,
            0.0,
        )
    }

    /// Returns where `point` appears in the image, in [`ScreenPoint`] coordinates, or
    /// [`None`] if it is not in front of the camera.
    ///
    /// The result may lie outside `[0, 1]²` for points outside the field of view.
    pub fn world_to_screen(&self, point: FreePoint) -> Option<ScreenPoint> {
        let clip = self
            .view_matrix()
            .then(&self.projection_matrix())
            .transform_point3d_homogeneous(point);
        if clip.w <= EPSILON {
            return None;
        }
        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        Some(point2((ndc_x + 1.0) * 0.5, (1.0 - ndc_y) * 0.5))
    }

    /// Returns where `point` appeared in the previous frame, in fractional pixels.
    ///
    /// The point is located relative to the four planes through the previous eye
    /// position and the edges of the previous image. The result is [`None`] if the
    /// point was behind the previous camera; it may lie outside the image.
    pub fn reproject(&self, point: FreePoint) -> Option<[f32; 2]> {
        let previous = &self.previous;
        let ahead = previous.basis().ahead;
        let [top_left, top_right, bottom_left, bottom_right] = previous.corner_directions();
        let inward = |a: FreeVector, b: FreeVector| {
            let normal = a.cross(b).normalize();
            if normal.dot(ahead) < 0.0 {
                -normal
            } else {
                normal
            }
        };
        let offset = point - previous.position;
        let left = inward(top_left, bottom_left).dot(offset);
        let right = inward(top_right, bottom_right).dot(offset);
        let top = inward(top_left, top_right).dot(offset);
        let bottom = inward(bottom_left, bottom_right).dot(offset);

        if left + right <= 0.0 || top + bottom <= 0.0 || offset.dot(ahead) <= 0.0 {
            return None;
        }
        let u = left / (left + right);
        let v = top / (top + bottom);
        Some([
            u * self.viewport.width as f32,
            v * self.viewport.height as f32,
        ])
    }

    // --------------------------------------------------------------------------------------------

    /// Distance the eye has moved since the previous frame.
    pub fn camera_delta(&self) -> FreeCoordinate {
        (self.previous.position - self.position).length()
    }

    /// Whether the eye or the point looked at has changed since the previous frame.
    pub fn has_moved(&self) -> bool {
        self.previous.position != self.position || self.previous.target != self.target
    }

    /// Remembers the current state as the previous frame's; call once per frame after
    /// rendering.
    pub fn update_previous_state(&mut self) {
        self.previous = self.state();
    }

    /// Moves the eye and target together, by distances along the view's right, up, and
    /// ahead directions.
    pub fn move_by(&mut self, right: f32, up: f32, ahead: f32) {
        let basis = self.basis();
        let offset = basis.right * right + basis.up * up + basis.ahead * ahead;
        self.position += offset;
        self.target += offset;
    }

    /// Turns the view by `yaw` radians about the vertical and `pitch` radians upward,
    /// keeping the distance to the target.
    ///
    /// The pitch is clamped to just short of straight up or down.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        let distance = (self.target - self.position).length().max(EPSILON);
        let ahead = self.basis().ahead;
        let max_pitch = FRAC_PI_2 - EPSILON;
        let pitch = (ahead.y.atan2(ahead.x.hypot(ahead.z)) + pitch).clamp(-max_pitch, max_pitch);
        let yaw = ahead.x.atan2(ahead.z) + yaw;
        let ahead = vec3(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            yaw.cos() * pitch.cos(),
        );
        self.target = self.position + ahead * distance;
    }

    /// Swings the eye around a vertical axis through `center` by `angle` radians, and
    /// looks at `center`.
    pub fn orbit(&mut self, center: FreePoint, angle: f32) {
        let offset = self.position - center;
        let (sin, cos) = angle.sin_cos();
        self.position = center
            + vec3(
                offset.x * cos + offset.z * sin,
                offset.y,
                -offset.x * sin + offset.z * cos,
            );
        self.target = center;
    }

    /// Sets [`focal_distance`](Self::focal_distance) to the distance of whatever is seen
    /// through the center of the given pixel, or [`MISS_FOCAL_DISTANCE`] if nothing is.
    pub fn focus_at(&mut self, scene: &Scene, [x, y]: [u32; 2]) {
        let ray = Ray::new(self.position, self.ndc_direction(self.pixel_to_ndc(x, y, [0.0; 2])));
        let hit = scene.find_nearest(&ray);
        self.focal_distance = if hit.is_hit() {
            hit.t()
        } else {
            MISS_FOCAL_DISTANCE
        };
    }
}

impl Default for Camera {
    /// A camera looking at the default world, which occupies the unit cube.
    fn default() -> Self {
        Self::new(
            point3(1.6, 1.3, 1.9),
            point3(0.5, 0.5, 0.5),
            Viewport::default(),
        )
    }
}

/// Returns a uniformly distributed point in the regular hexagon with unit circumradius
/// and a vertex on +X.
fn sample_hexagon(rng: &mut impl Rng) -> [f32; 2] {
    let sector = rng.random_range(0..6u8);
    let (mut a, mut b): (f32, f32) = (rng.random(), rng.random());
    if a + b > 1.0 {
        (a, b) = (1.0 - a, 1.0 - b);
    }
    let corner = |k: u8| {
        let angle = f32::from(k) * FRAC_PI_3;
        [angle.cos(), angle.sin()]
    };
    let [x0, y0] = corner(sector);
    let [x1, y1] = corner(sector + 1);
    [a * x0 + b * x1, a * y0 + b * y1]
}
