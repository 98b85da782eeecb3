//! Drawing [`DebugLine`]s over rendered images.

use brickwork::debug_lines::{DebugLine, DebugLines};
use brickwork::math::{FreePoint, Rgb};
use brickwork::scene::Scene;
use brickwork::settings::Settings;
use embedded_graphics::Pixel;
use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor as _};
use embedded_graphics::prelude::{OriginDimensions, Point, Primitive as _, Size};
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::Drawable as _;
use imgref::ImgVec;

use crate::camera::{Camera, ScreenPoint};

/// Color of the outlines drawn around each world.
const WORLD_BOUNDS_COLOR: Rgb = Rgb::new(0.2, 0.8, 0.2);

/// Adds the lines visualizing `scene` to `sink`, if [`Settings::debug_draw`] is set:
/// the bounds of each active world and a wireframe of each light.
pub fn collect_scene_lines(scene: &Scene, settings: &Settings, sink: &mut DebugLines) {
    if !settings.debug_draw {
        return;
    }
    for (_, world) in scene.worlds() {
        if world.is_active() {
            sink.draw_world_bounds(world, WORLD_BOUNDS_COLOR);
        }
    }
    for light in &settings.lights {
        light.wireframe(sink);
    }
}

/// Draws `lines`, projected through `camera`, onto `image`.
///
/// Portions of lines behind the camera's near plane or outside the image are skipped.
pub fn draw_lines(image: &mut ImgVec<[u8; 4]>, camera: &Camera, lines: &[DebugLine]) {
    let width = image.width();
    let height = image.height();
    let mut target = ImageTarget {
        size: Size::new(width as u32, height as u32),
        stride: image.stride(),
        data: image.buf_mut(),
    };
    let size = [width as f32, height as f32];

    for line in lines {
        let Some((start, end)) = clip_to_near_plane(camera, line.start, line.end) else {
            continue;
        };
        let (Some(start), Some(end)) = (camera.world_to_screen(start), camera.world_to_screen(end))
        else {
            continue;
        };
        let to_pixels = |p: ScreenPoint| ScreenPoint::new(p.x * size[0], p.y * size[1]);
        let Some((start, end)) = clip_to_rectangle(to_pixels(start), to_pixels(end), size) else {
            continue;
        };
        let [r, g, b, _] = line.color.to_rgba8();
        // Clipped endpoints lie on the image boundary, possibly with rounding error.
        let to_point = |p: ScreenPoint| {
            Point::new(
                p.x.floor().clamp(0.0, size[0] - 1.0) as i32,
                p.y.floor().clamp(0.0, size[1] - 1.0) as i32,
            )
        };
        let Ok(()) = Line::new(to_point(start), to_point(end))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::new(r, g, b), 1))
            .draw(&mut target);
    }
}

/// Shortens the segment from `start` to `end` to the part in front of the camera's near
/// plane, or returns [`None`] if there is no such part.
fn clip_to_near_plane(
    camera: &Camera,
    start: FreePoint,
    end: FreePoint,
) -> Option<(FreePoint, FreePoint)> {
    let ahead = camera.basis().ahead;
    let depth = |p: FreePoint| (p - camera.position).dot(ahead) - camera.near;
    let (ds, de) = (depth(start), depth(end));
    match (ds > 0.0, de > 0.0) {
        (true, true) => Some((start, end)),
        (false, false) => None,
        (true, false) => Some((start, start.lerp(end, ds / (ds - de)))),
        (false, true) => Some((start.lerp(end, ds / (ds - de)), end)),
    }
}

/// Liang–Barsky clipping of a segment to the rectangle from the origin to `size`.
fn clip_to_rectangle(
    start: ScreenPoint,
    end: ScreenPoint,
    size: [f32; 2],
) -> Option<(ScreenPoint, ScreenPoint)> {
    let delta = end - start;
    let mut t0: f32 = 0.0;
    let mut t1: f32 = 1.0;
    for (p, q) in [
        (-delta.x, start.x),
        (delta.x, size[0] - start.x),
        (-delta.y, start.y),
        (delta.y, size[1] - start.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    (t0 <= t1).then(|| (start + delta * t0, start + delta * t1))
}

/// Just enough [`DrawTarget`] to draw lines into an RGBA image.
struct ImageTarget<'a> {
    data: &'a mut [[u8; 4]],
    stride: usize,
    size: Size,
}

impl DrawTarget for ImageTarget<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.size.width && y < self.size.height {
                self.data[y as usize * self.stride + x as usize] =
                    [color.r(), color.g(), color.b(), 255];
            }
        }
        Ok(())
    }
}

impl OriginDimensions for ImageTarget<'_> {
    fn size(&self) -> Size {
        self.size
    }
}
