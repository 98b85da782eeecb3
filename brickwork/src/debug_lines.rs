//! Collection of line segments for visualizing scene structure over a rendered image.

use core::f32::consts::{PI, TAU};

use euclid::{point3, vec3};

use crate::math::{Axis, FreeCoordinate, FreePoint, Rgb};
use crate::world::VoxelWorld;

/// One line segment in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct DebugLine {
    pub start: FreePoint,
    pub end: FreePoint,
    pub color: Rgb,
    /// Remaining lifetime in seconds. Lines with no remaining lifetime are still drawn
    /// until the next [`DebugLines::flush()`].
    pub duration: f32,
}

/// Pairs of [`VoxelWorld::corners()`] indices which form the edges of the world's cube.
pub const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (0, 2),
    (0, 4),
    (1, 3),
    (1, 5),
    (2, 3),
    (2, 6),
    (3, 7),
    (4, 5),
    (4, 6),
    (5, 7),
    (6, 7),
];

/// A sink for [`DebugLine`]s.
///
/// Lines submitted while the sink is disabled are discarded, so callers may draw
/// unconditionally.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebugLines {
    enabled: bool,
    lines: Vec<DebugLine>,
}

impl DebugLines {
    #[allow(missing_docs)]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines: Vec::new(),
        }
    }

    #[allow(missing_docs)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the sink. Disabling does not remove existing lines.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The lines currently held.
    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    /// Adds a line if the sink is enabled.
    pub fn draw_line(&mut self, start: FreePoint, end: FreePoint, color: Rgb, duration: f32) {
        if self.enabled {
            self.draw_line_forced(start, end, color, duration);
        }
    }

    /// Adds a line even if the sink is disabled.
    pub fn draw_line_forced(&mut self, start: FreePoint, end: FreePoint, color: Rgb, duration: f32) {
        self.lines.push(DebugLine {
            start,
            end,
            color,
            duration,
        });
    }

    /// Advances time by `dt` seconds, dropping lines whose lifetime has run out.
    pub fn flush(&mut self, dt: f32) {
        self.lines.retain_mut(|line| {
            line.duration -= dt;
            line.duration > 0.0
        });
    }

    /// Removes all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Draws the 12 edges of an axis-aligned cube, for one frame.
    pub fn draw_cube(&mut self, center: FreePoint, size: FreeCoordinate, color: Rgb) {
        let corners = crate::math::Aab::from_center_size(center, size).corner_points();
        for (a, b) in CUBE_EDGES {
            self.draw_line(corners[a], corners[b], color, 0.0);
        }
    }

    /// Draws a latitude/longitude wireframe sphere, for one frame.
    pub fn draw_sphere(
        &mut self,
        center: FreePoint,
        radius: FreeCoordinate,
        latitudes: u32,
        longitudes: u32,
        color: Rgb,
    ) {
        let latitudes = latitudes.max(2);
        let longitudes = longitudes.max(3);
        let point = |lat: u32, lon: u32| {
            let theta = PI * lat as f32 / latitudes as f32;
            let phi = TAU * lon as f32 / longitudes as f32;
            center + vec3(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()) * radius
        };
        for lat in 0..latitudes {
            for lon in 0..longitudes {
                // Rings at the poles are degenerate.
                if lat > 0 {
                    self.draw_line(point(lat, lon), point(lat, lon + 1), color, 0.0);
                }
                self.draw_line(point(lat, lon), point(lat + 1, lon), color, 0.0);
            }
        }
    }

    /// Draws the edges of a world's transformed cube, for one frame.
    pub fn draw_world_bounds(&mut self, world: &VoxelWorld, color: Rgb) {
        let corners = world.corners();
        for (a, b) in CUBE_EDGES {
            self.draw_line(corners[a], corners[b], color, 0.0);
        }
    }

    /// Draws the three coordinate axes from the origin in their conventional colors,
    /// for one frame.
    pub fn draw_axes(&mut self, length: FreeCoordinate) {
        let origin = point3(0.0, 0.0, 0.0);
        for axis in Axis::ALL {
            self.draw_line(
                origin,
                origin + axis.unit_vector() * length,
                axis.color(),
                0.0,
            );
        }
    }
}
