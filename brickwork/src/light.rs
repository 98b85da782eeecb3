//! Light sources for direct illumination.

use euclid::{point3, vec3};
use rand::Rng;

use crate::debug_lines::DebugLines;
use crate::math::{
    EPSILON, FreeCoordinate, FreePoint, FreeVector, MISS_DISTANCE, Rgb, rotation_matrix,
    transform_vector,
};
use crate::raycast::Ray;
use crate::scene::Scene;

/// A source of direct illumination.
///
/// Each variant computes the light arriving at a surface point with
/// [`Light::contribution()`], casting its own shadow rays into the [`Scene`].
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(tag = "type"))]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Light {
    /// Light arriving equally from every direction, never shadowed.
    Ambient { color: Rgb, intensity: f32 },

    /// Light radiating from a point.
    Point {
        position: FreePoint,
        color: Rgb,
        intensity: f32,
        attenuation: Attenuation,
    },

    /// A point light which only shines within a cone around `direction`.
    ///
    /// `cutoff` and `outer_cutoff` are half-angles in radians; the light fades smoothly
    /// from full strength at `cutoff` to nothing at `outer_cutoff`.
    Spot {
        position: FreePoint,
        direction: FreeVector,
        color: Rgb,
        intensity: f32,
        cutoff: f32,
        outer_cutoff: f32,
        attenuation: Attenuation,
    },

    /// A rectangle which emits light from one side.
    ///
    /// Before rotation, the rectangle is centered on `position`, spans `size[0]` along X
    /// and `size[1]` along Z, and faces −Y. It is sampled with `samples²` jittered points.
    Area {
        position: FreePoint,
        size: [f32; 2],
        rotation: FreeVector,
        color: Rgb,
        intensity: f32,
        samples: u32,
    },

    /// Parallel light travelling along `direction`, as from a distant sun.
    Directional {
        direction: FreeVector,
        color: Rgb,
        intensity: f32,
    },
}

/// Falloff of a light with distance `d`: `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_structs, missing_docs)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    /// No falloff at all.
    pub const NONE: Self = Self {
        constant: 1.0,
        linear: 0.0,
        quadratic: 0.0,
    };

    /// Returns the fraction of light remaining at the given distance.
    #[inline]
    pub fn factor(&self, distance: FreeCoordinate) -> f32 {
        let denominator =
            self.constant + self.linear * distance + self.quadratic * distance * distance;
        1.0 / denominator.max(EPSILON)
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self::NONE
    }
}

impl Light {
    /// The lights a new [`Settings`](crate::settings::Settings) starts with: a dim sun, a
    /// faint point light, a switched-off area light, and a little ambient light.
    pub fn default_rig() -> Vec<Light> {
        vec![
            Light::Directional {
                direction: vec3(0.58, -0.63, -0.53).normalize(),
                color: Rgb::ONE,
                intensity: 0.2,
            },
            Light::Point {
                position: point3(0.13, 0.08, 0.2),
                color: Rgb::ONE,
                intensity: 0.032,
                attenuation: Attenuation {
                    constant: 5.0,
                    linear: 0.09,
                    quadratic: 0.032,
                },
            },
            Light::Area {
                position: point3(-2.8, 2.6, -2.3),
                size: [0.5, 0.5],
                rotation: vec3(-2.09, 1.78, -1.37),
                color: Rgb::ONE,
                intensity: 0.0,
                samples: 1,
            },
            Light::Ambient {
                color: Rgb::ONE,
                intensity: 0.01,
            },
        ]
    }

    /// Scalar strength of the light. Lights with zero intensity contribute nothing and
    /// are not sampled.
    pub fn intensity(&self) -> f32 {
        match *self {
            Light::Ambient { intensity, .. }
            | Light::Point { intensity, .. }
            | Light::Spot { intensity, .. }
            | Light::Area { intensity, .. }
            | Light::Directional { intensity, .. } => intensity,
        }
    }

    /// Color of the light, not including intensity.
    pub fn color(&self) -> Rgb {
        match *self {
            Light::Ambient { color, .. }
            | Light::Point { color, .. }
            | Light::Spot { color, .. }
            | Light::Area { color, .. }
            | Light::Directional { color, .. } => color,
        }
    }

    /// Light arriving at `point` on a surface with unit normal `normal`.
    ///
    /// `rng` is used only by area lights.
    pub fn contribution(
        &self,
        scene: &Scene,
        point: FreePoint,
        normal: FreeVector,
        rng: &mut impl Rng,
    ) -> Rgb {
        let intensity = self.intensity();
        if intensity <= 0.0 {
            return Rgb::ZERO;
        }
        let strength = match *self {
            Light::Ambient { .. } => 1.0,
            Light::Point {
                position,
                attenuation,
                ..
            } => match visible_toward(scene, point, normal, position) {
                Some(v) => v.cos_surface * attenuation.factor(v.distance),
                None => 0.0,
            },
            Light::Spot {
                position,
                direction,
                cutoff,
                outer_cutoff,
                attenuation,
                ..
            } => {
                let cone = cone_factor(
                    (point - position).normalize().dot(direction.normalize()),
                    cutoff,
                    outer_cutoff,
                );
                if cone <= 0.0 {
                    return Rgb::ZERO;
                }
                match visible_toward(scene, point, normal, position) {
                    Some(v) => cone * v.cos_surface * attenuation.factor(v.distance),
                    None => 0.0,
                }
            }
            Light::Area {
                position,
                size: [width, height],
                rotation,
                samples,
                ..
            } => {
                let [right, forward, light_normal] = area_frame(rotation);
                let n = samples.max(1);
                let mut sum = 0.0;
                for i in 0..n {
                    for j in 0..n {
                        let s = ((i as f32 + rng.random::<f32>()) / n as f32 - 0.5) * width;
                        let t = ((j as f32 + rng.random::<f32>()) / n as f32 - 0.5) * height;
                        let sample_point = position + right * s + forward * t;
                        if let Some(v) = visible_toward(scene, point, normal, sample_point) {
                            let cos_light = (-light_normal.dot(v.direction)).max(0.0);
                            sum += v.cos_surface * cos_light / (v.distance * v.distance);
                        }
                    }
                }
                sum / (n * n) as f32
            }
            Light::Directional { direction, .. } => {
                let toward_light = -direction.normalize();
                let cos_surface = normal.dot(toward_light);
                if cos_surface <= 0.0 {
                    return Rgb::ZERO;
                }
                let shadow_ray = Ray::new(point + normal * EPSILON, toward_light);
                if scene.is_occluded(&shadow_ray, MISS_DISTANCE) {
                    0.0
                } else {
                    cos_surface
                }
            }
        };
        self.color() * (strength * intensity)
    }

    /// Draws a representation of the light into `sink`.
    pub fn wireframe(&self, sink: &mut DebugLines) {
        const MARKER_SIZE: f32 = 0.05;
        match *self {
            Light::Ambient { .. } => {}
            Light::Point {
                position, color, ..
            } => sink.draw_cube(position, MARKER_SIZE, color),
            Light::Spot {
                position,
                direction,
                color,
                ..
            } => {
                sink.draw_cube(position, MARKER_SIZE, color);
                sink.draw_line(
                    position,
                    position + direction.normalize() * (MARKER_SIZE * 4.0),
                    color,
                    0.0,
                );
            }
            Light::Area {
                position,
                size: [width, height],
                rotation,
                color,
                ..
            } => {
                let [right, forward, _] = area_frame(rotation);
                let (r, f) = (right * (width / 2.0), forward * (height / 2.0));
                let corners = [
                    position - r - f,
                    position + r - f,
                    position + r + f,
                    position - r + f,
                ];
                for (i, &corner) in corners.iter().enumerate() {
                    sink.draw_line(corner, corners[(i + 1) % 4], color, 0.0);
                }
            }
            Light::Directional {
                direction, color, ..
            } => {
                let origin = point3(0.0, 0.0, 0.0);
                sink.draw_line(origin, origin + direction.normalize(), color, 0.0);
            }
        }
    }
}

/// Unoccluded path from a surface point to a point on a light.
struct Visibility {
    direction: FreeVector,
    distance: FreeCoordinate,
    cos_surface: f32,
}

/// Returns the path from `point` to `target` if the surface faces the target and no voxel
/// lies between them.
fn visible_toward(
    scene: &Scene,
    point: FreePoint,
    normal: FreeVector,
    target: FreePoint,
) -> Option<Visibility> {
    let offset = target - point;
    let distance = offset.length();
    if distance <= 0.0 {
        return None;
    }
    let direction = offset / distance;
    let cos_surface = normal.dot(direction);
    if cos_surface <= 0.0 {
        return None;
    }
    let shadow_ray = Ray::new(point + normal * EPSILON, direction);
    if scene.is_occluded(&shadow_ray, distance) {
        return None;
    }
    Some(Visibility {
        direction,
        distance,
        cos_surface,
    })
}

/// Spotlight strength for a point at angle `acos(cos_theta)` from the spot's axis.
fn cone_factor(cos_theta: f32, cutoff: f32, outer_cutoff: f32) -> f32 {
    let cos_inner = cutoff.cos();
    let cos_outer = outer_cutoff.cos();
    if cos_inner <= cos_outer {
        return if cos_theta >= cos_outer { 1.0 } else { 0.0 };
    }
    ((cos_theta - cos_outer) / (cos_inner - cos_outer)).clamp(0.0, 1.0)
}

/// The rotated X, Z, and −Y axes of an area light.
fn area_frame(rotation: FreeVector) -> [FreeVector; 3] {
    let matrix = rotation_matrix(rotation);
    [
        transform_vector(&matrix, vec3(1.0, 0.0, 0.0)),
        transform_vector(&matrix, vec3(0.0, 0.0, 1.0)),
        transform_vector(&matrix, vec3(0.0, -1.0, 0.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PackedVoxel;
    use crate::world::VoxelWorld;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng as _;
    use rand_xoshiro::Xoshiro256Plus;

    const UP: FreeVector = vec3(0.0, 1.0, 0.0);

    fn rng() -> Xoshiro256Plus {
        Xoshiro256Plus::seed_from_u64(1)
    }

    fn point_light_at(position: FreePoint) -> Light {
        Light::Point {
            position,
            color: Rgb::new(1.0, 0.5, 0.25),
            intensity: 2.0,
            attenuation: Attenuation::NONE,
        }
    }

    #[test]
    fn ambient_is_constant() {
        let light = Light::Ambient {
            color: Rgb::new(1.0, 0.5, 0.0),
            intensity: 0.5,
        };
        let c = light.contribution(&Scene::new(), point3(3.0, 4.0, 5.0), UP, &mut rng());
        assert_eq!(c, Rgb::new(0.5, 0.25, 0.0));
    }

    #[test]
    fn point_light_overhead() {
        let light = point_light_at(point3(0.0, 2.0, 0.0));
        let c = light.contribution(&Scene::new(), point3(0.0, 0.0, 0.0), UP, &mut rng());
        assert_eq!(c, Rgb::new(2.0, 1.0, 0.5));

        // Same light, but falling off with distance 2.
        let attenuated = Light::Point {
            position: point3(0.0, 2.0, 0.0),
            color: Rgb::ONE,
            intensity: 1.0,
            attenuation: Attenuation {
                constant: 0.0,
                linear: 0.0,
                quadratic: 1.0,
            },
        };
        let c = attenuated.contribution(&Scene::new(), point3(0.0, 0.0, 0.0), UP, &mut rng());
        assert!((c.red() - 0.25).abs() < 1e-5, "{c:?}");
    }

    #[test]
    fn point_light_behind_surface() {
        let light = point_light_at(point3(0.0, -2.0, 0.0));
        let c = light.contribution(&Scene::new(), point3(0.0, 0.0, 0.0), UP, &mut rng());
        assert_eq!(c, Rgb::ZERO);
    }

    #[test]
    fn point_light_shadowed_by_voxel() {
        let surface = point3(0.503, -0.5, 0.503);
        let light = point_light_at(point3(0.503, 2.0, 0.503));
        let mut scene = Scene::new();
        scene.add_world(VoxelWorld::default());
        assert!(!light.contribution(&scene, surface, UP, &mut rng()).is_black());

        scene.set(0, [64, 64, 64], PackedVoxel::new(0xffffff, 0));
        assert_eq!(
            light.contribution(&scene, surface, UP, &mut rng()),
            Rgb::ZERO
        );
    }

    #[test]
    fn spot_cone() {
        let spot = Light::Spot {
            position: point3(0.0, 1.0, 0.0),
            direction: vec3(0.0, -1.0, 0.0),
            color: Rgb::ONE,
            intensity: 1.0,
            cutoff: 0.3,
            outer_cutoff: 0.5,
            attenuation: Attenuation::NONE,
        };
        let scene = Scene::new();
        let at_x = |x: f32| {
            spot.contribution(&scene, point3(x, 0.0, 0.0), UP, &mut rng())
                .red()
        };
        assert_eq!(at_x(0.0), 1.0);
        assert_eq!(at_x(1.0), 0.0);
        let penumbra = at_x(0.4f32.tan());
        assert!(penumbra > 0.0 && penumbra < 1.0, "{penumbra}");
    }

    #[test]
    fn directional() {
        let sun = Light::Directional {
            direction: vec3(0.0, -2.0, 0.0),
            color: Rgb::ONE,
            intensity: 0.5,
        };
        let scene = Scene::new();
        let origin = point3(0.0, 0.0, 0.0);
        assert_eq!(
            sun.contribution(&scene, origin, UP, &mut rng()),
            Rgb::new(0.5, 0.5, 0.5)
        );
        assert_eq!(
            sun.contribution(&scene, origin, vec3(1.0, 0.0, 0.0), &mut rng()),
            Rgb::ZERO
        );
    }

    #[test]
    fn area_light_emits_downward_only() {
        let area = |rotation: FreeVector| Light::Area {
            position: point3(0.0, 1.0, 0.0),
            size: [0.01, 0.01],
            rotation,
            color: Rgb::ONE,
            intensity: 1.0,
            samples: 2,
        };
        let facing_down = area(FreeVector::zero());
        let scene = Scene::new();
        let origin = point3(0.0, 0.0, 0.0);
        let c = facing_down.contribution(&scene, origin, UP, &mut rng());
        assert!((c.red() - 1.0).abs() < 1e-3, "{c:?}");

        let facing_up = area(vec3(core::f32::consts::PI, 0.0, 0.0));
        let c = facing_up.contribution(&scene, origin, UP, &mut rng());
        assert!(c.red() < 1e-6, "{c:?}");
    }

    #[test]
    fn zero_intensity_is_skipped() {
        let rig = Light::default_rig();
        assert_eq!(rig.len(), 4);
        let area = &rig[2];
        assert_eq!(area.intensity(), 0.0);
        assert_eq!(
            area.contribution(&Scene::new(), point3(-2.8, 0.0, -2.3), UP, &mut rng()),
            Rgb::ZERO
        );
    }

    #[test]
    fn wireframes() {
        let mut sink = DebugLines::new(true);
        for light in Light::default_rig() {
            light.wireframe(&mut sink);
        }
        // directional 1 + point 12 + area 4 + ambient 0
        assert_eq!(sink.lines().len(), 17);
    }
}
