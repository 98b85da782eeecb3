//! Computing the light arriving along a ray: the path tracer and the debug views.

use brickwork::environment::Environment;
use brickwork::hit::Hit;
use brickwork::math::{
    EPSILON, FreeCoordinate, FreePoint, FreeVector, MISS_DISTANCE, Rgb, WORLD_SIZE, reflect,
    refract, random_hemisphere_direction,
};
use brickwork::raycast::Ray;
use brickwork::scene::Scene;
use brickwork::settings::Settings;
use core::f32::consts::PI;
use euclid::vec3;
use rand::Rng;


/// What was seen along a primary ray.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct PixelSample {
    /// Radiance, not yet tone mapped.
    pub color: Rgb,
    /// Distance to the first surface, or [`MISS_DISTANCE`].
    pub depth: FreeCoordinate,
    /// Normal of the first surface, or zero if there is none.
    pub normal: FreeVector,
    /// Traversal steps taken to find the first surface.
    pub steps: u32,
}

impl PixelSample {
    /// Whether the ray struck a voxel or the floor.
    pub fn is_hit(&self) -> bool {
        self.depth < MISS_DISTANCE
    }
}

/// Shades rays cast into a [`Scene`] according to the [`Settings`].
///
/// Which computation is done for a primary ray is decided by
/// [`Integrator::trace_primary()`], in this order of precedence:
///
/// 1. [`Settings::step_through`]: the traversal cost, as a shade of grey, for every ray
///    that entered a world, whether or not it struck anything.
/// 2. [`Settings::normals`]: the surface normal, mapped from `[-1, 1]` to `[0, 1]`.
/// 3. [`Settings::uv`]: the texture coordinates, as red and green.
/// 4. [`Settings::path_tracing`]: the full path tracer, [`Integrator::trace_path()`].
/// 5. Otherwise, direct lighting of the surface color only.
///
/// Otherwise, rays which hit nothing see the [`Environment`].
#[derive(Clone, Copy, Debug)]
pub struct Integrator<'a> {
    scene: &'a Scene,
    settings: &'a Settings,
    environment: &'a Environment,
}

impl<'a> Integrator<'a> {
    #[allow(missing_docs)]
    pub fn new(scene: &'a Scene, settings: &'a Settings, environment: &'a Environment) -> Self {
        Self {
            scene,
            settings,
            environment,
        }
    }

    /// Shades a ray from the camera.
    pub fn trace_primary(&self, ray: &Ray, rng: &mut impl Rng) -> PixelSample {
        let settings = self.settings;
        let hit = self.scene.find_nearest(ray);
        let steps = hit.steps();
        let missed = |color: Rgb| PixelSample {
            color,
            depth: MISS_DISTANCE,
            normal: FreeVector::zero(),
            steps,
        };
        let surface = |color: Rgb| PixelSample {
            color,
            depth: hit.t(),
            normal: hit.normal(),
            steps,
        };

        if settings.step_through {
            if steps == 0 {
                return missed(self.sky(ray.direction));
            }
            // Twice the diagonal of a default world.
            let scale = ((3 * WORLD_SIZE * WORLD_SIZE) as f32).sqrt() * 2.0;
            let cost = Rgb::from_luminance(steps as f32 / scale);
            return if hit.is_hit() {
                surface(cost)
            } else {
                missed(cost)
            };
        }
        if settings.normals || settings.uv {
            if !hit.is_hit() {
                return missed(self.sky(ray.direction));
            }
            return surface(if settings.normals {
                let n = hit.normal();
                Rgb::new(n.x + 1.0, n.y + 1.0, n.z + 1.0) * 0.5
            } else {
                let [u, v] = hit.uv();
                Rgb::new(u, v, 0.0)
            });
        }

        if settings.path_tracing {
            if let Some(t) = self.floor_distance(ray, hit.t()) {
                return PixelSample {
                    color: self.shade_floor(ray.at(t), rng),
                    depth: t,
                    normal: vec3(0.0, 1.0, 0.0),
                    steps,
                };
            }
            let color = self.shade_path(ray, &hit, 0, rng);
            return if hit.is_hit() {
                surface(color)
            } else {
                missed(color)
            };
        }

        if !hit.is_hit() {
            return missed(self.sky(ray.direction));
        }
        let albedo = hit.albedo(self.scene.materials());
        surface(self.direct_lighting(hit.point(), hit.normal(), rng) * albedo)
    }

    /// Radiance arriving along `ray`, which is the `depth`th segment of its path.
    pub fn trace_path(&self, ray: &Ray, depth: u32, rng: &mut impl Rng) -> Rgb {
        let hit = self.scene.find_nearest(ray);
        if let Some(t) = self.floor_distance(ray, hit.t()) {
            return self.shade_floor(ray.at(t), rng);
        }
        self.shade_path(ray, &hit, depth, rng)
    }

    /// Sum of the light arriving at a surface from every light source, taking shadows
    /// into account.
    pub fn direct_lighting(&self, point: FreePoint, normal: FreeVector, rng: &mut impl Rng) -> Rgb {
        self.settings
            .lights
            .iter()
            .map(|light| light.contribution(self.scene, point, normal, rng))
            .sum()
    }

    // --------------------------------------------------------------------------------------------

    /// The path tracer after the nearest voxel has been found; see [`Self::trace_path()`].
    fn shade_path(&self, ray: &Ray, hit: &Hit, depth: u32, rng: &mut impl Rng) -> Rgb {
        let settings = self.settings;
        let direction = ray.direction;
        if !hit.is_hit() {
            return self.sky(direction);
        }
        if depth > settings.max_depth {
            return Rgb::ZERO;
        }
        let roulette = depth > settings.min_depth_russian_roulette;
        if roulette && rng.random::<f32>() < settings.russian_roulette_threshold {
            return Rgb::ZERO;
        }

        let material = hit.material(self.scene.materials());
        let albedo = hit.albedo(self.scene.materials());
        let point = hit.point();
        let normal = hit.normal();

        let mut reflectivity = material.reflectivity(-direction, normal);
        let diffuseness = 1.0 - reflectivity - material.transparency;
        if material.metallic > 0.0 {
            reflectivity += (1.0 - reflectivity) * material.metallic;
        }

        let mut out = material.emission();

        if reflectivity > 0.0 {
            let reflected = Ray::new(point + normal * EPSILON, reflect(direction, normal));
            let tint = Rgb::ONE.lerp(albedo, material.metallic);
            out += self.trace_path(&reflected, depth + 1, rng) * tint * reflectivity;
        }

        if material.transparency > 0.0 {
            let color = material.transmitted(albedo, hit.t());
            let refracted = refract(direction, normal, 1.0 / material.ior);
            let exit = self
                .scene
                .find_nearest_empty(&Ray::new(point + refracted * EPSILON, refracted));
            let beyond = if exit.is_hit() {
                let onward = Ray::new(exit.point() + refracted * EPSILON, refracted);
                self.trace_path(&onward, depth + 1, rng)
            } else {
                self.sky(refracted)
            };
            out += beyond * color;
        }

        if diffuseness > 0.0 && material.metallic < 1.0 {
            let weight = (1.0 - material.metallic) * diffuseness;
            let brdf = albedo / PI;
            out += brdf * self.direct_lighting(point, normal, rng) * weight;
            if depth + 1 < settings.max_depth {
                let bounce = Ray::new(
                    point + normal * EPSILON,
                    random_hemisphere_direction(normal, rng),
                );
                out += brdf * self.trace_path(&bounce, depth + 1, rng) * weight;
            }
        }

        if roulette {
            out /= 1.0 - settings.russian_roulette_threshold;
        }
        out
    }

    /// Distance along `ray` to the floor plane, if the floor is enabled and nearer than
    /// `nearest`.
    fn floor_distance(&self, ray: &Ray, nearest: FreeCoordinate) -> Option<FreeCoordinate> {
        if !self.settings.render_floor {
            return None;
        }
        let t = (self.settings.floor.y - ray.origin.y) / ray.direction.y;
        (t > 0.0 && t < nearest).then_some(t)
    }

    fn shade_floor(&self, point: FreePoint, rng: &mut impl Rng) -> Rgb {
        self.settings.floor.color * self.direct_lighting(point, vec3(0.0, 1.0, 0.0), rng)
    }

    fn sky(&self, direction: FreeVector) -> Rgb {
        self.environment.sample(self.settings, direction)
    }
}
