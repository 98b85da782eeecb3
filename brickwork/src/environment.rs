//! Light arriving from outside the scene: an HDR environment map or an analytic sky.

use core::f32::consts::{PI, TAU};
use core::fmt;

use imgref::ImgVec;

use crate::light::Light;
use crate::math::{FreeVector, Rgb, smoothstep};
use crate::settings::Settings;

/// An equirectangular (latitude/longitude) image of the surroundings.
///
/// The top row of the image is straight up (+Y); the left column faces +X and the
/// image wraps around toward +Z.
#[derive(Clone)]
pub struct EquirectMap {
    image: ImgVec<Rgb>,
}

impl EquirectMap {
    #[allow(missing_docs)]
    pub fn new(image: ImgVec<Rgb>) -> Self {
        Self { image }
    }

    #[allow(missing_docs)]
    pub fn image(&self) -> &ImgVec<Rgb> {
        &self.image
    }

    /// Returns the texel seen looking along `direction`, which need not be normalized.
    pub fn sample(&self, direction: FreeVector) -> Rgb {
        let (width, height) = (self.image.width(), self.image.height());
        if width == 0 || height == 0 {
            return Rgb::MISSING_TEXTURE;
        }
        let direction = direction.normalize();
        let theta = direction.y.clamp(-1.0, 1.0).acos();
        let mut phi = direction.z.atan2(direction.x);
        if phi < 0.0 {
            phi += TAU;
        }
        let u = (phi / TAU).clamp(0.0, 1.0);
        let v = (theta / PI).clamp(0.0, 1.0);
        let x = ((u * width as f32) as usize).min(width - 1);
        let y = ((v * height as f32) as usize).min(height - 1);
        self.image[(x, y)]
    }
}

impl fmt::Debug for EquirectMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquirectMap")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish_non_exhaustive()
    }
}

/// Source of light for rays that leave the scene.
///
/// What is sampled depends on the [`Settings`]: nothing (black) unless
/// [`Settings::environment_light`] is set; the [`EquirectMap`] if one is loaded and
/// [`Settings::use_hdr`] is set; otherwise a gradient sky with a sun.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    map: Option<EquirectMap>,
}

impl Environment {
    /// An environment with only the analytic sky available.
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment which can also use the given map.
    pub fn with_map(map: EquirectMap) -> Self {
        Self { map: Some(map) }
    }

    #[allow(missing_docs)]
    pub fn map(&self) -> Option<&EquirectMap> {
        self.map.as_ref()
    }

    #[allow(missing_docs)]
    pub fn set_map(&mut self, map: Option<EquirectMap>) {
        self.map = map;
    }

    /// Light arriving from the given direction, which must be of unit length.
    pub fn sample(&self, settings: &Settings, direction: FreeVector) -> Rgb {
        if !settings.environment_light {
            return Rgb::ZERO;
        }
        match &self.map {
            Some(map) if settings.use_hdr => map.sample(direction),
            _ => sky(settings, direction),
        }
    }
}

/// Gradient from horizon to zenith above, a flat ground color below, and a sun disc in
/// the direction opposite the sun light's travel.
fn sky(settings: &Settings, direction: FreeVector) -> Rgb {
    let sky_t = smoothstep(0.0, 0.4, direction.y).powf(0.35);
    let ground_t = smoothstep(-0.01, 0.0, direction.y);
    let sky = settings.sky_horizon.lerp(settings.sky_zenith, sky_t);

    let sun = match settings.sun() {
        Some(&Light::Directional {
            direction: sun_direction,
            intensity,
            ..
        }) if ground_t >= 1.0 => {
            let facing = direction.dot(-sun_direction.normalize()).max(0.0);
            (facing.powf(settings.sun_size) * intensity).min(1.0)
        }
        _ => 0.0,
    };
    settings.ground_color.lerp(sky, ground_t) + Rgb::from_luminance(sun)
}
