//! [`Settings`]: every user-adjustable option that affects how frames are rendered.

use core::fmt;

use crate::automata::AutomataSettings;
use crate::light::Light;
use crate::math::{Rgb, WORLD_SIZE};

/// Options for rendering a [`Scene`](crate::scene::Scene).
///
/// Some combinations of options conflict; [`Settings::repair()`] resolves them, and
/// renderers apply the same precedence if given unrepaired settings.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[non_exhaustive]
pub struct Settings {
    /// Shade with the full path tracer rather than direct lighting only.
    pub path_tracing: bool,
    /// Display the number of traversal steps each primary ray took. Overrides every
    /// other shading mode.
    pub step_through: bool,
    /// Display surface normals.
    pub normals: bool,
    /// Display texture coordinates.
    pub uv: bool,
    /// Draw light and world outlines over the image.
    pub debug_draw: bool,
    /// Draw the contents of the [`DebugLines`](crate::debug_lines::DebugLines) sink.
    pub debug_lines: bool,

    /// Average successive frames while the camera is still.
    pub accumulate: bool,
    /// Blend each frame with the previous one, reprojected through the camera's motion.
    /// Takes priority over [`accumulate`](Self::accumulate).
    pub reprojection: bool,

    /// Trace a grid of subpixel samples for every pixel.
    pub anti_aliasing: bool,
    /// Offset each pixel's sample randomly within the pixel.
    /// [`anti_aliasing`](Self::anti_aliasing) takes priority.
    pub jitter: bool,
    /// Number of anti-aliasing samples; rounded down to a square.
    pub anti_aliasing_samples: u32,

    /// Each frame, set the focal distance from whatever is at the center of the image.
    pub focus_center: bool,
    /// Each frame, set the focal distance from whatever is at
    /// [`focus_pixel`](Self::focus_pixel).
    pub focus_mouse: bool,
    /// Pixel used by [`focus_mouse`](Self::focus_mouse).
    pub focus_pixel: [u32; 2],

    /// Maximum number of bounces of a path.
    pub max_depth: u32,
    /// Probability of terminating a path at each bounce past
    /// [`min_depth_russian_roulette`](Self::min_depth_russian_roulette).
    pub russian_roulette_threshold: f32,
    /// Bounces after which paths may be terminated at random.
    pub min_depth_russian_roulette: u32,

    /// Largest depth difference for which a reprojected sample is reused.
    pub reprojection_depth_threshold: f32,
    /// Smallest cosine between normals considered the same surface.
    ///
    /// Saved and loaded with the other settings, but reuse of reprojected samples is
    /// decided by [`reprojection_depth_threshold`](Self::reprojection_depth_threshold)
    /// alone.
    pub reprojection_normal_threshold: f32,
    /// Weight of the reprojected sample when depths agree exactly.
    pub reprojection_blend: f32,

    /// Scale factor applied to scene radiance before tone mapping.
    pub exposure: f32,
    #[allow(missing_docs)]
    pub tone_mapping: ToneMapping,

    /// Whether rays which hit nothing receive light from the sky. If false, they are black.
    pub environment_light: bool,
    /// Use the loaded HDR environment map, if any, instead of the analytic sky.
    pub use_hdr: bool,

    /// Whether to draw an infinite floor plane.
    pub render_floor: bool,
    #[allow(missing_docs)]
    pub floor: Plane,

    /// Sharpness of the sun's disc in the analytic sky; larger is smaller.
    pub sun_size: f32,
    /// Sky color straight up.
    pub sky_zenith: Rgb,
    /// Sky color at the horizon.
    pub sky_horizon: Rgb,
    /// Color of the environment below the horizon.
    pub ground_color: Rgb,

    /// Parameters of the cellular automata mode.
    pub automata: AutomataSettings,

    /// Light sources. The first [`Light::Directional`] also acts as the sky's sun.
    pub lights: Vec<Light>,
}

impl Settings {
    /// Resolves conflicting options and clamps values to their usable ranges.
    ///
    /// * Anti-aliasing disables jitter.
    /// * Reprojection disables accumulation.
    /// * Step-through display disables normal and UV display; normal display disables
    ///   UV display.
    #[must_use]
    pub fn repair(mut self) -> Self {
        if self.anti_aliasing {
            self.jitter = false;
        }
        if self.reprojection {
            self.accumulate = false;
        }
        if self.step_through {
            self.normals = false;
            self.uv = false;
        }
        if self.normals {
            self.uv = false;
        }

        self.max_depth = self.max_depth.min(32);
        self.anti_aliasing_samples = self.anti_aliasing_samples.max(1);
        self.russian_roulette_threshold = zero_one(self.russian_roulette_threshold);
        self.reprojection_depth_threshold = zero_one(self.reprojection_depth_threshold);
        self.reprojection_normal_threshold = zero_one(self.reprojection_normal_threshold);
        self.reprojection_blend = zero_one(self.reprojection_blend);
        self.exposure = non_negative(self.exposure);
        self.sun_size = non_negative(self.sun_size);

        let automata = &mut self.automata;
        automata.rule.start_state = automata.rule.start_state.max(2);
        automata.probability = zero_one(automata.probability);
        automata.fps = non_negative(automata.fps);
        automata.radius = automata.radius.clamp(0, WORLD_SIZE / 2);
        self
    }

    /// The light that the analytic sky draws as the sun: the first directional light.
    pub fn sun(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|light| matches!(light, Light::Directional { .. }))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            path_tracing: true,
            step_through: false,
            normals: false,
            uv: false,
            debug_draw: true,
            debug_lines: false,
            accumulate: false,
            reprojection: true,
            anti_aliasing: false,
            jitter: false,
            anti_aliasing_samples: 4,
            focus_center: true,
            focus_mouse: false,
            focus_pixel: [0, 0],
            max_depth: 2,
            russian_roulette_threshold: 0.5,
            min_depth_russian_roulette: 3,
            reprojection_depth_threshold: 0.05,
            reprojection_normal_threshold: 0.85,
            reprojection_blend: 0.85,
            exposure: 1.0,
            tone_mapping: ToneMapping::Reinhard,
            environment_light: false,
            use_hdr: true,
            render_floor: false,
            floor: Plane::default(),
            sun_size: 100.0,
            sky_zenith: Rgb::new(0.08, 0.35, 0.75),
            sky_horizon: Rgb::ONE,
            ground_color: Rgb::new(0.35, 0.3, 0.35),
            automata: AutomataSettings::default(),
            lights: Light::default_rig(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            path_tracing,
            step_through,
            normals,
            uv,
            debug_draw,
            debug_lines,
            accumulate,
            reprojection,
            anti_aliasing,
            jitter,
            anti_aliasing_samples,
            focus_center,
            focus_mouse,
            focus_pixel: [focus_x, focus_y],
            max_depth,
            russian_roulette_threshold,
            min_depth_russian_roulette,
            reprojection_depth_threshold,
            reprojection_normal_threshold,
            reprojection_blend,
            exposure,
            tone_mapping,
            environment_light,
            use_hdr,
            render_floor,
            floor,
            sun_size,
            sky_zenith,
            sky_horizon,
            ground_color,
            automata,
            lights,
        } = self;
        // Lights are summarized by kind; their vector fields are too long to be useful here.
        let light_kinds: Vec<&'static str> = lights.iter().map(<&'static str>::from).collect();
        f.debug_struct("Settings")
            .field("path_tracing", path_tracing)
            .field("step_through", step_through)
            .field("normals", normals)
            .field("uv", uv)
            .field("debug_draw", debug_draw)
            .field("debug_lines", debug_lines)
            .field("accumulate", accumulate)
            .field("reprojection", reprojection)
            .field("anti_aliasing", anti_aliasing)
            .field("jitter", jitter)
            .field("anti_aliasing_samples", anti_aliasing_samples)
            .field("focus_center", focus_center)
            .field("focus_mouse", focus_mouse)
            .field("focus_pixel", &format_args!("{focus_x}, {focus_y}"))
            .field("max_depth", max_depth)
            .field("russian_roulette_threshold", russian_roulette_threshold)
            .field("min_depth_russian_roulette", min_depth_russian_roulette)
            .field("reprojection_depth_threshold", reprojection_depth_threshold)
            .field("reprojection_normal_threshold", reprojection_normal_threshold)
            .field("reprojection_blend", reprojection_blend)
            .field("exposure", exposure)
            .field("tone_mapping", tone_mapping)
            .field("environment_light", environment_light)
            .field("use_hdr", use_hdr)
            .field("render_floor", render_floor)
            .field("floor", floor)
            .field("sun_size", sun_size)
            .field("sky_zenith", sky_zenith)
            .field("sky_horizon", sky_horizon)
            .field("ground_color", ground_color)
            .field("automata", automata)
            .field("lights", &light_kinds)
            .finish()
    }
}

fn zero_one(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

// -------------------------------------------------------------------------------------------------

/// A horizontal plane at height `y`, drawn when [`Settings::render_floor`] is set.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_structs)]
pub struct Plane {
    /// Height of the plane.
    pub y: f32,
    /// Albedo of the plane.
    pub color: Rgb,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            y: 0.0,
            color: Rgb::new(0.5, 0.5, 0.5),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Method of mapping scene radiance to displayable colors; part of [`Settings`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum::EnumIter, strum::IntoStaticStr)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ToneMapping {
    /// Exposure only; values above 1 will be clipped.
    None,
    /// `c / (c + 1)`.
    #[default]
    Reinhard,
    /// Reinhard, with the exposure also compressed as `e / (e + 1)`.
    ReinhardModified,
    /// John Hable's filmic curve from Uncharted 2.
    Uncharted2,
    /// `a / (a + 3.31c² + 0.21c²)` where `a = c(2.51c + 0.03)`, after the first terms of
    /// the ACES filmic fit. Nonpositive channels map to 0.
    Aces,
}

impl ToneMapping {
    /// Applies this operator to each channel of `color`, with the given exposure.
    ///
    /// Every operator maps black to black. The result is not clamped.
    #[inline]
    pub fn apply(self, color: Rgb, exposure: f32) -> Rgb {
        match self {
            ToneMapping::None => color * exposure,
            ToneMapping::Reinhard => color.map(|c| c / (c + 1.0)) * exposure,
            ToneMapping::ReinhardModified => {
                color.map(|c| c / (c + 1.0)) * (exposure / (exposure + 1.0))
            }
            ToneMapping::Uncharted2 => color.map(uncharted2) * exposure,
            ToneMapping::Aces => color.map(aces) * exposure,
        }
    }
}

fn uncharted2(c: f32) -> f32 {
    const A: f32 = 0.15;
    const B: f32 = 0.50;
    const C: f32 = 0.10;
    const D: f32 = 0.20;
    const E: f32 = 0.02;
    const F: f32 = 0.30;
    let toe = (c * (A * c + C * B)) / (c * (A * c + B) + C * D);
    let shoulder = (c * (E * c + F * D)) / (c * (E * c + D) + F * B);
    toe * (1.0 + shoulder)
}

fn aces(c: f32) -> f32 {
    if c <= 0.0 {
        return 0.0;
    }
    let a = c * (2.51 * c + 0.03);
    let b = 3.31 * c * c;
    let cc = 0.21 * c * c;
    a / (a + b + cc)
}
