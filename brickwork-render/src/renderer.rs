use core::iter::Sum;
use core::ops::AddAssign;

use brickwork::environment::Environment;
use brickwork::math::{FreePoint, Rgb};
use brickwork::scene::Scene;
use brickwork::settings::Settings;
use imgref::ImgVec;
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

use crate::camera::{Camera, Projection, Viewport};
use crate::history::{History, HistorySample, PreviousFrame, REPROJECTION_MAX_DEPTH, accumulate};
use crate::integrator::{Integrator, PixelSample};
use crate::{Flaws, RenderError};

/// Colors brighter than this, as the length of an RGB vector, are scaled down before
/// being combined with other frames.
const FIREFLY_LIMIT: f32 = 3.0;

/// Renders frames of a [`Scene`], remembering enough of the previous frames to
/// reproject or accumulate them.
///
/// A [`Renderer`] is meant to be used with one [`Camera`] over a sequence of frames; the
/// camera's previous-frame state is updated by [`Renderer::render_frame()`].
#[derive(Clone, Debug)]
pub struct Renderer {
    settings: Settings,
    environment: Environment,
    history: Option<History>,
    /// Whether `history` holds nothing from earlier frames.
    history_fresh: bool,
    frame: u64,
}

impl Renderer {
    /// Creates a renderer. The settings are [repaired](Settings::repair).
    pub fn new(settings: Settings, environment: Environment) -> Self {
        Self {
            settings: settings.repair(),
            environment,
            history: None,
            history_fresh: true,
            frame: 0,
        }
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings. They are [repaired](Settings::repair) first, and if they
    /// differ from the current ones, previous frames are forgotten.
    pub fn set_settings(&mut self, settings: Settings) {
        let settings = settings.repair();
        if settings != self.settings {
            self.settings = settings;
            self.reset_history();
        }
    }

    #[allow(missing_docs)]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Replaces the environment, forgetting previous frames.
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
        self.reset_history();
    }

    /// Number of frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Forgets all previous frames, so that the next frame is rendered from scratch.
    pub fn reset_history(&mut self) {
        if let Some(history) = &mut self.history {
            history.reset();
        }
        self.history_fresh = true;
    }

    /// Renders one frame of `scene` as seen by `camera`.
    ///
    /// If depth of field is in use and focusing is enabled, the camera's focal distance is
    /// updated first. Afterward, the camera's previous-frame state is updated to match
    /// its current state.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &mut Camera,
    ) -> Result<Rendering, RenderError> {
        let viewport = camera.viewport();
        let Viewport { width, height } = viewport;
        if viewport.is_empty() {
            return Err(RenderError::EmptyViewport { width, height });
        }
        let too_large = RenderError::ViewportTooLarge { width, height };
        let pixel_count = viewport.pixel_count().ok_or_else(|| too_large.clone())?;

        if camera.projection == Projection::DepthOfField {
            if self.settings.focus_mouse {
                camera.focus_at(scene, self.settings.focus_pixel);
            } else if self.settings.focus_center {
                camera.focus_at(scene, [width / 2, height / 2]);
            }
        }
        if self.settings.accumulate && camera.has_moved() {
            self.reset_history();
        }

        let history = match &mut self.history {
            Some(history) if history.viewport() == viewport => history,
            slot => {
                self.history_fresh = true;
                slot.insert(History::new(viewport).ok_or(too_large)?)
            }
        };
        let settings = &self.settings;
        let combining = settings.accumulate || settings.reprojection;
        let unfinished = combining && self.history_fresh;

        let frame_index = history.frame_index();
        let (current, previous) = history.split();
        let mut image = vec![[0u8; 4]; pixel_count];
        let offsets = sample_offsets(settings);

        let context = FrameContext {
            integrator: Integrator::new(scene, settings, &self.environment),
            settings,
            camera: &*camera,
            previous,
            offsets: &offsets,
            frame: self.frame,
            frame_index,
        };
        let info = render_rows(width as usize, &mut image, current, &|y, pixels, history| {
            context.render_row(y, pixels, history)
        });

        if settings.reprojection {
            history.swap();
        } else if settings.accumulate {
            history.advance();
        }
        self.history_fresh = !combining;
        camera.update_previous_state();

        let mut flaws = Flaws::empty();
        flaws.set(Flaws::UNFINISHED, unfinished);
        flaws.set(
            Flaws::NO_ANTIALIASING,
            settings.reprojection && (settings.anti_aliasing || settings.jitter),
        );
        flaws.set(Flaws::CLAMPED, info.pixels_clamped > 0);

        let frame = self.frame;
        self.frame += 1;
        log::debug!("frame {frame}: {info:?} flaws: {flaws}");

        Ok(Rendering {
            image: ImgVec::new(image, width as usize, height as usize),
            frame,
            flaws,
            info,
        })
    }
}

// -------------------------------------------------------------------------------------------------

/// A rendered frame.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Rendering {
    /// Tone mapped, linear RGBA pixels.
    pub image: ImgVec<[u8; 4]>,
    /// Sequence number of this frame, counting from zero.
    pub frame: u64,
    /// Ways in which this frame falls short of a converged image.
    pub flaws: Flaws,
    #[allow(missing_docs)]
    pub info: RenderInfo,
}

/// Statistics about a rendered frame.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct RenderInfo {
    /// Primary rays cast.
    pub rays: usize,
    /// Pixels whose primary ray struck something.
    pub pixels_hit: usize,
    /// Pixels which reused the previous frame.
    pub pixels_reused: usize,
    /// Pixels whose color was limited in brightness before combining with other frames.
    pub pixels_clamped: usize,
    /// Largest number of traversal steps taken by one primary ray.
    pub max_steps: u32,
}

impl AddAssign for RenderInfo {
    fn add_assign(&mut self, other: Self) {
        self.rays += other.rays;
        self.pixels_hit += other.pixels_hit;
        self.pixels_reused += other.pixels_reused;
        self.pixels_clamped += other.pixels_clamped;
        self.max_steps = self.max_steps.max(other.max_steps);
    }
}

impl Sum for RenderInfo {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut sum = Self::default();
        for part in iter {
            sum += part;
        }
        sum
    }
}

// -------------------------------------------------------------------------------------------------

/// Everything a row of a frame needs, shared between threads.
struct FrameContext<'a> {
    integrator: Integrator<'a>,
    settings: &'a Settings,
    camera: &'a Camera,
    previous: PreviousFrame<'a>,
    /// Subpixel offsets of the samples averaged for each pixel; empty for a single random
    /// offset.
    offsets: &'a [[f32; 2]],
    frame: u64,
    frame_index: u32,
}

impl FrameContext<'_> {
    fn render_row(
        &self,
        y: usize,
        pixels: &mut [[u8; 4]],
        history: &mut [HistorySample],
    ) -> RenderInfo {
        let settings = self.settings;
        let mut rng = Xoshiro256Plus::seed_from_u64((self.frame << 32) ^ y as u64);
        let mut info = RenderInfo::default();

        for (x, (pixel, slot)) in pixels.iter_mut().zip(history).enumerate() {
            let (x, y) = (x as u32, y as u32);
            let (sample, point) = self.sample_pixel(x, y, &mut rng, &mut info);
            let mut color = sample.color;
            if color.length_squared() > FIREFLY_LIMIT * FIREFLY_LIMIT {
                color = color.with_length(FIREFLY_LIMIT);
                info.pixels_clamped += 1;
            }

            let combined = if settings.reprojection {
                if sample.depth > REPROJECTION_MAX_DEPTH {
                    // The slot still holds the frame before last, which must not be reused.
                    *slot = HistorySample::EMPTY;
                    color
                } else {
                    let fresh = HistorySample {
                        color,
                        depth: sample.depth,
                    };
                    let (average, reused) = self.previous.reproject(
                        settings,
                        fresh,
                        self.camera.reproject(point),
                        self.camera.camera_delta(),
                    );
                    info.pixels_reused += usize::from(reused);
                    *slot = HistorySample {
                        color: average,
                        ..fresh
                    };
                    average
                }
            } else if settings.accumulate {
                accumulate(slot, color, sample.depth, self.frame_index)
            } else {
                color
            };

            *pixel = settings
                .tone_mapping
                .apply(combined, settings.exposure)
                .to_rgba8();
        }
        info
    }

    /// Traces the rays for one pixel, returning their averaged sample and the point
    /// struck by the first of them.
    fn sample_pixel(
        &self,
        x: u32,
        y: u32,
        rng: &mut Xoshiro256Plus,
        info: &mut RenderInfo,
    ) -> (PixelSample, FreePoint) {
        let mut first: Option<(PixelSample, FreePoint)> = None;
        let mut total = Rgb::ZERO;
        let mut count = 0u32;

        let mut trace = |offset: [f32; 2], rng: &mut Xoshiro256Plus| {
            let ray = self.camera.ray_for_pixel(x, y, offset, rng);
            let sample = self.integrator.trace_primary(&ray, rng);
            info.rays += 1;
            info.max_steps = info.max_steps.max(sample.steps);
            total += sample.color;
            count += 1;
            if first.is_none() {
                first = Some((sample, ray.at(sample.depth)));
            }
        };
        if self.offsets.is_empty() {
            let offset = [rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5)];
            trace(offset, rng);
        } else {
            for &offset in self.offsets {
                trace(offset, rng);
            }
        }

        let (mut sample, point) = first.unwrap_or_else(|| unreachable!("no samples traced"));
        if sample.is_hit() {
            info.pixels_hit += 1;
        }
        sample.color = total / count as f32;
        (sample, point)
    }
}

/// Subpixel offsets for the samples of each pixel, given the anti-aliasing settings.
/// An empty list means one randomly jittered sample.
fn sample_offsets(settings: &Settings) -> Vec<[f32; 2]> {
    if settings.reprojection {
        return vec![[0.0, 0.0]];
    }
    if settings.anti_aliasing {
        let side = (settings.anti_aliasing_samples as f32).sqrt().floor().max(1.0) as u32;
        let offset = |s: u32| (s as f32 + 0.5) / side as f32 - 0.5;
        return (0..side)
            .flat_map(|sy| (0..side).map(move |sx| [offset(sx), offset(sy)]))
            .collect();
    }
    if settings.jitter {
        return Vec::new();
    }
    vec![[0.0, 0.0]]
}

/// Calls `render_row` for each row of the image and its history, in parallel.
#[cfg(feature = "auto-threads")]
fn render_rows(
    width: usize,
    image: &mut [[u8; 4]],
    history: &mut [HistorySample],
    render_row: &(dyn Fn(usize, &mut [[u8; 4]], &mut [HistorySample]) -> RenderInfo + Sync),
) -> RenderInfo {
    use rayon::iter::{IndexedParallelIterator as _, ParallelIterator as _};
    use rayon::slice::ParallelSliceMut as _;

    image
        .par_chunks_mut(width.max(1))
        .zip(history.par_chunks_mut(width.max(1)))
        .enumerate()
        .map(|(y, (pixels, history))| render_row(y, pixels, history))
        .sum()
}

/// Calls `render_row` for each row of the image and its history.
#[cfg(not(feature = "auto-threads"))]
fn render_rows(
    width: usize,
    image: &mut [[u8; 4]],
    history: &mut [HistorySample],
    render_row: &(dyn Fn(usize, &mut [[u8; 4]], &mut [HistorySample]) -> RenderInfo + Sync),
) -> RenderInfo {
    image
        .chunks_mut(width.max(1))
        .zip(history.chunks_mut(width.max(1)))
        .enumerate()
        .map(|(y, (pixels, history))| render_row(y, pixels, history))
        .sum()
}
