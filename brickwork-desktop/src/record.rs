//! Rendering frames of a scene to image files.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use imgref::ImgVec;

use brickwork::debug_lines::DebugLines;
use brickwork::scene::Scene;
use brickwork::settings::Settings;
use brickwork_render::camera::Camera;
use brickwork_render::{Flaws, Renderer, overlay};

use crate::LiveScene;

pub(crate) mod write_png;

/// Options for recording and output in [`record_main()`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct RecordOptions {
    #[allow(missing_docs)]
    pub output_path: PathBuf,
    /// Number of frames to render. Unless [`animation`](Self::animation) is set, only the
    /// last one is written, so that frames may be accumulated into a still image.
    pub frame_count: usize,
    /// Write every frame to an animated PNG.
    pub animation: Option<RecordAnimationOptions>,
}

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct RecordAnimationOptions {
    pub frame_count: usize,
    /// Simulated time between frames; also the display time of each frame.
    pub frame_period: Duration,
    /// Radians the camera orbits around the center of the scene between frames.
    pub orbit_per_frame: f32,
}

impl RecordOptions {
    /// A still image accumulated over `frame_count` frames.
    pub fn still(output_path: PathBuf, frame_count: usize) -> Self {
        Self {
            output_path,
            frame_count: frame_count.max(1),
            animation: None,
        }
    }

    /// An animation of `animation.frame_count` frames.
    pub fn animated(output_path: PathBuf, animation: RecordAnimationOptions) -> Self {
        Self {
            output_path,
            frame_count: animation.frame_count,
            animation: Some(animation),
        }
    }

    fn frame_period(&self) -> Duration {
        self.animation
            .as_ref()
            .map_or(DEFAULT_FRAME_PERIOD, |animation| animation.frame_period)
    }

    fn orbit_per_frame(&self) -> f32 {
        self.animation
            .as_ref()
            .map_or(0.0, |animation| animation.orbit_per_frame)
    }
}

impl RecordAnimationOptions {
    #[allow(missing_docs)]
    pub fn new(frame_count: usize, frame_period: Duration, orbit_per_frame: f32) -> Self {
        Self {
            frame_count: frame_count.max(1),
            frame_period,
            orbit_per_frame,
        }
    }
}

/// Time simulated between frames of a still image.
const DEFAULT_FRAME_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

// -------------------------------------------------------------------------------------------------

/// Renders frames of `scene` as seen by `camera` and writes them to a PNG file.
///
/// Between frames, the scene's animation advances and the camera orbits as `options`
/// specify. Returns the flaws of the last frame.
pub fn record_main(
    mut scene: LiveScene,
    renderer: &mut Renderer,
    camera: &mut Camera,
    options: &RecordOptions,
) -> Result<Flaws, anyhow::Error> {
    let viewport = camera.viewport();
    let path = &options.output_path;
    let file =
        File::create(path).with_context(|| format!("could not create output file {path:?}"))?;
    let mut buf_writer = BufWriter::new(file);
    let write_error = || format!("could not write output file {path:?}");

    let dt = options.frame_period().as_secs_f32();
    let orbit_center = scene.center();
    let mut debug_lines = DebugLines::new(false);
    let mut output = match &options.animation {
        Some(animation) => Output::Animation(
            write_png::new_png_writer(
                &mut buf_writer,
                [viewport.width, viewport.height],
                Some(animation),
            )
            .with_context(write_error)?,
        ),
        None => Output::Still(&mut buf_writer),
    };
    let mut last_flaws = Flaws::empty();

    let start_time = Instant::now();
    for frame in 0..options.frame_count {
        if frame > 0 {
            let ticks = scene.step(dt, &renderer.settings().automata);
            if ticks > 0 {
                log::trace!("frame {frame}: {ticks} automata generations");
            }
            let orbit = options.orbit_per_frame();
            if orbit != 0.0 {
                camera.orbit(orbit_center, orbit);
            }
        }

        let mut rendering = renderer
            .render_frame(scene.scene(), camera)
            .with_context(|| format!("could not render frame {frame}"))?;
        draw_overlay(
            &mut rendering.image,
            scene.scene(),
            renderer.settings(),
            camera,
            &mut debug_lines,
            dt,
        );
        last_flaws = rendering.flaws;

        match &mut output {
            Output::Animation(png_writer) => {
                write_png::write_frame(png_writer, &rendering.image).with_context(write_error)?;
            }
            Output::Still(writer) if frame + 1 == options.frame_count => {
                write_png::write_single_png(&mut **writer, &rendering.image)
                    .with_context(write_error)?;
            }
            Output::Still(_) => {}
        }
        log::info!(
            "Frame {n}/{count} rendered ({flaws:?})",
            n = frame + 1,
            count = options.frame_count,
            flaws = rendering.flaws,
        );
    }

    // `{ output }` moves all of `output` so its borrow of `buf_writer` ends here.
    if let Output::Animation(png_writer) = { output } {
        png_writer.finish().with_context(write_error)?;
    }
    buf_writer.flush().with_context(write_error)?;
    log::info!(
        "Wrote {path:?} ({:.3} s)",
        start_time.elapsed().as_secs_f32()
    );
    Ok(last_flaws)
}

/// Where [`record_main()`] sends frames.
enum Output<'a> {
    Animation(png::Writer<&'a mut BufWriter<File>>),
    /// Only the last frame is written.
    Still(&'a mut BufWriter<File>),
}

/// Draws the enabled kinds of debug lines over `image`, then ages the lines in `sink`.
fn draw_overlay(
    image: &mut ImgVec<[u8; 4]>,
    scene: &Scene,
    settings: &Settings,
    camera: &Camera,
    sink: &mut DebugLines,
    dt: f32,
) {
    sink.set_enabled(settings.debug_draw || settings.debug_lines);
    overlay::collect_scene_lines(scene, settings, sink);
    if settings.debug_lines {
        sink.draw_axes(1.0);
    }
    if !sink.lines().is_empty() {
        overlay::draw_lines(image, camera, sink.lines());
    }
    sink.flush(dt);
}
