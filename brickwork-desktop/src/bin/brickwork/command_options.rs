//! Command line option parsing.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use brickwork_desktop::logging::LoggingArgs;
use brickwork_desktop::record::{RecordAnimationOptions, RecordOptions};
use brickwork_desktop::{SceneSource, SettingsArgs};
use brickwork_render::camera::{Projection, Viewport};

#[derive(Clone, Debug, Parser)]
#[command(
    name = crate::TITLE, author, about, version,
    help_template = "\
{name} {version}
{author}
{about-with-newline}
{usage-heading}
    {usage}

{all-args}{after-help}",
)]
pub(crate) struct BrickworkArgs {
    /// Output file name; always written as PNG, or animated PNG with --animate.
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub(crate) output_file: PathBuf,

    /// Image size.
    ///
    /// If not specified, the size stored in the --camera file is used, or else 640×480.
    #[arg(long = "display-size", value_name = "W×H")]
    pub(crate) display_size: Option<DisplaySizeArg>,

    /// Which kind of procedural scene to create.
    ///
    /// Mutually exclusive with specifying an input file.
    #[arg(long = "scene", short = 's', value_enum, default_value = "noise")]
    pub(crate) scene: SceneKind,

    /// Seed value for randomized components of the scene.
    ///
    /// If not specified, a randomly chosen seed will be used.
    #[arg(long = "seed")]
    pub(crate) seed: Option<u64>,

    /// Number of worlds in a noise scene. Worlds after the first are placed at random.
    #[arg(long = "worlds", default_value_t = 1)]
    pub(crate) worlds: usize,

    /// Number of frames to render.
    ///
    /// Without --animate, only the last frame is written, so that successive frames
    /// may be accumulated or reprojected into a cleaner still image.
    #[arg(long = "frames", default_value_t = 1, value_name = "N")]
    pub(crate) frames: usize,

    /// Write every frame to an animated PNG.
    #[arg(long)]
    pub(crate) animate: bool,

    /// Frames per second of simulated time; affects cellular automata speed, and the
    /// frame delay of animations.
    #[arg(long = "frame-rate", default_value_t = 30.0, value_name = "FPS")]
    pub(crate) frame_rate: f64,

    /// Degrees the camera orbits around the center of the scene between animation frames.
    #[arg(long = "orbit", requires = "animate", value_name = "DEGREES")]
    pub(crate) orbit: Option<f32>,

    /// Camera projection, overriding that of the --camera file.
    #[arg(long = "projection", value_enum)]
    pub(crate) projection: Option<ProjectionArg>,

    /// Binary camera file to load the camera from.
    #[arg(long = "camera", value_name = "FILE")]
    pub(crate) camera_file: Option<PathBuf>,

    /// Write the camera, as of the last frame, to this file.
    #[arg(long = "save-camera", value_name = "FILE")]
    pub(crate) save_camera: Option<PathBuf>,

    /// Binary settings file to use instead of the configuration file.
    /// --set options still apply.
    #[arg(long = "settings", value_name = "FILE")]
    pub(crate) settings_file: Option<PathBuf>,

    /// Write the settings that were used to this file.
    #[arg(long = "save-settings", value_name = "FILE")]
    pub(crate) save_settings: Option<PathBuf>,

    /// Equirectangular image (such as a Radiance .hdr file) to use as the environment
    /// when the `environment_light` and `use_hdr` settings are enabled.
    #[arg(long = "environment", value_name = "FILE")]
    pub(crate) environment_file: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) logging: LoggingArgs,

    #[command(flatten)]
    pub(crate) settings: SettingsArgs,

    /// MagicaVoxel .vox file to import. If not specified, a procedural scene will be
    /// used instead.
    #[arg(
        conflicts_with = "scene",
        conflicts_with = "seed",
        conflicts_with = "worlds",
        value_name = "FILE"
    )]
    pub(crate) input_file: Option<PathBuf>,
}

impl BrickworkArgs {
    /// Construct [`RecordOptions`].
    ///
    /// Returns an error if options were inconsistent with each other.
    pub(crate) fn record_options(&self) -> Result<RecordOptions, anyhow::Error> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            anyhow::bail!("--frame-rate must be a positive number");
        }
        let frame_period = Duration::from_secs_f64(self.frame_rate.recip());
        Ok(if self.animate {
            RecordOptions::animated(
                self.output_file.clone(),
                RecordAnimationOptions::new(
                    self.frames,
                    frame_period,
                    self.orbit.unwrap_or(0.0).to_radians(),
                ),
            )
        } else {
            RecordOptions::still(self.output_file.clone(), self.frames)
        })
    }

    pub(crate) fn scene_source(&self) -> SceneSource {
        if let Some(file) = &self.input_file {
            return SceneSource::File(file.clone());
        }
        match self.scene {
            SceneKind::Empty => SceneSource::Empty,
            SceneKind::Noise => SceneSource::Noise {
                seed: self.seed,
                worlds: self.worlds,
            },
            SceneKind::Automata => SceneSource::Automata { seed: self.seed },
        }
    }
}

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum SceneKind {
    #[value(help = "No worlds; only the environment is visible")]
    Empty,
    #[value(help = "Worlds filled with Perlin noise")]
    Noise,
    #[value(help = "A world animated by cellular automata")]
    Automata,
}

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum ProjectionArg {
    Pinhole,
    #[value(help = "Thin lens with depth of field, focused on the center of the image")]
    DepthOfField,
    #[value(help = "Panini projection for wide fields of view")]
    Panini,
}

impl From<ProjectionArg> for Projection {
    fn from(value: ProjectionArg) -> Self {
        match value {
            ProjectionArg::Pinhole => Projection::Pinhole,
            ProjectionArg::DepthOfField => Projection::DepthOfField,
            ProjectionArg::Panini => Projection::Panini,
        }
    }
}

/// Image size, parseable in a variety of formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DisplaySizeArg(pub Viewport);

impl FromStr for DisplaySizeArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [width, height]: [u32; 2] = s
            .split(&['×', 'x', ',', ';', ' '][..])
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| format!("{s:?} not an integer"))
            })
            .collect::<Result<Vec<u32>, String>>()?
            .try_into()
            .map_err(|_| String::from("must be two integers"))?;
        if width == 0 || height == 0 {
            return Err(String::from("must not be zero"));
        }
        Ok(DisplaySizeArg(Viewport::new(width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> clap::error::Result<BrickworkArgs> {
        BrickworkArgs::try_parse_from(
            ["brickwork", "-o", "out.png"]
                .into_iter()
                .chain(args.iter().copied()),
        )
    }

    #[test]
    fn display_size_formats() {
        for text in ["320x200", "320×200", "320,200", "320 200"] {
            assert_eq!(
                text.parse::<DisplaySizeArg>(),
                Ok(DisplaySizeArg(Viewport::new(320, 200))),
                "{text}"
            );
        }
        assert!("320".parse::<DisplaySizeArg>().is_err());
        assert!("320x200x100".parse::<DisplaySizeArg>().is_err());
        assert!("0x200".parse::<DisplaySizeArg>().is_err());
        assert!("wide".parse::<DisplaySizeArg>().is_err());
    }

    #[test]
    fn output_is_required() {
        let e = BrickworkArgs::try_parse_from(["brickwork"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn record_options_still() {
        assert_eq!(
            parse(&["--frames", "8"]).unwrap().record_options().unwrap(),
            RecordOptions::still(PathBuf::from("out.png"), 8),
        );
    }

    #[test]
    fn record_options_animation() {
        assert_eq!(
            parse(&["--animate", "--frames", "90", "--frame-rate", "30", "--orbit", "2"])
                .unwrap()
                .record_options()
                .unwrap(),
            RecordOptions::animated(
                PathBuf::from("out.png"),
                RecordAnimationOptions::new(
                    90,
                    Duration::from_secs_f64(1.0 / 30.0),
                    2.0f32.to_radians()
                ),
            ),
        );
    }

    #[test]
    fn orbit_requires_animate() {
        let e = parse(&["--orbit", "2"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn invalid_frame_rate() {
        assert!(
            parse(&["--frame-rate", "0"])
                .unwrap()
                .record_options()
                .is_err()
        );
    }

    #[test]
    fn scene_default() {
        assert_eq!(
            parse(&[]).unwrap().scene_source(),
            SceneSource::Noise {
                seed: None,
                worlds: 1
            },
        );
    }

    #[test]
    fn scene_automata() {
        assert_eq!(
            parse(&["--scene", "automata", "--seed", "7"])
                .unwrap()
                .scene_source(),
            SceneSource::Automata { seed: Some(7) },
        );
    }

    #[test]
    fn scene_from_file() {
        assert_eq!(
            parse(&["model.vox"]).unwrap().scene_source(),
            SceneSource::File(PathBuf::from("model.vox")),
        );
    }

    #[test]
    fn scene_file_conflicts_with_seed() {
        let e = parse(&["--seed", "1", "model.vox"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn projection_names() {
        assert_eq!(
            Projection::from(
                parse(&["--projection", "depth-of-field"])
                    .unwrap()
                    .projection
                    .unwrap()
            ),
            Projection::DepthOfField
        );
    }
}
