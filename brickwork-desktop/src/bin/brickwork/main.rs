//! Binary for the brickwork command-line renderer.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

use anyhow::Context as _;
use clap::Parser as _;
use euclid::vec3;

use brickwork::environment::Environment;
use brickwork_desktop::{
    load_environment_map, logging, read_camera_file, read_settings_file, record,
    write_camera_file, write_settings_file,
};
use brickwork_render::Renderer;
use brickwork_render::camera::{Camera, Viewport};

mod command_options;
use command_options::{BrickworkArgs, DisplaySizeArg};

static TITLE: &str = "Brickwork";

fn main() -> Result<(), anyhow::Error> {
    // Parse and transform command-line arguments.
    let options = BrickworkArgs::parse();
    let record_options = options.record_options()?;
    let scene_source = options.scene_source();
    // Destructure as a check that we're using/skipping all the args
    let BrickworkArgs {
        output_file: _, // used in RecordOptions
        display_size,
        scene,
        seed: _,   // used in SceneSource
        worlds: _, // used in SceneSource
        frames: _, // used in RecordOptions
        animate: _,
        frame_rate: _,
        orbit: _,
        projection,
        camera_file,
        save_camera,
        settings_file,
        save_settings,
        environment_file,
        logging: logging_args,
        settings: settings_args,
        input_file,
    } = options;

    logging::install(&logging_args)?;
    log::info!("{TITLE} v{v}", v = clap::crate_version!());

    let settings = match &settings_file {
        Some(path) => settings_args.build_settings_with_base(read_settings_file(path)?)?,
        None => settings_args.build_settings()?,
    };
    log::debug!("{settings:?}");

    let environment = match &environment_file {
        Some(path) => Environment::with_map(load_environment_map(path)?),
        None => Environment::new(),
    };

    if input_file.is_none() {
        log::info!("Creating {} scene", <&'static str>::from(scene));
    }
    let live_scene = scene_source
        .create_scene(&settings.automata)
        .context("could not create scene")?;

    let mut camera = match &camera_file {
        Some(path) => read_camera_file(path)?,
        None => {
            let center = live_scene.center();
            Camera::new(
                center + vec3(1.1, 0.8, 1.4),
                center,
                Viewport::default(),
            )
        }
    };
    if let Some(DisplaySizeArg(viewport)) = display_size {
        camera.set_viewport(viewport);
    }
    if let Some(projection) = projection {
        camera.projection = projection.into();
    }

    let mut renderer = Renderer::new(settings, environment);
    let flaws = record::record_main(live_scene, &mut renderer, &mut camera, &record_options)?;
    if !flaws.is_empty() {
        log::info!("Last frame has flaws: {flaws:?}");
    }

    if let Some(path) = &save_camera {
        write_camera_file(path, &camera)?;
    }
    if let Some(path) = &save_settings {
        write_settings_file(path, renderer.settings())?;
    }
    Ok(())
}
