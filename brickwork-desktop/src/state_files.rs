//! Reading and writing the binary camera and settings files of [`brickwork_render::persist`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use brickwork::settings::Settings;
use brickwork_render::camera::Camera;
use brickwork_render::persist;

/// Reads a camera file written by [`write_camera_file()`].
pub fn read_camera_file(path: &Path) -> Result<Camera, anyhow::Error> {
    let file = File::open(path).with_context(|| format!("could not open camera file {path:?}"))?;
    let camera = persist::load_camera(&mut BufReader::new(file))
        .with_context(|| format!("could not load camera from {path:?}"))?;
    log::info!("Loaded camera from {path:?}");
    Ok(camera)
}

/// Writes `camera`, including its previous-frame state, to a new file.
pub fn write_camera_file(path: &Path, camera: &Camera) -> Result<(), anyhow::Error> {
    write_file(path, "camera", |w| persist::save_camera(w, camera))
}

/// Reads settings from a binary settings file. The result has been
/// [repaired](Settings::repair).
pub fn read_settings_file(path: &Path) -> Result<Settings, anyhow::Error> {
    let file =
        File::open(path).with_context(|| format!("could not open settings file {path:?}"))?;
    let settings = persist::load_settings(&mut BufReader::new(file))
        .with_context(|| format!("could not load settings from {path:?}"))?;
    log::info!("Loaded settings from {path:?}");
    Ok(settings.repair())
}

#[allow(missing_docs)]
pub fn write_settings_file(path: &Path, settings: &Settings) -> Result<(), anyhow::Error> {
    write_file(path, "settings", |w| persist::save_settings(w, settings))
}

fn write_file(
    path: &Path,
    description: &str,
    contents: impl FnOnce(&mut BufWriter<File>) -> Result<(), persist::PersistError>,
) -> Result<(), anyhow::Error> {
    let file = File::create(path)
        .with_context(|| format!("could not create {description} file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    contents(&mut writer).with_context(|| format!("could not save {description} to {path:?}"))?;
    writer
        .flush()
        .with_context(|| format!("could not save {description} to {path:?}"))?;
    log::info!("Saved {description} to {path:?}");
    Ok(())
}
