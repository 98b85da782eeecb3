use std::path::Path;

use anyhow::Context as _;
use imgref::ImgVec;

use brickwork::environment::EquirectMap;
use brickwork::math::Rgb;

/// Reads an equirectangular environment image, such as a Radiance `.hdr` file.
///
/// Any format [`image`] can decode is accepted; low dynamic range images are converted to
/// linear values in `[0, 1]` as-is, without removing their gamma encoding.
pub fn load_environment_map(path: &Path) -> Result<EquirectMap, anyhow::Error> {
    let image = image::ImageReader::open(path)
        .with_context(|| format!("could not open environment map {path:?}"))?
        .with_guessed_format()
        .with_context(|| format!("could not read environment map {path:?}"))?
        .decode()
        .with_context(|| format!("could not decode environment map {path:?}"))?
        .into_rgb32f();
    let map = equirect_from_pixels(
        image.width() as usize,
        image.height() as usize,
        image.pixels().map(|pixel| Rgb::from(pixel.0)).collect(),
    )?;
    log::info!(
        "Loaded {width}×{height} environment map from {path:?}",
        width = map.image().width(),
        height = map.image().height(),
    );
    Ok(map)
}

fn equirect_from_pixels(
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
) -> Result<EquirectMap, anyhow::Error> {
    if width == 0 || height == 0 {
        anyhow::bail!("environment map has no pixels");
    }
    Ok(EquirectMap::new(ImgVec::new(pixels, width, height)))
}
