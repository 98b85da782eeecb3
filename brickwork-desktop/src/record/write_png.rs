use std::io::{self, Write};

use imgref::ImgVec;
use png::{Encoder, chunk::ChunkType};

use crate::record::RecordAnimationOptions;

/// Starts a PNG (or, if `animation` is given, an APNG) of the given size.
pub(crate) fn new_png_writer<W: Write>(
    writer: W,
    [width, height]: [u32; 2],
    animation: Option<&RecordAnimationOptions>,
) -> Result<png::Writer<W>, io::Error> {
    let mut png_encoder = Encoder::new(writer, width, height);
    png_encoder.set_color(png::ColorType::Rgba);
    png_encoder.set_depth(png::BitDepth::Eight);
    png_encoder.set_compression(png::Compression::Best);
    if let Some(anim) = animation {
        let frame_count = u32::try_from(anim.frame_count)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many frames"))?;
        png_encoder.set_animated(frame_count, 0)?;
        let delay_ms = u16::try_from(anim.frame_period.as_millis()).unwrap_or(u16::MAX);
        png_encoder.set_frame_delay(delay_ms, 1000)?;
    }
    let mut png_writer = png_encoder.write_header()?;
    write_color_metadata(&mut png_writer)?;
    Ok(png_writer)
}

/// Writes one frame's pixels, which must be the size given to [`new_png_writer()`].
pub(crate) fn write_frame<W: Write>(
    png_writer: &mut png::Writer<W>,
    image: &ImgVec<[u8; 4]>,
) -> Result<(), io::Error> {
    png_writer.write_image_data(&image_bytes(image))?;
    Ok(())
}

/// Writes `image` as a complete PNG file.
pub fn write_single_png(writer: impl Write, image: &ImgVec<[u8; 4]>) -> Result<(), io::Error> {
    let size = [image.width() as u32, image.height() as u32];
    let mut png_writer = new_png_writer(writer, size, None)?;
    write_frame(&mut png_writer, image)?;
    png_writer.finish()?;
    Ok(())
}

/// Rows of `image` without any padding.
fn image_bytes(image: &ImgVec<[u8; 4]>) -> Vec<u8> {
    let width = image.width();
    image
        .buf()
        .chunks(image.stride())
        .take(image.height())
        .flat_map(|row| &row[..width])
        .flatten()
        .copied()
        .collect()
}

fn write_color_metadata<W: Write>(png_writer: &mut png::Writer<W>) -> Result<(), io::Error> {
    // Values from http://www.libpng.org/pub/png/spec/1.2/PNG-Chunks.html#C.sRGB

    // Write sRGB chunk to declare that the image is sRGB.
    png_writer.write_chunk(ChunkType(*b"sRGB"), &[0])?;
    // Write compatibility gamma information
    png_writer.write_chunk(ChunkType(*b"gAMA"), &45455_u32.to_be_bytes())?;
    // Write compatibility chromaticity information
    png_writer.write_chunk(
        ChunkType(*b"cHRM"),
        &[
            31270, // White Point x
            32900, // White Point y
            64000, // Red x
            33000, // Red y
            30000, // Green x
            60000, // Green y
            15000, // Blue x
            6000,  // Blue y
        ]
        .into_iter()
        .flat_map(u32::to_be_bytes)
        .collect::<Box<[u8]>>(),
    )?;
    Ok(())
}
