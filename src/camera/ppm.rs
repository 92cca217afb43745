//! PNM frame reader for piped camera streams (`-vcodec ppm`).
use anyhow::{anyhow, Context, Result};
use image::codecs::pnm::PnmDecoder;
use image::{DynamicImage, ImageDecoder, RgbImage};
use std::io::BufRead;

/// Largest decoded frame accepted from a capture command.
const MAX_FRAME_BYTES: u64 = 256 * 1024 * 1024;

/// Read the next frame. `Ok(None)` means the stream ended cleanly between
/// frames.
pub fn read_ppm_frame<R: BufRead>(reader: &mut R) -> Result<Option<RgbImage>> {
    if reader.fill_buf().context("read frame header")?.is_empty() {
        return Ok(None);
    }
    let decoder = PnmDecoder::new(&mut *reader).context("decode frame header")?;
    let (width, height) = decoder.dimensions();
    let bytes = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|pixels| pixels.checked_mul(u64::from(decoder.color_type().bytes_per_pixel())));
    match bytes {
        Some(bytes) if bytes <= MAX_FRAME_BYTES => {}
        _ => return Err(anyhow!("frame of {width}x{height} exceeds the frame size limit")),
    }
    let frame = DynamicImage::from_decoder(decoder).context("decode frame pixels")?;
    Ok(Some(frame.to_rgb8()))
}
