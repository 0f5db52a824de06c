// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Decode and encode between page bytes and [`Raster`] buffers.
//!
//! Platforms deliver JPEG, WebP, PNG or BMP; reconstructed pages are
//! re-encoded as JPEG for the archive. Format sniffing is left to the
//! `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::ImageEncoder;
use image::RgbaImage;

use super::error::{RasterError, Result};
use super::Raster;

/// JPEG quality for re-encoded pages. The source material is already lossy;
/// 90 keeps recompression artifacts below visible thresholds on line art.
const JPEG_QUALITY: u8 = 90;

/// Decode encoded image bytes into an RGBA raster.
///
/// # Errors
/// [`RasterError::Decode`] if the bytes are not a supported image format.
pub fn decode(bytes: &[u8]) -> Result<Raster> {
    let img = image::load_from_memory(bytes).map_err(RasterError::Decode)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::from_rgba(width, height, rgba.into_raw())
}

/// Encode a raster as baseline JPEG.
///
/// # Errors
/// [`RasterError::Encode`] on encoder failure (dimension overflow).
pub fn encode_jpeg(raster: &Raster) -> Result<Vec<u8>> {
    let img = RgbaImage::from_raw(raster.width(), raster.height(), raster.as_bytes().to_vec())
        .expect("raster buffer length is checked at construction");
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .write_image(
            rgb.as_raw(),
            raster.width(),
            raster.height(),
            image::ColorType::Rgb8,
        )
        .map_err(RasterError::Encode)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_roundtrip_preserves_dimensions() {
        let mut r = Raster::new(24, 16);
        r.fill_rect(0, 0, 24, 16, [120, 40, 200, 255]).unwrap();

        let bytes = encode_jpeg(&r).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.width(), 24);
        assert_eq!(back.height(), 16);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode(b"not an image"), Err(RasterError::Decode(_))));
    }
}
