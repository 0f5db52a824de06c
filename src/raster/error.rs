// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Error types for raster decode, encode and rect copies.

use std::fmt;

/// Errors that can occur while decoding, encoding or blitting a raster.
#[derive(Debug)]
pub enum RasterError {
    /// The page bytes could not be decoded as a supported image format.
    Decode(image::ImageError),
    /// The reconstructed raster could not be re-encoded.
    Encode(image::ImageError),
    /// Raster dimensions and buffer length disagree.
    InvalidBuffer { width: u32, height: u32, len: usize },
    /// A rect copy touches pixels outside the raster.
    OutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "image decode failed: {e}"),
            Self::Encode(e) => write!(f, "image encode failed: {e}"),
            Self::InvalidBuffer { width, height, len } => {
                write!(f, "buffer of {len} bytes does not hold a {width}x{height} RGBA raster")
            }
            Self::OutOfBounds { x, y, w, h, width, height } => {
                write!(f, "rect {w}x{h}@({x},{y}) exceeds raster bounds {width}x{height}")
            }
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) | Self::Encode(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RasterError>;
