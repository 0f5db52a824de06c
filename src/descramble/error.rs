// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Error types for geometry construction, compositing and ciphers.

use std::fmt;

use crate::raster::RasterError;

/// Errors that can occur while descrambling a single page.
#[derive(Debug)]
pub enum DescrambleError {
    /// Decode, encode or rect-copy failure in the raster layer.
    Raster(RasterError),
    /// Image dimensions produce a zero-sized grid cell or an empty grid.
    DegenerateGrid { width: u32, height: u32, detail: &'static str },
    /// An explicit order table is missing, malformed or not a permutation.
    InvalidOrderTable(String),
    /// A tile-pair manifest entry could not be parsed.
    InvalidTilePair(String),
    /// Cipher key or IV is not valid hex of the expected length.
    InvalidKeyMaterial(&'static str),
    /// Block decryption failed (bad padding — wrong key or corrupt data).
    CipherFailed,
    /// A computed tile rect falls outside the page raster.
    TileOutOfBounds { index: usize },
}

impl fmt::Display for DescrambleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raster(e) => write!(f, "raster error: {e}"),
            Self::DegenerateGrid { width, height, detail } => {
                write!(f, "cannot build tile geometry for {width}x{height}: {detail}")
            }
            Self::InvalidOrderTable(msg) => write!(f, "invalid scramble order table: {msg}"),
            Self::InvalidTilePair(msg) => write!(f, "invalid tile pair: {msg}"),
            Self::InvalidKeyMaterial(what) => write!(f, "invalid cipher material: {what}"),
            Self::CipherFailed => write!(f, "decryption failed (wrong key or corrupt page?)"),
            Self::TileOutOfBounds { index } => {
                write!(f, "tile {index} falls outside the page raster")
            }
        }
    }
}

impl std::error::Error for DescrambleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Raster(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RasterError> for DescrambleError {
    fn from(e: RasterError) -> Self {
        Self::Raster(e)
    }
}

pub type Result<T> = std::result::Result<T, DescrambleError>;
