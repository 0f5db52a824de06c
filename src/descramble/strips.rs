// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Literal tile-pair manifests.
//!
//! One viewer family ships the scramble fully resolved: each page's manifest
//! lists `"i:SX,SY+W,H>DX,DY"` entries, one source rect and its destination
//! origin per tile. Nothing is derived — the engine just parses the pairs.
//! The destination page dimensions come from the manifest too and can differ
//! from the source raster (the scrambled source carries padding).

use super::error::{DescrambleError, Result};
use super::geometry::{TileGeometry, TileRect};

/// Parse one manifest entry of the form `"i:SX,SY+W,H>DX,DY"` (the `i:`
/// resource prefix is optional).
///
/// # Errors
/// [`DescrambleError::InvalidTilePair`] on any malformed entry.
pub fn parse_pair(raw: &str) -> Result<(TileRect, TileRect)> {
    let bad = || DescrambleError::InvalidTilePair(raw.to_string());

    let body = raw.strip_prefix("i:").unwrap_or(raw);
    let (src_part, dst_part) = body.split_once('>').ok_or_else(bad)?;

    // Source: "SX,SY+W,H"
    let mut src_fields = src_part.split(',');
    let sx = parse_u32(src_fields.next(), raw)?;
    let (sy_raw, w_raw) = src_fields.next().and_then(|f| f.split_once('+')).ok_or_else(bad)?;
    let sy = parse_u32(Some(sy_raw), raw)?;
    let w = parse_u32(Some(w_raw), raw)?;
    let h = parse_u32(src_fields.next(), raw)?;
    if src_fields.next().is_some() {
        return Err(bad());
    }

    // Destination: "DX,DY"
    let (dx_raw, dy_raw) = dst_part.split_once(',').ok_or_else(bad)?;
    let dx = parse_u32(Some(dx_raw), raw)?;
    let dy = parse_u32(Some(dy_raw), raw)?;

    Ok((TileRect::new(sx, sy, w, h), TileRect::new(dx, dy, w, h)))
}

fn parse_u32(field: Option<&str>, raw: &str) -> Result<u32> {
    field
        .and_then(|f| f.trim().parse().ok())
        .ok_or_else(|| DescrambleError::InvalidTilePair(raw.to_string()))
}

/// Build the geometry for a page from its manifest entries and declared
/// destination dimensions.
///
/// # Errors
/// [`DescrambleError::InvalidTilePair`] if any entry fails to parse,
/// [`DescrambleError::DegenerateGrid`] if the declared dimensions are zero.
pub fn geometry(width: u32, height: u32, entries: &[String]) -> Result<TileGeometry> {
    if width == 0 || height == 0 {
        return Err(DescrambleError::DegenerateGrid { width, height, detail: "empty destination page" });
    }
    let mut geom = TileGeometry::new(width, height);
    for entry in entries {
        let (src, dst) = parse_pair(entry)?;
        geom.push(src, dst);
    }
    Ok(geom)
}
