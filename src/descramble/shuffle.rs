// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Seeded pseudo-random tile shuffle.
//!
//! One platform family scrambles pages by shuffling a G×G tile grid with a
//! permutation derived from an xorshift32 generator seeded per chapter. The
//! permutation must be bit-reproducible: the viewer that scrambled the page
//! and this engine must derive the identical mapping from the same seed, on
//! every platform and architecture. All state is `u32` and the sort is
//! stable, so no width- or tie-ordering differences can creep in.

use super::error::{DescrambleError, Result};
use super::geometry::{TileGeometry, TileRect};

/// xorshift32 generator (Marsaglia triple `13/17/5`), matching the viewer's
/// scrambler exactly — including the degenerate all-zero sequence for seed
/// 0, which sorts into the identity permutation.
#[derive(Clone, Copy, Debug)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advance and return the next state.
    pub fn next_u32(&mut self) -> u32 {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 17;
        s ^= s << 5;
        self.state = s;
        s
    }
}

/// Destination→source index permutation over `total` tiles: index list
/// sorted by successive generator outputs (stable sort, so equal keys keep
/// their relative order).
pub fn permutation(seed: u32, total: usize) -> Vec<usize> {
    let mut rng = XorShift32::new(seed);
    let mut keyed: Vec<(u32, usize)> = (0..total).map(|i| (rng.next_u32(), i)).collect();
    keyed.sort_by_key(|&(key, _)| key);
    keyed.into_iter().map(|(_, i)| i).collect()
}

/// Build the reconstruction geometry for a seed-shuffled page.
///
/// The rightmost `preserve_right` pixel column strip is never scrambled and
/// is copied through in place. The remaining active width is divided into a
/// `grid`×`grid` tile grid (integer cell sizes); remainder pixels on the
/// right of the active area and at the bottom are passed through unscrambled.
///
/// # Errors
/// [`DescrambleError::DegenerateGrid`] if the dimensions leave a zero-sized
/// tile cell or no active area.
pub fn geometry(width: u32, height: u32, grid: u32, seed: u32, preserve_right: u32) -> Result<TileGeometry> {
    if grid == 0 {
        return Err(DescrambleError::DegenerateGrid { width, height, detail: "grid size is zero" });
    }
    if preserve_right >= width {
        return Err(DescrambleError::DegenerateGrid {
            width,
            height,
            detail: "preserved strip consumes the whole page",
        });
    }
    let active_w = width - preserve_right;
    let tile_w = active_w / grid;
    let tile_h = height / grid;
    if tile_w == 0 || tile_h == 0 {
        return Err(DescrambleError::DegenerateGrid { width, height, detail: "zero-sized tile cell" });
    }

    let mut geom = TileGeometry::new(width, height);

    // Preserved right strip, in place.
    if preserve_right > 0 {
        let strip = TileRect::new(active_w, 0, preserve_right, height);
        geom.push(strip, strip);
    }
    // Remainder columns of the active area and remainder rows, in place.
    let rem_x = active_w - grid * tile_w;
    if rem_x > 0 {
        let strip = TileRect::new(grid * tile_w, 0, rem_x, height);
        geom.push(strip, strip);
    }
    let rem_y = height - grid * tile_h;
    if rem_y > 0 {
        let strip = TileRect::new(0, grid * tile_h, grid * tile_w, rem_y);
        geom.push(strip, strip);
    }

    // Shuffled grid pass.
    let order = permutation(seed, (grid * grid) as usize);
    for (dst_idx, &src_idx) in order.iter().enumerate() {
        let (sx, sy) = (src_idx as u32 % grid, src_idx as u32 / grid);
        let (dx, dy) = (dst_idx as u32 % grid, dst_idx as u32 / grid);
        geom.push(
            TileRect::new(sx * tile_w, sy * tile_h, tile_w, tile_h),
            TileRect::new(dx * tile_w, dy * tile_h, tile_w, tile_h),
        );
    }
    Ok(geom)
}
