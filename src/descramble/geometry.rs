// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Tile geometry: the list of source→destination rect copies that
//! reconstructs one page.
//!
//! Every descrambling strategy reduces to a [`TileGeometry`] — a set of
//! equal-sized rect pairs over the page raster. The compositor executes the
//! pairs in order; the strategies guarantee that destination rects never
//! overlap, so execution order does not affect the result.

use super::error::{DescrambleError, Result};

/// An axis-aligned pixel rect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl TileRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// One rect copy: read `src`, write `dst`. Both rects have identical
/// dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePair {
    pub src: TileRect,
    pub dst: TileRect,
}

/// A full reconstruction plan for one page.
///
/// `dst_width`/`dst_height` are the reconstructed page dimensions — equal to
/// the source raster for grid strategies, taken from the manifest for
/// explicit tile-pair strategies.
#[derive(Clone, Debug)]
pub struct TileGeometry {
    dst_width: u32,
    dst_height: u32,
    pairs: Vec<TilePair>,
}

impl TileGeometry {
    pub fn new(dst_width: u32, dst_height: u32) -> Self {
        Self { dst_width, dst_height, pairs: Vec::new() }
    }

    pub fn dst_width(&self) -> u32 {
        self.dst_width
    }

    pub fn dst_height(&self) -> u32 {
        self.dst_height
    }

    pub fn pairs(&self) -> &[TilePair] {
        &self.pairs
    }

    /// Append a copy of `src` to `dst`. Zero-area pairs are dropped.
    pub fn push(&mut self, src: TileRect, dst: TileRect) {
        debug_assert_eq!((src.w, src.h), (dst.w, dst.h), "rect pair dimensions must match");
        if src.w == 0 || src.h == 0 {
            return;
        }
        self.pairs.push(TilePair { src, dst });
    }

    /// Check that every pair stays inside the source and destination
    /// rasters and that no two destination rects overlap.
    ///
    /// # Errors
    /// [`DescrambleError::TileOutOfBounds`] naming the first offending pair.
    /// [`DescrambleError::InvalidOrderTable`] if two destination rects
    /// overlap (a strategy produced a non-bijective plan).
    pub fn validate(&self, src_width: u32, src_height: u32) -> Result<()> {
        let mut mask = vec![false; self.dst_width as usize * self.dst_height as usize];
        for (index, pair) in self.pairs.iter().enumerate() {
            if !rect_fits(pair.src, src_width, src_height)
                || !rect_fits(pair.dst, self.dst_width, self.dst_height)
            {
                return Err(DescrambleError::TileOutOfBounds { index });
            }
            for y in pair.dst.y..pair.dst.y + pair.dst.h {
                for x in pair.dst.x..pair.dst.x + pair.dst.w {
                    let at = y as usize * self.dst_width as usize + x as usize;
                    if mask[at] {
                        return Err(DescrambleError::InvalidOrderTable(format!(
                            "destination pixel ({x},{y}) written twice (pair {index})"
                        )));
                    }
                    mask[at] = true;
                }
            }
        }
        Ok(())
    }

    /// True when the pairs cover every destination pixel exactly once.
    /// Strategies with trimmed cell margins legitimately return `false`.
    pub fn is_complete(&self, src_width: u32, src_height: u32) -> bool {
        if self.validate(src_width, src_height).is_err() {
            return false;
        }
        let covered: u64 = self.pairs.iter().map(|p| p.dst.w as u64 * p.dst.h as u64).sum();
        covered == self.dst_width as u64 * self.dst_height as u64
    }
}

fn rect_fits(r: TileRect, width: u32, height: u32) -> bool {
    (r.x as u64 + r.w as u64) <= width as u64 && (r.y as u64 + r.h as u64) <= height as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_disjoint_cover() {
        let mut g = TileGeometry::new(4, 2);
        g.push(TileRect::new(2, 0, 2, 2), TileRect::new(0, 0, 2, 2));
        g.push(TileRect::new(0, 0, 2, 2), TileRect::new(2, 0, 2, 2));
        g.validate(4, 2).unwrap();
        assert!(g.is_complete(4, 2));
    }

    #[test]
    fn validate_rejects_dst_overlap() {
        let mut g = TileGeometry::new(4, 2);
        g.push(TileRect::new(0, 0, 2, 2), TileRect::new(0, 0, 2, 2));
        g.push(TileRect::new(2, 0, 2, 2), TileRect::new(1, 0, 2, 2));
        assert!(matches!(g.validate(4, 2), Err(DescrambleError::InvalidOrderTable(_))));
    }

    #[test]
    fn validate_rejects_out_of_bounds_src() {
        let mut g = TileGeometry::new(2, 2);
        g.push(TileRect::new(4, 0, 2, 2), TileRect::new(0, 0, 2, 2));
        assert!(matches!(g.validate(4, 2), Err(DescrambleError::TileOutOfBounds { index: 0 })));
    }

    #[test]
    fn partial_cover_is_valid_but_incomplete() {
        let mut g = TileGeometry::new(4, 4);
        g.push(TileRect::new(0, 0, 2, 2), TileRect::new(0, 0, 2, 2));
        g.validate(4, 4).unwrap();
        assert!(!g.is_complete(4, 4));
    }

    #[test]
    fn zero_area_pairs_are_dropped() {
        let mut g = TileGeometry::new(4, 4);
        g.push(TileRect::new(0, 0, 0, 4), TileRect::new(0, 0, 0, 4));
        assert!(g.pairs().is_empty());
    }
}
