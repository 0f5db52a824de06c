// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Explicit order-table descrambling.
//!
//! The simplest scheme: metadata carries the permutation verbatim as a list
//! of source cell indices, one per destination cell, over a square grid
//! (4×4 in every deployment seen so far). Two wire details vary by platform
//! and are carried as data:
//!
//! - **index layout**: whether cell index `c` decodes to
//!   `(x, y) = (c % G, c / G)` (row-major) or `(c / G, c % G)`
//!   (column-major);
//! - **cell trim**: one family shrinks each cell by a fixed margin
//!   (`floor(size/G) - trim`), leaving narrow seams that were never part of
//!   the scramble.
//!
//! Cells are laid out at the (possibly trimmed) cell pitch. Remainder and
//! trimmed margin pixels are passed through in place — the original drew
//! onto a blank canvas and simply left them, but the archive keeps the whole
//! page.

use super::error::{DescrambleError, Result};
use super::geometry::{TileGeometry, TileRect};

/// How a flat cell index maps to grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableLayout {
    /// `c % G` is the column, `c / G` the row.
    RowMajor,
    /// `c / G` is the column, `c % G` the row.
    ColumnMajor,
}

impl TableLayout {
    fn decode(self, index: u32, grid: u32) -> (u32, u32) {
        match self {
            Self::RowMajor => (index % grid, index / grid),
            Self::ColumnMajor => (index / grid, index % grid),
        }
    }
}

/// Parse a scramble table of the text form `"[5, 0, 3, ...]"`.
///
/// Brackets and whitespace are stripped; entries must be a permutation of
/// `0..grid²`.
///
/// # Errors
/// [`DescrambleError::InvalidOrderTable`] on parse failure, wrong length or
/// repeated indices.
pub fn parse_table(raw: &str, grid: u32) -> Result<Vec<u32>> {
    let total = grid * grid;
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '[' && *c != ']').collect();
    let mut order = Vec::with_capacity(total as usize);
    for part in cleaned.split(',') {
        let v: u32 = part
            .parse()
            .map_err(|_| DescrambleError::InvalidOrderTable(format!("bad entry {part:?}")))?;
        order.push(v);
    }
    validate_order(&order, grid)?;
    Ok(order)
}

/// Check that `order` is a permutation of `0..grid²`.
pub fn validate_order(order: &[u32], grid: u32) -> Result<()> {
    let total = grid * grid;
    if order.len() != total as usize {
        return Err(DescrambleError::InvalidOrderTable(format!(
            "expected {total} entries, got {}",
            order.len()
        )));
    }
    let mut seen = vec![false; total as usize];
    for &v in order {
        if v >= total {
            return Err(DescrambleError::InvalidOrderTable(format!("index {v} out of range")));
        }
        if seen[v as usize] {
            return Err(DescrambleError::InvalidOrderTable(format!("index {v} repeated")));
        }
        seen[v as usize] = true;
    }
    Ok(())
}

/// Build the reconstruction geometry for an order-table page.
///
/// `trim` is the per-cell margin `(x, y)` subtracted from the computed cell
/// size; `(0, 0)` for platforms without it.
///
/// # Errors
/// [`DescrambleError::InvalidOrderTable`] if the table is not a permutation,
/// [`DescrambleError::DegenerateGrid`] if trimming leaves no cell area.
pub fn geometry(
    width: u32,
    height: u32,
    order: &[u32],
    grid: u32,
    layout: TableLayout,
    trim: (u32, u32),
) -> Result<TileGeometry> {
    if grid == 0 {
        return Err(DescrambleError::DegenerateGrid { width, height, detail: "grid size is zero" });
    }
    validate_order(order, grid)?;

    let cell_w = (width / grid).saturating_sub(trim.0);
    let cell_h = (height / grid).saturating_sub(trim.1);
    if cell_w == 0 || cell_h == 0 {
        return Err(DescrambleError::DegenerateGrid { width, height, detail: "zero-sized grid cell" });
    }

    let mut geom = TileGeometry::new(width, height);

    // Untouched remainder (and trimmed margin) columns and rows.
    let span = grid * cell_w;
    if span < width {
        let strip = TileRect::new(span, 0, width - span, height);
        geom.push(strip, strip);
    }
    let vspan = grid * cell_h;
    if vspan < height {
        let strip = TileRect::new(0, vspan, span, height - vspan);
        geom.push(strip, strip);
    }

    for (dst_idx, &src_idx) in order.iter().enumerate() {
        let (sx, sy) = layout.decode(src_idx, grid);
        let (dx, dy) = layout.decode(dst_idx as u32, grid);
        geom.push(
            TileRect::new(sx * cell_w, sy * cell_h, cell_w, cell_h),
            TileRect::new(dx * cell_w, dy * cell_h, cell_w, cell_h),
        );
    }
    Ok(geom)
}
