// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Closed-form coordinate-formula descrambling.
//!
//! One viewer family scrambles pages by permuting fixed-size cells with
//! modular arithmetic parameterized by a small "pattern" integer derived
//! from a weak checksum of the page's file path. Pages whose dimensions are
//! not exact cell multiples additionally carry a scrambled remainder row
//! strip and column strip, each permuted by its own partial-pass formula and
//! keyed to an anchor cell where the remainder pixels are folded into the
//! destination layout.
//!
//! The formulas below are transcriptions of the reverse-engineered viewer.
//! Every multiplier is carried in a [`FormulaSet`] value — the engine holds
//! no per-platform constants, and a new formula family is a new `FormulaSet`,
//! not new code. Arithmetic is signed 64-bit with truncated remainder to
//! reproduce the original's (JavaScript) modulo semantics bit for bit,
//! including the quirky small-grid cases.

use super::error::{DescrambleError, Result};
use super::geometry::{TileGeometry, TileRect};

/// Multiplier table for one formula family.
///
/// Field names follow the pass that consumes them: `grid_*` drive the
/// full-grid pass, `row_*`/`col_*` drive the remainder strip passes,
/// `anchor_*` derive the fold-in anchor cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormulaSet {
    /// Cell edge length in pixels.
    pub cell: u32,
    /// Pattern modulus: pattern = byte-sum(key) % modulus + 1.
    pub pattern_modulus: u32,
    pub grid_x_pat: i64,
    pub grid_x_cross: i64,
    pub grid_y_pat: i64,
    pub grid_y_cross: i64,
    pub anchor_x_mul: i64,
    pub anchor_y_mul: i64,
    pub row_x_mul: i64,
    pub row_y_pat: i64,
    pub row_y_anchor: i64,
    pub col_x_pat: i64,
    pub col_x_off: i64,
    pub col_y_mul: i64,
}

impl FormulaSet {
    /// The 64-pixel-cell formula family used by the configuration-pack
    /// viewers.
    pub const CLASSIC_64: FormulaSet = FormulaSet {
        cell: 64,
        pattern_modulus: 4,
        grid_x_pat: 29,
        grid_x_cross: 31,
        grid_y_pat: 37,
        grid_y_cross: 41,
        anchor_x_mul: 43,
        anchor_y_mul: 47,
        row_x_mul: 61,
        row_y_pat: 53,
        row_y_anchor: 59,
        col_x_pat: 67,
        col_x_off: 71,
        col_y_mul: 73,
    };
}

/// Weak checksum pattern: sum of the key's byte values, reduced mod the
/// set's modulus, plus one.
pub fn pattern_of(key: &str, set: &FormulaSet) -> i64 {
    let sum: u64 = key.bytes().map(u64::from).sum();
    (sum % set.pattern_modulus as u64) as i64 + 1
}

/// `a * cell`, shifted right/down by the remainder once `a` passes the
/// anchor cell.
fn pos_with_rest(a: i64, anchor: i64, rem: i64, cell: i64) -> i64 {
    if a >= anchor {
        a * cell + rem
    } else {
        a * cell
    }
}

/// Row-strip source cell x for destination cell `a`.
fn row_src_x(a: i64, chunks_x: i64, pattern: i64, set: &FormulaSet) -> i64 {
    (a + set.row_x_mul * pattern) % chunks_x
}

/// Row-strip source cell y; also decides the remainder fold for grid cells.
fn row_src_y(
    a: i64,
    anchor_x: i64,
    anchor_y: i64,
    chunks_y: i64,
    pattern: i64,
    set: &FormulaSet,
) -> Option<i64> {
    let mut upper = pattern % 2 == 1;
    if a >= anchor_x {
        upper = !upper;
    }
    let (modulus, offset) = if upper { (anchor_y, 0) } else { (chunks_y - anchor_y, anchor_y) };
    if modulus <= 0 {
        return None;
    }
    Some((a + set.row_y_pat * pattern + set.row_y_anchor * anchor_y) % modulus + offset)
}

/// Column-strip source cell x; also decides the remainder fold for grid cells.
fn col_src_x(
    a: i64,
    anchor_x: i64,
    anchor_y: i64,
    chunks_x: i64,
    pattern: i64,
    set: &FormulaSet,
) -> Option<i64> {
    let mut right = pattern % 2 == 1;
    if a >= anchor_y {
        right = !right;
    }
    let (modulus, offset) = if right { (chunks_x - anchor_x, anchor_x) } else { (anchor_x, 0) };
    if modulus <= 0 {
        return None;
    }
    Some((a + set.col_x_pat * pattern + anchor_x + set.col_x_off) % modulus + offset)
}

/// Column-strip source cell y for destination cell `a`.
fn col_src_y(a: i64, chunks_y: i64, pattern: i64, set: &FormulaSet) -> i64 {
    (a + set.col_y_mul * pattern) % chunks_y
}

/// Fold-in anchor cell index along one axis.
fn anchor(chunks: i64, mul: i64, pattern: i64) -> i64 {
    let mut a = chunks - (mul * pattern) % chunks;
    if a % chunks == 0 {
        a = (chunks - 4) % chunks;
        if a == 0 {
            a = chunks - 1;
        }
    }
    a
}

struct Grid {
    width: u32,
    height: u32,
}

impl Grid {
    fn fail(&self, detail: &'static str) -> DescrambleError {
        DescrambleError::DegenerateGrid { width: self.width, height: self.height, detail }
    }

    fn strip(&self, v: Option<i64>) -> Result<i64> {
        v.ok_or_else(|| self.fail("strip formula modulus collapsed"))
    }

    fn px(&self, v: i64) -> Result<u32> {
        u32::try_from(v).map_err(|_| self.fail("formula produced a negative coordinate"))
    }
}

/// Build the reconstruction geometry for a formula-scrambled page.
///
/// Emits the remainder row strip and column strip passes first, then the
/// full-grid pass, exactly as the viewer draws them. The viewer never
/// repaints the rem×rem corner at the anchor cell (its canvas keeps a hole
/// there); an identity pair is emitted for it so that every destination
/// pixel is written exactly once.
///
/// # Errors
/// [`DescrambleError::DegenerateGrid`] when the page is smaller than one
/// cell or the anchor derivation collapses (tiny grids), where the original
/// silently produced NaN coordinates and drew nothing.
pub fn geometry(width: u32, height: u32, set: &FormulaSet, key: &str) -> Result<TileGeometry> {
    let grid = Grid { width, height };
    let cell = set.cell as i64;
    if set.cell == 0 || set.pattern_modulus == 0 {
        return Err(grid.fail("formula set has a zero parameter"));
    }
    let chunks_x = width as i64 / cell;
    let chunks_y = height as i64 / cell;
    if chunks_x == 0 || chunks_y == 0 {
        return Err(grid.fail("page smaller than one cell"));
    }
    let rem_w = width as i64 % cell;
    let rem_h = height as i64 % cell;
    let pattern = pattern_of(key, set);

    let anchor_x = anchor(chunks_x, set.anchor_x_mul, pattern);
    let anchor_y = anchor(chunks_y, set.anchor_y_mul, pattern);

    let mut geom = TileGeometry::new(width, height);

    // Remainder row strip: one cell-wide piece per grid column, folded into
    // the anchor row of the destination.
    if rem_h > 0 {
        for i in 0..chunks_x {
            let p = row_src_x(i, chunks_x, pattern, set);
            let k = grid.strip(row_src_y(p, anchor_x, anchor_y, chunks_y, pattern, set))?;
            let src_x = pos_with_rest(p, anchor_x, rem_w, cell);
            let src_y = k * cell;
            let dst_x = pos_with_rest(i, anchor_x, rem_w, cell);
            let dst_y = anchor_y * cell;
            geom.push(
                TileRect::new(grid.px(src_x)?, grid.px(src_y)?, set.cell, rem_h as u32),
                TileRect::new(grid.px(dst_x)?, grid.px(dst_y)?, set.cell, rem_h as u32),
            );
        }
    }

    // Remainder column strip, folded into the anchor column.
    if rem_w > 0 {
        for i in 0..chunks_y {
            let k = col_src_y(i, chunks_y, pattern, set);
            let p = grid.strip(col_src_x(k, anchor_x, anchor_y, chunks_x, pattern, set))?;
            let src_x = p * cell;
            let src_y = pos_with_rest(k, anchor_y, rem_h, cell);
            let dst_x = anchor_x * cell;
            let dst_y = pos_with_rest(i, anchor_y, rem_h, cell);
            geom.push(
                TileRect::new(grid.px(src_x)?, grid.px(src_y)?, rem_w as u32, set.cell),
                TileRect::new(grid.px(dst_x)?, grid.px(dst_y)?, rem_w as u32, set.cell),
            );
        }
    }

    // The corner the strips never reach; kept in place by the scrambler.
    if rem_w > 0 && rem_h > 0 {
        let corner = TileRect::new(
            grid.px(anchor_x * cell)?,
            grid.px(anchor_y * cell)?,
            rem_w as u32,
            rem_h as u32,
        );
        geom.push(corner, corner);
    }

    // Full-grid pass.
    for i in 0..chunks_x {
        for j in 0..chunks_y {
            let p = (i + set.grid_x_pat * pattern + set.grid_x_cross * j) % chunks_x;
            let k = (j + set.grid_y_pat * pattern + set.grid_y_cross * p) % chunks_y;

            let fold_x = grid.strip(col_src_x(k, anchor_x, anchor_y, chunks_x, pattern, set))?;
            let fold_y = grid.strip(row_src_y(p, anchor_x, anchor_y, chunks_y, pattern, set))?;
            let src_x = p * cell + if p >= fold_x { rem_w } else { 0 };
            let src_y = k * cell + if k >= fold_y { rem_h } else { 0 };

            let dst_x = pos_with_rest(i, anchor_x, rem_w, cell);
            let dst_y = pos_with_rest(j, anchor_y, rem_h, cell);
            geom.push(
                TileRect::new(grid.px(src_x)?, grid.px(src_y)?, set.cell, set.cell),
                TileRect::new(grid.px(dst_x)?, grid.px(dst_y)?, set.cell, set.cell),
            );
        }
    }

    Ok(geom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SET: &FormulaSet = &FormulaSet::CLASSIC_64;

    #[test]
    fn pattern_is_byte_sum_mod_plus_one() {
        // 'a' = 97 → 97 % 4 + 1 = 2
        assert_eq!(pattern_of("a", SET), 2);
        assert_eq!(pattern_of("", SET), 1);
    }

    /// Full-grid mapping is a bijection over the cell set for every pattern.
    #[test]
    fn grid_pass_is_bijective() {
        for pattern in 1..=4 {
            let (chunks_x, chunks_y) = (5i64, 7i64);
            let mut seen = vec![false; (chunks_x * chunks_y) as usize];
            for i in 0..chunks_x {
                for j in 0..chunks_y {
                    let p = (i + SET.grid_x_pat * pattern + SET.grid_x_cross * j) % chunks_x;
                    let k = (j + SET.grid_y_pat * pattern + SET.grid_y_cross * p) % chunks_y;
                    let at = (k * chunks_x + p) as usize;
                    assert!(!seen[at], "source cell ({p},{k}) mapped twice (pattern {pattern})");
                    seen[at] = true;
                }
            }
            assert!(seen.iter().all(|&s| s), "unmapped source cell (pattern {pattern})");
        }
    }

    /// Strip source-x formula is a bijection over grid columns.
    #[test]
    fn strip_passes_are_bijective() {
        for pattern in 1..=4 {
            let chunks = 9i64;
            let mut xs: Vec<i64> = (0..chunks).map(|i| row_src_x(i, chunks, pattern, SET)).collect();
            xs.sort();
            assert_eq!(xs, (0..chunks).collect::<Vec<_>>());

            let mut ys: Vec<i64> = (0..chunks).map(|i| col_src_y(i, chunks, pattern, SET)).collect();
            ys.sort();
            assert_eq!(ys, (0..chunks).collect::<Vec<_>>());
        }
    }

    #[test]
    fn exact_multiple_geometry_is_complete() {
        let g = geometry(256, 320, SET, "pages/0007.jpg/0").unwrap();
        g.validate(256, 320).unwrap();
        assert!(g.is_complete(256, 320));
        // 4×5 grid, no strips.
        assert_eq!(g.pairs().len(), 20);
    }

    /// Remainder strips + corner + grid must tile the page exactly, for
    /// every pattern value ("a".."abcd" cover patterns 2, 4, 3, 1).
    #[test]
    fn remainder_geometry_is_complete() {
        for key in ["a", "ab", "abc", "abcd"] {
            let g = geometry(300, 280, SET, key).unwrap();
            g.validate(300, 280).unwrap();
            assert!(g.is_complete(300, 280), "incomplete cover for key {key:?}");
        }
    }

    #[test]
    fn geometry_is_deterministic() {
        let a = geometry(300, 280, SET, "chapter/12").unwrap();
        let b = geometry(300, 280, SET, "chapter/12").unwrap();
        assert_eq!(a.pairs(), b.pairs());
    }

    #[test]
    fn undersized_page_is_rejected() {
        assert!(matches!(
            geometry(63, 200, SET, "x"),
            Err(DescrambleError::DegenerateGrid { .. })
        ));
    }
}
