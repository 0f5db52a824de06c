// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! # mosaic-core
//!
//! Chapter retrieval and image descrambling engine. Turns a chapter URL on a
//! supported platform into an ordered archive of reconstructed page images:
//!
//! 1. metadata retrieval through an allow-listed forwarding relay,
//! 2. concurrent per-page fetch,
//! 3. per-page reconstruction — tile un-shuffling (explicit order tables,
//!    closed-form cell formulas, seeded pseudo-random shuffles, literal
//!    tile-pair manifests) and/or symmetric decryption (AES-128-CBC,
//!    repeating-key XOR),
//! 4. archive assembly with live progress reporting.
//!
//! The raster compositor (`raster` module) is codec-thin: pages are decoded
//! into plain RGBA buffers, tiles are copied rect-by-rect, and the result is
//! re-encoded. The descrambling catalog (`descramble` module) treats every
//! platform scheme as data — the pipeline never branches on a platform name.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use mosaic_core::chapter::{Catalog, ChapterHandler, HttpRelay, Platform, RelayConfig};
//!
//! let mut catalog = Catalog::new();
//! catalog.insert("viewer.example.jp", Platform::SeedViewer);
//!
//! let relay = HttpRelay::new(RelayConfig::new("https://relay.local")
//!     .with_cookie("session=...")
//!     .allow_host("viewer.example.jp"))?;
//!
//! let handler = ChapterHandler::from_url(&catalog, "https://viewer.example.jp/episode/1234")?;
//! let output = handler.execute(&relay).await?;
//! for (name, bytes) in output.archive.entries() {
//!     std::fs::write(name, bytes)?;
//! }
//! ```

pub mod chapter;
pub mod descramble;
pub mod raster;

pub use chapter::error::ChapterError;
pub use chapter::{Catalog, ChapterHandler, ChapterOutput, ExecuteOptions, PageFailure, Platform};
pub use chapter::{HttpRelay, Relay, RelayConfig, RelayResponse};
pub use chapter::{CancelToken, PageArchive, ProgressTracker};
pub use descramble::error::DescrambleError;
pub use descramble::{reconstruct, reconstruct_page, CipherSpec, PageTransform, ScrambleSpec};
pub use raster::error::RasterError;
pub use raster::Raster;
