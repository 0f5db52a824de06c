// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Per-page descriptors produced by metadata parsing.

use crate::descramble::PageTransform;

pub use super::archive::PageFormat;

/// Where one page's bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageSource {
    /// Fetch the image directly from this URL.
    Url(String),
    /// Fetch a per-page manifest first; it names the image URL and carries
    /// the tile pairs (the manifest family resolves scramble data inside
    /// the page task, one manifest per page).
    Manifest { manifest_url: String, image_base: String },
}

/// Everything a page task needs: remote reference, request headers, output
/// format and the reconstruction transform. Produced once during metadata
/// parsing and read-only afterwards.
#[derive(Clone, Debug)]
pub struct PageDescriptor {
    /// 0-based ordering key; also the archive index.
    pub index: usize,
    pub source: PageSource,
    /// Extra request headers for this page's fetches (referer etc.).
    pub headers: Vec<(String, String)>,
    /// Dimensions declared by metadata, when the platform provides them.
    pub declared_size: Option<(u32, u32)>,
    pub format: PageFormat,
    pub transform: PageTransform,
}

impl PageDescriptor {
    /// Plain direct-download page with no transform.
    pub fn plain(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            source: PageSource::Url(url.into()),
            headers: Vec::new(),
            declared_size: None,
            format: PageFormat::Jpeg,
            transform: PageTransform::None,
        }
    }

    pub fn with_transform(mut self, transform: PageTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_format(mut self, format: PageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_declared_size(mut self, width: u32, height: u32) -> Self {
        self.declared_size = Some((width, height));
        self
    }
}
