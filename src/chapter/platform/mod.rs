// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! The closed set of platform variants.
//!
//! One variant per retrieval/descrambling mechanism family. Each variant
//! implements two operations: `parse` (extract the chapter identity from the
//! input URL, failing fast on a malformed URL) and `pages` (run the
//! platform's metadata requests and derive the ordered page descriptor
//! list). Everything downstream — fetch, transform, archive, progress — is
//! shared orchestration driven purely by descriptor data. Adding a platform
//! means adding a variant plus strategy data here, never touching the
//! pipeline.
//!
//! Hostname routing is a pure [`Catalog`] lookup; the table contents are
//! deployment configuration supplied by the embedder.

pub(crate) mod cell_pack;
pub(crate) mod direct;
pub(crate) mod drm_manifest;
pub(crate) mod sealed_pages;
pub(crate) mod seed_viewer;
pub(crate) mod tile_manifest;
pub(crate) mod viewer_table;

use std::collections::HashMap;

use url::Url;

use super::error::Result;
use super::page::PageDescriptor;
use super::relay::Relay;

/// Mechanism families, one per platform viewer generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Episode JSON API with a per-chapter shuffle seed and signed request
    /// hash; seeded xorshift tile shuffle.
    SeedViewer,
    /// Two-hop configuration-pack metadata; closed-form cell formula.
    CellPack,
    /// HTML viewer attributes + episode/contents JSON APIs; explicit
    /// column-major order tables.
    ViewerTable,
    /// HTML manifest list; per-page tile-pair manifests resolved in the
    /// page task.
    TileManifest,
    /// Embedded JSON state + viewer API; per-page XOR DRM hash.
    DrmManifest,
    /// POSTed viewer request; per-page AES-CBC key/IV.
    SealedPages,
    /// Page-structure JSON; plain downloads.
    Direct,
}

/// Parsed chapter identity, ready to fetch metadata.
pub(crate) enum Request {
    SeedViewer(seed_viewer::Request),
    CellPack(cell_pack::Request),
    ViewerTable(viewer_table::Request),
    TileManifest(tile_manifest::Request),
    DrmManifest(drm_manifest::Request),
    SealedPages(sealed_pages::Request),
    Direct(direct::Request),
}

impl Platform {
    /// Extract this platform's chapter identity from the input URL.
    ///
    /// # Errors
    /// [`ChapterError::MalformedUrl`](super::error::ChapterError) if the
    /// expected identifier pattern is absent.
    pub(crate) fn parse(self, url: &Url) -> Result<Request> {
        match self {
            Self::SeedViewer => seed_viewer::parse(url).map(Request::SeedViewer),
            Self::CellPack => cell_pack::parse(url).map(Request::CellPack),
            Self::ViewerTable => viewer_table::parse(url).map(Request::ViewerTable),
            Self::TileManifest => tile_manifest::parse(url).map(Request::TileManifest),
            Self::DrmManifest => drm_manifest::parse(url).map(Request::DrmManifest),
            Self::SealedPages => sealed_pages::parse(url).map(Request::SealedPages),
            Self::Direct => direct::parse(url).map(Request::Direct),
        }
    }
}

impl Request {
    /// Run the platform's metadata requests and derive the ordered page
    /// descriptor list.
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        match self {
            Self::SeedViewer(r) => r.pages(relay).await,
            Self::CellPack(r) => r.pages(relay).await,
            Self::ViewerTable(r) => r.pages(relay).await,
            Self::TileManifest(r) => r.pages(relay).await,
            Self::DrmManifest(r) => r.pages(relay).await,
            Self::SealedPages(r) => r.pages(relay).await,
            Self::Direct(r) => r.pages(relay).await,
        }
    }
}

/// Pure hostname → platform mapping. Table contents are deployment
/// configuration; the engine ships none.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    hosts: HashMap<String, Platform>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a hostname to a platform variant.
    pub fn insert(&mut self, host: impl Into<String>, platform: Platform) -> &mut Self {
        self.hosts.insert(host.into(), platform);
        self
    }

    pub fn resolve(&self, host: &str) -> Option<Platform> {
        self.hosts.get(host).copied()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl FromIterator<(String, Platform)> for Catalog {
    fn from_iter<T: IntoIterator<Item = (String, Platform)>>(iter: T) -> Self {
        Self { hosts: iter.into_iter().collect() }
    }
}

/// API hostname for a viewer hostname: the leading label is replaced with
/// `api` (`viewer.example.jp` → `api.example.jp`). Hosts without a
/// subdomain get a plain `api.` prefix.
pub(crate) fn api_host(host: &str, prefix: &str) -> String {
    match host.split_once('.') {
        Some((_, apex)) if apex.contains('.') => format!("{prefix}.{apex}"),
        _ => format!("{prefix}.{host}"),
    }
}

/// Last non-empty path segment of a URL, the common chapter-id position.
pub(crate) fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).next_back()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_routes_exact_hosts() {
        let mut c = Catalog::new();
        c.insert("a.example.jp", Platform::Direct);
        assert_eq!(c.resolve("a.example.jp"), Some(Platform::Direct));
        assert_eq!(c.resolve("b.example.jp"), None);
    }

    #[test]
    fn api_host_replaces_leading_label() {
        assert_eq!(api_host("viewer.example.jp", "api"), "api.example.jp");
        assert_eq!(api_host("example.jp", "api"), "api.example.jp");
        assert_eq!(api_host("www.deep.example.co.jp", "img"), "img.deep.example.co.jp");
    }

    #[test]
    fn last_segment_skips_trailing_slash() {
        let url = Url::parse("https://x.jp/a/b/123/").unwrap();
        assert_eq!(last_path_segment(&url), Some("123"));
    }
}
