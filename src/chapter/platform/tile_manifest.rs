// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Tile-manifest platform family.
//!
//! The chapter HTML lists one manifest path per page in `data-ptimg`
//! attributes. Each page's manifest is its own JSON document naming the
//! scrambled source image and the literal tile pairs; it is fetched inside
//! the page task (page count × manifests would otherwise serialize the
//! metadata phase), so a broken manifest only fails its own page.

use serde::Deserialize;
use url::Url;

use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::{PageDescriptor, PageSource};
use crate::chapter::relay::{Headers, Relay};
use crate::descramble::ScrambleSpec;

use crate::chapter::document;

/// Attribute naming each page's manifest path.
const MANIFEST_ATTR: &str = "data-ptimg";

#[derive(Deserialize)]
struct Manifest {
    resources: Resources,
    views: Vec<View>,
}

#[derive(Deserialize)]
struct Resources {
    i: ImageResource,
}

#[derive(Deserialize)]
struct ImageResource {
    #[serde(default)]
    src: Option<String>,
}

#[derive(Deserialize)]
struct View {
    width: u32,
    height: u32,
    coords: Vec<String>,
}

pub(crate) struct Request {
    base_url: String,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    if url.host_str().is_none() {
        return Err(ChapterError::MalformedUrl("no host".into()));
    }
    let mut base = url.as_str().trim_end_matches('/').to_string();
    if let Some(stripped) = base.strip_suffix("/index.html") {
        base = stripped.to_string();
    }
    Ok(Request { base_url: base })
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let html = relay.get(&self.base_url, &[]).await?;
        let manifests = document::all_attr_values(html.text()?, MANIFEST_ATTR);
        if manifests.is_empty() {
            return Err(ChapterError::MissingField("page manifest list"));
        }

        Ok(manifests
            .into_iter()
            .enumerate()
            .map(|(index, path)| {
                let mut desc = PageDescriptor::plain(index, "");
                desc.source = PageSource::Manifest {
                    manifest_url: format!("{}/{path}", self.base_url),
                    image_base: format!("{}/data", self.base_url),
                };
                desc
            })
            .collect())
    }
}

/// Resolve one page's manifest into its image URL and scramble spec.
/// Runs inside the page task.
///
/// # Errors
/// [`ChapterError::MissingField`] if the manifest names no source image or
/// carries no view; schema/network errors as usual.
pub(crate) async fn resolve<R: Relay>(
    relay: &R,
    manifest_url: &str,
    image_base: &str,
    headers: &Headers,
) -> Result<(String, ScrambleSpec)> {
    let manifest: Manifest = relay.get(manifest_url, headers).await?.json()?;

    let src = manifest
        .resources
        .i
        .src
        .filter(|s| !s.is_empty())
        .ok_or(ChapterError::MissingField("manifest image source"))?;
    let view = manifest
        .views
        .into_iter()
        .next()
        .ok_or(ChapterError::MissingField("manifest view"))?;

    Ok((
        format!("{image_base}/{src}"),
        ScrambleSpec::TileStrips { entries: view.coords, width: view.width, height: view.height },
    ))
}
