// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Configuration-pack platform family.
//!
//! Metadata is two hops: the content API resolves the chapter id (`cid`
//! query parameter) to a content base URL, and `configuration_pack.json`
//! under that base lists the page files. Pages are descrambled with the
//! closed-form 64-pixel cell formula, keyed by each page's file path plus
//! the fixed `/0` frame suffix.

use serde::Deserialize;
use url::Url;

use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::PageDescriptor;
use crate::chapter::platform::api_host;
use crate::chapter::relay::Relay;
use crate::descramble::{FormulaSet, PageTransform, ScrambleSpec};

/// Frame suffix appended to every page file path; also part of the
/// formula's pattern key.
const FRAME: &str = "/0";

#[derive(Deserialize)]
struct ContentMeta {
    #[allow(dead_code)]
    status: String,
    url: String,
}

#[derive(Deserialize)]
struct ConfigurationPack {
    configuration: Configuration,
}

#[derive(Deserialize)]
struct Configuration {
    contents: Vec<ContentEntry>,
}

#[derive(Deserialize)]
struct ContentEntry {
    file: String,
}

pub(crate) struct Request {
    api_url: String,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    let cid = url
        .query_pairs()
        .find(|(k, _)| k == "cid")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ChapterError::MalformedUrl("no cid query parameter".into()))?;
    let host = url
        .host_str()
        .ok_or_else(|| ChapterError::MalformedUrl("no host".into()))?;
    Ok(Request { api_url: format!("https://{}/c.php?cid={cid}", api_host(host, "api")) })
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let meta: ContentMeta = relay.get(&self.api_url, &[]).await?.json()?;
        let base = meta.url;

        let pack: ConfigurationPack =
            relay.get(&format!("{base}configuration_pack.json"), &[]).await?.json()?;

        Ok(pack
            .configuration
            .contents
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let key = format!("{}{FRAME}", entry.file);
                PageDescriptor::plain(index, format!("{base}{}{FRAME}.jpeg", entry.file))
                    .with_transform(PageTransform::Scramble(ScrambleSpec::CellFormula {
                        set: FormulaSet::CLASSIC_64,
                        key,
                    }))
            })
            .collect())
    }
}
