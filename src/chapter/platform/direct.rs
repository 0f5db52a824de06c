// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Direct-download platform family.
//!
//! The reader exposes the whole chapter as `<chapter-url>.json` (behind a
//! mobile user agent); page entries typed `main` are the content, the rest
//! are covers, spreads and back-matter links. No obfuscation — bytes go
//! straight to the archive.

use serde::Deserialize;
use url::Url;

use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::PageDescriptor;
use crate::chapter::relay::Relay;

const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 9; Pixel) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/85.0.4026.0 Mobile Safari/537.36";
/// Page entry type that carries chapter content.
const MAIN_PAGE_TYPE: &str = "main";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterDocument {
    readable_product: ReadableProduct,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadableProduct {
    page_structure: PageStructure,
}

#[derive(Deserialize)]
struct PageStructure {
    pages: Vec<PageEntry>,
}

#[derive(Deserialize)]
struct PageEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    src: Option<String>,
}

pub(crate) struct Request {
    json_url: String,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    if url.host_str().is_none() {
        return Err(ChapterError::MalformedUrl("no host".into()));
    }
    Ok(Request { json_url: format!("{}.json", url.as_str().trim_end_matches('/')) })
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let ua = vec![("User-Agent".to_string(), USER_AGENT.to_string())];
        let doc: ChapterDocument = relay.get(&self.json_url, &ua).await?.json()?;

        doc.readable_product
            .page_structure
            .pages
            .into_iter()
            .filter(|p| p.kind == MAIN_PAGE_TYPE)
            .enumerate()
            .map(|(index, p)| {
                let src = p.src.ok_or(ChapterError::MissingField("main page source URL"))?;
                Ok(PageDescriptor::plain(index, src))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_appends_json_suffix() {
        let url = Url::parse("https://days.example.jp/episode/321").unwrap();
        assert_eq!(parse(&url).unwrap().json_url, "https://days.example.jp/episode/321.json");
    }
}
