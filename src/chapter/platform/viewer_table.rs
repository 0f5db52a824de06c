// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Viewer-table platform family.
//!
//! The chapter HTML carries a viewer id attribute; two JSON APIs on the
//! same host resolve it to a page count (`/book/episodeInfo`) and then to
//! per-page image URLs with explicit 4×4 scramble tables
//! (`/book/contentsInfo`). Tables are column-major: index `c` is column
//! `c / 4`, row `c % 4`. Both APIs require the chapter page as referer.

use serde::Deserialize;
use url::Url;

use crate::chapter::document;
use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::PageDescriptor;
use crate::chapter::relay::Relay;
use crate::descramble::{order, PageTransform, ScrambleSpec, TableLayout};

const GRID: u32 = 4;
/// Element/attribute names the viewer embeds its id under.
const VIEWER_NODE: (&str, &str) = ("id", "viewer-root");
const VIEWER_ID_ATTR: &str = "data-viewer-id";

#[derive(Deserialize)]
struct EpisodeInfo {
    result: Vec<EpisodeEntry>,
}

#[derive(Deserialize)]
struct EpisodeEntry {
    id: String,
    page_count: String,
}

#[derive(Deserialize)]
struct ContentsInfo {
    result: Vec<ContentsEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentsEntry {
    width: u32,
    height: u32,
    image_url: String,
    scramble: String,
    sort: i64,
}

pub(crate) struct Request {
    page_url: Url,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    if url.host_str().is_none() {
        return Err(ChapterError::MalformedUrl("no host".into()));
    }
    Ok(Request { page_url: url.clone() })
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let referer = vec![("referer".to_string(), self.page_url.to_string())];
        let host = self.page_url.host_str().expect("checked at parse");

        let html = relay.get(self.page_url.as_str(), &[]).await?;
        let viewer_id =
            document::find_attr(html.text()?, "", Some(VIEWER_NODE), VIEWER_ID_ATTR)
                .ok_or(ChapterError::MissingField("viewer id attribute"))?;

        let info: EpisodeInfo = relay
            .get(
                &format!("https://{host}/book/episodeInfo?viewer-id={viewer_id}&isPreview=false"),
                &referer,
            )
            .await?
            .json()?;
        let page_count = info
            .result
            .iter()
            .find(|e| e.id == viewer_id)
            .ok_or(ChapterError::MissingField("episode entry for viewer id"))?
            .page_count
            .parse::<usize>()
            .map_err(ChapterError::schema)?;

        let contents: ContentsInfo = relay
            .get(
                &format!(
                    "https://{host}/book/contentsInfo?user-id=0&viewer-id={viewer_id}&page-from=0&page-to={page_count}"
                ),
                &referer,
            )
            .await?
            .json()?;

        let mut entries = contents.result;
        entries.sort_by_key(|e| e.sort);

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let table = order::parse_table(&entry.scramble, GRID)?;
                Ok(PageDescriptor::plain(index, entry.image_url)
                    .with_headers(referer.clone())
                    .with_declared_size(entry.width, entry.height)
                    .with_transform(PageTransform::Scramble(ScrambleSpec::OrderTable {
                        order: table,
                        grid: GRID,
                        layout: TableLayout::ColumnMajor,
                        trim: (0, 0),
                    })))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_page_url() {
        let url = Url::parse("https://comics.example.jp/episode/42/viewer").unwrap();
        assert_eq!(parse(&url).unwrap().page_url, url);
    }
}
