// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! DRM-manifest platform family.
//!
//! The chapter page embeds its framework state as JSON in a script element;
//! the episode id buried in that state drives the viewer API, which lists
//! per-page WebP images each XOR-enciphered with an 8-byte keystream from
//! the page's DRM hash. Pages with an empty hash are served plain (and as
//! JPEG). The site answers with framework HTML only for a browser-looking
//! user agent.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::chapter::document;
use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::{PageDescriptor, PageFormat};
use crate::chapter::relay::Relay;
use crate::descramble::{CipherSpec, PageTransform};

/// Script element carrying the embedded framework state.
const STATE_NODE: (&str, &str) = ("id", "__NEXT_DATA__");
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
/// Image size variant requested from the viewer API.
const IMAGE_SIZE_TYPE: &str = "width%3A1284";

#[derive(Deserialize)]
struct Contents {
    manuscripts: Vec<Manuscript>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manuscript {
    #[serde(default)]
    drm_mode: Option<String>,
    #[serde(default)]
    drm_hash: Option<String>,
    drm_image_url: String,
    page: i64,
}

pub(crate) struct Request {
    page_url: Url,
    #[allow(dead_code)]
    work_code: String,
    #[allow(dead_code)]
    episode_code: String,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        ["detail", work, "episodes", episode, ..] => Ok(Request {
            page_url: url.clone(),
            work_code: (*work).to_string(),
            episode_code: (*episode).to_string(),
        }),
        _ => Err(ChapterError::MalformedUrl(
            "expected /detail/<work>/episodes/<episode> path".into(),
        )),
    }
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let ua = vec![("User-Agent".to_string(), USER_AGENT.to_string())];
        let host = self.page_url.host_str().expect("checked at parse");

        let html = relay.get(self.page_url.as_str(), &ua).await?;
        let state_json = document::element_text(html.text()?, "script", Some(STATE_NODE))
            .ok_or(ChapterError::MissingField("embedded framework state"))?;
        let state: Value = serde_json::from_str(&state_json).map_err(ChapterError::schema)?;
        let episode_id = find_episode_id(&state)
            .ok_or(ChapterError::MissingField("episode id in framework state"))?;

        let contents: Contents = relay
            .get(
                &format!(
                    "https://{host}/api/contents/viewer?episodeId={episode_id}&imageSizeType={IMAGE_SIZE_TYPE}"
                ),
                &ua,
            )
            .await?
            .json()?;

        let mut manuscripts = contents.manuscripts;
        manuscripts.sort_by_key(|m| m.page);

        manuscripts
            .into_iter()
            .enumerate()
            .map(|(index, m)| {
                let desc = PageDescriptor::plain(index, m.drm_image_url);
                match m.drm_hash.as_deref() {
                    None | Some("") => Ok(desc),
                    Some(hash) => {
                        if m.drm_mode.as_deref() != Some("xor") {
                            return Err(ChapterError::SchemaValidation(format!(
                                "unsupported drm mode {:?}",
                                m.drm_mode
                            )));
                        }
                        Ok(desc
                            .with_format(PageFormat::Webp)
                            .with_transform(PageTransform::Cipher(CipherSpec::XorStream {
                                drm_hash: hash.to_string(),
                            })))
                    }
                }
            })
            .collect()
    }
}

/// Walk the framework state's query cache for the episode record id.
fn find_episode_id(state: &Value) -> Option<String> {
    let queries = state
        .get("props")?
        .get("pageProps")?
        .get("dehydratedState")?
        .get("queries")?
        .as_array()?;
    queries.iter().find_map(|q| {
        q.get("state")?
            .get("data")?
            .get("episode")?
            .get("id")?
            .as_str()
            .map(str::to_string)
    })
}
