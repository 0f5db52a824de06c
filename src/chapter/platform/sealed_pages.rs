// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Sealed-pages platform family.
//!
//! The viewer API takes a POSTed request body (the relay forwards it byte
//! for byte) and answers with the page list; each sealed page carries its
//! own hex AES-128-CBC key and IV, unsealed pages come plain. Extra/filler
//! pages (ads, author notes slots) are dropped at discovery so the archive
//! holds exactly the chapter pages. Two URL shapes exist: a direct viewer
//! link with the chapter id, and a series link meaning "first readable
//! chapter of this series".

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::PageDescriptor;
use crate::chapter::platform::{api_host, last_path_segment};
use crate::chapter::relay::Relay;
use crate::descramble::{CipherSpec, PageTransform};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    chapter_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    series_argument: Option<SeriesArgument>,
    use_ticket: bool,
    device_info: DeviceInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesArgument {
    series_id: u64,
    position: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInfo {
    device_type: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerResponse {
    viewer_data: ViewerData,
}

#[derive(Deserialize)]
struct ViewerData {
    pages: Vec<ViewerPage>,
}

#[derive(Deserialize)]
struct ViewerPage {
    #[serde(default)]
    image: Option<PageImage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageImage {
    image_url: String,
    #[serde(default)]
    iv: Option<String>,
    #[serde(default)]
    encryption_key: Option<String>,
    #[serde(default)]
    is_extra_page: bool,
}

pub(crate) struct Request {
    id: u64,
    is_viewer: bool,
    api_url: String,
    image_host: String,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    let id: u64 = last_path_segment(url)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ChapterError::MalformedUrl("no numeric chapter id in path".into()))?;
    let host = url
        .host_str()
        .ok_or_else(|| ChapterError::MalformedUrl("no host".into()))?;
    let is_viewer = url.path_segments().is_some_and(|mut s| s.any(|p| p == "viewer"));
    Ok(Request {
        id,
        is_viewer,
        api_url: format!("https://{}/v1/web_viewer", api_host(host, "api")),
        image_host: api_host(host, "img"),
    })
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let body = if self.is_viewer {
            ViewerRequest {
                chapter_id: Some(self.id),
                series_argument: None,
                use_ticket: false,
                device_info: DeviceInfo { device_type: 3 },
            }
        } else {
            ViewerRequest {
                chapter_id: None,
                series_argument: Some(SeriesArgument { series_id: self.id, position: "detail" }),
                use_ticket: false,
                device_info: DeviceInfo { device_type: 3 },
            }
        };
        let body = serde_json::to_vec(&body).map_err(ChapterError::schema)?;

        let resp: ViewerResponse = relay.post(&self.api_url, &[], body).await?.json()?;

        let images = resp
            .viewer_data
            .pages
            .into_iter()
            .filter_map(|p| p.image)
            .filter(|img| !img.is_extra_page);

        Ok(images
            .enumerate()
            .map(|(index, img)| {
                let url = if img.image_url.starts_with("http") {
                    img.image_url
                } else {
                    format!("https://{}{}", self.image_host, img.image_url)
                };
                let desc = PageDescriptor::plain(index, url);
                match (img.encryption_key, img.iv) {
                    (Some(key), Some(iv)) if !key.is_empty() && !iv.is_empty() => desc
                        .with_transform(PageTransform::Cipher(CipherSpec::AesCbc { key, iv })),
                    _ => desc,
                }
            })
            .collect())
    }
}
