// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Seed-viewer platform family.
//!
//! The episode API returns a page URL list plus a per-chapter
//! `scramble_seed`; pages are descrambled with the seeded xorshift shuffle
//! over a 4×4 grid, with a 4-pixel right strip left untouched by the
//! scrambler. The API rejects unsigned requests: a proof header carries a
//! digest chain over the sorted request parameters.

use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use url::Url;

use crate::chapter::error::{ChapterError, Result};
use crate::chapter::page::PageDescriptor;
use crate::chapter::platform::{api_host, last_path_segment};
use crate::chapter::relay::Relay;
use crate::descramble::{PageTransform, ScrambleSpec};

/// Client version/platform the API expects to see signed.
const API_VERSION: &str = "6.0.0";
const API_PLATFORM: &str = "3";
/// Proof header name.
const PROOF_HEADER: &str = "x-request-proof";

/// Shuffle parameters for this family: 4×4 grid, 4 px preserved strip.
const GRID: u32 = 4;
const PRESERVE_RIGHT: u32 = 4;

#[derive(Deserialize)]
struct ChapterData {
    #[allow(dead_code)]
    status: String,
    scramble_seed: u32,
    page_list: Vec<String>,
}

pub(crate) struct Request {
    episode_id: String,
    api_url: String,
}

pub(crate) fn parse(url: &Url) -> Result<Request> {
    let episode_id = last_path_segment(url)
        .ok_or_else(|| ChapterError::MalformedUrl("no episode id in path".into()))?
        .to_string();
    let host = url
        .host_str()
        .ok_or_else(|| ChapterError::MalformedUrl("no host".into()))?;
    let api_url = format!(
        "https://{}/web/episode/viewer?version={API_VERSION}&platform={API_PLATFORM}&episode_id={episode_id}",
        api_host(host, "api"),
    );
    Ok(Request { episode_id, api_url })
}

impl Request {
    pub(crate) async fn pages<R: Relay>(&self, relay: &R) -> Result<Vec<PageDescriptor>> {
        let proof = request_proof(&[
            ("episode_id", &self.episode_id),
            ("platform", API_PLATFORM),
            ("version", API_VERSION),
        ]);
        let headers = vec![(PROOF_HEADER.to_string(), proof)];

        let data: ChapterData = relay.get(&self.api_url, &headers).await?.json()?;

        Ok(data
            .page_list
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                PageDescriptor::plain(index, url).with_transform(PageTransform::Scramble(
                    ScrambleSpec::SeedShuffle {
                        seed: data.scramble_seed,
                        grid: GRID,
                        preserve_right: PRESERVE_RIGHT,
                    },
                ))
            })
            .collect())
    }
}

/// Proof digest over the request parameters.
///
/// For each parameter in key order, `sha256(key)_sha512(value)` (hex) is
/// collected; the comma-joined list is digested with SHA-256 and that hex
/// digest again with SHA-512.
fn request_proof(params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|&(k, _)| k);

    let parts: Vec<String> = sorted
        .iter()
        .map(|(k, v)| {
            format!("{}_{}", hex::encode(Sha256::digest(k)), hex::encode(Sha512::digest(v)))
        })
        .collect();

    let inner = hex::encode(Sha256::digest(parts.join(",")));
    hex::encode(Sha512::digest(inner))
}
