// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Chapter orchestration: URL → metadata → concurrent page fan-out →
//! archive.
//!
//! A [`ChapterHandler`] moves through `Constructed → MetadataFetched →
//! PagesDiscovered → Downloading → Complete`; construction fails fast on a
//! malformed URL, `execute` consumes the handler so it runs at most once,
//! and every state after construction is internal to that single call.
//!
//! Concurrency model: one future per page, all started together
//! (`join_all`) — page order never matters for the archive because entries
//! key on the fixed page index. [`ExecuteOptions::concurrency`] bounds the
//! fan-out when an embedder needs it; the default is the platform-faithful
//! unbounded join. One page's failure never aborts its siblings: the task
//! records a [`PageFailure`] and the settled counter still advances, so a
//! run with failures still reaches 100% and reports exactly which indices
//! are missing.

pub mod archive;
pub mod document;
pub mod error;
pub mod page;
pub mod platform;
pub mod progress;
pub mod relay;

pub use archive::{PageArchive, PageFormat};
pub use error::ChapterError;
pub use page::{PageDescriptor, PageSource};
pub use platform::{Catalog, Platform};
pub use progress::{CancelToken, ProgressTracker};
pub use relay::{HttpRelay, Relay, RelayConfig, RelayResponse};

use std::num::NonZeroUsize;
use std::sync::Mutex;

use futures::stream::{self, StreamExt};
use url::Url;

use crate::descramble::{self, PageTransform};
use error::Result;

/// Execution tuning. The defaults reproduce the platform-faithful
/// behavior: unbounded page fan-out, no cancellation.
#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
    /// Maximum pages in flight at once; `None` starts all pages together.
    pub concurrency: Option<NonZeroUsize>,
}

/// One page that failed, with the run otherwise intact.
#[derive(Debug)]
pub struct PageFailure {
    /// 0-based page index.
    pub index: usize,
    pub error: ChapterError,
}

/// Result of a completed run: the archive plus any per-page failures.
/// `failures` is empty on a fully successful run; archived pages plus
/// failures always account for every discovered page.
#[derive(Debug)]
pub struct ChapterOutput {
    pub archive: PageArchive,
    pub failures: Vec<PageFailure>,
}

/// One chapter retrieval, from URL to archive.
pub struct ChapterHandler {
    url: Url,
    platform: Platform,
    request: platform::Request,
    progress: ProgressTracker,
    cancel: CancelToken,
}

impl ChapterHandler {
    /// Resolve the URL's hostname through the catalog and parse the
    /// chapter identity.
    ///
    /// # Errors
    /// [`ChapterError::MalformedUrl`] if the URL does not parse or lacks
    /// the platform's identifier pattern;
    /// [`ChapterError::UnsupportedHost`] if no platform is registered for
    /// the hostname.
    pub fn from_url(catalog: &Catalog, url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ChapterError::MalformedUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ChapterError::MalformedUrl(format!("no host in {url}")))?;
        let platform = catalog
            .resolve(host)
            .ok_or_else(|| ChapterError::UnsupportedHost(host.to_string()))?;
        let request = platform.parse(&parsed)?;
        Ok(Self {
            url: parsed,
            platform,
            request,
            progress: ProgressTracker::new(),
            cancel: CancelToken::new(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Handle for polling stage percentages while `execute` runs.
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// Token for cancelling the run from outside. The default token never
    /// fires.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the chapter to completion with default options.
    pub async fn execute<R: Relay>(self, relay: &R) -> Result<ChapterOutput> {
        self.execute_with(relay, ExecuteOptions::default()).await
    }

    /// Run the chapter to completion.
    ///
    /// # Errors
    /// Metadata-phase errors (URL identity, metadata fetch, schema, page
    /// discovery) abort the run with no partial archive. Page-phase errors
    /// do not: they are collected into [`ChapterOutput::failures`].
    pub async fn execute_with<R: Relay>(
        self,
        relay: &R,
        options: ExecuteOptions,
    ) -> Result<ChapterOutput> {
        self.cancel.check()?;

        let descriptors = self.request.pages(relay).await?;
        self.progress.metadata_complete();

        let total = descriptors.len();
        self.progress.begin_download(total as u32);
        log::debug!("{:?}: discovered {total} pages for {}", self.platform, self.url);

        let archive = Mutex::new(PageArchive::new());
        let failures = Mutex::new(Vec::new());

        let tasks = descriptors.into_iter().map(|desc| {
            let archive = &archive;
            let failures = &failures;
            let progress = &self.progress;
            let cancel = &self.cancel;
            async move {
                let index = desc.index;
                if let Err(error) = process_page(relay, desc, archive, cancel).await {
                    log::warn!("page {} failed: {error}", index + 1);
                    failures.lock().unwrap().push(PageFailure { index, error });
                }
                progress.page_settled();
            }
        });

        match options.concurrency {
            None => {
                futures::future::join_all(tasks).await;
            }
            Some(limit) => {
                stream::iter(tasks).buffer_unordered(limit.get()).collect::<Vec<()>>().await;
            }
        }

        let archive = archive.into_inner().expect("page task panicked");
        let mut failures = failures.into_inner().expect("page task panicked");
        failures.sort_by_key(|f| f.index);

        log::debug!(
            "chapter complete: {} archived, {} failed",
            archive.len(),
            failures.len()
        );
        Ok(ChapterOutput { archive, failures })
    }
}

/// Fetch, reconstruct and archive one page.
async fn process_page<R: Relay>(
    relay: &R,
    desc: PageDescriptor,
    archive: &Mutex<PageArchive>,
    cancel: &CancelToken,
) -> Result<()> {
    cancel.check()?;

    let (bytes, transform) = match &desc.source {
        PageSource::Url(url) => {
            let resp = relay.get(url, &desc.headers).await?;
            (resp.body, desc.transform.clone())
        }
        PageSource::Manifest { manifest_url, image_base } => {
            let (image_url, spec) =
                platform::tile_manifest::resolve(relay, manifest_url, image_base, &desc.headers)
                    .await?;
            let resp = relay.get(&image_url, &desc.headers).await?;
            (resp.body, PageTransform::Scramble(spec))
        }
    };

    cancel.check()?;
    let payload = descramble::reconstruct_page(bytes, &transform, desc.declared_size)?;
    archive.lock().unwrap().insert_page(desc.index, desc.format, payload)
}
