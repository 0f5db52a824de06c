// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Per-run progress tracking and cancellation.
//!
//! Uses atomics so concurrent page tasks can publish without locking. A
//! tracker is owned by exactly one chapter run; the handle is cheaply
//! cloneable so a UI can poll it while `execute` is in flight.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::error::ChapterError;

/// Names of the two run stages, in order.
pub const STAGE_METADATA: &str = "metadata";
pub const STAGE_DOWNLOAD: &str = "download";

#[derive(Default)]
struct Stage {
    step: AtomicU32,
    total: AtomicU32,
    done: AtomicBool,
}

impl Stage {
    /// Set the step total without touching the current step.
    fn begin(&self, total: u32) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Advance by one step, capped at the total.
    fn advance(&self) {
        let total = self.total.load(Ordering::Relaxed);
        let _ = self.step.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
            if s < total {
                Some(s + 1)
            } else {
                Some(s)
            }
        });
        if self.step.load(Ordering::Relaxed) == total && total > 0 {
            self.done.store(true, Ordering::Relaxed);
        }
    }

    /// Mark the stage complete (step = total).
    fn finish(&self) {
        let total = self.total.load(Ordering::Relaxed);
        self.step.store(total, Ordering::Relaxed);
        self.done.store(true, Ordering::Relaxed);
    }

    /// Fractional completion in [0, 1].
    fn percentage(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return if self.done.load(Ordering::Relaxed) { 1.0 } else { 0.0 };
        }
        f64::from(self.step.load(Ordering::Relaxed)) / f64::from(total)
    }
}

struct Inner {
    metadata: Stage,
    download: Stage,
}

/// Ordered (metadata, download) stage list for one chapter run.
///
/// The metadata stage jumps to 1.0 once page descriptors are known; the
/// download stage is completed-pages / total-pages, monotone, reaching
/// exactly 1.0 when every page task has settled.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner { metadata: Stage::default(), download: Stage::default() }),
        }
    }

    /// Snapshot of `(stage name, percentage)` in stage order.
    pub fn snapshot(&self) -> Vec<(&'static str, f64)> {
        vec![
            (STAGE_METADATA, self.inner.metadata.percentage()),
            (STAGE_DOWNLOAD, self.inner.download.percentage()),
        ]
    }

    pub fn metadata_percentage(&self) -> f64 {
        self.inner.metadata.percentage()
    }

    pub fn download_percentage(&self) -> f64 {
        self.inner.download.percentage()
    }

    pub(crate) fn metadata_complete(&self) {
        self.inner.metadata.finish();
    }

    pub(crate) fn begin_download(&self, total_pages: u32) {
        self.inner.download.begin(total_pages);
        if total_pages == 0 {
            // Nothing to wait for; the stage is complete by definition.
            self.inner.download.finish();
        }
    }

    pub(crate) fn page_settled(&self) {
        self.inner.download.advance();
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag threaded through every page task.
///
/// The default token never fires, so a run goes to completion unless the
/// embedder explicitly cancels. Checked at page-task boundaries; an
/// in-flight relay request is not interrupted.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run holding this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Return `Err(ChapterError::Cancelled)` once fired.
    pub fn check(&self) -> Result<(), ChapterError> {
        if self.is_cancelled() {
            Err(ChapterError::Cancelled)
        } else {
            Ok(())
        }
    }
}
