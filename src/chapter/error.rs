// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Error taxonomy for a chapter run.
//!
//! Metadata-phase errors abort the whole run with no partial archive;
//! page-phase errors are wrapped per page and never abort siblings (see
//! `chapter::PageFailure`).

use std::fmt;

use crate::descramble::DescrambleError;

/// Errors that can occur while retrieving and reconstructing a chapter.
#[derive(Debug)]
pub enum ChapterError {
    /// The input URL lacks the identifier pattern the platform expects.
    MalformedUrl(String),
    /// No platform is registered for the URL's hostname.
    UnsupportedHost(String),
    /// A metadata or page-info response does not match the expected shape.
    SchemaValidation(String),
    /// A relay fetch failed or returned a non-success status.
    Network { url: String, status: Option<u16>, detail: String },
    /// A required field is absent from an otherwise well-formed response.
    MissingField(&'static str),
    /// Geometry or cipher parameters are inconsistent with the page.
    Descramble(DescrambleError),
    /// Two pages resolved to the same archive index.
    DuplicatePage(usize),
    /// The run was cancelled through its cancellation token.
    Cancelled,
}

impl fmt::Display for ChapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedUrl(msg) => write!(f, "malformed chapter URL: {msg}"),
            Self::UnsupportedHost(host) => write!(f, "unsupported host: {host}"),
            Self::SchemaValidation(msg) => write!(f, "unexpected response shape: {msg}"),
            Self::Network { url, status: Some(code), detail } => {
                write!(f, "fetch of {url} failed with status {code}: {detail}")
            }
            Self::Network { url, status: None, detail } => {
                write!(f, "fetch of {url} failed: {detail}")
            }
            Self::MissingField(field) => write!(f, "required field missing: {field}"),
            Self::Descramble(e) => write!(f, "page reconstruction failed: {e}"),
            Self::DuplicatePage(index) => write!(f, "page index {index} archived twice"),
            Self::Cancelled => write!(f, "chapter run cancelled"),
        }
    }
}

impl std::error::Error for ChapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Descramble(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DescrambleError> for ChapterError {
    fn from(e: DescrambleError) -> Self {
        Self::Descramble(e)
    }
}

impl ChapterError {
    /// Wrap a serde decode failure as a schema mismatch.
    pub(crate) fn schema(e: impl fmt::Display) -> Self {
        Self::SchemaValidation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChapterError>;
