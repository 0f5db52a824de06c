// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! The forwarding-relay collaborator.
//!
//! The engine never contacts content hosts directly: every outbound fetch
//! goes through a relay service that attaches the shared session cookie and
//! copies the upstream content type onto its response. [`Relay`] is the
//! seam — handlers are generic over it, tests substitute an in-memory
//! implementation — and [`HttpRelay`] is the production client for the
//! relay service's wire contract:
//!
//! - requested headers are packed onto the *target* URL as repeated
//!   `headers[]=name|value` query parameters, with the session cookie
//!   appended last;
//! - the packed target is then percent-encoded into
//!   `{base}/proxy?url=<target>`;
//! - POST bodies are forwarded byte for byte and echoed back the same way.
//!
//! Outbound hosts are gated against an allow-list before any request is
//! built: exact hostnames plus a CDN-subdomain rule (`cdn-img.<host>` is
//! allowed whenever `<host>` is). All of this is explicit per-instance
//! configuration; nothing is process-global.

use std::future::Future;

use serde::de::DeserializeOwned;
use url::Url;

use super::error::{ChapterError, Result};

/// Header list attached to a relayed request.
pub type Headers = [(String, String)];

/// A relayed response: upstream status, content type and body bytes.
#[derive(Clone, Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RelayResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, content_type: None, body }
    }

    /// Body as UTF-8 text.
    ///
    /// # Errors
    /// [`ChapterError::SchemaValidation`] if the body is not valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|_| ChapterError::SchemaValidation("response body is not UTF-8".into()))
    }

    /// Body decoded as typed JSON.
    ///
    /// # Errors
    /// [`ChapterError::SchemaValidation`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ChapterError::schema)
    }
}

/// The outbound-fetch collaborator borrowed by every handler.
pub trait Relay: Send + Sync {
    /// Relay a GET of `url` with the given request headers.
    fn get(
        &self,
        url: &str,
        headers: &Headers,
    ) -> impl Future<Output = Result<RelayResponse>> + Send;

    /// Relay a POST of `body` (forwarded byte for byte) to `url`.
    fn post(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<RelayResponse>> + Send;
}

/// Construction-time relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    base_url: String,
    cookie: String,
    allowed_hosts: Vec<String>,
    cdn_prefix: String,
}

impl RelayConfig {
    /// Config pointing at a relay service, with an empty allow-list.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            cookie: String::new(),
            allowed_hosts: Vec::new(),
            cdn_prefix: "cdn-img.".into(),
        }
    }

    /// Shared session cookie attached to every relayed request.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    /// Permit outbound requests to an exact hostname (and its
    /// CDN subdomain).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    /// True when `host` is allow-listed, directly or through the CDN rule.
    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.iter().any(|allowed| {
            host == allowed.as_str()
                || (host.starts_with(&self.cdn_prefix)
                    && &host[self.cdn_prefix.len()..] == allowed.as_str())
        })
    }

    /// Build the relay-service URL for a target URL plus request headers.
    ///
    /// # Errors
    /// [`ChapterError::MalformedUrl`] if `target` does not parse;
    /// [`ChapterError::UnsupportedHost`] if its host is not allow-listed.
    pub fn proxied_url(&self, target: &str, headers: &Headers) -> Result<String> {
        let mut url = Url::parse(target).map_err(|e| ChapterError::MalformedUrl(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ChapterError::MalformedUrl(format!("no host in {target}")))?
            .to_string();
        if !self.is_allowed(&host) {
            return Err(ChapterError::UnsupportedHost(host));
        }

        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in headers {
                pairs.append_pair("headers[]", &format!("{name}|{value}"));
            }
            pairs.append_pair("headers[]", &format!("cookie|{}", self.cookie));
        }

        let packed: String = url::form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();
        Ok(format!("{}/proxy?url={}", self.base_url, packed))
    }
}

/// Production relay client over HTTP.
pub struct HttpRelay {
    client: reqwest::Client,
    config: RelayConfig,
}

impl HttpRelay {
    /// # Errors
    /// [`ChapterError::Network`] if the HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| ChapterError::Network {
            url: config.base_url.clone(),
            status: None,
            detail: e.to_string(),
        })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    async fn finish(url: &str, resp: reqwest::Response) -> Result<RelayResponse> {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| ChapterError::Network {
                url: url.to_string(),
                status: Some(status),
                detail: e.to_string(),
            })?
            .to_vec();

        if !(200..300).contains(&status) {
            return Err(ChapterError::Network {
                url: url.to_string(),
                status: Some(status),
                detail: "non-success status from relay".into(),
            });
        }
        Ok(RelayResponse { status, content_type, body })
    }
}

impl Relay for HttpRelay {
    async fn get(&self, url: &str, headers: &Headers) -> Result<RelayResponse> {
        let proxied = self.config.proxied_url(url, headers)?;
        log::debug!("relay get {url}");
        let resp = self.client.get(&proxied).send().await.map_err(|e| ChapterError::Network {
            url: url.to_string(),
            status: None,
            detail: e.to_string(),
        })?;
        Self::finish(url, resp).await
    }

    async fn post(&self, url: &str, headers: &Headers, body: Vec<u8>) -> Result<RelayResponse> {
        let proxied = self.config.proxied_url(url, headers)?;
        log::debug!("relay post {url} ({} bytes)", body.len());
        let resp = self
            .client
            .post(&proxied)
            .body(body)
            .send()
            .await
            .map_err(|e| ChapterError::Network {
                url: url.to_string(),
                status: None,
                detail: e.to_string(),
            })?;
        Self::finish(url, resp).await
    }
}
