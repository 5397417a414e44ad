// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Loading external scripts/styles for hashing

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::error::{Error, Result};
use crate::html::ResourceRef;

/// Default user agent for remote resource fetches
pub const DEFAULT_USER_AGENT: &str = concat!("shield/", env!("CARGO_PKG_VERSION"));

/// Source of resource bytes
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Load the exact bytes a browser would receive for the resource
    async fn fetch(&self, resource: &ResourceRef) -> Result<Bytes>;
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User agent string
    pub user_agent: String,
    /// Timeout per remote request
    pub timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Directory local (same-origin) resources are read from
    pub dist_dir: Option<PathBuf>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            dist_dir: None,
        }
    }
}

impl FetcherConfig {
    /// Create a new fetcher config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory local resources are read from
    pub fn dist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = Some(dir.into());
        self
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reads local resources from the output directory and remote ones over HTTP
#[derive(Clone)]
pub struct DistFetcher {
    client: Client,
    config: FetcherConfig,
}

impl DistFetcher {
    /// Create a fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(config: FetcherConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("accept", HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(Policy::limited(config.max_redirects))
            .default_headers(default_headers)
            .build()?;

        Ok(Self { client, config })
    }

    async fn fetch_local(&self, path: &str) -> Result<Bytes> {
        let dist_dir = self
            .config
            .dist_dir
            .as_ref()
            .ok_or_else(|| Error::config("no output directory configured for local resources"))?;
        let file = local_file(dist_dir, path)?;
        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| Error::fetch(path, format!("{}: {}", file.display(), e)))?;
        Ok(Bytes::from(bytes))
    }

    async fn fetch_remote(&self, url: &url::Url) -> Result<Bytes> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url.as_str(), format!("HTTP {}", status.as_u16())));
        }
        Ok(response.bytes().await?)
    }
}

/// File under `dist_dir` for a percent-encoded URL path.
///
/// Segments are decoded before they are joined; `..` is rejected.
fn local_file(dist_dir: &Path, path: &str) -> Result<PathBuf> {
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|e| Error::fetch(path, format!("invalid path encoding: {}", e)))?;

    let mut file = dist_dir.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(Error::fetch(path, "path escapes the output directory")),
            s if s.contains('\\') => {
                return Err(Error::fetch(path, "backslash in path segment"));
            }
            s => file.push(s),
        }
    }
    Ok(file)
}

#[async_trait]
impl ResourceFetcher for DistFetcher {
    async fn fetch(&self, resource: &ResourceRef) -> Result<Bytes> {
        tracing::debug!(resource = %resource, "Fetching resource for hashing");
        match resource {
            ResourceRef::Local(path) => self.fetch_local(path).await,
            ResourceRef::Remote(url) => self.fetch_remote(url).await,
        }
    }
}
