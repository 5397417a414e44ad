// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Process-wide integration state
//!
//! Created once per build or server run. Owns the shared hash store that
//! the static builder and the middleware both write to.

use std::path::{Path, PathBuf};

use url::Url;

use crate::config::ShieldOptions;
use crate::error::{Error, Result};
use crate::html::DEFAULT_SITE;
use crate::sri::{HashesCollection, SharedHashes};

/// The parts of the host build configuration Shield needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Project root
    pub root: PathBuf,
    /// Output directory of the static build
    pub dist_dir: PathBuf,
    /// Public site URL
    pub site: Option<Url>,
}

impl HostConfig {
    /// Create a host config
    pub fn new(root: impl Into<PathBuf>, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dist_dir: dist_dir.into(),
            site: None,
        }
    }

    /// Set the public site URL
    pub fn site(mut self, site: Url) -> Self {
        self.site = Some(site);
        self
    }
}

/// State shared by the builder and the middleware for one run
#[derive(Debug, Clone)]
pub struct IntegrationState {
    options: ShieldOptions,
    host: HostConfig,
    hashes: SharedHashes,
}

impl IntegrationState {
    /// Validate options and create the state with an empty hash store
    pub fn new(options: ShieldOptions, host: HostConfig) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            host,
            hashes: SharedHashes::new(),
        })
    }

    /// Whether static hashing waits for all other page transformations
    pub fn delay_transform(&self) -> bool {
        self.options.delay_transform
    }

    /// Validated options
    pub fn options(&self) -> &ShieldOptions {
        &self.options
    }

    /// Host build configuration
    pub fn host(&self) -> &HostConfig {
        &self.host
    }

    /// Shared hash store handle
    pub fn hashes(&self) -> &SharedHashes {
        &self.hashes
    }

    /// URL pages are served under
    pub fn site_url(&self) -> Url {
        match &self.host.site {
            Some(site) => site.clone(),
            None => Url::parse(DEFAULT_SITE).expect("default site URL is valid"),
        }
    }

    /// Resolved path of the hashes artifact, if configured
    pub fn hashes_module_path(&self) -> Option<PathBuf> {
        self.options
            .sri
            .hashes_module
            .as_ref()
            .map(|p| resolve_path(&self.host.root, p))
    }

    /// Merge a previously written hashes artifact into the store.
    ///
    /// Returns `false` when no artifact is configured or present.
    pub async fn load_hashes_module(&self) -> Result<bool> {
        let Some(path) = self.hashes_module_path() else {
            return Ok(false);
        };
        if !tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }
        let collection = HashesCollection::load_json(&path).await?;
        self.hashes.merge(&collection);
        tracing::info!(path = %path.display(), "Loaded hashes artifact");
        Ok(true)
    }

    /// Write the store to the configured hashes artifact
    pub async fn persist_hashes(&self) -> Result<PathBuf> {
        let path = self
            .hashes_module_path()
            .ok_or_else(|| Error::config("sri.hashesModule is not set"))?;
        self.hashes.to_collection().save_json(&path).await?;
        tracing::info!(path = %path.display(), "Persisted hashes artifact");
        Ok(path)
    }
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SriOptions;
    use crate::sri::ResourceKind;

    #[test]
    fn test_invalid_options_rejected() {
        let options = ShieldOptions::new().sri(SriOptions::new().allow_script_url("::"));
        assert!(IntegrationState::new(options, HostConfig::new("/p", "/p/dist")).is_err());
    }

    #[test]
    fn test_site_url_default() {
        let state = IntegrationState::new(ShieldOptions::default(), HostConfig::new("/p", "/p/dist")).unwrap();
        assert_eq!(state.site_url().as_str(), DEFAULT_SITE);

        let site = Url::parse("https://example.com/docs/").unwrap();
        let state = IntegrationState::new(
            ShieldOptions::default(),
            HostConfig::new("/p", "/p/dist").site(site.clone()),
        )
        .unwrap();
        assert_eq!(state.site_url(), site);
    }

    #[test]
    fn test_clones_share_store() {
        let state = IntegrationState::new(ShieldOptions::default(), HostConfig::new("/p", "/p/dist")).unwrap();
        let other = state.clone();
        state
            .hashes()
            .record_inline(ResourceKind::Style, "sha256-a=", Some("x"));
        assert!(!other.hashes().snapshot_global().styles.is_empty());
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let root = tempfile::tempdir().unwrap();
        let options = ShieldOptions::new().sri(SriOptions::new().hashes_module("src/generated/sri.json"));
        let host = HostConfig::new(root.path(), root.path().join("dist"));

        let state = IntegrationState::new(options.clone(), host.clone()).unwrap();
        state
            .hashes()
            .record_external(ResourceKind::Script, "/a.js", "sha256-a=", Some("index.html"));
        let path = state.persist_hashes().await.unwrap();
        assert!(path.starts_with(root.path()));

        let fresh = IntegrationState::new(options, host).unwrap();
        assert!(fresh.load_hashes_module().await.unwrap());
        assert_eq!(fresh.hashes().to_collection(), state.hashes().to_collection());
    }

    #[tokio::test]
    async fn test_persist_without_path() {
        let state = IntegrationState::new(ShieldOptions::default(), HostConfig::new("/p", "/p/dist")).unwrap();
        assert!(state.persist_hashes().await.unwrap_err().is_config());
        assert!(!state.load_hashes_module().await.unwrap());
    }
}
