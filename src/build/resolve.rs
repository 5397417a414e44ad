// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Digest resolution for external references
//!
//! Order of preference: a valid `integrity` attribute on the tag, the
//! per-resource cache, then fetching and hashing the resource.

use std::collections::HashMap;

use futures::future::join_all;

use super::fetcher::ResourceFetcher;
use crate::error::{Error, Result};
use crate::html::{ExtractedResources, ResourceRef};
use crate::sri::{digest, is_valid_integrity, ExternalDigest, PageDiscoveries, ResourceKind, SharedHashes};

/// Outcome for one external tag
#[derive(Debug)]
pub struct ResolvedExternal {
    pub kind: ResourceKind,
    pub resource: ResourceRef,
    /// Tag position, for rewriting
    pub ordinal: usize,
    /// The tag already carries an `integrity` attribute
    pub declared: bool,
    /// `Ok(None)` when fetching the resource was not permitted
    pub digest: Result<Option<String>>,
}

/// Resolve digests for every external reference of a page.
///
/// `may_fetch` decides whether an uncached resource may be loaded. Each
/// distinct resource is fetched at most once, all fetches run concurrently.
pub async fn resolve_externals<P>(
    resources: &ExtractedResources,
    store: &SharedHashes,
    fetcher: &dyn ResourceFetcher,
    may_fetch: P,
) -> Vec<ResolvedExternal>
where
    P: Fn(ResourceKind, &ResourceRef) -> bool,
{
    let mut to_fetch: Vec<(ResourceKind, ResourceRef)> = Vec::new();
    for (kind, ext) in resources.externals() {
        let usable_attr = ext.integrity.as_deref().map(is_valid_integrity).unwrap_or(false);
        if let Some(ref declared) = ext.integrity {
            if !usable_attr {
                tracing::warn!(resource = %ext.resource, integrity = %declared, "Ignoring unusable integrity attribute");
            }
        }
        let cached = store.resource_digest(kind, &ext.resource.id()).is_some();
        let key = (kind, ext.resource.clone());
        if !usable_attr && !cached && may_fetch(kind, &ext.resource) && !to_fetch.contains(&key) {
            to_fetch.push(key);
        }
    }

    let fetched = join_all(to_fetch.iter().map(|(_, resource)| fetcher.fetch(resource))).await;
    let fetched: HashMap<(ResourceKind, ResourceRef), Result<String>> = to_fetch
        .into_iter()
        .zip(fetched)
        .map(|(key, result)| (key, result.map(|bytes| digest(&bytes))))
        .collect();

    resources
        .externals()
        .map(|(kind, ext)| {
            let id = ext.resource.id();
            let from_attr = ext
                .integrity
                .as_deref()
                .filter(|i| is_valid_integrity(i))
                .map(str::to_string);

            let digest = if let Some(d) = from_attr {
                Ok(Some(d))
            } else if let Some(d) = store.resource_digest(kind, &id) {
                Ok(Some(d))
            } else {
                match fetched.get(&(kind, ext.resource.clone())) {
                    Some(Ok(d)) => Ok(Some(d.clone())),
                    Some(Err(error)) => Err(fetch_failure(&id, error)),
                    None => Ok(None),
                }
            };

            ResolvedExternal {
                kind,
                resource: ext.resource.clone(),
                ordinal: ext.ordinal,
                declared: ext.integrity.is_some(),
                digest,
            }
        })
        .collect()
}

/// Per-tag copy of a shared fetch error; configuration errors keep their kind
fn fetch_failure(resource_id: &str, error: &Error) -> Error {
    match error {
        Error::Config(msg) => Error::config(msg.clone()),
        other => Error::fetch(resource_id, other.to_string()),
    }
}

/// Digests of a page's inline blocks
pub fn inline_discoveries(resources: &ExtractedResources) -> PageDiscoveries {
    PageDiscoveries {
        inline_scripts: resources
            .inline_scripts
            .iter()
            .map(|s| digest(s.as_bytes()))
            .collect(),
        inline_styles: resources
            .inline_styles
            .iter()
            .map(|s| digest(s.as_bytes()))
            .collect(),
        external: Vec::new(),
    }
}

impl ResolvedExternal {
    /// Discovery entry for a resolved digest
    pub fn to_discovery(&self) -> Option<ExternalDigest> {
        match self.digest {
            Ok(Some(ref digest)) => Some(ExternalDigest {
                kind: self.kind,
                resource_id: self.resource.id(),
                digest: digest.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{extract, page_url, DEFAULT_SITE};
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use url::Url;

    #[derive(Default)]
    struct CountingFetcher {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResourceFetcher for CountingFetcher {
        async fn fetch(&self, resource: &ResourceRef) -> Result<Bytes> {
            self.calls.lock().push(resource.id());
            if resource.id().contains("broken") {
                return Err(Error::fetch(resource.id(), "boom"));
            }
            if resource.id().contains("misconfigured") {
                return Err(Error::config("no output directory"));
            }
            Ok(Bytes::from(format!("content of {}", resource.id())))
        }
    }

    fn page() -> Url {
        page_url(&Url::parse(DEFAULT_SITE).unwrap(), "index.html")
    }

    #[tokio::test]
    async fn test_fetches_each_resource_once() {
        let html = r#"<script src="/a.js"></script><script src="/a.js"></script><link rel="stylesheet" href="/a.css">"#;
        let resources = extract(html, &page()).unwrap();
        let fetcher = CountingFetcher::default();
        let store = SharedHashes::new();

        let resolved = resolve_externals(&resources, &store, &fetcher, |_, _| true).await;

        assert_eq!(resolved.len(), 3);
        assert_eq!(fetcher.calls.lock().len(), 2);
        assert_eq!(
            resolved[0].digest.as_ref().unwrap().as_deref(),
            Some(digest(b"content of /a.js").as_str())
        );
    }

    #[tokio::test]
    async fn test_cache_and_attribute_skip_fetch() {
        let declared = digest(b"declared");
        let html = format!(
            r#"<script src="/cached.js"></script><script src="https://cdn.example.com/x.js" integrity="{}"></script>"#,
            declared
        );
        let resources = extract(&html, &page()).unwrap();
        let fetcher = CountingFetcher::default();
        let store = SharedHashes::new();
        store.record_external(ResourceKind::Script, "/cached.js", "sha256-cached=", None);

        let resolved = resolve_externals(&resources, &store, &fetcher, |_, _| true).await;

        assert!(fetcher.calls.lock().is_empty());
        assert_eq!(resolved[0].digest.as_ref().unwrap().as_deref(), Some("sha256-cached="));
        assert_eq!(resolved[1].digest.as_ref().unwrap().as_deref(), Some(declared.as_str()));
        assert!(resolved[1].declared);
    }

    #[tokio::test]
    async fn test_fetch_not_permitted_and_failures() {
        let html = r#"<script src="https://other.example.com/x.js"></script><script src="/broken.js"></script>"#;
        let resources = extract(html, &page()).unwrap();
        let fetcher = CountingFetcher::default();
        let store = SharedHashes::new();

        let resolved =
            resolve_externals(&resources, &store, &fetcher, |_, r| !r.is_remote()).await;

        assert!(matches!(resolved[0].digest, Ok(None)));
        assert!(resolved[1].digest.is_err());
        assert!(resolved[1].to_discovery().is_none());
    }

    #[tokio::test]
    async fn test_config_failure_keeps_its_kind() {
        let html = r#"<script src="/misconfigured.js"></script><script src="/misconfigured.js"></script>"#;
        let resources = extract(html, &page()).unwrap();
        let fetcher = CountingFetcher::default();
        let store = SharedHashes::new();

        let resolved = resolve_externals(&resources, &store, &fetcher, |_, _| true).await;

        for ext in &resolved {
            assert!(ext.digest.as_ref().unwrap_err().is_config());
        }
    }
}
