// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-memory hash collection
//!
//! Holds every digest discovered during a build or a server run:
//! global inline/external sets, per-page sets and a per-resource cache.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of hashed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Style,
}

impl ResourceKind {
    /// Name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Script => "script",
            ResourceKind::Style => "style",
        }
    }
}

/// Digests referenced by a single page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHashes {
    pub scripts: BTreeSet<String>,
    pub styles: BTreeSet<String>,
}

impl PageHashes {
    fn set_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::Script => &mut self.scripts,
            ResourceKind::Style => &mut self.styles,
        }
    }

    /// Check if the page has no digests at all
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty()
    }
}

/// Origin of a page's digests and how the page was rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSources {
    /// Digests of the page's inline blocks
    pub inline: PageHashes,
    /// Digests of the page's external resources
    pub external: PageHashes,
    /// Rendered per request rather than at build time
    pub dynamic: bool,
}

impl PageSources {
    fn merge(&mut self, other: &PageSources) {
        self.inline.scripts.extend(other.inline.scripts.iter().cloned());
        self.inline.styles.extend(other.inline.styles.iter().cloned());
        self.external.scripts.extend(other.external.scripts.iter().cloned());
        self.external.styles.extend(other.external.styles.iter().cloned());
        self.dynamic |= other.dynamic;
    }
}

/// Resource id -> digest cache, one map per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerResourceHashes {
    pub scripts: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
}

impl PerResourceHashes {
    fn map(&self, kind: ResourceKind) -> &BTreeMap<String, String> {
        match kind {
            ResourceKind::Script => &self.scripts,
            ResourceKind::Style => &self.styles,
        }
    }

    fn map_mut(&mut self, kind: ResourceKind) -> &mut BTreeMap<String, String> {
        match kind {
            ResourceKind::Script => &mut self.scripts,
            ResourceKind::Style => &mut self.styles,
        }
    }
}

/// A digest set split by origin (inline vs external), per kind.
///
/// This is what the CSP synthesizer consumes: inline gating needs to know
/// which digests came from inline blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashSlice {
    pub inline_scripts: BTreeSet<String>,
    pub ext_scripts: BTreeSet<String>,
    pub inline_styles: BTreeSet<String>,
    pub ext_styles: BTreeSet<String>,
}

impl HashSlice {
    /// Inline digests of a kind
    pub fn inline(&self, kind: ResourceKind) -> &BTreeSet<String> {
        match kind {
            ResourceKind::Script => &self.inline_scripts,
            ResourceKind::Style => &self.inline_styles,
        }
    }

    /// External digests of a kind
    pub fn external(&self, kind: ResourceKind) -> &BTreeSet<String> {
        match kind {
            ResourceKind::Script => &self.ext_scripts,
            ResourceKind::Style => &self.ext_styles,
        }
    }
}

/// An external resource digest found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDigest {
    pub kind: ResourceKind,
    /// Canonical resource id (absolute path or URL)
    pub resource_id: String,
    pub digest: String,
}

/// Everything hashed for one page, ready to be merged in one step
#[derive(Debug, Clone, Default)]
pub struct PageDiscoveries {
    pub inline_scripts: Vec<String>,
    pub inline_styles: Vec<String>,
    pub external: Vec<ExternalDigest>,
}

impl PageDiscoveries {
    /// Check if nothing was discovered
    pub fn is_empty(&self) -> bool {
        self.inline_scripts.is_empty() && self.inline_styles.is_empty() && self.external.is_empty()
    }
}

/// Aggregate of all digests known to the process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashesCollection {
    pub inline_script_hashes: BTreeSet<String>,
    pub inline_style_hashes: BTreeSet<String>,
    pub ext_script_hashes: BTreeSet<String>,
    pub ext_style_hashes: BTreeSet<String>,
    pub per_page_sri_hashes: BTreeMap<String, PageHashes>,
    pub per_resource_sri_hashes: PerResourceHashes,
    #[serde(default)]
    pub per_page_sources: BTreeMap<String, PageSources>,
}

impl HashesCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    fn inline_set_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::Script => &mut self.inline_script_hashes,
            ResourceKind::Style => &mut self.inline_style_hashes,
        }
    }

    fn ext_set_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::Script => &mut self.ext_script_hashes,
            ResourceKind::Style => &mut self.ext_style_hashes,
        }
    }

    fn add_to_page(&mut self, page: Option<&str>, kind: ResourceKind, digest: &str, inline: bool) {
        let Some(page) = page else {
            return;
        };
        self.per_page_sri_hashes
            .entry(page.to_string())
            .or_default()
            .set_mut(kind)
            .insert(digest.to_string());

        let sources = self.per_page_sources.entry(page.to_string()).or_default();
        let origin = if inline {
            &mut sources.inline
        } else {
            &mut sources.external
        };
        origin.set_mut(kind).insert(digest.to_string());
    }

    /// Mark a page as rendered per request
    pub fn mark_dynamic(&mut self, page: &str) {
        self.per_page_sources.entry(page.to_string()).or_default().dynamic = true;
    }

    /// Check if a page was rendered per request
    pub fn is_dynamic(&self, page: &str) -> bool {
        self.per_page_sources
            .get(page)
            .map(|s| s.dynamic)
            .unwrap_or(false)
    }

    /// Record the digest of an inline block
    pub fn record_inline(&mut self, kind: ResourceKind, digest: &str, page: Option<&str>) {
        self.inline_set_mut(kind).insert(digest.to_string());
        self.add_to_page(page, kind, digest, true);
    }

    /// Cached digest of an external resource, if it was already hashed
    pub fn resource_digest(&self, kind: ResourceKind, resource_id: &str) -> Option<&str> {
        self.per_resource_sri_hashes
            .map(kind)
            .get(resource_id)
            .map(String::as_str)
    }

    /// Record the digest of an external resource.
    ///
    /// The first digest stored for a resource id wins; the returned value is
    /// the digest actually in effect.
    pub fn record_external(
        &mut self,
        kind: ResourceKind,
        resource_id: &str,
        digest: &str,
        page: Option<&str>,
    ) -> String {
        let cache = self.per_resource_sri_hashes.map_mut(kind);
        let effective = match cache.get(resource_id) {
            Some(existing) => {
                if existing != digest {
                    tracing::warn!(
                        kind = kind.as_str(),
                        resource = %resource_id,
                        kept = %existing,
                        discarded = %digest,
                        "Resource content changed during the run, keeping first digest"
                    );
                }
                existing.clone()
            }
            None => {
                cache.insert(resource_id.to_string(), digest.to_string());
                digest.to_string()
            }
        };

        self.ext_set_mut(kind).insert(effective.clone());
        self.add_to_page(page, kind, &effective, false);
        effective
    }

    /// Merge the discoveries of one page
    pub fn apply(&mut self, page: Option<&str>, discoveries: &PageDiscoveries) {
        for digest in &discoveries.inline_scripts {
            self.record_inline(ResourceKind::Script, digest, page);
        }
        for digest in &discoveries.inline_styles {
            self.record_inline(ResourceKind::Style, digest, page);
        }
        for ext in &discoveries.external {
            self.record_external(ext.kind, &ext.resource_id, &ext.digest, page);
        }
    }

    /// Digests referenced by one page (empty for unknown pages)
    pub fn snapshot_for_page(&self, page: &str) -> PageHashes {
        self.per_page_sri_hashes
            .get(page)
            .cloned()
            .unwrap_or_default()
    }

    /// Union of all inline and external digests
    pub fn snapshot_global(&self) -> PageHashes {
        PageHashes {
            scripts: self
                .inline_script_hashes
                .union(&self.ext_script_hashes)
                .cloned()
                .collect(),
            styles: self
                .inline_style_hashes
                .union(&self.ext_style_hashes)
                .cloned()
                .collect(),
        }
    }

    /// Per-page digests split by where the page got them.
    ///
    /// A digest lands in the inline half only if this page has an inline
    /// block with that content, whatever other pages reference.
    pub fn slice_for_page(&self, page: &str) -> HashSlice {
        let sources = self.per_page_sources.get(page).cloned().unwrap_or_default();
        HashSlice {
            inline_scripts: sources.inline.scripts,
            ext_scripts: sources.external.scripts,
            inline_styles: sources.inline.styles,
            ext_styles: sources.external.styles,
        }
    }

    /// All known digests split into inline and external
    pub fn slice_global(&self) -> HashSlice {
        HashSlice {
            inline_scripts: self.inline_script_hashes.clone(),
            ext_scripts: self.ext_script_hashes.clone(),
            inline_styles: self.inline_style_hashes.clone(),
            ext_styles: self.ext_style_hashes.clone(),
        }
    }

    /// Global slice as seen by prerendered pages.
    ///
    /// Inline digests only count when a static page has them; external
    /// digests are shared by every page.
    pub fn slice_static_global(&self) -> HashSlice {
        let mut slice = HashSlice {
            ext_scripts: self.ext_script_hashes.clone(),
            ext_styles: self.ext_style_hashes.clone(),
            ..Default::default()
        };
        for sources in self.per_page_sources.values().filter(|s| !s.dynamic) {
            slice
                .inline_scripts
                .extend(sources.inline.scripts.iter().cloned());
            slice
                .inline_styles
                .extend(sources.inline.styles.iter().cloned());
        }
        slice
    }

    /// Merge another collection into this one (e.g. build hashes at startup)
    pub fn merge(&mut self, other: &HashesCollection) {
        self.inline_script_hashes
            .extend(other.inline_script_hashes.iter().cloned());
        self.inline_style_hashes
            .extend(other.inline_style_hashes.iter().cloned());
        for (kind, map) in [
            (ResourceKind::Script, &other.per_resource_sri_hashes.scripts),
            (ResourceKind::Style, &other.per_resource_sri_hashes.styles),
        ] {
            for (resource_id, digest) in map {
                self.record_external(kind, resource_id, digest, None);
            }
        }
        self.ext_script_hashes
            .extend(other.ext_script_hashes.iter().cloned());
        self.ext_style_hashes
            .extend(other.ext_style_hashes.iter().cloned());
        for (page, hashes) in &other.per_page_sri_hashes {
            let entry = self.per_page_sri_hashes.entry(page.clone()).or_default();
            entry.scripts.extend(hashes.scripts.iter().cloned());
            entry.styles.extend(hashes.styles.iter().cloned());
        }
        for (page, sources) in &other.per_page_sources {
            self.per_page_sources
                .entry(page.clone())
                .or_default()
                .merge(sources);
        }
    }

    /// Known page ids
    pub fn pages(&self) -> impl Iterator<Item = &str> {
        self.per_page_sri_hashes.keys().map(String::as_str)
    }

    /// Page ids rendered at build time
    pub fn static_pages(&self) -> impl Iterator<Item = &str> {
        self.pages().filter(|page| !self.is_dynamic(page))
    }

    /// Check if no digest was recorded
    pub fn is_empty(&self) -> bool {
        self.inline_script_hashes.is_empty()
            && self.inline_style_hashes.is_empty()
            && self.ext_script_hashes.is_empty()
            && self.ext_style_hashes.is_empty()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the hashes artifact
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, self.to_json()?).await?;
        tracing::debug!(path = %path.display(), "Wrote hashes artifact");
        Ok(())
    }

    /// Read a hashes artifact
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sri::digest;

    #[test]
    fn test_record_inline_tracks_page() {
        let mut hashes = HashesCollection::new();
        let d = digest(b"console.log(1)");
        hashes.record_inline(ResourceKind::Script, &d, Some("index.html"));

        assert!(hashes.inline_script_hashes.contains(&d));
        assert!(hashes.snapshot_for_page("index.html").scripts.contains(&d));
        assert!(hashes.snapshot_for_page("other.html").is_empty());
    }

    #[test]
    fn test_record_external_idempotent() {
        let mut hashes = HashesCollection::new();
        let d = digest(b"body{}");

        let first = hashes.record_external(ResourceKind::Style, "/main.css", &d, Some("a.html"));
        let second = hashes.record_external(ResourceKind::Style, "/main.css", &d, Some("a.html"));

        assert_eq!(first, second);
        assert_eq!(hashes.per_resource_sri_hashes.styles.len(), 1);
        assert_eq!(hashes.ext_style_hashes.len(), 1);
        assert_eq!(hashes.snapshot_for_page("a.html").styles.len(), 1);
    }

    #[test]
    fn test_record_external_keeps_first_digest() {
        let mut hashes = HashesCollection::new();
        let first = digest(b"v1");
        let second = digest(b"v2");

        hashes.record_external(ResourceKind::Script, "/app.js", &first, Some("a.html"));
        let effective =
            hashes.record_external(ResourceKind::Script, "/app.js", &second, Some("b.html"));

        assert_eq!(effective, first);
        assert_eq!(hashes.resource_digest(ResourceKind::Script, "/app.js"), Some(first.as_str()));
        assert!(!hashes.ext_script_hashes.contains(&second));
        assert!(hashes.snapshot_for_page("b.html").scripts.contains(&first));
    }

    #[test]
    fn test_page_digests_are_global() {
        let mut hashes = HashesCollection::new();
        let discoveries = PageDiscoveries {
            inline_scripts: vec![digest(b"a")],
            inline_styles: vec![digest(b"b")],
            external: vec![ExternalDigest {
                kind: ResourceKind::Script,
                resource_id: "https://cdn.example.com/x.js".to_string(),
                digest: digest(b"c"),
            }],
        };
        hashes.apply(Some("p.html"), &discoveries);

        let global = hashes.snapshot_global();
        let page = hashes.snapshot_for_page("p.html");
        assert!(page.scripts.is_subset(&global.scripts));
        assert!(page.styles.is_subset(&global.styles));
    }

    #[test]
    fn test_slice_for_page_splits_inline_and_external() {
        let mut hashes = HashesCollection::new();
        hashes.record_inline(ResourceKind::Script, "sha256-inline=", Some("p.html"));
        hashes.record_external(ResourceKind::Script, "/a.js", "sha256-ext=", Some("p.html"));
        hashes.record_inline(ResourceKind::Script, "sha256-other=", Some("q.html"));

        let slice = hashes.slice_for_page("p.html");
        assert_eq!(slice.inline_scripts.len(), 1);
        assert!(slice.inline_scripts.contains("sha256-inline="));
        assert!(slice.ext_scripts.contains("sha256-ext="));
        assert!(!slice.inline_scripts.contains("sha256-other="));
    }

    #[test]
    fn test_inline_digest_stays_inline_when_another_page_loads_same_content() {
        let mut hashes = HashesCollection::new();
        let d = digest(b"foo()");
        hashes.record_inline(ResourceKind::Script, &d, Some("a.html"));
        hashes.record_external(ResourceKind::Script, "/foo.js", &d, Some("b.html"));

        let a = hashes.slice_for_page("a.html");
        assert!(a.inline_scripts.contains(&d));
        assert!(a.ext_scripts.is_empty());

        let b = hashes.slice_for_page("b.html");
        assert!(b.inline_scripts.is_empty());
        assert!(b.ext_scripts.contains(&d));
    }

    #[test]
    fn test_dynamic_pages_excluded_from_static_pages() {
        let mut hashes = HashesCollection::new();
        hashes.record_inline(ResourceKind::Script, "sha256-s=", Some("index.html"));
        hashes.record_inline(ResourceKind::Script, "sha256-d=", Some("/dash"));
        hashes.mark_dynamic("/dash");

        assert!(hashes.is_dynamic("/dash"));
        assert!(!hashes.is_dynamic("index.html"));
        assert_eq!(hashes.static_pages().collect::<Vec<_>>(), vec!["index.html"]);
        assert_eq!(hashes.pages().count(), 2);

        let slice = hashes.slice_static_global();
        assert!(slice.inline_scripts.contains("sha256-s="));
        assert!(!slice.inline_scripts.contains("sha256-d="));
    }

    #[test]
    fn test_merge_collections() {
        let mut build = HashesCollection::new();
        build.record_inline(ResourceKind::Style, "sha256-s=", Some("a.html"));
        build.record_external(ResourceKind::Script, "/x.js", "sha256-x=", Some("a.html"));
        build.record_inline(ResourceKind::Script, "sha256-d=", Some("/dash"));
        build.mark_dynamic("/dash");

        let mut runtime = HashesCollection::new();
        runtime.merge(&build);

        assert_eq!(runtime, build);
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let mut hashes = HashesCollection::new();
        hashes.record_inline(ResourceKind::Script, "sha256-a=", Some("index.html"));
        let json = hashes.to_json().unwrap();

        assert!(json.contains("inlineScriptHashes"));
        assert!(json.contains("perPageSriHashes"));
        assert!(json.contains("perResourceSriHashes"));
        assert_eq!(HashesCollection::from_json(&json).unwrap(), hashes);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated/sriHashes.json");

        let mut hashes = HashesCollection::new();
        hashes.record_external(ResourceKind::Style, "/s.css", "sha256-s=", Some("a.html"));
        hashes.save_json(&path).await.unwrap();

        let loaded = HashesCollection::load_json(&path).await.unwrap();
        assert_eq!(loaded, hashes);
    }
}
