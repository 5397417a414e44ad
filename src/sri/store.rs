// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Shared hash store handle
//!
//! The build driver and the request middleware hold clones of the same
//! handle. Every access happens inside a synchronous closure: a
//! `parking_lot` guard is `!Send`, so a merge can never straddle an
//! `.await` in a spawned task.

use std::sync::Arc;

use parking_lot::RwLock;

use super::collection::{HashSlice, HashesCollection, PageDiscoveries, PageHashes, ResourceKind};

/// Cloneable handle to the process-wide hash collection
#[derive(Debug, Clone, Default)]
pub struct SharedHashes {
    inner: Arc<RwLock<HashesCollection>>,
}

impl SharedHashes {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing collection (e.g. loaded from the build artifact)
    pub fn from_collection(collection: HashesCollection) -> Self {
        Self {
            inner: Arc::new(RwLock::new(collection)),
        }
    }

    /// Cached digest of a resource
    pub fn resource_digest(&self, kind: ResourceKind, resource_id: &str) -> Option<String> {
        self.inner
            .read()
            .resource_digest(kind, resource_id)
            .map(str::to_string)
    }

    /// Record an inline digest
    pub fn record_inline(&self, kind: ResourceKind, digest: &str, page: Option<&str>) {
        self.inner.write().record_inline(kind, digest, page);
    }

    /// Record an external digest, returning the digest in effect
    pub fn record_external(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        digest: &str,
        page: Option<&str>,
    ) -> String {
        self.inner
            .write()
            .record_external(kind, resource_id, digest, page)
    }

    /// Merge a page's discoveries
    pub fn apply(&self, page: &str, discoveries: &PageDiscoveries) {
        self.inner.write().apply(Some(page), discoveries);
    }

    /// Merge a dynamic page's discoveries and return its slice in one critical section.
    ///
    /// The returned slice always contains everything this call merged. The
    /// page is recorded as rendered per request.
    pub fn merge_page(&self, page: &str, discoveries: &PageDiscoveries) -> HashSlice {
        let mut hashes = self.inner.write();
        hashes.apply(Some(page), discoveries);
        hashes.mark_dynamic(page);
        hashes.slice_for_page(page)
    }

    /// Merge a dynamic page's discoveries and return the global slice in one critical section
    pub fn merge_global(&self, page: &str, discoveries: &PageDiscoveries) -> HashSlice {
        let mut hashes = self.inner.write();
        hashes.apply(Some(page), discoveries);
        hashes.mark_dynamic(page);
        hashes.slice_global()
    }

    /// Merge another collection
    pub fn merge(&self, other: &HashesCollection) {
        self.inner.write().merge(other);
    }

    /// Per-page snapshot
    pub fn snapshot_for_page(&self, page: &str) -> PageHashes {
        self.inner.read().snapshot_for_page(page)
    }

    /// Global snapshot
    pub fn snapshot_global(&self) -> PageHashes {
        self.inner.read().snapshot_global()
    }

    /// Per-page slice
    pub fn slice_for_page(&self, page: &str) -> HashSlice {
        self.inner.read().slice_for_page(page)
    }

    /// Global slice
    pub fn slice_global(&self) -> HashSlice {
        self.inner.read().slice_global()
    }

    /// Consistent copy of the whole collection (for serialization)
    pub fn to_collection(&self) -> HashesCollection {
        self.inner.read().clone()
    }
}
