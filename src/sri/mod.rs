// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Subresource Integrity hashing
//!
//! - Digest computation
//! - Hash collection (global, per page, per resource)
//! - Shared store handle

mod collection;
mod digest;
mod store;

pub use collection::{
    ExternalDigest, HashSlice, HashesCollection, PageDiscoveries, PageHashes, PageSources, PerResourceHashes,
    ResourceKind,
};
pub use digest::{digest, hash_source, is_valid_integrity, DIGEST_ALGORITHM};
pub use store::SharedHashes;
