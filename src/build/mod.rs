// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Build-time hashing of static pages

mod builder;
mod fetcher;
mod resolve;

pub use builder::{
    relative_page_id, scan_dist_dir, BuildPhase, BuildReport, PageFailure, StaticHashBuilder,
};
pub use fetcher::{DistFetcher, FetcherConfig, ResourceFetcher, DEFAULT_USER_AGENT};
pub use resolve::{inline_discoveries, resolve_externals, ResolvedExternal};
