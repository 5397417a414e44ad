// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Shield - Subresource Integrity and CSP for generated sites
//!
//! Computes SRI digests for the inline and external scripts and styles of
//! HTML pages and turns them into `Content-Security-Policy` headers.
//!
//! ## Features
//!
//! - Build-time hashing: scans generated pages, adds `integrity` attributes
//! - Request-time hashing: middleware for dynamically rendered pages
//! - Per-page or global CSP hash sets
//! - Inline-content policy per render mode, cross-origin allow-lists
//! - Persisted hashes artifact shared between build and server
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shield::{DistFetcher, FetcherConfig, HostConfig, IntegrationState, ShieldOptions, StaticHashBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ShieldOptions::from_file("shield.json")?;
//!     let state = IntegrationState::new(options, HostConfig::new(".", "dist"))?;
//!
//!     let fetcher = DistFetcher::with_config(FetcherConfig::new().dist_dir("dist"))?;
//!     let builder = StaticHashBuilder::new(&state, Arc::new(fetcher));
//!     let report = builder.process_dist_dir("dist".as_ref()).await?;
//!     println!("hashed {} pages", report.pages_processed);
//!
//!     state.persist_hashes().await?;
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod config;
pub mod csp;
pub mod error;
pub mod html;
pub mod http;
pub mod sri;
pub mod state;

// Re-exports for convenience

// Configuration and state
pub use config::{
    CspGranularity, CspOptions, InlinePolicy, SecurityHeadersOptions, ShieldOptions,
    SriOptions, StaticHeadersProvider,
};
pub use state::{HostConfig, IntegrationState};

// Hashing
pub use sri::{digest, hash_source, HashSlice, HashesCollection, ResourceKind, SharedHashes};

// HTML
pub use html::{extract, ExtractedResources, HtmlPage, ResourceRef};

// Static builder
pub use build::{BuildPhase, BuildReport, DistFetcher, FetcherConfig, ResourceFetcher, StaticHashBuilder};

// CSP
pub use csp::{fallback_policy, synthesize, CspDirective, CspDirectives, DirectiveMap, PolicyContext, RenderMode};

// Middleware
pub use http::{
    shield_chain, HtmlExtensionStripper, MiddlewareChain, Request, Response, ResponseMiddleware,
    ShieldMiddleware,
};

// Error
pub use error::{Error, Result};
