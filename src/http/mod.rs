// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request-time layer
//!
//! Runs after the host renders a dynamic page: hashes what the page
//! references, then attaches CSP and the other security headers.

mod chain;
pub mod headers;
mod middleware;
mod request;
mod response;

use std::sync::Arc;

pub use chain::{MiddlewareChain, ResponseMiddleware};
pub use middleware::{strip_html_extension, HtmlExtensionStripper, ShieldMiddleware};
pub use request::Request;
pub use response::Response;

use crate::build::ResourceFetcher;
use crate::state::IntegrationState;

/// Middleware chain for the configured options
pub fn shield_chain(state: &IntegrationState, fetcher: Arc<dyn ResourceFetcher>) -> MiddlewareChain {
    let mut chain = MiddlewareChain::new();
    let options = state.options();

    if options
        .security_headers
        .as_ref()
        .map(|h| h.remove_html_extension)
        .unwrap_or(false)
    {
        chain.add(HtmlExtensionStripper::new());
    }
    if options.sri.enable_middleware || options.security_headers.is_some() {
        chain.add(ShieldMiddleware::new(state.clone(), fetcher));
    }
    chain
}
