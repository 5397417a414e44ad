// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Security header values

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{CspGranularity, SecurityHeadersOptions};
use crate::csp::{synthesize, DirectiveMap, PolicyContext};
use crate::error::{Error, Result};
use crate::state::IntegrationState;

pub const CONTENT_SECURITY_POLICY: &str = "content-security-policy";
pub const REFERRER_POLICY: &str = "referrer-policy";
pub const X_FRAME_OPTIONS: &str = "x-frame-options";
pub const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";

/// Headers other than CSP configured in the security headers options
pub fn extra_security_headers(options: &SecurityHeadersOptions) -> Vec<(&'static str, String)> {
    let mut headers = Vec::new();
    if let Some(ref policy) = options.referrer_policy {
        headers.push((REFERRER_POLICY, policy.clone()));
    }
    if let Some(ref frame) = options.frame_options {
        headers.push((X_FRAME_OPTIONS, frame.clone()));
    }
    if options.content_type_options {
        headers.push((X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()));
    }
    headers
}

/// Insert a header, replacing any previous value
pub fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|e| Error::header(name, e.to_string()))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Set the `content-security-policy` header from a directive map
pub fn set_csp_header(headers: &mut HeaderMap, policy: &DirectiveMap) -> Result<()> {
    insert_header(headers, CONTENT_SECURITY_POLICY, &policy.to_header_value())
}

/// CSP header value of every prerendered page, sorted by page id.
///
/// Used to emit per-page header files for static hosting. Pages rendered
/// per request are left out. Empty when no CSP is configured.
pub fn static_page_policies(state: &IntegrationState) -> Vec<(String, String)> {
    let options = state.options();
    let Some(csp) = options.csp() else {
        return Vec::new();
    };
    let context = PolicyContext::for_static(&options.sri);
    let collection = state.hashes().to_collection();

    collection
        .static_pages()
        .map(|page| {
            let slice = match csp.granularity {
                CspGranularity::PerPage => collection.slice_for_page(page),
                CspGranularity::All => collection.slice_static_global(),
            };
            let policy = synthesize(&slice, Some(csp), &options.sri, &context);
            (page.to_string(), policy.to_header_value())
        })
        .collect()
}
