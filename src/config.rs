// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Shield configuration
//!
//! Every recognised option is a field; unknown keys are rejected when
//! loading. Defaults apply only where a value is absent.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::csp::CspDirectives;
use crate::error::{Error, Result};

/// Whether inline scripts/styles may be allowed through hash-sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlinePolicy {
    /// Hash-sources for inline content on every page
    #[default]
    All,
    /// Hash-sources for inline content on statically rendered pages only
    Static,
    /// Never allow inline content
    Deny,
}

impl InlinePolicy {
    /// Check if inline hashes are allowed for a render mode
    pub fn allows(&self, static_render: bool) -> bool {
        match self {
            InlinePolicy::All => true,
            InlinePolicy::Static => static_render,
            InlinePolicy::Deny => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInlinePolicy {
    Flag(bool),
    Mode(String),
}

impl<'de> Deserialize<'de> for InlinePolicy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawInlinePolicy::deserialize(deserializer)? {
            RawInlinePolicy::Flag(true) => Ok(InlinePolicy::All),
            RawInlinePolicy::Flag(false) => Ok(InlinePolicy::Deny),
            RawInlinePolicy::Mode(mode) => match mode.as_str() {
                "all" => Ok(InlinePolicy::All),
                "static" => Ok(InlinePolicy::Static),
                other => Err(serde::de::Error::custom(format!(
                    "expected 'all', 'static' or false, got '{}'",
                    other
                ))),
            },
        }
    }
}

impl Serialize for InlinePolicy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            InlinePolicy::All => serializer.serialize_str("all"),
            InlinePolicy::Static => serializer.serialize_str("static"),
            InlinePolicy::Deny => serializer.serialize_bool(false),
        }
    }
}

/// Which hash set a CSP header is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CspGranularity {
    /// Only the hashes referenced by the page being served
    #[default]
    PerPage,
    /// Every hash known to the process
    All,
}

/// Hosting target that deploys headers for static pages.
///
/// Consumed by deployment tooling; the hashing core never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase", deny_unknown_fields)]
pub enum StaticHeadersProvider {
    Netlify,
    Vercel,
}

/// Subresource Integrity options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SriOptions {
    /// Hash static pages at build time
    pub enable_static: bool,
    /// Hash dynamic pages at request time
    pub enable_middleware: bool,
    /// Where the collected hashes are persisted
    pub hashes_module: Option<PathBuf>,
    /// Inline script policy
    pub allow_inline_scripts: InlinePolicy,
    /// Inline style policy
    pub allow_inline_styles: InlinePolicy,
    /// Cross-origin scripts always allowed
    pub scripts_allow_list_urls: Vec<String>,
    /// Cross-origin stylesheets always allowed
    pub styles_allow_list_urls: Vec<String>,
}

impl Default for SriOptions {
    fn default() -> Self {
        Self {
            enable_static: true,
            enable_middleware: false,
            hashes_module: None,
            allow_inline_scripts: InlinePolicy::All,
            allow_inline_styles: InlinePolicy::All,
            scripts_allow_list_urls: vec![],
            styles_allow_list_urls: vec![],
        }
    }
}

impl SriOptions {
    /// Create default SRI options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable static hashing
    pub fn enable_static(mut self, enabled: bool) -> Self {
        self.enable_static = enabled;
        self
    }

    /// Enable/disable the request middleware
    pub fn enable_middleware(mut self, enabled: bool) -> Self {
        self.enable_middleware = enabled;
        self
    }

    /// Set the hashes artifact path
    pub fn hashes_module(mut self, path: impl Into<PathBuf>) -> Self {
        self.hashes_module = Some(path.into());
        self
    }

    /// Set inline script policy
    pub fn allow_inline_scripts(mut self, policy: InlinePolicy) -> Self {
        self.allow_inline_scripts = policy;
        self
    }

    /// Set inline style policy
    pub fn allow_inline_styles(mut self, policy: InlinePolicy) -> Self {
        self.allow_inline_styles = policy;
        self
    }

    /// Allow a cross-origin script URL
    pub fn allow_script_url(mut self, url: impl Into<String>) -> Self {
        self.scripts_allow_list_urls.push(url.into());
        self
    }

    /// Allow a cross-origin stylesheet URL
    pub fn allow_style_url(mut self, url: impl Into<String>) -> Self {
        self.styles_allow_list_urls.push(url.into());
        self
    }

    /// Check allow-list URLs
    pub fn validate(&self) -> Result<()> {
        for url in self
            .scripts_allow_list_urls
            .iter()
            .chain(self.styles_allow_list_urls.iter())
        {
            validate_allow_list_url(url)?;
        }
        Ok(())
    }
}

fn validate_allow_list_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| Error::config(format!("invalid allow-list URL '{}': {}", raw, e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(Error::config(format!(
            "allow-list URL '{}' must use http or https",
            raw
        )));
    }
    if url.host_str().is_none() || raw.chars().any(|c| c.is_whitespace() || c == ';' || c == ',') {
        return Err(Error::config(format!("invalid allow-list URL '{}'", raw)));
    }
    Ok(())
}

/// Content-Security-Policy options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CspOptions {
    /// Directives other than script-src/style-src
    pub csp_directives: Option<CspDirectives>,
    /// Which hashes go into the header
    pub granularity: CspGranularity,
}

impl CspOptions {
    /// Create default CSP options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set user directives
    pub fn directives(mut self, directives: CspDirectives) -> Self {
        self.csp_directives = Some(directives);
        self
    }

    /// Set granularity
    pub fn granularity(mut self, granularity: CspGranularity) -> Self {
        self.granularity = granularity;
        self
    }
}

/// Security header options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SecurityHeadersOptions {
    /// Deploy headers for static pages through a hosting provider
    pub enable_on_static_pages: Option<StaticHeadersProvider>,
    /// CSP settings; no CSP header is sent when absent
    pub content_security_policy: Option<CspOptions>,
    /// Drop `.html` suffixes from redirect targets and links
    pub remove_html_extension: bool,
    /// `Referrer-Policy` value
    pub referrer_policy: Option<String>,
    /// `X-Frame-Options` value
    pub frame_options: Option<String>,
    /// Send `X-Content-Type-Options: nosniff`
    pub content_type_options: bool,
}

impl SecurityHeadersOptions {
    /// Create default security header options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set CSP options
    pub fn content_security_policy(mut self, csp: CspOptions) -> Self {
        self.content_security_policy = Some(csp);
        self
    }

    /// Set static-page provider
    pub fn enable_on_static_pages(mut self, provider: StaticHeadersProvider) -> Self {
        self.enable_on_static_pages = Some(provider);
        self
    }

    /// Enable/disable `.html` stripping
    pub fn remove_html_extension(mut self, enabled: bool) -> Self {
        self.remove_html_extension = enabled;
        self
    }

    /// Set `Referrer-Policy`
    pub fn referrer_policy(mut self, value: impl Into<String>) -> Self {
        self.referrer_policy = Some(value.into());
        self
    }

    /// Set `X-Frame-Options`
    pub fn frame_options(mut self, value: impl Into<String>) -> Self {
        self.frame_options = Some(value.into());
        self
    }

    /// Enable/disable `X-Content-Type-Options: nosniff`
    pub fn content_type_options(mut self, enabled: bool) -> Self {
        self.content_type_options = enabled;
        self
    }
}

/// Top-level Shield configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ShieldOptions {
    /// Run static hashing after every other page transformation
    pub delay_transform: bool,
    /// SRI options
    pub sri: SriOptions,
    /// Security header options; no headers are generated when absent
    pub security_headers: Option<SecurityHeadersOptions>,
}

impl Default for ShieldOptions {
    fn default() -> Self {
        Self {
            delay_transform: true,
            sri: SriOptions::default(),
            security_headers: None,
        }
    }
}

impl ShieldOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set delayed transform
    pub fn delay_transform(mut self, delay: bool) -> Self {
        self.delay_transform = delay;
        self
    }

    /// Set SRI options
    pub fn sri(mut self, sri: SriOptions) -> Self {
        self.sri = sri;
        self
    }

    /// Set security header options
    pub fn security_headers(mut self, headers: SecurityHeadersOptions) -> Self {
        self.security_headers = Some(headers);
        self
    }

    /// CSP options, if a CSP header is configured
    pub fn csp(&self) -> Option<&CspOptions> {
        self.security_headers
            .as_ref()
            .and_then(|h| h.content_security_policy.as_ref())
    }

    /// Parse and validate options from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.sri.validate()?;
        if let Some(directives) = self.csp().and_then(|c| c.csp_directives.as_ref()) {
            directives.validate()?;
        }
        if let Some(headers) = &self.security_headers {
            for (name, value) in [
                ("referrerPolicy", &headers.referrer_policy),
                ("frameOptions", &headers.frame_options),
            ] {
                if let Some(value) = value {
                    if value.is_empty() || value.chars().any(|c| c.is_control()) {
                        return Err(Error::config(format!("invalid {} value {:?}", name, value)));
                    }
                }
            }
        }
        Ok(())
    }
}
