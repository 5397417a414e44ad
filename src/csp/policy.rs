// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! CSP policy synthesis
//!
//! Turns a hash slice plus user options into the final directive map.
//! Everything here is a pure function of its inputs.

use std::collections::BTreeMap;
use std::fmt;

use super::directive::CspDirective;
use crate::config::{CspOptions, InlinePolicy, SriOptions};
use crate::sri::{hash_source, HashSlice, ResourceKind};

/// How the page being served was rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Prerendered at build time
    Static,
    /// Rendered per request
    Dynamic,
}

/// Cross-origin URLs always allowed in `script-src` / `style-src`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowLists {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl AllowLists {
    /// Allow-lists configured in the SRI options
    pub fn from_options(sri: &SriOptions) -> Self {
        Self {
            scripts: sri.scripts_allow_list_urls.clone(),
            styles: sri.styles_allow_list_urls.clone(),
        }
    }

    /// Check if a remote URL is covered by the allow-list of its kind.
    ///
    /// An entry covers itself and, when it ends with `/`, everything below it.
    pub fn permits(&self, kind: ResourceKind, url: &str) -> bool {
        self.for_kind(kind)
            .iter()
            .any(|entry| url == entry || (entry.ends_with('/') && url.starts_with(entry.as_str())))
    }

    fn for_kind(&self, kind: ResourceKind) -> &[String] {
        match kind {
            ResourceKind::Script => &self.scripts,
            ResourceKind::Style => &self.styles,
        }
    }
}

/// Inputs that vary per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyContext {
    pub mode: RenderMode,
    pub allow_lists: AllowLists,
}

impl PolicyContext {
    /// Context for a prerendered page
    pub fn for_static(sri: &SriOptions) -> Self {
        Self {
            mode: RenderMode::Static,
            allow_lists: AllowLists::from_options(sri),
        }
    }

    /// Context for a page rendered at request time
    pub fn for_dynamic(sri: &SriOptions) -> Self {
        Self {
            mode: RenderMode::Dynamic,
            allow_lists: AllowLists::from_options(sri),
        }
    }
}

/// Ordered directive -> sources mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveMap(BTreeMap<CspDirective, Vec<String>>);

impl DirectiveMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a directive from a raw space-separated value
    pub fn set_raw(&mut self, directive: CspDirective, value: &str) {
        self.0.insert(
            directive,
            value.split_whitespace().map(str::to_string).collect(),
        );
    }

    /// Set a directive from a source list
    pub fn set(&mut self, directive: CspDirective, sources: Vec<String>) {
        self.0.insert(directive, sources);
    }

    /// Sources of a directive
    pub fn get(&self, directive: CspDirective) -> Option<&[String]> {
        self.0.get(&directive).map(Vec::as_slice)
    }

    /// Check if a directive contains a source
    pub fn contains(&self, directive: CspDirective, source: &str) -> bool {
        self.get(directive)
            .map(|sources| sources.iter().any(|s| s == source))
            .unwrap_or(false)
    }

    /// Iterate in header order
    pub fn iter(&self) -> impl Iterator<Item = (CspDirective, &[String])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Serialize to a `Content-Security-Policy` header value
    pub fn to_header_value(&self) -> String {
        self.0
            .iter()
            .map(|(name, sources)| {
                if sources.is_empty() {
                    name.as_str().to_string()
                } else {
                    format!("{} {}", name, sources.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for DirectiveMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Build the directive map for a hash slice.
///
/// `script-src` and `style-src` always come from the slice and the
/// allow-lists, never from user directives. Inline hashes are included
/// according to the inline policy of each kind and the render mode.
pub fn synthesize(
    slice: &HashSlice,
    csp: Option<&CspOptions>,
    sri: &SriOptions,
    context: &PolicyContext,
) -> DirectiveMap {
    let mut map = DirectiveMap::new();

    match csp.and_then(|c| c.csp_directives.as_ref()) {
        Some(directives) if !directives.is_empty() => {
            for (name, value) in directives.iter() {
                if name.is_engine_owned() {
                    tracing::warn!(directive = %name, "Ignoring user value for engine-owned directive");
                    continue;
                }
                map.set_raw(name, value);
            }
        }
        _ => map.set_raw(CspDirective::DefaultSrc, "'self'"),
    }

    for (directive, kind, policy) in [
        (CspDirective::ScriptSrc, ResourceKind::Script, sri.allow_inline_scripts),
        (CspDirective::StyleSrc, ResourceKind::Style, sri.allow_inline_styles),
    ] {
        map.set(directive, source_list(slice, kind, policy, context));
    }

    map
}

fn source_list(
    slice: &HashSlice,
    kind: ResourceKind,
    policy: InlinePolicy,
    context: &PolicyContext,
) -> Vec<String> {
    let mut digests = slice.external(kind).clone();
    if policy.allows(context.mode == RenderMode::Static) {
        digests.extend(slice.inline(kind).iter().cloned());
    }

    let mut sources = vec!["'self'".to_string()];
    sources.extend(digests.iter().map(|d| hash_source(d)));
    for url in context.allow_lists.for_kind(kind) {
        if !sources.contains(url) {
            sources.push(url.clone());
        }
    }
    sources
}

/// Policy sent when a page's hashes could not be computed.
///
/// Same directives, no hash-sources: inline content and unlisted remote
/// resources are blocked rather than the request failing.
pub fn fallback_policy(csp: Option<&CspOptions>, sri: &SriOptions, context: &PolicyContext) -> DirectiveMap {
    synthesize(&HashSlice::default(), csp, sri, context)
}
