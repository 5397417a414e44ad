// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Script/style discovery

use std::collections::HashSet;

use url::Url;

use super::parser::{CandidateSource, HtmlPage};
use super::resource::ResourceRef;
use crate::error::Result;
use crate::sri::ResourceKind;

/// An external script or stylesheet referenced by a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
    /// Resolved resource
    pub resource: ResourceRef,
    /// `integrity` attribute already present on the tag
    pub integrity: Option<String>,
    /// Position of the tag, for [`HtmlPage::set_integrity`]
    pub ordinal: usize,
}

/// Everything hashable on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedResources {
    /// Distinct inline script bodies, in document order
    pub inline_scripts: Vec<String>,
    /// Distinct inline style bodies, in document order
    pub inline_styles: Vec<String>,
    pub ext_script_refs: Vec<ExternalRef>,
    pub ext_style_refs: Vec<ExternalRef>,
}

impl ExtractedResources {
    /// Check if the page has no scripts or styles
    pub fn is_empty(&self) -> bool {
        self.inline_scripts.is_empty()
            && self.inline_styles.is_empty()
            && self.ext_script_refs.is_empty()
            && self.ext_style_refs.is_empty()
    }

    /// All external references with their kind
    pub fn externals(&self) -> impl Iterator<Item = (ResourceKind, &ExternalRef)> {
        self.ext_script_refs
            .iter()
            .map(|r| (ResourceKind::Script, r))
            .chain(self.ext_style_refs.iter().map(|r| (ResourceKind::Style, r)))
    }
}

impl HtmlPage {
    /// Collect inline bodies and external references.
    ///
    /// `page_url` is the URL the page is served at; relative references are
    /// resolved against it.
    pub fn extract(&self, page_url: &Url) -> ExtractedResources {
        let mut result = ExtractedResources::default();
        let mut seen_scripts = HashSet::new();
        let mut seen_styles = HashSet::new();

        for (ordinal, candidate) in self.candidates().into_iter().enumerate() {
            match candidate.source {
                CandidateSource::Inline { kind, content } => {
                    let (seen, list) = match kind {
                        ResourceKind::Script => (&mut seen_scripts, &mut result.inline_scripts),
                        ResourceKind::Style => (&mut seen_styles, &mut result.inline_styles),
                    };
                    if seen.insert(content.clone()) {
                        list.push(content);
                    }
                }
                CandidateSource::External {
                    kind,
                    url,
                    integrity,
                } => {
                    let Some(resource) = ResourceRef::resolve(page_url, &url) else {
                        tracing::debug!(page = %self.page_id, url = %url, "Skipping unfetchable reference");
                        continue;
                    };
                    let ext = ExternalRef {
                        resource,
                        integrity: integrity.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()),
                        ordinal,
                    };
                    match kind {
                        ResourceKind::Script => result.ext_script_refs.push(ext),
                        ResourceKind::Style => result.ext_style_refs.push(ext),
                    }
                }
            }
        }

        tracing::debug!(
            page = %self.page_id,
            inline_scripts = result.inline_scripts.len(),
            inline_styles = result.inline_styles.len(),
            ext_scripts = result.ext_script_refs.len(),
            ext_styles = result.ext_style_refs.len(),
            "Extracted resources"
        );

        result
    }
}

/// Parse `html` and extract its resources in one step
pub fn extract(html: &str, page_url: &Url) -> Result<ExtractedResources> {
    let page = HtmlPage::parse(page_url.path(), html)?;
    Ok(page.extract(page_url))
}
