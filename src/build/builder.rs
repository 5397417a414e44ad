// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Static hash builder
//!
//! Hashes every generated page once all other page transformations are
//! done, records the digests and adds `integrity` attributes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use url::Url;

use super::fetcher::ResourceFetcher;
use super::resolve::{inline_discoveries, resolve_externals};
use crate::error::{Error, Result};
use crate::html::{page_url, HtmlPage};
use crate::sri::SharedHashes;
use crate::state::IntegrationState;

/// Point of the host build at which a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// While pages are being rendered
    PageRender,
    /// After the whole build has been written out
    BuildDone,
}

/// A page that could not be hashed
#[derive(Debug)]
pub struct PageFailure {
    pub page: String,
    pub error: Error,
}

/// Outcome of hashing a set of pages
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Pages hashed successfully
    pub pages_processed: usize,
    /// Pages whose HTML was rewritten
    pub pages_rewritten: usize,
    /// Pages that failed, with their errors
    pub failures: Vec<PageFailure>,
    /// Total time in milliseconds
    pub elapsed_ms: u64,
}

impl BuildReport {
    /// Check if every page was hashed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Build-time driver feeding the shared hash store
pub struct StaticHashBuilder {
    store: SharedHashes,
    fetcher: Arc<dyn ResourceFetcher>,
    site: Url,
    enabled: bool,
    delay_transform: bool,
}

impl StaticHashBuilder {
    /// Create a builder bound to the integration state
    pub fn new(state: &IntegrationState, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            store: state.hashes().clone(),
            fetcher,
            site: state.site_url(),
            enabled: state.options().sri.enable_static,
            delay_transform: state.delay_transform(),
        }
    }

    /// Phase at which the builder must run
    pub fn phase(&self) -> BuildPhase {
        if self.delay_transform {
            BuildPhase::BuildDone
        } else {
            BuildPhase::PageRender
        }
    }

    /// Check if the builder should run in a phase
    pub fn runs_in(&self, phase: BuildPhase) -> bool {
        self.enabled && self.phase() == phase
    }

    /// Hash one page and return its rewritten HTML.
    ///
    /// Nothing is recorded if any resource of the page can't be hashed.
    pub async fn process_page(&self, page_id: &str, html: &str) -> Result<String> {
        let url = page_url(&self.site, page_id);
        let resources = HtmlPage::parse(page_id, html)?.extract(&url);

        let resolved =
            resolve_externals(&resources, &self.store, self.fetcher.as_ref(), |_, _| true).await;

        let mut discoveries = inline_discoveries(&resources);
        let mut pending = Vec::new();
        for ext in resolved {
            match ext.digest {
                Ok(Some(_)) => {
                    if let Some(discovery) = ext.to_discovery() {
                        discoveries.external.push(discovery);
                    }
                    if !ext.declared {
                        pending.push(ext);
                    }
                }
                Ok(None) => {}
                Err(e) => return Err(e),
            }
        }

        self.store.apply(page_id, &discoveries);
        tracing::debug!(
            page = %page_id,
            inline_scripts = discoveries.inline_scripts.len(),
            inline_styles = discoveries.inline_styles.len(),
            external = discoveries.external.len(),
            "Recorded page hashes"
        );

        if pending.is_empty() {
            return Ok(html.to_string());
        }

        // Second pass: the digest in effect may differ from the fetched one
        let page = HtmlPage::parse(page_id, html)?;
        for ext in &pending {
            if let Some(digest) = self.store.resource_digest(ext.kind, &ext.resource.id()) {
                page.set_integrity(ext.ordinal, &digest, ext.resource.is_remote());
            }
        }
        page.to_html()
    }

    /// Hash a list of `(page_id, html)` pairs, returning rewritten pages.
    ///
    /// Pages failing with a page-local error are reported and skipped; any
    /// other error aborts the run.
    pub async fn process_pages(
        &self,
        pages: Vec<(String, String)>,
    ) -> Result<(Vec<(String, String)>, BuildReport)> {
        let start = Instant::now();
        let mut report = BuildReport::default();
        let mut output = Vec::with_capacity(pages.len());

        for (page_id, html) in pages {
            match self.process_page(&page_id, &html).await {
                Ok(rewritten) => {
                    report.pages_processed += 1;
                    if rewritten != html {
                        report.pages_rewritten += 1;
                    }
                    output.push((page_id, rewritten));
                }
                Err(error) if !error.is_page_local() => return Err(error),
                Err(error) => {
                    tracing::error!(page = %page_id, error = %error, "Failed to hash page");
                    report.failures.push(PageFailure { page: page_id, error });
                }
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        report
            .failures
            .sort_by(|a, b| a.page.cmp(&b.page));
        Ok((output, report))
    }

    /// Hash every HTML file under an output directory, rewriting files in place
    pub async fn process_dist_dir(&self, dist_dir: &Path) -> Result<BuildReport> {
        if !self.enabled {
            tracing::info!("Static hashing disabled, skipping");
            return Ok(BuildReport::default());
        }

        let start = Instant::now();
        let files = scan_dist_dir(dist_dir).await?;
        let mut report = BuildReport::default();

        for file in files {
            let page_id = relative_page_id(dist_dir, &file);
            let html = match tokio::fs::read(&file).await {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(html) => html,
                    Err(e) => {
                        report.failures.push(PageFailure {
                            error: Error::html_parse(&page_id, format!("not UTF-8: {}", e)),
                            page: page_id,
                        });
                        continue;
                    }
                },
                Err(e) => {
                    report.failures.push(PageFailure { page: page_id, error: e.into() });
                    continue;
                }
            };

            match self.process_page(&page_id, &html).await {
                Ok(rewritten) => {
                    report.pages_processed += 1;
                    if rewritten != html {
                        tokio::fs::write(&file, rewritten).await?;
                        report.pages_rewritten += 1;
                    }
                }
                Err(error) if !error.is_page_local() => return Err(error),
                Err(error) => {
                    tracing::error!(page = %page_id, error = %error, "Failed to hash page");
                    report.failures.push(PageFailure { page: page_id, error });
                }
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            pages = report.pages_processed,
            rewritten = report.pages_rewritten,
            failed = report.failures.len(),
            elapsed_ms = report.elapsed_ms,
            "Static hashing finished"
        );
        Ok(report)
    }
}

/// Page id of a file: its path relative to the output dir, `/`-separated
pub fn relative_page_id(dist_dir: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(dist_dir).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// All `*.html` files under a directory, sorted
pub async fn scan_dist_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push(path);
            } else if path.extension().map(|e| e == "html").unwrap_or(false) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
