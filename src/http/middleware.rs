// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Runtime middlewares for dynamically rendered pages

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::chain::ResponseMiddleware;
use super::headers::{extra_security_headers, insert_header, set_csp_header};
use super::{Request, Response};
use crate::build::{inline_discoveries, resolve_externals, ResourceFetcher};
use crate::config::CspGranularity;
use crate::csp::{fallback_policy, synthesize, AllowLists, PolicyContext};
use crate::error::Result;
use crate::html::{HtmlPage, ResourceRef};
use crate::sri::HashSlice;
use crate::state::IntegrationState;

/// Hashes dynamically rendered pages and attaches their security headers.
///
/// The page id of a dynamic page is its request path.
pub struct ShieldMiddleware {
    state: IntegrationState,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl ShieldMiddleware {
    /// Create the middleware bound to the integration state
    pub fn new(state: IntegrationState, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { state, fetcher }
    }

    /// Hash a rendered page, merge it into the store and return its slice.
    ///
    /// Local resources are always fetched. Remote ones only when they are
    /// allow-listed; the rest is left for the CSP to block.
    async fn hash_page(&self, request: &Request, response: &mut Response) -> Result<HashSlice> {
        let sri = &self.state.options().sri;
        let store = self.state.hashes();
        let page_id = request.path().to_string();

        let resources = HtmlPage::parse_bytes(&page_id, &response.body)?.extract(&request.url);

        let allow_lists = AllowLists::from_options(sri);
        let resolved = resolve_externals(&resources, store, self.fetcher.as_ref(), |kind, resource| {
            match resource {
                ResourceRef::Local(_) => true,
                ResourceRef::Remote(url) => allow_lists.permits(kind, url.as_str()),
            }
        })
        .await;

        let mut discoveries = inline_discoveries(&resources);
        let mut pending = Vec::new();
        for ext in resolved {
            match &ext.digest {
                Ok(Some(_)) => {
                    if let Some(discovery) = ext.to_discovery() {
                        discoveries.external.push(discovery);
                    }
                    if !ext.declared {
                        pending.push(ext);
                    }
                }
                Ok(None) => {
                    tracing::debug!(page = %page_id, resource = %ext.resource, "Resource not allow-listed, not hashed");
                }
                Err(e) => {
                    tracing::warn!(page = %page_id, error = %e, "Failed to hash resource");
                }
            }
        }

        let granularity = self
            .state
            .options()
            .csp()
            .map(|c| c.granularity)
            .unwrap_or_default();
        let slice = match granularity {
            CspGranularity::PerPage => store.merge_page(&page_id, &discoveries),
            CspGranularity::All => store.merge_global(&page_id, &discoveries),
        };

        if !pending.is_empty() {
            let page = HtmlPage::parse_bytes(&page_id, &response.body)?;
            let mut changed = false;
            for ext in &pending {
                if let Some(digest) = store.resource_digest(ext.kind, &ext.resource.id()) {
                    changed |= page.set_integrity(ext.ordinal, &digest, ext.resource.is_remote());
                }
            }
            if changed {
                response.set_body(page.to_html()?);
            }
        }

        Ok(slice)
    }
}

#[async_trait]
impl ResponseMiddleware for ShieldMiddleware {
    fn name(&self) -> &'static str {
        "shield"
    }

    fn should_handle(&self, _request: &Request) -> bool {
        self.state.options().sri.enable_middleware || self.state.options().security_headers.is_some()
    }

    async fn on_response(&self, request: &Request, response: &mut Response) -> Result<()> {
        if !response.is_html() {
            return Ok(());
        }
        let options = self.state.options();

        let slice = if options.sri.enable_middleware {
            match self.hash_page(request, response).await {
                Ok(slice) => Some(slice),
                Err(e) => {
                    tracing::warn!(path = %request.path(), error = %e, "Failed to hash page, using fallback policy");
                    None
                }
            }
        } else {
            Some(HashSlice::default())
        };

        let Some(headers) = options.security_headers.as_ref() else {
            return Ok(());
        };

        if let Some(ref csp) = headers.content_security_policy {
            let context = PolicyContext::for_dynamic(&options.sri);
            let policy = match slice {
                Some(ref slice) => synthesize(slice, Some(csp), &options.sri, &context),
                None => fallback_policy(Some(csp), &options.sri, &context),
            };
            set_csp_header(&mut response.headers, &policy)?;
        }

        for (name, value) in extra_security_headers(headers) {
            insert_header(&mut response.headers, name, &value)?;
        }
        Ok(())
    }
}

/// Drops the `.html` extension from redirects and same-origin links
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtensionStripper;

impl HtmlExtensionStripper {
    /// Create the stripper
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseMiddleware for HtmlExtensionStripper {
    fn name(&self) -> &'static str {
        "html-extension-stripper"
    }

    async fn on_response(&self, request: &Request, response: &mut Response) -> Result<()> {
        if let Some(location) = response.header("location").map(str::to_string) {
            if let Some(stripped) = strip_html_extension(&location, &request.url) {
                response.set_header("location", &stripped)?;
            }
        }

        if !response.is_html() || response.body.is_empty() {
            return Ok(());
        }

        let page = HtmlPage::parse_bytes(request.path(), &response.body)?;
        let changed = page.rewrite_anchor_hrefs(|href| strip_html_extension(href, &request.url));
        if changed > 0 {
            tracing::debug!(path = %request.path(), links = changed, "Stripped .html from links");
            response.set_body(page.to_html()?);
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        100 // Rewrite links before the page is hashed
    }
}

/// Link without its `.html` extension; `None` if nothing changes.
///
/// `/index.html` becomes `/`. Cross-origin links are left alone.
pub fn strip_html_extension(href: &str, base: &Url) -> Option<String> {
    if let Ok(mut absolute) = Url::parse(href) {
        if absolute.origin() != base.origin() {
            return None;
        }
        let path = strip_path(absolute.path())?;
        absolute.set_path(&path);
        return Some(absolute.to_string());
    }
    if href.starts_with("//") {
        // Scheme-relative, same rule as absolute links
        let absolute = base.join(href).ok()?;
        if absolute.origin() != base.origin() {
            return None;
        }
    }

    let split = href.find(|c| c == '?' || c == '#').unwrap_or(href.len());
    let (path, rest) = href.split_at(split);
    let path = strip_path(path)?;
    Some(format!("{}{}", path, rest))
}

fn strip_path(path: &str) -> Option<String> {
    if path == "index.html" {
        return Some("./".to_string());
    }
    if let Some(dir) = path.strip_suffix("/index.html") {
        return Some(format!("{}/", dir));
    }
    path.strip_suffix(".html")
        .filter(|p| !p.is_empty() && !p.ends_with('/'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CspOptions, InlinePolicy, SecurityHeadersOptions, ShieldOptions, SriOptions};
    use crate::error::Error;
    use crate::http::headers::{CONTENT_SECURITY_POLICY, X_CONTENT_TYPE_OPTIONS};
    use crate::sri::digest;
    use crate::state::HostConfig;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;

    /// In-memory fetcher; `delay` lets concurrent requests interleave
    #[derive(Default)]
    struct MemoryFetcher {
        files: HashMap<String, String>,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl MemoryFetcher {
        fn with(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ResourceFetcher for MemoryFetcher {
        async fn fetch(&self, resource: &ResourceRef) -> Result<Bytes> {
            self.calls.lock().push(resource.id());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.files
                .get(&resource.id())
                .map(|content| Bytes::from(content.clone()))
                .ok_or_else(|| Error::fetch(resource.id(), "not found"))
        }
    }

    fn state(sri: SriOptions, csp: CspOptions) -> IntegrationState {
        let options = ShieldOptions::new().sri(sri.enable_middleware(true)).security_headers(
            SecurityHeadersOptions::new()
                .content_security_policy(csp)
                .content_type_options(true),
        );
        IntegrationState::new(options, HostConfig::new("/p", "/p/dist")).unwrap()
    }

    async fn serve(middleware: &ShieldMiddleware, url: &str, html: &str) -> Response {
        let request = Request::get(url).unwrap();
        let mut response = Response::html(html);
        middleware.on_response(&request, &mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_dynamic_page_gets_external_hashes() {
        let state = state(SriOptions::new(), CspOptions::new());
        let fetcher = Arc::new(MemoryFetcher::with(&[("/app.js", "run()")]));
        let middleware = ShieldMiddleware::new(state.clone(), fetcher);

        let response = serve(
            &middleware,
            "http://localhost/dash",
            r#"<html><head><script src="/app.js"></script><script>inline()</script></head></html>"#,
        )
        .await;

        let csp = response.header(CONTENT_SECURITY_POLICY).unwrap();
        assert!(csp.contains(&format!("'{}'", digest(b"run()"))));
        assert!(csp.contains(&format!("'{}'", digest(b"inline()"))));
        assert_eq!(response.header(X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
        assert!(response.text_lossy().contains(&format!(r#"integrity="{}""#, digest(b"run()"))));

        let snapshot = state.hashes().snapshot_for_page("/dash");
        assert!(snapshot.scripts.contains(&digest(b"inline()")));
    }

    #[tokio::test]
    async fn test_static_inline_policy_excludes_dynamic_pages() {
        let sri = SriOptions::new().allow_inline_scripts(InlinePolicy::Static);
        let state = state(sri, CspOptions::new());
        let middleware = ShieldMiddleware::new(state.clone(), Arc::new(MemoryFetcher::default()));

        let response = serve(&middleware, "http://localhost/dash", "<script>inline()</script>").await;

        let csp = response.header(CONTENT_SECURITY_POLICY).unwrap();
        assert!(!csp.contains(&format!("'{}'", digest(b"inline()"))));
        // Still recorded for later static use
        assert!(state.hashes().snapshot_global().scripts.contains(&digest(b"inline()")));
    }

    #[tokio::test]
    async fn test_remote_resources_need_allow_list() {
        let sri = SriOptions::new().allow_script_url("https://cdn.example.com/ok.js");
        let state = state(sri, CspOptions::new());
        let fetcher = Arc::new(MemoryFetcher::with(&[
            ("https://cdn.example.com/ok.js", "ok"),
            ("https://evil.example.com/x.js", "x"),
        ]));
        let middleware = ShieldMiddleware::new(state, fetcher.clone());

        let response = serve(
            &middleware,
            "http://localhost/",
            r#"<script src="https://cdn.example.com/ok.js"></script><script src="https://evil.example.com/x.js"></script>"#,
        )
        .await;

        assert_eq!(*fetcher.calls.lock(), vec!["https://cdn.example.com/ok.js".to_string()]);
        let csp = response.header(CONTENT_SECURITY_POLICY).unwrap();
        assert!(csp.contains(&format!("'{}'", digest(b"ok"))));
        assert!(!csp.contains("evil.example.com"));
        assert!(response.text_lossy().contains(r#"crossorigin="anonymous""#));
    }

    #[tokio::test]
    async fn test_invalid_body_uses_fallback_policy() {
        let state = state(SriOptions::new(), CspOptions::new());
        let middleware = ShieldMiddleware::new(state.clone(), Arc::new(MemoryFetcher::default()));

        let request = Request::get("http://localhost/bad").unwrap();
        let mut response = Response::html("");
        response.set_body(vec![0x3c, 0xff, 0xfe]);
        middleware.on_response(&request, &mut response).await.unwrap();

        assert_eq!(
            response.header(CONTENT_SECURITY_POLICY),
            Some("default-src 'self'; script-src 'self'; style-src 'self'")
        );
        assert!(state.hashes().to_collection().is_empty());
    }

    #[tokio::test]
    async fn test_non_html_untouched() {
        let state = state(SriOptions::new(), CspOptions::new());
        let middleware = ShieldMiddleware::new(state, Arc::new(MemoryFetcher::default()));

        let request = Request::get("http://localhost/data.json").unwrap();
        let mut response = Response::html("{}");
        response.set_header("content-type", "application/json").unwrap();
        middleware.on_response(&request, &mut response).await.unwrap();

        assert!(response.header(CONTENT_SECURITY_POLICY).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_their_own_hashes() {
        let files: Vec<(String, String)> = (0..6)
            .map(|i| (format!("/page-{}.js", i), format!("script {}", i)))
            .collect();
        let fetcher = MemoryFetcher {
            files: files.iter().cloned().collect(),
            delay: Some(Duration::from_millis(5)),
            ..Default::default()
        };
        let state = state(SriOptions::new(), CspOptions::new());
        let middleware = Arc::new(ShieldMiddleware::new(state, Arc::new(fetcher)));

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let middleware = middleware.clone();
                tokio::spawn(async move {
                    let html = format!(r#"<script src="/page-{}.js"></script>"#, i);
                    let response =
                        serve(&middleware, &format!("http://localhost/p{}", i), &html).await;
                    (i, response.header(CONTENT_SECURITY_POLICY).unwrap_or_default().to_string())
                })
            })
            .collect();

        for task in tasks {
            let (i, csp) = task.await.unwrap();
            for j in 0..6 {
                let hash = format!("'{}'", digest(format!("script {}", j).as_bytes()));
                assert_eq!(csp.contains(&hash), i == j, "page {} policy: {}", i, csp);
            }
        }
    }

    #[tokio::test]
    async fn test_global_granularity_shares_hashes() {
        let csp = CspOptions::new().granularity(CspGranularity::All);
        let state = state(SriOptions::new(), csp);
        let fetcher = Arc::new(MemoryFetcher::with(&[("/a.js", "a"), ("/b.js", "b")]));
        let middleware = ShieldMiddleware::new(state, fetcher);

        serve(&middleware, "http://localhost/a", r#"<script src="/a.js"></script>"#).await;
        let response = serve(&middleware, "http://localhost/b", r#"<script src="/b.js"></script>"#).await;

        let csp = response.header(CONTENT_SECURITY_POLICY).unwrap();
        assert!(csp.contains(&format!("'{}'", digest(b"a"))));
        assert!(csp.contains(&format!("'{}'", digest(b"b"))));
    }

    #[test]
    fn test_strip_html_extension() {
        let base = Url::parse("https://example.com/blog/").unwrap();

        assert_eq!(strip_html_extension("/about.html", &base).as_deref(), Some("/about"));
        assert_eq!(strip_html_extension("/index.html", &base).as_deref(), Some("/"));
        assert_eq!(strip_html_extension("docs/index.html#top", &base).as_deref(), Some("docs/#top"));
        assert_eq!(strip_html_extension("post.html?x=1", &base).as_deref(), Some("post?x=1"));
        assert_eq!(
            strip_html_extension("https://example.com/a.html", &base).as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(strip_html_extension("https://other.com/a.html", &base), None);
        assert_eq!(strip_html_extension("//other.com/a.html", &base), None);
        assert_eq!(strip_html_extension("/about", &base), None);
        assert_eq!(strip_html_extension("/.html", &base), None);
    }

    #[tokio::test]
    async fn test_stripper_rewrites_location_and_links() {
        let stripper = HtmlExtensionStripper::new();
        let request = Request::get("https://example.com/").unwrap();

        let mut redirect = Response::redirect(reqwest::StatusCode::MOVED_PERMANENTLY, "/docs/index.html").unwrap();
        stripper.on_response(&request, &mut redirect).await.unwrap();
        assert_eq!(redirect.header("location"), Some("/docs/"));

        let mut page = Response::html(r#"<a href="/about.html">About</a><a href="https://x.org/y.html">Y</a>"#);
        stripper.on_response(&request, &mut page).await.unwrap();
        let body = page.text_lossy();
        assert!(body.contains(r#"href="/about""#));
        assert!(body.contains(r#"href="https://x.org/y.html""#));
    }
}
