// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! External resource references

use std::fmt;

use url::Url;

/// Origin used for pages when no site URL is configured
pub const DEFAULT_SITE: &str = "http://localhost/";

/// A script/stylesheet reference resolved against its page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    /// Same-origin resource, identified by its absolute path
    Local(String),
    /// Cross-origin resource
    Remote(Url),
}

impl ResourceRef {
    /// Resolve a raw `src`/`href` value against the page URL.
    ///
    /// Returns `None` for empty values and for schemes that can't be fetched
    /// (`data:`, `blob:`, ...).
    pub fn resolve(page_url: &Url, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let mut url = page_url.join(raw).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        url.set_fragment(None);

        if url.origin() == page_url.origin() {
            Some(ResourceRef::Local(url.path().to_string()))
        } else {
            Some(ResourceRef::Remote(url))
        }
    }

    /// Canonical id used as cache key
    pub fn id(&self) -> String {
        match self {
            ResourceRef::Local(path) => path.clone(),
            ResourceRef::Remote(url) => url.to_string(),
        }
    }

    /// Check if the resource lives on another origin
    pub fn is_remote(&self) -> bool {
        matches!(self, ResourceRef::Remote(_))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Local(path) => write!(f, "{}", path),
            ResourceRef::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// URL a static page is served at, given its path relative to the output dir.
///
/// `blog/post/index.html` under `https://example.com/` becomes
/// `https://example.com/blog/post/index.html`.
pub fn page_url(site: &Url, page_path: &str) -> Url {
    let normalized = page_path.replace('\\', "/");
    let relative = normalized.trim_start_matches('/');
    site.join(relative).unwrap_or_else(|_| site.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Url {
        Url::parse(DEFAULT_SITE).unwrap()
    }

    #[test]
    fn test_resolve_relative_to_page() {
        let page = page_url(&site(), "blog/post/index.html");

        assert_eq!(
            ResourceRef::resolve(&page, "./app.js"),
            Some(ResourceRef::Local("/blog/post/app.js".to_string()))
        );
        assert_eq!(
            ResourceRef::resolve(&page, "../../_astro/main.css"),
            Some(ResourceRef::Local("/_astro/main.css".to_string()))
        );
        assert_eq!(
            ResourceRef::resolve(&page, "/_astro/main.css?v=2#x"),
            Some(ResourceRef::Local("/_astro/main.css".to_string()))
        );
    }

    #[test]
    fn test_resolve_remote() {
        let page = page_url(&site(), "index.html");
        let resolved = ResourceRef::resolve(&page, "https://cdn.example.com/lib.js?v=1#frag").unwrap();

        assert!(resolved.is_remote());
        assert_eq!(resolved.id(), "https://cdn.example.com/lib.js?v=1");

        let protocol_relative = ResourceRef::resolve(&page, "//cdn.example.com/lib.js").unwrap();
        assert_eq!(protocol_relative.id(), "http://cdn.example.com/lib.js");
    }

    #[test]
    fn test_resolve_unfetchable() {
        let page = page_url(&site(), "index.html");

        assert_eq!(ResourceRef::resolve(&page, ""), None);
        assert_eq!(ResourceRef::resolve(&page, "data:text/javascript,alert(1)"), None);
    }

    #[test]
    fn test_page_url_windows_separators() {
        let url = page_url(&site(), "blog\\index.html");
        assert_eq!(url.path(), "/blog/index.html");
    }
}
