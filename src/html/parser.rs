// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML parser using html5ever

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::error::{Error, Result};
use crate::sri::ResourceKind;

/// A script/style element relevant for hashing, in document order
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub node: Handle,
    pub source: CandidateSource,
}

#[derive(Debug, Clone)]
pub(crate) enum CandidateSource {
    /// `<script>` / `<style>` body
    Inline { kind: ResourceKind, content: String },
    /// `<script src>` / `<link href>`
    External {
        kind: ResourceKind,
        url: String,
        integrity: Option<String>,
    },
}

/// A parsed HTML page
pub struct HtmlPage {
    /// Page identifier (output path or route)
    pub page_id: String,
    dom: RcDom,
}

impl HtmlPage {
    /// Parse an HTML string
    pub fn parse(page_id: impl Into<String>, html: &str) -> Result<Self> {
        let page_id = page_id.into();
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                drop_doctype: false,
                // <noscript> content stays raw text, as in a scripting browser
                scripting_enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let dom = parse_document(RcDom::default(), opts)
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| Error::html_parse(&page_id, e.to_string()))?;

        Ok(Self { page_id, dom })
    }

    /// Parse raw bytes, rejecting anything that isn't UTF-8
    pub fn parse_bytes(page_id: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let page_id = page_id.into();
        let html = std::str::from_utf8(bytes)
            .map_err(|e| Error::html_parse(&page_id, format!("body is not UTF-8: {}", e)))?;
        Self::parse(page_id, html)
    }

    /// Script/style candidates in document order
    pub(crate) fn candidates(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        collect_candidates(&self.dom.document, &mut out);
        out
    }

    /// Set `integrity` (and `crossorigin` for remote resources) on external tags.
    ///
    /// `ordinal` is the position returned by extraction; tags that already
    /// carry an `integrity` attribute are left untouched.
    pub fn set_integrity(&self, ordinal: usize, digest: &str, cross_origin: bool) -> bool {
        let candidates = self.candidates();
        let Some(candidate) = candidates.get(ordinal) else {
            return false;
        };
        if !matches!(candidate.source, CandidateSource::External { .. }) {
            return false;
        }

        if let NodeData::Element { ref attrs, .. } = candidate.node.data {
            let mut attrs = attrs.borrow_mut();
            if attrs.iter().any(|a| a.name.local.as_ref() == "integrity") {
                return false;
            }
            attrs.push(new_attribute("integrity", digest));
            if cross_origin && !attrs.iter().any(|a| a.name.local.as_ref() == "crossorigin") {
                attrs.push(new_attribute("crossorigin", "anonymous"));
            }
            return true;
        }
        false
    }

    /// Rewrite `<a href>` values; `rewrite` returns `None` to keep a link.
    ///
    /// Returns the number of links changed.
    pub fn rewrite_anchor_hrefs<F>(&self, rewrite: F) -> usize
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut anchors = Vec::new();
        collect_elements(&self.dom.document, "a", &mut anchors);

        let mut changed = 0;
        for anchor in anchors {
            if let NodeData::Element { ref attrs, .. } = anchor.data {
                for attr in attrs.borrow_mut().iter_mut() {
                    if attr.name.local.as_ref() != "href" {
                        continue;
                    }
                    if let Some(new_href) = rewrite(&*attr.value) {
                        attr.value = StrTendril::from(new_href.as_str());
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Serialize the (possibly rewritten) page back to HTML.
    ///
    /// Raw-text elements are written verbatim, so inline digests stay valid.
    pub fn to_html(&self) -> Result<String> {
        let document: SerializableHandle = self.dom.document.clone().into();
        let mut out = Vec::new();
        serialize(&mut out, &document, SerializeOpts::default())?;
        String::from_utf8(out).map_err(|e| Error::html_parse(&self.page_id, e.to_string()))
    }
}

fn new_attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from(value),
    }
}

fn attribute(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    for child in node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

fn collect_candidates(handle: &Handle, out: &mut Vec<Candidate>) {
    if let NodeData::Element { ref name, .. } = handle.data {
        match name.local.as_ref() {
            "script" => {
                let source = match attribute(handle, "src") {
                    Some(src) => CandidateSource::External {
                        kind: ResourceKind::Script,
                        url: src,
                        integrity: attribute(handle, "integrity"),
                    },
                    None => CandidateSource::Inline {
                        kind: ResourceKind::Script,
                        content: text_content(handle),
                    },
                };
                out.push(Candidate {
                    node: handle.clone(),
                    source,
                });
                return;
            }
            "style" => {
                out.push(Candidate {
                    node: handle.clone(),
                    source: CandidateSource::Inline {
                        kind: ResourceKind::Style,
                        content: text_content(handle),
                    },
                });
                return;
            }
            "link" => {
                if let Some(source) = link_source(handle) {
                    out.push(Candidate {
                        node: handle.clone(),
                        source,
                    });
                }
                return;
            }
            _ => {}
        }
    }

    // Template contents live outside the children list and are never walked
    for child in handle.children.borrow().iter() {
        collect_candidates(child, out);
    }
}

fn collect_elements(handle: &Handle, local: &str, out: &mut Vec<Handle>) {
    if let NodeData::Element { ref name, .. } = handle.data {
        if name.local.as_ref() == local {
            out.push(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        collect_elements(child, local, out);
    }
}

fn link_source(handle: &Handle) -> Option<CandidateSource> {
    if attribute(handle, "disabled").is_some() {
        return None;
    }
    let rel = attribute(handle, "rel")?.to_ascii_lowercase();
    let kind = if rel.split_ascii_whitespace().any(|r| r == "stylesheet") {
        ResourceKind::Style
    } else if rel.split_ascii_whitespace().any(|r| r == "modulepreload") {
        ResourceKind::Script
    } else {
        return None;
    };

    Some(CandidateSource::External {
        kind,
        url: attribute(handle, "href")?,
        integrity: attribute(handle, "integrity"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_html() {
        let page = HtmlPage::parse("index.html", "<html><body><p>Hello</p></body></html>").unwrap();
        assert!(page.candidates().is_empty());
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        let err = HtmlPage::parse_bytes("bad.html", &[0x3c, 0xff, 0xfe]).err().unwrap();
        assert_eq!(err.page(), Some("bad.html"));
    }

    #[test]
    fn test_candidates_in_document_order() {
        let html = r#"
            <head>
                <link rel="stylesheet" href="/a.css">
                <style>p{}</style>
            </head>
            <body><script src="/b.js"></script><script>run()</script></body>
        "#;
        let page = HtmlPage::parse("index.html", html).unwrap();
        let candidates = page.candidates();

        assert_eq!(candidates.len(), 4);
        assert!(matches!(
            candidates[0].source,
            CandidateSource::External { kind: ResourceKind::Style, .. }
        ));
        assert!(matches!(
            candidates[3].source,
            CandidateSource::Inline { kind: ResourceKind::Script, .. }
        ));
    }

    #[test]
    fn test_set_integrity_and_serialize() {
        let html = r#"<!DOCTYPE html><html><head><script src="https://cdn.example.com/x.js"></script></head><body></body></html>"#;
        let page = HtmlPage::parse("index.html", html).unwrap();

        assert!(page.set_integrity(0, "sha256-abc=", true));
        let out = page.to_html().unwrap();

        assert!(out.contains(r#"integrity="sha256-abc=""#));
        assert!(out.contains(r#"crossorigin="anonymous""#));
        assert!(out.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_set_integrity_keeps_existing() {
        let html = r#"<script src="/x.js" integrity="sha256-old="></script>"#;
        let page = HtmlPage::parse("index.html", html).unwrap();

        assert!(!page.set_integrity(0, "sha256-new=", false));
        assert!(page.to_html().unwrap().contains("sha256-old="));
    }

    #[test]
    fn test_rewrite_anchor_hrefs() {
        let html = r#"<body><a href="/about.html">About</a><a href="https://x.com/">X</a><a>none</a></body>"#;
        let page = HtmlPage::parse("index.html", html).unwrap();

        let changed = page.rewrite_anchor_hrefs(|href| href.strip_suffix(".html").map(str::to_string));
        assert_eq!(changed, 1);

        let out = page.to_html().unwrap();
        assert!(out.contains(r#"href="/about""#));
        assert!(out.contains(r#"href="https://x.com/""#));
    }

    #[test]
    fn test_serialize_keeps_inline_script_verbatim() {
        let script = "if (a < b && c > d) { x = \"<p>\"; }\n  ";
        let html = format!("<html><head><script>{}</script></head></html>", script);
        let page = HtmlPage::parse("index.html", &html).unwrap();

        assert!(page.to_html().unwrap().contains(script));
    }
}
