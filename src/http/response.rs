// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Outgoing response types

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;

use crate::error::{Error, Result};

/// HTTP response representation
#[derive(Debug, Clone)]
pub struct Response {
    /// Response status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// 200 response with an HTML body
    pub fn html(body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Self::new(StatusCode::OK, headers, Bytes::from(body.into()))
    }

    /// Redirect response
    pub fn redirect(status: StatusCode, location: &str) -> Result<Self> {
        let mut response = Self::new(status, HeaderMap::new(), Bytes::new());
        response.set_header("location", location)?;
        Ok(response)
    }

    /// Check if status is redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set (replace) a header
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::header(name, e.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| Error::header(name, e.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Check if content type is HTML
    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(false)
    }

    /// Get body as text, lossy conversion
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Replace the body, keeping `content-length` consistent
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        if self.headers.contains_key("content-length") {
            self.headers
                .insert("content-length", HeaderValue::from(self.body.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_response() {
        let resp = Response::html("<p>hi</p>");
        assert!(resp.is_html());
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.text_lossy(), "<p>hi</p>");
    }

    #[test]
    fn test_redirect() {
        let resp = Response::redirect(StatusCode::FOUND, "/about.html").unwrap();
        assert!(resp.is_redirect());
        assert_eq!(resp.header("location"), Some("/about.html"));
        assert!(!resp.is_html());
    }

    #[test]
    fn test_set_body_updates_length() {
        let mut resp = Response::html("abc");
        resp.headers.insert("content-length", HeaderValue::from(3usize));
        resp.set_body("abcdef");
        assert_eq!(resp.header("content-length"), Some("6"));
    }

    #[test]
    fn test_invalid_header_value() {
        let mut resp = Response::html("");
        assert!(resp.set_header("x-test", "bad\nvalue").is_err());
    }
}
