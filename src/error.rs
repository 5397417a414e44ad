// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for Shield
//!
//! Build-time errors abort a single page, request-time errors degrade the
//! response headers. Hash mismatches are not errors at all: they are logged
//! as warnings by the hash store.

use thiserror::Error;

/// Result type alias for Shield operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Shield
#[derive(Error, Debug)]
pub enum Error {
    /// HTML could not be turned into a tree for one page or response
    #[error("HTML parsing error in {page}: {reason}")]
    HtmlParse { page: String, reason: String },

    /// Invalid configuration (unknown directive, bad allow-list URL, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external script/style could not be loaded for hashing
    #[error("Failed to fetch {resource}: {reason}")]
    Fetch { resource: String, reason: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Header value could not be encoded
    #[error("Invalid header value for {name}: {reason}")]
    Header { name: String, reason: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an HTML parse error for a page
    pub fn html_parse(page: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::HtmlParse {
            page: page.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error for a resource
    pub fn fetch(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Fetch {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a header encoding error
    pub fn header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Header {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Errors that only invalidate the page being processed, not the build
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            Error::HtmlParse { .. }
                | Error::Fetch { .. }
                | Error::Http(_)
                | Error::Url(_)
                | Error::Io(_)
        )
    }

    /// Page identifier if available
    pub fn page(&self) -> Option<&str> {
        match self {
            Error::HtmlParse { page, .. } => Some(page),
            _ => None,
        }
    }
}
