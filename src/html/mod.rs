// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML resource extraction
//!
//! Walks an html5ever tree to find inline scripts/styles and external
//! script/stylesheet references, and rewrites tags with `integrity`.

mod extract;
mod parser;
mod resource;

pub use extract::{extract, ExternalRef, ExtractedResources};
pub use parser::HtmlPage;
pub use resource::{page_url, ResourceRef, DEFAULT_SITE};
