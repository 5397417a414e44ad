// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Content Security Policy synthesis
//!
//! - Closed set of directive names
//! - Directive merging with engine-owned script-src/style-src
//! - Header serialization

mod directive;
mod policy;

pub use directive::{CspDirective, CspDirectives};
pub use policy::{fallback_policy, synthesize, AllowLists, DirectiveMap, PolicyContext, RenderMode};
