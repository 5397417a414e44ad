// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! CSP directive names and user-supplied directive sets

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Known CSP directive names.
///
/// Variants are declared in alphabetical order so that `Ord` matches the
/// order directives are written in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CspDirective {
    BaseUri,
    ChildSrc,
    ConnectSrc,
    DefaultSrc,
    FontSrc,
    FormAction,
    FrameAncestors,
    FrameSrc,
    ImgSrc,
    ManifestSrc,
    MediaSrc,
    ObjectSrc,
    ReportTo,
    ReportUri,
    RequireTrustedTypesFor,
    Sandbox,
    ScriptSrc,
    ScriptSrcAttr,
    ScriptSrcElem,
    StyleSrc,
    StyleSrcAttr,
    StyleSrcElem,
    TrustedTypes,
    UpgradeInsecureRequests,
    WorkerSrc,
}

impl CspDirective {
    /// All directives, in header order
    pub const ALL: [CspDirective; 25] = [
        CspDirective::BaseUri,
        CspDirective::ChildSrc,
        CspDirective::ConnectSrc,
        CspDirective::DefaultSrc,
        CspDirective::FontSrc,
        CspDirective::FormAction,
        CspDirective::FrameAncestors,
        CspDirective::FrameSrc,
        CspDirective::ImgSrc,
        CspDirective::ManifestSrc,
        CspDirective::MediaSrc,
        CspDirective::ObjectSrc,
        CspDirective::ReportTo,
        CspDirective::ReportUri,
        CspDirective::RequireTrustedTypesFor,
        CspDirective::Sandbox,
        CspDirective::ScriptSrc,
        CspDirective::ScriptSrcAttr,
        CspDirective::ScriptSrcElem,
        CspDirective::StyleSrc,
        CspDirective::StyleSrcAttr,
        CspDirective::StyleSrcElem,
        CspDirective::TrustedTypes,
        CspDirective::UpgradeInsecureRequests,
        CspDirective::WorkerSrc,
    ];

    /// Header name of the directive
    pub fn as_str(&self) -> &'static str {
        match self {
            CspDirective::BaseUri => "base-uri",
            CspDirective::ChildSrc => "child-src",
            CspDirective::ConnectSrc => "connect-src",
            CspDirective::DefaultSrc => "default-src",
            CspDirective::FontSrc => "font-src",
            CspDirective::FormAction => "form-action",
            CspDirective::FrameAncestors => "frame-ancestors",
            CspDirective::FrameSrc => "frame-src",
            CspDirective::ImgSrc => "img-src",
            CspDirective::ManifestSrc => "manifest-src",
            CspDirective::MediaSrc => "media-src",
            CspDirective::ObjectSrc => "object-src",
            CspDirective::ReportTo => "report-to",
            CspDirective::ReportUri => "report-uri",
            CspDirective::RequireTrustedTypesFor => "require-trusted-types-for",
            CspDirective::Sandbox => "sandbox",
            CspDirective::ScriptSrc => "script-src",
            CspDirective::ScriptSrcAttr => "script-src-attr",
            CspDirective::ScriptSrcElem => "script-src-elem",
            CspDirective::StyleSrc => "style-src",
            CspDirective::StyleSrcAttr => "style-src-attr",
            CspDirective::StyleSrcElem => "style-src-elem",
            CspDirective::TrustedTypes => "trusted-types",
            CspDirective::UpgradeInsecureRequests => "upgrade-insecure-requests",
            CspDirective::WorkerSrc => "worker-src",
        }
    }

    /// Directives whose value Shield computes itself
    pub fn is_engine_owned(&self) -> bool {
        matches!(
            self,
            CspDirective::ScriptSrc
                | CspDirective::ScriptSrcAttr
                | CspDirective::ScriptSrcElem
                | CspDirective::StyleSrc
                | CspDirective::StyleSrcAttr
                | CspDirective::StyleSrcElem
        )
    }
}

impl fmt::Display for CspDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CspDirective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        CspDirective::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| Error::config(format!("unknown CSP directive '{}'", s)))
    }
}

impl Serialize for CspDirective {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CspDirective {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// User-supplied directives (everything except the engine-owned ones)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CspDirectives(BTreeMap<CspDirective, String>);

impl CspDirectives {
    /// Create an empty directive set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive
    pub fn directive(mut self, name: CspDirective, value: impl Into<String>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    /// Get a directive value
    pub fn get(&self, name: CspDirective) -> Option<&str> {
        self.0.get(&name).map(String::as_str)
    }

    /// Iterate directives in header order
    pub fn iter(&self) -> impl Iterator<Item = (CspDirective, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Check if no directive is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject engine-owned directives and values that would break the header
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.0 {
            if name.is_engine_owned() {
                return Err(Error::config(format!(
                    "'{}' is computed from collected hashes and cannot be configured; \
                     use the allow-list options instead",
                    name
                )));
            }
            if value.contains(';') || value.contains(',') || value.chars().any(|c| c.is_control()) {
                return Err(Error::config(format!(
                    "invalid value for '{}': {:?}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
