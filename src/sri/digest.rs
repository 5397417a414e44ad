// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Digest computation for SRI and CSP hash-sources

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Algorithm tag used for every digest Shield produces
pub const DIGEST_ALGORITHM: &str = "sha256";

lazy_static! {
    static ref INTEGRITY_REGEX: Regex =
        Regex::new(r"^(sha256|sha384|sha512)-[A-Za-z0-9+/]+={0,2}$").unwrap();
}

/// Compute the SRI digest (`sha256-<base64>`) of a payload
pub fn digest(payload: &[u8]) -> String {
    let hash = Sha256::digest(payload);
    format!("{}-{}", DIGEST_ALGORITHM, BASE64.encode(hash))
}

/// Format a digest as a CSP hash-source (`'sha256-<base64>'`)
pub fn hash_source(digest: &str) -> String {
    format!("'{}'", digest)
}

/// Check a pre-existing `integrity` attribute value.
///
/// Only single-token values are accepted; a multi-hash attribute can't be
/// used as a CSP hash-source as-is.
pub fn is_valid_integrity(value: &str) -> bool {
    INTEGRITY_REGEX.is_match(value.trim())
}
