//! ETag computation for feed pages.
//!
//! ETags are SHA-256 hashes of the serialised response body, so any change
//! visible to the client (post text, group, image, follow flag, page layout)
//! changes the tag.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

/// Compute a strong ETag for a response body.
pub fn compute_etag(body: &[u8]) -> String {
  let hash = Sha256::digest(body);
  format!("\"{}\"", hex::encode(hash))
}

/// Whether `If-None-Match` already names `etag`. Bare (unquoted) tags are
/// accepted too.
pub fn matches_if_none_match(headers: &HeaderMap, etag: &str) -> bool {
  let Some(value) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) else {
    return false;
  };
  let bare = etag.trim_matches('"');
  value
    .split(',')
    .map(|t| t.trim().trim_start_matches("W/").trim_matches('"'))
    .any(|t| t == "*" || t == bare)
}
