//! Groups: named collections that posts may optionally belong to.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id:    i64,
  pub title:       String,
  /// Unique, URL-safe identifier used in group page paths.
  pub slug:        String,
  pub description: String,
}

/// The group fields embedded in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
  pub group_id: i64,
  pub slug:     String,
  pub title:    String,
}

impl std::fmt::Display for Group {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.title)
  }
}

/// Input for [`BlogStore::add_group`](crate::store::BlogStore::add_group).
#[derive(Debug, Clone)]
pub struct NewGroup {
  pub title:       String,
  pub slug:        String,
  pub description: String,
}

impl NewGroup {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Invalid { field: "title", reason: "must not be blank" });
    }
    if self.title.chars().count() > TITLE_MAX_CHARS {
      return Err(Error::Invalid { field: "title", reason: "too long" });
    }
    validate_slug(&self.slug)
  }
}

pub fn validate_slug(slug: &str) -> Result<()> {
  if slug.is_empty() {
    return Err(Error::Invalid { field: "slug", reason: "must not be empty" });
  }
  if !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
    return Err(Error::Invalid {
      field:  "slug",
      reason: "may contain only ASCII letters, digits, hyphens and underscores",
    });
  }
  Ok(())
}
