//! Comments left on posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, post::require_text, user::UserRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: i64,
  pub post_id:    i64,
  pub author:     UserRef,
  pub text:       String,
  pub created:    DateTime<Utc>,
}

/// Input for [`BlogStore::add_comment`](crate::store::BlogStore::add_comment).
#[derive(Debug, Clone)]
pub struct NewComment {
  pub post_id:   i64,
  pub author_id: i64,
  pub text:      String,
}

impl NewComment {
  pub fn validate(&self) -> Result<()> { require_text("text", &self.text) }
}
