//! Posts, the unit of publication.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, group::GroupRef, user::UserRef};

/// Upload namespace for post images; stored paths start with this prefix.
pub const IMAGE_UPLOAD_DIR: &str = "posts/";

const DISPLAY_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:  i64,
  pub text:     String,
  /// Assigned by the store at creation; never changes afterwards.
  pub pub_date: DateTime<Utc>,
  pub author:   UserRef,
  pub group:    Option<GroupRef>,
  /// Path relative to the media root, e.g. `posts/cat.gif`.
  pub image:    Option<String>,
}

impl Post {
  pub fn is_authored_by(&self, user_id: i64) -> bool { self.author.user_id == user_id }
}

/// Short form: the first 15 characters of the text.
impl fmt::Display for Post {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let short: String = self.text.chars().take(DISPLAY_CHARS).collect();
    f.write_str(&short)
  }
}

/// The user-editable fields of a post, as submitted for create and edit.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
  pub text:     String,
  pub group_id: Option<i64>,
  /// A freshly stored image path. On edit, `None` keeps the current image.
  pub image:    Option<String>,
}

impl PostForm {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into(), ..Self::default() }
  }

  pub fn with_group(mut self, group_id: i64) -> Self {
    self.group_id = Some(group_id);
    self
  }

  pub fn validate(&self) -> Result<()> {
    require_text("text", &self.text)?;
    if let Some(image) = &self.image
      && !image.starts_with(IMAGE_UPLOAD_DIR)
    {
      return Err(Error::Invalid {
        field:  "image",
        reason: "must be stored under the posts/ upload directory",
      });
    }
    Ok(())
  }
}

/// Input for [`BlogStore::add_post`](crate::store::BlogStore::add_post).
#[derive(Debug, Clone)]
pub struct NewPost {
  pub author_id: i64,
  pub form:      PostForm,
}

impl NewPost {
  pub fn new(author_id: i64, form: PostForm) -> Self { Self { author_id, form } }

  pub fn validate(&self) -> Result<()> { self.form.validate() }
}

pub(crate) fn require_text(field: &'static str, text: &str) -> Result<()> {
  if text.trim().is_empty() {
    return Err(Error::Invalid { field, reason: "must not be blank" });
  }
  Ok(())
}
