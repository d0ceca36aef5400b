//! Users: the authors, commenters and followers.
//!
//! Accounts themselves are managed outside the platform; the store keeps just
//! enough of them to own content and to verify credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const USERNAME_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    i64,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn to_ref(&self) -> UserRef {
    UserRef {
      user_id:  self.user_id,
      username: self.username.clone(),
    }
  }
}

/// The author fields embedded in posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
  pub user_id:  i64,
  pub username: String,
}

/// Input for [`BlogStore::add_user`](crate::store::BlogStore::add_user).
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  /// Argon2 PHC string; `None` for accounts that cannot log in.
  pub password_hash: Option<String>,
}

impl NewUser {
  pub fn new(username: impl Into<String>) -> Self {
    Self { username: username.into(), password_hash: None }
  }

  pub fn validate(&self) -> Result<()> { validate_username(&self.username) }
}

/// Letters, digits and `@ . + - _`, at most [`USERNAME_MAX_CHARS`].
pub fn validate_username(username: &str) -> Result<()> {
  if username.is_empty() {
    return Err(Error::Invalid { field: "username", reason: "must not be empty" });
  }
  if username.chars().count() > USERNAME_MAX_CHARS {
    return Err(Error::Invalid { field: "username", reason: "too long" });
  }
  let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
  if !username.chars().all(allowed) {
    return Err(Error::Invalid {
      field:  "username",
      reason: "may contain only letters, digits and @/./+/-/_",
    });
  }
  Ok(())
}
