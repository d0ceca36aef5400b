//! Error types for `inkwell-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A field failed form-level validation.
  #[error("invalid {field}: {reason}")]
  Invalid {
    field:  &'static str,
    reason: &'static str,
  },

  #[error("username {0:?} is already taken")]
  DuplicateUsername(String),

  #[error("group slug {0:?} is already taken")]
  DuplicateSlug(String),

  #[error("user {user_id} already follows {author_id}")]
  AlreadyFollowing { user_id: i64, author_id: i64 },

  #[error("user not found: {0}")]
  UserNotFound(String),

  #[error("group not found: {0}")]
  GroupNotFound(String),

  #[error("post not found: {0}")]
  PostNotFound(i64),

  #[error("authentication required")]
  Unauthenticated,

  #[error("user {user_id} is not the author of post {post_id}")]
  NotAuthor { user_id: i64, post_id: i64 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Errors a caller should surface as form-level field errors.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::Invalid { .. }
        | Self::DuplicateUsername(_)
        | Self::DuplicateSlug(_)
        | Self::AlreadyFollowing { .. }
    )
  }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::UserNotFound(_) | Self::GroupNotFound(_) | Self::PostNotFound(_)
    )
  }

  /// The form field a validation error belongs to, if any.
  pub fn field(&self) -> Option<&'static str> {
    match self {
      Self::Invalid { field, .. } => Some(*field),
      Self::DuplicateUsername(_) => Some("username"),
      Self::DuplicateSlug(_) => Some("slug"),
      Self::AlreadyFollowing { .. } => Some("author"),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification() {
    assert!(Error::DuplicateSlug("news".into()).is_validation());
    assert!(Error::AlreadyFollowing { user_id: 1, author_id: 2 }.is_validation());
    assert!(!Error::PostNotFound(3).is_validation());
    assert!(Error::PostNotFound(3).is_not_found());
    assert!(!Error::Unauthenticated.is_not_found());
  }

  #[test]
  fn field_names() {
    let e = Error::Invalid { field: "text", reason: "must not be blank" };
    assert_eq!(e.field(), Some("text"));
    assert_eq!(Error::DuplicateSlug("x".into()).field(), Some("slug"));
    assert_eq!(Error::Unauthenticated.field(), None);
  }
}
