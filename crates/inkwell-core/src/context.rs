//! The per-request context threaded through feed and mutation calls.

use crate::{Error, Result, user::User};

/// Who is making the request. Built by the HTTP layer from credentials and
/// passed explicitly into every operation that cares.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
  user: Option<User>,
}

impl RequestContext {
  pub fn anonymous() -> Self { Self { user: None } }

  pub fn authenticated(user: User) -> Self { Self { user: Some(user) } }

  pub fn is_authenticated(&self) -> bool { self.user.is_some() }

  pub fn user(&self) -> Option<&User> { self.user.as_ref() }

  /// The requesting user, or [`Error::Unauthenticated`].
  pub fn require_user(&self) -> Result<&User> {
    self.user.as_ref().ok_or(Error::Unauthenticated)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  #[test]
  fn anonymous_has_no_user() {
    let ctx = RequestContext::anonymous();
    assert!(!ctx.is_authenticated());
    assert!(matches!(ctx.require_user(), Err(Error::Unauthenticated)));
  }

  #[test]
  fn authenticated_exposes_user() {
    let user = User { user_id: 7, username: "auth".into(), created_at: Utc::now() };
    let ctx = RequestContext::authenticated(user);
    assert!(ctx.is_authenticated());
    assert_eq!(ctx.require_user().unwrap().user_id, 7);
  }
}
