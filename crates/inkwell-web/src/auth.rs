//! HTTP Basic-auth extractor that resolves the requesting user.
//!
//! Missing or invalid credentials never reject the request: the handler
//! receives an anonymous [`RequestContext`] and decides for itself whether
//! that is acceptable.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, Uri, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use inkwell_core::{context::RequestContext, store::BlogStore, user::User};

use crate::{AppState, error::Error};

/// The request context of the caller, built from the `Authorization` header.
pub struct Session(pub RequestContext);

impl Session {
  /// The signed-in user, or a login redirect back to `uri`.
  pub fn require(&self, uri: &Uri) -> Result<&User, Error> {
    self.0.user().ok_or_else(|| Error::LoginRequired {
      next: uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned()),
    })
  }
}

/// Decode `Authorization: Basic …` into `(username, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())?;
  let encoded = header_val.strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded).ok()?;
  let creds   = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Check `password` against a stored argon2 PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash)
    .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Resolve the caller. Store failures are errors; bad credentials are not.
pub async fn resolve_context<S: BlogStore>(
  headers: &HeaderMap,
  store: &S,
) -> Result<RequestContext, Error> {
  let Some((username, password)) = basic_credentials(headers) else {
    return Ok(RequestContext::anonymous());
  };

  let creds = store
    .get_credentials(&username)
    .await
    .map_err(|e| Error::Core(e.into()))?;

  match creds {
    Some((user, Some(hash))) if verify_password(&password, &hash) => {
      Ok(RequestContext::authenticated(user))
    }
    _ => {
      tracing::debug!(%username, "rejected credentials, continuing anonymously");
      Ok(RequestContext::anonymous())
    }
  }
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: BlogStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve_context(&parts.headers, state.store.as_ref()).await.map(Session)
  }
}
