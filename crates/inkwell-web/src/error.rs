//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Where anonymous users are sent to sign in.
pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] inkwell_core::Error),

  /// A protected endpoint was hit anonymously; `next` is the original
  /// path and query.
  #[error("login required for {next}")]
  LoginRequired { next: String },

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("media error: {0}")]
  Media(#[from] std::io::Error),

  #[error("failed to encode response: {0}")]
  Encode(#[from] serde_json::Error),
}

/// `/auth/login/?next=<next>`, keeping `/` readable in the parameter.
pub fn login_redirect_url(next: &str) -> String {
  let encoded = urlencoding::encode(next).replace("%2F", "/");
  format!("{LOGIN_URL}?next={encoded}")
}

pub(crate) fn redirect(location: &str) -> Response {
  (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

fn field_error(status: StatusCode, message: String, field: Option<&str>) -> Response {
  (status, Json(json!({ "error": message, "field": field }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    use inkwell_core::Error as Core;

    match self {
      Error::LoginRequired { next } => redirect(&login_redirect_url(&next)),
      Error::Core(Core::Unauthenticated) => redirect(LOGIN_URL),
      Error::Core(e) if e.is_validation() => {
        field_error(StatusCode::BAD_REQUEST, e.to_string(), e.field())
      }
      Error::Core(e) if e.is_not_found() => {
        field_error(StatusCode::NOT_FOUND, e.to_string(), None)
      }
      Error::Core(e @ Core::NotAuthor { .. }) => {
        field_error(StatusCode::FORBIDDEN, e.to_string(), None)
      }
      Error::BadRequest(msg) => field_error(StatusCode::BAD_REQUEST, msg, None),
      Error::Core(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
      }
      Error::Media(e) => {
        tracing::error!(error = %e, "media storage failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
      }
      Error::Encode(e) => {
        tracing::error!(error = %e, "response encoding failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
