pub mod comments;
pub mod feeds;
pub mod follows;
pub mod posts;

use axum::response::Response;

use crate::error::redirect;

pub(super) fn to_profile(username: &str) -> Response {
  redirect(&format!("/profile/{username}/"))
}

pub(super) fn to_post(post_id: i64) -> Response {
  redirect(&format!("/posts/{post_id}/"))
}
