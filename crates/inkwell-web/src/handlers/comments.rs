use axum::{
  Form,
  extract::{Path, State, rejection::FormRejection},
  http::Uri,
  response::Response,
};
use inkwell_core::{actions, store::BlogStore};
use serde::Deserialize;

use crate::{AppState, auth::Session, error::Error, handlers::to_post};

#[derive(Debug, Deserialize)]
pub struct CommentForm {
  #[serde(default)]
  pub text: String,
}

/// `POST /posts/{id}/comment/`, then back to the post.
pub async fn add<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Path(post_id): Path<i64>,
  form: Result<Form<CommentForm>, FormRejection>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  let Form(form) = form.map_err(|e| Error::BadRequest(e.body_text()))?;
  let comment = actions::add_comment(state.store.as_ref(), &session.0, post_id, form.text).await?;
  tracing::info!(post_id, comment_id = comment.comment_id, "comment added");
  Ok(to_post(post_id))
}
