//! Follow toggle endpoints. Both are idempotent and land on the follow feed.

use axum::{
  extract::{Path, State},
  http::Uri,
  response::Response,
};
use inkwell_core::{actions, store::BlogStore};

use crate::{AppState, auth::Session, error::{Error, redirect}};

const FOLLOW_FEED: &str = "/follow/";

pub async fn follow<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Path(username): Path<String>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  let now = actions::follow(state.store.as_ref(), &session.0, &username).await?;
  tracing::debug!(author = %username, state = ?now, "follow");
  Ok(redirect(FOLLOW_FEED))
}

pub async fn unfollow<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Path(username): Path<String>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  let now = actions::unfollow(state.store.as_ref(), &session.0, &username).await?;
  tracing::debug!(author = %username, state = ?now, "unfollow");
  Ok(redirect(FOLLOW_FEED))
}
