//! Read-only feed endpoints. Each returns one page as JSON with an ETag.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, Uri, header},
  response::{IntoResponse, Response},
};
use inkwell_core::{feed, page::PageNumber, store::BlogStore};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::Session,
  error::Error,
  etag::{compute_etag, matches_if_none_match},
};

/// `?page=`; anything that is not an integer means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub page: Option<String>,
}

impl PageQuery {
  pub fn number(&self) -> PageNumber { PageNumber::parse(self.page.as_deref()) }
}

/// Serialise `body` once and tag it with the hash of those bytes.
fn feed_response<T: Serialize>(headers: &HeaderMap, body: &T) -> Result<Response, Error> {
  let bytes = serde_json::to_vec(body)?;
  let etag = compute_etag(&bytes);
  if matches_if_none_match(headers, &etag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }
  let headers = [(header::CONTENT_TYPE, "application/json"), (header::ETAG, etag.as_str())];
  Ok((headers, bytes).into_response())
}

pub async fn index<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<PageQuery>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  let page = feed::index(state.store.as_ref(), query.number()).await?;
  feed_response(&headers, &page)
}

pub async fn group<S>(
  State(state): State<AppState<S>>,
  Path(slug): Path<String>,
  Query(query): Query<PageQuery>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  let view = feed::group(state.store.as_ref(), &slug, query.number()).await?;
  feed_response(&headers, &view)
}

pub async fn profile<S>(
  State(state): State<AppState<S>>,
  Session(ctx): Session,
  Path(username): Path<String>,
  Query(query): Query<PageQuery>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  let view = feed::profile(state.store.as_ref(), &ctx, &username, query.number()).await?;
  feed_response(&headers, &view)
}

/// Posts by followed authors. Anonymous callers are sent to the login page.
pub async fn follow_index<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Query(query): Query<PageQuery>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  let page = feed::follow(state.store.as_ref(), &session.0, query.number()).await?;
  feed_response(&headers, &page)
}

pub async fn post_detail<S>(
  State(state): State<AppState<S>>,
  Path(post_id): Path<i64>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  let detail = feed::post_detail(state.store.as_ref(), post_id).await?;
  Ok(Json(detail).into_response())
}
