//! TTL page cache for rendered responses.
//!
//! Entries are keyed by request path and query and expire after a fixed TTL.
//! Mutations never invalidate the cache, so a new post can take up to one TTL
//! to appear on a cached page.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard},
  time::{Duration, Instant},
};

use axum::{
  body::Body,
  extract::{Request, State},
  http::{HeaderMap, Method, StatusCode},
  middleware::Next,
  response::{IntoResponse, Response},
};
use bytes::Bytes;

/// Largest response body the cache will hold.
const MAX_CACHED_BODY: usize = 1024 * 1024;

#[derive(Clone)]
pub struct CachedResponse {
  pub status:  StatusCode,
  pub headers: HeaderMap,
  pub body:    Bytes,
}

impl CachedResponse {
  fn to_response(&self) -> Response {
    let mut res = Response::new(Body::from(self.body.clone()));
    *res.status_mut() = self.status;
    *res.headers_mut() = self.headers.clone();
    res
  }
}

struct Entry {
  stored_at: Instant,
  response:  CachedResponse,
}

/// Opaque key/TTL store.
pub struct PageCache {
  ttl:     Duration,
  entries: Mutex<HashMap<String, Entry>>,
}

impl PageCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, entries: Mutex::new(HashMap::new()) }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
    // A poisoned map only ever holds complete entries.
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// The cached response for `key`, unless it has expired.
  pub fn get(&self, key: &str) -> Option<CachedResponse> {
    let mut entries = self.lock();
    match entries.get(key) {
      Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.response.clone()),
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  pub fn set(&self, key: String, response: CachedResponse) {
    let mut entries = self.lock();
    let ttl = self.ttl;
    entries.retain(|_, e| e.stored_at.elapsed() < ttl);
    entries.insert(key, Entry { stored_at: Instant::now(), response });
  }

  pub fn clear(&self) { self.lock().clear(); }

  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn cache_key(request: &Request) -> String {
  let uri = request.uri();
  match uri.query() {
    Some(q) => format!("{}?{q}", uri.path()),
    None => uri.path().to_owned(),
  }
}

/// Serve `GET` responses from the cache, storing successful ones on a miss.
/// Bodies over [`MAX_CACHED_BODY`] are passed through without being stored.
pub async fn page_cache_layer(
  State(cache): State<Arc<PageCache>>,
  request: Request,
  next: Next,
) -> Response {
  if request.method() != Method::GET {
    return next.run(request).await;
  }

  let key = cache_key(&request);
  if let Some(cached) = cache.get(&key) {
    tracing::debug!(%key, outcome = "hit", "page cache");
    return cached.to_response();
  }
  tracing::debug!(%key, outcome = "miss", "page cache");

  let response = next.run(request).await;
  if response.status() != StatusCode::OK {
    return response;
  }

  let (parts, body) = response.into_parts();
  let bytes = match axum::body::to_bytes(body, usize::MAX).await {
    Ok(b) => b,
    Err(e) => {
      tracing::error!(%key, error = %e, "failed to read response body");
      return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
  };

  if bytes.len() <= MAX_CACHED_BODY {
    cache.set(key, CachedResponse {
      status:  parts.status,
      headers: parts.headers.clone(),
      body:    bytes.clone(),
    });
  } else {
    tracing::debug!(%key, len = bytes.len(), "response too large to cache");
  }
  Response::from_parts(parts, Body::from(bytes))
}
