//! HTTP layer for Inkwell.
//!
//! Exposes an axum [`Router`] serving the feeds as JSON and accepting post,
//! comment and follow mutations, backed by any [`BlogStore`].

pub mod auth;
pub mod cache;
pub mod error;
pub mod etag;
pub mod handlers;
pub mod media;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  middleware,
  routing::{get, post},
};
use inkwell_core::store::BlogStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use cache::PageCache;
use handlers::{comments, feeds, follows, posts};
use media::MediaStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `INKWELL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Uploaded images are written under `<media_root>/posts/`.
  pub media_root:           PathBuf,
  pub index_cache_ttl_secs: u64,
  pub max_upload_bytes:     usize,
}

impl ServerConfig {
  pub fn index_cache_ttl(&self) -> Duration { Duration::from_secs(self.index_cache_ttl_secs) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: BlogStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  /// Fronts the index page only.
  pub cache:  Arc<PageCache>,
  pub media:  Arc<MediaStore>,
}

impl<S: BlogStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      cache:  Arc::new(PageCache::new(config.index_cache_ttl())),
      media:  Arc::new(MediaStore::new(config.media_root.clone())),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the blog.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: BlogStore + Clone + 'static,
{
  let index = get(feeds::index::<S>).layer(middleware::from_fn_with_state(
    state.cache.clone(),
    cache::page_cache_layer,
  ));

  Router::new()
    .route("/",                              index)
    .route("/group/{slug}/",                 get(feeds::group::<S>))
    .route("/profile/{username}/",           get(feeds::profile::<S>))
    .route("/profile/{username}/follow/",    post(follows::follow::<S>))
    .route("/profile/{username}/unfollow/",  post(follows::unfollow::<S>))
    .route("/follow/",                       get(feeds::follow_index::<S>))
    .route("/create/",                       get(posts::create_form::<S>).post(posts::create::<S>))
    .route("/posts/{post_id}/",              get(feeds::post_detail::<S>))
    .route("/posts/{post_id}/edit/",         get(posts::edit_form::<S>).post(posts::edit::<S>))
    .route("/posts/{post_id}/delete/",       post(posts::delete::<S>))
    .route("/posts/{post_id}/comment/",      post(comments::add::<S>))
    .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use inkwell_core::{
    feed::FeedScope,
    group::{Group, NewGroup},
    post::{NewPost, Post, PostForm},
    user::{NewUser, User},
  };
  use inkwell_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::Value;
  use tempfile::TempDir;
  use tower::ServiceExt as _;

  const PASSWORD: &str = "secret";
  const BOUNDARY: &str = "inkwell-test-boundary";
  const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
  ];

  struct Fixture {
    state:  AppState<SqliteStore>,
    author: User,
    other:  User,
    group:  Group,
    _media: TempDir,
  }

  async fn add_user(store: &SqliteStore, username: &str) -> User {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(PASSWORD.as_bytes(), &salt)
      .unwrap()
      .to_string();
    store
      .add_user(NewUser { username: username.into(), password_hash: Some(hash) })
      .await
      .unwrap()
  }

  async fn fixture() -> Fixture {
    let media = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let author = add_user(&store, "auth").await;
    let other = add_user(&store, "other").await;
    let group = store
      .add_group(NewGroup {
        title:       "Test group".into(),
        slug:        "test-slug".into(),
        description: "Test description".into(),
      })
      .await
      .unwrap();

    let state = AppState::new(store, ServerConfig {
      host:                 "127.0.0.1".to_string(),
      port:                 8000,
      store_path:           PathBuf::from(":memory:"),
      media_root:           media.path().to_path_buf(),
      index_cache_ttl_secs: 20,
      max_upload_bytes:     5 * 1024 * 1024,
    });
    Fixture { state, author, other, group, _media: media }
  }

  async fn add_post(state: &AppState<SqliteStore>, author: &User, text: &str) -> Post {
    state
      .store
      .add_post(NewPost::new(author.user_id, PostForm::new(text)))
      .await
      .unwrap()
  }

  fn auth_header(user: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{PASSWORD}")))
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    headers: Vec<(header::HeaderName, String)>,
    body: Body,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn get_as(state: &AppState<SqliteStore>, uri: &str, user: Option<&str>) -> Response {
    let headers = user.map(|u| vec![(header::AUTHORIZATION, auth_header(u))]).unwrap_or_default();
    send(state, "GET", uri, headers, Body::empty()).await
  }

  async fn post_form(
    state: &AppState<SqliteStore>,
    uri: &str,
    user: Option<&str>,
    form: &str,
  ) -> Response {
    let mut headers = vec![(
      header::CONTENT_TYPE,
      "application/x-www-form-urlencoded".to_string(),
    )];
    if let Some(u) = user {
      headers.push((header::AUTHORIZATION, auth_header(u)));
    }
    send(state, "POST", uri, headers, Body::from(form.to_string())).await
  }

  /// `(name, filename, content)` parts encoded as `multipart/form-data`.
  fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
      body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
      match filename {
        Some(f) => body.extend_from_slice(
          format!(
            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
             Content-Type: image/gif\r\n\r\n"
          )
          .as_bytes(),
        ),
        None => body.extend_from_slice(
          format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        ),
      }
      body.extend_from_slice(content);
      body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
  }

  async fn post_multipart(
    state: &AppState<SqliteStore>,
    uri: &str,
    user: Option<&str>,
    parts: &[(&str, Option<&str>, &[u8])],
  ) -> Response {
    let mut headers = vec![(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )];
    if let Some(u) = user {
      headers.push((header::AUTHORIZATION, auth_header(u)));
    }
    send(state, "POST", uri, headers, multipart_body(parts)).await
  }

  fn location(resp: &Response) -> &str {
    resp.headers().get(header::LOCATION).unwrap().to_str().unwrap()
  }

  async fn json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn post_count(state: &AppState<SqliteStore>) -> u64 {
    state.store.count_posts(&FeedScope::All).await.unwrap()
  }

  // ── Public pages ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn public_pages_are_reachable_anonymously() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "Test post").await;

    for uri in [
      "/".to_string(),
      "/group/test-slug/".to_string(),
      "/profile/auth/".to_string(),
      format!("/posts/{}/", p.post_id),
    ] {
      let resp = get_as(&f.state, &uri, None).await;
      assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    }
  }

  #[tokio::test]
  async fn unknown_pages_return_404() {
    let f = fixture().await;
    for uri in ["/unexisting_page/", "/group/nope/", "/profile/ghost/", "/posts/999/"] {
      let resp = get_as(&f.state, uri, Some("auth")).await;
      assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
  }

  #[tokio::test]
  async fn index_paginates_ten_per_page() {
    let f = fixture().await;
    for i in 0..13 {
      add_post(&f.state, &f.author, &format!("post {i}")).await;
    }

    let first = json(get_as(&f.state, "/", None).await).await;
    assert_eq!(first["items"].as_array().unwrap().len(), 10);
    assert_eq!(first["items"][0]["text"], "post 12");
    assert_eq!(first["num_pages"], 2);

    let second = json(get_as(&f.state, "/?page=2", None).await).await;
    assert_eq!(second["items"].as_array().unwrap().len(), 3);

    let clamped = json(get_as(&f.state, "/?page=50", None).await).await;
    assert_eq!(clamped["number"], 2);
    let garbage = json(get_as(&f.state, "/?page=abc", None).await).await;
    assert_eq!(garbage["number"], 1);
  }

  #[tokio::test]
  async fn index_is_served_from_cache_until_cleared() {
    let f = fixture().await;
    add_post(&f.state, &f.author, "first").await;

    let before = json(get_as(&f.state, "/", None).await).await;
    add_post(&f.state, &f.author, "second").await;

    let cached = json(get_as(&f.state, "/", None).await).await;
    assert_eq!(cached, before);

    f.state.cache.clear();
    let fresh = json(get_as(&f.state, "/", None).await).await;
    assert_eq!(fresh["items"][0]["text"], "second");
  }

  #[tokio::test]
  async fn feed_etag_supports_conditional_get() {
    let f = fixture().await;
    add_post(&f.state, &f.author, "post").await;

    let resp = get_as(&f.state, "/group/test-slug/", None).await;
    let etag = resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_string();

    let resp = send(
      &f.state,
      "GET",
      "/group/test-slug/",
      vec![(header::IF_NONE_MATCH, etag)],
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
  }

  #[tokio::test]
  async fn edited_post_invalidates_feed_etag() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "original text").await;

    let resp = get_as(&f.state, "/profile/auth/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let etag = resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_string();

    f.state.store.update_post(p.post_id, PostForm::new("edited text")).await.unwrap();

    let resp = send(
      &f.state,
      "GET",
      "/profile/auth/",
      vec![(header::IF_NONE_MATCH, etag.clone())],
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_ne!(resp.headers().get(header::ETAG).unwrap().to_str().unwrap(), etag);
    assert_eq!(json(resp).await["items"][0]["text"], "edited text");
  }

  #[tokio::test]
  async fn oversized_index_is_served_but_not_cached() {
    let f = fixture().await;
    add_post(&f.state, &f.author, &"x".repeat(1_100_000)).await;

    let resp = get_as(&f.state, "/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(f.state.cache.is_empty());
    assert_eq!(json(resp).await["items"][0]["text"].as_str().unwrap().len(), 1_100_000);

    let resp = get_as(&f.state, "/profile/auth/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Login redirects ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn anonymous_is_redirected_to_login() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "Test post").await;

    let resp = get_as(&f.state, "/create/", None).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");

    let edit = format!("/posts/{}/edit/", p.post_id);
    let resp = get_as(&f.state, &edit, None).await;
    assert_eq!(location(&resp), format!("/auth/login/?next={edit}"));

    let resp = get_as(&f.state, "/follow/", None).await;
    assert_eq!(location(&resp), "/auth/login/?next=/follow/");

    let resp = get_as(&f.state, "/follow/", Some("nobody")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
  }

  #[tokio::test]
  async fn anonymous_mutations_redirect_and_change_nothing() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "original").await;

    let resp = post_multipart(&f.state, "/create/", None, &[("text", None, b"sneaky")]).await;
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
    assert_eq!(post_count(&f.state).await, 1);

    let comment = format!("/posts/{}/comment/", p.post_id);
    let resp = post_form(&f.state, &comment, None, "text=hello").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/"));
    assert!(f.state.store.list_comments(p.post_id).await.unwrap().is_empty());

    let resp = post_form(&f.state, "/profile/auth/follow/", None, "").await;
    assert!(location(&resp).starts_with("/auth/login/"));
  }

  // ── Posts ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_post_with_group_and_image() {
    let f = fixture().await;
    let group_id = f.group.group_id.to_string();

    let resp = post_multipart(&f.state, "/create/", Some("auth"), &[
      ("text", None, "Test text".as_bytes()),
      ("group", None, group_id.as_bytes()),
      ("image", Some("small.gif"), SMALL_GIF),
    ])
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/auth/");

    let posts = f.state.store.list_posts(&FeedScope::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    let created = &posts[0];
    assert_eq!(created.text, "Test text");
    assert_eq!(created.group.as_ref().map(|g| g.title.as_str()), Some("Test group"));
    assert_eq!(created.image.as_deref(), Some("posts/small.gif"));
    assert!(f.state.media.resolve("posts/small.gif").exists());

    let group_feed = json(get_as(&f.state, "/group/test-slug/", None).await).await;
    assert_eq!(group_feed["page"]["items"][0]["post_id"], created.post_id);
  }

  #[tokio::test]
  async fn create_post_rejects_blank_text_and_unknown_group() {
    let f = fixture().await;

    let resp = post_multipart(&f.state, "/create/", Some("auth"), &[("text", None, b"   ")]).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(resp).await["field"], "text");

    let resp = post_multipart(&f.state, "/create/", Some("auth"), &[
      ("text", None, b"fine"),
      ("group", None, b"9999"),
      ("image", Some("small.gif"), SMALL_GIF),
    ])
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(resp).await["field"], "group");

    assert_eq!(post_count(&f.state).await, 0);
    assert!(!f.state.media.resolve("posts/small.gif").exists());
  }

  #[tokio::test]
  async fn author_edits_post() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "before").await;
    let group_id = f.group.group_id.to_string();
    let uri = format!("/posts/{}/edit/", p.post_id);

    let form = json(get_as(&f.state, &uri, Some("auth")).await).await;
    assert_eq!(form["post"]["text"], "before");
    assert_eq!(form["groups"][0]["slug"], "test-slug");

    let resp = post_multipart(&f.state, &uri, Some("auth"), &[
      ("text", None, b"after"),
      ("group", None, group_id.as_bytes()),
    ])
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", p.post_id));

    let edited = f.state.store.get_post(p.post_id).await.unwrap().unwrap();
    assert_eq!(edited.text, "after");
    assert_eq!(edited.pub_date, p.pub_date);
    assert_eq!(edited.group.map(|g| g.group_id), Some(f.group.group_id));
  }

  #[tokio::test]
  async fn non_author_cannot_edit_or_delete() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "original").await;
    let uri = format!("/posts/{}/edit/", p.post_id);

    let resp = get_as(&f.state, &uri, Some("other")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = post_multipart(&f.state, &uri, Some("other"), &[("text", None, b"hacked")]).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp =
      post_form(&f.state, &format!("/posts/{}/delete/", p.post_id), Some("other"), "").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let unchanged = f.state.store.get_post(p.post_id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original");
  }

  #[tokio::test]
  async fn author_deletes_post() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "doomed").await;

    let resp =
      post_form(&f.state, &format!("/posts/{}/delete/", p.post_id), Some("auth"), "").await;
    assert_eq!(location(&resp), "/profile/auth/");
    assert!(f.state.store.get_post(p.post_id).await.unwrap().is_none());
  }

  // ── Comments ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn signed_in_user_comments() {
    let f = fixture().await;
    let p = add_post(&f.state, &f.author, "Test post").await;
    let uri = format!("/posts/{}/comment/", p.post_id);

    let resp = post_form(&f.state, &uri, Some("other"), "text=nice+post").await;
    assert_eq!(location(&resp), format!("/posts/{}/", p.post_id));

    let detail = json(get_as(&f.state, &format!("/posts/{}/", p.post_id), None).await).await;
    assert_eq!(detail["comments"][0]["text"], "nice post");
    assert_eq!(detail["comments"][0]["author"]["username"], "other");

    let resp = post_form(&f.state, &uri, Some("other"), "text=").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(f.state.store.list_comments(p.post_id).await.unwrap().len(), 1);
  }

  // ── Follows ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn follow_and_unfollow_through_http() {
    let f = fixture().await;
    add_post(&f.state, &f.author, "followed content").await;
    add_post(&f.state, &f.other, "own content").await;

    let resp = post_form(&f.state, "/profile/auth/follow/", Some("other"), "").await;
    assert_eq!(location(&resp), "/follow/");
    post_form(&f.state, "/profile/auth/follow/", Some("other"), "").await;
    assert_eq!(f.state.store.list_following(f.other.user_id).await.unwrap().len(), 1);

    let feed = json(get_as(&f.state, "/follow/", Some("other")).await).await;
    let items = feed["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["text"], "followed content");

    let profile = json(get_as(&f.state, "/profile/auth/", Some("other")).await).await;
    assert_eq!(profile["following"], true);

    // The author did not follow anyone back.
    let feed = json(get_as(&f.state, "/follow/", Some("auth")).await).await;
    assert!(feed["items"].as_array().unwrap().is_empty());

    post_form(&f.state, "/profile/auth/unfollow/", Some("other"), "").await;
    assert!(f.state.store.list_following(f.other.user_id).await.unwrap().is_empty());
    let feed = json(get_as(&f.state, "/follow/", Some("other")).await).await;
    assert!(feed["items"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn following_unknown_user_is_404() {
    let f = fixture().await;
    let resp = post_form(&f.state, "/profile/ghost/follow/", Some("auth"), "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
