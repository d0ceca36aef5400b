//! The `BlogStore` trait: the storage contract shared by every backend.
//!
//! The trait is implemented by storage backends (e.g. `inkwell-store-sqlite`).
//! The feed composer, the mutation actions and the HTTP layer depend on this
//! abstraction, not on any concrete backend.
//!
//! Every method is atomic: a failed call leaves the store unchanged.

use std::future::Future;

use crate::{
  comment::{Comment, NewComment},
  feed::FeedScope,
  follow::Follow,
  group::{Group, NewGroup},
  post::{NewPost, Post, PostForm},
  user::{NewUser, User},
};

/// Abstraction over an Inkwell store backend.
///
/// Backend errors must convert into [`crate::Error`] so generic callers can
/// tell validation and not-found failures apart from storage faults.
pub trait BlogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Fails with `DuplicateUsername` if the name is taken.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// The user together with their stored password hash, if any.
  fn get_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<(User, Option<String>)>, Self::Error>> + Send + 'a;

  /// Delete a user together with their posts (and those posts' comments),
  /// their comments and every follow edge they take part in.
  /// Returns `false` if the user did not exist.
  fn delete_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Fails with `DuplicateSlug` if the slug is taken.
  fn add_group(
    &self,
    input: NewGroup,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    group_id: i64,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  fn get_group_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + 'a;

  /// All groups, ordered by title.
  fn list_groups(&self) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + '_;

  /// Delete a group. Its posts survive with their group reference cleared.
  /// Returns `false` if the group did not exist.
  fn delete_group(
    &self,
    group_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Persist a new post. `pub_date` is set by the store.
  fn add_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    post_id: i64,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Replace a post's text and group; the image is replaced only when the
  /// form carries one. `pub_date` and the author never change.
  fn update_post(
    &self,
    post_id: i64,
    form: PostForm,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  /// Delete a post and its comments. Returns `false` if it did not exist.
  fn delete_post(
    &self,
    post_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Number of posts visible in `scope`.
  fn count_posts<'a>(
    &'a self,
    scope: &'a FeedScope,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Posts in `scope`, newest first (ties broken by descending id).
  fn list_posts<'a>(
    &'a self,
    scope: &'a FeedScope,
    limit: u64,
    offset: u64,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;

  // ── Comments ──────────────────────────────────────────────────────────

  fn add_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Comments on a post, newest first.
  fn list_comments(
    &self,
    post_id: i64,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  // ── Follows ───────────────────────────────────────────────────────────

  /// Fails with `AlreadyFollowing` if the edge exists.
  fn add_follow(
    &self,
    user_id: i64,
    author_id: i64,
  ) -> impl Future<Output = Result<Follow, Self::Error>> + Send + '_;

  /// Returns whether an edge was removed.
  fn remove_follow(
    &self,
    user_id: i64,
    author_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_following(
    &self,
    user_id: i64,
    author_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Edges where `user_id` is the follower, oldest first.
  fn list_following(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Follow>, Self::Error>> + Send + '_;
}

/// Lift a backend result into the core error taxonomy.
pub(crate) trait IntoCore<T> {
  fn into_core(self) -> crate::Result<T>;
}

impl<T, E: Into<crate::Error>> IntoCore<T> for Result<T, E> {
  fn into_core(self) -> crate::Result<T> { self.map_err(Into::into) }
}
