//! Mutations performed on behalf of a requester.
//!
//! Each action takes the [`RequestContext`] explicitly. Anonymous requests
//! fail with [`Error::Unauthenticated`] before anything is read or written.

use crate::{
  Error, Result,
  comment::{Comment, NewComment},
  context::RequestContext,
  follow::{FollowState, Transition},
  post::{NewPost, Post, PostForm},
  store::{BlogStore, IntoCore as _},
  user::User,
};

/// Publish a post authored by the requester.
pub async fn create_post<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  form: PostForm,
) -> Result<Post> {
  let author = ctx.require_user()?;
  form.validate()?;
  store.add_post(NewPost::new(author.user_id, form)).await.into_core()
}

/// Edit a post. Only its author may do so; anyone else gets
/// [`Error::NotAuthor`] and the post is left untouched.
pub async fn edit_post<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  post_id: i64,
  form: PostForm,
) -> Result<Post> {
  require_author(store, ctx, post_id).await?;
  form.validate()?;
  store.update_post(post_id, form).await.into_core()
}

/// Delete a post (and its comments). Author only. Returns the deleted post.
pub async fn delete_post<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  post_id: i64,
) -> Result<Post> {
  let post = require_author(store, ctx, post_id).await?;
  if !store.delete_post(post_id).await.into_core()? {
    return Err(Error::PostNotFound(post_id));
  }
  Ok(post)
}

pub async fn add_comment<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  post_id: i64,
  text: String,
) -> Result<Comment> {
  let author = ctx.require_user()?;
  let input = NewComment { post_id, author_id: author.user_id, text };
  input.validate()?;
  store.add_comment(input).await.into_core()
}

/// Follow `username`. Following an author twice leaves a single edge.
pub async fn follow<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  username: &str,
) -> Result<FollowState> {
  toggle(store, ctx, username, Transition::Follow).await
}

/// Stop following `username`. Unfollowing when not following is a no-op.
pub async fn unfollow<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  username: &str,
) -> Result<FollowState> {
  toggle(store, ctx, username, Transition::Unfollow).await
}

async fn toggle<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  username: &str,
  transition: Transition,
) -> Result<FollowState> {
  let user = ctx.require_user()?;
  let author = user_by_username(store, username).await?;

  let current = FollowState::from_edge(
    store.is_following(user.user_id, author.user_id).await.into_core()?,
  );
  let (next, changed) = current.apply(transition);
  if !changed {
    return Ok(next);
  }

  match transition {
    Transition::Follow => {
      match store.add_follow(user.user_id, author.user_id).await.into_core() {
        // Lost a race with a concurrent follow; the edge exists either way.
        Ok(_) | Err(Error::AlreadyFollowing { .. }) => {}
        Err(e) => return Err(e),
      }
    }
    Transition::Unfollow => {
      store.remove_follow(user.user_id, author.user_id).await.into_core()?;
    }
  }
  Ok(next)
}

async fn user_by_username<S: BlogStore>(store: &S, username: &str) -> Result<User> {
  store
    .get_user_by_username(username)
    .await
    .into_core()?
    .ok_or_else(|| Error::UserNotFound(username.to_owned()))
}

/// Load a post the requester is allowed to change. Callers that must do work
/// before editing (e.g. storing an upload) check this first.
pub async fn require_author<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  post_id: i64,
) -> Result<Post> {
  let user = ctx.require_user()?;
  let post = store
    .get_post(post_id)
    .await
    .into_core()?
    .ok_or(Error::PostNotFound(post_id))?;
  if !post.is_authored_by(user.user_id) {
    return Err(Error::NotAuthor { user_id: user.user_id, post_id });
  }
  Ok(post)
}
