//! The feed composer: ordered, paginated views over posts.
//!
//! Every feed is ordered by `pub_date` descending with ties broken by
//! descending post id, and paginated at
//! [`POSTS_PER_PAGE`](crate::page::POSTS_PER_PAGE). Identifiers from
//! the URL (group slug, username) are resolved here; unknown identifiers are
//! reported as not-found errors.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  comment::Comment,
  context::RequestContext,
  group::Group,
  page::{Page, PageNumber, Paginator},
  post::Post,
  store::{BlogStore, IntoCore as _},
  user::User,
};

/// Which posts a feed draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
  All,
  Group(i64),
  Author(i64),
  /// Posts whose author is followed by this user.
  FollowedBy(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFeed {
  pub group: Group,
  pub page:  Page<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFeed {
  pub author:     User,
  pub post_count: u64,
  /// Whether the requesting user follows `author`; `false` when anonymous.
  pub following:  bool,
  pub page:       Page<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
  pub post:              Post,
  pub author_post_count: u64,
  pub comments:          Vec<Comment>,
}

/// Count, clamp and fetch one page of `scope`.
pub async fn paginate<S: BlogStore>(
  store: &S,
  scope: &FeedScope,
  requested: PageNumber,
) -> Result<Page<Post>> {
  let count = store.count_posts(scope).await.into_core()?;
  let paginator = Paginator::new(count);
  let number = paginator.resolve(requested);
  let (limit, offset) = paginator.window(number);
  let items = store.list_posts(scope, limit, offset).await.into_core()?;

  Ok(Page { items, number, num_pages: paginator.num_pages(), count })
}

/// The home page: every post.
pub async fn index<S: BlogStore>(store: &S, page: PageNumber) -> Result<Page<Post>> {
  paginate(store, &FeedScope::All, page).await
}

pub async fn group<S: BlogStore>(store: &S, slug: &str, page: PageNumber) -> Result<GroupFeed> {
  let group = store
    .get_group_by_slug(slug)
    .await
    .into_core()?
    .ok_or_else(|| Error::GroupNotFound(slug.to_owned()))?;
  let page = paginate(store, &FeedScope::Group(group.group_id), page).await?;
  Ok(GroupFeed { group, page })
}

pub async fn profile<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  username: &str,
  page: PageNumber,
) -> Result<ProfileFeed> {
  let author = store
    .get_user_by_username(username)
    .await
    .into_core()?
    .ok_or_else(|| Error::UserNotFound(username.to_owned()))?;

  let following = match ctx.user() {
    Some(viewer) => store.is_following(viewer.user_id, author.user_id).await.into_core()?,
    None => false,
  };

  let page = paginate(store, &FeedScope::Author(author.user_id), page).await?;
  Ok(ProfileFeed { post_count: page.count, author, following, page })
}

/// Posts by every author the requester follows. Anonymous requests fail with
/// [`Error::Unauthenticated`].
pub async fn follow<S: BlogStore>(
  store: &S,
  ctx: &RequestContext,
  page: PageNumber,
) -> Result<Page<Post>> {
  let viewer = ctx.require_user()?;
  paginate(store, &FeedScope::FollowedBy(viewer.user_id), page).await
}

pub async fn post_detail<S: BlogStore>(store: &S, post_id: i64) -> Result<PostDetail> {
  let post = store
    .get_post(post_id)
    .await
    .into_core()?
    .ok_or(Error::PostNotFound(post_id))?;
  let author_post_count = store
    .count_posts(&FeedScope::Author(post.author.user_id))
    .await
    .into_core()?;
  let comments = store.list_comments(post_id).await.into_core()?;
  Ok(PostDetail { post, author_post_count, comments })
}
