//! [`SqliteStore`]: the SQLite implementation of [`BlogStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use inkwell_core::{
  Error as CoreError,
  comment::{Comment, NewComment},
  feed::FeedScope,
  follow::Follow,
  group::{Group, NewGroup},
  post::{NewPost, Post, PostForm},
  store::BlogStore,
  user::{NewUser, User, UserRef},
};

use crate::{
  Result,
  encode::{
    COMMENT_SELECT, POST_SELECT, RawComment, RawFollow, RawPost, RawUser, encode_dt,
    group_from_row, now,
  },
  schema::SCHEMA,
};

/// Outcome of a closure that may hit a domain error (missing referent,
/// uniqueness violation) after the database call itself succeeded.
type Checked<T> = std::result::Result<T, CoreError>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Inkwell store backed by a single SQLite file.
///
/// The inner connection is reference-counted, so clones share it.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn row_exists(
  conn: &rusqlite::Connection,
  sql: &str,
  id: i64,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

fn username_of(conn: &rusqlite::Connection, user_id: i64) -> rusqlite::Result<Option<String>> {
  conn
    .query_row("SELECT username FROM users WHERE user_id = ?1", [user_id], |r| r.get(0))
    .optional()
}

fn select_post(conn: &rusqlite::Connection, post_id: i64) -> rusqlite::Result<Option<RawPost>> {
  conn
    .query_row(
      &format!("{POST_SELECT} WHERE p.post_id = ?1"),
      [post_id],
      RawPost::from_row,
    )
    .optional()
}

/// `WHERE` clause and its single bound key for a feed scope.
fn scope_filter(scope: &FeedScope) -> (&'static str, Option<i64>) {
  match *scope {
    FeedScope::All => ("", None),
    FeedScope::Group(id) => ("WHERE p.group_id = ?1", Some(id)),
    FeedScope::Author(id) => ("WHERE p.author_id = ?1", Some(id)),
    FeedScope::FollowedBy(id) => (
      "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ?1)",
      Some(id),
    ),
  }
}

fn to_sql_int(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── BlogStore impl ──────────────────────────────────────────────────────────

impl BlogStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    input.validate()?;

    let created_at = now();
    let at_str     = encode_dt(created_at);
    let NewUser { username, password_hash } = input;
    let name       = username.clone();

    let outcome: Checked<i64> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![name, password_hash, at_str],
        );
        match res {
          Ok(_) => Ok(Ok(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Err(CoreError::DuplicateUsername(name))),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(User { user_id: outcome?, username, created_at })
  }

  async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, created_at FROM users WHERE user_id = ?1",
              [user_id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
    Ok(self.get_credentials(username).await?.map(|(user, _)| user))
  }

  async fn get_credentials(&self, username: &str) -> Result<Option<(User, Option<String>)>> {
    let name = username.to_owned();

    let raw: Option<(RawUser, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, created_at, password_hash
               FROM users WHERE username = ?1",
              [name],
              |row| Ok((RawUser::from_row(row)?, row.get(3)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(user, hash)| user.into_user().map(|u| (u, hash)))
      .transpose()
  }

  async fn delete_user(&self, user_id: i64) -> Result<bool> {
    let (existed, posts, comments, follows) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut comments = tx.execute(
          "DELETE FROM comments
           WHERE post_id IN (SELECT post_id FROM posts WHERE author_id = ?1)",
          [user_id],
        )?;
        comments += tx.execute("DELETE FROM comments WHERE author_id = ?1", [user_id])?;
        let posts = tx.execute("DELETE FROM posts WHERE author_id = ?1", [user_id])?;
        let follows = tx.execute(
          "DELETE FROM follows WHERE user_id = ?1 OR author_id = ?1",
          [user_id],
        )?;
        let users = tx.execute("DELETE FROM users WHERE user_id = ?1", [user_id])?;
        tx.commit()?;
        Ok((users > 0, posts, comments, follows))
      })
      .await?;

    if existed {
      tracing::debug!(user_id, posts, comments, follows, "deleted user and owned content");
    }
    Ok(existed)
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn add_group(&self, input: NewGroup) -> Result<Group> {
    input.validate()?;

    let NewGroup { title, slug, description } = input;
    let (t, s, d) = (title.clone(), slug.clone(), description.clone());

    let outcome: Checked<i64> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO post_groups (title, slug, description) VALUES (?1, ?2, ?3)",
          rusqlite::params![t, s, d],
        );
        match res {
          Ok(_) => Ok(Ok(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Err(CoreError::DuplicateSlug(s))),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(Group { group_id: outcome?, title, slug, description })
  }

  async fn get_group(&self, group_id: i64) -> Result<Option<Group>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT group_id, title, slug, description FROM post_groups
                 WHERE group_id = ?1",
                [group_id],
                group_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
    let slug = slug.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT group_id, title, slug, description FROM post_groups WHERE slug = ?1",
                [slug],
                group_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_groups(&self) -> Result<Vec<Group>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT group_id, title, slug, description FROM post_groups
             ORDER BY title, group_id",
          )?;
          let rows = stmt
            .query_map([], group_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn delete_group(&self, group_id: i64) -> Result<bool> {
    let (existed, detached) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let detached = tx.execute(
          "UPDATE posts SET group_id = NULL WHERE group_id = ?1",
          [group_id],
        )?;
        let removed = tx.execute("DELETE FROM post_groups WHERE group_id = ?1", [group_id])?;
        tx.commit()?;
        Ok((removed > 0, detached))
      })
      .await?;

    if existed {
      tracing::debug!(group_id, detached, "deleted group; posts kept without a group");
    }
    Ok(existed)
  }

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn add_post(&self, input: NewPost) -> Result<Post> {
    input.validate()?;

    let NewPost { author_id, form } = input;
    let PostForm { text, group_id, image } = form;
    let pub_date = encode_dt(now());

    let outcome: Checked<RawPost> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if username_of(&tx, author_id)?.is_none() {
          return Ok(Err(CoreError::UserNotFound(author_id.to_string())));
        }
        if let Some(gid) = group_id
          && !row_exists(&tx, "SELECT 1 FROM post_groups WHERE group_id = ?1", gid)?
        {
          return Ok(Err(CoreError::GroupNotFound(gid.to_string())));
        }

        tx.execute(
          "INSERT INTO posts (text, pub_date, author_id, group_id, image)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![text, pub_date, author_id, group_id, image],
        )?;
        let post_id = tx.last_insert_rowid();
        let raw = select_post(&tx, post_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    outcome?.into_post()
  }

  async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_post(conn, post_id)?))
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn update_post(&self, post_id: i64, form: PostForm) -> Result<Post> {
    form.validate()?;

    let PostForm { text, group_id, image } = form;

    let outcome: Checked<RawPost> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "SELECT 1 FROM posts WHERE post_id = ?1", post_id)? {
          return Ok(Err(CoreError::PostNotFound(post_id)));
        }
        if let Some(gid) = group_id
          && !row_exists(&tx, "SELECT 1 FROM post_groups WHERE group_id = ?1", gid)?
        {
          return Ok(Err(CoreError::GroupNotFound(gid.to_string())));
        }

        tx.execute(
          "UPDATE posts
           SET text = ?1, group_id = ?2, image = COALESCE(?3, image)
           WHERE post_id = ?4",
          rusqlite::params![text, group_id, image, post_id],
        )?;
        let raw = select_post(&tx, post_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    outcome?.into_post()
  }

  async fn delete_post(&self, post_id: i64) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          tx.execute("DELETE FROM comments WHERE post_id = ?1", [post_id])?;
          let removed = tx.execute("DELETE FROM posts WHERE post_id = ?1", [post_id])?;
          tx.commit()?;
          Ok(removed > 0)
        })
        .await?,
    )
  }

  async fn count_posts(&self, scope: &FeedScope) -> Result<u64> {
    let (clause, key) = scope_filter(scope);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM posts p {clause}"),
          rusqlite::params_from_iter(key),
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  async fn list_posts(&self, scope: &FeedScope, limit: u64, offset: u64) -> Result<Vec<Post>> {
    let (clause, key) = scope_filter(scope);
    let mut args: Vec<i64> = key.into_iter().collect();
    let sql = format!(
      "{POST_SELECT} {clause}
       ORDER BY p.pub_date DESC, p.post_id DESC
       LIMIT ?{} OFFSET ?{}",
      args.len() + 1,
      args.len() + 2,
    );
    args.push(to_sql_int(limit));
    args.push(to_sql_int(offset));

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), RawPost::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn add_comment(&self, input: NewComment) -> Result<Comment> {
    input.validate()?;

    let NewComment { post_id, author_id, text } = input;
    let created  = now();
    let at_str   = encode_dt(created);
    let body     = text.clone();

    let outcome: Checked<(i64, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "SELECT 1 FROM posts WHERE post_id = ?1", post_id)? {
          return Ok(Err(CoreError::PostNotFound(post_id)));
        }
        let Some(username) = username_of(&tx, author_id)? else {
          return Ok(Err(CoreError::UserNotFound(author_id.to_string())));
        };

        tx.execute(
          "INSERT INTO comments (post_id, author_id, text, created) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![post_id, author_id, body, at_str],
        )?;
        let comment_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok((comment_id, username)))
      })
      .await?;

    let (comment_id, username) = outcome?;
    Ok(Comment {
      comment_id,
      post_id,
      author: UserRef { user_id: author_id, username },
      text,
      created,
    })
  }

  async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created DESC, c.comment_id DESC"
        ))?;
        let rows = stmt
          .query_map([post_id], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Follows ───────────────────────────────────────────────────────────────

  async fn add_follow(&self, user_id: i64, author_id: i64) -> Result<Follow> {
    let created_at = now();
    let at_str     = encode_dt(created_at);

    let outcome: Checked<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for id in [user_id, author_id] {
          if username_of(&tx, id)?.is_none() {
            return Ok(Err(CoreError::UserNotFound(id.to_string())));
          }
        }

        let res = tx.execute(
          "INSERT INTO follows (user_id, author_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, author_id, at_str],
        );
        match res {
          Ok(_) => {
            let follow_id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Ok(follow_id))
          }
          Err(e) if is_unique_violation(&e) => {
            Ok(Err(CoreError::AlreadyFollowing { user_id, author_id }))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(Follow { follow_id: outcome?, user_id, author_id, created_at })
  }

  async fn remove_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let removed = conn.execute(
            "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
            [user_id, author_id],
          )?;
          Ok(removed > 0)
        })
        .await?,
    )
  }

  async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM follows WHERE user_id = ?1 AND author_id = ?2",
                [user_id, author_id],
                |_| Ok(()),
              )
              .optional()?
              .is_some(),
          )
        })
        .await?,
    )
  }

  async fn list_following(&self, user_id: i64) -> Result<Vec<Follow>> {
    let raws: Vec<RawFollow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT follow_id, user_id, author_id, created_at FROM follows
           WHERE user_id = ?1 ORDER BY follow_id",
        )?;
        let rows = stmt
          .query_map([user_id], RawFollow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFollow::into_follow).collect()
  }
}
