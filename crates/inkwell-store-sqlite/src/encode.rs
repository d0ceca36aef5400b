//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so lexicographic order equals time order and
//! `ORDER BY pub_date` sorts correctly.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use inkwell_core::{
  comment::Comment,
  follow::Follow,
  group::{Group, GroupRef},
  post::Post,
  user::{User, UserRef},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at storage precision, so values round-trip exactly.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── SQL fragments ───────────────────────────────────────────────────────────

/// Post columns joined with their author and (optional) group, in the order
/// [`RawPost::from_row`] reads them.
pub const POST_SELECT: &str = "
  SELECT p.post_id, p.text, p.pub_date, p.image,
         u.user_id, u.username,
         g.group_id, g.slug, g.title
  FROM posts p
  JOIN users u            ON u.user_id  = p.author_id
  LEFT JOIN post_groups g ON g.group_id = p.group_id";

pub const COMMENT_SELECT: &str = "
  SELECT c.comment_id, c.post_id, c.text, c.created, u.user_id, u.username
  FROM comments c
  JOIN users u ON u.user_id = c.author_id";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:    i64,
  pub username:   String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    self.user_id,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub fn group_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
  Ok(Group {
    group_id:    row.get(0)?,
    title:       row.get(1)?,
    slug:        row.get(2)?,
    description: row.get(3)?,
  })
}

/// Raw values read from [`POST_SELECT`].
pub struct RawPost {
  pub post_id:     i64,
  pub text:        String,
  pub pub_date:    String,
  pub image:       Option<String>,
  pub author_id:   i64,
  pub username:    String,
  // post_groups join; all NULL when the post has no group
  pub group_id:    Option<i64>,
  pub group_slug:  Option<String>,
  pub group_title: Option<String>,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:     row.get(0)?,
      text:        row.get(1)?,
      pub_date:    row.get(2)?,
      image:       row.get(3)?,
      author_id:   row.get(4)?,
      username:    row.get(5)?,
      group_id:    row.get(6)?,
      group_slug:  row.get(7)?,
      group_title: row.get(8)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    let group = match (self.group_id, self.group_slug, self.group_title) {
      (Some(group_id), Some(slug), Some(title)) => Some(GroupRef { group_id, slug, title }),
      _ => None,
    };

    Ok(Post {
      post_id: self.post_id,
      text: self.text,
      pub_date: decode_dt(&self.pub_date)?,
      author: UserRef { user_id: self.author_id, username: self.username },
      group,
      image: self.image,
    })
  }
}

/// Raw values read from [`COMMENT_SELECT`].
pub struct RawComment {
  pub comment_id: i64,
  pub post_id:    i64,
  pub text:       String,
  pub created:    String,
  pub author_id:  i64,
  pub username:   String,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id: row.get(0)?,
      post_id:    row.get(1)?,
      text:       row.get(2)?,
      created:    row.get(3)?,
      author_id:  row.get(4)?,
      username:   row.get(5)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: self.comment_id,
      post_id:    self.post_id,
      author:     UserRef { user_id: self.author_id, username: self.username },
      text:       self.text,
      created:    decode_dt(&self.created)?,
    })
  }
}

/// Raw values read directly from a `follows` row.
pub struct RawFollow {
  pub follow_id:  i64,
  pub user_id:    i64,
  pub author_id:  i64,
  pub created_at: String,
}

impl RawFollow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      follow_id:  row.get(0)?,
      user_id:    row.get(1)?,
      author_id:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_follow(self) -> Result<Follow> {
    Ok(Follow {
      follow_id:  self.follow_id,
      user_id:    self.user_id,
      author_id:  self.author_id,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_roundtrip_at_storage_precision() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }

  #[test]
  fn encoded_timestamps_sort_lexicographically() {
    let whole = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let later = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    assert!(encode_dt(whole) < encode_dt(later));
    assert_eq!(encode_dt(whole).len(), encode_dt(later).len());
  }

  #[test]
  fn bad_timestamp_is_a_parse_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
