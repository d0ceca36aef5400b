//! SQL schema for the Inkwell SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Foreign keys carry no `ON DELETE` actions: cascades and nullification are
//! issued explicitly by the store inside a transaction, and the constraints
//! reject any delete that would leave a dangling reference.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT,            -- argon2 PHC string; NULL = cannot log in
    created_at    TEXT NOT NULL
);

-- `groups` is an SQL keyword; the table is named for what it holds.
CREATE TABLE IF NOT EXISTS post_groups (
    group_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS posts (
    post_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    text      TEXT NOT NULL CHECK (length(text) > 0),
    pub_date  TEXT NOT NULL,       -- RFC 3339, fixed microsecond precision
    author_id INTEGER NOT NULL REFERENCES users(user_id),
    group_id  INTEGER REFERENCES post_groups(group_id),
    image     TEXT                 -- relative to the media root, e.g. posts/a.gif
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id    INTEGER NOT NULL REFERENCES posts(post_id),
    author_id  INTEGER NOT NULL REFERENCES users(user_id),
    text       TEXT NOT NULL CHECK (length(text) > 0),
    created    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS follows (
    follow_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(user_id),
    author_id  INTEGER NOT NULL REFERENCES users(user_id),
    created_at TEXT NOT NULL,
    UNIQUE (user_id, author_id)
);

CREATE INDEX IF NOT EXISTS posts_feed_idx       ON posts(pub_date DESC, post_id DESC);
CREATE INDEX IF NOT EXISTS posts_author_idx     ON posts(author_id);
CREATE INDEX IF NOT EXISTS posts_group_idx      ON posts(group_id);
CREATE INDEX IF NOT EXISTS comments_post_idx    ON comments(post_id);
CREATE INDEX IF NOT EXISTS comments_author_idx  ON comments(author_id);
CREATE INDEX IF NOT EXISTS follows_author_idx   ON follows(author_id);

PRAGMA user_version = 1;
";
