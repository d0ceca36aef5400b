//! Follow edges and the follow/unfollow toggle.
//!
//! Each (follower, author) pair is in exactly one of two states. The store's
//! uniqueness constraint keeps at most one edge per pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed edge: `user_id` follows the posts of `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
  pub follow_id:  i64,
  pub user_id:    i64,
  pub author_id:  i64,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
  NotFollowing,
  Following,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Follow,
  Unfollow,
}

impl FollowState {
  pub fn from_edge(exists: bool) -> Self {
    if exists { Self::Following } else { Self::NotFollowing }
  }

  pub fn is_following(self) -> bool { matches!(self, Self::Following) }

  /// Apply `transition`, returning the new state and whether it differs from
  /// the current one. Re-following or re-unfollowing is a no-op.
  pub fn apply(self, transition: Transition) -> (Self, bool) {
    let next = match transition {
      Transition::Follow => Self::Following,
      Transition::Unfollow => Self::NotFollowing,
    };
    (next, next != self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn follow_from_not_following_changes_state() {
    let (next, changed) = FollowState::NotFollowing.apply(Transition::Follow);
    assert_eq!(next, FollowState::Following);
    assert!(changed);
  }

  #[test]
  fn repeated_transitions_are_noops() {
    assert_eq!(
      FollowState::Following.apply(Transition::Follow),
      (FollowState::Following, false)
    );
    assert_eq!(
      FollowState::NotFollowing.apply(Transition::Unfollow),
      (FollowState::NotFollowing, false)
    );
  }

  #[test]
  fn unfollow_from_following() {
    let (next, changed) = FollowState::Following.apply(Transition::Unfollow);
    assert!(!next.is_following());
    assert!(changed);
  }

  #[test]
  fn from_edge() {
    assert!(FollowState::from_edge(true).is_following());
    assert!(!FollowState::from_edge(false).is_following());
  }
}
