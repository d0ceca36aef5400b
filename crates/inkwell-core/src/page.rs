//! Page-number pagination over ordered feeds.
//!
//! Page numbers are 1-based. A missing or non-numeric `page` parameter means
//! page 1; a number outside `1..=num_pages` is clamped to the last page, so a
//! request never fails because of its page number. An empty feed still has
//! one (empty) page.

use serde::{Deserialize, Serialize};

/// Fixed page size for every feed.
pub const POSTS_PER_PAGE: u64 = 10;

/// A page number as requested by the client, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageNumber {
  #[default]
  First,
  Exact(i64),
}

impl PageNumber {
  /// Interpret the raw `page` query parameter.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw.map(str::trim).map(str::parse::<i64>) {
      Some(Ok(n)) => Self::Exact(n),
      _ => Self::First,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
  pub count:    u64,
  pub per_page: u64,
}

impl Paginator {
  pub fn new(count: u64) -> Self { Self { count, per_page: POSTS_PER_PAGE } }

  pub fn num_pages(&self) -> u64 { self.count.div_ceil(self.per_page).max(1) }

  /// Resolve a requested page to a valid 1-based page number.
  pub fn resolve(&self, requested: PageNumber) -> u64 {
    let last = self.num_pages();
    match requested {
      PageNumber::First => 1,
      PageNumber::Exact(n) if n >= 1 && (n as u64) <= last => n as u64,
      PageNumber::Exact(_) => last,
    }
  }

  /// `(limit, offset)` for a resolved page number.
  pub fn window(&self, number: u64) -> (u64, u64) {
    (self.per_page, (number - 1) * self.per_page)
  }
}

/// One page of an ordered feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:     Vec<T>,
  pub number:    u64,
  pub num_pages: u64,
  /// Total number of items across all pages.
  pub count:     u64,
}

impl<T> Page<T> {
  pub fn has_next(&self) -> bool { self.number < self.num_pages }

  pub fn has_previous(&self) -> bool { self.number > 1 }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }
}
