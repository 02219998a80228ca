//! Keyset pagination primitives shared by list use-cases.
//!
//! Lists are ordered newest first by `(created_at, id)`. A [`PageKey`] marks
//! the last item of a page; the next page holds strictly older items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Position of an item in a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageKey {
    /// Ordering timestamp.
    pub created_at: DateTime<Utc>,
    /// Tie breaker.
    pub id: Uuid,
}

impl PageKey {
    /// Build a key.
    #[must_use]
    pub const fn new(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id }
    }

    /// Whether an item at `(created_at, id)` comes after this key.
    #[must_use]
    pub fn precedes(&self, created_at: DateTime<Utc>, id: Uuid) -> bool {
        (created_at, id) < (self.created_at, self.id)
    }
}

/// Requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Continue after this key.
    pub after: Option<PageKey>,
    /// Maximum items to return, within `1..=MAX_PAGE_SIZE`.
    pub limit: usize,
}

impl PageRequest {
    /// Build a request, clamping `limit` into range.
    #[must_use]
    pub fn new(after: Option<PageKey>, limit: usize) -> Self {
        Self {
            after,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// First page with the default size.
    #[must_use]
    pub fn first() -> Self {
        Self::new(None, DEFAULT_PAGE_SIZE)
    }

    /// Rows adapters should fetch: one extra to detect a further page.
    #[must_use]
    pub const fn fetch_limit(&self) -> usize {
        self.limit.saturating_add(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items, newest first.
    pub items: Vec<T>,
    /// Key to request the following page, if any.
    pub next: Option<PageKey>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with [`PageRequest::fetch_limit`].
    pub fn from_overfetch(
        mut rows: Vec<T>,
        request: &PageRequest,
        key: impl Fn(&T) -> PageKey,
    ) -> Self {
        let has_more = rows.len() > request.limit;
        rows.truncate(request.limit);
        let next = if has_more { rows.last().map(key) } else { None };
        Self { items: rows, next }
    }

    /// Transform the items, keeping the continuation key.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
        }
    }
}
