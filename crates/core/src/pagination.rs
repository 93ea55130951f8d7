//! Offset pagination as returned by every list endpoint.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum items per page.
    pub limit: u32,
    /// Offset of the first item of this page.
    pub offset: u32,
    /// Whether another page follows.
    #[serde(default)]
    pub has_more: bool,
    /// Total number of items across all pages.
    #[serde(default)]
    pub total_count: u64,
}

impl Pagination {
    /// Empty pagination for a list that has not been fetched yet.
    #[must_use]
    pub const fn empty(limit: u32) -> Self {
        Self { limit, offset: 0, has_more: false, total_count: 0 }
    }

    /// Offset of the page after this one.
    #[must_use]
    pub const fn next_offset(&self) -> u32 {
        self.offset.saturating_add(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::empty(DEFAULT_PAGE_SIZE)
    }
}

/// Page parameters sent with a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    /// Build a request, clamping `limit` to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit: limit.clamp(1, MAX_PAGE_SIZE), offset }
    }

    #[must_use]
    pub fn first(limit: u32) -> Self {
        Self::new(limit, 0)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_limit() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
        assert_eq!(PageRequest::new(500, 0).limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(25, 10), PageRequest { limit: 25, offset: 10 });
    }

    #[test]
    fn test_next_offset() {
        let p = Pagination { limit: 20, offset: 40, has_more: true, total_count: 95 };
        assert_eq!(p.next_offset(), 60);
    }

    #[test]
    fn test_pagination_missing_counts_default() {
        let p: Pagination = serde_json::from_str(r#"{"limit": 10, "offset": 0}"#).unwrap();
        assert!(!p.has_more);
        assert_eq!(p.total_count, 0);
    }
}
