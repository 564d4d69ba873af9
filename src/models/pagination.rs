//! Page-based pagination for listing tools.

use schemars::JsonSchema;
use serde::Serialize;

pub const DEFAULT_PAGE: u64 = 1;
/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u64 = 100;
/// Hard ceiling for catalog listings.
pub const MAX_PAGE_SIZE: u64 = 500;
/// Default page size for `list_table_rows`.
pub const DEFAULT_ROWS_PAGE_SIZE: u64 = 50;
/// Hard ceiling for `list_table_rows`.
pub const MAX_ROWS_PAGE_SIZE: u64 = 1000;

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: u64,
    pub page_size: u64,
    pub offset: u64,
}

impl PaginationParams {
    /// Resolve raw caller values: a page below 1 becomes 1, a page size below 1
    /// becomes `default_size`, and a page size above `max_size` is clamped.
    pub fn new(
        page: Option<i64>,
        page_size: Option<i64>,
        default_size: u64,
        max_size: u64,
    ) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p as u64,
            _ => DEFAULT_PAGE,
        };
        let page_size = match page_size {
            Some(s) if s >= 1 => (s as u64).min(max_size),
            _ => default_size,
        };
        Self {
            page,
            page_size,
            offset: (page - 1).saturating_mul(page_size),
        }
    }

    /// Catalog listing defaults (100, max 500).
    pub fn listing(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self::new(page, page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// Table row defaults (50, max 1000).
    pub fn rows(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self::new(page, page_size, DEFAULT_ROWS_PAGE_SIZE, MAX_ROWS_PAGE_SIZE)
    }
}

/// Page metadata returned with paginated results.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PageInfo {
    pub page: u64,
    pub page_size: u64,
    /// Only known when the tool counted the full result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfo {
    /// Page info when the total is known.
    pub fn with_total(params: PaginationParams, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(params.page_size.max(1));
        Self {
            page: params.page,
            page_size: params.page_size,
            total_count: Some(total_count),
            total_pages: Some(total_pages),
            has_next: params.page < total_pages,
            has_previous: params.page > 1,
        }
    }

    /// Page info inferred from the number of rows on this page.
    pub fn from_page_len(params: PaginationParams, returned: usize) -> Self {
        Self {
            page: params.page,
            page_size: params.page_size,
            total_count: None,
            total_pages: None,
            has_next: returned as u64 >= params.page_size,
            has_previous: params.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PaginationParams::listing(None, None);
        assert_eq!(p, PaginationParams { page: 1, page_size: 100, offset: 0 });
        let r = PaginationParams::rows(None, None);
        assert_eq!(r.page_size, 50);
    }

    #[test]
    fn test_clamping() {
        let p = PaginationParams::listing(Some(0), Some(10_000));
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, MAX_PAGE_SIZE);

        let p = PaginationParams::listing(Some(-3), Some(0));
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, DEFAULT_PAGE_SIZE);

        let r = PaginationParams::rows(Some(2), Some(5000));
        assert_eq!(r.page_size, MAX_ROWS_PAGE_SIZE);
    }

    #[test]
    fn test_offset() {
        let p = PaginationParams::listing(Some(3), Some(25));
        assert_eq!(p.offset, 50);
    }

    #[test]
    fn test_page_info_with_total() {
        let info = PageInfo::with_total(PaginationParams::rows(Some(2), Some(10)), 25);
        assert_eq!(info.total_pages, Some(3));
        assert!(info.has_next);
        assert!(info.has_previous);

        let last = PageInfo::with_total(PaginationParams::rows(Some(3), Some(10)), 25);
        assert!(!last.has_next);

        let empty = PageInfo::with_total(PaginationParams::rows(None, None), 0);
        assert_eq!(empty.total_pages, Some(0));
        assert!(!empty.has_next);
        assert!(!empty.has_previous);
    }

    #[test]
    fn test_page_info_from_page_len() {
        let params = PaginationParams::listing(Some(1), Some(2));
        assert!(PageInfo::from_page_len(params, 2).has_next);
        assert!(!PageInfo::from_page_len(params, 1).has_next);
    }
}
