//! Offset pagination metadata.
//!
//! [`PageMeta::compute`] derives every navigation value of a page from three numbers: the
//! total item count, the page size and the requested (1-based) page. It does not care how
//! the page's data was fetched; [`Page`] simply pairs the metadata with that data.
//!
//! # Example
//!
//! ```ignore
//! use docmodels::page::PageMeta;
//!
//! let meta = PageMeta::compute(25, 10, 3);
//! assert_eq!((meta.items.begin, meta.items.end), (21, 25));
//! assert_eq!(meta.pages.total, 3);
//! assert!(!meta.pages.has_next);
//! assert!(meta.pages.has_prev);
//! ```

use serde::{Deserialize, Serialize};

/// Page navigation values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pages {
    /// The requested page (1-based).
    pub current: i64,
    pub prev: i64,
    pub has_prev: bool,
    pub next: i64,
    pub has_next: bool,
    /// Number of pages needed to hold every item.
    pub total: i64,
}

/// Item range values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Items {
    pub limit: i64,
    /// 1-based position of the first item on this page, clamped to `total`.
    pub begin: i64,
    /// 1-based position of the last item on this page, clamped to `total`.
    pub end: i64,
    /// Number of items matching the query across all pages.
    pub total: i64,
}

/// Navigation metadata of one page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub pages: Pages,
    pub items: Items,
}

impl PageMeta {
    /// Computes page metadata for `page` of size `limit` over `count` items.
    ///
    /// `limit >= 1` and `page >= 1` are the caller's responsibility and are not checked; a
    /// `limit` below 1 yields zero pages instead of dividing by zero.
    /// `has_prev` is `prev != 0`, so a request for page 0 reports a previous page (-1).
    pub fn compute(count: u64, limit: i64, page: i64) -> Self {
        let total = count as i64;
        let begin = ((page - 1) * limit + 1).min(total);
        let end = (page * limit).min(total);

        let pages_total = match limit {
            limit if limit > 0 => (total + limit - 1) / limit,
            _ => 0,
        };
        let next = page + 1;
        let prev = page - 1;

        Self {
            pages: Pages {
                current: page,
                prev,
                has_prev: prev != 0,
                next,
                has_next: next <= pages_total,
                total: pages_total,
            },
            items: Items { limit, begin, end, total },
        }
    }

    /// Number of items to skip to reach the first item of the page.
    pub fn skip(limit: i64, page: i64) -> u64 {
        ((page - 1) * limit).max(0) as u64
    }

    /// Attaches the page's data to this metadata.
    pub fn with_data<T>(self, data: Vec<T>) -> Page<T> {
        Page {
            data,
            pages: self.pages,
            items: self.items,
        }
    }
}

/// One page of results together with its navigation metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pages: Pages,
    pub items: Items,
}

impl<T> Page<T> {
    pub fn meta(&self) -> PageMeta {
        PageMeta {
            pages: self.pages,
            items: self.items,
        }
    }

    /// Maps every item of the page, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            pages: self.pages,
            items: self.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_reports_true_item_range() {
        let meta = PageMeta::compute(25, 10, 3);

        assert_eq!(meta.items.begin, 21);
        assert_eq!(meta.items.end, 25);
        assert_eq!(meta.items.total, 25);
        assert_eq!(meta.pages.total, 3);
        assert!(!meta.pages.has_next);
        assert!(meta.pages.has_prev);
        assert_eq!(meta.pages.prev, 2);
        assert_eq!(meta.pages.next, 4);
    }

    #[test]
    fn first_page_has_no_prev() {
        let meta = PageMeta::compute(25, 10, 1);

        assert!(!meta.pages.has_prev);
        assert!(meta.pages.has_next);
        assert_eq!((meta.items.begin, meta.items.end), (1, 10));
    }

    #[test]
    fn empty_result_clamps_range_to_zero() {
        let meta = PageMeta::compute(0, 10, 1);

        assert_eq!(meta.items.begin, 0);
        assert_eq!(meta.items.end, 0);
        assert_eq!(meta.pages.total, 0);
        assert!(!meta.pages.has_next);
    }

    #[test]
    fn page_past_the_end_clamps_to_count() {
        let meta = PageMeta::compute(1, 10, 2);

        assert_eq!((meta.items.begin, meta.items.end), (1, 1));
        assert_eq!(meta.pages.total, 1);
        assert!(!meta.pages.has_next);
    }

    #[test]
    fn page_zero_reports_prev() {
        let meta = PageMeta::compute(30, 10, 0);

        assert_eq!(meta.pages.prev, -1);
        assert!(meta.pages.has_prev);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        assert_eq!(PageMeta::compute(30, 10, 1).pages.total, 3);
        assert_eq!(PageMeta::compute(31, 10, 1).pages.total, 4);
    }

    #[test]
    fn skip_counts_previous_pages() {
        assert_eq!(PageMeta::skip(20, 1), 0);
        assert_eq!(PageMeta::skip(20, 3), 40);
    }

    #[test]
    fn serializes_with_camel_case_flags() {
        let page = PageMeta::compute(5, 2, 1).with_data(vec!["a", "b"]);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["pages"]["hasNext"], serde_json::json!(true));
        assert_eq!(json["pages"]["hasPrev"], serde_json::json!(false));
        assert_eq!(json["items"]["end"], serde_json::json!(2));
        assert_eq!(json["data"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn zero_limit_yields_no_pages() {
        let meta = PageMeta::compute(5, 0, 1);

        assert_eq!(meta.pages.total, 0);
        assert!(!meta.pages.has_next);
        assert_eq!(meta.items.limit, 0);
        assert_eq!(PageMeta::skip(0, 3), 0);
    }
}
