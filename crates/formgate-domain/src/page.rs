//! In-memory pagination.
//!
//! Listings sort by `createdAt` descending and slice into fixed-size pages
//! entirely in application memory, after the query merge step. Delegating
//! the sort to the store would require a composite index per org-predicate
//! union, which the backing store cannot provide.

use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
    pub page: usize,
}

/// Sorts `items` descending by `sort_key` and returns the requested page.
///
/// `page` is 1-based; zero is treated as the first page. An out-of-range
/// page yields an empty `data` slice with correct totals rather than an
/// error.
pub fn paginate<T>(
    mut items: Vec<T>,
    page: usize,
    page_size: usize,
    sort_key: impl Fn(&T) -> i64,
) -> Page<T> {
    let page = page.max(1);
    items.sort_by_key(|item| std::cmp::Reverse(sort_key(item)));

    let total = items.len();
    let total_pages = total.div_ceil(page_size);
    let start = (page - 1).saturating_mul(page_size);

    let data = if start < total {
        items.into_iter().skip(start).take(page_size).collect()
    } else {
        Vec::new()
    };

    Page {
        data,
        total,
        total_pages,
        page,
    }
}
