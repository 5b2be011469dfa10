//! Page-based pagination shared by every list endpoint

use serde::{Deserialize, Serialize};

/// Page used when the client does not ask for one
pub const DEFAULT_PAGE: u32 = 1;
/// Page size used when the client does not ask for one
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest page size a client may request
pub const MAX_LIMIT: u32 = 100;

/// A normalized page request: `page >= 1`, `1 <= limit <= MAX_LIMIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Build a page request from optional client input, applying defaults and clamping
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip, as bound into `OFFSET`
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Query-string form of a page request (`?page=2&limit=20`)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(query.page, query.limit)
    }
}

/// One page of results plus the totals a client needs to paginate
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total = total.max(0);
        let limit = request.limit() as i64;
        let total_pages = ((total + limit - 1) / limit) as u32;

        Self {
            items,
            total,
            page: request.page(),
            limit: request.limit(),
            total_pages,
        }
    }

    /// Transform the items while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}
