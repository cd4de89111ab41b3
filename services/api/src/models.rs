//! API models for request and response payloads

use serde::Serialize;

pub mod booking;
pub mod contact;
pub mod media;

/// Clamp 1-based pagination parameters, falling back to `default_size`
/// when the requested size is missing or outside `1..=max_size`.
pub fn paginate(page: Option<i64>, size: Option<i64>, default_size: i64, max_size: i64) -> (i64, i64) {
    let page = page.filter(|p| *p >= 1).unwrap_or(1);
    let size = size
        .filter(|s| (1..=max_size).contains(s))
        .unwrap_or(default_size);
    (page, size)
}

/// Pagination block shared by list responses
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(total_count: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            total_count,
            page,
            page_size,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}
