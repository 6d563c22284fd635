//! 1-indexed page arithmetic shared by catalog and order listings.

use serde::{Deserialize, Serialize};

use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(StorefrontError::Validation("Page size must be at least 1".into()));
        }
        Ok(Self { page, page_size })
    }

    /// Row offset of the page; page 0 is treated like page 1 and filtered out later.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Rows worth fetching: none when the page number is below range.
    pub fn limit(&self) -> u32 {
        if self.page == 0 { 0 } else { self.page_size }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// Assembles a page from a fetched window, dropping rows when the request is out of range.
    pub fn from_window(request: PageRequest, items: Vec<T>, total: u64) -> Self {
        let total_pages = total_pages(total, request.page_size);
        let items = if request.page == 0 || request.page > total_pages { Vec::new() } else { items };
        Self { items, page: request.page, total_pages, total }
    }
}

/// `ceil(total / page_size)`, never less than one page.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
