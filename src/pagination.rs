//! Page-based listing shared by the list endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{event, Level};

const MAX_PER_PAGE: u32 = 200;
const DEFAULT_PER_PAGE: u32 = 50;

/// Pagination parameters from the query string. Pages are numbered from 0.
#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// The LIMIT and OFFSET values to bind to a query
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self.per_page();
        let offset = i64::from(self.page()) * i64::from(per_page);
        event!(Level::DEBUG, %per_page, %offset);
        (i64::from(per_page), offset)
    }
}

/// An `order_by` value named a field that can not be sorted on.
#[derive(Debug, Error)]
#[error("Unknown order_by field {0}")]
pub struct OrderByError(pub String);

/// Split an `order_by` value into a descending flag and the field name. A leading `-` means
/// descending.
pub fn split_order_by(value: &str) -> (bool, &str) {
    match value.strip_prefix('-') {
        Some(field) => (true, field),
        None => (false, value),
    }
}

/// One page of results, along with enough information to find the others.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, query: &PageQuery, total_elements: i64) -> Self {
        let per_page = query.per_page();
        let total_pages = (total_elements + i64::from(per_page) - 1) / i64::from(per_page);
        Page {
            content,
            page: query.page(),
            per_page,
            total_elements,
            total_pages,
        }
    }

    /// Convert each item on the page, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
