use serde::{Deserialize, Serialize};

/// Page metadata surfaced alongside a page of items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationHeader {
    pub current_page: usize,
    pub items_per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// One page of an ordered sequence plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T> PagedList<T> {
    /// Slice `page_number` (1-based) out of an already ordered sequence
    ///
    /// Out-of-range pages produce no items but keep valid metadata.
    /// `total_pages` is never below 1. Callers are expected to have
    /// coerced page number and size to at least 1; zero values only
    /// result in an empty page.
    pub fn create<I>(source: I, page_number: usize, page_size: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let source = source.into_iter();
        let total_count = source.len();

        let total_pages = if page_size == 0 {
            1
        } else {
            total_count.div_ceil(page_size).max(1)
        };

        let items: Vec<T> = match page_number.checked_sub(1) {
            Some(page_index) if page_size > 0 => source
                .skip(page_index.saturating_mul(page_size))
                .take(page_size)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            items,
            current_page: page_number,
            page_size,
            total_count,
            total_pages,
        }
    }

    pub fn header(&self) -> PaginationHeader {
        PaginationHeader {
            current_page: self.current_page,
            items_per_page: self.page_size,
            total_items: self.total_count,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Transform the items while keeping the page metadata
    pub fn map<U, F>(self, f: F) -> PagedList<U>
    where
        F: FnMut(T) -> U,
    {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
