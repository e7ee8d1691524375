//! Pagination shared by decision queries and the audit aggregator
//!
//! Both surfaces return the requested page together with the total
//! number of matches counted before slicing. Out-of-range input is either
//! clamped or rejected depending on [`PaginationMode`]; one mode is chosen
//! per deployment and applied to every endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// How out-of-range page parameters are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Floor page at 1, bound page_size to `[1, max]`
    #[default]
    Clamp,
    /// Return `CoreError::InvalidPagination`
    Reject,
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Bring the request into `page >= 1`, `1 <= page_size <= max_page_size`
    pub fn normalize(self, max_page_size: u32, mode: PaginationMode) -> CoreResult<Self> {
        let max_page_size = max_page_size.max(1);
        let in_range = self.page >= 1 && self.page_size >= 1 && self.page_size <= max_page_size;

        match mode {
            _ if in_range => Ok(self),
            PaginationMode::Clamp => Ok(Self {
                page: self.page.max(1),
                page_size: self.page_size.clamp(1, max_page_size),
            }),
            PaginationMode::Reject => Err(CoreError::InvalidPagination {
                page: self.page,
                page_size: self.page_size,
                max_page_size,
            }),
        }
    }

    /// Number of items to skip
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}

/// One page of results plus the pre-pagination total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Slice an already filtered and ordered result set
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.page_size as usize)
            .collect();

        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size as usize)
    }

    pub fn has_next(&self) -> bool {
        (self.page as usize) < self.total_pages()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_size_to_max() {
        let req = PageRequest::new(1, 500)
            .normalize(100, PaginationMode::Clamp)
            .unwrap();
        assert_eq!(req.page_size, 100);
    }

    #[test]
    fn test_clamp_floors_page_and_size() {
        let req = PageRequest::new(0, 0)
            .normalize(100, PaginationMode::Clamp)
            .unwrap();
        assert_eq!(req, PageRequest::new(1, 1));
    }

    #[test]
    fn test_reject_mode() {
        let err = PageRequest::new(0, 20)
            .normalize(100, PaginationMode::Reject)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPagination { page: 0, .. }));

        assert!(PageRequest::new(2, 101)
            .normalize(100, PaginationMode::Reject)
            .is_err());
        assert!(PageRequest::new(2, 100)
            .normalize(100, PaginationMode::Reject)
            .is_ok());
    }

    #[test]
    fn test_from_sorted_slices_and_counts() {
        let all: Vec<u32> = (0..25).collect();

        let page = Page::from_sorted(all.clone(), PageRequest::new(3, 10));
        assert_eq!(page.items, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.has_next());

        let beyond = Page::from_sorted(all, PageRequest::new(4, 10));
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_count, 25);
    }

    #[test]
    fn test_pages_partition_result_set() {
        let all: Vec<u32> = (0..37).collect();
        let size = 8;
        let first = Page::from_sorted(all.clone(), PageRequest::new(1, size));

        let mut seen = Vec::new();
        for p in 1..=first.total_pages() as u32 {
            seen.extend(Page::from_sorted(all.clone(), PageRequest::new(p, size)).items);
        }
        assert_eq!(seen, all);
    }
}
