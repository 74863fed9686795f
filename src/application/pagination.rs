//! Page-number pagination over ordered listings.
//!
//! Page numbers come straight from the query string and are never rejected:
//! missing or malformed input means the first page, numbers below one clamp to
//! one, and numbers past the end resolve to the last page.

use std::num::IntErrorKind;

use serde::Serialize;

/// Number of posts on every listing page.
pub const PAGE_SIZE: usize = 10;

/// Parse an untrusted `?page=` value. Anything that is not an integer maps to
/// the first page; integers out of `i64` range saturate.
pub fn parse_page_number(raw: Option<&str>) -> i64 {
    let Some(value) = raw else {
        return 1;
    };
    match value.trim().parse::<i64>() {
        Ok(number) => number,
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            _ => 1,
        },
    }
}

/// Resolved position of one page within a listing of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub page_count: usize,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl PageWindow {
    /// Resolve the requested page against `total` items using [`PAGE_SIZE`].
    pub fn resolve(total: usize, requested: i64) -> Self {
        Self::resolve_with_size(total, requested, PAGE_SIZE)
    }

    pub(crate) fn resolve_with_size(total: usize, requested: i64, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let page_count = total.div_ceil(page_size);
        let last = page_count.max(1);

        let number = if requested < 1 {
            1
        } else {
            usize::try_from(requested).unwrap_or(usize::MAX).min(last)
        };

        let offset = (number - 1) * page_size;
        let limit = page_size.min(total.saturating_sub(offset));

        Self {
            number,
            page_count,
            total,
            offset,
            limit,
        }
    }

    /// Cut this window out of a fully materialized listing.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset)
            .take(self.limit)
            .cloned()
            .collect()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Paging metadata rendered alongside each listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub number: usize,
    pub page_count: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page: Option<usize>,
    pub previous_page: Option<usize>,
}

impl From<&PageWindow> for PageMeta {
    fn from(window: &PageWindow) -> Self {
        Self {
            number: window.number,
            page_count: window.page_count,
            total: window.total,
            has_next: window.has_next(),
            has_previous: window.has_previous(),
            next_page: window.has_next().then(|| window.number + 1),
            previous_page: window.has_previous().then(|| window.number - 1),
        }
    }
}

/// One page of items plus the window it was cut from.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    pub fn meta(&self) -> PageMeta {
        PageMeta::from(&self.window)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }
}

/// Paginate a fully materialized, already ordered sequence.
pub fn paginate<T: Clone>(items: &[T], requested: i64) -> Page<T> {
    let window = PageWindow::resolve(items.len(), requested);
    Page::new(window.slice(items), window)
}
