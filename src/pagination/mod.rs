use serde::{Serialize, Serializer};

/// One slot of the page-number bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    /// Collapsed run of pages; a placeholder, never a link.
    Ellipsis,
}

impl PageItem {
    pub fn page(&self) -> Option<usize> {
        match self {
            PageItem::Page(n) => Some(*n),
            PageItem::Ellipsis => None,
        }
    }
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageItem::Page(n) => serializer.serialize_u64(*n as u64),
            PageItem::Ellipsis => serializer.serialize_str("…"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub first_index: usize,
    pub last_index: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_numbers: Vec<PageItem>,
}

impl PageWindow {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.first_index..self.last_index
    }
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size)
}

/// Keeps a requested page inside `[1, max(1, total_pages)]`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub fn page_numbers(total_pages: usize, current_page: usize) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total_pages <= 5 {
        return (1..=total_pages).map(Page).collect();
    }
    let last = total_pages;
    let current = clamp_page(current_page, total_pages);
    if current <= 3 {
        vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(last)]
    } else if current >= last - 2 {
        vec![
            Page(1),
            Ellipsis,
            Page(last - 3),
            Page(last - 2),
            Page(last - 1),
            Page(last),
        ]
    } else {
        vec![
            Page(1),
            Ellipsis,
            Page(current - 1),
            Page(current),
            Page(current + 1),
            Ellipsis,
            Page(last),
        ]
    }
}

/// Slice bounds and page bar for `current_page` over `count` filtered items.
pub fn compute_window(count: usize, page_size: usize, current_page: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total = total_pages(count, page_size);
    let current = clamp_page(current_page, total);
    let first_index = ((current - 1) * page_size).min(count);
    let last_index = (first_index + page_size).min(count);
    PageWindow {
        first_index,
        last_index,
        total_pages: total,
        current_page: current,
        page_numbers: page_numbers(total, current),
    }
}
