//! Page accumulation
//!
//! [`PageArena`] owns the ordered pages fetched for one query identity. Pages are only
//! appended; a page's index is assigned on append and always equals its position, so
//! the sequence can never be reordered or contain gaps. Refetch and identity changes
//! replace the whole arena instead of mutating it.

/// One fetched page after extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    index: usize,
    items: Vec<T>,
    total: u64,
    has_next: bool,
}

impl<T> Page<T> {
    /// Zero-based position of this page in its sequence
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Total reported by the server alongside this page
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether another page followed this one when it was fetched
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// View of the pages accumulated so far, including the page being processed.
///
/// Handed to [`Extractor::has_next_page`](crate::extract::Extractor::has_next_page)
/// before the new page is committed.
#[derive(Debug)]
pub struct PagesSoFar<'a, T> {
    previous: &'a [Page<T>],
    current: &'a [T],
}

impl<T> Clone for PagesSoFar<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PagesSoFar<'_, T> {}

impl<'a, T> PagesSoFar<'a, T> {
    pub fn new(previous: &'a [Page<T>], current: &'a [T]) -> Self {
        Self { previous, current }
    }

    /// Pages committed before the one being processed
    pub fn previous(&self) -> &'a [Page<T>] {
        self.previous
    }

    /// Items of the page being processed
    pub fn current(&self) -> &'a [T] {
        self.current
    }

    /// Number of pages including the current one
    pub fn page_count(&self) -> usize {
        self.previous.len() + 1
    }

    /// Number of items across all pages including the current one
    pub fn loaded_items(&self) -> usize {
        self.previous.iter().map(Page::len).sum::<usize>() + self.current.len()
    }
}

/// Append-only, index-addressable sequence of pages for one query identity
#[derive(Debug, Clone, PartialEq)]
pub struct PageArena<T> {
    pages: Vec<Page<T>>,
}

impl<T> Default for PageArena<T> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<T> PageArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page; its index is the current page count
    pub fn push(&mut self, items: Vec<T>, total: u64, has_next: bool) -> &Page<T> {
        let index = self.pages.len();
        self.pages.push(Page {
            index,
            items,
            total,
            has_next,
        });
        &self.pages[index]
    }

    pub fn get(&self, index: usize) -> Option<&Page<T>> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[Page<T>] {
        &self.pages
    }

    pub fn last(&self) -> Option<&Page<T>> {
        self.pages.last()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of pages accumulated, which is also the index of the next page to request
    pub fn loaded_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn loaded_items(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Server-reported total, taken from the first page only.
    ///
    /// Totals on later pages are ignored: the total is assumed stable per identity.
    pub fn total(&self) -> u64 {
        self.pages.first().map(Page::total).unwrap_or(0)
    }

    /// Whether the most recent page reported a following page
    pub fn has_next(&self) -> bool {
        self.pages.last().map(Page::has_next).unwrap_or(false)
    }

    /// View used when deciding whether a page with `current` items has a successor
    pub fn so_far<'a>(&'a self, current: &'a [T]) -> PagesSoFar<'a, T> {
        PagesSoFar::new(&self.pages, current)
    }

    pub fn iter_items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }
}

impl<T: Clone> PageArena<T> {
    /// All items of all pages, in page order
    pub fn flattened(&self) -> Vec<T> {
        self.iter_items().cloned().collect()
    }
}
