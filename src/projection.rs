//! Query state projection
//!
//! [`InfiniteQueryResult`] is the one contract the UI layer consumes, independent of
//! how the engine tracks its fetches internally. [`ListPhase`] folds it into the
//! view a list renderer should show.

use crate::state::{AsyncState, QueryPhase};

/// Uniform snapshot of a paginated query
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteQueryResult<D, E> {
    /// Flattened items of all loaded pages, after `select`
    pub data: Vec<D>,
    /// Server-reported total from the first page; unaffected by `select`
    pub total: u64,
    /// True only while the first page of a fresh identity is in flight
    pub is_loading: bool,
    pub is_error: bool,
    /// Most recent fetch failure; cleared by the next successful fetch
    pub error: Option<E>,
    pub is_fetching_next_page: bool,
    pub is_refetching: bool,
    pub has_next_page: bool,
    pub loaded_pages: usize,
    /// Items loaded before `select`
    pub loaded_items: usize,
    pub phase: QueryPhase,
}

impl<D, E> InfiniteQueryResult<D, E> {
    /// Snapshot of a query that has not fetched anything
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            is_loading: false,
            is_error: false,
            error: None,
            is_fetching_next_page: false,
            is_refetching: false,
            has_next_page: false,
            loaded_pages: 0,
            loaded_items: 0,
            phase: QueryPhase::Idle,
        }
    }

    /// Alias of `data`
    pub fn flattened_data(&self) -> &[D] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn list_phase(&self) -> ListPhase {
        ListPhase::of(self)
    }
}

impl<D, E> Default for InfiniteQueryResult<D, E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<D, E> AsyncState for InfiniteQueryResult<D, E> {
    type Data = Vec<D>;
    type Error = E;

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn is_success(&self) -> bool {
        !self.is_loading && !self.is_error && self.phase != QueryPhase::Idle
    }

    fn is_error(&self) -> bool {
        self.is_error
    }

    fn data(&self) -> Option<&Vec<D>> {
        if self.is_success() {
            Some(&self.data)
        } else {
            None
        }
    }

    fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }
}

/// What a list container should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// Full-screen loading indicator
    Loading,
    /// Error view with a retry action bound to `refetch`
    Error,
    /// Caller supplied empty-state view
    Empty,
    /// The items themselves
    Items {
        /// Show a footer spinner below the last item
        fetching_more: bool,
        /// The last next-page or refresh attempt failed; loaded items stay visible
        load_failed: bool,
    },
}

impl ListPhase {
    pub fn of<D, E>(result: &InfiniteQueryResult<D, E>) -> Self {
        if result.is_loading {
            Self::Loading
        } else if result.data.is_empty() && result.is_error {
            Self::Error
        } else if result.data.is_empty() {
            Self::Empty
        } else {
            Self::Items {
                fetching_more: result.is_fetching_next_page,
                load_failed: result.is_error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(data: Vec<u32>) -> InfiniteQueryResult<u32, String> {
        InfiniteQueryResult {
            loaded_items: data.len(),
            data,
            loaded_pages: 1,
            phase: QueryPhase::Ready,
            ..InfiniteQueryResult::empty()
        }
    }

    #[test]
    fn loading_wins_over_everything() {
        let result = InfiniteQueryResult::<u32, String> {
            is_loading: true,
            phase: QueryPhase::Loading,
            ..InfiniteQueryResult::empty()
        };
        assert_eq!(result.list_phase(), ListPhase::Loading);
        assert!(AsyncState::data(&result).is_none());
    }

    #[test]
    fn error_view_only_without_data() {
        let mut result = loaded(vec![]);
        result.is_error = true;
        result.error = Some("API Error".to_string());
        assert_eq!(result.list_phase(), ListPhase::Error);

        let mut result = loaded(vec![1]);
        result.is_error = true;
        assert_eq!(
            result.list_phase(),
            ListPhase::Items {
                fetching_more: false,
                load_failed: true
            }
        );
    }

    #[test]
    fn empty_and_items() {
        assert_eq!(loaded(vec![]).list_phase(), ListPhase::Empty);

        let mut result = loaded(vec![1, 2]);
        result.is_fetching_next_page = true;
        assert_eq!(
            result.list_phase(),
            ListPhase::Items {
                fetching_more: true,
                load_failed: false
            }
        );
        assert_eq!(result.flattened_data(), &[1, 2]);
        assert_eq!(AsyncState::data(&result), Some(&vec![1, 2]));
    }
}
