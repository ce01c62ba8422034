//! List container context
//!
//! A list container owns one [`UseInfiniteProvider`] and exposes it to every
//! descendant through context, so rows, footers and empty-state views can read the
//! projection and trigger paging without prop drilling.

use dioxus::prelude::*;
use std::rc::Rc;

use crate::{
    extract::Extractor,
    projection::{InfiniteQueryResult, ListPhase},
    provider::PageProvider,
    types::DataBounds,
};

use super::infinite::UseInfiniteProvider;

/// What descendants of a list container see
pub struct ListContent<D: 'static, E: 'static> {
    result: Signal<InfiniteQueryResult<D, E>>,
    fetch_next_page: Rc<dyn Fn()>,
    refetch: Rc<dyn Fn()>,
}

impl<D: 'static, E: 'static> Clone for ListContent<D, E> {
    fn clone(&self) -> Self {
        Self {
            result: self.result,
            fetch_next_page: self.fetch_next_page.clone(),
            refetch: self.refetch.clone(),
        }
    }
}

impl<D: Clone + 'static, E: Clone + 'static> ListContent<D, E> {
    pub fn signal(&self) -> Signal<InfiniteQueryResult<D, E>> {
        self.result
    }

    /// Current projection, subscribing the current component
    pub fn state(&self) -> InfiniteQueryResult<D, E> {
        self.result.read().clone()
    }

    /// What the list should render right now
    pub fn phase(&self) -> ListPhase {
        self.result.read().list_phase()
    }

    /// Call when the end of the list becomes visible
    pub fn fetch_next_page(&self) {
        (self.fetch_next_page)();
    }

    /// Retry action for the error view and pull-to-refresh
    pub fn refetch(&self) {
        (self.refetch)();
    }
}

/// Make `handle` the active list for all descendants
pub fn use_list_container<P, X, D>(handle: &UseInfiniteProvider<P, X, D>) -> ListContent<D, P::Error>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: DataBounds,
{
    use_context_provider(|| {
        let next = handle.clone();
        let retry = handle.clone();
        ListContent {
            result: handle.signal(),
            fetch_next_page: Rc::new(move || next.fetch_next_page()),
            refetch: Rc::new(move || retry.refetch()),
        }
    })
}

/// Read the list provided by the nearest [`use_list_container`]
///
/// ## Panics
///
/// Panics when called outside of a list container. Row and footer components are
/// only meaningful inside one.
pub fn use_list_content<D, E>() -> ListContent<D, E>
where
    D: Clone + 'static,
    E: Clone + 'static,
{
    try_use_context::<ListContent<D, E>>().unwrap_or_else(|| {
        panic!(
            "use_list_content must be called inside a list container. Call use_list_container() in an ancestor component."
        )
    })
}
