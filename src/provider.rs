//! Page providers
//!
//! A [`PageProvider`] is the only I/O boundary of the engine: given the parameters of
//! one page it performs the request and returns the raw response. Failures must be
//! returned as `Err`, never swallowed.
//!
//! Any `Fn(PaginationParams) -> impl Future<Output = Result<R, E>>` is a provider:
//!
//! ```rust
//! use dioxus_infinite_provider::{extract::PagedResponse, params::PaginationParams};
//! use dioxus_infinite_provider::provider::PageProvider;
//!
//! fn assert_provider<P: PageProvider>(_p: &P) {}
//!
//! let fetch_clients = |params: PaginationParams| async move {
//!     Ok::<_, String>(PagedResponse::new(vec![params.offset], 100))
//! };
//! assert_provider(&fetch_clients);
//! ```

use std::future::Future;

use crate::{params::PaginationParams, types::ProviderErrorBounds};

/// Fetches one page of a paginated endpoint
pub trait PageProvider: 'static {
    /// Raw response body for one page
    type Response: 'static;
    /// The type of error returned on failure
    type Error: ProviderErrorBounds;

    /// Execute the request for the page described by `params`
    fn fetch_page(&self, params: PaginationParams) -> impl Future<Output = Result<Self::Response, Self::Error>>;
}

impl<F, Fut, R, E> PageProvider for F
where
    F: Fn(PaginationParams) -> Fut + 'static,
    Fut: Future<Output = Result<R, E>>,
    R: 'static,
    E: ProviderErrorBounds,
{
    type Response = R;
    type Error = E;

    fn fetch_page(&self, params: PaginationParams) -> impl Future<Output = Result<R, E>> {
        self(params)
    }
}
