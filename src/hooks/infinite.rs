//! # Infinite Provider Hook
//!
//! [`use_infinite_provider`] binds an [`InfiniteQuery`] to a component. It requires
//! `dioxus_infinite_provider::init()` to be called at application startup.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dioxus::prelude::*;
//! use dioxus_infinite_provider::prelude::*;
//!
//! #[derive(Clone, PartialEq)]
//! struct Client {
//!     id: u64,
//!     name: String,
//! }
//!
//! async fn fetch_clients(_params: PaginationParams) -> Result<PagedResponse<Client>, String> {
//!     // GET /clients?offset=..&limit=..
//!     Ok(PagedResponse::new(vec![], 0))
//! }
//!
//! #[component]
//! fn Clients(search: String) -> Element {
//!     let clients = use_infinite_provider(
//!         fetch_clients,
//!         QueryKey::new("clients").with(search.clone()),
//!         DefaultExtractor::new(),
//!         QueryOptions::new().page_size(50).filter("search", search),
//!     );
//!     let state = clients.state();
//!
//!     rsx! {
//!         for client in state.data.iter() {
//!             div { key: "{client.id}", "{client.name}" }
//!         }
//!         if state.has_next_page {
//!             button { onclick: move |_| clients.fetch_next_page(), "Load more" }
//!         }
//!     }
//! }
//!
//! fn app() -> Element {
//!     rsx! { Clients { search: "acme".to_string() } }
//! }
//!
//! fn main() {
//!     dioxus_infinite_provider::init().expect("page store");
//!     let mut dom = VirtualDom::new(app);
//!     dom.rebuild_in_place();
//! }
//! ```

use dioxus::prelude::*;

use crate::{
    extract::Extractor,
    global,
    key::QueryKey,
    options::QueryOptions,
    projection::InfiniteQueryResult,
    provider::PageProvider,
    query::InfiniteQuery,
    types::DataBounds,
};

type Item<P, X> = <X as Extractor<<P as PageProvider>::Response>>::Item;

/// Handle returned by [`use_infinite_provider`]
pub struct UseInfiniteProvider<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: 'static,
{
    query: InfiniteQuery<P, X, D>,
    result: Signal<InfiniteQueryResult<D, P::Error>>,
}

impl<P, X, D> Clone for UseInfiniteProvider<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: 'static,
{
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            result: self.result,
        }
    }
}

impl<P, X, D> UseInfiniteProvider<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: DataBounds,
{
    /// Reactive projection; reading it subscribes the current component
    pub fn signal(&self) -> Signal<InfiniteQueryResult<D, P::Error>> {
        self.result
    }

    /// Current projection, subscribing the current component
    pub fn state(&self) -> InfiniteQueryResult<D, P::Error> {
        self.result.read().clone()
    }

    /// Spawn a request for the next page; ignored when there is none or one is in flight
    pub fn fetch_next_page(&self) {
        spawn(self.query.fetch_next_page());
    }

    /// Spawn a reload of the loaded pages
    pub fn refetch(&self) {
        spawn(self.query.refetch());
    }

    /// The engine behind this hook
    pub fn query(&self) -> &InfiniteQuery<P, X, D> {
        &self.query
    }
}

fn store_or_panic() -> std::sync::Arc<dyn crate::cache::PageStore> {
    global::store().unwrap_or_else(|_| {
        panic!(
            "Page store not initialized. Call dioxus_infinite_provider::init() before using infinite providers."
        )
    })
}

/// Hook for a paginated, cached query.
///
/// The first render builds the engine and starts loading page 0. On later renders a
/// changed `key` resets the list and starts over from page 0 with the filters passed
/// on that render; an unchanged key only swaps in the new `provider`. `enabled` is
/// followed on every render. The extractor and the remaining options are taken from
/// the first render; use
/// [`InfiniteQuery::set_select`] through [`UseInfiniteProvider::query`] to change
/// `select` later.
///
/// ## Panics
///
/// Panics if the global page store has not been initialized or if `options` are
/// invalid.
pub fn use_infinite_provider<P, X, D>(
    provider: P,
    key: QueryKey,
    extractor: X,
    options: QueryOptions<Item<P, X>, P::Error, D>,
) -> UseInfiniteProvider<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: DataBounds,
{
    let enabled = options.is_enabled();
    let filters = options.filters().clone();
    let mut incoming = Some(provider);

    let query = use_hook(|| {
        let provider = incoming
            .take()
            .unwrap_or_else(|| unreachable!("hook initializer runs once"));
        InfiniteQuery::new(store_or_panic(), key.clone(), provider, extractor, options)
            .unwrap_or_else(|err| panic!("Invalid infinite query options: {err}"))
    });

    // Claim the first load before the signal reads its initial projection.
    use_hook(|| spawn(query.start()));
    let mut result = use_signal(|| query.result());

    use_hook(|| {
        let mut updates = query.subscribe();
        spawn(async move {
            while updates.changed().await.is_ok() {
                let next = updates.borrow_and_update().clone();
                result.set(next);
            }
        })
    });

    if let Some(provider) = incoming {
        if query.key() == key {
            query.set_provider(provider);
        } else {
            spawn(query.set_query(key, provider, filters));
        }
    }
    if query.is_enabled() != enabled {
        spawn(query.set_enabled(enabled));
    }

    UseInfiniteProvider { query, result }
}
