//! # Global Page Store
//!
//! Hooks need a store that outlives any single component. This module holds the
//! application-wide default store. The engine itself never reads it: hooks look it up
//! and hand it to each [`InfiniteQuery`](crate::query::InfiniteQuery) they build.

use std::sync::{Arc, OnceLock};

use crate::{
    cache::{MemoryPageStore, PageStore, StoreConfig},
    errors::{PaginationError, PaginationResult},
};

/// Global singleton store shared by all hooks
static GLOBAL_STORE: OnceLock<Arc<dyn PageStore>> = OnceLock::new();

/// Initialize the global page store with default settings
///
/// ## Example
///
/// ```rust,no_run
/// use dioxus::prelude::*;
///
/// fn main() {
///     dioxus_infinite_provider::init().expect("page store");
///     let mut dom = VirtualDom::new(app);
///     dom.rebuild_in_place();
/// }
///
/// #[component]
/// fn app() -> Element {
///     rsx! { div { "Hello World!" } }
/// }
/// ```
pub fn init() -> PaginationResult<()> {
    init_with(StoreConfig::default())
}

/// Initialize the global page store as a [`MemoryPageStore`] built from `config`.
///
/// Initialization happens once; later calls keep the first store.
pub fn init_with(config: StoreConfig) -> PaginationResult<()> {
    if config.max_entries() == 0 {
        return Err(PaginationError::Configuration(
            "store max_entries must be greater than zero".to_string(),
        ));
    }
    GLOBAL_STORE.get_or_init(|| Arc::new(MemoryPageStore::with_config(config)));
    Ok(())
}

/// Install a custom store implementation as the global store.
///
/// Returns the rejected store when one is already installed.
pub fn install(store: Arc<dyn PageStore>) -> Result<(), Arc<dyn PageStore>> {
    GLOBAL_STORE.set(store)
}

/// Get the global page store
///
/// ## Errors
///
/// Returns `PaginationError::NotInitialized` if `init()` has not been called yet.
pub fn store() -> PaginationResult<Arc<dyn PageStore>> {
    GLOBAL_STORE
        .get()
        .cloned()
        .ok_or(PaginationError::NotInitialized)
}

/// Check if the global store has been initialized
pub fn is_initialized() -> bool {
    GLOBAL_STORE.get().is_some()
}
