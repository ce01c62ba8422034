#![doc = include_str!("../README.md")]

// Core modules
pub mod cache;
pub mod errors;
pub mod extract;
pub mod global;
pub mod hooks;
pub mod key;
mod log_utils;
pub mod options;
pub mod pages;
pub mod params;
pub mod platform;
pub mod projection;
pub mod provider;
pub mod query;
pub mod state;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use cache::StoreConfig;
pub use global::init;

pub mod prelude {
    //! The prelude exports all the most common types and functions for using dioxus-infinite-provider.

    // The hooks
    pub use crate::hooks::{
        ListContent, UseInfiniteProvider, use_infinite_provider, use_list_container,
        use_list_content,
    };

    // The engine and its inputs
    pub use crate::key::QueryKey;
    pub use crate::options::{QueryOptions, RefetchMode, Select};
    pub use crate::params::PaginationParams;
    pub use crate::provider::PageProvider;
    pub use crate::query::InfiniteQuery;

    // Response extraction
    pub use crate::extract::{
        DefaultExtractor, Extractor, JsonExtractor, Overrides, PagedResponse,
    };

    // What the UI consumes
    pub use crate::pages::Page;
    pub use crate::projection::{InfiniteQueryResult, ListPhase};
    pub use crate::state::{AsyncState, QueryPhase};

    // Storage and global initialization
    pub use crate::cache::{MemoryPageStore, PageStore, StoreConfig};
    pub use crate::global::init;

    // Error types
    pub use crate::errors::{ExtractError, PaginationError, PaginationResult};
}
