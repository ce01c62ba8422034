//! Per-query configuration
//!
//! [`QueryOptions`] is built with chained setters in the same way as the store's
//! [`StoreConfig`](crate::cache::StoreConfig):
//!
//! ```rust
//! use dioxus_infinite_provider::options::{QueryOptions, RefetchMode};
//! use std::time::Duration;
//!
//! #[derive(Clone, PartialEq)]
//! struct Client { id: u32, active: bool }
//!
//! let options = QueryOptions::<Client, String>::new()
//!     .page_size(50)
//!     .stale_time(Duration::from_secs(30))
//!     .refetch_mode(RefetchMode::FirstPage)
//!     .filter("active", true)
//!     .select(|clients: &[Client]| clients.iter().filter(|c| c.active).cloned().collect());
//! assert!(options.validate().is_ok());
//! ```

use serde_json::{Map, Value};
use std::{fmt, sync::Arc, time::Duration};

use crate::{
    errors::{PaginationError, PaginationResult},
    pages::Page,
};

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Default time an unused page sequence stays in the store
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

/// What `refetch` reloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefetchMode {
    /// Re-fetch every page that was loaded when the refetch began, in page order
    #[default]
    AllLoaded,
    /// Re-fetch page 0 only and drop the rest once it arrives
    FirstPage,
}

/// Transform applied to the whole flattened item list before exposure
pub struct Select<T, D> {
    f: Arc<dyn Fn(&[T]) -> Vec<D>>,
}

impl<T, D> Select<T, D> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[T]) -> Vec<D> + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn apply(&self, items: &[T]) -> Vec<D> {
        (self.f)(items)
    }

    /// Identity of the underlying function, used to memoize its output
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.f) as *const () as usize
    }
}

impl<T: Clone + 'static> Select<T, T> {
    pub fn identity() -> Self {
        Self::new(|items: &[T]| items.to_vec())
    }
}

impl<T, D> Clone for Select<T, D> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<T, D> fmt::Debug for Select<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Select({:#x})", self.id())
    }
}

type SuccessFn<T> = Arc<dyn Fn(&[Page<T>])>;
type ErrorFn<E> = Arc<dyn Fn(&E)>;

/// Options for one paginated query
pub struct QueryOptions<T, E, D = T> {
    page_size: u64,
    enabled: bool,
    stale_time: Duration,
    cache_time: Duration,
    refetch_mode: RefetchMode,
    filters: Map<String, Value>,
    select: Select<T, D>,
    on_success: Option<SuccessFn<T>>,
    on_error: Option<ErrorFn<E>>,
}

impl<T: Clone + 'static, E> QueryOptions<T, E, T> {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            enabled: true,
            stale_time: Duration::ZERO,
            cache_time: DEFAULT_CACHE_TIME,
            refetch_mode: RefetchMode::default(),
            filters: Map::new(),
            select: Select::identity(),
            on_success: None,
            on_error: None,
        }
    }
}

impl<T: Clone + 'static, E> Default for QueryOptions<T, E, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, D> QueryOptions<T, E, D> {
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// When false no fetch occurs and the query reports an empty, non-loading state
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// How long a cached page sequence counts as fresh; zero means always stale
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// How long an unused page sequence stays in the store
    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    pub fn refetch_mode(mut self, mode: RefetchMode) -> Self {
        self.refetch_mode = mode;
        self
    }

    /// Add a static filter merged into every page's parameters
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Page<T>]) + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Transform the flattened item list before it is exposed as `data`
    pub fn select<D2, F>(self, f: F) -> QueryOptions<T, E, D2>
    where
        F: Fn(&[T]) -> Vec<D2> + 'static,
    {
        self.with_select(Select::new(f))
    }

    pub fn with_select<D2>(self, select: Select<T, D2>) -> QueryOptions<T, E, D2> {
        QueryOptions {
            page_size: self.page_size,
            enabled: self.enabled,
            stale_time: self.stale_time,
            cache_time: self.cache_time,
            refetch_mode: self.refetch_mode,
            filters: self.filters,
            select,
            on_success: self.on_success,
            on_error: self.on_error,
        }
    }

    pub fn validate(&self) -> PaginationResult<()> {
        if self.page_size == 0 {
            return Err(PaginationError::Configuration(
                "page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_page_size(&self) -> u64 {
        self.page_size
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn get_cache_time(&self) -> Duration {
        self.cache_time
    }

    pub fn get_refetch_mode(&self) -> RefetchMode {
        self.refetch_mode
    }

    pub fn filters(&self) -> &Map<String, Value> {
        &self.filters
    }

    pub fn get_select(&self) -> &Select<T, D> {
        &self.select
    }

    pub(crate) fn success_callback(&self) -> Option<SuccessFn<T>> {
        self.on_success.clone()
    }

    pub(crate) fn error_callback(&self) -> Option<ErrorFn<E>> {
        self.on_error.clone()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_filters(&mut self, filters: Map<String, Value>) {
        self.filters = filters;
    }

    pub(crate) fn set_select(&mut self, select: Select<T, D>) {
        self.select = select;
    }
}

impl<T, E, D> Clone for QueryOptions<T, E, D> {
    fn clone(&self) -> Self {
        Self {
            page_size: self.page_size,
            enabled: self.enabled,
            stale_time: self.stale_time,
            cache_time: self.cache_time,
            refetch_mode: self.refetch_mode,
            filters: self.filters.clone(),
            select: self.select.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T, E, D> fmt::Debug for QueryOptions<T, E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("page_size", &self.page_size)
            .field("enabled", &self.enabled)
            .field("stale_time", &self.stale_time)
            .field("cache_time", &self.cache_time)
            .field("refetch_mode", &self.refetch_mode)
            .field("filters", &self.filters)
            .field("select", &self.select)
            .finish_non_exhaustive()
    }
}
