//! Response extractors
//!
//! Every endpoint shapes its paginated response differently. An [`Extractor`] is the
//! typed adapter that pulls `items`, `total` and the has-next flag out of one response
//! shape. The crate ships:
//!
//! - [`DefaultExtractor`] for the conventional [`PagedResponse`] `{items, total, has_next}`
//! - [`JsonExtractor`] for raw `serde_json::Value` bodies with configurable field paths
//! - [`Overrides`] to replace any subset of another extractor's functions with closures
//!
//! Extractors report failures as [`ExtractError`] and never recover on their own. The
//! engine guards every call (see [`extract_page`]) and degrades a malformed page to an
//! empty one.
//!
//! ## Example
//!
//! ```rust
//! use dioxus_infinite_provider::extract::{Extractor, JsonExtractor};
//! use serde_json::json;
//!
//! let extractor = JsonExtractor::<u32>::new()
//!     .items_at("data.rows")
//!     .total_at("data.count")
//!     .has_next_at("meta.hasMore");
//! let body = json!({"data": {"rows": [1, 2], "count": 9}, "meta": {"hasMore": true}});
//! assert_eq!(extractor.extract_items(&body).unwrap(), vec![1, 2]);
//! assert_eq!(extractor.extract_total(&body).unwrap(), 9);
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    errors::{ExtractError, ExtractResult, PaginationResult},
    pages::{PageArena, PagesSoFar},
    types::ItemBounds,
};

/// Strategy that normalizes one backend response shape into page data
pub trait Extractor<R>: 'static {
    /// The item type accumulated across pages
    type Item: ItemBounds;

    /// Items carried by the response; an absent field yields an empty vec
    fn extract_items(&self, response: &R) -> ExtractResult<Vec<Self::Item>>;

    /// Server-reported total; an absent field yields 0
    fn extract_total(&self, response: &R) -> ExtractResult<u64>;

    /// Explicit has-next flag carried by the response, if the shape has one
    fn explicit_has_next(&self, _response: &R) -> Option<bool> {
        None
    }

    /// Decide whether another page follows `response`.
    ///
    /// The explicit flag wins when present; otherwise more pages exist while the
    /// loaded item count (including this page) is below the reported total.
    fn has_next_page(&self, response: &R, pages: PagesSoFar<'_, Self::Item>) -> ExtractResult<bool> {
        match self.explicit_has_next(response) {
            Some(flag) => Ok(flag),
            None => Ok(loaded_below_total(pages, self.extract_total(response)?)),
        }
    }
}

fn loaded_below_total<T>(pages: PagesSoFar<'_, T>, total: u64) -> bool {
    (pages.loaded_items() as u64) < total
}

/// Conventional paginated response body: `{items, total, has_next}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub items: Option<Vec<T>>,
    pub total: Option<u64>,
    pub has_next: Option<bool>,
}

impl<T> Default for PagedResponse<T> {
    fn default() -> Self {
        Self {
            items: None,
            total: None,
            has_next: None,
        }
    }
}

impl<T> PagedResponse<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self {
            items: Some(items),
            total: Some(total),
            has_next: None,
        }
    }

    pub fn with_has_next(mut self, has_next: bool) -> Self {
        self.has_next = Some(has_next);
        self
    }
}

/// Extractor for [`PagedResponse`]
pub struct DefaultExtractor<T>(PhantomData<fn() -> T>);

impl<T> DefaultExtractor<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DefaultExtractor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DefaultExtractor<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DefaultExtractor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultExtractor")
    }
}

impl<T: ItemBounds> Extractor<PagedResponse<T>> for DefaultExtractor<T> {
    type Item = T;

    fn extract_items(&self, response: &PagedResponse<T>) -> ExtractResult<Vec<T>> {
        Ok(response.items.clone().unwrap_or_default())
    }

    fn extract_total(&self, response: &PagedResponse<T>) -> ExtractResult<u64> {
        Ok(response.total.unwrap_or(0))
    }

    fn explicit_has_next(&self, response: &PagedResponse<T>) -> Option<bool> {
        response.has_next
    }
}

/// Extractor for untyped JSON bodies with configurable field paths.
///
/// Paths are dot separated (`data.rows`); a leading `$.` is accepted. Defaults are
/// `items`, `total` and `has_next`. Absent items and total read as empty and zero
/// unless [`JsonExtractor::require_fields`] is set.
pub struct JsonExtractor<T> {
    items_path: String,
    total_path: String,
    has_next_path: Option<String>,
    required: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonExtractor<T> {
    pub fn new() -> Self {
        Self {
            items_path: "items".to_string(),
            total_path: "total".to_string(),
            has_next_path: Some("has_next".to_string()),
            required: false,
            _item: PhantomData,
        }
    }

    pub fn items_at(mut self, path: impl Into<String>) -> Self {
        self.items_path = path.into();
        self
    }

    pub fn total_at(mut self, path: impl Into<String>) -> Self {
        self.total_path = path.into();
        self
    }

    pub fn has_next_at(mut self, path: impl Into<String>) -> Self {
        self.has_next_path = Some(path.into());
        self
    }

    /// Ignore any has-next flag and always derive it from the total
    pub fn without_has_next(mut self) -> Self {
        self.has_next_path = None;
        self
    }

    /// Fail with [`ExtractError::MissingField`] when the items or total path is
    /// absent or null
    pub fn require_fields(mut self) -> Self {
        self.required = true;
        self
    }

    fn absent(&self, path: &str) -> Option<ExtractError> {
        self.required.then(|| ExtractError::MissingField {
            field: path.to_string(),
        })
    }
}

impl<T> Default for JsonExtractor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonExtractor<T> {
    fn clone(&self) -> Self {
        Self {
            items_path: self.items_path.clone(),
            total_path: self.total_path.clone(),
            has_next_path: self.has_next_path.clone(),
            required: self.required,
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for JsonExtractor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonExtractor")
            .field("items_path", &self.items_path)
            .field("total_path", &self.total_path)
            .field("has_next_path", &self.has_next_path)
            .field("required", &self.required)
            .finish()
    }
}

impl<T: ItemBounds + DeserializeOwned> Extractor<Value> for JsonExtractor<T> {
    type Item = T;

    fn extract_items(&self, response: &Value) -> ExtractResult<Vec<T>> {
        match lookup(response, &self.items_path) {
            None | Some(Value::Null) => match self.absent(&self.items_path) {
                Some(err) => Err(err),
                None => Ok(Vec::new()),
            },
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|row| T::deserialize(row).map_err(ExtractError::from))
                .collect(),
            Some(_) => Err(ExtractError::WrongType {
                field: self.items_path.clone(),
                expected: "array",
            }),
        }
    }

    fn extract_total(&self, response: &Value) -> ExtractResult<u64> {
        match lookup(response, &self.total_path) {
            None | Some(Value::Null) => match self.absent(&self.total_path) {
                Some(err) => Err(err),
                None => Ok(0),
            },
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| ExtractError::WrongType {
                field: self.total_path.clone(),
                expected: "non-negative integer",
            }),
            // Some endpoints send counts as strings.
            Some(Value::String(s)) => s.trim().parse().map_err(|_| ExtractError::WrongType {
                field: self.total_path.clone(),
                expected: "non-negative integer",
            }),
            Some(_) => Err(ExtractError::WrongType {
                field: self.total_path.clone(),
                expected: "non-negative integer",
            }),
        }
    }

    fn explicit_has_next(&self, response: &Value) -> Option<bool> {
        let path = self.has_next_path.as_deref()?;
        lookup(response, path)?.as_bool()
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

type ItemsFn<R, T> = Arc<dyn Fn(&R) -> ExtractResult<Vec<T>>>;
type TotalFn<R> = Arc<dyn Fn(&R) -> ExtractResult<u64>>;
type HasNextFn<R, T> = Arc<dyn for<'a> Fn(&R, PagesSoFar<'a, T>) -> ExtractResult<bool>>;

/// Wraps an extractor and replaces any of its functions with closures.
///
/// ```rust
/// use dioxus_infinite_provider::extract::{DefaultExtractor, Extractor, Overrides, PagedResponse};
///
/// // This endpoint reports the total in thousands.
/// let extractor = Overrides::<PagedResponse<u8>, _>::new(DefaultExtractor::new())
///     .with_total(|r| Ok(r.total.unwrap_or(0) * 1000));
/// assert_eq!(extractor.extract_total(&PagedResponse::new(vec![], 2)).unwrap(), 2000);
/// ```
pub struct Overrides<R, X: Extractor<R>> {
    base: X,
    items: Option<ItemsFn<R, X::Item>>,
    total: Option<TotalFn<R>>,
    has_next: Option<HasNextFn<R, X::Item>>,
}

impl<R: 'static, X: Extractor<R>> Overrides<R, X> {
    pub fn new(base: X) -> Self {
        Self {
            base,
            items: None,
            total: None,
            has_next: None,
        }
    }

    pub fn with_items<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> ExtractResult<Vec<X::Item>> + 'static,
    {
        self.items = Some(Arc::new(f));
        self
    }

    pub fn with_total<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> ExtractResult<u64> + 'static,
    {
        self.total = Some(Arc::new(f));
        self
    }

    pub fn with_has_next<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&R, PagesSoFar<'a, X::Item>) -> ExtractResult<bool> + 'static,
    {
        self.has_next = Some(Arc::new(f));
        self
    }
}

impl<R, X: Extractor<R> + Clone> Clone for Overrides<R, X> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            items: self.items.clone(),
            total: self.total.clone(),
            has_next: self.has_next.clone(),
        }
    }
}

impl<R: 'static, X: Extractor<R>> Extractor<R> for Overrides<R, X> {
    type Item = X::Item;

    fn extract_items(&self, response: &R) -> ExtractResult<Vec<Self::Item>> {
        match &self.items {
            Some(f) => f(response),
            None => self.base.extract_items(response),
        }
    }

    fn extract_total(&self, response: &R) -> ExtractResult<u64> {
        match &self.total {
            Some(f) => f(response),
            None => self.base.extract_total(response),
        }
    }

    fn explicit_has_next(&self, response: &R) -> Option<bool> {
        self.base.explicit_has_next(response)
    }

    fn has_next_page(&self, response: &R, pages: PagesSoFar<'_, Self::Item>) -> ExtractResult<bool> {
        if let Some(f) = &self.has_next {
            return f(response, pages);
        }
        match self.explicit_has_next(response) {
            Some(flag) => Ok(flag),
            None => Ok(loaded_below_total(pages, self.extract_total(response)?)),
        }
    }
}

/// Page data after guarded extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub has_next: bool,
}

/// Run all three extractors against `response`, stopping at the first failure
pub fn try_extract_page<R, X>(
    extractor: &X,
    response: &R,
    arena: &PageArena<X::Item>,
) -> PaginationResult<ExtractedPage<X::Item>>
where
    X: Extractor<R>,
{
    let items = extractor.extract_items(response)?;
    let total = extractor.extract_total(response)?;
    let has_next = extractor.has_next_page(response, arena.so_far(&items))?;
    Ok(ExtractedPage {
        items,
        total,
        has_next,
    })
}

/// Run all three extractors against `response`, recovering from failures.
///
/// If any extractor fails the failure is logged and the whole page is treated as
/// empty: no items, zero total, no next page. One malformed page never fails the
/// query and never keeps an infinite scroll requesting more.
pub fn extract_page<R, X>(extractor: &X, response: &R, arena: &PageArena<X::Item>) -> ExtractedPage<X::Item>
where
    X: Extractor<R>,
{
    try_extract_page(extractor, response, arena).unwrap_or_else(|_err| {
        crate::warn_log!(
            page = arena.loaded_pages(),
            error = %_err,
            "response extraction failed, treating page as empty"
        );
        ExtractedPage {
            items: Vec::new(),
            total: 0,
            has_next: false,
        }
    })
}
