//! # Infinite Query Engine
//!
//! [`InfiniteQuery`] turns a [`PageProvider`] into an incrementally growing, cached
//! collection for one query identity at a time.
//!
//! Every operation claims its slot in the state machine synchronously and returns a
//! future that performs the request. The caller decides where that future runs (the
//! Dioxus hook spawns it onto the component's scope). Because the claim happens
//! before the future is returned, a second `fetch_next_page()` issued while the first
//! is still pending is already a no-op.
//!
//! ## Example
//!
//! ```rust
//! use dioxus_infinite_provider::prelude::*;
//! use std::sync::Arc;
//!
//! # futures::executor::block_on(async {
//! let query = InfiniteQuery::new(
//!     Arc::new(MemoryPageStore::new()),
//!     QueryKey::new("clients"),
//!     |params: PaginationParams| async move {
//!         let ids: Vec<u64> = (params.offset..params.offset + params.limit).collect();
//!         Ok::<_, String>(PagedResponse::new(ids, 6))
//!     },
//!     DefaultExtractor::new(),
//!     QueryOptions::new().page_size(3),
//! )
//! .expect("valid options");
//!
//! query.start().await;
//! assert_eq!(query.result().data, vec![0, 1, 2]);
//! assert!(query.result().has_next_page);
//!
//! query.fetch_next_page().await;
//! assert_eq!(query.result().loaded_items, 6);
//! assert!(!query.result().has_next_page);
//! # });
//! ```

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::{Map, Value};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::sync::watch;

use crate::{
    cache::{PageStore, read_typed},
    errors::PaginationResult,
    extract::{ExtractedPage, Extractor, extract_page},
    key::QueryKey,
    options::{QueryOptions, RefetchMode, Select},
    pages::{Page, PageArena},
    params::PaginationParams,
    projection::InfiniteQueryResult,
    provider::PageProvider,
    state::{FetchStatus, GateDecision, Generation, QueryPhase, next_page_gate},
    types::DataBounds,
};

type Item<P, X> = <X as Extractor<<P as PageProvider>::Response>>::Item;
type Snapshot<P, D> = InfiniteQueryResult<D, <P as PageProvider>::Error>;

struct SelectMemo<D> {
    version: u64,
    select_id: usize,
    data: Vec<D>,
}

struct Inner<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
{
    key: QueryKey,
    cache_key: String,
    provider: Arc<P>,
    extractor: Arc<X>,
    options: QueryOptions<Item<P, X>, P::Error, D>,
    generation: Generation,
    arena: PageArena<Item<P, X>>,
    /// Bumped on every change to `arena`
    version: u64,
    status: FetchStatus,
    error: Option<P::Error>,
    refetch_tickets: u64,
    memo: Option<SelectMemo<D>>,
}

/// Side effects collected under the lock and run after it is released
struct Completion<T, D, E> {
    result: InfiniteQueryResult<D, E>,
    store: Option<PageArena<T>>,
    success: Option<(Arc<dyn Fn(&[Page<T>])>, Vec<Page<T>>)>,
    failure: Option<(Arc<dyn Fn(&E)>, E)>,
}

impl<P, X, D> Inner<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: DataBounds,
{
    fn params(&self, page_index: usize) -> PaginationParams {
        PaginationParams::for_page(
            page_index as u64,
            self.options.get_page_size(),
            self.options.filters(),
        )
    }

    fn project(&mut self) -> InfiniteQueryResult<D, P::Error> {
        let select = self.options.get_select();
        let data = match &self.memo {
            Some(memo) if memo.version == self.version && memo.select_id == select.id() => {
                memo.data.clone()
            }
            _ => {
                let items = self.arena.flattened();
                let data = select.apply(&items);
                self.memo = Some(SelectMemo {
                    version: self.version,
                    select_id: select.id(),
                    data: data.clone(),
                });
                data
            }
        };

        InfiniteQueryResult {
            data,
            total: self.arena.total(),
            is_loading: self.status.is_loading(),
            is_error: self.error.is_some(),
            error: self.error.clone(),
            is_fetching_next_page: self.status.is_fetching_next_page(),
            is_refetching: self.status.is_refetching(),
            has_next_page: self.options.is_enabled() && self.arena.has_next(),
            loaded_pages: self.arena.loaded_pages(),
            loaded_items: self.arena.loaded_items(),
            phase: self.status.phase(),
        }
    }

    fn replace_arena(&mut self, arena: PageArena<Item<P, X>>) {
        self.arena = arena;
        self.version += 1;
    }

    fn append_page(&mut self, page: ExtractedPage<Item<P, X>>) {
        self.arena.push(page.items, page.total, page.has_next);
        self.version += 1;
    }

    fn complete(
        &mut self,
        outcome: Result<(), P::Error>,
    ) -> Completion<Item<P, X>, D, P::Error> {
        let mut completion = Completion {
            result: self.project(),
            store: None,
            success: None,
            failure: None,
        };
        match outcome {
            Ok(()) => {
                completion.store = Some(self.arena.clone());
                completion.success = self
                    .options
                    .success_callback()
                    .map(|f| (f, self.arena.pages().to_vec()));
            }
            Err(error) => {
                completion.failure = self.options.error_callback().map(|f| (f, error));
            }
        }
        completion
    }
}

/// Paginated, cached query over one [`PageProvider`]
pub struct InfiniteQuery<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
{
    inner: Arc<Mutex<Inner<P, X, D>>>,
    store: Arc<dyn PageStore>,
    updates: Arc<watch::Sender<InfiniteQueryResult<D, P::Error>>>,
}

impl<P, X, D> Clone for InfiniteQuery<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: self.store.clone(),
            updates: self.updates.clone(),
        }
    }
}

impl<P, X, D> InfiniteQuery<P, X, D>
where
    P: PageProvider,
    X: Extractor<P::Response>,
    D: DataBounds,
{
    /// Create an engine for `key`. Nothing is fetched until [`start`](Self::start).
    ///
    /// ## Errors
    ///
    /// Returns `PaginationError::Configuration` if `options` are invalid.
    pub fn new(
        store: Arc<dyn PageStore>,
        key: QueryKey,
        provider: P,
        extractor: X,
        options: QueryOptions<Item<P, X>, P::Error, D>,
    ) -> PaginationResult<Self> {
        options.validate()?;
        let (updates, _) = watch::channel(InfiniteQueryResult::empty());
        let cache_key = key.cache_key();

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                key,
                cache_key,
                provider: Arc::new(provider),
                extractor: Arc::new(extractor),
                options,
                generation: Generation::default(),
                arena: PageArena::new(),
                version: 0,
                status: FetchStatus::new(),
                error: None,
                refetch_tickets: 0,
                memo: None,
            })),
            store,
            updates: Arc::new(updates),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P, X, D>> {
        // Every critical section leaves `Inner` consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current projection
    pub fn result(&self) -> Snapshot<P, D> {
        self.updates.borrow().clone()
    }

    /// Receive a new projection after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<P, D>> {
        self.updates.subscribe()
    }

    pub fn key(&self) -> QueryKey {
        self.lock().key.clone()
    }

    pub fn phase(&self) -> QueryPhase {
        self.lock().status.phase()
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().options.is_enabled()
    }

    fn publish(&self, result: Snapshot<P, D>) {
        self.updates.send_replace(result);
    }

    fn publish_current(&self) {
        let result = self.lock().project();
        self.publish(result);
    }

    fn finish(&self, completion: Completion<Item<P, X>, D, P::Error>, cache_key: &str, cache_time: Duration) {
        if let Some(arena) = completion.store {
            self.store.write(cache_key, Arc::new(arena), cache_time);
        }
        self.publish(completion.result);
        if let Some((on_success, pages)) = completion.success {
            on_success(&pages);
        }
        if let Some((on_error, error)) = completion.failure {
            on_error(&error);
        }
    }

    /// Load the first page of the current identity.
    ///
    /// A fresh cached page sequence is served without fetching; a stale one is served
    /// immediately and refetched. Calling `start` on a started or disabled query is a
    /// no-op.
    pub fn start(&self) -> LocalBoxFuture<'static, ()> {
        let mut inner = self.lock();
        if !inner.options.is_enabled() || inner.status.phase() != QueryPhase::Idle {
            return future::ready(()).boxed_local();
        }

        let stale_time = inner.options.get_stale_time();
        let cached = read_typed::<PageArena<Item<P, X>>>(&*self.store, &inner.cache_key, stale_time);
        match cached {
            Some(hit) if !hit.data.is_empty() => {
                crate::log_cache_hit!(
                    "{} ({} pages, stale: {})",
                    inner.key,
                    hit.data.loaded_pages(),
                    hit.is_stale
                );
                inner.replace_arena(hit.data);
                inner.status.mark_started();
                if hit.is_stale {
                    let (refetch, result) = self.begin_refetch(&mut inner);
                    drop(inner);
                    self.publish(result);
                    return refetch;
                }
                let result = inner.project();
                drop(inner);
                self.publish(result);
                future::ready(()).boxed_local()
            }
            _ => {
                let initial = self.begin_initial(&mut inner);
                drop(inner);
                self.publish_current();
                initial
            }
        }
    }

    fn begin_initial(&self, inner: &mut Inner<P, X, D>) -> LocalBoxFuture<'static, ()> {
        inner.status.begin_initial();
        let generation = inner.generation;
        let provider = inner.provider.clone();
        let params = inner.params(0);
        crate::log_page_fetch!("{} page 0 (offset {})", inner.key, params.offset);

        let this = self.clone();
        async move {
            let response = provider.fetch_page(params).await;
            this.complete_initial(generation, response);
        }
        .boxed_local()
    }

    fn complete_initial(
        &self,
        generation: Generation,
        response: Result<P::Response, P::Error>,
    ) {
        let mut inner = self.lock();
        if inner.generation != generation {
            crate::debug_log!("Discarding first page for superseded identity");
            return;
        }
        inner.status.finish_initial();

        let outcome = match response {
            Ok(response) => {
                let mut arena = PageArena::new();
                let page = extract_page(&*inner.extractor, &response, &arena);
                arena.push(page.items, page.total, page.has_next);
                crate::log_page_store!("{} page 0 stored ({} items)", inner.key, arena.loaded_items());
                inner.replace_arena(arena);
                inner.error = None;
                Ok(())
            }
            Err(error) => {
                crate::log_fetch_error!("{} page 0 failed", inner.key);
                inner.error = Some(error.clone());
                Err(error)
            }
        };

        let completion = inner.complete(outcome);
        let cache_key = inner.cache_key.clone();
        let cache_time = inner.options.get_cache_time();
        drop(inner);
        self.finish(completion, &cache_key, cache_time);
    }

    /// Request the page after the last loaded one.
    ///
    /// No-op unless the last page reported a successor and no next-page fetch is in
    /// flight; calling it at the end of the list is not an error.
    pub fn fetch_next_page(&self) -> LocalBoxFuture<'static, ()> {
        let mut inner = self.lock();
        let decision = next_page_gate(
            inner.options.is_enabled(),
            inner.arena.loaded_pages(),
            inner.arena.has_next(),
            &inner.status,
        );
        let GateDecision::Proceed { page_index } = decision else {
            crate::log_gate_skip!("{}: {:?}", inner.key, decision);
            return future::ready(()).boxed_local();
        };

        inner.status.begin_next();
        let generation = inner.generation;
        let provider = inner.provider.clone();
        let params = inner.params(page_index);
        crate::log_page_fetch!("{} page {} (offset {})", inner.key, page_index, params.offset);
        let result = inner.project();
        drop(inner);
        self.publish(result);

        let this = self.clone();
        async move {
            let response = provider.fetch_page(params).await;
            this.complete_next(generation, page_index, response);
        }
        .boxed_local()
    }

    fn complete_next(
        &self,
        generation: Generation,
        page_index: usize,
        response: Result<P::Response, P::Error>,
    ) {
        let mut inner = self.lock();
        if inner.generation != generation {
            crate::debug_log!("Discarding page {} for superseded identity", page_index);
            return;
        }
        inner.status.finish_next();

        let outcome = match response {
            // A refetch may have rebuilt the sequence to a different length meanwhile.
            Ok(_) if inner.arena.loaded_pages() != page_index => {
                crate::debug_log!(
                    "{} page {} no longer follows the loaded pages, dropping it",
                    inner.key,
                    page_index
                );
                let result = inner.project();
                drop(inner);
                self.publish(result);
                return;
            }
            Ok(response) => {
                let page = extract_page(&*inner.extractor, &response, &inner.arena);
                inner.append_page(page);
                crate::log_page_store!(
                    "{} page {} stored ({} items loaded)",
                    inner.key,
                    page_index,
                    inner.arena.loaded_items()
                );
                inner.error = None;
                Ok(())
            }
            Err(error) => {
                crate::log_fetch_error!("{} page {} failed", inner.key, page_index);
                inner.error = Some(error.clone());
                Err(error)
            }
        };

        let completion = inner.complete(outcome);
        let cache_key = inner.cache_key.clone();
        let cache_time = inner.options.get_cache_time();
        drop(inner);
        self.finish(completion, &cache_key, cache_time);
    }

    /// Reload the current identity from page 0.
    ///
    /// Always permitted while enabled; a newer refetch supersedes an older one. On
    /// failure the previously loaded pages stay in place. With nothing loaded yet this
    /// behaves like the first load.
    pub fn refetch(&self) -> LocalBoxFuture<'static, ()> {
        let mut inner = self.lock();
        if !inner.options.is_enabled() {
            return future::ready(()).boxed_local();
        }
        if inner.arena.is_empty() {
            if inner.status.is_loading() {
                crate::log_gate_skip!("{}: first page already in flight", inner.key);
                return future::ready(()).boxed_local();
            }
            let initial = self.begin_initial(&mut inner);
            drop(inner);
            self.publish_current();
            return initial;
        }

        let (refetch, result) = self.begin_refetch(&mut inner);
        drop(inner);
        self.publish(result);
        refetch
    }

    fn begin_refetch(&self, inner: &mut Inner<P, X, D>) -> (LocalBoxFuture<'static, ()>, Snapshot<P, D>) {
        inner.refetch_tickets += 1;
        let ticket = inner.refetch_tickets;
        inner.status.begin_refetch(ticket);

        let pages = match inner.options.get_refetch_mode() {
            RefetchMode::AllLoaded => inner.arena.loaded_pages().max(1),
            RefetchMode::FirstPage => 1,
        };
        crate::log_refetch!("{} reloading {} page(s)", inner.key, pages);

        let generation = inner.generation;
        let provider = inner.provider.clone();
        let extractor = inner.extractor.clone();
        let params: Vec<_> = (0..pages).map(|index| inner.params(index)).collect();

        let this = self.clone();
        let refetch = async move {
            let mut arena = PageArena::new();
            let mut failure = None;
            for params in params {
                match provider.fetch_page(params).await {
                    Ok(response) => {
                        let page = extract_page(&*extractor, &response, &arena);
                        arena.push(page.items, page.total, page.has_next);
                        if !arena.has_next() {
                            break;
                        }
                    }
                    Err(error) => {
                        failure = Some(error);
                        break;
                    }
                }
            }
            this.complete_refetch(generation, ticket, failure.map_or(Ok(arena), Err));
        }
        .boxed_local();

        (refetch, inner.project())
    }

    fn complete_refetch(
        &self,
        generation: Generation,
        ticket: u64,
        outcome: Result<PageArena<Item<P, X>>, P::Error>,
    ) {
        let mut inner = self.lock();
        if inner.generation != generation {
            crate::debug_log!("Discarding refetch for superseded identity");
            return;
        }
        if !inner.status.finish_refetch(ticket) {
            crate::debug_log!("Discarding refetch superseded by a newer one");
            return;
        }

        let outcome = match outcome {
            Ok(arena) => {
                crate::log_refetch!("{} rebuilt with {} page(s)", inner.key, arena.loaded_pages());
                inner.replace_arena(arena);
                inner.error = None;
                Ok(())
            }
            Err(error) => {
                crate::log_fetch_error!("{} refetch failed, keeping loaded pages", inner.key);
                inner.error = Some(error.clone());
                Err(error)
            }
        };

        let completion = inner.complete(outcome);
        let cache_key = inner.cache_key.clone();
        let cache_time = inner.options.get_cache_time();
        drop(inner);
        self.finish(completion, &cache_key, cache_time);
    }

    /// Switch to another identity.
    ///
    /// A different key discards the loaded pages, forgets everything in flight and
    /// starts over from page 0 (or the store's cached sequence), sending `filters`
    /// with every request of the new identity. An equal key only swaps the provider
    /// and the filters used by later requests.
    pub fn set_query(
        &self,
        key: QueryKey,
        provider: P,
        filters: Map<String, Value>,
    ) -> LocalBoxFuture<'static, ()> {
        {
            let mut inner = self.lock();
            inner.provider = Arc::new(provider);
            inner.options.set_filters(filters);
            if inner.key == key {
                return future::ready(()).boxed_local();
            }
            crate::debug_log!("Query identity changed: {} -> {}", inner.key, key);
            inner.cache_key = key.cache_key();
            inner.key = key;
            Self::reset(&mut inner);
        }
        self.publish_current();
        self.start()
    }

    /// Use `provider` for every request issued from now on. Fetches already in flight
    /// finish with the previous provider.
    pub fn set_provider(&self, provider: P) {
        self.lock().provider = Arc::new(provider);
    }

    /// Enable or disable fetching.
    ///
    /// Disabling drops the loaded view and ignores anything in flight; enabling starts
    /// the query again.
    pub fn set_enabled(&self, enabled: bool) -> LocalBoxFuture<'static, ()> {
        {
            let mut inner = self.lock();
            if inner.options.is_enabled() == enabled {
                return future::ready(()).boxed_local();
            }
            inner.options.set_enabled(enabled);
            Self::reset(&mut inner);
        }
        self.publish_current();
        if enabled {
            self.start()
        } else {
            future::ready(()).boxed_local()
        }
    }

    /// Replace the `select` transform; `data` is recomputed on the next projection
    pub fn set_select(&self, select: Select<Item<P, X>, D>) {
        self.lock().options.set_select(select);
        self.publish_current();
    }

    fn reset(inner: &mut Inner<P, X, D>) {
        inner.generation = inner.generation.next();
        inner.status.reset();
        inner.error = None;
        inner.memo = None;
        inner.replace_arena(PageArena::new());
    }
}
