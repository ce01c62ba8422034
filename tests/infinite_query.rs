use dioxus_infinite_provider::prelude::*;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering},
};
use std::time::Duration;
use tokio::task::yield_now;

/// In-memory backend serving `0..total`, recording every request
#[derive(Clone)]
struct CountingBackend {
    total: u64,
    calls: Arc<AtomicU32>,
    offsets: Arc<Mutex<Vec<u64>>>,
    fail: Arc<AtomicBool>,
    has_next: Option<bool>,
}

impl CountingBackend {
    fn new(total: u64) -> Self {
        Self {
            total,
            calls: Arc::new(AtomicU32::new(0)),
            offsets: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
            has_next: None,
        }
    }

    fn with_has_next(mut self, has_next: bool) -> Self {
        self.has_next = Some(has_next);
        self
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn offsets(&self) -> Vec<u64> {
        self.offsets.lock().unwrap().clone()
    }

    fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl PageProvider for CountingBackend {
    type Response = PagedResponse<u64>;
    type Error = String;

    fn fetch_page(
        &self,
        params: PaginationParams,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> {
        let backend = self.clone();
        async move {
            backend.calls.fetch_add(1, Ordering::SeqCst);
            backend.offsets.lock().unwrap().push(params.offset);
            yield_now().await;
            if backend.fail.load(Ordering::SeqCst) {
                return Err("API Error".to_string());
            }
            let end = (params.offset + params.limit).min(backend.total);
            let response = PagedResponse::new((params.offset..end).collect(), backend.total);
            Ok(match backend.has_next {
                Some(flag) => response.with_has_next(flag),
                None => response,
            })
        }
    }
}

type Query = InfiniteQuery<CountingBackend, DefaultExtractor<u64>, u64>;

fn query_with(
    store: Arc<dyn PageStore>,
    key: QueryKey,
    backend: &CountingBackend,
    options: QueryOptions<u64, String>,
) -> Query {
    InfiniteQuery::new(store, key, backend.clone(), DefaultExtractor::new(), options)
        .expect("valid options")
}

fn query(backend: &CountingBackend, page_size: u64) -> Query {
    query_with(
        Arc::new(MemoryPageStore::new()),
        QueryKey::new("clients"),
        backend,
        QueryOptions::new().page_size(page_size),
    )
}

fn block_on_test(fut: impl Future<Output = ()>) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
    tokio::runtime::Runtime::new()
        .expect("tokio runtime")
        .block_on(fut);
}

#[test]
fn first_page_loads_on_start() {
    block_on_test(async {
        let backend = CountingBackend::new(4);
        let query = query(&backend, 2);

        let pending = query.start();
        let loading = query.result();
        assert!(loading.is_loading);
        assert_eq!(loading.phase, QueryPhase::Loading);

        pending.await;
        let result = query.result();
        assert!(!result.is_loading);
        assert_eq!(result.data, vec![0, 1]);
        assert_eq!(result.total, 4);
        assert!(result.has_next_page);
        assert_eq!(result.loaded_pages, 1);
        assert_eq!(backend.calls(), 1);
    });
}

#[test]
fn flattened_data_matches_pages_and_offsets_are_contiguous() {
    block_on_test(async {
        let backend = CountingBackend::new(7);
        let query = query(&backend, 3);

        query.start().await;
        query.fetch_next_page().await;
        query.fetch_next_page().await;

        let result = query.result();
        assert_eq!(result.data, (0..7).collect::<Vec<_>>());
        assert_eq!(result.loaded_items, 7);
        assert_eq!(result.flattened_data().len(), result.loaded_items);
        assert_eq!(result.loaded_pages, 3);
        assert_eq!(backend.offsets(), vec![0, 3, 6]);
        assert!(!result.has_next_page);
    });
}

#[test]
fn total_four_page_size_two_progression() {
    block_on_test(async {
        let backend = CountingBackend::new(4);
        let query = query(&backend, 2);

        query.start().await;
        assert_eq!(query.result().data, vec![0, 1]);
        assert!(query.result().has_next_page);

        query.fetch_next_page().await;
        assert_eq!(query.result().data, vec![0, 1, 2, 3]);
        assert!(!query.result().has_next_page);

        query.fetch_next_page().await;
        assert_eq!(backend.calls(), 2, "no request past the last page");
    });
}

#[test]
fn explicit_has_next_false_wins_over_total() {
    block_on_test(async {
        let backend = CountingBackend::new(100).with_has_next(false);
        let query = query(&backend, 10);

        query.start().await;
        let result = query.result();
        assert_eq!(result.total, 100);
        assert_eq!(result.loaded_items, 10);
        assert!(!result.has_next_page);

        query.fetch_next_page().await;
        assert_eq!(backend.calls(), 1);
    });
}

#[test]
fn concurrent_next_page_requests_coalesce() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;

        let first = query.fetch_next_page();
        assert!(query.result().is_fetching_next_page);
        let second = query.fetch_next_page();
        futures::join!(first, second);

        let result = query.result();
        assert_eq!(backend.calls(), 2);
        assert_eq!(result.loaded_pages, 2);
        assert_eq!(result.data, vec![0, 1, 2, 3]);
        assert!(!result.is_fetching_next_page);
    });
}

#[test]
fn key_change_restarts_from_offset_zero() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;
        query.fetch_next_page().await;
        let before = backend.calls();

        query
            .set_query(QueryKey::new("clients").with("active"), backend.clone(), Map::new())
            .await;

        let result = query.result();
        assert_eq!(backend.calls(), before + 1, "exactly one request for the new key");
        assert_eq!(backend.offsets().last(), Some(&0));
        assert_eq!(result.loaded_pages, 1);
        assert_eq!(result.data, vec![0, 1]);
    });
}

#[test]
fn equal_key_does_not_reset() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;
        query.fetch_next_page().await;

        query
            .set_query(QueryKey::new("clients"), backend.clone(), Map::new())
            .await;

        assert_eq!(backend.calls(), 2);
        assert_eq!(query.result().loaded_pages, 2);
    });
}

#[test]
fn completion_for_superseded_identity_is_discarded() {
    block_on_test(async {
        let old_backend = CountingBackend::new(10);
        let new_backend = CountingBackend::new(3);
        let query = query(&old_backend, 2);

        let stale = query.start();
        query
            .set_query(
                QueryKey::new("clients").with("renamed"),
                new_backend.clone(),
                Map::new(),
            )
            .await;
        stale.await;

        let result = query.result();
        assert_eq!(result.total, 3);
        assert_eq!(result.data, vec![0, 1]);
        assert!(!result.is_loading);
        assert_eq!(old_backend.calls(), 1);
        assert_eq!(new_backend.calls(), 1);
    });
}

#[test]
fn select_changes_data_but_not_total() {
    block_on_test(async {
        let backend = CountingBackend::new(6);
        let query = InfiniteQuery::new(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients"),
            backend.clone(),
            DefaultExtractor::new(),
            QueryOptions::new()
                .page_size(6)
                .select(|ids: &[u64]| -> Vec<String> {
                    ids.iter().filter(|id| *id % 2 == 0).map(|id| format!("#{id}")).collect()
                }),
        )
        .expect("valid options");

        query.start().await;
        let result = query.result();
        assert_eq!(result.data, vec!["#0", "#2", "#4"]);
        assert_eq!(result.total, 6);
        assert_eq!(result.loaded_items, 6);

        query.set_select(Select::new(|ids: &[u64]| ids.iter().take(1).map(|id| id.to_string()).collect()));
        assert_eq!(query.result().data, vec!["0"]);
        assert_eq!(backend.calls(), 1);
    });
}

#[test]
fn fetch_error_is_surfaced_and_loaded_pages_kept() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;

        backend.fail(true);
        query.fetch_next_page().await;

        let result = query.result();
        assert!(result.is_error);
        assert_eq!(result.error.as_deref(), Some("API Error"));
        assert_eq!(result.data, vec![0, 1]);
        assert!(result.has_next_page);
        assert_eq!(
            result.list_phase(),
            ListPhase::Items {
                fetching_more: false,
                load_failed: true
            }
        );

        backend.fail(false);
        query.fetch_next_page().await;
        let result = query.result();
        assert!(!result.is_error);
        assert_eq!(result.error, None);
        assert_eq!(result.data, vec![0, 1, 2, 3]);
    });
}

#[test]
fn first_page_failure_shows_error_view() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        backend.fail(true);
        let query = query(&backend, 2);

        query.start().await;
        let result = query.result();
        assert!(result.is_error);
        assert!(!result.is_loading);
        assert_eq!(result.list_phase(), ListPhase::Error);

        backend.fail(false);
        query.refetch().await;
        assert_eq!(query.result().data, vec![0, 1]);
        assert_eq!(query.result().list_phase(), ListPhase::Items {
            fetching_more: false,
            load_failed: false
        });
    });
}

#[test]
fn hundred_items_in_pages_of_twenty() {
    block_on_test(async {
        let backend = CountingBackend::new(100);
        let query = query(&backend, 20);
        query.start().await;

        while query.result().has_next_page {
            query.fetch_next_page().await;
        }

        let result = query.result();
        assert_eq!(result.loaded_pages, 5);
        assert_eq!(result.loaded_items, 100);
        assert_eq!(result.total, 100);
        assert_eq!(backend.offsets(), vec![0, 20, 40, 60, 80]);

        query.fetch_next_page().await;
        assert_eq!(backend.calls(), 5);
    });
}

#[test]
fn refetch_reloads_all_loaded_pages() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;
        query.fetch_next_page().await;
        query.fetch_next_page().await;

        let pending = query.refetch();
        let refetching = query.result();
        assert!(refetching.is_refetching);
        assert!(!refetching.is_loading);
        assert_eq!(refetching.data.len(), 6, "old pages stay visible");
        pending.await;

        let result = query.result();
        assert!(!result.is_refetching);
        assert_eq!(result.loaded_pages, 3);
        assert_eq!(backend.offsets(), vec![0, 2, 4, 0, 2, 4]);
    });
}

#[test]
fn first_page_refetch_mode_drops_later_pages() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query_with(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients"),
            &backend,
            QueryOptions::new()
                .page_size(2)
                .refetch_mode(RefetchMode::FirstPage),
        );
        query.start().await;
        query.fetch_next_page().await;

        query.refetch().await;

        let result = query.result();
        assert_eq!(result.loaded_pages, 1);
        assert_eq!(result.data, vec![0, 1]);
        assert_eq!(backend.offsets(), vec![0, 2, 0]);
    });
}

#[test]
fn failed_refetch_preserves_data() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;
        query.fetch_next_page().await;

        backend.fail(true);
        query.refetch().await;

        let result = query.result();
        assert!(result.is_error);
        assert!(!result.is_refetching);
        assert_eq!(result.data, vec![0, 1, 2, 3]);
        assert_eq!(result.loaded_pages, 2);
    });
}

#[test]
fn newer_refetch_supersedes_older_one() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query(&backend, 2);
        query.start().await;

        let older = query.refetch();
        let newer = query.refetch();
        futures::join!(older, newer);

        let result = query.result();
        assert!(!result.is_refetching);
        assert_eq!(result.data, vec![0, 1]);
        assert_eq!(backend.calls(), 3);
    });
}

#[test]
fn disabled_query_never_fetches() {
    block_on_test(async {
        let backend = CountingBackend::new(10);
        let query = query_with(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients"),
            &backend,
            QueryOptions::new().page_size(2).enabled(false),
        );

        query.start().await;
        query.fetch_next_page().await;
        query.refetch().await;

        let result = query.result();
        assert_eq!(backend.calls(), 0);
        assert!(!result.is_loading);
        assert!(!result.has_next_page);
        assert!(result.data.is_empty());
        assert_eq!(result.phase, QueryPhase::Idle);

        query.set_enabled(true).await;
        assert_eq!(backend.calls(), 1);
        assert_eq!(query.result().data, vec![0, 1]);
    });
}

#[test]
fn fresh_cached_pages_are_served_without_fetching() {
    block_on_test(async {
        let store: Arc<dyn PageStore> = Arc::new(MemoryPageStore::new());
        let backend = CountingBackend::new(10);
        let options = || QueryOptions::new().page_size(2).stale_time(Duration::from_secs(60));

        let first = query_with(store.clone(), QueryKey::new("clients"), &backend, options());
        first.start().await;
        first.fetch_next_page().await;
        assert_eq!(backend.calls(), 2);

        let second = query_with(store.clone(), QueryKey::new("clients"), &backend, options());
        second.start().await;
        assert_eq!(backend.calls(), 2);
        assert_eq!(second.result().data, vec![0, 1, 2, 3]);

        // Returning to a previously loaded key is a cache hit as well.
        second
            .set_query(
                QueryKey::new("clients").with("archived"),
                backend.clone(),
                Map::new(),
            )
            .await;
        assert_eq!(backend.calls(), 3);
        second
            .set_query(QueryKey::new("clients"), backend.clone(), Map::new())
            .await;
        assert_eq!(backend.calls(), 3);
        assert_eq!(second.result().loaded_pages, 2);
    });
}

#[test]
fn stale_cached_pages_are_shown_while_refetching() {
    block_on_test(async {
        let store: Arc<dyn PageStore> = Arc::new(MemoryPageStore::new());
        let backend = CountingBackend::new(10);

        let first = query_with(store.clone(), QueryKey::new("clients"), &backend, QueryOptions::new().page_size(2));
        first.start().await;

        let second = query_with(store, QueryKey::new("clients"), &backend, QueryOptions::new().page_size(2));
        let pending = second.start();
        let result = second.result();
        assert_eq!(result.data, vec![0, 1]);
        assert!(result.is_refetching);
        assert!(!result.is_loading);

        pending.await;
        assert_eq!(backend.calls(), 2);
        assert!(!second.result().is_refetching);
    });
}

#[test]
fn callbacks_fire_after_each_applied_fetch() {
    block_on_test(async {
        let backend = CountingBackend::new(4);
        let successes = Arc::new(AtomicU32::new(0));
        let failures = Arc::new(AtomicU32::new(0));
        let on_success = successes.clone();
        let on_error = failures.clone();

        let query = query_with(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients"),
            &backend,
            QueryOptions::new()
                .page_size(2)
                .on_success(move |pages: &[Page<u64>]| {
                    on_success.store(pages.len() as u32, Ordering::SeqCst);
                })
                .on_error(move |_: &String| {
                    on_error.fetch_add(1, Ordering::SeqCst);
                }),
        );

        query.start().await;
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        query.fetch_next_page().await;
        assert_eq!(successes.load(Ordering::SeqCst), 2);

        backend.fail(true);
        query.refetch().await;
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn unreadable_response_degrades_to_an_empty_last_page() {
    block_on_test(async {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let provider = move |_params: PaginationParams| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Value, String>(json!({ "items": "not a list", "total": 30 }))
            }
        };

        let query = InfiniteQuery::new(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients"),
            provider,
            JsonExtractor::<u64>::new(),
            QueryOptions::new().page_size(10),
        )
        .expect("valid options");

        query.start().await;
        let result = query.result();
        assert!(!result.is_error);
        assert!(result.data.is_empty());
        assert_eq!(result.total, 0);
        assert!(!result.has_next_page);
        assert_eq!(result.list_phase(), ListPhase::Empty);

        query.fetch_next_page().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn filters_reach_every_request() {
    block_on_test(async {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let provider = move |params: PaginationParams| {
            record.lock().unwrap().push(params.clone());
            async move { Ok::<_, String>(PagedResponse::new(vec![params.offset; params.limit as usize], 4)) }
        };

        let query = InfiniteQuery::new(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients").with(json!({ "status": "active" })),
            provider,
            DefaultExtractor::new(),
            QueryOptions::new().page_size(2).filter("status", "active"),
        )
        .expect("valid options");

        query.start().await;
        query.fetch_next_page().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].offset, 2);
        assert_eq!(seen[1].page, 2);
        assert_eq!(seen[1].size, 2);
        assert!(seen.iter().all(|p| p.filter("status") == Some(&json!("active"))));
    });
}

#[test]
fn key_change_sends_the_new_filters() {
    block_on_test(async {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = {
            let record = seen.clone();
            move |params: PaginationParams| {
                record
                    .lock()
                    .unwrap()
                    .push(params.filter("search").cloned());
                async move { Ok::<_, String>(PagedResponse::new(vec![params.offset], 1)) }
            }
        };
        let search = |term: &str| {
            let mut filters = Map::new();
            filters.insert("search".to_string(), json!(term));
            filters
        };

        let query = InfiniteQuery::new(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients").with("a"),
            provider.clone(),
            DefaultExtractor::new(),
            QueryOptions::new().page_size(1).filter("search", "a"),
        )
        .expect("valid options");
        query.start().await;

        query
            .set_query(QueryKey::new("clients").with("b"), provider, search("b"))
            .await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(json!("a")), Some(json!("b"))]
        );
        assert_eq!(query.result().data, vec![0]);
    });
}

#[test]
fn zero_page_size_is_rejected() {
    let backend = CountingBackend::new(1);
    let err = InfiniteQuery::new(
        Arc::new(MemoryPageStore::new()),
        QueryKey::new("clients"),
        backend,
        DefaultExtractor::<u64>::new(),
        QueryOptions::new().page_size(0),
    )
    .err()
    .expect("zero page size");
    assert!(matches!(err, PaginationError::Configuration(_)));
}

#[test]
fn explicit_has_next_true_with_large_total() {
    block_on_test(async {
        let backend = CountingBackend::new(100).with_has_next(true);
        let query = query(&backend, 2);

        query.start().await;
        let result = query.result();
        assert_eq!(result.data.len(), 2);
        assert!(result.has_next_page);
        assert_eq!(result.loaded_pages, 1);
        assert_eq!(result.total, 100);
    });
}

#[test]
fn select_keeps_matching_items_and_server_total() {
    block_on_test(async {
        let backend = CountingBackend::new(2);
        let query = InfiniteQuery::new(
            Arc::new(MemoryPageStore::new()),
            QueryKey::new("clients"),
            backend,
            DefaultExtractor::new(),
            QueryOptions::new()
                .page_size(2)
                .select(|ids: &[u64]| -> Vec<u64> { ids.iter().copied().filter(|id| *id == 1).collect() }),
        )
        .expect("valid options");

        query.start().await;
        let result = query.result();
        assert_eq!(result.data, vec![1]);
        assert_eq!(result.total, 2);
    });
}
