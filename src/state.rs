//! Fetch state machine and the next-page gate
//!
//! Per query identity the engine moves through
//! `Idle -> Loading -> Ready <-> FetchingNext -> Ready`, with `Refetching` reachable
//! from `Ready` independently of a next-page fetch. [`FetchStatus`] stores the
//! in-flight operations as orthogonal flags; [`FetchStatus::phase`] folds them into a
//! single [`QueryPhase`] for display and logging.

/// Common trait for async state types that represent loading, success, and error states
pub trait AsyncState {
    /// The type of successful data
    type Data;
    /// The type of error
    type Error;

    /// Returns true if the state is currently loading
    fn is_loading(&self) -> bool;

    /// Returns true if the state contains successful data
    fn is_success(&self) -> bool;

    /// Returns true if the state contains an error
    fn is_error(&self) -> bool;

    /// Returns the data if successful, None otherwise
    fn data(&self) -> Option<&Self::Data>;

    /// Returns the error if failed, None otherwise
    fn error(&self) -> Option<&Self::Error>;
}

/// Identifies which query identity an in-flight fetch belongs to.
///
/// Bumped on every identity change; a completion carrying an older generation is
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Single-word summary of what the query is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// Disabled, or not started yet
    Idle,
    /// First page of a fresh identity in flight
    Loading,
    /// Pages loaded, nothing in flight
    Ready,
    /// A next-page fetch is in flight
    FetchingNext,
    /// A refetch is in flight (possibly alongside a next-page fetch)
    Refetching,
}

/// In-flight operations for the active identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatus {
    started: bool,
    initial_in_flight: bool,
    next_in_flight: bool,
    refetch_in_flight: Option<u64>,
}

impl FetchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.initial_in_flight
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.next_in_flight
    }

    pub fn is_refetching(&self) -> bool {
        self.refetch_in_flight.is_some()
    }

    /// True while any fetch is outstanding
    pub fn is_fetching(&self) -> bool {
        self.initial_in_flight || self.next_in_flight || self.refetch_in_flight.is_some()
    }

    pub fn phase(&self) -> QueryPhase {
        if self.initial_in_flight {
            QueryPhase::Loading
        } else if self.refetch_in_flight.is_some() {
            QueryPhase::Refetching
        } else if self.next_in_flight {
            QueryPhase::FetchingNext
        } else if self.started {
            QueryPhase::Ready
        } else {
            QueryPhase::Idle
        }
    }

    pub(crate) fn begin_initial(&mut self) {
        self.started = true;
        self.initial_in_flight = true;
    }

    pub(crate) fn finish_initial(&mut self) {
        self.initial_in_flight = false;
    }

    pub(crate) fn begin_next(&mut self) {
        self.next_in_flight = true;
    }

    pub(crate) fn finish_next(&mut self) {
        self.next_in_flight = false;
    }

    /// Start a refetch; a newer refetch supersedes any outstanding one
    pub(crate) fn begin_refetch(&mut self, ticket: u64) {
        self.started = true;
        self.refetch_in_flight = Some(ticket);
    }

    /// Finish the refetch identified by `ticket`.
    ///
    /// Returns false when a newer refetch has superseded it, in which case its result
    /// must not be applied.
    pub(crate) fn finish_refetch(&mut self, ticket: u64) -> bool {
        if self.refetch_in_flight == Some(ticket) {
            self.refetch_in_flight = None;
            true
        } else {
            false
        }
    }

    /// Mark the query as started without a fetch, e.g. after a cache hit
    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    /// Forget everything in flight; used when the identity changes
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of asking the gate for the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Issue the request for this zero-based page index
    Proceed { page_index: usize },
    /// The query is disabled
    Disabled,
    /// The first page has not arrived yet
    NotLoaded,
    /// The last page reported no successor
    NoNextPage,
    /// A next-page fetch is already in flight
    AlreadyFetching,
}

impl GateDecision {
    pub fn should_fetch(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }
}

/// Decide whether a next-page request may be issued.
///
/// Requests are strictly sequential: the only page that can be requested is the one
/// right after the pages already loaded.
pub fn next_page_gate(enabled: bool, loaded_pages: usize, has_next: bool, status: &FetchStatus) -> GateDecision {
    if !enabled {
        GateDecision::Disabled
    } else if status.is_loading() || loaded_pages == 0 {
        GateDecision::NotLoaded
    } else if status.is_fetching_next_page() {
        GateDecision::AlreadyFetching
    } else if !has_next {
        GateDecision::NoNextPage
    } else {
        GateDecision::Proceed {
            page_index: loaded_pages,
        }
    }
}
