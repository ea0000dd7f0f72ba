//! Paginated fetch engine shared by the popular and search feeds.
//!
//! [`FeedState`] is the synchronous state machine: it hands out
//! [`PageRequest`]s and merges their outcomes. [`PaginatedFeed`] drives it
//! against a [`PageSource`], releasing the lock while a page is on the wire so
//! that resets and extra boundary triggers can be observed meanwhile.
//!
//! ```text
//! Idle -> LoadingFirst -> Ready -> (LoadingMore -> Ready)* -> Exhausted
//! ```
//!
//! A failed first page falls back to `Idle`, a failed later page to `Ready`
//! with the previous items intact. Either way [`FeedState::error`] is set
//! until the next request starts.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::models::{Identified, PageResponse};

/// Something that can fetch one page of a feed. `term` is `None` for feeds
/// that have no query (popular movies).
pub trait PageSource: Send + Sync {
    type Item: Identified + Clone + Send + Sync + 'static;

    fn fetch_page(
        &self,
        term: Option<&str>,
        page: u32,
    ) -> impl Future<Output = Result<PageResponse<Self::Item>, ProviderError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    LoadingFirst,
    Ready,
    LoadingMore,
    Exhausted,
}

/// A page fetch issued by the feed, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub term: Option<String>,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was requested: a load is already in flight or the feed is exhausted.
    Skipped,
    Loaded { page: u32, added: usize },
    Failed { page: u32 },
    /// The feed was reset while this page was in flight; the response was dropped.
    Stale { page: u32 },
}

#[derive(Debug)]
pub struct FeedState<T> {
    term: Option<String>,
    items: Vec<T>,
    seen: HashSet<u64>,
    page: u32,
    loaded_page: u32,
    total_pages: Option<u32>,
    total_results: Option<u64>,
    phase: FeedPhase,
    generation: u64,
    in_flight: Option<PageRequest>,
    error: Option<Arc<ProviderError>>,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            term: None,
            items: Vec::new(),
            seen: HashSet::new(),
            page: 1,
            loaded_page: 0,
            total_pages: None,
            total_results: None,
            phase: FeedPhase::Idle,
            generation: 0,
            in_flight: None,
            error: None,
        }
    }
}

impl<T: Identified + Clone> FeedState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn total_results(&self) -> Option<u64> {
        self.total_results
    }

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_loading_first_page(&self) -> bool {
        self.phase == FeedPhase::LoadingFirst
    }

    pub fn is_loading_next_page(&self) -> bool {
        self.phase == FeedPhase::LoadingMore
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == FeedPhase::Exhausted
    }

    pub fn has_more(&self) -> bool {
        match self.total_pages {
            Some(total) => self.page < total,
            None => true,
        }
    }

    /// Starts a new generation for `term`: previous items are discarded and
    /// page 1 is requested. Any response still in flight becomes stale.
    pub fn begin_reset(&mut self, term: Option<String>) -> PageRequest {
        self.generation += 1;
        self.term = term;
        self.items.clear();
        self.seen.clear();
        self.page = 1;
        self.loaded_page = 0;
        self.total_pages = None;
        self.total_results = None;
        self.error = None;
        self.phase = FeedPhase::LoadingFirst;
        let request = self.request_for(1);
        debug!(generation = self.generation, term = ?self.term, "feed reset");
        self.in_flight = Some(request.clone());
        request
    }

    /// Requests the page after the current one, unless a load is in flight or
    /// the last page has been reached. Before any page is known this fetches
    /// page 1.
    pub fn begin_advance(&mut self) -> Option<PageRequest> {
        if let Some(pending) = &self.in_flight {
            debug!(page = pending.page, "load already in flight, ignoring advance");
            return None;
        }
        match self.total_pages {
            None => {
                self.page = 1;
                self.error = None;
                self.phase = FeedPhase::LoadingFirst;
            }
            Some(total) if self.page >= total => {
                self.phase = FeedPhase::Exhausted;
                return None;
            }
            Some(_) => {
                self.page += 1;
                self.error = None;
                self.phase = FeedPhase::LoadingMore;
            }
        }
        let request = self.request_for(self.page);
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Merges the outcome of `request`. Responses from a superseded generation
    /// are dropped without touching the current one.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: Result<PageResponse<T>, ProviderError>,
    ) -> LoadOutcome {
        if request.generation != self.generation || self.in_flight.as_ref() != Some(request) {
            debug!(
                stale_generation = request.generation,
                generation = self.generation,
                page = request.page,
                "dropping stale page response"
            );
            return LoadOutcome::Stale { page: request.page };
        }
        self.in_flight = None;

        match result {
            Ok(response) => {
                let added = self.merge(response.results);
                self.total_pages = Some(response.total_pages);
                self.total_results = Some(response.total_results);
                self.loaded_page = request.page;
                self.phase = if self.page >= response.total_pages {
                    FeedPhase::Exhausted
                } else {
                    FeedPhase::Ready
                };
                debug!(
                    page = request.page,
                    added,
                    total_pages = response.total_pages,
                    "page merged"
                );
                LoadOutcome::Loaded {
                    page: request.page,
                    added,
                }
            }
            Err(err) => {
                warn!(page = request.page, error = %err, "page load failed");
                self.error = Some(Arc::new(err));
                self.roll_back();
                LoadOutcome::Failed { page: request.page }
            }
        }
    }

    /// Releases `request` without a response, as if it had never been issued.
    /// Does nothing if the request is no longer the one in flight.
    pub fn abandon(&mut self, request: &PageRequest) {
        if self.in_flight.as_ref() != Some(request) {
            return;
        }
        debug!(page = request.page, generation = request.generation, "page request abandoned");
        self.in_flight = None;
        self.roll_back();
    }

    fn roll_back(&mut self) {
        if self.loaded_page == 0 {
            self.page = 1;
            self.phase = FeedPhase::Idle;
        } else {
            self.page = self.loaded_page;
            self.phase = FeedPhase::Ready;
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot<T> {
        FeedSnapshot {
            term: self.term.clone(),
            items: self.items.clone(),
            page: self.page,
            total_pages: self.total_pages,
            total_results: self.total_results,
            phase: self.phase,
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }

    fn merge(&mut self, incoming: Vec<T>) -> usize {
        let before = self.items.len();
        for item in incoming {
            if self.seen.insert(item.id()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    fn request_for(&self, page: u32) -> PageRequest {
        PageRequest {
            generation: self.generation,
            term: self.term.clone(),
            page,
        }
    }
}

/// Owned copy of a feed's state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot<T> {
    pub term: Option<String>,
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
    pub phase: FeedPhase,
    pub error: Option<String>,
}

impl<T> FeedSnapshot<T> {
    pub fn is_exhausted(&self) -> bool {
        self.phase == FeedPhase::Exhausted
    }

    pub fn is_loading_first_page(&self) -> bool {
        self.phase == FeedPhase::LoadingFirst
    }

    pub fn is_loading_next_page(&self) -> bool {
        self.phase == FeedPhase::LoadingMore
    }
}

/// A feed bound to its page source. Clones share the same state.
pub struct PaginatedFeed<S: PageSource> {
    source: Arc<S>,
    state: Arc<RwLock<FeedState<S::Item>>>,
}

impl<S: PageSource> Clone for PaginatedFeed<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: PageSource + 'static> PaginatedFeed<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            state: Arc::new(RwLock::new(FeedState::new())),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Restarts the feed for `term` and loads its first page.
    pub async fn reset(&self, term: Option<String>) -> LoadOutcome {
        let request = self.state.write().await.begin_reset(term);
        self.load_page(request).await
    }

    /// Loads the next page. Call this whenever the view's boundary sentinel
    /// becomes visible; repeated calls while a page is loading are ignored.
    pub async fn advance(&self) -> LoadOutcome {
        let request = self.state.write().await.begin_advance();
        match request {
            Some(request) => self.load_page(request).await,
            None => LoadOutcome::Skipped,
        }
    }

    pub async fn snapshot(&self) -> FeedSnapshot<S::Item> {
        self.state.read().await.snapshot()
    }

    pub async fn with_state<R>(&self, f: impl FnOnce(&FeedState<S::Item>) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// The fetch and merge run on their own task, so a caller that stops
    /// waiting (timeout, `select!`) never leaves the request marked in flight.
    async fn load_page(&self, request: PageRequest) -> LoadOutcome {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let task_request = request.clone();
        let task = tokio::spawn(async move {
            let result = source
                .fetch_page(task_request.term.as_deref(), task_request.page)
                .await;
            state.write().await.complete(&task_request, result)
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(page = request.page, error = %e, "page load task failed");
                self.state.write().await.abandon(&request);
                LoadOutcome::Failed { page: request.page }
            }
        }
    }
}
