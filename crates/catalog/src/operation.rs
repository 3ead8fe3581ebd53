//! Cancellable capability operations
//!
//! Each call to an asynchronous capability (a search, a remote load)
//! gets its own [`SearchResults`] with its own state machine:
//!
//! ```text
//! Idle -> InFlight -> Completed
//!                  -> Cancelled
//!                  -> Failed
//! ```
//!
//! Starting a new call through a [`SearchSlot`] cancels the previous one.
//! A cancelled operation refuses to commit results, so a superseded call
//! that finishes late leaves no trace.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stratified_core::{Result, TraitError};
use tracing::debug;

/// Shared cancellation flag, checked at each step of long operations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every holder of this token
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the token was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `StaleOperation` if cancelled
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(TraitError::stale(operation))
        } else {
            Ok(())
        }
    }
}

/// State of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Created, not started
    Idle,
    /// Running
    InFlight,
    /// Results committed
    Completed,
    /// Superseded or cancelled; results discarded
    Cancelled,
    /// Finished with an error
    Failed,
}

impl OperationState {
    /// True for Completed, Cancelled and Failed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Completed | OperationState::Cancelled | OperationState::Failed
        )
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Display name
    pub name: String,
    /// Catalog model the hit refers to, if any
    pub model_id: Option<String>,
    /// Names of the enclosing groups, outermost first
    pub path: Vec<String>,
}

#[derive(Debug)]
struct Outcome {
    state: OperationState,
    results: Vec<SearchResult>,
    message: Option<String>,
}

/// One search call: text, cancellation token, state and results
#[derive(Debug)]
pub struct SearchResults {
    search_text: String,
    token: CancellationToken,
    outcome: Mutex<Outcome>,
}

impl SearchResults {
    /// Idle operation for `search_text`
    pub fn new(search_text: impl Into<String>) -> Self {
        Self {
            search_text: search_text.into(),
            token: CancellationToken::new(),
            outcome: Mutex::new(Outcome {
                state: OperationState::Idle,
                results: Vec::new(),
                message: None,
            }),
        }
    }

    /// Text being searched for
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Token handed to the provider
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether this operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Current state
    pub fn state(&self) -> OperationState {
        self.outcome.lock().state
    }

    /// Committed results
    pub fn results(&self) -> Vec<SearchResult> {
        self.outcome.lock().results.clone()
    }

    /// User-facing message (no results, too short, error)
    pub fn message(&self) -> Option<String> {
        self.outcome.lock().message.clone()
    }

    pub(crate) fn start(&self) {
        let mut outcome = self.outcome.lock();
        if outcome.state == OperationState::Idle {
            outcome.state = OperationState::InFlight;
        }
    }

    /// Cancel the operation; a no-op once it has finished
    pub fn cancel(&self) {
        self.token.cancel();
        let mut outcome = self.outcome.lock();
        if !outcome.state.is_terminal() {
            outcome.state = OperationState::Cancelled;
        }
    }

    /// Commit results, unless the operation was cancelled
    ///
    /// The cancellation check and the write happen under one lock, so a
    /// commit never lands after a cancel.
    pub fn commit(&self, results: Vec<SearchResult>) -> Result<()> {
        let mut outcome = self.outcome.lock();
        if self.token.is_cancelled() || outcome.state.is_terminal() {
            return Err(TraitError::stale(format!("search '{}'", self.search_text)));
        }
        if results.is_empty() {
            outcome.message = Some("No results found".to_string());
        }
        outcome.results = results;
        outcome.state = OperationState::Completed;
        Ok(())
    }

    pub(crate) fn finish_with_message(&self, message: impl Into<String>) {
        let mut outcome = self.outcome.lock();
        if !outcome.state.is_terminal() {
            outcome.message = Some(message.into());
            outcome.state = OperationState::Completed;
        }
    }

    pub(crate) fn fail(&self, message: impl Into<String>) {
        let mut outcome = self.outcome.lock();
        if !outcome.state.is_terminal() {
            outcome.message = Some(message.into());
            outcome.state = OperationState::Failed;
        }
    }
}

/// Per-provider record of the in-flight and last committed operations
#[derive(Debug, Default)]
pub struct SearchSlot {
    current: Mutex<Option<Arc<SearchResults>>>,
    latest: Mutex<Option<Arc<SearchResults>>>,
}

impl SearchSlot {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation, cancelling the previous one
    pub fn begin(&self, search_text: &str) -> Arc<SearchResults> {
        let next = Arc::new(SearchResults::new(search_text));
        let previous = self.current.lock().replace(Arc::clone(&next));
        if let Some(previous) = previous {
            if !previous.state().is_terminal() {
                debug!(
                    target: "stratified::search",
                    superseded = previous.search_text(),
                    by = search_text,
                    "Cancelling superseded search"
                );
            }
            previous.cancel();
        }
        next
    }

    /// Record a committed operation as the latest
    pub(crate) fn publish(&self, operation: &Arc<SearchResults>) {
        *self.latest.lock() = Some(Arc::clone(operation));
    }

    /// Operation most recently started
    pub fn current(&self) -> Option<Arc<SearchResults>> {
        self.current.lock().clone()
    }

    /// Last operation whose results were committed
    pub fn latest(&self) -> Option<Arc<SearchResults>> {
        self.latest.lock().clone()
    }

    /// Cancel the in-flight operation, if any
    pub fn cancel(&self) {
        if let Some(current) = self.current.lock().as_ref() {
            current.cancel();
        }
    }
}
