//! Search provider capability
//!
//! Providers implement [`SearchProvider::do_search`]; callers go through
//! [`run_search`], which owns the operation lifecycle: it enforces the
//! minimum query length, supersedes the provider's previous search,
//! commits results only if the operation is still current, and swallows
//! the `StaleOperation` a superseded search ends with.

use crate::capability::{Capability, CatalogModel, HasModel, RequiredKind, Requirement};
use crate::operation::{CancellationToken, SearchResult, SearchResults, SearchSlot};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use stratified_core::Result;
use stratified_engine::PrimitiveType;
use tracing::{debug, warn};

/// Descriptor for [`SearchProvider`]
pub static CAPABILITY: Capability = Capability {
    name: "SearchProvider",
    marker: "hasSearchProviderMixin",
    requires: &[
        Requirement {
            trait_id: "name",
            kind: RequiredKind::Primitive(PrimitiveType::String),
        },
        Requirement {
            trait_id: "minCharacters",
            kind: RequiredKind::Primitive(PrimitiveType::Integer),
        },
    ],
};

/// Minimum query length when no stratum sets `minCharacters`
pub const DEFAULT_MIN_CHARACTERS: usize = 3;

/// Boxed future returned by [`SearchProvider::do_search`]
pub type SearchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<SearchResult>>> + Send + 'a>>;

/// A model that answers free-text searches
pub trait SearchProvider: HasModel + Send + Sync {
    /// Capability marker
    fn has_search_provider_mixin(&self) -> bool {
        true
    }

    /// Operation record for this provider
    fn search_slot(&self) -> &SearchSlot;

    /// Run one search
    ///
    /// Implementations should check `token` between steps and return
    /// `StaleOperation` once it is cancelled.
    fn do_search(&self, text: &str, token: CancellationToken) -> SearchFuture<'_>;

    /// Resolved `minCharacters`
    fn min_characters(&self) -> usize {
        match self.model().get_integer("minCharacters") {
            Ok(Some(n)) if n >= 0 => n as usize,
            _ => DEFAULT_MIN_CHARACTERS,
        }
    }

    /// Last operation whose results were committed
    fn latest(&self) -> Option<Arc<SearchResults>> {
        self.search_slot().latest()
    }

    /// Cancel the in-flight search, if any
    fn cancel_pending(&self) {
        self.search_slot().cancel();
    }
}

/// Run a search on `provider`, superseding any search still in flight
///
/// Always returns the operation; its state tells how it ended.
pub async fn run_search<P>(provider: &P, text: &str) -> Arc<SearchResults>
where
    P: SearchProvider + ?Sized,
{
    let slot = provider.search_slot();
    let operation = slot.begin(text);

    let min = provider.min_characters();
    if text.trim().chars().count() < min {
        operation.finish_with_message(format!("Enter at least {} characters to search", min));
        return operation;
    }

    operation.start();
    match provider.do_search(text, operation.token()).await {
        Ok(results) => match operation.commit(results) {
            Ok(()) => slot.publish(&operation),
            Err(e) => {
                debug!(target: "stratified::search", text, error = %e, "Discarding stale results");
            }
        },
        Err(e) if e.is_stale() || operation.is_cancelled() => {
            operation.cancel();
            debug!(target: "stratified::search", text, "Search superseded");
        }
        Err(e) => {
            warn!(target: "stratified::search", text, error = %e, "Search failed");
            operation.fail(format!("An error occurred while searching: {}", e));
        }
    }
    operation
}

/// Whether `model` composes [`SearchProvider`]
pub fn is_mixed_into(model: &dyn CatalogModel) -> bool {
    model
        .as_search_provider()
        .map(|provider| provider.has_search_provider_mixin())
        .unwrap_or(false)
}
