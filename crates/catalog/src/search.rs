//! Catalog search
//!
//! Two ways to find models by name:
//!
//! - [`search_catalog`] walks the live catalog tree, checking a
//!   [`CancellationToken`] before every model it visits
//! - [`CatalogIndex`] snapshots `(id, name, path)` once; the
//!   [`CatalogIndexSearchProvider`] searches the snapshot asynchronously
//!
//! Matching is a case-insensitive substring test on the display name.

use crate::capability::{CatalogModel, Composition, HasModel};
use crate::catalog::Catalog;
use crate::catalog_member::CatalogMember;
use crate::group::Group;
use crate::operation::{CancellationToken, SearchResult, SearchSlot};
use crate::search_provider::{self, SearchFuture, SearchProvider};
use crate::traits;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use stratified_core::{Result, TraitError};
use stratified_engine::{Model, SchemaRegistry};
use tracing::debug;

/// Cap on results when no stratum sets `maxResults`
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Entries scanned between cancellation checks
const CHECK_INTERVAL: usize = 64;

fn display_name(model: &dyn CatalogModel) -> String {
    match model.as_catalog_member() {
        Some(member) => member.display_name(),
        None => model.model().id().to_string(),
    }
}

/// Depth-first walk over the catalog tree
///
/// Roots come first in catalog order, then each group's members in
/// member order. A model reachable from several groups is visited once.
/// Models no root reaches (groups listing each other in a cycle) are
/// visited afterwards in catalog order, as if they were roots.
struct Walk<'c, F> {
    catalog: &'c Catalog,
    token: Option<&'c CancellationToken>,
    visited: HashSet<String>,
    visit: F,
}

impl<'c, F> Walk<'c, F>
where
    F: FnMut(&str, String, &[String]),
{
    fn run(mut self) -> Result<()> {
        let catalog = self.catalog;
        let mut path = Vec::new();
        for id in catalog.root_ids() {
            self.step(id, &mut path)?;
        }
        for id in catalog.ids() {
            if !self.visited.contains(id) {
                debug!(
                    target: "stratified::search",
                    model = %id,
                    "Model unreachable from any root"
                );
                self.step(id, &mut path)?;
            }
        }
        Ok(())
    }

    fn step(&mut self, id: &str, path: &mut Vec<String>) -> Result<()> {
        if let Some(token) = self.token {
            token.check("catalog search")?;
        }
        if !self.visited.insert(id.to_string()) {
            return Ok(());
        }
        let catalog = self.catalog;
        let Some(model) = catalog.get(id) else {
            return Ok(());
        };
        let name = display_name(model);
        (self.visit)(id, name.clone(), path);

        if let Some(group) = model.as_group() {
            let members = group.member_ids()?;
            path.push(name);
            for member in &members {
                self.step(member, path)?;
            }
            path.pop();
        }
        Ok(())
    }
}

/// Search the live catalog for models whose name contains `text`
///
/// Returns `StaleOperation` as soon as `token` is cancelled.
pub fn search_catalog(
    catalog: &Catalog,
    text: &str,
    token: &CancellationToken,
) -> Result<Vec<SearchResult>> {
    let needle = text.trim().to_lowercase();
    let mut results = Vec::new();
    Walk {
        catalog,
        token: Some(token),
        visited: HashSet::new(),
        visit: |id: &str, name: String, path: &[String]| {
            if name.to_lowercase().contains(&needle) {
                results.push(SearchResult {
                    name,
                    model_id: Some(id.to_string()),
                    path: path.to_vec(),
                });
            }
        },
    }
    .run()?;
    Ok(results)
}

/// One model in a [`CatalogIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Model id
    pub id: String,
    /// Display name at indexing time
    pub name: String,
    /// Names of the enclosing groups, outermost first
    pub path: Vec<String>,
}

/// Snapshot of every reachable model's name and location
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<IndexEntry>,
}

impl CatalogIndex {
    /// Index the catalog as it is now
    pub fn build(catalog: &Catalog) -> Result<Self> {
        let mut entries = Vec::new();
        Walk {
            catalog,
            token: None,
            visited: HashSet::new(),
            visit: |id: &str, name: String, path: &[String]| {
                entries.push(IndexEntry {
                    id: id.to_string(),
                    name,
                    path: path.to_vec(),
                });
            },
        }
        .run()?;
        debug!(target: "stratified::search", entries = entries.len(), "Built catalog index");
        Ok(Self { entries })
    }

    /// Indexed entries in walk order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synchronous search of the snapshot
    pub fn search(&self, text: &str, limit: usize) -> Vec<SearchResult> {
        let needle = text.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .take(limit)
            .map(IndexEntry::to_result)
            .collect()
    }
}

impl IndexEntry {
    fn to_result(&self) -> SearchResult {
        SearchResult {
            name: self.name.clone(),
            model_id: Some(self.id.clone()),
            path: self.path.clone(),
        }
    }
}

// =============================================================================
// CatalogIndexSearchProvider
// =============================================================================

/// Search provider over a [`CatalogIndex`]
#[derive(Debug)]
pub struct CatalogIndexSearchProvider {
    model: Model,
    slot: SearchSlot,
    index: RwLock<Option<Arc<CatalogIndex>>>,
}

impl CatalogIndexSearchProvider {
    /// Type discriminator
    pub const TYPE: &'static str = "catalog-index-search-provider";

    /// Composition used by [`CatalogIndexSearchProvider::new`]
    pub fn composition() -> Composition {
        Composition::new(Self::TYPE, traits::CATALOG_INDEX_SEARCH_PROVIDER_TRAITS)
            .with(&search_provider::CAPABILITY)
    }

    /// Construct with no index; searches fail until one is set
    pub fn new(id: &str, registry: &SchemaRegistry) -> Result<Self> {
        Ok(Self {
            model: Self::composition().build(registry, id)?,
            slot: SearchSlot::new(),
            index: RwLock::new(None),
        })
    }

    /// Replace the index searched by later calls
    pub fn set_index(&self, index: Arc<CatalogIndex>) {
        *self.index.write() = Some(index);
    }

    /// Current index, if any
    pub fn index(&self) -> Option<Arc<CatalogIndex>> {
        self.index.read().clone()
    }

    /// Resolved `maxResults`
    pub fn max_results(&self) -> usize {
        match self.model.get_integer("maxResults") {
            Ok(Some(n)) if n > 0 => n as usize,
            _ => DEFAULT_MAX_RESULTS,
        }
    }
}

impl HasModel for CatalogIndexSearchProvider {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }
}

impl SearchProvider for CatalogIndexSearchProvider {
    fn search_slot(&self) -> &SearchSlot {
        &self.slot
    }

    fn do_search(&self, text: &str, token: CancellationToken) -> SearchFuture<'_> {
        let needle = text.trim().to_lowercase();
        let limit = self.max_results();
        let index = self.index();
        Box::pin(async move {
            let index = index.ok_or_else(|| {
                TraitError::InvalidOperation("catalog index has not been built".to_string())
            })?;
            let mut results = Vec::new();
            for (scanned, entry) in index.entries().iter().enumerate() {
                if scanned % CHECK_INTERVAL == 0 {
                    tokio::task::yield_now().await;
                    token.check("catalog index search")?;
                }
                if entry.name.to_lowercase().contains(&needle) {
                    results.push(entry.to_result());
                    if results.len() >= limit {
                        break;
                    }
                }
            }
            token.check("catalog index search")?;
            Ok(results)
        })
    }
}

impl CatalogModel for CatalogIndexSearchProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_search_provider(&self) -> Option<&dyn SearchProvider> {
        Some(self)
    }
}
