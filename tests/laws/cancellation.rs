//! Cancellation scenario: a superseded search that finishes late leaves no trace

use crate::common::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Search provider whose searches wait for results sent by the test
#[derive(Debug)]
struct GatedProvider {
    model: Model,
    slot: SearchSlot,
    gates: Mutex<HashMap<String, oneshot::Receiver<Vec<SearchResult>>>>,
}

impl GatedProvider {
    fn new(registry: &SchemaRegistry) -> Self {
        let model = Composition::new("gated", "SearchProviderTraits")
            .with(&stratified::search_provider::CAPABILITY)
            .build(registry, "gated")
            .unwrap();
        Self {
            model,
            slot: SearchSlot::new(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, text: &str) -> oneshot::Sender<Vec<SearchResult>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(text.to_string(), rx);
        tx
    }
}

impl HasModel for GatedProvider {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }
}

impl SearchProvider for GatedProvider {
    fn search_slot(&self) -> &SearchSlot {
        &self.slot
    }

    fn do_search(&self, text: &str, _token: CancellationToken) -> SearchFuture<'_> {
        let gate = self.gates.lock().remove(text);
        Box::pin(async move {
            let gate = gate.ok_or_else(|| TraitError::InvalidOperation("no gate".to_string()))?;
            gate.await
                .map_err(|_| TraitError::InvalidOperation("gate dropped".to_string()))
        })
    }
}

fn hit(name: &str) -> SearchResult {
    SearchResult {
        name: name.to_string(),
        model_id: Some(name.to_string()),
        path: Vec::new(),
    }
}

async fn wait_until_current<P: SearchProvider + ?Sized>(provider: &P, text: &str) {
    loop {
        if let Some(current) = provider.search_slot().current() {
            if current.search_text() == text && current.state() == OperationState::InFlight {
                return;
            }
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn late_result_of_superseded_search_is_discarded() {
    let factory = factory();
    let provider = GatedProvider::new(factory.registry());
    let send_a = provider.gate("alpha");
    let send_b = provider.gate("beta");

    let search_a = run_search(&provider, "alpha");
    let search_b = async {
        wait_until_current(&provider, "alpha").await;
        run_search(&provider, "beta").await
    };
    let resolve = async {
        wait_until_current(&provider, "beta").await;
        send_b.send(vec![hit("beta")]).unwrap();
        tokio::task::yield_now().await;
        // A resolves after B
        send_a.send(vec![hit("alpha")]).unwrap();
    };
    let (a, b, ()) = tokio::join!(search_a, search_b, resolve);

    assert_eq!(a.state(), OperationState::Cancelled);
    assert!(a.results().is_empty());
    assert!(a.commit(vec![hit("alpha")]).unwrap_err().is_stale());

    assert_eq!(b.state(), OperationState::Completed);
    assert_eq!(b.results(), vec![hit("beta")]);
    assert!(std::sync::Arc::ptr_eq(&provider.latest().unwrap(), &b));
}

#[tokio::test]
async fn cancelled_index_search_reports_cancelled() {
    let factory = factory();
    let mut catalog = Catalog::new();
    catalog
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    let provider = factory.create(CatalogIndexSearchProvider::TYPE, "index").unwrap();
    let provider = provider
        .as_any()
        .downcast_ref::<CatalogIndexSearchProvider>()
        .unwrap();
    provider.set_index(std::sync::Arc::new(CatalogIndex::build(&catalog).unwrap()));

    let first = run_search(provider, "roads");
    let second = async {
        wait_until_current(provider, "roads").await;
        run_search(provider, "railway").await
    };
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.state(), OperationState::Cancelled);
    assert_eq!(second.state(), OperationState::Completed);
    assert_eq!(second.results()[0].model_id.as_deref(), Some("rail"));
}
