//! Model factory keyed by the `type` discriminator
//!
//! Init JSON and share state name a model's concrete composition through
//! its `type` string. The factory maps each string to a constructor and
//! hands every constructor the same schema registry.

use crate::capability::CatalogModel;
use crate::models::{CatalogGroup, GeoJsonItem, PlainModel};
use crate::search::CatalogIndexSearchProvider;
use crate::traits::register_builtin_traits;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use stratified_core::{Result, TraitError};
use stratified_engine::SchemaRegistry;
use tracing::debug;

/// Builds a boxed model with the given id
pub type Constructor = fn(&str, &SchemaRegistry) -> Result<Box<dyn CatalogModel>>;

/// Registry of constructors by `type`
#[derive(Clone)]
pub struct ModelFactory {
    registry: Arc<SchemaRegistry>,
    constructors: BTreeMap<String, Constructor>,
}

impl ModelFactory {
    /// Empty factory over `registry`
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            constructors: BTreeMap::new(),
        }
    }

    /// Factory with the built-in trait classes and model types registered
    pub fn with_builtins(registry: Arc<SchemaRegistry>) -> Result<Self> {
        register_builtin_traits(&registry)?;
        let mut factory = Self::new(registry);
        factory.register(PlainModel::TYPE, |id, registry| {
            boxed(PlainModel::new(id, registry))
        });
        factory.register(CatalogGroup::TYPE, |id, registry| {
            boxed(CatalogGroup::new(id, registry))
        });
        factory.register(GeoJsonItem::TYPE, |id, registry| {
            boxed(GeoJsonItem::new(id, registry))
        });
        factory.register(CatalogIndexSearchProvider::TYPE, |id, registry| {
            boxed(CatalogIndexSearchProvider::new(id, registry))
        });
        Ok(factory)
    }

    /// Register or replace the constructor for `model_type`
    pub fn register(&mut self, model_type: &str, constructor: Constructor) {
        if self
            .constructors
            .insert(model_type.to_string(), constructor)
            .is_some()
        {
            debug!(target: "stratified::capability", model_type, "Replaced model constructor");
        }
    }

    /// Construct a model of `model_type`
    pub fn create(&self, model_type: &str, id: &str) -> Result<Box<dyn CatalogModel>> {
        let constructor = self
            .constructors
            .get(model_type)
            .ok_or_else(|| TraitError::UnknownModelType(model_type.to_string()))?;
        constructor(id, &self.registry)
    }

    /// Whether a constructor is registered for `model_type`
    pub fn supports(&self, model_type: &str) -> bool {
        self.constructors.contains_key(model_type)
    }

    /// Schema registry handed to constructors
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Registered types, sorted
    pub fn types(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFactory")
            .field("classes", &self.registry.classes())
            .field("types", &self.types())
            .finish()
    }
}

/// Box a freshly constructed model
pub fn boxed<M: CatalogModel>(model: Result<M>) -> Result<Box<dyn CatalogModel>> {
    Ok(Box::new(model?))
}
