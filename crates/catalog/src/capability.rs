//! Capability composition
//!
//! A capability adds behaviour on top of a [`Model`] and may require
//! certain traits in the model's schema. Each capability is:
//!
//! - a Rust trait with a fixed-name marker method (`has_mappable_mixin`)
//! - a [`Capability`] descriptor listing the traits it requires
//! - an `is_mixed_into` probe that works on any `&dyn CatalogModel`
//!
//! Concrete model types build their [`Model`] through a [`Composition`],
//! which checks every requirement before the model exists. An unmet
//! requirement is a wiring bug and fails construction immediately.

use crate::catalog_member::CatalogMember;
use crate::clipping::Clipping;
use crate::group::Group;
use crate::mappable::Mappable;
use crate::search_provider::SearchProvider;
use std::any::Any;
use std::fmt;
use stratified_core::{Result, TraitError};
use stratified_engine::{Model, PrimitiveType, Schema, SchemaRegistry, TraitKind};
use tracing::{debug, error};

/// Access to the model a capability operates on
pub trait HasModel {
    /// The model
    fn model(&self) -> &Model;

    /// The model, mutably
    fn model_mut(&mut self) -> &mut Model;
}

/// Base trait of every catalog model type
///
/// The `as_*` probes return the capability view when the concrete type
/// implements it. They default to `None`, so a type only opts in to what
/// it actually composes.
pub trait CatalogModel: HasModel + Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Catalog member view
    fn as_catalog_member(&self) -> Option<&dyn CatalogMember> {
        None
    }

    /// Mappable view
    fn as_mappable(&self) -> Option<&dyn Mappable> {
        None
    }

    /// Mutable mappable view
    fn as_mappable_mut(&mut self) -> Option<&mut dyn Mappable> {
        None
    }

    /// Clipping view
    fn as_clipping(&self) -> Option<&dyn Clipping> {
        None
    }

    /// Mutable clipping view
    fn as_clipping_mut(&mut self) -> Option<&mut dyn Clipping> {
        None
    }

    /// Group view
    fn as_group(&self) -> Option<&dyn Group> {
        None
    }

    /// Mutable group view
    fn as_group_mut(&mut self) -> Option<&mut dyn Group> {
        None
    }

    /// Search provider view
    fn as_search_provider(&self) -> Option<&dyn SearchProvider> {
        None
    }

    /// Release capability-owned resources before the model is dropped
    fn teardown(&mut self) {
        let id = self.model().id().to_string();
        if let Some(search) = self.as_search_provider() {
            search.cancel_pending();
        }
        if let Some(mappable) = self.as_mappable_mut() {
            let released = mappable.release_overlays();
            debug!(target: "stratified::capability", model = %id, released, "Released overlays");
        }
        debug!(target: "stratified::capability", model = %id, "Teardown complete");
    }
}

/// Trait kind a capability requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredKind {
    /// Primitive of this type
    Primitive(PrimitiveType),
    /// Any Object trait
    Object,
    /// Any ObjectArray trait
    ObjectArray,
    /// EnumArray of this element type
    EnumArray(PrimitiveType),
}

impl RequiredKind {
    fn matches(&self, kind: &TraitKind) -> bool {
        match (self, kind) {
            (RequiredKind::Primitive(want), TraitKind::Primitive(have)) => want == have,
            (RequiredKind::Object, TraitKind::Object(_)) => true,
            (RequiredKind::ObjectArray, TraitKind::ObjectArray(_)) => true,
            (RequiredKind::EnumArray(want), TraitKind::EnumArray(have)) => want == have,
            _ => false,
        }
    }
}

impl fmt::Display for RequiredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredKind::Primitive(ty) => write!(f, "{}", ty),
            RequiredKind::Object => f.write_str("object"),
            RequiredKind::ObjectArray => f.write_str("array of objects"),
            RequiredKind::EnumArray(ty) => write!(f, "array of {}", ty),
        }
    }
}

/// One trait a capability needs
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    /// Trait id
    pub trait_id: &'static str,
    /// Required kind
    pub kind: RequiredKind,
}

/// Descriptor of a composable capability
#[derive(Debug)]
pub struct Capability {
    /// Capability name
    pub name: &'static str,
    /// Fixed marker name
    pub marker: &'static str,
    /// Traits the model's schema must define
    pub requires: &'static [Requirement],
}

impl Capability {
    /// Check `schema` against the requirements
    pub fn verify(&self, model_type: &str, schema: &Schema) -> Result<()> {
        let missing: Vec<String> = self
            .requires
            .iter()
            .filter_map(|req| match schema.get(req.trait_id) {
                None => Some(req.trait_id.to_string()),
                Some(def) if !req.kind.matches(def.kind()) => Some(format!(
                    "{} (expected {}, found {})",
                    req.trait_id,
                    req.kind,
                    def.expected()
                )),
                Some(_) => None,
            })
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        error!(
            target: "stratified::capability",
            capability = self.name,
            model_type,
            missing = ?missing,
            "Capability requirements unmet"
        );
        Err(TraitError::MixinConstraintUnmet {
            capability: self.name,
            model_type: model_type.to_string(),
            missing,
        })
    }
}

/// A model type's schema class plus the capabilities composed onto it
///
/// `with` chains like nested mixin application; each capability is
/// verified independently, so order does not matter.
#[derive(Debug, Clone)]
pub struct Composition {
    model_type: &'static str,
    class: &'static str,
    capabilities: Vec<&'static Capability>,
}

impl Composition {
    /// Start a composition for `model_type` over the schema `class`
    pub fn new(model_type: &'static str, class: &'static str) -> Self {
        Self {
            model_type,
            class,
            capabilities: Vec::new(),
        }
    }

    /// Add a capability
    pub fn with(mut self, capability: &'static Capability) -> Self {
        if !self.capabilities.iter().any(|c| c.name == capability.name) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Marker names of the composed capabilities
    pub fn markers(&self) -> Vec<&'static str> {
        self.capabilities.iter().map(|c| c.marker).collect()
    }

    /// Verify every capability against the class schema
    pub fn verify(&self, registry: &SchemaRegistry) -> Result<()> {
        let schema = registry.schema(self.class)?;
        for capability in &self.capabilities {
            capability.verify(self.model_type, &schema)?;
        }
        Ok(())
    }

    /// Verify, then construct the model
    pub fn build(&self, registry: &SchemaRegistry, id: &str) -> Result<Model> {
        let schema = registry.schema(self.class)?;
        for capability in &self.capabilities {
            capability.verify(self.model_type, &schema)?;
        }
        Ok(Model::new(id, self.model_type, schema))
    }
}
