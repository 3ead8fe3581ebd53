//! Schemas and the schema registry
//!
//! A [`Schema`] is the frozen, ordered set of trait definitions a model
//! class exposes. The [`SchemaRegistry`] builds schemas from class
//! declarations: each class names its parents and registers its own
//! definitions, and the effective schema is assembled on first use.
//!
//! ## Lookup order
//!
//! Own definitions win. Otherwise parents are searched depth-first in the
//! order they were declared, so with `extends [A, B]` a definition on `A`
//! shadows one with the same id on `B`.
//!
//! ## Freezing
//!
//! Building a class's schema freezes the class and all its ancestors.
//! Registering into a frozen class returns [`TraitError::SchemaFrozen`].

use crate::trait_def::TraitDefinition;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use stratified_core::{Result, TraitError};
use tracing::{debug, error};

/// Frozen ordered set of trait definitions for one class
#[derive(Debug)]
pub struct Schema {
    class: String,
    traits: Vec<Arc<TraitDefinition>>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Start building a standalone schema (nested object schemas, tests)
    pub fn builder(class: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            class: class.into(),
            traits: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Schema with no traits
    pub fn empty(class: impl Into<String>) -> Arc<Self> {
        Self::builder(class).build()
    }

    /// Class name
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Definition for `trait_id`
    pub fn get(&self, trait_id: &str) -> Option<&TraitDefinition> {
        self.index.get(trait_id).map(|i| self.traits[*i].as_ref())
    }

    /// Definition for `trait_id`, or `UnknownTrait`
    pub fn require(&self, trait_id: &str) -> Result<&TraitDefinition> {
        self.get(trait_id)
            .ok_or_else(|| TraitError::unknown_trait(&self.class, trait_id))
    }

    /// Whether `trait_id` is defined
    pub fn contains(&self, trait_id: &str) -> bool {
        self.index.contains_key(trait_id)
    }

    /// Definitions in schema order
    pub fn iter(&self) -> impl Iterator<Item = &TraitDefinition> {
        self.traits.iter().map(|d| d.as_ref())
    }

    /// Trait ids in schema order
    pub fn trait_ids(&self) -> impl Iterator<Item = &str> {
        self.traits.iter().map(|d| d.id())
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// True when no traits are defined
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}

/// Builder for [`Schema`]
///
/// Adding a definition whose id is already present replaces it in place.
#[derive(Debug)]
pub struct SchemaBuilder {
    class: String,
    traits: Vec<Arc<TraitDefinition>>,
    index: HashMap<String, usize>,
}

impl SchemaBuilder {
    /// Add a definition
    pub fn with(mut self, def: TraitDefinition) -> Self {
        self.push(Arc::new(def));
        self
    }

    fn push(&mut self, def: Arc<TraitDefinition>) {
        match self.index.get(def.id()) {
            Some(i) => self.traits[*i] = def,
            None => {
                self.index.insert(def.id().to_string(), self.traits.len());
                self.traits.push(def);
            }
        }
    }

    fn push_if_absent(&mut self, def: Arc<TraitDefinition>) {
        if !self.index.contains_key(def.id()) {
            self.push(def);
        }
    }

    /// Finish the schema
    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            class: self.class,
            traits: self.traits,
            index: self.index,
        })
    }
}

// =============================================================================
// Schema Registry
// =============================================================================

#[derive(Debug, Default)]
struct ClassEntry {
    parents: Vec<String>,
    own: Vec<Arc<TraitDefinition>>,
    frozen: bool,
    cached: Option<Arc<Schema>>,
}

/// Registry of model classes and their trait definitions
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    classes: RwLock<HashMap<String, ClassEntry>>,
}

/// Process-wide registry
static GLOBAL_REGISTRY: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL_REGISTRY
    }

    /// Declare `class` with the given parents
    ///
    /// Parents must already be declared, which also rules out cycles.
    /// Re-declaring a class with the same parents is a no-op.
    pub fn declare_class(&self, class: &str, parents: &[&str]) -> Result<()> {
        let mut classes = self.classes.write();
        if let Some(existing) = classes.get(class) {
            if existing.parents.iter().map(String::as_str).eq(parents.iter().copied()) {
                return Ok(());
            }
            return Err(TraitError::InvalidOperation(format!(
                "class '{}' already declared with parents [{}]",
                class,
                existing.parents.join(", ")
            )));
        }
        for parent in parents {
            if !classes.contains_key(*parent) {
                return Err(TraitError::UnknownClass(parent.to_string()));
            }
        }
        classes.insert(
            class.to_string(),
            ClassEntry {
                parents: parents.iter().map(|p| p.to_string()).collect(),
                ..ClassEntry::default()
            },
        );
        debug!(target: "stratified::schema", class, ?parents, "Declared class");
        Ok(())
    }

    /// Register a definition on `class`
    ///
    /// A definition with an id already registered on this class replaces it.
    pub fn register(&self, class: &str, def: TraitDefinition) -> Result<()> {
        let mut classes = self.classes.write();
        let entry = classes
            .get_mut(class)
            .ok_or_else(|| TraitError::UnknownClass(class.to_string()))?;
        if entry.frozen {
            error!(
                target: "stratified::schema",
                class,
                trait_id = def.id(),
                "Registration after schema was frozen"
            );
            return Err(TraitError::SchemaFrozen {
                class: class.to_string(),
                trait_id: def.id().to_string(),
            });
        }
        let def = Arc::new(def);
        match entry.own.iter().position(|d| d.id() == def.id()) {
            Some(i) => entry.own[i] = def,
            None => entry.own.push(def),
        }
        Ok(())
    }

    /// Resolve `trait_id` on `class`: own definitions first, then parents
    pub fn lookup(&self, class: &str, trait_id: &str) -> Result<Arc<TraitDefinition>> {
        let classes = self.classes.read();
        if !classes.contains_key(class) {
            return Err(TraitError::UnknownClass(class.to_string()));
        }
        Self::lookup_in(&classes, class, trait_id)
            .ok_or_else(|| TraitError::unknown_trait(class, trait_id))
    }

    fn lookup_in(
        classes: &HashMap<String, ClassEntry>,
        class: &str,
        trait_id: &str,
    ) -> Option<Arc<TraitDefinition>> {
        let entry = classes.get(class)?;
        if let Some(def) = entry.own.iter().find(|d| d.id() == trait_id) {
            return Some(Arc::clone(def));
        }
        entry
            .parents
            .iter()
            .find_map(|parent| Self::lookup_in(classes, parent, trait_id))
    }

    /// Effective definitions of `class` in schema order
    pub fn definitions(&self, class: &str) -> Result<Vec<Arc<TraitDefinition>>> {
        let classes = self.classes.read();
        let builder = Self::assemble(&classes, class)?;
        Ok(builder.traits)
    }

    fn assemble(classes: &HashMap<String, ClassEntry>, class: &str) -> Result<SchemaBuilder> {
        let entry = classes
            .get(class)
            .ok_or_else(|| TraitError::UnknownClass(class.to_string()))?;
        let mut builder = Schema::builder(class);
        for parent in &entry.parents {
            for def in Self::assemble(classes, parent)?.traits {
                builder.push_if_absent(def);
            }
        }
        for def in &entry.own {
            builder.push(Arc::clone(def));
        }
        Ok(builder)
    }

    /// Effective schema of `class`, freezing it and its ancestors
    pub fn schema(&self, class: &str) -> Result<Arc<Schema>> {
        if let Some(schema) = self
            .classes
            .read()
            .get(class)
            .and_then(|entry| entry.cached.clone())
        {
            return Ok(schema);
        }

        let mut classes = self.classes.write();
        if let Some(schema) = classes.get(class).and_then(|entry| entry.cached.clone()) {
            return Ok(schema);
        }
        let schema = Self::assemble(&classes, class)?.build();
        Self::freeze(&mut classes, class);
        if let Some(entry) = classes.get_mut(class) {
            entry.cached = Some(Arc::clone(&schema));
        }
        debug!(target: "stratified::schema", class, traits = schema.len(), "Schema frozen");
        Ok(schema)
    }

    fn freeze(classes: &mut HashMap<String, ClassEntry>, class: &str) {
        let parents = match classes.get_mut(class) {
            Some(entry) if !entry.frozen => {
                entry.frozen = true;
                entry.parents.clone()
            }
            _ => return,
        };
        for parent in parents {
            Self::freeze(classes, &parent);
        }
    }

    /// Whether `class` is frozen
    pub fn is_frozen(&self, class: &str) -> bool {
        self.classes
            .read()
            .get(class)
            .map(|entry| entry.frozen)
            .unwrap_or(false)
    }

    /// Whether `class` is declared
    pub fn contains_class(&self, class: &str) -> bool {
        self.classes.read().contains_key(class)
    }

    /// Declared class names, sorted
    pub fn classes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Declare a class and register its definitions in one call
///
/// ```ignore
/// register_traits!(registry, "MappableTraits", extends: ["CatalogMemberTraits"], traits: [
///     TraitDefinition::primitive("show", PrimitiveType::Boolean),
/// ])?;
/// ```
#[macro_export]
macro_rules! register_traits {
    ($registry:expr, $class:expr, traits: [$($def:expr),* $(,)?]) => {
        $crate::register_traits!($registry, $class, extends: [], traits: [$($def),*])
    };
    ($registry:expr, $class:expr, extends: [$($parent:expr),* $(,)?], traits: [$($def:expr),* $(,)?]) => {{
        let registry: &$crate::SchemaRegistry = &$registry;
        let class: &str = $class;
        (|| -> $crate::Result<()> {
            let parents: &[&str] = &[$($parent),*];
            registry.declare_class(class, parents)?;
            $(registry.register(class, $def)?;)*
            Ok(())
        })()
    }};
}
