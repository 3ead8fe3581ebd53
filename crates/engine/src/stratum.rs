//! Stratum: one named layer of trait values
//!
//! A stratum holds at most one value per trait id of its schema. Every
//! write is validated against the trait definition before it is stored,
//! so a stratum never contains a value of the wrong shape.

use crate::schema::Schema;
use std::collections::BTreeMap;
use std::sync::Arc;
use stratified_core::{RawValue, Result};

/// One named override layer of trait values
#[derive(Debug, Clone)]
pub struct Stratum {
    id: String,
    schema: Arc<Schema>,
    values: BTreeMap<String, RawValue>,
}

impl Stratum {
    /// Create an empty stratum bound to `schema`
    pub fn new(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            id: id.into(),
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Stratum id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Schema the stratum validates against
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Value stored for `trait_id`, if any
    pub fn get(&self, trait_id: &str) -> Option<&RawValue> {
        self.values.get(trait_id)
    }

    /// Store `value` for `trait_id`
    ///
    /// Fails with `UnknownTrait` or `SchemaViolation` without changing
    /// the stratum.
    pub fn set(&mut self, trait_id: &str, value: RawValue) -> Result<()> {
        self.schema.require(trait_id)?.validate(trait_id, &value)?;
        self.values.insert(trait_id.to_string(), value);
        Ok(())
    }

    /// Store a value that was already checked against the schema
    pub(crate) fn insert_validated(&mut self, trait_id: String, value: RawValue) {
        self.values.insert(trait_id, value);
    }

    /// Remove the value for `trait_id`, returning it
    pub fn remove(&mut self, trait_id: &str) -> Option<RawValue> {
        self.values.remove(trait_id)
    }

    /// Whether a value is stored for `trait_id`
    pub fn contains(&self, trait_id: &str) -> bool {
        self.values.contains_key(trait_id)
    }

    /// True when no values are stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Stored values ordered by trait id
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Stored values
    pub fn values(&self) -> &BTreeMap<String, RawValue> {
        &self.values
    }
}

impl PartialEq for Stratum {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values == other.values
    }
}
