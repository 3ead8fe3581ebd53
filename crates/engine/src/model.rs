//! Model: identity plus an owned set of strata
//!
//! A model owns its strata exclusively. Callers read effective values
//! through [`Model::get_trait`] and write through [`Model::set_trait`] or
//! the object-array helpers; no mutable access to the strata map is ever
//! handed out, so every stored value has passed validation.
//!
//! ## Caching
//!
//! Resolved values are memoized per trait id. A write invalidates the
//! written trait; a change to the global stratum order (detected through
//! its generation counter) invalidates everything. Resolution runs
//! without holding the cache lock, so it may re-enter `get_trait`.

use crate::resolve::resolve;
use crate::schema::Schema;
use crate::stratum::Stratum;
use crate::trait_def::{IdProperty, ObjectArrayKind, TraitDefinition, TraitKind};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stratified_core::{global_order, ObjectValue, RawValue, Result, TraitError};
use tracing::debug;

#[derive(Debug, Default)]
struct ResolutionCache {
    generation: u64,
    entries: FxHashMap<String, Option<RawValue>>,
}

/// A model instance: stable id, type discriminator, schema and strata
pub struct Model {
    id: String,
    model_type: String,
    schema: Arc<Schema>,
    strata: HashMap<String, Stratum>,
    cache: Mutex<ResolutionCache>,
}

impl Model {
    /// Create a model with no strata
    pub fn new(id: impl Into<String>, model_type: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            id: id.into(),
            model_type: model_type.into(),
            schema,
            strata: HashMap::new(),
            cache: Mutex::new(ResolutionCache::default()),
        }
    }

    /// Stable identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type discriminator used by the model factory
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Schema of the model's class
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Definition of `trait_id`, or `UnknownTrait`
    pub fn definition(&self, trait_id: &str) -> Result<&TraitDefinition> {
        self.schema
            .get(trait_id)
            .ok_or_else(|| TraitError::unknown_trait(&self.model_type, trait_id))
    }

    // ========== Strata ==========

    /// Stratum by id
    pub fn stratum(&self, stratum_id: &str) -> Option<&Stratum> {
        self.strata.get(stratum_id)
    }

    /// Whether a stratum with this id exists
    pub fn has_stratum(&self, stratum_id: &str) -> bool {
        self.strata.contains_key(stratum_id)
    }

    /// Strata, highest priority first
    pub fn strata_top_to_bottom(&self) -> Vec<&Stratum> {
        let order = global_order();
        order
            .sort_top_to_bottom(self.strata.keys().map(String::as_str))
            .into_iter()
            .filter_map(|id| self.strata.get(id))
            .collect()
    }

    /// Stratum ids, highest priority first
    pub fn stratum_ids(&self) -> Vec<String> {
        self.strata_top_to_bottom()
            .into_iter()
            .map(|s| s.id().to_string())
            .collect()
    }

    /// Remove a whole stratum
    pub fn clear_stratum(&mut self, stratum_id: &str) -> Option<Stratum> {
        let removed = self.strata.remove(stratum_id);
        if removed.is_some() {
            self.cache.get_mut().entries.clear();
        }
        removed
    }

    fn stratum_entry(&mut self, stratum_id: &str) -> &mut Stratum {
        if !self.strata.contains_key(stratum_id) {
            debug!(
                target: "stratified::model",
                model = %self.id,
                stratum = stratum_id,
                "Creating stratum"
            );
        }
        let schema = &self.schema;
        self.strata
            .entry(stratum_id.to_string())
            .or_insert_with(|| Stratum::new(stratum_id, Arc::clone(schema)))
    }

    // ========== Resolution ==========

    /// Effective value of `trait_id`
    ///
    /// Object traits always resolve to an object and ObjectArray traits to
    /// an array; other kinds resolve to `None` when no stratum holds a value.
    pub fn get_trait(&self, trait_id: &str) -> Result<Option<RawValue>> {
        let def = self.definition(trait_id)?;

        let (generation, stratum_ids) = {
            let order = global_order();
            let ids: Vec<String> = order
                .sort_top_to_bottom(self.strata.keys().map(String::as_str))
                .into_iter()
                .map(str::to_string)
                .collect();
            (order.generation(), ids)
        };

        {
            let mut cache = self.cache.lock();
            if cache.generation != generation {
                cache.entries.clear();
                cache.generation = generation;
            } else if let Some(hit) = cache.entries.get(trait_id) {
                return Ok(hit.clone());
            }
        }

        let layers: Vec<&RawValue> = stratum_ids
            .iter()
            .filter_map(|id| self.strata.get(id))
            .filter_map(|s| s.get(trait_id))
            .collect();
        let value = resolve(def, &layers).or_else(|| empty_value(def));

        let mut cache = self.cache.lock();
        if cache.generation == generation {
            cache.entries.insert(trait_id.to_string(), value.clone());
        }
        Ok(value)
    }

    /// Effective value from the strata ranked strictly below `stratum_id`
    fn resolve_below(&self, stratum_id: &str, def: &TraitDefinition) -> Option<RawValue> {
        let order = global_order();
        let lower: Vec<&RawValue> = order
            .sort_top_to_bottom(self.strata.keys().map(String::as_str))
            .into_iter()
            .filter(|id| order.compare_top_to_bottom(stratum_id, id) == Ordering::Less)
            .filter_map(|id| self.strata.get(id))
            .filter_map(|s| s.get(def.id()))
            .collect();
        resolve(def, &lower)
    }

    fn invalidate(&mut self, trait_id: &str) {
        self.cache.get_mut().entries.remove(trait_id);
    }

    // ========== Mutation ==========

    /// Write `value` for `trait_id` into `stratum_id`
    ///
    /// The stratum is created on first write. The value is validated
    /// first; on failure the model is unchanged.
    pub fn set_trait(
        &mut self,
        stratum_id: &str,
        trait_id: &str,
        value: impl Into<RawValue>,
    ) -> Result<()> {
        let value = value.into();
        let schema = Arc::clone(&self.schema);
        let def = schema
            .get(trait_id)
            .ok_or_else(|| TraitError::unknown_trait(&self.model_type, trait_id))?;
        if let Err(e) = def.validate(trait_id, &value) {
            debug!(
                target: "stratified::model",
                model = %self.id,
                stratum = stratum_id,
                trait_id,
                error = %e,
                "Rejected write"
            );
            return Err(e);
        }
        self.write_validated(stratum_id, trait_id, value);
        Ok(())
    }

    /// Write every value of `stratum` into the stratum with the same id
    ///
    /// All values are validated against this model's schema before any is
    /// written, so a failure leaves the model unchanged.
    pub fn merge_stratum(&mut self, stratum: &Stratum) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        for (trait_id, value) in stratum.iter() {
            let def = schema
                .get(trait_id)
                .ok_or_else(|| TraitError::unknown_trait(&self.model_type, trait_id))?;
            def.validate(trait_id, value)?;
        }
        for (trait_id, value) in stratum.iter() {
            self.write_validated(stratum.id(), trait_id, value.clone());
        }
        Ok(())
    }

    pub(crate) fn write_validated(&mut self, stratum_id: &str, trait_id: &str, value: RawValue) {
        self.stratum_entry(stratum_id)
            .insert_validated(trait_id.to_string(), value);
        self.invalidate(trait_id);
    }

    /// Remove the value of `trait_id` from one stratum
    pub fn clear_trait(&mut self, stratum_id: &str, trait_id: &str) -> Result<Option<RawValue>> {
        self.definition(trait_id)?;
        let removed = self
            .strata
            .get_mut(stratum_id)
            .and_then(|s| s.remove(trait_id));
        if removed.is_some() {
            self.invalidate(trait_id);
        }
        Ok(removed)
    }

    // ========== Object arrays ==========

    fn object_array_def<'s>(
        &self,
        schema: &'s Schema,
        trait_id: &str,
    ) -> Result<(&'s TraitDefinition, &'s ObjectArrayKind)> {
        let def = schema
            .get(trait_id)
            .ok_or_else(|| TraitError::unknown_trait(&self.model_type, trait_id))?;
        let kind = def.as_object_array().ok_or_else(|| {
            TraitError::InvalidOperation(format!(
                "trait '{}' is {}, not an object array",
                trait_id,
                def.kind().name()
            ))
        })?;
        Ok((def, kind))
    }

    /// This stratum's own array for `trait_id` (empty when absent or null)
    fn stratum_items(&self, stratum_id: &str, trait_id: &str) -> Vec<RawValue> {
        self.strata
            .get(stratum_id)
            .and_then(|s| s.get(trait_id))
            .and_then(|v| v.as_array())
            .map(<[RawValue]>::to_vec)
            .unwrap_or_default()
    }

    /// Add an element to an ObjectArray in one stratum and return its id
    ///
    /// With key identity `element_id` is required and adding an id the
    /// stratum already holds is a no-op. With index identity an empty
    /// element is appended and its index returned; `element_id` is ignored.
    pub fn add_object(
        &mut self,
        stratum_id: &str,
        trait_id: &str,
        element_id: Option<&str>,
    ) -> Result<String> {
        let schema = Arc::clone(&self.schema);
        let (_, kind) = self.object_array_def(&schema, trait_id)?;
        let mut items = self.stratum_items(stratum_id, trait_id);

        let id = match &kind.id_property {
            IdProperty::Index => {
                items.push(RawValue::object());
                (items.len() - 1).to_string()
            }
            IdProperty::Key(field) => {
                let id = element_id.ok_or_else(|| {
                    TraitError::InvalidOperation(format!(
                        "adding to '{}' requires an element id",
                        trait_id
                    ))
                })?;
                let fresh = fresh_element(kind, field, id);
                match position_of(kind, &items, id) {
                    Some(i) if kind.is_removal(&items[i]) => items[i] = fresh,
                    Some(_) => return Ok(id.to_string()),
                    None => items.push(fresh),
                }
                id.to_string()
            }
        };

        self.set_trait(stratum_id, trait_id, RawValue::Array(items))?;
        Ok(id)
    }

    /// Remove an element from an ObjectArray as seen from one stratum
    ///
    /// Drops the stratum's own element for `element_id`. If strata below
    /// still contribute the id and the trait has a removal marker, a
    /// removal element is written so the id disappears from the resolved
    /// array. Returns whether the stratum changed.
    pub fn remove_object(
        &mut self,
        stratum_id: &str,
        trait_id: &str,
        element_id: &str,
    ) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let (def, kind) = self.object_array_def(&schema, trait_id)?;
        let mut items = self.stratum_items(stratum_id, trait_id);
        let before = items.clone();

        let below = self.resolve_below(stratum_id, def);
        let contributed_below = below
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|lower| position_of(kind, lower, element_id).is_some())
            .unwrap_or(false);

        match &kind.id_property {
            IdProperty::Key(field) => {
                items.retain(|item| {
                    kind.element_id(item, 0).as_deref() != Some(element_id)
                });
                if contributed_below {
                    match kind.removal {
                        Some(marker) => {
                            let mut removal = ObjectValue::new();
                            removal.insert(field.clone(), kind.id_value(element_id));
                            marker.mark(&mut removal);
                            items.push(RawValue::Object(removal));
                        }
                        None => {
                            debug!(
                                target: "stratified::model",
                                model = %self.id,
                                trait_id,
                                element_id,
                                "Element still contributed by lower strata; no removal marker"
                            );
                        }
                    }
                }
            }
            IdProperty::Index => {
                let index = parse_index(trait_id, element_id)?;
                match (contributed_below, kind.removal) {
                    (true, Some(marker)) => {
                        while items.len() <= index {
                            items.push(RawValue::object());
                        }
                        let mut removal = ObjectValue::new();
                        marker.mark(&mut removal);
                        items[index] = RawValue::Object(removal);
                    }
                    _ if index < items.len() => {
                        items.remove(index);
                    }
                    _ => {}
                }
            }
        }

        if items == before {
            return Ok(false);
        }
        self.set_trait(stratum_id, trait_id, RawValue::Array(items))?;
        Ok(true)
    }

    /// Set one field of one ObjectArray element in one stratum
    ///
    /// Writes a sparse element (id plus the field) when the stratum has no
    /// element for `element_id` yet; lower strata are not copied.
    pub fn set_object_trait(
        &mut self,
        stratum_id: &str,
        trait_id: &str,
        element_id: &str,
        field: &str,
        value: impl Into<RawValue>,
    ) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let (_, kind) = self.object_array_def(&schema, trait_id)?;
        if !kind.schema.contains(field) {
            return Err(TraitError::unknown_trait(
                kind.schema.class(),
                format!("{}.{}", trait_id, field),
            ));
        }
        let value = value.into();
        let mut items = self.stratum_items(stratum_id, trait_id);

        let index = match &kind.id_property {
            IdProperty::Key(id_field) => match position_of(kind, &items, element_id) {
                Some(i) if kind.is_removal(&items[i]) => {
                    items[i] = fresh_element(kind, id_field, element_id);
                    i
                }
                Some(i) => i,
                None => {
                    items.push(fresh_element(kind, id_field, element_id));
                    items.len() - 1
                }
            },
            IdProperty::Index => {
                let index = parse_index(trait_id, element_id)?;
                if index > items.len() {
                    return Err(TraitError::InvalidOperation(format!(
                        "index {} is past the end of '{}' in stratum '{}' (length {})",
                        index,
                        trait_id,
                        stratum_id,
                        items.len()
                    )));
                }
                if index == items.len() {
                    items.push(RawValue::object());
                } else if kind.is_removal(&items[index]) {
                    items[index] = RawValue::object();
                }
                index
            }
        };

        if let Some(fields) = items[index].as_object_mut() {
            fields.insert(field.to_string(), value);
        }
        self.set_trait(stratum_id, trait_id, RawValue::Array(items))
    }

    /// Resolved element of an ObjectArray by id
    pub fn element(&self, trait_id: &str, element_id: &str) -> Result<Option<ObjectValue>> {
        let schema = Arc::clone(&self.schema);
        let (_, kind) = self.object_array_def(&schema, trait_id)?;
        let resolved = self.get_trait(trait_id)?;
        Ok(resolved
            .as_ref()
            .and_then(|v| v.as_array())
            .and_then(|items| {
                position_of(kind, items, element_id).and_then(|i| items[i].as_object().cloned())
            }))
    }

    /// Ids of the resolved elements of an ObjectArray, in order
    pub fn element_ids(&self, trait_id: &str) -> Result<Vec<String>> {
        let schema = Arc::clone(&self.schema);
        let (_, kind) = self.object_array_def(&schema, trait_id)?;
        let resolved = self.get_trait(trait_id)?;
        Ok(resolved
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| kind.element_id(item, i))
                    .collect()
            })
            .unwrap_or_default())
    }

    // ========== Typed accessors ==========

    /// Effective string value
    pub fn get_string(&self, trait_id: &str) -> Result<Option<String>> {
        Ok(self
            .get_trait(trait_id)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Effective numeric value (integers widen)
    pub fn get_number(&self, trait_id: &str) -> Result<Option<f64>> {
        Ok(self.get_trait(trait_id)?.and_then(|v| v.as_number()))
    }

    /// Effective integer value
    pub fn get_integer(&self, trait_id: &str) -> Result<Option<i64>> {
        Ok(self.get_trait(trait_id)?.and_then(|v| v.as_int()))
    }

    /// Effective boolean value
    pub fn get_bool(&self, trait_id: &str) -> Result<Option<bool>> {
        Ok(self.get_trait(trait_id)?.and_then(|v| v.as_bool()))
    }

    /// Effective object value
    pub fn get_object(&self, trait_id: &str) -> Result<Option<ObjectValue>> {
        Ok(self.get_trait(trait_id)?.and_then(|v| match v {
            RawValue::Object(fields) => Some(fields),
            _ => None,
        }))
    }

    /// Effective array value
    pub fn get_array(&self, trait_id: &str) -> Result<Option<Vec<RawValue>>> {
        Ok(self.get_trait(trait_id)?.and_then(|v| match v {
            RawValue::Array(items) => Some(items),
            _ => None,
        }))
    }
}

fn empty_value(def: &TraitDefinition) -> Option<RawValue> {
    match def.kind() {
        TraitKind::Object(_) => Some(RawValue::object()),
        TraitKind::ObjectArray(_) => Some(RawValue::Array(Vec::new())),
        _ => None,
    }
}

fn fresh_element(kind: &ObjectArrayKind, id_field: &str, element_id: &str) -> RawValue {
    let mut fields = ObjectValue::new();
    fields.insert(id_field.to_string(), kind.id_value(element_id));
    RawValue::Object(fields)
}

fn position_of(kind: &ObjectArrayKind, items: &[RawValue], element_id: &str) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .position(|(i, item)| kind.element_id(item, i).as_deref() == Some(element_id))
}

fn parse_index(trait_id: &str, element_id: &str) -> Result<usize> {
    element_id.parse::<usize>().map_err(|_| {
        TraitError::InvalidOperation(format!(
            "'{}' uses index identity; '{}' is not an index",
            trait_id, element_id
        ))
    })
}

impl Clone for Model {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            model_type: self.model_type.clone(),
            schema: Arc::clone(&self.schema),
            strata: self.strata.clone(),
            cache: Mutex::new(ResolutionCache::default()),
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("model_type", &self.model_type)
            .field("class", &self.schema.class())
            .field("strata", &self.stratum_ids())
            .finish()
    }
}
