//! The owning catalog
//!
//! A [`Catalog`] owns every model by id and keeps insertion order.
//! Removing a model runs its capability teardown before the model is
//! handed back, so overlays and in-flight searches never outlive it.
//!
//! ## Init format
//!
//! ```json
//! {"catalog": [
//!   {"id": "transport", "type": "group", "name": "Transport", "members": [
//!     {"id": "roads", "type": "geojson", "name": "Roads"}
//!   ]}
//! ]}
//! ```
//!
//! Each entry becomes a model of its `type`; the remaining keys load into
//! the `definition` stratum. Nested `members` are created recursively and
//! their ids written into the group's `members` trait. Bad data is
//! collected into one [`LoadReport`]; wiring errors abort the load.

use crate::capability::CatalogModel;
use crate::factory::ModelFactory;
use crate::group::Group;
use std::collections::{HashMap, HashSet};
use stratified_core::{common, Result, TraitError};
use stratified_engine::{json_type_name, stratum_from_json, LoadOptions, LoadReport};
use tracing::{debug, warn};
use uuid::Uuid;

const RESERVED_KEYS: [&str; 3] = ["id", "type", "members"];

/// Models owned by id, in insertion order
#[derive(Debug, Default)]
pub struct Catalog {
    order: Vec<String>,
    models: HashMap<String, Box<dyn CatalogModel>>,
}

impl Catalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `model`
    pub fn add(&mut self, model: Box<dyn CatalogModel>) -> Result<()> {
        let id = model.model().id().to_string();
        if self.models.contains_key(&id) {
            return Err(TraitError::DuplicateModel(id));
        }
        debug!(
            target: "stratified::capability",
            model = %id,
            model_type = model.model().model_type(),
            "Added model"
        );
        self.order.push(id.clone());
        self.models.insert(id, model);
        Ok(())
    }

    /// Model by id
    pub fn get(&self, id: &str) -> Option<&dyn CatalogModel> {
        self.models.get(id).map(|model| model.as_ref())
    }

    /// Model by id, mutably
    pub fn get_mut(&mut self, id: &str) -> Option<&mut dyn CatalogModel> {
        self.models
            .get_mut(id)
            .map(|model| model.as_mut() as &mut dyn CatalogModel)
    }

    /// Concrete model by id
    pub fn get_as<M: CatalogModel>(&self, id: &str) -> Option<&M> {
        self.get(id)?.as_any().downcast_ref::<M>()
    }

    /// Remove a model, tearing down its capabilities first
    pub fn remove(&mut self, id: &str) -> Result<Box<dyn CatalogModel>> {
        let mut model = self
            .models
            .remove(id)
            .ok_or_else(|| TraitError::ModelNotFound(id.to_string()))?;
        self.order.retain(|existing| existing != id);
        model.teardown();
        Ok(model)
    }

    /// Remove every model, tearing each down
    pub fn clear(&mut self) {
        for id in std::mem::take(&mut self.order) {
            if let Some(mut model) = self.models.remove(&id) {
                model.teardown();
            }
        }
    }

    /// Whether `id` is in the catalog
    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the catalog holds no models
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Models in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn CatalogModel> {
        self.order.iter().filter_map(|id| self.get(id))
    }

    /// Ids that no group lists as a member, in insertion order
    pub fn root_ids(&self) -> Vec<&str> {
        let mut nested = HashSet::new();
        for model in self.models.values() {
            if let Some(group) = model.as_group() {
                if let Ok(members) = group.member_ids() {
                    nested.extend(members);
                }
            }
        }
        self.order
            .iter()
            .filter(|id| !nested.contains(id.as_str()))
            .map(String::as_str)
            .collect()
    }

    // =========================================================================
    // Init loading
    // =========================================================================

    /// Load an init document into the `definition` stratum
    ///
    /// Entries with an id already in the catalog load into the existing
    /// model when the types match. One warning is logged per load.
    pub fn load_init(
        &mut self,
        factory: &ModelFactory,
        json: &serde_json::Value,
        options: &LoadOptions,
    ) -> Result<LoadReport> {
        let entries = json
            .get("catalog")
            .and_then(|catalog| catalog.as_array())
            .ok_or_else(|| {
                TraitError::violation(
                    "catalog",
                    "array",
                    json.get("catalog").map(json_type_name).unwrap_or("undefined"),
                )
            })?;

        let mut report = LoadReport::new();
        for (index, entry) in entries.iter().enumerate() {
            self.load_entry(factory, &format!("catalog[{}]", index), entry, options, &mut report)?;
        }

        if let Some(warning) = report.warning() {
            warn!(
                target: "stratified::load",
                models = self.len(),
                problems = report.issues().len(),
                "{}",
                warning
            );
        }
        Ok(report)
    }

    fn load_entry(
        &mut self,
        factory: &ModelFactory,
        path: &str,
        entry: &serde_json::Value,
        options: &LoadOptions,
        report: &mut LoadReport,
    ) -> Result<Option<String>> {
        let Some(fields) = entry.as_object() else {
            report.push_issue(None, TraitError::violation(path, "object", json_type_name(entry)));
            return Ok(None);
        };
        let Some(model_type) = fields.get("type").and_then(|t| t.as_str()) else {
            report.push_issue(
                None,
                TraitError::violation(
                    format!("{}.type", path),
                    "string",
                    fields.get("type").map(json_type_name).unwrap_or("undefined"),
                ),
            );
            return Ok(None);
        };
        let id = match fields.get("id") {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(other) => {
                let id = Uuid::new_v4().to_string();
                report.push_issue(
                    Some(&id),
                    TraitError::violation(format!("{}.id", path), "string", json_type_name(other)),
                );
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        if let Some(existing) = self.get(&id) {
            if existing.model().model_type() != model_type {
                report.push_issue(
                    Some(&id),
                    TraitError::InvalidOperation(format!(
                        "'{}' is already a '{}', not a '{}'",
                        id,
                        existing.model().model_type(),
                        model_type
                    )),
                );
                return Ok(None);
            }
        } else {
            match factory.create(model_type, &id) {
                Ok(model) => self.add(model)?,
                Err(e) if e.is_data_error() => {
                    report.push_issue(Some(&id), e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        let traits: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.load_definition(&id, &serde_json::Value::Object(traits), options, report)?;

        if let Some(members) = fields.get("members") {
            self.load_members(factory, &id, path, members, options, report)?;
        }
        Ok(Some(id))
    }

    fn load_definition(
        &mut self,
        id: &str,
        traits: &serde_json::Value,
        options: &LoadOptions,
        report: &mut LoadReport,
    ) -> Result<()> {
        let Some(model) = self.models.get_mut(id) else {
            return Err(TraitError::ModelNotFound(id.to_string()));
        };
        let schema = model.model().schema().clone();
        let loaded = stratum_from_json(&schema, common::DEFINITION, traits, options);
        let mut entry_report = match loaded {
            Ok((stratum, entry_report)) => {
                model.model_mut().merge_stratum(&stratum)?;
                entry_report
            }
            Err(e) if e.is_data_error() => {
                let mut entry_report = LoadReport::new();
                entry_report.push_issue(Some(id), e);
                entry_report
            }
            Err(e) => return Err(e),
        };
        entry_report.attribute_to(id);
        report.merge(entry_report);
        Ok(())
    }

    fn load_members(
        &mut self,
        factory: &ModelFactory,
        group_id: &str,
        path: &str,
        members: &serde_json::Value,
        options: &LoadOptions,
        report: &mut LoadReport,
    ) -> Result<()> {
        let is_group = self.get(group_id).map_or(false, |m| m.as_group().is_some());
        if !is_group {
            if options.strict {
                report.push_issue(
                    Some(group_id),
                    TraitError::UnknownProperty {
                        model_type: self
                            .get(group_id)
                            .map(|m| m.model().model_type().to_string())
                            .unwrap_or_default(),
                        property: "members".to_string(),
                    },
                );
            } else {
                debug!(
                    target: "stratified::load",
                    model = group_id,
                    "Ignoring members of a non-group model"
                );
            }
            return Ok(());
        }
        let Some(members) = members.as_array() else {
            report.push_issue(
                Some(group_id),
                TraitError::violation(
                    format!("{}.members", path),
                    "array",
                    json_type_name(members),
                ),
            );
            return Ok(());
        };

        let mut member_ids = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            let member_path = format!("{}.members[{}]", path, index);
            match member {
                serde_json::Value::String(id) => member_ids.push(id.clone()),
                _ => {
                    let loaded = self.load_entry(factory, &member_path, member, options, report)?;
                    if let Some(id) = loaded {
                        member_ids.push(id);
                    }
                }
            }
        }

        let Some(group) = self.get_mut(group_id).and_then(|m| m.as_group_mut()) else {
            return Err(TraitError::ModelNotFound(group_id.to_string()));
        };
        for id in &member_ids {
            group.add_member(common::DEFINITION, id)?;
        }
        report.record_loaded(Some(group_id), "members");
        Ok(())
    }
}
