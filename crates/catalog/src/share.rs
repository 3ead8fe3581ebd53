//! Share state: the `user` stratum of every model, plus identity
//!
//! A share state is what a shared link carries. Applying it to a catalog
//! replaces each model's `user` stratum, constructing models that do not
//! exist yet from their recorded `type`.

use crate::catalog::Catalog;
use crate::factory::ModelFactory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stratified_core::{common, Result, TraitError};
use stratified_engine::{save_model_stratum, stratum_from_json, LoadOptions, LoadReport};
use tracing::{debug, warn};

/// Current share state format version
pub const SHARE_STATE_VERSION: u32 = 1;

/// One model's shared edits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedModel {
    /// Type discriminator used to construct the model when absent
    #[serde(rename = "type")]
    pub model_type: String,
    /// Saved `user` stratum
    pub user: serde_json::Value,
}

/// User edits of a whole catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareState {
    /// Format version
    pub version: u32,
    /// Shared models by id
    #[serde(default)]
    pub models: BTreeMap<String, SharedModel>,
}

impl Default for ShareState {
    fn default() -> Self {
        Self {
            version: SHARE_STATE_VERSION,
            models: BTreeMap::new(),
        }
    }
}

impl ShareState {
    /// Serialize as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON, rejecting versions newer than this build understands
    pub fn from_json(text: &str) -> Result<Self> {
        let state: ShareState = serde_json::from_str(text)?;
        if state.version > SHARE_STATE_VERSION {
            return Err(TraitError::InvalidOperation(format!(
                "share state version {} is newer than supported version {}",
                state.version, SHARE_STATE_VERSION
            )));
        }
        Ok(state)
    }
}

impl Catalog {
    /// Capture every non-empty `user` stratum
    pub fn share_state(&self) -> ShareState {
        let mut state = ShareState::default();
        for model in self.iter() {
            let model = model.model();
            let Some(user) = save_model_stratum(model, common::USER) else {
                continue;
            };
            if user.as_object().map_or(true, |fields| fields.is_empty()) {
                continue;
            }
            state.models.insert(
                model.id().to_string(),
                SharedModel {
                    model_type: model.model_type().to_string(),
                    user,
                },
            );
        }
        debug!(target: "stratified::load", models = state.models.len(), "Captured share state");
        state
    }

    /// Replace the `user` stratum of every model named in `state`
    ///
    /// A model whose type differs from the shared type is left alone and
    /// reported. A shared `user` document with bad values still applies
    /// its good values.
    pub fn apply_share_state(
        &mut self,
        factory: &ModelFactory,
        state: &ShareState,
        options: &LoadOptions,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::new();
        for (id, shared) in &state.models {
            match self.get(id) {
                Some(existing) if existing.model().model_type() != shared.model_type => {
                    report.push_issue(
                        Some(id),
                        TraitError::InvalidOperation(format!(
                            "shared type '{}' does not match '{}'",
                            shared.model_type,
                            existing.model().model_type()
                        )),
                    );
                    continue;
                }
                Some(_) => {}
                None => match factory.create(&shared.model_type, id) {
                    Ok(model) => self.add(model)?,
                    Err(e) if e.is_data_error() => {
                        report.push_issue(Some(id), e);
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            }

            let Some(model) = self.get_mut(id) else {
                return Err(TraitError::ModelNotFound(id.clone()));
            };
            let model = model.model_mut();
            let schema = model.schema().clone();
            let loaded = stratum_from_json(&schema, common::USER, &shared.user, options);
            let mut model_report = match loaded {
                Ok((stratum, model_report)) => {
                    model.clear_stratum(common::USER);
                    model.merge_stratum(&stratum)?;
                    model_report
                }
                Err(e) if e.is_data_error() => {
                    let mut model_report = LoadReport::new();
                    model_report.push_issue(None, e);
                    model_report
                }
                Err(e) => return Err(e),
            };
            model_report.attribute_to(id);
            report.merge(model_report);
        }

        if let Some(warning) = report.warning() {
            warn!(
                target: "stratified::load",
                models = state.models.len(),
                problems = report.issues().len(),
                "{}",
                warning
            );
        }
        Ok(report)
    }
}
