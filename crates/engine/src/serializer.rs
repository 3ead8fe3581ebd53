//! JSON serialization of strata
//!
//! Loading is partial: every key is decoded on its own, and a key that
//! fails validation is reported in the [`LoadReport`] while the rest of
//! the document still loads. Unknown keys are skipped for forward
//! compatibility unless strict mode is requested.
//!
//! Saving writes only schema-known keys that hold a value, in schema
//! order, so `load(save(s))` reproduces `s` for any valid stratum.

use crate::model::Model;
use crate::schema::Schema;
use crate::stratum::Stratum;
use crate::trait_def::{json_type_name, DecodeContext};
use std::fmt::Write as _;
use std::sync::Arc;
use stratified_core::{json_depth, LimitError, Result, TraitError, MAX_NESTING_DEPTH};
use tracing::{debug, warn};

/// Options for JSON loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Reject unknown keys instead of skipping them
    pub strict: bool,
    /// Maximum nesting depth of the document
    pub max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl LoadOptions {
    /// Strict options with the default depth limit
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// A trait that loaded successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTrait {
    /// Model the trait was loaded into, if any
    pub model_id: Option<String>,
    /// Trait id
    pub trait_id: String,
}

/// A non-fatal problem found during a load
#[derive(Debug)]
pub struct LoadIssue {
    /// Model being loaded, if any
    pub model_id: Option<String>,
    /// What went wrong
    pub error: TraitError,
}

/// Outcome of a partial load
#[derive(Debug, Default)]
pub struct LoadReport {
    loaded: Vec<LoadedTrait>,
    issues: Vec<LoadIssue>,
}

impl LoadReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Traits that loaded
    pub fn loaded(&self) -> &[LoadedTrait] {
        &self.loaded
    }

    /// Number of traits that loaded
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Problems found
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Errors of every problem found
    pub fn errors(&self) -> impl Iterator<Item = &TraitError> {
        self.issues.iter().map(|issue| &issue.error)
    }

    /// True when nothing went wrong
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Record a loaded trait
    pub fn record_loaded(&mut self, model_id: Option<&str>, trait_id: impl Into<String>) {
        self.loaded.push(LoadedTrait {
            model_id: model_id.map(str::to_string),
            trait_id: trait_id.into(),
        });
    }

    /// Record a problem
    pub fn push_issue(&mut self, model_id: Option<&str>, error: TraitError) {
        self.issues.push(LoadIssue {
            model_id: model_id.map(str::to_string),
            error,
        });
    }

    /// Append another report
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.issues.extend(other.issues);
    }

    /// Attribute every unattributed entry to `model_id`
    pub fn attribute_to(&mut self, model_id: &str) {
        for entry in &mut self.loaded {
            entry.model_id.get_or_insert_with(|| model_id.to_string());
        }
        for issue in &mut self.issues {
            issue.model_id.get_or_insert_with(|| model_id.to_string());
        }
    }

    /// One aggregated, human-readable warning, or `None` when clean
    pub fn warning(&self) -> Option<String> {
        if self.issues.is_empty() {
            return None;
        }
        let mut text = format!(
            "{} propert{} loaded; {} problem{} found:",
            self.loaded.len(),
            if self.loaded.len() == 1 { "y" } else { "ies" },
            self.issues.len(),
            if self.issues.len() == 1 { "" } else { "s" },
        );
        for issue in &self.issues {
            match &issue.model_id {
                Some(id) => {
                    let _ = write!(text, "\n  - {}: {}", id, issue.error);
                }
                None => {
                    let _ = write!(text, "\n  - {}", issue.error);
                }
            }
        }
        Some(text)
    }
}

// =============================================================================
// Load
// =============================================================================

/// Decode a JSON object into a fresh stratum
///
/// Fails as a whole only when the document is not an object, is nested
/// too deeply, or (strict mode) has a top-level key the schema does not
/// define. Everything else is reported per key.
pub fn stratum_from_json(
    schema: &Arc<Schema>,
    stratum_id: &str,
    json: &serde_json::Value,
    options: &LoadOptions,
) -> Result<(Stratum, LoadReport)> {
    let map = json
        .as_object()
        .ok_or_else(|| TraitError::violation(stratum_id, "object", json_type_name(json)))?;

    let depth = json_depth(json);
    if depth > options.max_depth {
        return Err(LimitError::NestingTooDeep {
            depth,
            max: options.max_depth,
        }
        .into());
    }

    if options.strict {
        if let Some(key) = map.keys().find(|key| !schema.contains(key)) {
            warn!(
                target: "stratified::load",
                class = schema.class(),
                property = %key,
                "Strict load rejected unknown property"
            );
            return Err(TraitError::UnknownProperty {
                model_type: schema.class().to_string(),
                property: key.clone(),
            });
        }
    }

    let mut stratum = Stratum::new(stratum_id, Arc::clone(schema));
    let mut report = LoadReport::new();
    let mut issues = Vec::new();
    for (key, value) in map {
        let Some(def) = schema.get(key) else {
            debug!(
                target: "stratified::load",
                class = schema.class(),
                property = %key,
                "Ignoring unknown property"
            );
            continue;
        };
        let mut ctx = DecodeContext {
            strict: options.strict,
            issues: &mut issues,
        };
        if let Some(decoded) = def.decode(key, value, &mut ctx) {
            stratum.insert_validated(key.clone(), decoded);
            report.record_loaded(None, key.clone());
        }
    }
    for error in issues {
        report.push_issue(None, error);
    }
    Ok((stratum, report))
}

/// Load a JSON object into one stratum of `model`
///
/// Successfully decoded keys are written even when others fail. Keys
/// absent from the document leave the stratum's existing values alone.
pub fn load_from_json(
    model: &mut Model,
    stratum_id: &str,
    json: &serde_json::Value,
    options: &LoadOptions,
) -> Result<LoadReport> {
    let schema = Arc::clone(model.schema());
    let (stratum, mut report) = stratum_from_json(&schema, stratum_id, json, options)?;
    for (trait_id, value) in stratum.iter() {
        model.write_validated(stratum_id, trait_id, value.clone());
    }
    report.attribute_to(model.id());

    if let Some(warning) = report.warning() {
        warn!(
            target: "stratified::load",
            model = model.id(),
            stratum = stratum_id,
            problems = report.issues().len(),
            "{}",
            warning
        );
    }
    Ok(report)
}

// =============================================================================
// Save
// =============================================================================

/// Encode a stratum as a JSON object
///
/// Keys follow schema order; traits without a value are omitted.
pub fn save_stratum_to_json(schema: &Schema, stratum: &Stratum) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for def in schema.iter() {
        if let Some(json) = stratum.get(def.id()).and_then(|value| def.to_json(value)) {
            out.insert(def.id().to_string(), json);
        }
    }
    serde_json::Value::Object(out)
}

/// Encode one stratum of `model`, or `None` if the model has no such stratum
pub fn save_model_stratum(model: &Model, stratum_id: &str) -> Option<serde_json::Value> {
    model
        .stratum(stratum_id)
        .map(|stratum| save_stratum_to_json(model.schema(), stratum))
}
